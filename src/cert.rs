use crate::{
    error::{AppError, AppResult, ErrorReason},
    z85,
};
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    ffi::OsString,
    fmt::{Display, Formatter},
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

/// CURVE keys are 32 bytes, 40 characters in Z85 text form.
pub const KEY_SIZE: usize = 32;

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicKey([u8; KEY_SIZE]);

impl PublicKey {
    pub fn new(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> AppResult<Self> {
        let bytes: [u8; KEY_SIZE] = bytes.try_into().map_err(|_| ErrorReason::KeyLength {
            expected: KEY_SIZE,
            actual: bytes.len(),
        })?;
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }

    pub fn to_z85(&self) -> String {
        z85::encode(&self.0)
    }
}

impl Display for PublicKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_z85())
    }
}

impl std::fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("PublicKey").field(&self.to_z85()).finish()
    }
}

impl FromStr for PublicKey {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = z85::decode(s)?;
        Self::from_slice(&bytes)
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct SecretKey([u8; KEY_SIZE]);

impl SecretKey {
    pub fn new(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> AppResult<Self> {
        let bytes: [u8; KEY_SIZE] = bytes.try_into().map_err(|_| ErrorReason::KeyLength {
            expected: KEY_SIZE,
            actual: bytes.len(),
        })?;
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }

    pub fn to_z85(&self) -> String {
        z85::encode(&self.0)
    }
}

// Keep secret material out of debug output
impl std::fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("SecretKey").field(&"<redacted>").finish()
    }
}

impl FromStr for SecretKey {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = z85::decode(s)?;
        Self::from_slice(&bytes)
    }
}

/// A public key with optional secret half and free-form metadata.
/// Identity is the public key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Certificate {
    public_key: PublicKey,
    secret_key: Option<SecretKey>,
    metadata: BTreeMap<String, String>,
}

impl Certificate {
    pub fn new(public_key: PublicKey) -> Self {
        Self {
            public_key,
            secret_key: None,
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_secret(public_key: PublicKey, secret_key: SecretKey) -> Self {
        Self {
            public_key,
            secret_key: Some(secret_key),
            metadata: BTreeMap::new(),
        }
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    pub fn secret_key(&self) -> Option<&SecretKey> {
        self.secret_key.as_ref()
    }

    pub fn set_meta(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.metadata.insert(name.into(), value.into());
    }

    pub fn meta(&self, name: &str) -> Option<&str> {
        self.metadata.get(name).map(String::as_str)
    }

    pub fn unset_meta(&mut self, name: &str) -> Option<String> {
        self.metadata.remove(name)
    }

    /// Metadata names in sorted order.
    pub fn meta_keys(&self) -> impl Iterator<Item = &str> {
        self.metadata.keys().map(String::as_str)
    }

    pub fn metadata(&self) -> &BTreeMap<String, String> {
        &self.metadata
    }

    /// Parse a certificate file, public or secret.
    pub fn load(path: impl AsRef<Path>) -> AppResult<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let file: CertFile = toml::from_str(&content)?;

        let public_key = file.curve.public_key.parse()?;
        let secret_key = match file.curve.secret_key {
            Some(text) => Some(text.parse()?),
            None => None,
        };

        Ok(Self {
            public_key,
            secret_key,
            metadata: file.metadata,
        })
    }

    /// Write the public half and metadata to `path`; if a secret key is
    /// present, also write the full certificate to `<path>_secret`.
    pub fn save(&self, path: impl AsRef<Path>) -> AppResult<()> {
        let path = path.as_ref();
        self.save_public(path)?;
        if self.secret_key.is_some() {
            self.save_secret(secret_file_path(path))?;
        }
        Ok(())
    }

    pub fn save_public(&self, path: impl AsRef<Path>) -> AppResult<()> {
        let file = CertFile {
            curve: CurveSection {
                public_key: self.public_key.to_z85(),
                secret_key: None,
            },
            metadata: self.metadata.clone(),
        };
        fs::write(path.as_ref(), toml::to_string_pretty(&file)?)?;
        Ok(())
    }

    /// Write both key halves. On Unix the file mode is restricted to 0600.
    pub fn save_secret(&self, path: impl AsRef<Path>) -> AppResult<()> {
        let secret_key = self
            .secret_key
            .as_ref()
            .ok_or(ErrorReason::MissingSecretKey)?;

        let file = CertFile {
            curve: CurveSection {
                public_key: self.public_key.to_z85(),
                secret_key: Some(secret_key.to_z85()),
            },
            metadata: self.metadata.clone(),
        };
        fs::write(path.as_ref(), toml::to_string_pretty(&file)?)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(path.as_ref(), fs::Permissions::from_mode(0o600))?;
        }

        Ok(())
    }
}

pub(crate) fn secret_file_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push("_secret");
    PathBuf::from(name)
}

pub(crate) fn is_secret_file(path: &Path) -> bool {
    path.file_name()
        .map(|name| name.to_string_lossy().ends_with("_secret"))
        .unwrap_or(false)
}

#[derive(Debug, Deserialize, Serialize)]
struct CertFile {
    curve: CurveSection,
    #[serde(default)]
    metadata: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize, Serialize)]
struct CurveSection {
    #[serde(rename = "public-key")]
    public_key: String,
    #[serde(rename = "secret-key", skip_serializing_if = "Option::is_none")]
    secret_key: Option<String>,
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::error::ErrorReason;
    use tempfile::TempDir;

    const PUBLIC_TXT: &str = "rq:rM>}U?@Lns47E1%kR.o@n%FcmmsL/@{H8]yf7";
    const SECRET_TXT: &str = "JTKVSB%%)wK0E.X)V>+}o?pNmC{O&4W4b!Ni{Lh6";

    fn sample_cert() -> Certificate {
        let mut cert = Certificate::with_secret(
            PUBLIC_TXT.parse().unwrap(),
            SECRET_TXT.parse().unwrap(),
        );
        cert.set_meta("name", "broker-7");
        cert.set_meta("email", "ops@example.com");
        cert
    }

    #[test]
    fn public_key_parses_40_char_z85() {
        let key: PublicKey = PUBLIC_TXT.parse().unwrap();
        assert_eq!(key.to_z85(), PUBLIC_TXT);
        assert_eq!(key.to_string(), PUBLIC_TXT);
    }

    #[test]
    fn public_key_rejects_wrong_decoded_length() {
        // 10 valid Z85 characters decode to 8 bytes, not 32
        let err = "HelloWorld".parse::<PublicKey>().unwrap_err();
        assert!(matches!(
            err.reason(),
            ErrorReason::KeyLength {
                expected: KEY_SIZE,
                actual: 8
            }
        ));
    }

    #[test]
    fn secret_key_debug_is_redacted() {
        let key: SecretKey = SECRET_TXT.parse().unwrap();
        assert!(!format!("{:?}", key).contains(SECRET_TXT));
    }

    #[test]
    fn metadata_operations() {
        let mut cert = sample_cert();
        assert_eq!(cert.meta("name"), Some("broker-7"));
        assert_eq!(cert.meta("missing"), None);

        let keys: Vec<_> = cert.meta_keys().collect();
        assert_eq!(keys, ["email", "name"]);

        assert_eq!(cert.unset_meta("email").as_deref(), Some("ops@example.com"));
        assert_eq!(cert.meta("email"), None);
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broker.cert");

        let cert = sample_cert();
        cert.save(&path).unwrap();

        let public = Certificate::load(&path).unwrap();
        assert_eq!(public.public_key(), cert.public_key());
        assert_eq!(public.secret_key(), None);
        assert_eq!(public.metadata(), cert.metadata());

        let secret = Certificate::load(secret_file_path(&path)).unwrap();
        assert_eq!(secret, cert);
    }

    #[cfg(unix)]
    #[test]
    fn secret_file_has_restricted_mode() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broker.cert_secret");
        sample_cert().save_secret(&path).unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn save_secret_without_secret_key_fails() {
        let dir = TempDir::new().unwrap();
        let cert = Certificate::new(PUBLIC_TXT.parse().unwrap());
        let err = cert.save_secret(dir.path().join("x_secret")).unwrap_err();
        assert!(matches!(err.reason(), ErrorReason::MissingSecretKey));
    }

    #[test]
    fn load_rejects_malformed_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("garbage.cert");
        fs::write(&path, "this is not a certificate").unwrap();

        let err = Certificate::load(&path).unwrap_err();
        assert!(matches!(err.reason(), ErrorReason::CertParse(_)));
    }

    #[test]
    fn secret_file_name_detection() {
        assert!(is_secret_file(Path::new("/certs/broker.cert_secret")));
        assert!(!is_secret_file(Path::new("/certs/broker.cert")));
    }
}
