use crate::{
    cert::{is_secret_file, Certificate, PublicKey},
    error::AppResult,
};
use std::{
    collections::HashMap,
    fs,
    io::ErrorKind as IoErrorKind,
    path::{Path, PathBuf},
    time::SystemTime,
};

/// In-memory certificate index, optionally backed by a directory of
/// certificate files.
///
/// A directory-backed store re-checks its directory on every [`lookup`] and
/// rebuilds the index when the contents changed; nothing is re-parsed when
/// they did not. Runtime [`insert`]s are never written to disk (use
/// [`Certificate::save`] for that) and survive a rebuild, except that a
/// same-keyed file on disk wins at the next refresh.
///
/// Dropping a store releases the index only; the backing directory is never
/// modified. There is no internal locking: callers sharing a store across
/// threads must wrap it in their own lock, since `lookup` is a
/// side-effecting read.
///
/// [`lookup`]: CertStore::lookup
/// [`insert`]: CertStore::insert
#[derive(Clone, Debug, Default)]
pub struct CertStore {
    location: Option<PathBuf>,
    certs: HashMap<PublicKey, StoredCert>,
    snapshot: Option<DirSnapshot>,
    stats: StoreStats,
}

impl CertStore {
    /// Open a store over a directory, indexing every certificate file
    /// already present. The directory may be absent and created later; it
    /// is then picked up by the refresh of a subsequent lookup.
    pub fn new(location: impl Into<PathBuf>) -> Self {
        let location = location.into();
        let scan_now = location.is_dir();
        let mut store = Self {
            location: Some(location),
            ..Self::default()
        };
        if scan_now {
            store.refresh();
        }
        store
    }

    /// A pure-memory store: never touches the filesystem.
    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn location(&self) -> Option<&Path> {
        self.location.as_deref()
    }

    /// Look up a certificate by its Z85-encoded public key.
    ///
    /// Directory-backed stores refresh first, so a certificate file added
    /// since the last call becomes retrievable. A malformed encoding is an
    /// error, distinct from `Ok(None)`.
    pub fn lookup(&mut self, public_key: &str) -> AppResult<Option<&Certificate>> {
        let key: PublicKey = public_key.parse()?;
        self.refresh();
        Ok(self.certs.get(&key).map(|stored| &stored.cert))
    }

    /// Insert a certificate, replacing any same-keyed entry. Takes the
    /// certificate by value; the store is its owner from here on.
    ///
    /// Nothing is written to disk. The entry survives refreshes until a
    /// file with the same public key appears in the backing directory, at
    /// which point the file content wins.
    pub fn insert(&mut self, cert: Certificate) {
        self.certs.insert(
            *cert.public_key(),
            StoredCert {
                cert,
                source: CertSource::Runtime,
            },
        );
    }

    /// Re-scan the backing directory if its contents changed since the last
    /// scan. No-op for pure-memory stores.
    pub fn refresh(&mut self) {
        let Some(location) = self.location.clone() else {
            return;
        };
        let snapshot = DirSnapshot::capture(&location);
        if self.snapshot.as_ref() == Some(&snapshot) {
            trace!("directory {} unchanged, keeping index", location.display());
            return;
        }

        debug!(
            "indexing {} certificate file(s) under {}",
            snapshot.entries.len(),
            location.display()
        );
        self.stats.scans += 1;

        let mut certs = HashMap::with_capacity(snapshot.entries.len());
        for entry in &snapshot.entries {
            self.stats.files_parsed += 1;
            match Certificate::load(&entry.path) {
                Ok(cert) => {
                    certs.insert(
                        *cert.public_key(),
                        StoredCert {
                            cert,
                            source: CertSource::Disk,
                        },
                    );
                }
                Err(err) => {
                    warn!(
                        "skipping unreadable certificate file {}: {}",
                        entry.path.display(),
                        err
                    );
                }
            }
        }

        // Carry over runtime inserts; same-keyed files win.
        for (key, stored) in self.certs.drain() {
            if stored.source == CertSource::Runtime {
                certs.entry(key).or_insert(stored);
            }
        }

        self.certs = certs;
        self.snapshot = Some(snapshot);
    }

    pub fn len(&self) -> usize {
        self.certs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.certs.is_empty()
    }

    /// Drop every indexed certificate. The next lookup on a
    /// directory-backed store re-indexes from disk.
    pub fn clear(&mut self) {
        self.certs.clear();
        self.snapshot = None;
    }

    /// Certificates in ascending Z85 public-key order.
    pub fn iter(&self) -> impl Iterator<Item = &Certificate> {
        let mut certs: Vec<&Certificate> =
            self.certs.values().map(|stored| &stored.cert).collect();
        certs.sort_by_key(|cert| cert.public_key().to_z85());
        certs.into_iter()
    }

    /// Log the current listing, one line per certificate, in ascending
    /// Z85 public-key order.
    pub fn print(&self) {
        if self.certs.is_empty() {
            info!("certificate store is empty");
            return;
        }

        info!("certificate store holds {} certificate(s):", self.len());
        for cert in self.iter() {
            let metadata = cert
                .metadata()
                .iter()
                .map(|(name, value)| format!("{}={:?}", name, value))
                .collect::<Vec<_>>()
                .join(" ");
            info!("    {} {}", cert.public_key(), metadata);
        }
    }

    /// Counters for the refresh machinery.
    pub fn stats(&self) -> StoreStats {
        self.stats
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StoreStats {
    /// Directory scans that rebuilt the index.
    pub scans: u64,
    /// Certificate files parsed across all scans.
    pub files_parsed: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum CertSource {
    Disk,
    Runtime,
}

#[derive(Clone, Debug)]
struct StoredCert {
    cert: Certificate,
    source: CertSource,
}

/// What a backing directory looked like at the last scan. Comparing
/// snapshots is how a lookup decides whether re-parsing can be skipped.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct DirSnapshot {
    entries: Vec<DirEntry>,
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
struct DirEntry {
    path: PathBuf,
    len: u64,
    modified: Option<SystemTime>,
}

impl DirSnapshot {
    /// Best-effort capture: an absent or unreadable directory reads as
    /// empty rather than failing the lookup that triggered it.
    fn capture(location: &Path) -> Self {
        let read_dir = match fs::read_dir(location) {
            Ok(read_dir) => read_dir,
            Err(err) if err.kind() == IoErrorKind::NotFound => {
                trace!("certificate directory {} absent", location.display());
                return Self::default();
            }
            Err(err) => {
                warn!(
                    "cannot read certificate directory {}: {}",
                    location.display(),
                    err
                );
                return Self::default();
            }
        };

        let mut entries = Vec::new();
        for entry in read_dir.flatten() {
            let path = entry.path();
            let Ok(metadata) = entry.metadata() else {
                continue;
            };
            if !metadata.is_file() || is_secret_file(&path) {
                continue;
            }
            entries.push(DirEntry {
                path,
                len: metadata.len(),
                modified: metadata.modified().ok(),
            });
        }
        entries.sort();
        Self { entries }
    }
}
