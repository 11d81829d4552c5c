//! Z85 binary-to-text codec: 85-symbol alphabet, 4 binary bytes per
//! 5 encoded characters, big-endian within each group.

use thiserror::Error;

const ALPHABET: &[u8; 85] =
    b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ.-:+=^!/*?&<>()[]{}@%$#";

const INVALID: u8 = 0xFF;

const fn decoder_table() -> [u8; 256] {
    let mut table = [INVALID; 256];
    let mut i = 0;
    while i < ALPHABET.len() {
        table[ALPHABET[i] as usize] = i as u8;
        i += 1;
    }
    table
}

static DECODER: [u8; 256] = decoder_table();

#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum Z85Error {
    #[error("input length {0} is not a multiple of 5")]
    InvalidLength(usize),
    #[error("character {ch:?} at offset {offset} is outside the Z85 alphabet")]
    InvalidCharacter { ch: char, offset: usize },
    #[error("5-character group at offset {0} exceeds the 32-bit range")]
    Overflow(usize),
}

/// Encode binary data as Z85 text.
///
/// # Panics
///
/// Panics if `data.len()` is not a multiple of 4; Z85 only encodes whole
/// 4-byte groups.
pub fn encode(data: &[u8]) -> String {
    assert!(data.len() % 4 == 0, "Z85 encodes whole 4-byte groups");

    let mut out = String::with_capacity(data.len() / 4 * 5);
    for chunk in data.chunks_exact(4) {
        let mut value = u32::from_be_bytes(chunk.try_into().unwrap());
        let mut digits = [0u8; 5];
        for digit in digits.iter_mut().rev() {
            *digit = (value % 85) as u8;
            value /= 85;
        }
        for digit in digits {
            out.push(ALPHABET[digit as usize] as char);
        }
    }
    out
}

/// Decode Z85 text back into binary data.
pub fn decode(text: &str) -> Result<Vec<u8>, Z85Error> {
    if text.len() % 5 != 0 {
        return Err(Z85Error::InvalidLength(text.len()));
    }

    let mut out = Vec::with_capacity(text.len() / 5 * 4);
    let mut value: u32 = 0;
    for (offset, ch) in text.char_indices() {
        let digit = if ch.is_ascii() {
            DECODER[ch as usize]
        } else {
            INVALID
        };
        if digit == INVALID {
            return Err(Z85Error::InvalidCharacter { ch, offset });
        }
        value = value
            .checked_mul(85)
            .and_then(|v| v.checked_add(digit as u32))
            .ok_or(Z85Error::Overflow(offset / 5 * 5))?;
        if offset % 5 == 4 {
            out.extend_from_slice(&value.to_be_bytes());
            value = 0;
        }
    }
    Ok(out)
}

#[cfg(test)]
mod test {
    use super::*;

    // Reference vector from the Z85 specification
    const HELLO_BYTES: [u8; 8] = [0x86, 0x4F, 0xD2, 0x6F, 0xB5, 0x59, 0xF7, 0x5B];
    const HELLO_TEXT: &str = "HelloWorld";

    #[test]
    fn encode_reference_vector() {
        assert_eq!(encode(&HELLO_BYTES), HELLO_TEXT);
    }

    #[test]
    fn decode_reference_vector() {
        assert_eq!(decode(HELLO_TEXT).unwrap(), HELLO_BYTES);
    }

    #[test]
    fn round_trip_40_char_key() {
        let key = "rq:rM>}U?@Lns47E1%kR.o@n%FcmmsL/@{H8]yf7";
        let bytes = decode(key).unwrap();
        assert_eq!(bytes.len(), 32);
        assert_eq!(encode(&bytes), key);
    }

    #[test]
    fn empty_input() {
        assert_eq!(encode(&[]), "");
        assert_eq!(decode("").unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn rejects_unaligned_length() {
        assert_eq!(decode("Hello"), Ok(vec![0x86, 0x4F, 0xD2, 0x6F]));
        assert_eq!(decode("Hell"), Err(Z85Error::InvalidLength(4)));
    }

    #[test]
    fn rejects_character_outside_alphabet() {
        assert_eq!(
            decode("Hell~"),
            Err(Z85Error::InvalidCharacter { ch: '~', offset: 4 })
        );
        // 'é' is two bytes, so the length check sees 5 bytes here
        assert_eq!(
            decode("abé1"),
            Err(Z85Error::InvalidCharacter { ch: 'é', offset: 2 })
        );
    }

    #[test]
    fn rejects_group_overflow() {
        // "%nSc0" is u32::MAX; "#" is the highest symbol, so "#####" overflows
        assert_eq!(decode("%nSc0").unwrap(), [0xFF; 4]);
        assert_eq!(decode("#####"), Err(Z85Error::Overflow(0)));
        assert_eq!(decode("00000#####"), Err(Z85Error::Overflow(5)));
    }
}
