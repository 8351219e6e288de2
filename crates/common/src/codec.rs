//! Hex and byte-buffer helpers shared by every protocol layer.
//!
//! Hex is the textual form of every key, hash and token that crosses a
//! header or lands in a storage path, so decoding is strict: odd lengths
//! and stray characters are rejected rather than best-effort parsed.

/// Errors produced while decoding hex
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("hex string has odd length {0}")]
    OddLength(usize),
    #[error("invalid hex character {0:?} at index {1}")]
    InvalidCharacter(char, usize),
    #[error("invalid length, expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}

impl From<hex::FromHexError> for CodecError {
    fn from(err: hex::FromHexError) -> Self {
        match err {
            hex::FromHexError::OddLength => CodecError::OddLength(0),
            hex::FromHexError::InvalidHexCharacter { c, index } => {
                CodecError::InvalidCharacter(c, index)
            }
            hex::FromHexError::InvalidStringLength => CodecError::InvalidLength {
                expected: 0,
                actual: 0,
            },
        }
    }
}

/// Encode bytes as lowercase hex
pub fn encode(bytes: impl AsRef<[u8]>) -> String {
    hex::encode(bytes)
}

/// Decode a hex string, optionally `0x`-prefixed
pub fn decode(s: &str) -> Result<Vec<u8>, CodecError> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    if s.len() % 2 != 0 {
        return Err(CodecError::OddLength(s.len()));
    }
    Ok(hex::decode(s)?)
}

/// Decode a hex string into a fixed-width array
pub fn decode_fixed<const N: usize>(s: &str) -> Result<[u8; N], CodecError> {
    let bytes = decode(s)?;
    if bytes.len() != N {
        return Err(CodecError::InvalidLength {
            expected: N,
            actual: bytes.len(),
        });
    }
    let mut out = [0u8; N];
    out.copy_from_slice(&bytes);
    Ok(out)
}

/// Concatenate buffers in order
pub fn concat(parts: &[&[u8]]) -> Vec<u8> {
    let len = parts.iter().map(|p| p.len()).sum();
    let mut out = Vec::with_capacity(len);
    for part in parts {
        out.extend_from_slice(part);
    }
    out
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_hex_roundtrip() {
        let cases: [&[u8]; 4] = [b"", b"\x00", b"\xde\xad\xbe\xef", &[0xffu8; 65]];
        for bytes in cases {
            assert_eq!(decode(&encode(bytes)).unwrap(), bytes);
        }
    }

    #[test]
    fn test_decode_rejects_odd_length() {
        assert_eq!(decode("abc"), Err(CodecError::OddLength(3)));
        assert_eq!(decode("0xabc"), Err(CodecError::OddLength(3)));
    }

    #[test]
    fn test_decode_rejects_bad_characters() {
        assert!(matches!(
            decode("zz"),
            Err(CodecError::InvalidCharacter('z', 0))
        ));
    }

    #[test]
    fn test_decode_prefix_and_case() {
        assert_eq!(decode("0xDEADbeef").unwrap(), vec![0xde, 0xad, 0xbe, 0xef]);
    }

    #[test]
    fn test_decode_fixed() {
        let arr: [u8; 2] = decode_fixed("beef").unwrap();
        assert_eq!(arr, [0xbe, 0xef]);

        let err = decode_fixed::<4>("beef").unwrap_err();
        assert_eq!(
            err,
            CodecError::InvalidLength {
                expected: 4,
                actual: 2
            }
        );
    }

    #[test]
    fn test_concat() {
        assert_eq!(concat(&[b"ab", b"", b"c"]), b"abc".to_vec());
        assert!(concat(&[]).is_empty());
    }
}
