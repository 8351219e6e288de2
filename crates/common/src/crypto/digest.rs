use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::codec::{self, CodecError};

/// Size of a SHA-256 digest in bytes
pub const HASH_SIZE: usize = 32;

/// The protocol's single hash function over `a || b`
pub fn hash(a: &[u8], b: &[u8]) -> [u8; HASH_SIZE] {
    let mut hasher = Sha256::new();
    hasher.update(a);
    hasher.update(b);
    hasher.finalize().into()
}

/// SHA-256 of a single buffer
pub fn digest(data: &[u8]) -> [u8; HASH_SIZE] {
    Sha256::digest(data).into()
}

/// A 32-byte content address: post ids, key locations, message ids
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContentHash([u8; HASH_SIZE]);

impl std::str::FromStr for ContentHash {
    type Err = CodecError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl ContentHash {
    /// Address a buffer by its hash
    pub fn of(data: &[u8]) -> Self {
        Self(digest(data))
    }

    pub fn from_hex(hex: &str) -> Result<Self, CodecError> {
        Ok(Self(codec::decode_fixed(hex)?))
    }

    pub fn to_hex(&self) -> String {
        codec::encode(self.0)
    }

    pub fn bytes(&self) -> &[u8; HASH_SIZE] {
        &self.0
    }
}

impl From<[u8; HASH_SIZE]> for ContentHash {
    fn from(bytes: [u8; HASH_SIZE]) -> Self {
        Self(bytes)
    }
}

impl TryFrom<String> for ContentHash {
    type Error = CodecError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_hex(&value)
    }
}

impl From<ContentHash> for String {
    fn from(hash: ContentHash) -> Self {
        hash.to_hex()
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_hash_is_concatenation() {
        assert_eq!(hash(b"ab", b"cd"), hash(b"a", b"bcd"));
        assert_eq!(hash(b"abcd", b""), digest(b"abcd"));
    }

    #[test]
    fn test_known_vector() {
        // SHA-256("abc")
        assert_eq!(
            ContentHash::of(b"abc").to_hex(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_content_hash_json() {
        let h = ContentHash::of(b"post");
        let json = serde_json::to_string(&h).unwrap();
        assert_eq!(json, format!("\"{}\"", h.to_hex()));
        let back: ContentHash = serde_json::from_str(&json).unwrap();
        assert_eq!(back, h);

        assert!(serde_json::from_str::<ContentHash>("\"abcd\"").is_err());
    }
}
