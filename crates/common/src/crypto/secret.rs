//! Content encryption using AES-256-CBC with a deterministic IV
//!
//! Every `Secret` is single use: either a per-post key or a one-time key
//! derived through key agreement. The IV is therefore computed as the first
//! 16 bytes of `SHA-256(key || plaintext)` rather than drawn from an RNG:
//! - the same key never meets two different IVs for unrelated plaintexts
//! - identical inputs produce identical ciphertexts, so content addresses
//!   are stable and retried writes are no-ops
//!
//! The framing is always `IV (16 bytes) || AES-256-CBC(PKCS#7(plaintext))`.

use std::fmt;
use std::ops::Deref;

use aes::cipher::block_padding::Pkcs7;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use serde::{Deserialize, Serialize};

use super::digest::hash;
use crate::codec::{self, CodecError};

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

/// Size of the CBC IV in bytes
pub const IV_SIZE: usize = 16;
/// Size of an AES-256 key in bytes
pub const SECRET_SIZE: usize = 32;
const BLOCK_SIZE: usize = 16;

/// Errors that can occur during encryption/decryption
#[derive(Debug, thiserror::Error)]
pub enum SecretError {
    #[error("invalid secret size, expected {SECRET_SIZE}, got {0}")]
    InvalidSize(usize),
    #[error("ciphertext malformed: {0}")]
    Malformed(&'static str),
    #[error("decryption failed")]
    DecryptFailed,
    #[error("hex error: {0}")]
    Codec(#[from] CodecError),
}

/// A 256-bit symmetric key: a post key, a world key, or a DH-derived key
///
/// # Examples
///
/// ```ignore
/// let secret = Secret::generate();
/// let ciphertext = secret.encrypt(b"sensitive data")?;
/// assert_eq!(secret.decrypt(&ciphertext)?, b"sensitive data");
/// ```
#[derive(PartialEq, Eq, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Secret([u8; SECRET_SIZE]);

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(..)")
    }
}

impl Deref for Secret {
    type Target = [u8; SECRET_SIZE];
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<[u8; SECRET_SIZE]> for Secret {
    fn from(bytes: [u8; SECRET_SIZE]) -> Self {
        Secret(bytes)
    }
}

impl TryFrom<String> for Secret {
    type Error = SecretError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_hex(&value)
    }
}

impl From<Secret> for String {
    fn from(secret: Secret) -> Self {
        secret.to_hex()
    }
}

impl Secret {
    /// Generate a new random secret using a cryptographically secure RNG
    pub fn generate() -> Self {
        let mut buff = [0; SECRET_SIZE];
        getrandom::getrandom(&mut buff).expect("failed to generate random bytes");
        Self(buff)
    }

    /// Create a secret from a byte slice
    pub fn from_slice(data: &[u8]) -> Result<Self, SecretError> {
        if data.len() != SECRET_SIZE {
            return Err(SecretError::InvalidSize(data.len()));
        }
        let mut buff = [0; SECRET_SIZE];
        buff.copy_from_slice(data);
        Ok(buff.into())
    }

    pub fn from_hex(hex: &str) -> Result<Self, SecretError> {
        let bytes = codec::decode(hex)?;
        Self::from_slice(&bytes)
    }

    pub fn to_hex(&self) -> String {
        codec::encode(self.0)
    }

    /// Raw key bytes, as exported for location and IV derivation
    pub fn bytes(&self) -> &[u8] {
        self.0.as_ref()
    }

    /// The IV this key uses for `plaintext`
    fn iv_for(&self, plaintext: &[u8]) -> [u8; IV_SIZE] {
        let digest = hash(self.bytes(), plaintext);
        let mut iv = [0u8; IV_SIZE];
        iv.copy_from_slice(&digest[..IV_SIZE]);
        iv
    }

    /// Encrypt `data`, producing `IV || ciphertext`.
    pub fn encrypt(&self, data: &[u8]) -> Result<Vec<u8>, SecretError> {
        let iv = self.iv_for(data);
        let cipher = Aes256CbcEnc::new_from_slices(self.bytes(), &iv)
            .map_err(|_| SecretError::InvalidSize(SECRET_SIZE))?;
        let ciphertext = cipher.encrypt_padded_vec_mut::<Pkcs7>(data);

        let mut out = Vec::with_capacity(IV_SIZE + ciphertext.len());
        out.extend_from_slice(&iv);
        out.extend_from_slice(&ciphertext);
        Ok(out)
    }

    /// Decrypt `IV || ciphertext`. The IV is taken from the framing.
    pub fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>, SecretError> {
        if data.len() < IV_SIZE + BLOCK_SIZE {
            return Err(SecretError::Malformed("data too short for IV and one block"));
        }
        let (iv, ciphertext) = data.split_at(IV_SIZE);
        if ciphertext.len() % BLOCK_SIZE != 0 {
            return Err(SecretError::Malformed("ciphertext not block aligned"));
        }
        let cipher = Aes256CbcDec::new_from_slices(self.bytes(), iv)
            .map_err(|_| SecretError::InvalidSize(SECRET_SIZE))?;
        cipher
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
            .map_err(|_| SecretError::DecryptFailed)
    }
}
