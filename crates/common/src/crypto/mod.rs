//! Cryptographic primitives for Veil
//!
//! This module provides the cryptographic foundation for Veil's security model:
//!
//! - **Identity & Authentication**: ECDSA P-256 keypairs; the hex of the 65-byte
//!   uncompressed public key is the canonical user identifier
//! - **Key Agreement**: ECDH P-256, yielding a 32-byte symmetric key
//! - **Encryption**: AES-256-CBC with a deterministic IV for single-use keys
//! - **Key Wrapping**: post keys re-encrypted under an outer key and stored at
//!   a location only holders of that outer key can derive
//!
//! # Security Model
//!
//! ## Identity
//! Each client holds a signing keypair (`SecretKey`/`PublicKey`) and a separate
//! key-agreement keypair (`AgreementSecretKey`/`AgreementPublicKey`). Neither
//! secret ever leaves the client unencrypted.
//!
//! ## Content Encryption
//! Every post is encrypted under its own `Secret`. Because each key encrypts
//! exactly one plaintext (or is a one-time DH-derived key), the IV is derived
//! from `SHA-256(key || plaintext)` instead of a random source.
//!
//! ## Access Control
//! There is no server-side ACL. A wrapped post key lives at
//! `SHA-256(outer_key || post_id)`; being able to compute that path is the grant.

mod digest;
mod key_wrap;
mod keys;
mod secret;

pub use digest::{digest, hash, ContentHash, HASH_SIZE};
pub use key_wrap::{key_location, WrappedKey};
pub use keys::{
    AgreementPublicKey, AgreementSecretKey, KeyError, PublicKey, SecretKey, Signature,
    PRIVATE_KEY_SIZE, PUBLIC_KEY_SIZE, SIGNATURE_SIZE,
};
pub use secret::{Secret, SecretError, IV_SIZE, SECRET_SIZE};
