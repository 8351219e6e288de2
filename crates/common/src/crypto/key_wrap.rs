//! Post-key wrapping under an outer key
//!
//! A post key is shared by encrypting it under an *outer key*: either the
//! identity's published world key, or a pairwise key derived through ECDH.
//! The wrapped key is stored at a location derived from the outer key and
//! the post id:
//!
//! ```text
//! loc = SHA-256(outer_key_bytes || post_id_bytes)
//! wrapped = outer_key.encrypt(hex(post_key))
//! ```
//!
//! Whoever can compute `loc` can fetch and unwrap the key; nobody else can
//! even find it. That derivable path is the whole access grant.

use super::digest::{hash, ContentHash};
use super::secret::{Secret, SecretError};

/// Storage location of a post key wrapped under `outer`
pub fn key_location(outer: &Secret, post_id: &ContentHash) -> ContentHash {
    ContentHash::from(hash(outer.bytes(), post_id.bytes()))
}

/// A post key encrypted under an outer key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrappedKey(Vec<u8>);

impl From<Vec<u8>> for WrappedKey {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl WrappedKey {
    /// Wrap `post_key` for holders of `outer`
    pub fn wrap(post_key: &Secret, outer: &Secret) -> Result<Self, SecretError> {
        // the hex form is what readers on every platform expect to unwrap
        let encoded = post_key.to_hex();
        Ok(Self(outer.encrypt(encoded.as_bytes())?))
    }

    /// Recover the post key using `outer`
    pub fn unwrap(&self, outer: &Secret) -> Result<Secret, SecretError> {
        let decrypted = outer.decrypt(&self.0)?;
        let encoded =
            std::str::from_utf8(&decrypted).map_err(|_| SecretError::DecryptFailed)?;
        Secret::from_hex(encoded).map_err(|_| SecretError::DecryptFailed)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::crypto::AgreementSecretKey;

    #[test]
    fn test_wrap_under_world_key() {
        let post_key = Secret::generate();
        let world_key = Secret::generate();

        let wrapped = WrappedKey::wrap(&post_key, &world_key).unwrap();
        assert_eq!(wrapped.unwrap(&world_key).unwrap(), post_key);
    }

    #[test]
    fn test_wrap_under_pairwise_key() {
        let poster = AgreementSecretKey::generate();
        let reader = AgreementSecretKey::generate();
        let post_key = Secret::generate();

        let outer = poster.derive(&reader.public());
        let wrapped = WrappedKey::wrap(&post_key, &outer).unwrap();

        let reader_outer = reader.derive(&poster.public());
        assert_eq!(wrapped.unwrap(&reader_outer).unwrap(), post_key);

        let stranger_outer = AgreementSecretKey::generate().derive(&poster.public());
        assert!(wrapped.unwrap(&stranger_outer).is_err());
    }

    #[test]
    fn test_location_depends_on_both_inputs() {
        let a = Secret::generate();
        let b = Secret::generate();
        let post = ContentHash::of(b"post one");
        let other_post = ContentHash::of(b"post two");

        assert_eq!(key_location(&a, &post), key_location(&a, &post));
        assert_ne!(key_location(&a, &post), key_location(&b, &post));
        assert_ne!(key_location(&a, &post), key_location(&a, &other_post));
    }
}
