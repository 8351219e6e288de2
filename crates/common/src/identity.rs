//! A client identity and its on-disk form
//!
//! An identity is three secrets: the signing key (the durable handle), a
//! separate key-agreement key used to wrap post keys pairwise, and the
//! current world key. On disk they are three PEM blocks in one file.

use crate::crypto::{
    AgreementPublicKey, AgreementSecretKey, KeyError, PublicKey, Secret, SecretKey,
};

const SIGNING_TAG: &str = "PRIVATE KEY";
const AGREEMENT_TAG: &str = "AGREEMENT KEY";
const WORLD_TAG: &str = "WORLD KEY";

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("key error: {0}")]
    Key(#[from] KeyError),
    #[error("PEM error: {0}")]
    Pem(#[from] pem::PemError),
    #[error("identity file is missing a {0} block")]
    MissingBlock(&'static str),
    #[error("invalid world key: {0}")]
    WorldKey(String),
}

#[derive(Debug, Clone)]
pub struct Identity {
    signing: SecretKey,
    agreement: AgreementSecretKey,
    world_key: Secret,
}

impl Identity {
    pub fn generate() -> Self {
        Self {
            signing: SecretKey::generate(),
            agreement: AgreementSecretKey::generate(),
            world_key: Secret::generate(),
        }
    }

    pub fn from_parts(
        signing: SecretKey,
        agreement: AgreementSecretKey,
        world_key: Secret,
    ) -> Self {
        Self {
            signing,
            agreement,
            world_key,
        }
    }

    /// The public handle of this identity
    pub fn public(&self) -> PublicKey {
        self.signing.public()
    }

    pub fn signing_key(&self) -> &SecretKey {
        &self.signing
    }

    pub fn agreement_key(&self) -> &AgreementSecretKey {
        &self.agreement
    }

    pub fn agreement_public(&self) -> AgreementPublicKey {
        self.agreement.public()
    }

    pub fn world_key(&self) -> &Secret {
        &self.world_key
    }

    /// Replace the world key with a fresh one.
    ///
    /// Keys already wrapped under the old world key stay readable by anyone
    /// who kept it; only posts published afterwards use the new one.
    pub fn rotate_world_key(&mut self) -> &Secret {
        self.world_key = Secret::generate();
        &self.world_key
    }

    pub fn to_pem(&self) -> String {
        let blocks = [
            pem::Pem::new(SIGNING_TAG, self.signing.to_bytes().to_vec()),
            pem::Pem::new(AGREEMENT_TAG, self.agreement.to_bytes().to_vec()),
            pem::Pem::new(WORLD_TAG, self.world_key.bytes().to_vec()),
        ];
        pem::encode_many(&blocks)
    }

    pub fn from_pem(pem_str: &str) -> Result<Self, IdentityError> {
        let blocks = pem::parse_many(pem_str)?;
        let find = |tag: &'static str| {
            blocks
                .iter()
                .find(|block| block.tag() == tag)
                .ok_or(IdentityError::MissingBlock(tag))
        };

        let signing = SecretKey::from_bytes(find(SIGNING_TAG)?.contents())?;
        let agreement = AgreementSecretKey::from_bytes(find(AGREEMENT_TAG)?.contents())?;
        let world_key = Secret::from_slice(find(WORLD_TAG)?.contents())
            .map_err(|e| IdentityError::WorldKey(e.to_string()))?;

        Ok(Self::from_parts(signing, agreement, world_key))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_pem_roundtrip() {
        let identity = Identity::generate();
        let restored = Identity::from_pem(&identity.to_pem()).unwrap();

        assert_eq!(restored.public(), identity.public());
        assert_eq!(restored.agreement_public(), identity.agreement_public());
        assert_eq!(restored.world_key(), identity.world_key());
    }

    #[test]
    fn test_missing_block() {
        let identity = Identity::generate();
        let partial = pem::encode(&pem::Pem::new(
            SIGNING_TAG,
            identity.signing_key().to_bytes().to_vec(),
        ));
        assert!(matches!(
            Identity::from_pem(&partial),
            Err(IdentityError::MissingBlock(AGREEMENT_TAG))
        ));
    }

    #[test]
    fn test_rotate_world_key() {
        let mut identity = Identity::generate();
        let before = identity.world_key().clone();
        let public = identity.public();
        identity.rotate_world_key();
        assert_ne!(identity.world_key(), &before);
        assert_eq!(identity.public(), public);
    }
}
