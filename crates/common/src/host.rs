//! The untrusted host
//!
//! Stores opaque blobs for identities and gates writes behind stateless
//! tokens. It never sees plaintext, never holds private keys and keeps no
//! session state: every check is recomputed from the request and the
//! authority's seeds.
//!
//! NOTE: a write is checked against the claimed public key only. The path is
//! not bound to that key, so an authenticated identity can write anywhere.

use std::sync::Arc;

use bytes::Bytes;

use crate::auth::{Authority, Capability, ChallengeResponse};
use crate::crypto::{AgreementPublicKey, ContentHash, PublicKey, Signature};
use crate::error::ProtocolError;
use crate::storage::{FileStore, Layout};

/// Header names shared by client and server
pub mod headers {
    pub const PUBKEY: &str = "x-pubkey";
    pub const TOKEN: &str = "x-token";
    pub const SIGNATURE: &str = "x-signature";
    pub const SUB_KEY: &str = "x-sub-key";
    pub const POW: &str = "x-pow";
    pub const LOCATION: &str = "x-location";
}

/// Path segments under a user root that may only be listed by their owner
const PRIVATE_DIRECTORIES: [&str; 2] = ["reqs", "inbox"];

#[derive(Debug, Clone)]
pub struct Host {
    authority: Authority,
    store: Arc<dyn FileStore>,
}

impl Host {
    pub fn new(authority: Authority, store: Arc<dyn FileStore>) -> Self {
        Self { authority, store }
    }

    pub fn authority(&self) -> &Authority {
        &self.authority
    }

    /// `POST /auth`: challenge for a capability, as `challenge || difficulty`
    pub fn auth(&self, capability: &Capability) -> Vec<u8> {
        self.authority.issue_challenge(capability)
    }

    /// `POST /chal`: exchange a solved and signed challenge for a token
    pub fn chal(&self, body: &[u8]) -> Result<String, ProtocolError> {
        let response = ChallengeResponse::from_bytes(body)?;
        let token = self.authority.verify_and_issue_token(&response)?;
        tracing::info!(pub_key = %response.public_key, "issued session token");
        Ok(token)
    }

    /// Store `payload` at `location` on behalf of an authenticated identity.
    ///
    /// `signature` must verify over exactly `payload` under `pub_key`.
    pub async fn put(
        &self,
        location: &str,
        payload: Bytes,
        signature: &Signature,
        pub_key: &PublicKey,
        token: &str,
    ) -> Result<(), ProtocolError> {
        self.authority.require_token(pub_key, token)?;
        if pub_key.verify(&payload, signature).is_err() {
            tracing::warn!(%pub_key, location, "rejected write with bad signature");
            return Err(ProtocolError::AuthenticationFailure(
                "signature does not match payload".into(),
            ));
        }
        self.store.write(location, payload).await?;
        tracing::debug!(%pub_key, location, "stored blob");
        Ok(())
    }

    /// Raw bytes at `location`
    pub async fn get(&self, location: &str) -> Result<Bytes, ProtocolError> {
        self.store
            .read(location)
            .await?
            .ok_or_else(|| ProtocolError::NotFound(location.to_string()))
    }

    /// Immediate children of a public prefix.
    ///
    /// Request and inbox directories are refused here; their owners list them
    /// through [`Host::requests`] and [`Host::inbox`].
    pub async fn list(&self, prefix: &str) -> Result<Vec<String>, ProtocolError> {
        if is_private_directory(prefix) {
            return Err(ProtocolError::AuthenticationFailure(format!(
                "{} can only be listed by its owner",
                prefix
            )));
        }
        Ok(self.store.list(prefix).await?)
    }

    pub async fn delete(
        &self,
        location: &str,
        pub_key: &PublicKey,
        token: &str,
    ) -> Result<(), ProtocolError> {
        self.authority.require_token(pub_key, token)?;
        self.store.delete(location).await?;
        tracing::debug!(%pub_key, location, "deleted blob");
        Ok(())
    }

    /// `POST /sub`: drop an unsigned subscription request for `target`.
    ///
    /// No token and no signature: either would tell us who is asking.
    pub async fn subscribe(
        &self,
        target: &PublicKey,
        ephemeral: &AgreementPublicKey,
        body: Bytes,
    ) -> Result<(), ProtocolError> {
        if body.is_empty() {
            return Err(ProtocolError::MalformedInput("empty request body".into()));
        }
        let path = Layout::new(target).request(ephemeral);
        self.store.write(&path, body).await?;
        Ok(())
    }

    /// `GET /reqs`: ephemeral key names of pending requests for `owner`
    pub async fn requests(
        &self,
        owner: &PublicKey,
        token: &str,
    ) -> Result<Vec<String>, ProtocolError> {
        self.authority.require_token(owner, token)?;
        Ok(self.store.list(&Layout::new(owner).requests()).await?)
    }

    /// `POST /inbox`: deliver a message envelope paid for with proof-of-work.
    ///
    /// Returns the message id, `hex(SHA-256(envelope))`.
    pub async fn send_message(
        &self,
        target: &PublicKey,
        body: Bytes,
        solution: &[u8],
    ) -> Result<ContentHash, ProtocolError> {
        self.authority.verify_message_pow(&body, solution)?;
        let id = ContentHash::of(&body);
        self.store.write(&Layout::new(target).message(&id), body).await?;
        tracing::debug!(%target, message_id = %id, "delivered inbox message");
        Ok(id)
    }

    /// `GET /inbox`: ids of messages waiting for `owner`
    pub async fn inbox(
        &self,
        owner: &PublicKey,
        token: &str,
    ) -> Result<Vec<String>, ProtocolError> {
        self.authority.require_token(owner, token)?;
        Ok(self.store.list(&Layout::new(owner).inbox()).await?)
    }

    /// Readiness: the store answers a listing
    pub async fn ready(&self) -> Result<(), ProtocolError> {
        self.store.list("").await?;
        Ok(())
    }
}

fn is_private_directory(prefix: &str) -> bool {
    prefix
        .trim_matches('/')
        .split('/')
        .nth(2)
        .map(|segment| PRIVATE_DIRECTORIES.contains(&segment))
        .unwrap_or(false)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::auth::Difficulties;
    use crate::crypto::{AgreementSecretKey, SecretKey};
    use crate::storage::ObjectFileStore;

    const EASY: Difficulties = Difficulties {
        user: 4,
        message: 4,
    };

    fn host() -> Host {
        Host::new(
            Authority::generate(EASY),
            Arc::new(ObjectFileStore::memory()),
        )
    }

    #[tokio::test]
    async fn test_put_requires_token_and_signature() {
        let host = host();
        let secret = SecretKey::generate();
        let public = secret.public();
        let token = host.authority().issue_token(&public);
        let location = Layout::new(&public).post(&ContentHash::of(b"blob"));
        let payload = Bytes::from_static(b"blob");

        let err = host
            .put(&location, payload.clone(), &secret.sign(&payload), &public, "bad")
            .await
            .unwrap_err();
        assert!(matches!(err, ProtocolError::AuthenticationFailure(_)));

        let err = host
            .put(&location, payload.clone(), &secret.sign(b"other"), &public, &token)
            .await
            .unwrap_err();
        assert!(matches!(err, ProtocolError::AuthenticationFailure(_)));
        assert!(host.get(&location).await.unwrap_err().is_not_found());

        host.put(&location, payload.clone(), &secret.sign(&payload), &public, &token)
            .await
            .unwrap();
        assert_eq!(host.get(&location).await.unwrap(), payload);

        host.delete(&location, &public, &token).await.unwrap();
        assert!(host.get(&location).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_requests_listing_is_owner_only() {
        let host = host();
        let target = SecretKey::generate().public();
        let ephemeral = AgreementSecretKey::generate().public();

        host.subscribe(&target, &ephemeral, Bytes::from_static(b"ciphertext"))
            .await
            .unwrap();

        let token = host.authority().issue_token(&target);
        assert_eq!(
            host.requests(&target, &token).await.unwrap(),
            vec![ephemeral.to_hex()]
        );
        assert!(host.requests(&target, "nope").await.is_err());
        assert!(host.list(&Layout::new(&target).requests()).await.is_err());
        assert!(host.list(&Layout::new(&target).posts()).await.is_ok());
    }

    #[tokio::test]
    async fn test_inbox_requires_message_pow() {
        let host = host();
        let target = SecretKey::generate().public();
        let body = Bytes::from_static(b"envelope");

        let challenge = host
            .authority()
            .challenge_for(&Capability::message(&body));
        let solution = crate::pow::solve(&challenge.bytes, challenge.threshold_bits()).unwrap();

        let id = host
            .send_message(&target, body.clone(), &solution)
            .await
            .unwrap();
        assert_eq!(id, ContentHash::of(&body));

        let token = host.authority().issue_token(&target);
        assert_eq!(host.inbox(&target, &token).await.unwrap(), vec![id.to_hex()]);
        assert!(host
            .send_message(&target, body, &[0u8; 4])
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_listing_missing_prefix_is_empty() {
        let host = host();
        assert!(host.list("users/nobody/posts").await.unwrap().is_empty());
        host.ready().await.unwrap();
    }

    #[test]
    fn test_private_directories() {
        assert!(is_private_directory("users/abc/reqs"));
        assert!(is_private_directory("/users/abc/inbox/"));
        assert!(!is_private_directory("users/abc/posts"));
        assert!(!is_private_directory("users/abc"));
    }
}
