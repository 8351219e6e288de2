//! Client side of the protocol
//!
//! [`Remote`] is everything a client can ask of a host. [`Host`] implements
//! it in-process; the daemon crate implements it over HTTP. [`Session`]
//! drives multi-step flows (authenticate, publish and wrap, subscribe, message)
//! on top of any remote for one explicit [`Identity`]. Every flow stops at its
//! first failing step.

use std::collections::BTreeSet;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::watch;

use crate::auth::{Capability, Challenge, ChallengeResponse};
use crate::crypto::{
    key_location, AgreementPublicKey, ContentHash, PublicKey, Secret, Signature, WrappedKey,
};
use crate::error::ProtocolError;
use crate::host::Host;
use crate::identity::Identity;
use crate::post::{Index, KeyGrant, Post, Profile, SealedPost, Visibility};
use crate::storage::{Layout, SignedRecord};
use crate::subscription::{InboxMessage, SubscriptionRequest};

/// The host operations a client can call
#[async_trait]
pub trait Remote: Send + Sync {
    async fn auth(&self, capability: &Capability) -> Result<Vec<u8>, ProtocolError>;

    async fn chal(&self, body: Vec<u8>) -> Result<String, ProtocolError>;

    async fn put(
        &self,
        location: &str,
        payload: Vec<u8>,
        signature: &Signature,
        pub_key: &PublicKey,
        token: &str,
    ) -> Result<(), ProtocolError>;

    async fn get(&self, location: &str) -> Result<Vec<u8>, ProtocolError>;

    async fn list(&self, prefix: &str) -> Result<Vec<String>, ProtocolError>;

    async fn delete(
        &self,
        location: &str,
        pub_key: &PublicKey,
        token: &str,
    ) -> Result<(), ProtocolError>;

    async fn subscribe(
        &self,
        target: &PublicKey,
        ephemeral: &AgreementPublicKey,
        body: Vec<u8>,
    ) -> Result<(), ProtocolError>;

    async fn requests(&self, owner: &PublicKey, token: &str)
        -> Result<Vec<String>, ProtocolError>;

    async fn send_message(
        &self,
        target: &PublicKey,
        body: Vec<u8>,
        solution: &[u8],
    ) -> Result<ContentHash, ProtocolError>;

    async fn inbox(&self, owner: &PublicKey, token: &str) -> Result<Vec<String>, ProtocolError>;

    /// Fetch a signed record and return its body if `signer` wrote it.
    ///
    /// `NotFound` stays distinct from a record that is present but invalid.
    async fn get_signed(
        &self,
        location: &str,
        signer: &PublicKey,
    ) -> Result<Vec<u8>, ProtocolError> {
        let bytes = self.get(location).await?;
        SignedRecord::open(&bytes, signer)
    }
}

#[async_trait]
impl Remote for Host {
    async fn auth(&self, capability: &Capability) -> Result<Vec<u8>, ProtocolError> {
        Ok(Host::auth(self, capability))
    }

    async fn chal(&self, body: Vec<u8>) -> Result<String, ProtocolError> {
        Host::chal(self, &body)
    }

    async fn put(
        &self,
        location: &str,
        payload: Vec<u8>,
        signature: &Signature,
        pub_key: &PublicKey,
        token: &str,
    ) -> Result<(), ProtocolError> {
        Host::put(self, location, Bytes::from(payload), signature, pub_key, token).await
    }

    async fn get(&self, location: &str) -> Result<Vec<u8>, ProtocolError> {
        Ok(Host::get(self, location).await?.to_vec())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, ProtocolError> {
        Host::list(self, prefix).await
    }

    async fn delete(
        &self,
        location: &str,
        pub_key: &PublicKey,
        token: &str,
    ) -> Result<(), ProtocolError> {
        Host::delete(self, location, pub_key, token).await
    }

    async fn subscribe(
        &self,
        target: &PublicKey,
        ephemeral: &AgreementPublicKey,
        body: Vec<u8>,
    ) -> Result<(), ProtocolError> {
        Host::subscribe(self, target, ephemeral, Bytes::from(body)).await
    }

    async fn requests(
        &self,
        owner: &PublicKey,
        token: &str,
    ) -> Result<Vec<String>, ProtocolError> {
        Host::requests(self, owner, token).await
    }

    async fn send_message(
        &self,
        target: &PublicKey,
        body: Vec<u8>,
        solution: &[u8],
    ) -> Result<ContentHash, ProtocolError> {
        Host::send_message(self, target, Bytes::from(body), solution).await
    }

    async fn inbox(&self, owner: &PublicKey, token: &str) -> Result<Vec<String>, ProtocolError> {
        Host::inbox(self, owner, token).await
    }
}

/// Something received in a private directory, decrypted or not.
///
/// Anyone can drop ciphertext into a request or inbox directory, so one bad
/// entry is reported next to the good ones instead of failing the listing.
#[derive(Debug)]
pub struct Delivery<T> {
    /// Storage name: the ephemeral key of a request, the id of a message
    pub name: String,
    pub content: Result<T, ProtocolError>,
}

/// A post as it appears in a feed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedItem {
    pub id: ContentHash,
    pub post: Post,
}

/// One identity talking to one host
pub struct Session<R> {
    remote: R,
    identity: Identity,
    name: Option<String>,
    token: Option<String>,
    subscribers: BTreeSet<PublicKey>,
    identity_tx: watch::Sender<PublicKey>,
}

impl<R> std::fmt::Debug for Session<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("identity", &self.identity.public())
            .field("authenticated", &self.token.is_some())
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

impl<R: Remote> Session<R> {
    pub fn new(remote: R, identity: Identity) -> Self {
        let (identity_tx, _) = watch::channel(identity.public());
        Self {
            remote,
            identity,
            name: None,
            token: None,
            subscribers: BTreeSet::new(),
            identity_tx,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Start from subscribers accepted in an earlier session
    pub fn with_subscribers(mut self, subscribers: impl IntoIterator<Item = PublicKey>) -> Self {
        self.subscribers.extend(subscribers);
        self
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn public(&self) -> PublicKey {
        self.identity.public()
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn subscribers(&self) -> &BTreeSet<PublicKey> {
        &self.subscribers
    }

    /// Notified with the public key whenever the identity or its world key changes
    pub fn watch_identity(&self) -> watch::Receiver<PublicKey> {
        self.identity_tx.subscribe()
    }

    /// Switch to another identity, dropping everything tied to the old one
    pub fn replace_identity(&mut self, identity: Identity) {
        self.identity = identity;
        self.token = None;
        self.subscribers.clear();
        self.identity_tx.send_replace(self.identity.public());
    }

    async fn solve(challenge: Challenge) -> Result<[u8; 32], ProtocolError> {
        Ok(challenge.solve().join().await?)
    }

    /// Run the challenge flow and cache the issued token
    pub async fn authenticate(&mut self) -> Result<String, ProtocolError> {
        let public = self.identity.public();
        let wire = self
            .remote
            .auth(&Capability::User { pub_key: public })
            .await?;
        let challenge = Challenge::from_wire(&wire)?;
        tracing::debug!(difficulty = challenge.difficulty, "solving user challenge");

        let solution = Self::solve(challenge).await?;
        let response = ChallengeResponse {
            public_key: public,
            solution,
            signature: self.identity.signing_key().sign(&solution),
        };
        let token = self.remote.chal(response.to_bytes()).await?;
        self.token = Some(token.clone());
        tracing::info!(pub_key = %public, "authenticated");
        Ok(token)
    }

    async fn ensure_token(&mut self) -> Result<String, ProtocolError> {
        match &self.token {
            Some(token) => Ok(token.clone()),
            None => self.authenticate().await,
        }
    }

    async fn put_signed(&mut self, location: &str, payload: Vec<u8>) -> Result<(), ProtocolError> {
        let token = self.ensure_token().await?;
        let signature = self.identity.signing_key().sign(&payload);
        self.remote
            .put(location, payload, &signature, &self.identity.public(), &token)
            .await
    }

    fn layout(&self) -> Layout {
        Layout::new(&self.identity.public())
    }

    pub async fn publish_profile(&mut self) -> Result<Profile, ProtocolError> {
        let profile = Profile::for_identity(&self.identity, self.name.clone());
        let record = profile.seal(&self.identity)?;
        let location = self.layout().profile();
        self.put_signed(&location, record.to_bytes()).await?;
        Ok(profile)
    }

    pub async fn fetch_profile(&self, author: &PublicKey) -> Result<Profile, ProtocolError> {
        let bytes = self.remote.get(&Layout::new(author).profile()).await?;
        Profile::open(&bytes, author)
    }

    /// The index of `author`, verified against their key
    pub async fn fetch_index(&self, author: &PublicKey) -> Result<Index, ProtocolError> {
        let bytes = self.remote.get(&Layout::new(author).index()).await?;
        Index::open(&bytes, author)
    }

    async fn own_index(&self) -> Result<Index, ProtocolError> {
        match self.fetch_index(&self.identity.public()).await {
            Ok(index) => Ok(index),
            Err(e) if e.is_not_found() => Ok(Index::default()),
            Err(e) => Err(e),
        }
    }

    async fn store_index(&mut self, index: &Index) -> Result<(), ProtocolError> {
        let record = index.seal(&self.identity)?;
        let location = self.layout().index();
        self.put_signed(&location, record.to_bytes()).await
    }

    async fn store_grant(&mut self, grant: KeyGrant) -> Result<(), ProtocolError> {
        let location = self.layout().key(&grant.location);
        self.put_signed(&location, grant.wrapped.into_bytes()).await
    }

    /// Encrypt, store, grant access to and index a post
    pub async fn publish(
        &mut self,
        post: &Post,
        visibility: Visibility,
    ) -> Result<ContentHash, ProtocolError> {
        let SealedPost {
            id,
            ciphertext,
            key,
        } = post.seal()?;

        // the author can always get back to their own posts
        let own = self.identity.agreement_public();
        let mut grants = vec![KeyGrant::for_reader(&key, &id, &self.identity, &own)?];
        match visibility {
            Visibility::World => {
                grants.push(KeyGrant::for_world(&key, &id, self.identity.world_key())?);
            }
            Visibility::Subscribers => {
                // every reader key is resolved before anything is written
                for subscriber in &self.subscribers {
                    let profile = self.fetch_profile(subscriber).await?;
                    grants.push(KeyGrant::for_reader(
                        &key,
                        &id,
                        &self.identity,
                        &profile.agreement_key,
                    )?);
                }
            }
        }

        let location = self.layout().post(&id);
        self.put_signed(&location, ciphertext).await?;
        for grant in grants {
            self.store_grant(grant).await?;
        }

        let mut index = self.own_index().await?;
        if index.insert(id) {
            self.store_index(&index).await?;
        }
        tracing::info!(post_id = %id, ?visibility, "published post");
        Ok(id)
    }

    /// Unwrap and decrypt one post of `author` using a specific outer key
    pub async fn decrypt_post(
        &self,
        author: &PublicKey,
        post_id: &ContentHash,
        outer: &Secret,
    ) -> Result<Post, ProtocolError> {
        let layout = Layout::new(author);
        let wrapped = self
            .remote
            .get(&layout.key(&key_location(outer, post_id)))
            .await?;
        let post_key = WrappedKey::from(wrapped).unwrap(outer)?;
        let ciphertext = self.remote.get(&layout.post(post_id)).await?;
        Post::open(&ciphertext, &post_key)
    }

    /// Outer keys this session could hold for `author`'s posts, world key first
    async fn outer_keys(&self, author: &PublicKey) -> Result<Vec<Secret>, ProtocolError> {
        if author == &self.identity.public() {
            let own = self.identity.agreement_public();
            return Ok(vec![
                self.identity.world_key().clone(),
                self.identity.agreement_key().derive(&own),
            ]);
        }
        let profile = self.fetch_profile(author).await?;
        Ok(vec![
            profile.world_key,
            self.identity.agreement_key().derive(&profile.agreement_key),
        ])
    }

    /// Read a post trying the world key, then the pairwise key.
    ///
    /// `NotFound` means no key this session holds was granted the post.
    pub async fn read_post(
        &self,
        author: &PublicKey,
        post_id: &ContentHash,
    ) -> Result<Post, ProtocolError> {
        let mut last = ProtocolError::NotFound(format!("no readable key for post {}", post_id));
        for outer in self.outer_keys(author).await? {
            match self.decrypt_post(author, post_id, &outer).await {
                Ok(post) => return Ok(post),
                Err(e) if e.is_not_found() => last = e,
                Err(e) => return Err(e),
            }
        }
        Err(last)
    }

    /// Every post of `author` this session can read, in index order
    pub async fn feed(&self, author: &PublicKey) -> Result<Vec<FeedItem>, ProtocolError> {
        let index = match self.fetch_index(author).await {
            Ok(index) => index,
            Err(e) if e.is_not_found() => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let mut items = Vec::new();
        for id in index.ids() {
            match self.read_post(author, id).await {
                Ok(post) => items.push(FeedItem { id: *id, post }),
                Err(e) if e.is_not_found() => {
                    tracing::debug!(post_id = %id, "skipping post without a readable key");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(items)
    }

    pub async fn delete_post(&mut self, post_id: &ContentHash) -> Result<(), ProtocolError> {
        let token = self.ensure_token().await?;
        let location = self.layout().post(post_id);
        self.remote
            .delete(&location, &self.identity.public(), &token)
            .await?;

        let mut index = self.own_index().await?;
        if index.remove(post_id) {
            self.store_index(&index).await?;
        }
        tracing::info!(%post_id, "deleted post");
        Ok(())
    }

    /// Ask `target` for a subscription without revealing ourselves to the host
    pub async fn subscribe_to(
        &self,
        target: &PublicKey,
        message: Option<String>,
    ) -> Result<AgreementPublicKey, ProtocolError> {
        let request = SubscriptionRequest {
            requester: self.identity.public(),
            message,
        };
        let sealed = request.seal(target)?;
        self.remote
            .subscribe(target, &sealed.ephemeral, sealed.ciphertext)
            .await?;
        Ok(sealed.ephemeral)
    }

    pub async fn pending_requests(
        &mut self,
    ) -> Result<Vec<Delivery<SubscriptionRequest>>, ProtocolError> {
        let token = self.ensure_token().await?;
        let layout = self.layout();
        let names = self.remote.requests(&self.identity.public(), &token).await?;

        let mut pending = Vec::with_capacity(names.len());
        for name in names {
            let path = format!("{}/{}", layout.requests(), name);
            let content = match self.remote.get(&path).await {
                Ok(ciphertext) => SubscriptionRequest::open(&self.identity, &name, &ciphertext),
                Err(e) => Err(e),
            };
            if let Err(e) = &content {
                tracing::warn!(request = %name, error = %e, "undecryptable subscription request");
            }
            pending.push(Delivery { name, content });
        }
        Ok(pending)
    }

    /// Record `requester` as a subscriber; purely local.
    ///
    /// Returns false if they already were one.
    pub fn accept(&mut self, requester: PublicKey) -> bool {
        self.subscribers.insert(requester)
    }

    /// Remove a handled request from the host
    pub async fn dismiss_request(&mut self, name: &str) -> Result<(), ProtocolError> {
        let token = self.ensure_token().await?;
        let path = format!("{}/{}", self.layout().requests(), name);
        self.remote
            .delete(&path, &self.identity.public(), &token)
            .await
    }

    /// Pay for and deliver a signed message to `target`'s inbox
    pub async fn send_message(
        &self,
        target: &PublicKey,
        text: &str,
    ) -> Result<ContentHash, ProtocolError> {
        let envelope = InboxMessage::seal(&self.identity, target, text)?;
        let wire = self.remote.auth(&Capability::message(&envelope)).await?;
        let challenge = Challenge::from_wire(&wire)?;
        let solution = Self::solve(challenge).await?;
        self.remote.send_message(target, envelope, &solution).await
    }

    pub async fn read_inbox(&mut self) -> Result<Vec<Delivery<InboxMessage>>, ProtocolError> {
        let token = self.ensure_token().await?;
        let layout = self.layout();
        let ids = self.remote.inbox(&self.identity.public(), &token).await?;

        let mut messages = Vec::with_capacity(ids.len());
        for name in ids {
            let content = match ContentHash::from_hex(&name) {
                Ok(message_id) => match self.remote.get(&layout.message(&message_id)).await {
                    Ok(envelope) => InboxMessage::open(&self.identity, &envelope),
                    Err(e) => Err(e),
                },
                Err(e) => Err(e.into()),
            };
            if let Err(e) = &content {
                tracing::warn!(message = %name, error = %e, "rejected inbox message");
            }
            messages.push(Delivery { name, content });
        }
        Ok(messages)
    }

    /// Replace the world key without advertising it.
    ///
    /// The host keeps serving the old profile until [`Self::publish_profile`].
    pub fn replace_world_key(&mut self) -> &Identity {
        self.identity.rotate_world_key();
        self.identity_tx.send_replace(self.identity.public());
        tracing::info!("rotated world key");
        &self.identity
    }

    /// Replace the world key and republish the profile with it
    pub async fn rotate_world_key(&mut self) -> Result<Profile, ProtocolError> {
        self.replace_world_key();
        self.publish_profile().await
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use super::*;
    use crate::auth::{Authority, Difficulties};
    use crate::storage::ObjectFileStore;

    fn host() -> Host {
        Host::new(
            Authority::generate(Difficulties {
                user: 4,
                message: 4,
            }),
            Arc::new(ObjectFileStore::memory()),
        )
    }

    #[tokio::test]
    async fn test_authenticate_caches_token() {
        let host = host();
        let mut session = Session::new(host.clone(), Identity::generate());
        assert!(session.token().is_none());

        let token = session.authenticate().await.unwrap();
        assert_eq!(session.token(), Some(token.as_str()));
        assert!(host.authority().verify_token(&session.public(), &token));
    }

    #[tokio::test]
    async fn test_publish_and_read_own_posts() {
        let mut session = Session::new(host(), Identity::generate());
        let world = session
            .publish(&Post::text("public"), Visibility::World)
            .await
            .unwrap();
        let private = session
            .publish(&Post::text("private"), Visibility::Subscribers)
            .await
            .unwrap();

        let me = session.public();
        let feed = session.feed(&me).await.unwrap();
        let ids: Vec<_> = feed.iter().map(|item| item.id).collect();
        assert_eq!(ids, vec![world, private]);
    }

    #[tokio::test]
    async fn test_publish_to_subscriber_without_profile_writes_nothing() {
        let host = host();
        let mut session = Session::new(host.clone(), Identity::generate())
            .with_subscribers([Identity::generate().public()]);

        let err = session
            .publish(&Post::text("for subscribers"), Visibility::Subscribers)
            .await
            .unwrap_err();
        assert!(err.is_not_found());

        let layout = Layout::new(&session.public());
        assert!(host.list(layout.root()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_post() {
        let mut session = Session::new(host(), Identity::generate());
        let id = session
            .publish(&Post::text("short lived"), Visibility::World)
            .await
            .unwrap();
        session.delete_post(&id).await.unwrap();

        let me = session.public();
        assert!(session.feed(&me).await.unwrap().is_empty());
        assert!(session.read_post(&me, &id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_identity_watch() {
        let mut session = Session::new(host(), Identity::generate());
        let mut rx = session.watch_identity();
        assert_eq!(*rx.borrow_and_update(), session.public());

        session.rotate_world_key().await.unwrap();
        assert!(rx.has_changed().unwrap());
        rx.borrow_and_update();

        let next = Identity::generate();
        let next_public = next.public();
        session.replace_identity(next);
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), next_public);
        assert!(session.token().is_none());
    }
}
