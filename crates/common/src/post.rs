//! Posts, the post index and the public profile
//!
//! A post is serialized to JSON and encrypted under a fresh post key; the
//! hash of the ciphertext is its id. The post key is then wrapped under one
//! outer key per audience (see [`KeyGrant`]). The index listing an identity's
//! post ids and the profile publishing its world key are both signed records.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::crypto::{
    key_location, AgreementPublicKey, ContentHash, PublicKey, Secret, WrappedKey,
};
use crate::error::ProtocolError;
use crate::identity::Identity;
use crate::storage::SignedRecord;

/// What a post says
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PostContent {
    Text {
        body: String,
    },
    Code {
        language: String,
        source: String,
    },
    Link {
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub content: PostContent,
    pub created_at: DateTime<Utc>,
}

impl Post {
    pub fn new(content: PostContent) -> Self {
        Self {
            content,
            created_at: Utc::now(),
        }
    }

    pub fn text(body: impl Into<String>) -> Self {
        Self::new(PostContent::Text { body: body.into() })
    }

    /// Encrypt under a fresh post key
    pub fn seal(&self) -> Result<SealedPost, ProtocolError> {
        self.seal_with(Secret::generate())
    }

    /// Encrypt under a given post key.
    ///
    /// With the deterministic IV, the same post and key always produce the
    /// same ciphertext and therefore the same id.
    pub fn seal_with(&self, key: Secret) -> Result<SealedPost, ProtocolError> {
        let plaintext = serde_json::to_vec(self)?;
        let ciphertext = key.encrypt(&plaintext)?;
        Ok(SealedPost {
            id: ContentHash::of(&ciphertext),
            ciphertext,
            key,
        })
    }

    /// Decrypt a post's ciphertext with its post key
    pub fn open(ciphertext: &[u8], key: &Secret) -> Result<Self, ProtocolError> {
        let plaintext = key.decrypt(ciphertext)?;
        Ok(serde_json::from_slice(&plaintext)?)
    }
}

/// An encrypted post ready to be stored
#[derive(Debug, Clone)]
pub struct SealedPost {
    pub id: ContentHash,
    pub ciphertext: Vec<u8>,
    pub key: Secret,
}

/// Who can read a post
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    /// Anyone holding the current world key
    #[default]
    World,
    /// Only accepted subscribers (and the author)
    Subscribers,
}

impl FromStr for Visibility {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "world" => Ok(Visibility::World),
            "subscribers" => Ok(Visibility::Subscribers),
            other => Err(ProtocolError::MalformedInput(format!(
                "unknown visibility '{}'",
                other
            ))),
        }
    }
}

/// A post key wrapped under one outer key, and where to store it
#[derive(Debug, Clone)]
pub struct KeyGrant {
    pub location: ContentHash,
    pub wrapped: WrappedKey,
}

impl KeyGrant {
    pub fn new(
        post_key: &Secret,
        post_id: &ContentHash,
        outer: &Secret,
    ) -> Result<Self, ProtocolError> {
        Ok(Self {
            location: key_location(outer, post_id),
            wrapped: WrappedKey::wrap(post_key, outer)?,
        })
    }

    /// Grant for anyone holding `world_key`
    pub fn for_world(
        post_key: &Secret,
        post_id: &ContentHash,
        world_key: &Secret,
    ) -> Result<Self, ProtocolError> {
        Self::new(post_key, post_id, world_key)
    }

    /// Grant for the holder of `reader`'s agreement secret
    pub fn for_reader(
        post_key: &Secret,
        post_id: &ContentHash,
        author: &Identity,
        reader: &AgreementPublicKey,
    ) -> Result<Self, ProtocolError> {
        let outer = author.agreement_key().derive(reader);
        Self::new(post_key, post_id, &outer)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub id: ContentHash,
}

/// Ordered list of an identity's post ids.
///
/// Concurrent sessions of one identity race on this read-modify-write; the
/// later `updatedAt` simply wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Index {
    pub posts: Vec<IndexEntry>,
    pub updated_at: DateTime<Utc>,
}

impl Default for Index {
    fn default() -> Self {
        Self {
            posts: Vec::new(),
            updated_at: Utc::now(),
        }
    }
}

impl Index {
    pub fn contains(&self, id: &ContentHash) -> bool {
        self.posts.iter().any(|entry| &entry.id == id)
    }

    /// Append `id` unless already present; returns whether it was added
    pub fn insert(&mut self, id: ContentHash) -> bool {
        if self.contains(&id) {
            return false;
        }
        self.posts.push(IndexEntry { id });
        self.updated_at = Utc::now();
        true
    }

    /// Drop `id`; returns whether it was present
    pub fn remove(&mut self, id: &ContentHash) -> bool {
        let before = self.posts.len();
        self.posts.retain(|entry| &entry.id != id);
        let removed = self.posts.len() != before;
        if removed {
            self.updated_at = Utc::now();
        }
        removed
    }

    pub fn ids(&self) -> impl Iterator<Item = &ContentHash> {
        self.posts.iter().map(|entry| &entry.id)
    }

    pub fn seal(&self, identity: &Identity) -> Result<SignedRecord, ProtocolError> {
        Ok(SignedRecord::seal(
            identity.signing_key(),
            serde_json::to_vec(self)?,
        ))
    }

    pub fn open(bytes: &[u8], author: &PublicKey) -> Result<Self, ProtocolError> {
        let body = SignedRecord::open(bytes, author)?;
        Ok(serde_json::from_slice(&body)?)
    }
}

/// The signed public face of an identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Published in the clear: it is what makes world posts world-readable
    pub world_key: Secret,
    pub agreement_key: AgreementPublicKey,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    pub fn for_identity(identity: &Identity, name: Option<String>) -> Self {
        Self {
            name,
            world_key: identity.world_key().clone(),
            agreement_key: identity.agreement_public(),
            updated_at: Utc::now(),
        }
    }

    pub fn seal(&self, identity: &Identity) -> Result<SignedRecord, ProtocolError> {
        Ok(SignedRecord::seal(
            identity.signing_key(),
            serde_json::to_vec(self)?,
        ))
    }

    pub fn open(bytes: &[u8], author: &PublicKey) -> Result<Self, ProtocolError> {
        let body = SignedRecord::open(bytes, author)?;
        Ok(serde_json::from_slice(&body)?)
    }
}
