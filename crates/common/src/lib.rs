/**
 * Client-side protocol flows: the `Remote` seam
 *  and the `Session` driving it for one identity.
 */
pub mod client;
/**
 * Hex encoding and byte buffer helpers.
 */
pub mod codec;
/**
 * Cryptographic types and operations.
 *  - Signing and key-agreement keys
 *  - Deterministic-IV symmetric encryption
 *  - Post key wrapping
 */
pub mod crypto;
/**
 * Errors shared across the host/client boundary.
 */
pub mod error;
/**
 * The untrusted host: token-gated blob storage,
 *  subscription drop boxes and inboxes.
 */
pub mod host;
/**
 * A client identity and its PEM file.
 */
pub mod identity;
/**
 * Capability challenges and session tokens.
 */
pub mod auth;
/**
 * Posts, the signed post index and profiles.
 */
pub mod post;
/**
 * Proof-of-work search and verification.
 */
pub mod pow;
/**
 * Byte storage abstraction and the
 *  per-identity storage layout.
 */
pub mod storage;
/**
 * Subscription requests and inbox messages.
 */
pub mod subscription;

pub mod prelude {
    pub use crate::auth::{Authority, Capability, Difficulties};
    pub use crate::client::{Remote, Session};
    pub use crate::crypto::{ContentHash, PublicKey, Secret, SecretKey};
    pub use crate::error::ProtocolError;
    pub use crate::host::Host;
    pub use crate::identity::Identity;
    pub use crate::post::{Post, PostContent, Visibility};
    pub use crate::storage::{FileStore, ObjectFileStore, StoreConfig};
}
