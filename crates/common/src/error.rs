//! The protocol-wide error taxonomy.
//!
//! Module errors (`KeyError`, `SecretError`, `PowError`, ...) stay local to
//! their modules; everything that crosses the host/client boundary is folded
//! into a [`ProtocolError`] so callers can branch on the *kind* of failure.

use crate::codec::CodecError;
use crate::crypto::{KeyError, SecretError};
use crate::pow::PowError;
use crate::storage::StorageError;

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Missing or unparsable pubkey, signature, location or body
    #[error("malformed input: {0}")]
    MalformedInput(String),
    /// Bad token, bad signature on a request, or an invalid proof-of-work
    #[error("authentication failed: {0}")]
    AuthenticationFailure(String),
    /// Nothing stored at the requested path
    #[error("not found: {0}")]
    NotFound(String),
    /// The backing store failed; safe to retry
    #[error("storage failure: {0}")]
    StorageFailure(String),
    /// The proof-of-work search ran out of candidates
    #[error("proof-of-work exhausted")]
    ProtocolExhaustion,
    /// Fetched content failed signature verification or decryption
    #[error("verification failed: {0}")]
    VerificationFailed(String),
    /// A long-running step was abandoned before completing
    #[error("operation cancelled")]
    Cancelled,
}

impl ProtocolError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ProtocolError::NotFound(_))
    }

    /// Failures worth surfacing in security logs
    pub fn is_security_relevant(&self) -> bool {
        matches!(
            self,
            ProtocolError::AuthenticationFailure(_) | ProtocolError::VerificationFailed(_)
        )
    }
}

impl From<CodecError> for ProtocolError {
    fn from(err: CodecError) -> Self {
        ProtocolError::MalformedInput(err.to_string())
    }
}

impl From<KeyError> for ProtocolError {
    fn from(err: KeyError) -> Self {
        match err {
            KeyError::VerificationFailed => ProtocolError::VerificationFailed(err.to_string()),
            _ => ProtocolError::MalformedInput(err.to_string()),
        }
    }
}

impl From<SecretError> for ProtocolError {
    fn from(err: SecretError) -> Self {
        match err {
            SecretError::DecryptFailed | SecretError::Malformed(_) => {
                ProtocolError::VerificationFailed(err.to_string())
            }
            _ => ProtocolError::MalformedInput(err.to_string()),
        }
    }
}

impl From<PowError> for ProtocolError {
    fn from(err: PowError) -> Self {
        match err {
            PowError::Exhausted => ProtocolError::ProtocolExhaustion,
            PowError::Cancelled => ProtocolError::Cancelled,
        }
    }
}

impl From<serde_json::Error> for ProtocolError {
    fn from(err: serde_json::Error) -> Self {
        ProtocolError::MalformedInput(format!("json: {}", err))
    }
}

impl From<StorageError> for ProtocolError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::InvalidPath(..) => ProtocolError::MalformedInput(err.to_string()),
            _ => ProtocolError::StorageFailure(err.to_string()),
        }
    }
}
