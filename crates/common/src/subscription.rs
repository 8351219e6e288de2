//! Subscription requests and inbox messages
//!
//! Both travel as one-way ephemeral key agreement envelopes. The sender
//! generates a throwaway agreement keypair and derives a shared secret with
//! the recipient's signing key reinterpreted as an agreement key, so the
//! recipient never has to be online or publish anything first. The host only
//! ever sees the ephemeral public key and ciphertext.
//!
//! ```text
//! request:  stored at users/{target}/reqs/{ephemeralHex}
//!           body = encrypt(json{requesterPubKey, message})
//! message:  stored at users/{target}/inbox/{sha256(envelope)}
//!           envelope = ephemeralPub(65) || encrypt(json{from, text, sentAt, signature})
//!           signature over target || text || sentAt
//! ```
//!
//! Accepting a request is purely local: the target adds the requester to its
//! own subscriber set and starts wrapping subscriber posts for them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::codec;
use crate::crypto::{
    AgreementPublicKey, AgreementSecretKey, ContentHash, PublicKey, Secret, Signature,
    PUBLIC_KEY_SIZE,
};
use crate::error::ProtocolError;
use crate::identity::Identity;

/// Decrypted body of a subscription request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionRequest {
    #[serde(rename = "requesterPubKey")]
    pub requester: PublicKey,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// A request as it is handed to the host
#[derive(Debug, Clone)]
pub struct SealedRequest {
    /// Doubles as the storage name of the request
    pub ephemeral: AgreementPublicKey,
    pub ciphertext: Vec<u8>,
}

/// One-time secret between a fresh ephemeral key and `target`'s handle
fn one_way_secret(target: &PublicKey) -> (AgreementPublicKey, Secret) {
    let ephemeral = AgreementSecretKey::generate();
    let secret = ephemeral.derive(&target.to_agreement_key());
    (ephemeral.public(), secret)
}

/// The recipient's side of [`one_way_secret`]
fn recipient_secret(recipient: &Identity, ephemeral: &AgreementPublicKey) -> Secret {
    recipient.signing_key().to_agreement_key().derive(ephemeral)
}

impl SubscriptionRequest {
    /// Encrypt a request from `requester` to `target`.
    ///
    /// Deliberately unsigned: a signature would reveal the requester to the
    /// host.
    pub fn seal(&self, target: &PublicKey) -> Result<SealedRequest, ProtocolError> {
        let (ephemeral, secret) = one_way_secret(target);
        let ciphertext = secret.encrypt(&serde_json::to_vec(self)?)?;
        Ok(SealedRequest {
            ephemeral,
            ciphertext,
        })
    }

    /// Decrypt a request stored under the name `ephemeral_hex`
    pub fn open(
        target: &Identity,
        ephemeral_hex: &str,
        ciphertext: &[u8],
    ) -> Result<Self, ProtocolError> {
        let ephemeral = AgreementPublicKey::from_hex(ephemeral_hex)?;
        let plaintext = recipient_secret(target, &ephemeral).decrypt(ciphertext)?;
        Ok(serde_json::from_slice(&plaintext)?)
    }
}

/// A decrypted and verified inbox message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboxMessage {
    pub from: PublicKey,
    pub text: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub sent_at: DateTime<Utc>,
    pub signature: Signature,
}

fn message_signing_bytes(target: &PublicKey, text: &str, sent_at: &DateTime<Utc>) -> Vec<u8> {
    codec::concat(&[
        target.as_bytes(),
        text.as_bytes(),
        &sent_at.timestamp_millis().to_be_bytes(),
    ])
}

impl InboxMessage {
    /// Build the envelope `sender` delivers to `target`
    pub fn seal(
        sender: &Identity,
        target: &PublicKey,
        text: &str,
    ) -> Result<Vec<u8>, ProtocolError> {
        let sent_at = Utc::now();
        let signature = sender
            .signing_key()
            .sign(&message_signing_bytes(target, text, &sent_at));
        let message = InboxMessage {
            from: sender.public(),
            text: text.to_string(),
            sent_at,
            signature,
        };

        let (ephemeral, secret) = one_way_secret(target);
        let ciphertext = secret.encrypt(&serde_json::to_vec(&message)?)?;
        Ok(codec::concat(&[&ephemeral.to_bytes(), &ciphertext]))
    }

    /// Decrypt an envelope addressed to `target` and check who sent it.
    ///
    /// A bad inner signature is a hard failure.
    pub fn open(target: &Identity, envelope: &[u8]) -> Result<Self, ProtocolError> {
        if envelope.len() <= PUBLIC_KEY_SIZE {
            return Err(ProtocolError::MalformedInput(format!(
                "inbox envelope too short ({} bytes)",
                envelope.len()
            )));
        }
        let (ephemeral, ciphertext) = envelope.split_at(PUBLIC_KEY_SIZE);
        let ephemeral = AgreementPublicKey::from_bytes(ephemeral)?;
        let plaintext = recipient_secret(target, &ephemeral).decrypt(ciphertext)?;
        let message: InboxMessage = serde_json::from_slice(&plaintext)?;

        let signed = message_signing_bytes(&target.public(), &message.text, &message.sent_at);
        if message.from.verify(&signed, &message.signature).is_err() {
            tracing::warn!(from = %message.from, "inbox message failed signature check");
            return Err(ProtocolError::VerificationFailed(format!(
                "message not signed by {}",
                message.from
            )));
        }
        Ok(message)
    }

    /// Id an envelope is stored under
    pub fn id(envelope: &[u8]) -> ContentHash {
        ContentHash::of(envelope)
    }
}
