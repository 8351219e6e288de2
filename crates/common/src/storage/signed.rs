use crate::crypto::{PublicKey, SecretKey, Signature, SIGNATURE_SIZE};
use crate::error::ProtocolError;

/// A record stored as `signature(64) || body`
///
/// Profiles and indexes are stored this way so any reader can check who
/// wrote them without trusting the host. Verification failure is a hard
/// error, never a fallback to "absent".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedRecord {
    signature: Signature,
    body: Vec<u8>,
}

impl SignedRecord {
    /// Sign `body` with `signer`
    pub fn seal(signer: &SecretKey, body: Vec<u8>) -> Self {
        Self {
            signature: signer.sign(&body),
            body,
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(SIGNATURE_SIZE + self.body.len());
        out.extend_from_slice(self.signature.as_bytes());
        out.extend_from_slice(&self.body);
        out
    }

    pub fn parse(bytes: &[u8]) -> Result<Self, ProtocolError> {
        if bytes.len() < SIGNATURE_SIZE {
            return Err(ProtocolError::MalformedInput(format!(
                "signed record shorter than a signature ({} bytes)",
                bytes.len()
            )));
        }
        let (signature, body) = bytes.split_at(SIGNATURE_SIZE);
        Ok(Self {
            signature: Signature::try_from(signature)?,
            body: body.to_vec(),
        })
    }

    /// Check the record was written by `signer` and return its body
    pub fn open(bytes: &[u8], signer: &PublicKey) -> Result<Vec<u8>, ProtocolError> {
        let record = Self::parse(bytes)?;
        if signer.verify(&record.body, &record.signature).is_err() {
            tracing::warn!(signer = %signer, "signed record failed verification");
            return Err(ProtocolError::VerificationFailed(format!(
                "record not signed by {}",
                signer
            )));
        }
        Ok(record.body)
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }
}
