use std::fmt;

use p256::ecdsa::signature::{Signer, Verifier};
use p256::ecdsa::{Signature as EcdsaSignature, SigningKey, VerifyingKey};
use p256::elliptic_curve::sec1::ToEncodedPoint;
use serde::{Deserialize, Serialize};

use super::secret::{Secret, SECRET_SIZE};
use crate::codec::{self, CodecError};

/// Size of a P-256 private scalar in bytes
pub const PRIVATE_KEY_SIZE: usize = 32;
/// Size of an uncompressed SEC1 P-256 point in bytes
pub const PUBLIC_KEY_SIZE: usize = 65;
/// Size of a fixed-width `r || s` ECDSA signature in bytes
pub const SIGNATURE_SIZE: usize = 64;

const SEC1_UNCOMPRESSED_TAG: u8 = 0x04;

/// Errors that can occur during key operations
#[derive(Debug, thiserror::Error)]
pub enum KeyError {
    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),
    #[error("invalid secret key")]
    InvalidSecretKey,
    #[error("invalid signature encoding, expected {SIGNATURE_SIZE} bytes, got {0}")]
    InvalidSignature(usize),
    #[error("signature verification failed")]
    VerificationFailed,
    #[error("hex error: {0}")]
    Codec(#[from] CodecError),
    #[error("PEM error: {0}")]
    Pem(String),
}

fn random_scalar_bytes() -> [u8; PRIVATE_KEY_SIZE] {
    let mut bytes = [0u8; PRIVATE_KEY_SIZE];
    getrandom::getrandom(&mut bytes).expect("failed to generate random bytes");
    bytes
}

/// Public signing key: the durable pseudonymous handle of an identity
///
/// Held as the 65-byte uncompressed SEC1 encoding, which is exactly what
/// travels in `/chal` bodies and, hex-encoded, in headers and storage paths.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PublicKey([u8; PUBLIC_KEY_SIZE]);

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", self.to_hex())
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl TryFrom<&[u8]> for PublicKey {
    type Error = KeyError;
    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        if bytes.len() != PUBLIC_KEY_SIZE || bytes[0] != SEC1_UNCOMPRESSED_TAG {
            return Err(KeyError::InvalidPublicKey(format!(
                "expected {} byte uncompressed point, got {} bytes",
                PUBLIC_KEY_SIZE,
                bytes.len()
            )));
        }
        VerifyingKey::from_sec1_bytes(bytes)
            .map_err(|_| KeyError::InvalidPublicKey("point not on curve".into()))?;
        let mut buff = [0; PUBLIC_KEY_SIZE];
        buff.copy_from_slice(bytes);
        Ok(Self(buff))
    }
}

impl TryFrom<String> for PublicKey {
    type Error = KeyError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_hex(&value)
    }
}

impl std::str::FromStr for PublicKey {
    type Err = KeyError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl From<PublicKey> for String {
    fn from(key: PublicKey) -> Self {
        key.to_hex()
    }
}

impl PublicKey {
    /// Parse a public key from a hexadecimal string
    ///
    /// Accepts both plain hex and "0x"-prefixed hex strings.
    pub fn from_hex(hex: &str) -> Result<Self, KeyError> {
        let bytes = codec::decode(hex)?;
        Self::try_from(bytes.as_slice())
    }

    pub fn to_bytes(&self) -> [u8; PUBLIC_KEY_SIZE] {
        self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        codec::encode(self.0)
    }

    /// Verify an ECDSA P-256/SHA-256 signature over `msg`.
    pub fn verify(&self, msg: &[u8], signature: &Signature) -> Result<(), KeyError> {
        let verifying_key = VerifyingKey::from_sec1_bytes(&self.0)
            .map_err(|_| KeyError::InvalidPublicKey("point not on curve".into()))?;
        let signature = EcdsaSignature::from_slice(&signature.0)
            .map_err(|_| KeyError::InvalidSignature(SIGNATURE_SIZE))?;
        verifying_key
            .verify(msg, &signature)
            .map_err(|_| KeyError::VerificationFailed)
    }

    /// Reinterpret this signing key as a key-agreement public key.
    ///
    /// Both key kinds are points on P-256, so the bytes are reused as-is. This
    /// lets a stranger derive a one-time shared secret with an identity it only
    /// knows by its handle. It is one-way safe: the stranger contributes a fresh
    /// ephemeral scalar, and only the holder of the signing scalar can complete
    /// the exchange from the other side (see [`SecretKey::to_agreement_key`]).
    pub fn to_agreement_key(&self) -> AgreementPublicKey {
        // a validated signing point is always a valid agreement point
        AgreementPublicKey::from_bytes(&self.0).expect("validated P-256 point")
    }
}

/// Secret signing key of an identity
#[derive(Clone)]
pub struct SecretKey(SigningKey);

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SecretKey").field(&self.public()).finish()
    }
}

impl SecretKey {
    /// Generate a new random secret key using a cryptographically secure RNG
    pub fn generate() -> Self {
        loop {
            // rejection sampling: out-of-range scalars are astronomically rare
            if let Ok(key) = SigningKey::from_slice(&random_scalar_bytes()) {
                return Self(key);
            }
        }
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, KeyError> {
        if bytes.len() != PRIVATE_KEY_SIZE {
            return Err(KeyError::InvalidSecretKey);
        }
        SigningKey::from_slice(bytes)
            .map(Self)
            .map_err(|_| KeyError::InvalidSecretKey)
    }

    /// Parse a secret key from a hexadecimal string
    pub fn from_hex(hex: &str) -> Result<Self, KeyError> {
        let bytes = codec::decode(hex)?;
        Self::from_bytes(&bytes)
    }

    pub fn to_bytes(&self) -> [u8; PRIVATE_KEY_SIZE] {
        let mut out = [0u8; PRIVATE_KEY_SIZE];
        out.copy_from_slice(&self.0.to_bytes());
        out
    }

    pub fn to_hex(&self) -> String {
        codec::encode(self.to_bytes())
    }

    /// Derive the public key from this secret key
    pub fn public(&self) -> PublicKey {
        let point = self.0.verifying_key().to_encoded_point(false);
        let mut buff = [0; PUBLIC_KEY_SIZE];
        buff.copy_from_slice(point.as_bytes());
        PublicKey(buff)
    }

    /// Sign a message with ECDSA P-256/SHA-256 (RFC 6979 nonces).
    pub fn sign(&self, msg: &[u8]) -> Signature {
        let signature: EcdsaSignature = self.0.sign(msg);
        let mut buff = [0; SIGNATURE_SIZE];
        buff.copy_from_slice(&signature.to_bytes());
        Signature(buff)
    }

    /// The agreement-side counterpart of [`PublicKey::to_agreement_key`].
    ///
    /// Only used to complete one-way exchanges that strangers started against
    /// this identity's handle. The scalar is never exported in this form.
    pub fn to_agreement_key(&self) -> AgreementSecretKey {
        AgreementSecretKey(
            p256::SecretKey::from_slice(&self.to_bytes()).expect("valid signing scalar"),
        )
    }

    /// Encode secret key in PEM format with tag "PRIVATE KEY".
    pub fn to_pem(&self) -> String {
        let pem = pem::Pem::new("PRIVATE KEY", self.to_bytes().to_vec());
        pem::encode(&pem)
    }

    /// Parse a secret key from PEM format
    pub fn from_pem(pem_str: &str) -> Result<Self, KeyError> {
        let pem = pem::parse(pem_str).map_err(|e| KeyError::Pem(e.to_string()))?;
        if pem.tag() != "PRIVATE KEY" {
            return Err(KeyError::Pem("invalid PEM tag, expected PRIVATE KEY".into()));
        }
        Self::from_bytes(pem.contents())
    }
}

/// A detached, fixed-width ECDSA signature
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Signature([u8; SIGNATURE_SIZE]);

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({})", self.to_hex())
    }
}

impl TryFrom<&[u8]> for Signature {
    type Error = KeyError;
    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        if bytes.len() != SIGNATURE_SIZE {
            return Err(KeyError::InvalidSignature(bytes.len()));
        }
        let mut buff = [0; SIGNATURE_SIZE];
        buff.copy_from_slice(bytes);
        Ok(Self(buff))
    }
}

impl TryFrom<String> for Signature {
    type Error = KeyError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_hex(&value)
    }
}

impl From<Signature> for String {
    fn from(sig: Signature) -> Self {
        sig.to_hex()
    }
}

impl Signature {
    pub fn from_hex(hex: &str) -> Result<Self, KeyError> {
        let bytes = codec::decode(hex)?;
        Self::try_from(bytes.as_slice())
    }

    pub fn to_hex(&self) -> String {
        codec::encode(self.0)
    }

    pub fn to_bytes(&self) -> [u8; SIGNATURE_SIZE] {
        self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Public half of a key-agreement (ECDH) keypair
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AgreementPublicKey(p256::PublicKey);

impl fmt::Debug for AgreementPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AgreementPublicKey({})", self.to_hex())
    }
}

impl TryFrom<String> for AgreementPublicKey {
    type Error = KeyError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_hex(&value)
    }
}

impl From<AgreementPublicKey> for String {
    fn from(key: AgreementPublicKey) -> Self {
        key.to_hex()
    }
}

impl AgreementPublicKey {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, KeyError> {
        p256::PublicKey::from_sec1_bytes(bytes)
            .map(Self)
            .map_err(|_| KeyError::InvalidPublicKey("invalid agreement point".into()))
    }

    pub fn from_hex(hex: &str) -> Result<Self, KeyError> {
        let bytes = codec::decode(hex)?;
        Self::from_bytes(&bytes)
    }

    /// Uncompressed SEC1 encoding
    pub fn to_bytes(&self) -> [u8; PUBLIC_KEY_SIZE] {
        let point = self.0.to_encoded_point(false);
        let mut buff = [0; PUBLIC_KEY_SIZE];
        buff.copy_from_slice(point.as_bytes());
        buff
    }

    pub fn to_hex(&self) -> String {
        codec::encode(self.to_bytes())
    }
}

/// Secret half of a key-agreement (ECDH) keypair
#[derive(Clone)]
pub struct AgreementSecretKey(p256::SecretKey);

impl fmt::Debug for AgreementSecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AgreementSecretKey")
            .field(&self.public())
            .finish()
    }
}

impl AgreementSecretKey {
    pub fn generate() -> Self {
        loop {
            if let Ok(key) = p256::SecretKey::from_slice(&random_scalar_bytes()) {
                return Self(key);
            }
        }
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, KeyError> {
        if bytes.len() != PRIVATE_KEY_SIZE {
            return Err(KeyError::InvalidSecretKey);
        }
        p256::SecretKey::from_slice(bytes)
            .map(Self)
            .map_err(|_| KeyError::InvalidSecretKey)
    }

    pub fn to_bytes(&self) -> [u8; PRIVATE_KEY_SIZE] {
        let mut out = [0u8; PRIVATE_KEY_SIZE];
        out.copy_from_slice(&self.0.to_bytes());
        out
    }

    pub fn public(&self) -> AgreementPublicKey {
        AgreementPublicKey(self.0.public_key())
    }

    /// Derive the shared symmetric key with `theirs`.
    ///
    /// The raw x-coordinate of the shared point is used directly as an
    /// AES-256 key, matching what both sides of the wire compute.
    pub fn derive(&self, theirs: &AgreementPublicKey) -> Secret {
        let shared = p256::ecdh::diffie_hellman(self.0.to_nonzero_scalar(), theirs.0.as_affine());
        let mut bytes = [0u8; SECRET_SIZE];
        bytes.copy_from_slice(shared.raw_secret_bytes());
        Secret::from(bytes)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_keypair_generation() {
        let private_key = SecretKey::generate();
        let public_key = private_key.public();

        assert_eq!(public_key.as_bytes().len(), PUBLIC_KEY_SIZE);
        assert_eq!(public_key.as_bytes()[0], 0x04);

        let private_hex = private_key.to_hex();
        let recovered_private = SecretKey::from_hex(&private_hex).unwrap();
        assert_eq!(private_key.to_bytes(), recovered_private.to_bytes());

        let public_hex = public_key.to_hex();
        assert_eq!(public_hex.len(), PUBLIC_KEY_SIZE * 2);
        let recovered_public = PublicKey::from_hex(&public_hex).unwrap();
        assert_eq!(public_key, recovered_public);
    }

    #[test]
    fn test_pem_serialization() {
        let private_key = SecretKey::generate();
        let pem = private_key.to_pem();
        let recovered = SecretKey::from_pem(&pem).unwrap();
        assert_eq!(private_key.public(), recovered.public());
    }

    #[test]
    fn test_sign_and_verify() {
        let secret_key = SecretKey::generate();
        let public_key = secret_key.public();
        let message = b"hello, world!";

        let signature = secret_key.sign(message);
        assert_eq!(signature.as_bytes().len(), SIGNATURE_SIZE);
        assert!(public_key.verify(message, &signature).is_ok());

        let wrong_message = b"hello, world?";
        assert!(matches!(
            public_key.verify(wrong_message, &signature),
            Err(KeyError::VerificationFailed)
        ));

        let other_key = SecretKey::generate().public();
        assert!(other_key.verify(message, &signature).is_err());
    }

    #[test]
    fn test_public_key_rejects_bad_encodings() {
        let public_key = SecretKey::generate().public();
        let mut bytes = public_key.to_bytes();

        // compressed-style tag
        bytes[0] = 0x02;
        assert!(PublicKey::try_from(&bytes[..]).is_err());

        // truncated
        assert!(PublicKey::try_from(&public_key.as_bytes()[..64]).is_err());

        // not on the curve
        let mut off_curve = public_key.to_bytes();
        off_curve[64] ^= 0x01;
        assert!(PublicKey::try_from(&off_curve[..]).is_err());
    }

    #[test]
    fn test_agreement_is_symmetric() {
        let alice = AgreementSecretKey::generate();
        let bob = AgreementSecretKey::generate();
        let ab = alice.derive(&bob.public());
        let ba = bob.derive(&alice.public());
        assert_eq!(ab, ba);

        let carol = AgreementSecretKey::generate();
        assert_ne!(ab, carol.derive(&bob.public()));
    }

    #[test]
    fn test_signing_key_reinterpreted_for_agreement() {
        let target = SecretKey::generate();
        let ephemeral = AgreementSecretKey::generate();

        let from_stranger = ephemeral.derive(&target.public().to_agreement_key());
        let from_target = target.to_agreement_key().derive(&ephemeral.public());
        assert_eq!(from_stranger, from_target);
    }

    #[test]
    fn test_serde_as_hex() {
        let key = SecretKey::generate();
        let public = key.public();
        let json = serde_json::to_string(&public).unwrap();
        assert_eq!(json, format!("\"{}\"", public.to_hex()));
        let back: PublicKey = serde_json::from_str(&json).unwrap();
        assert_eq!(back, public);

        let sig = key.sign(b"msg");
        let json = serde_json::to_string(&sig).unwrap();
        let back: Signature = serde_json::from_str(&json).unwrap();
        assert_eq!(back, sig);
    }
}
