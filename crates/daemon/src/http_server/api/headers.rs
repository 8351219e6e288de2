//! Typed reads of the protocol headers

use axum::http::HeaderMap;
use common::codec;
use common::crypto::{AgreementPublicKey, PublicKey, Signature};
use common::error::ProtocolError;
use common::host::headers;

fn required<'a>(map: &'a HeaderMap, name: &str) -> Result<&'a str, ProtocolError> {
    map.get(name)
        .ok_or_else(|| ProtocolError::MalformedInput(format!("missing {} header", name)))?
        .to_str()
        .map_err(|_| ProtocolError::MalformedInput(format!("{} header is not text", name)))
}

pub fn public_key(map: &HeaderMap) -> Result<PublicKey, ProtocolError> {
    Ok(PublicKey::from_hex(required(map, headers::PUBKEY)?)?)
}

pub fn token(map: &HeaderMap) -> Result<&str, ProtocolError> {
    map.get(headers::TOKEN)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ProtocolError::AuthenticationFailure("missing session token".into()))
}

pub fn signature(map: &HeaderMap) -> Result<Signature, ProtocolError> {
    Ok(Signature::from_hex(required(map, headers::SIGNATURE)?)?)
}

pub fn location(map: &HeaderMap) -> Result<&str, ProtocolError> {
    required(map, headers::LOCATION)
}

pub fn sub_key(map: &HeaderMap) -> Result<AgreementPublicKey, ProtocolError> {
    Ok(AgreementPublicKey::from_hex(required(map, headers::SUB_KEY)?)?)
}

pub fn pow(map: &HeaderMap) -> Result<Vec<u8>, ProtocolError> {
    Ok(codec::decode(required(map, headers::POW)?)?)
}

#[cfg(test)]
mod test {
    use super::*;
    use common::crypto::SecretKey;

    #[test]
    fn test_reads_public_key() {
        let public = SecretKey::generate().public();
        let mut map = HeaderMap::new();
        map.insert(headers::PUBKEY, public.to_hex().parse().unwrap());
        assert_eq!(public_key(&map).unwrap(), public);
    }

    #[test]
    fn test_missing_headers() {
        let map = HeaderMap::new();
        assert!(matches!(
            location(&map),
            Err(ProtocolError::MalformedInput(_))
        ));
        assert!(matches!(
            token(&map),
            Err(ProtocolError::AuthenticationFailure(_))
        ));
    }

    #[test]
    fn test_bad_hex_is_malformed() {
        let mut map = HeaderMap::new();
        map.insert(headers::PUBKEY, "zz".parse().unwrap());
        map.insert(headers::POW, "abc".parse().unwrap());
        assert!(matches!(
            public_key(&map),
            Err(ProtocolError::MalformedInput(_))
        ));
        assert!(matches!(pow(&map), Err(ProtocolError::MalformedInput(_))));
    }
}
