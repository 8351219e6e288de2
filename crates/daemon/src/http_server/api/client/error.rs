use common::error::ProtocolError;
use reqwest::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    Reqwest(#[from] reqwest::Error),
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),
    #[error("HTTP status {0}: {1}")]
    HttpStatus(StatusCode, String),
}

/// Fold a transport or status failure back into the protocol taxonomy
impl From<ApiError> for ProtocolError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::HttpStatus(status, msg) => match status {
                StatusCode::BAD_REQUEST => ProtocolError::MalformedInput(msg),
                StatusCode::UNAUTHORIZED => ProtocolError::AuthenticationFailure(msg),
                StatusCode::NOT_FOUND => ProtocolError::NotFound(msg),
                _ => ProtocolError::StorageFailure(format!("{}: {}", status, msg)),
            },
            ApiError::UrlParse(e) => ProtocolError::MalformedInput(e.to_string()),
            ApiError::Reqwest(e) => ProtocolError::StorageFailure(e.to_string()),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_status_folds_back() {
        let err: ProtocolError = ApiError::HttpStatus(StatusCode::NOT_FOUND, "gone".into()).into();
        assert!(err.is_not_found());
        let err: ProtocolError =
            ApiError::HttpStatus(StatusCode::UNAUTHORIZED, "bad token".into()).into();
        assert!(matches!(err, ProtocolError::AuthenticationFailure(_)));
        let err: ProtocolError =
            ApiError::HttpStatus(StatusCode::BAD_GATEWAY, "upstream".into()).into();
        assert!(matches!(err, ProtocolError::StorageFailure(_)));
    }
}
