use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use common::error::ProtocolError;

/// A [`ProtocolError`] on its way out of a handler
#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct HostError(#[from] pub ProtocolError);

impl HostError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            ProtocolError::MalformedInput(_) | ProtocolError::VerificationFailed(_) => {
                StatusCode::BAD_REQUEST
            }
            ProtocolError::AuthenticationFailure(_) => StatusCode::UNAUTHORIZED,
            ProtocolError::NotFound(_) => StatusCode::NOT_FOUND,
            ProtocolError::StorageFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ProtocolError::ProtocolExhaustion | ProtocolError::Cancelled => {
                StatusCode::SERVICE_UNAVAILABLE
            }
        }
    }
}

impl IntoResponse for HostError {
    fn into_response(self) -> Response {
        let status = self.status();
        if self.0.is_security_relevant() {
            tracing::warn!(error = %self.0, "rejected request");
        } else if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        }
        (status, self.0.to_string()).into_response()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (ProtocolError::MalformedInput("x".into()), 400),
            (ProtocolError::AuthenticationFailure("x".into()), 401),
            (ProtocolError::NotFound("x".into()), 404),
            (ProtocolError::StorageFailure("x".into()), 500),
            (ProtocolError::ProtocolExhaustion, 503),
            (ProtocolError::VerificationFailed("x".into()), 400),
        ];
        for (err, code) in cases {
            assert_eq!(HostError(err).into_response().status().as_u16(), code);
        }
    }
}
