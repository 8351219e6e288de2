use axum::body::Bytes;
use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use common::auth::Capability;

use super::error::HostError;
use crate::ServiceState;

/// `POST /auth`: a JSON capability in, `challenge || difficulty` out
pub async fn handler(
    State(state): State<ServiceState>,
    body: Bytes,
) -> Result<impl IntoResponse, HostError> {
    // parsed by hand so an unknown kind is a 400 rather than axum's 422
    let capability: Capability =
        serde_json::from_slice(&body).map_err(common::error::ProtocolError::from)?;
    tracing::debug!(?capability, "issuing challenge");
    let wire = state.host().auth(&capability);
    Ok(([(header::CONTENT_TYPE, "application/octet-stream")], wire))
}
