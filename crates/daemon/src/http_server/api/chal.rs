use axum::body::Bytes;
use axum::extract::State;

use super::error::HostError;
use crate::ServiceState;

/// `POST /chal`: `pubKey || solution || signature` in, hex session token out
pub async fn handler(
    State(state): State<ServiceState>,
    body: Bytes,
) -> Result<String, HostError> {
    Ok(state.host().chal(&body)?)
}
