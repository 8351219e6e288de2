use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;

use super::error::HostError;
use super::headers;
use crate::ServiceState;

/// `POST /inbox`: deliver an envelope paid for by the solution in `x-pow`.
///
/// Responds with the hex message id.
pub async fn deliver(
    State(state): State<ServiceState>,
    map: HeaderMap,
    body: Bytes,
) -> Result<String, HostError> {
    let target = headers::public_key(&map)?;
    let solution = headers::pow(&map)?;
    let id = state.host().send_message(&target, body, &solution).await?;
    Ok(id.to_hex())
}

/// `GET /inbox`: waiting message ids, owner only
pub async fn list(
    State(state): State<ServiceState>,
    map: HeaderMap,
) -> Result<Json<Vec<String>>, HostError> {
    let owner = headers::public_key(&map)?;
    let token = headers::token(&map)?;
    Ok(Json(state.host().inbox(&owner, token).await?))
}
