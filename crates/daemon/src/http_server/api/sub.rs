use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;

use super::error::HostError;
use super::headers;
use crate::ServiceState;

/// `POST /sub`: anonymous drop of a sealed request for the target in `x-pubkey`
pub async fn subscribe(
    State(state): State<ServiceState>,
    map: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, HostError> {
    let target = headers::public_key(&map)?;
    let ephemeral = headers::sub_key(&map)?;
    state.host().subscribe(&target, &ephemeral, body).await?;
    Ok(StatusCode::OK)
}

/// `GET /reqs`: pending request names, owner only
pub async fn requests(
    State(state): State<ServiceState>,
    map: HeaderMap,
) -> Result<Json<Vec<String>>, HostError> {
    let owner = headers::public_key(&map)?;
    let token = headers::token(&map)?;
    Ok(Json(state.host().requests(&owner, token).await?))
}
