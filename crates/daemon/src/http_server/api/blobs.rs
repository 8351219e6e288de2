//! Signed writes, public reads and token-gated deletes

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;

use super::error::HostError;
use super::headers;
use crate::ServiceState;

pub async fn put(
    State(state): State<ServiceState>,
    map: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, HostError> {
    let pub_key = headers::public_key(&map)?;
    let token = headers::token(&map)?;
    let signature = headers::signature(&map)?;
    let location = headers::location(&map)?;
    state
        .host()
        .put(location, body, &signature, &pub_key, token)
        .await?;
    Ok(StatusCode::OK)
}

pub async fn get(
    State(state): State<ServiceState>,
    map: HeaderMap,
) -> Result<impl IntoResponse, HostError> {
    let location = headers::location(&map)?;
    let bytes = state.host().get(location).await?;
    Ok(([(header::CONTENT_TYPE, "application/octet-stream")], bytes))
}

pub async fn list(
    State(state): State<ServiceState>,
    map: HeaderMap,
) -> Result<Json<Vec<String>>, HostError> {
    let prefix = headers::location(&map)?;
    Ok(Json(state.host().list(prefix).await?))
}

pub async fn delete(
    State(state): State<ServiceState>,
    map: HeaderMap,
) -> Result<StatusCode, HostError> {
    let pub_key = headers::public_key(&map)?;
    let token = headers::token(&map)?;
    let location = headers::location(&map)?;
    state.host().delete(location, &pub_key, token).await?;
    Ok(StatusCode::OK)
}
