use axum::routing::{delete, get, post, put};
use axum::Router;

pub mod client;

mod auth;
mod blobs;
mod chal;
mod error;
mod headers;
mod inbox;
mod sub;

pub use error::HostError;

use crate::ServiceState;

/// Route paths, shared with [`client::HttpRemote`]
pub mod paths {
    pub const AUTH: &str = "/auth";
    pub const CHAL: &str = "/chal";
    pub const PUT: &str = "/put";
    pub const GET: &str = "/get";
    pub const LIST: &str = "/list";
    pub const DELETE: &str = "/delete";
    pub const SUB: &str = "/sub";
    pub const REQS: &str = "/reqs";
    pub const INBOX: &str = "/inbox";
}

pub fn router(state: ServiceState) -> Router<ServiceState> {
    Router::new()
        .route(paths::AUTH, post(auth::handler))
        .route(paths::CHAL, post(chal::handler))
        .route(paths::PUT, put(blobs::put))
        .route(paths::GET, get(blobs::get))
        .route(paths::LIST, get(blobs::list))
        .route(paths::DELETE, delete(blobs::delete))
        .route(paths::SUB, post(sub::subscribe))
        .route(paths::REQS, get(sub::requests))
        .route(paths::INBOX, post(inbox::deliver).get(inbox::list))
        .with_state(state)
}
