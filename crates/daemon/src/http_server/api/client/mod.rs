mod client;
mod error;

pub use client::HttpRemote;
pub use error::ApiError;
