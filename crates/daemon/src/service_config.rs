use std::path::PathBuf;

use common::auth::Authority;
use common::storage::StoreConfig;

#[derive(Debug, Clone)]
pub struct Config {
    // host configuration
    /// Seeds and difficulties every challenge and token is derived from
    pub authority: Authority,
    /// Blob storage backend configuration
    pub store: StoreConfig,

    // http server configuration
    /// Port for the host HTTP server
    pub api_port: u16,

    // logging
    pub log_level: tracing::Level,
    /// Directory for log files (optional, logs to stdout only if not set)
    pub log_dir: Option<PathBuf>,
}
