use std::path::PathBuf;

use clap::Args;

use common::auth::Difficulties;
use common::storage::StoreConfig;
use veil_daemon::state::{AppConfig, AppState, StateError, STORE_DIR_NAME};

#[derive(Args, Debug, Clone)]
pub struct Init {
    /// Port for the host HTTP server
    #[arg(long)]
    pub api_port: Option<u16>,

    /// Keep blobs here instead of <config dir>/store
    #[arg(long, conflicts_with = "memory")]
    pub store_path: Option<PathBuf>,

    /// Keep blobs in memory only
    #[arg(long)]
    pub memory: bool,

    /// Leading zero bits required to authenticate
    #[arg(long)]
    pub user_difficulty: Option<u8>,

    /// Leading zero bits required to deliver an inbox message
    #[arg(long)]
    pub message_difficulty: Option<u8>,

    /// Name to publish in this identity's profile
    #[arg(long)]
    pub name: Option<String>,
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Init {
    type Error = StateError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let veil_dir = AppState::veil_dir(ctx.config_path.clone())?;

        let mut config = AppConfig::generate(veil_dir.join(STORE_DIR_NAME));
        if let Some(port) = self.api_port {
            config.api_port = port;
        }
        if self.memory {
            config.store = StoreConfig::Memory;
        } else if let Some(path) = &self.store_path {
            config.store = StoreConfig::Local { path: path.clone() };
        }
        let defaults = Difficulties::default();
        config.difficulties = Difficulties {
            user: self.user_difficulty.unwrap_or(defaults.user),
            message: self.message_difficulty.unwrap_or(defaults.message),
        };
        config.display_name = self.name.clone();

        let state = AppState::init(Some(veil_dir), Some(config))?;
        let identity = state.load_identity()?;

        Ok(format!(
            "Initialized veil directory at {}\n  identity: {}\n  api_port: {}",
            state.veil_dir.display(),
            identity.public(),
            state.config.api_port
        ))
    }
}
