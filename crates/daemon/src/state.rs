use std::collections::BTreeSet;
use std::{fs, path::PathBuf};

use common::auth::{random_seed, Authority, Difficulties, SEED_SIZE};
use common::codec;
use common::crypto::PublicKey;
use common::identity::Identity;
use common::storage::StoreConfig;
use serde::{Deserialize, Serialize};

pub const APP_NAME: &str = "veil";
pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const IDENTITY_FILE_NAME: &str = "identity.pem";
pub const SUBSCRIBERS_FILE_NAME: &str = "subscribers.json";
pub const STORE_DIR_NAME: &str = "store";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Port for the host HTTP server
    #[serde(default = "default_api_port")]
    pub api_port: u16,
    /// Default log level when RUST_LOG is not set
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Where the host keeps blobs
    #[serde(default)]
    pub store: StoreConfig,
    /// Proof-of-work difficulties in leading zero bits
    #[serde(default)]
    pub difficulties: Difficulties,
    /// Hex seed challenges are derived from
    pub pow_seed: String,
    /// Hex seed session tokens are derived from
    pub token_seed: String,
    /// Name published in the client's profile
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

fn default_api_port() -> u16 {
    5001
}

fn default_log_level() -> String {
    "info".to_string()
}

impl AppConfig {
    /// Config with fresh random seeds, storing blobs under `store_path`
    pub fn generate(store_path: PathBuf) -> Self {
        Self {
            api_port: default_api_port(),
            log_level: default_log_level(),
            store: StoreConfig::Local { path: store_path },
            difficulties: Difficulties::default(),
            pow_seed: codec::encode(random_seed()),
            token_seed: codec::encode(random_seed()),
            display_name: None,
        }
    }

    pub fn authority(&self) -> Result<Authority, StateError> {
        let pow_seed = codec::decode_fixed::<SEED_SIZE>(&self.pow_seed)
            .map_err(|e| StateError::InvalidSeed("pow_seed", e.to_string()))?;
        let token_seed = codec::decode_fixed::<SEED_SIZE>(&self.token_seed)
            .map_err(|e| StateError::InvalidSeed("token_seed", e.to_string()))?;
        Ok(Authority::new(pow_seed, token_seed, self.difficulties))
    }

    pub fn log_level(&self) -> tracing::Level {
        self.log_level.parse().unwrap_or(tracing::Level::INFO)
    }
}

#[derive(Debug, Clone)]
pub struct AppState {
    /// Path to the veil directory (~/.veil)
    pub veil_dir: PathBuf,
    /// Path to the client identity PEM file
    pub identity_path: PathBuf,
    /// Path to the locally accepted subscriber set
    pub subscribers_path: PathBuf,
    /// Path to the store directory
    pub store_path: PathBuf,
    /// Path to the config file
    pub config_path: PathBuf,
    /// Loaded configuration
    pub config: AppConfig,
}

impl AppState {
    /// Get the veil directory path (custom or default ~/.veil)
    pub fn veil_dir(custom_path: Option<PathBuf>) -> Result<PathBuf, StateError> {
        if let Some(path) = custom_path {
            return Ok(path);
        }

        let home = dirs::home_dir().ok_or(StateError::NoHomeDirectory)?;
        Ok(home.join(format!(".{}", APP_NAME)))
    }

    /// Initialize a new veil state directory
    pub fn init(
        custom_path: Option<PathBuf>,
        config: Option<AppConfig>,
    ) -> Result<Self, StateError> {
        let veil_dir = Self::veil_dir(custom_path)?;

        if veil_dir.exists() {
            return Err(StateError::AlreadyInitialized);
        }

        fs::create_dir_all(&veil_dir)?;

        let store_path = veil_dir.join(STORE_DIR_NAME);
        fs::create_dir_all(&store_path)?;

        // Generate and save the client identity
        let identity = Identity::generate();
        let identity_path = veil_dir.join(IDENTITY_FILE_NAME);
        fs::write(&identity_path, identity.to_pem())?;

        let subscribers_path = veil_dir.join(SUBSCRIBERS_FILE_NAME);
        fs::write(&subscribers_path, "[]")?;

        // Create config (use provided or generate fresh seeds)
        let config = config.unwrap_or_else(|| AppConfig::generate(store_path.clone()));
        let config_path = veil_dir.join(CONFIG_FILE_NAME);
        let config_toml = toml::to_string_pretty(&config)?;
        fs::write(&config_path, config_toml)?;

        Ok(Self {
            veil_dir,
            identity_path,
            subscribers_path,
            store_path,
            config_path,
            config,
        })
    }

    /// Load existing state from the veil directory
    pub fn load(custom_path: Option<PathBuf>) -> Result<Self, StateError> {
        let veil_dir = Self::veil_dir(custom_path)?;

        if !veil_dir.exists() {
            return Err(StateError::NotInitialized);
        }

        let identity_path = veil_dir.join(IDENTITY_FILE_NAME);
        let subscribers_path = veil_dir.join(SUBSCRIBERS_FILE_NAME);
        let store_path = veil_dir.join(STORE_DIR_NAME);
        let config_path = veil_dir.join(CONFIG_FILE_NAME);

        if !identity_path.exists() {
            return Err(StateError::MissingFile(IDENTITY_FILE_NAME.to_string()));
        }
        if !config_path.exists() {
            return Err(StateError::MissingFile(CONFIG_FILE_NAME.to_string()));
        }

        let config_toml = fs::read_to_string(&config_path)?;
        let config: AppConfig = toml::from_str(&config_toml)?;

        Ok(Self {
            veil_dir,
            identity_path,
            subscribers_path,
            store_path,
            config_path,
            config,
        })
    }

    pub fn save_config(&self) -> Result<(), StateError> {
        fs::write(&self.config_path, toml::to_string_pretty(&self.config)?)?;
        Ok(())
    }

    pub fn load_identity(&self) -> Result<Identity, StateError> {
        let pem = fs::read_to_string(&self.identity_path)?;
        Identity::from_pem(&pem).map_err(|e| StateError::InvalidIdentity(e.to_string()))
    }

    pub fn save_identity(&self, identity: &Identity) -> Result<(), StateError> {
        fs::write(&self.identity_path, identity.to_pem())?;
        Ok(())
    }

    /// Subscribers accepted so far; a missing file means none
    pub fn load_subscribers(&self) -> Result<BTreeSet<PublicKey>, StateError> {
        if !self.subscribers_path.exists() {
            return Ok(BTreeSet::new());
        }
        let json = fs::read_to_string(&self.subscribers_path)?;
        Ok(serde_json::from_str(&json)?)
    }

    pub fn save_subscribers(&self, subscribers: &BTreeSet<PublicKey>) -> Result<(), StateError> {
        fs::write(
            &self.subscribers_path,
            serde_json::to_string_pretty(subscribers)?,
        )?;
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("veil directory not initialized. Run 'veil init' first")]
    NotInitialized,

    #[error("veil directory already initialized")]
    AlreadyInitialized,

    #[error("no home directory found")]
    NoHomeDirectory,

    #[error("missing required file: {0}")]
    MissingFile(String),

    #[error("invalid identity: {0}")]
    InvalidIdentity(String),

    #[error("invalid {0}: {1}")]
    InvalidSeed(&'static str, String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("TOML deserialization error: {0}")]
    TomlDe(#[from] toml::de::Error),
}
