use std::error::Error;
use std::path::PathBuf;

use url::Url;

use common::client::Session;
use common::error::ProtocolError;
use veil_daemon::http_server::api::client::{ApiError, HttpRemote};
use veil_daemon::state::{AppState, StateError};

/// Resolve the remote URL for the API client.
///
/// Priority: explicit `--remote` flag > config file `api_port` > hardcoded 5001.
pub fn resolve_remote(
    explicit: Option<Url>,
    config_path: Option<PathBuf>,
) -> Result<Url, ApiError> {
    if let Some(url) = explicit {
        return Ok(url);
    }
    let port = AppState::load(config_path)
        .map(|state| state.config.api_port)
        .unwrap_or(5001);
    Ok(Url::parse(&format!("http://localhost:{}", port))?)
}


#[derive(Clone)]
pub struct OpContext {
    /// Host client (always initialized with default or custom URL)
    pub client: HttpRemote,
    /// Optional custom config path (defaults to ~/.veil)
    pub config_path: Option<PathBuf>,
}

impl OpContext {
    /// Create context with custom remote URL and optional config path
    pub fn new(remote: Url, config_path: Option<PathBuf>) -> Result<Self, ApiError> {
        Ok(Self {
            client: HttpRemote::new(&remote)?,
            config_path,
        })
    }

    pub fn state(&self) -> Result<AppState, StateError> {
        AppState::load(self.config_path.clone())
    }

    /// A session for the local identity, carrying the saved subscribers
    pub fn session(&self) -> Result<(AppState, Session<HttpRemote>), StateError> {
        let state = self.state()?;
        let identity = state.load_identity()?;
        let mut session = Session::new(self.client.clone(), identity)
            .with_subscribers(state.load_subscribers()?);
        if let Some(name) = &state.config.display_name {
            session = session.with_name(name.clone());
        }
        Ok((state, session))
    }
}

/// Failure of an op that talks to the host as the local identity
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("state error: {0}")]
    State(#[from] StateError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

#[async_trait::async_trait]
pub trait Op: Send + Sync {
    type Error: Error + Send + Sync + 'static;
    type Output;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error>;
}

#[macro_export]
macro_rules! command_enum {
    ($(($variant:ident, $type:ty)),* $(,)?) => {
        #[derive(Subcommand, Debug, Clone)]
        pub enum Command {
            $($variant($type),)*
        }

        #[derive(Debug)]
        pub enum OpOutput {
            $($variant(<$type as $crate::cli::op::Op>::Output),)*
        }

        #[derive(Debug, thiserror::Error)]
        pub enum OpError {
            $(
                #[error(transparent)]
                $variant(<$type as $crate::cli::op::Op>::Error),
            )*
        }

        #[async_trait::async_trait]
        impl $crate::cli::op::Op for Command {
            type Output = OpOutput;
            type Error = OpError;

            async fn execute(&self, ctx: &$crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
                match self {
                    $(
                        Command::$variant(op) => {
                            op.execute(ctx).await
                                .map(OpOutput::$variant)
                                .map_err(OpError::$variant)
                        },
                    )*
                }
            }
        }

        impl std::fmt::Display for OpOutput {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(
                        OpOutput::$variant(output) => write!(f, "{}", output),
                    )*
                }
            }
        }
    };
}
