use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use common::host::Host;
use common::storage::{ObjectFileStore, StorageError};

use crate::ServiceConfig;

/// Everything request handlers share; cheap to clone
#[derive(Debug, Clone)]
pub struct State {
    host: Host,
    draining: Arc<AtomicBool>,
}

impl State {
    pub async fn from_config(config: &ServiceConfig) -> Result<Self, StateSetupError> {
        let store = ObjectFileStore::new(config.store.clone()).await?;
        tracing::info!(store = ?config.store, "opened blob store");
        Ok(Self::new(Host::new(config.authority.clone(), Arc::new(store))))
    }

    pub fn new(host: Host) -> Self {
        Self {
            host,
            draining: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn host(&self) -> &Host {
        &self.host
    }

    /// Stop reporting ready; requests already accepted are still served
    pub fn start_draining(&self) {
        if !self.draining.swap(true, Ordering::SeqCst) {
            tracing::info!("host draining, readiness now failing");
        }
    }

    pub fn is_draining(&self) -> bool {
        self.draining.load(Ordering::SeqCst)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StateSetupError {
    #[error("failed to open blob store: {0}")]
    Store(#[from] StorageError),
}
