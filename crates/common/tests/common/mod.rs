//! Shared test utilities for protocol integration tests
#![allow(dead_code)]

use std::sync::Arc;

use common::auth::{Authority, Difficulties};
use common::client::Session;
use common::host::Host;
use common::identity::Identity;
use common::storage::{ObjectFileStore, StoreConfig};
use tempfile::TempDir;

/// Low enough to solve instantly, high enough that a random guess fails
pub const TEST_DIFFICULTIES: Difficulties = Difficulties {
    user: 6,
    message: 6,
};

/// A host over an in-memory store
pub fn memory_host() -> Host {
    Host::new(
        Authority::generate(TEST_DIFFICULTIES),
        Arc::new(ObjectFileStore::memory()),
    )
}

/// A host over a local filesystem store in a fresh temp dir
pub async fn local_host() -> (Host, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let store = ObjectFileStore::new(StoreConfig::Local {
        path: temp_dir.path().join("store"),
    })
    .await
    .unwrap();
    let host = Host::new(Authority::generate(TEST_DIFFICULTIES), Arc::new(store));
    (host, temp_dir)
}

/// A session for a new identity that has already published its profile
pub async fn session(host: &Host, name: &str) -> Session<Host> {
    let mut session = Session::new(host.clone(), Identity::generate()).with_name(name);
    session.publish_profile().await.unwrap();
    session
}
