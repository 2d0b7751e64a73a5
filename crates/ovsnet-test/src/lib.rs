//! Test infrastructure for the OVS switch engine
//!
//! Provides:
//! - In-memory config store, control agent, host bridge and link layer
//! - A shared call log for asserting cross-system ordering
//! - Keyed failure injection on every fake
//! - Endpoint and control-payload fixtures
//! - State verification helpers

pub mod agent;
pub mod fixtures;
pub mod link;
pub mod recorder;
pub mod store;
mod verification;

pub use agent::{FakeBackendFactory, FakeControlAgent, FakeHostBridge, NetworkEntry};
pub use fixtures::*;
pub use link::{FakeLinkLayer, LinkState};
pub use recorder::{CallLog, FailureInjector};
pub use store::{FakeConfigStore, FakeStoreConnector, StoredPort, FIRST_OFPORT};
pub use verification::*;

use tracing_subscriber::EnvFilter;

/// Installs a test log subscriber honouring `RUST_LOG`; later calls are no-ops.
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
