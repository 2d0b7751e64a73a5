//! Shared call log and failure injection
//!
//! Every fake writes one entry per call into a [`CallLog`] shared by all
//! fakes of a test, so ordering across systems can be asserted:
//!
//! ```
//! use ovsnet_test::CallLog;
//!
//! let log = CallLog::new();
//! log.record("link", "create_veth_pair", "port1 vport1");
//! log.record("store", "create_port", "vport1");
//! assert!(log.index_of("link.create_veth_pair") < log.index_of("store.create_port"));
//! ```

use std::collections::HashSet;
use std::sync::Arc;

use ovsnet_common::SwitchError;
use parking_lot::Mutex;

/// Ordered record of collaborator calls, formatted `system.op args`.
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    entries: Arc<Mutex<Vec<String>>>,
}

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, system: &str, op: &str, args: impl AsRef<str>) {
        let args = args.as_ref();
        let entry = if args.is_empty() {
            format!("{}.{}", system, op)
        } else {
            format!("{}.{} {}", system, op, args)
        };
        tracing::trace!(call = %entry, "Recorded call");
        self.entries.lock().push(entry);
    }

    /// All entries in call order.
    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// Position of the first entry starting with `prefix`.
    pub fn index_of(&self, prefix: &str) -> Option<usize> {
        self.entries.lock().iter().position(|e| e.starts_with(prefix))
    }

    pub fn contains(&self, prefix: &str) -> bool {
        self.index_of(prefix).is_some()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.entries
            .lock()
            .iter()
            .filter(|e| e.starts_with(prefix))
            .count()
    }

    /// Entries of one system (`"store"`, `"agent"`, ...).
    pub fn for_system(&self, system: &str) -> Vec<String> {
        let prefix = format!("{}.", system);
        self.entries
            .lock()
            .iter()
            .filter(|e| e.starts_with(&prefix))
            .cloned()
            .collect()
    }
}

/// Set of operations that should fail.
///
/// A rule without a key fails every call of the operation; a keyed rule
/// only fails calls whose key matches.
#[derive(Debug, Default)]
pub struct FailureInjector {
    rules: Mutex<HashSet<(String, Option<String>)>>,
}

impl FailureInjector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_on(&self, op: &str, key: Option<&str>) {
        self.rules
            .lock()
            .insert((op.to_string(), key.map(str::to_string)));
    }

    pub fn clear(&self, op: &str) {
        self.rules.lock().retain(|(o, _)| o != op);
    }

    pub fn clear_all(&self) {
        self.rules.lock().clear();
    }

    pub fn should_fail(&self, op: &str, key: &str) -> bool {
        let rules = self.rules.lock();
        rules.contains(&(op.to_string(), None))
            || rules.contains(&(op.to_string(), Some(key.to_string())))
    }

    /// Returns the injected config-store failure for this call, if any.
    pub fn store_error(&self, op: &str, key: &str) -> Option<SwitchError> {
        self.should_fail(op, key)
            .then(|| SwitchError::resource_unavailable(op, format!("injected failure for {}", key)))
    }

    /// Returns the injected agent rejection for this call, if any.
    pub fn agent_error(&self, op: &str, key: &str) -> Option<SwitchError> {
        self.should_fail(op, key)
            .then(|| SwitchError::agent_rejected(op, format!("injected failure for {}", key)))
    }
}
