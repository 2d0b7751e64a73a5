//! In-memory config store

use std::collections::BTreeMap;
use std::net::IpAddr;
use std::sync::Arc;

use async_trait::async_trait;
use ovsnet_common::store::controller_target;
use ovsnet_common::{
    ConfigStore, ConfigStoreConnector, FailMode, PortSpec, SwitchError, SwitchResult,
};
use parking_lot::Mutex;

use crate::recorder::{CallLog, FailureInjector};

/// First OpenFlow port number handed out.
pub const FIRST_OFPORT: u32 = 1;

/// A port as stored by [`FakeConfigStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredPort {
    pub spec: PortSpec,
    pub ofport: u32,
}

#[derive(Debug)]
struct StoreState {
    ports: BTreeMap<String, StoredPort>,
    vteps: BTreeMap<String, IpAddr>,
    controllers: Vec<String>,
    next_ofport: u32,
    deleted: usize,
}

impl Default for StoreState {
    fn default() -> Self {
        Self {
            ports: BTreeMap::new(),
            vteps: BTreeMap::new(),
            controllers: Vec::new(),
            next_ofport: FIRST_OFPORT,
            deleted: 0,
        }
    }
}

impl StoreState {
    fn allocate(&mut self) -> u32 {
        let ofport = self.next_ofport;
        self.next_ofport += 1;
        ofport
    }
}

/// Config store keeping ports, VTEPs and controllers in memory.
///
/// Port numbers are handed out in creation order and never reused.
#[derive(Debug)]
pub struct FakeConfigStore {
    log: CallLog,
    failures: FailureInjector,
    state: Mutex<StoreState>,
}

impl FakeConfigStore {
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            failures: FailureInjector::new(),
            state: Mutex::new(StoreState::default()),
        }
    }

    pub fn failures(&self) -> &FailureInjector {
        &self.failures
    }

    /// Adds a port without recording a call, returning its port number.
    pub fn seed_port(&self, name: &str) -> u32 {
        let mut state = self.state.lock();
        let ofport = state.allocate();
        let spec = PortSpec {
            name: name.to_string(),
            ..Default::default()
        };
        state
            .ports
            .insert(name.to_string(), StoredPort { spec, ofport });
        ofport
    }

    /// Adds a controller target without recording a call.
    pub fn seed_controller(&self, target: &str) {
        self.state.lock().controllers.push(target.to_string());
    }

    pub fn port(&self, name: &str) -> Option<StoredPort> {
        self.state.lock().ports.get(name).cloned()
    }

    pub fn port_names(&self) -> Vec<String> {
        self.state.lock().ports.keys().cloned().collect()
    }

    pub fn has_port(&self, name: &str) -> bool {
        self.state.lock().ports.contains_key(name)
    }

    pub fn vtep(&self, name: &str) -> Option<IpAddr> {
        self.state.lock().vteps.get(name).copied()
    }

    pub fn vtep_names(&self) -> Vec<String> {
        self.state.lock().vteps.keys().cloned().collect()
    }

    pub fn controllers(&self) -> Vec<String> {
        self.state.lock().controllers.clone()
    }

    /// Number of times the client was released.
    pub fn delete_count(&self) -> usize {
        self.state.lock().deleted
    }

    fn check(&self, op: &str, key: &str) -> SwitchResult<()> {
        match self.failures.store_error(op, key) {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ConfigStore for FakeConfigStore {
    async fn is_port_name_present(&self, name: &str) -> bool {
        self.log.record("store", "is_port_name_present", name);
        self.has_port(name)
    }

    async fn create_port(&self, spec: &PortSpec) -> SwitchResult<()> {
        self.log.record("store", "create_port", &spec.name);
        self.check("create_port", &spec.name)?;

        let mut state = self.state.lock();
        if state.ports.contains_key(&spec.name) {
            return Err(SwitchError::resource_unavailable(
                "create_port",
                format!("port {} already exists", spec.name),
            ));
        }
        let ofport = state.allocate();
        state.ports.insert(
            spec.name.clone(),
            StoredPort {
                spec: spec.clone(),
                ofport,
            },
        );
        Ok(())
    }

    async fn delete_port(&self, name: &str) -> SwitchResult<()> {
        self.log.record("store", "delete_port", name);
        self.check("delete_port", name)?;
        self.state.lock().ports.remove(name);
        Ok(())
    }

    async fn update_policing_rate(
        &self,
        name: &str,
        burst: u32,
        bandwidth: u64,
    ) -> SwitchResult<()> {
        self.log.record(
            "store",
            "update_policing_rate",
            format!("{} {} {}", name, burst, bandwidth),
        );
        self.check("update_policing_rate", name)?;

        let mut state = self.state.lock();
        let port = state
            .ports
            .get_mut(name)
            .ok_or_else(|| SwitchError::port_not_ready(name))?;
        port.spec.burst = burst;
        port.spec.bandwidth = bandwidth;
        Ok(())
    }

    async fn ofp_port_no(&self, name: &str) -> SwitchResult<u32> {
        self.log.record("store", "ofp_port_no", name);
        self.check("ofp_port_no", name)?;
        self.state
            .lock()
            .ports
            .get(name)
            .map(|p| p.ofport)
            .ok_or_else(|| SwitchError::port_not_ready(name))
    }

    async fn is_controller_present(&self, target: &str) -> bool {
        self.log.record("store", "is_controller_present", target);
        self.state.lock().controllers.iter().any(|c| c == target)
    }

    async fn add_controller(&self, ip: IpAddr, port: u16) -> SwitchResult<()> {
        let target = controller_target(ip, port);
        self.log.record("store", "add_controller", &target);
        self.check("add_controller", &target)?;
        self.state.lock().controllers.push(target);
        Ok(())
    }

    async fn is_vtep_present(&self, remote_ip: IpAddr) -> Option<String> {
        self.log
            .record("store", "is_vtep_present", remote_ip.to_string());
        self.state
            .lock()
            .vteps
            .iter()
            .find(|(_, ip)| **ip == remote_ip)
            .map(|(name, _)| name.clone())
    }

    async fn create_vtep(&self, name: &str, remote_ip: IpAddr) -> SwitchResult<()> {
        self.log
            .record("store", "create_vtep", format!("{} {}", name, remote_ip));
        self.check("create_vtep", name)?;

        let mut state = self.state.lock();
        let ofport = state.allocate();
        let spec = PortSpec {
            name: name.to_string(),
            intf_type: "vxlan".to_string(),
            ..Default::default()
        };
        state
            .ports
            .insert(name.to_string(), StoredPort { spec, ofport });
        state.vteps.insert(name.to_string(), remote_ip);
        Ok(())
    }

    async fn delete_vtep(&self, name: &str) -> SwitchResult<()> {
        self.log.record("store", "delete_vtep", name);
        self.check("delete_vtep", name)?;

        let mut state = self.state.lock();
        state.vteps.remove(name);
        state.ports.remove(name);
        Ok(())
    }

    async fn delete(&self) {
        self.log.record("store", "delete", "");
        self.state.lock().deleted += 1;
    }
}

/// Hands out one shared [`FakeConfigStore`].
#[derive(Debug)]
pub struct FakeStoreConnector {
    log: CallLog,
    store: Arc<FakeConfigStore>,
    failures: FailureInjector,
    connections: Mutex<Vec<(String, FailMode)>>,
}

impl FakeStoreConnector {
    pub fn new(log: CallLog, store: Arc<FakeConfigStore>) -> Self {
        Self {
            log,
            store,
            failures: FailureInjector::new(),
            connections: Mutex::new(Vec::new()),
        }
    }

    pub fn failures(&self) -> &FailureInjector {
        &self.failures
    }

    /// Bridges connected so far, with their fail mode.
    pub fn connections(&self) -> Vec<(String, FailMode)> {
        self.connections.lock().clone()
    }
}

#[async_trait]
impl ConfigStoreConnector for FakeStoreConnector {
    async fn connect(
        &self,
        bridge: &str,
        fail_mode: FailMode,
    ) -> SwitchResult<Arc<dyn ConfigStore>> {
        self.log.record(
            "store",
            "connect",
            format!("{} {}", bridge, fail_mode.as_str()),
        );
        if let Some(e) = self.failures.store_error("connect", bridge) {
            return Err(e);
        }
        self.connections
            .lock()
            .push((bridge.to_string(), fail_mode));
        let client: Arc<dyn ConfigStore> = self.store.clone();
        Ok(client)
    }
}
