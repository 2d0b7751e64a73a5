//! In-memory control agent, host bridge and backend factory

use std::collections::{BTreeMap, HashMap};
use std::net::IpAddr;
use std::sync::Arc;

use async_trait::async_trait;
use ovsnet_common::{
    AgentParams, BackendFactory, BgpConfig, ControlAgent, Datapath, EndpointInfo,
    EndpointStats, GlobalConfig, HostBridge, ServiceInfo, ServiceSpec, SwitchError,
    SwitchResult,
};
use parking_lot::Mutex;
use serde_json::json;

use crate::recorder::{CallLog, FailureInjector};

/// A network registered with the agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkEntry {
    pub pkt_tag: u16,
    pub ext_pkt_tag: u32,
    pub gateway: String,
    pub vrf: String,
}

#[derive(Debug, Default)]
struct AgentState {
    endpoints: BTreeMap<u32, EndpointInfo>,
    endpoint_updates: Vec<EndpointInfo>,
    networks: Vec<NetworkEntry>,
    vteps: BTreeMap<u32, IpAddr>,
    uplinks: BTreeMap<u32, String>,
    masters: Vec<ServiceInfo>,
    bgp: Option<BgpConfig>,
    services: BTreeMap<String, ServiceSpec>,
    providers: HashMap<String, Vec<String>>,
    global: Option<GlobalConfig>,
    connection_waits: usize,
    deleted: usize,
}

/// Control agent keeping its forwarding state in memory.
#[derive(Debug)]
pub struct FakeControlAgent {
    log: CallLog,
    failures: FailureInjector,
    state: Mutex<AgentState>,
}

impl FakeControlAgent {
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            failures: FailureInjector::new(),
            state: Mutex::new(AgentState::default()),
        }
    }

    pub fn failures(&self) -> &FailureInjector {
        &self.failures
    }

    pub fn endpoint(&self, port_no: u32) -> Option<EndpointInfo> {
        self.state.lock().endpoints.get(&port_no).cloned()
    }

    pub fn endpoints(&self) -> Vec<EndpointInfo> {
        self.state.lock().endpoints.values().cloned().collect()
    }

    /// Partial updates received, in order.
    pub fn endpoint_updates(&self) -> Vec<EndpointInfo> {
        self.state.lock().endpoint_updates.clone()
    }

    pub fn networks(&self) -> Vec<NetworkEntry> {
        self.state.lock().networks.clone()
    }

    pub fn vteps(&self) -> BTreeMap<u32, IpAddr> {
        self.state.lock().vteps.clone()
    }

    pub fn uplinks(&self) -> BTreeMap<u32, String> {
        self.state.lock().uplinks.clone()
    }

    pub fn masters(&self) -> Vec<ServiceInfo> {
        self.state.lock().masters.clone()
    }

    pub fn bgp(&self) -> Option<BgpConfig> {
        self.state.lock().bgp.clone()
    }

    pub fn service(&self, name: &str) -> Option<ServiceSpec> {
        self.state.lock().services.get(name).cloned()
    }

    pub fn providers(&self, name: &str) -> Option<Vec<String>> {
        self.state.lock().providers.get(name).cloned()
    }

    pub fn global_config(&self) -> Option<GlobalConfig> {
        self.state.lock().global.clone()
    }

    pub fn connection_waits(&self) -> usize {
        self.state.lock().connection_waits
    }

    pub fn delete_count(&self) -> usize {
        self.state.lock().deleted
    }

    fn check(&self, op: &str, key: impl ToString) -> SwitchResult<()> {
        match self.failures.agent_error(op, &key.to_string()) {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ControlAgent for FakeControlAgent {
    async fn add_local_endpoint(&self, endpoint: &EndpointInfo) -> SwitchResult<()> {
        self.log
            .record("agent", "add_local_endpoint", endpoint.port_no.to_string());
        self.check("add_local_endpoint", endpoint.port_no)?;
        self.state
            .lock()
            .endpoints
            .insert(endpoint.port_no, endpoint.clone());
        Ok(())
    }

    async fn update_local_endpoint(&self, endpoint: &EndpointInfo) -> SwitchResult<()> {
        self.log
            .record("agent", "update_local_endpoint", endpoint.port_no.to_string());
        self.check("update_local_endpoint", endpoint.port_no)?;

        let mut state = self.state.lock();
        if let Some(existing) = state.endpoints.get_mut(&endpoint.port_no) {
            existing.dscp = endpoint.dscp;
        }
        state.endpoint_updates.push(endpoint.clone());
        Ok(())
    }

    async fn remove_local_endpoint(&self, port_no: u32) -> SwitchResult<()> {
        self.log
            .record("agent", "remove_local_endpoint", port_no.to_string());
        self.check("remove_local_endpoint", port_no)?;
        self.state.lock().endpoints.remove(&port_no);
        Ok(())
    }

    async fn add_network(
        &self,
        pkt_tag: u16,
        ext_pkt_tag: u32,
        gateway: &str,
        vrf: &str,
    ) -> SwitchResult<()> {
        self.log.record("agent", "add_network", pkt_tag.to_string());
        self.check("add_network", pkt_tag)?;
        self.state.lock().networks.push(NetworkEntry {
            pkt_tag,
            ext_pkt_tag,
            gateway: gateway.to_string(),
            vrf: vrf.to_string(),
        });
        Ok(())
    }

    async fn remove_network(
        &self,
        pkt_tag: u16,
        ext_pkt_tag: u32,
        _gateway: &str,
        _vrf: &str,
    ) -> SwitchResult<()> {
        self.log.record("agent", "remove_network", pkt_tag.to_string());
        self.check("remove_network", pkt_tag)?;
        self.state
            .lock()
            .networks
            .retain(|n| !(n.pkt_tag == pkt_tag && n.ext_pkt_tag == ext_pkt_tag));
        Ok(())
    }

    async fn add_vtep_port(&self, port_no: u32, remote_ip: IpAddr) -> SwitchResult<()> {
        self.log
            .record("agent", "add_vtep_port", format!("{} {}", port_no, remote_ip));
        self.check("add_vtep_port", port_no)?;
        self.state.lock().vteps.insert(port_no, remote_ip);
        Ok(())
    }

    async fn remove_vtep_port(&self, port_no: u32, remote_ip: IpAddr) -> SwitchResult<()> {
        self.log
            .record("agent", "remove_vtep_port", format!("{} {}", port_no, remote_ip));
        self.check("remove_vtep_port", port_no)?;
        self.state.lock().vteps.remove(&port_no);
        Ok(())
    }

    async fn add_uplink(&self, port_no: u32, name: &str) -> SwitchResult<()> {
        self.log
            .record("agent", "add_uplink", format!("{} {}", port_no, name));
        self.check("add_uplink", name)?;
        self.state.lock().uplinks.insert(port_no, name.to_string());
        Ok(())
    }

    async fn remove_uplink(&self, port_no: u32) -> SwitchResult<()> {
        self.log.record("agent", "remove_uplink", port_no.to_string());
        self.check("remove_uplink", port_no)?;
        self.state.lock().uplinks.remove(&port_no);
        Ok(())
    }

    async fn add_master(&self, master: &ServiceInfo) -> SwitchResult<()> {
        self.log.record("agent", "add_master", &master.host_addr);
        self.check("add_master", &master.host_addr)?;
        self.state.lock().masters.push(master.clone());
        Ok(())
    }

    async fn remove_master(&self, master: &ServiceInfo) -> SwitchResult<()> {
        self.log.record("agent", "remove_master", &master.host_addr);
        self.check("remove_master", &master.host_addr)?;
        self.state.lock().masters.retain(|m| m != master);
        Ok(())
    }

    async fn add_bgp(&self, config: &BgpConfig) -> SwitchResult<()> {
        self.log.record("agent", "add_bgp", &config.hostname);
        self.check("add_bgp", &config.hostname)?;
        self.state.lock().bgp = Some(config.clone());
        Ok(())
    }

    async fn delete_bgp(&self) -> SwitchResult<()> {
        self.log.record("agent", "delete_bgp", "");
        self.check("delete_bgp", "")?;
        self.state.lock().bgp = None;
        Ok(())
    }

    async fn add_svc_spec(&self, name: &str, spec: &ServiceSpec) -> SwitchResult<()> {
        self.log.record("agent", "add_svc_spec", name);
        self.check("add_svc_spec", name)?;
        self.state
            .lock()
            .services
            .insert(name.to_string(), spec.clone());
        Ok(())
    }

    async fn del_svc_spec(&self, name: &str, _spec: &ServiceSpec) -> SwitchResult<()> {
        self.log.record("agent", "del_svc_spec", name);
        self.check("del_svc_spec", name)?;
        self.state.lock().services.remove(name);
        Ok(())
    }

    async fn svc_provider_update(&self, name: &str, providers: &[String]) {
        self.log.record("agent", "svc_provider_update", name);
        self.state
            .lock()
            .providers
            .insert(name.to_string(), providers.to_vec());
    }

    async fn get_endpoint_stats(&self) -> SwitchResult<HashMap<String, EndpointStats>> {
        self.log.record("agent", "get_endpoint_stats", "");
        self.check("get_endpoint_stats", "")?;
        let stats = self
            .state
            .lock()
            .endpoints
            .keys()
            .map(|port_no| {
                let id = port_no.to_string();
                let stats = EndpointStats {
                    endpoint_id: id.clone(),
                    port_no: *port_no,
                    ..Default::default()
                };
                (id, stats)
            })
            .collect();
        Ok(stats)
    }

    async fn inspect_state(&self) -> SwitchResult<serde_json::Value> {
        self.log.record("agent", "inspect_state", "");
        self.check("inspect_state", "")?;
        let state = self.state.lock();
        Ok(json!({
            "endpoints": state.endpoints.keys().collect::<Vec<_>>(),
            "vteps": state.vteps.keys().collect::<Vec<_>>(),
            "uplinks": state.uplinks.values().collect::<Vec<_>>(),
        }))
    }

    async fn inspect_bgp(&self) -> SwitchResult<serde_json::Value> {
        self.log.record("agent", "inspect_bgp", "");
        self.check("inspect_bgp", "")?;
        let state = self.state.lock();
        Ok(match &state.bgp {
            Some(bgp) => json!({ "hostname": bgp.hostname, "neighbor": bgp.neighbor }),
            None => serde_json::Value::Null,
        })
    }

    async fn global_config_update(&self, config: &GlobalConfig) -> SwitchResult<()> {
        self.log.record("agent", "global_config_update", "");
        self.check("global_config_update", "")?;
        self.state.lock().global = Some(config.clone());
        Ok(())
    }

    async fn wait_for_switch_connection(&self) {
        self.log.record("agent", "wait_for_switch_connection", "");
        self.state.lock().connection_waits += 1;
    }

    async fn delete(&self) {
        self.log.record("agent", "delete", "");
        self.state.lock().deleted += 1;
    }
}

#[derive(Debug, Default)]
struct HostBridgeState {
    ports: BTreeMap<u32, EndpointInfo>,
    connection_waits: usize,
    deleted: usize,
}

/// Host bridge keeping its host ports in memory.
#[derive(Debug)]
pub struct FakeHostBridge {
    log: CallLog,
    failures: FailureInjector,
    state: Mutex<HostBridgeState>,
}

impl FakeHostBridge {
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            failures: FailureInjector::new(),
            state: Mutex::new(HostBridgeState::default()),
        }
    }

    pub fn failures(&self) -> &FailureInjector {
        &self.failures
    }

    pub fn port(&self, port_no: u32) -> Option<EndpointInfo> {
        self.state.lock().ports.get(&port_no).cloned()
    }

    pub fn ports(&self) -> Vec<EndpointInfo> {
        self.state.lock().ports.values().cloned().collect()
    }

    pub fn connection_waits(&self) -> usize {
        self.state.lock().connection_waits
    }

    pub fn delete_count(&self) -> usize {
        self.state.lock().deleted
    }
}

#[async_trait]
impl HostBridge for FakeHostBridge {
    async fn add_host_port(&self, endpoint: &EndpointInfo) -> SwitchResult<()> {
        let key = endpoint.port_no.to_string();
        self.log.record("host_bridge", "add_host_port", &key);
        if let Some(e) = self.failures.agent_error("add_host_port", &key) {
            return Err(e);
        }
        self.state
            .lock()
            .ports
            .insert(endpoint.port_no, endpoint.clone());
        Ok(())
    }

    async fn del_host_port(&self, port_no: u32) -> SwitchResult<()> {
        let key = port_no.to_string();
        self.log.record("host_bridge", "del_host_port", &key);
        if let Some(e) = self.failures.agent_error("del_host_port", &key) {
            return Err(e);
        }
        self.state.lock().ports.remove(&port_no);
        Ok(())
    }

    async fn wait_for_switch_connection(&self) {
        self.log
            .record("host_bridge", "wait_for_switch_connection", "");
        self.state.lock().connection_waits += 1;
    }

    async fn delete(&self) {
        self.log.record("host_bridge", "delete", "");
        self.state.lock().deleted += 1;
    }
}

/// Hands out one shared agent and one shared host bridge.
#[derive(Debug)]
pub struct FakeBackendFactory {
    log: CallLog,
    agent: Arc<FakeControlAgent>,
    host_bridge: Arc<FakeHostBridge>,
    failures: FailureInjector,
    agent_params: Mutex<Vec<AgentParams>>,
    host_bridge_params: Mutex<Vec<(String, Datapath, u16)>>,
}

impl FakeBackendFactory {
    pub fn new(
        log: CallLog,
        agent: Arc<FakeControlAgent>,
        host_bridge: Arc<FakeHostBridge>,
    ) -> Self {
        Self {
            log,
            agent,
            host_bridge,
            failures: FailureInjector::new(),
            agent_params: Mutex::new(Vec::new()),
            host_bridge_params: Mutex::new(Vec::new()),
        }
    }

    pub fn failures(&self) -> &FailureInjector {
        &self.failures
    }

    /// Parameters of every agent built so far.
    pub fn agent_params(&self) -> Vec<AgentParams> {
        self.agent_params.lock().clone()
    }

    /// (bridge, datapath, control port) of every host bridge built so far.
    pub fn host_bridge_params(&self) -> Vec<(String, Datapath, u16)> {
        self.host_bridge_params.lock().clone()
    }
}

#[async_trait]
impl BackendFactory for FakeBackendFactory {
    async fn new_agent(&self, params: &AgentParams) -> SwitchResult<Arc<dyn ControlAgent>> {
        self.log
            .record("factory", "new_agent", params.datapath.as_str());
        if self.failures.should_fail("new_agent", params.datapath.as_str()) {
            return Err(SwitchError::resource_unavailable(
                "new_agent",
                "injected failure",
            ));
        }
        self.agent_params.lock().push(params.clone());
        let agent: Arc<dyn ControlAgent> = self.agent.clone();
        Ok(agent)
    }

    async fn new_host_bridge(
        &self,
        bridge_name: &str,
        datapath: Datapath,
        ctrl_port: u16,
    ) -> SwitchResult<Arc<dyn HostBridge>> {
        self.log
            .record("factory", "new_host_bridge", datapath.as_str());
        if self.failures.should_fail("new_host_bridge", datapath.as_str()) {
            return Err(SwitchError::resource_unavailable(
                "new_host_bridge",
                "injected failure",
            ));
        }
        self.host_bridge_params
            .lock()
            .push((bridge_name.to_string(), datapath, ctrl_port));
        let bridge: Arc<dyn HostBridge> = self.host_bridge.clone();
        Ok(bridge)
    }
}
