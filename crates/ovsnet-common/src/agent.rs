//! Contracts of the forwarding-control agent and the host bridge.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;

use crate::endpoint::{EndpointInfo, EndpointStats};
use crate::error::SwitchResult;
use crate::types::Datapath;

/// Parameters for constructing a control agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentParams {
    pub bridge_name: String,
    pub datapath: Datapath,
    pub local_ip: Option<IpAddr>,
    /// Port of the agent's internal coordination RPC.
    pub agent_port: u16,
    /// Port of the OpenFlow control channel.
    pub ctrl_port: u16,
    /// Extra router arguments (e.g. uplink, router IP), passed through.
    pub router_info: Vec<String>,
}

/// A network master the agent peers with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub host_addr: String,
    pub port: u16,
}

/// BGP peering parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BgpConfig {
    pub hostname: String,
    pub router_ip: String,
    pub as_number: String,
    pub neighbor_as: String,
    pub neighbor: String,
}

/// A single service port mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServicePort {
    pub protocol: String,
    pub svc_port: u16,
    pub prov_port: u16,
}

/// Load-balanced service definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceSpec {
    pub ip_address: String,
    pub ports: Vec<ServicePort>,
}

/// ARP handling mode of the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArpMode {
    Flood,
    Proxy,
}

/// Agent-wide settings that can change at runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalConfig {
    pub arp_mode: ArpMode,
}

/// Forwarding-control agent bound to one bridge.
#[async_trait]
pub trait ControlAgent: Send + Sync {
    async fn add_local_endpoint(&self, endpoint: &EndpointInfo) -> SwitchResult<()>;

    /// Partial update: only `port_no` and `dscp` are meaningful.
    async fn update_local_endpoint(&self, endpoint: &EndpointInfo) -> SwitchResult<()>;

    async fn remove_local_endpoint(&self, port_no: u32) -> SwitchResult<()>;

    async fn add_network(
        &self,
        pkt_tag: u16,
        ext_pkt_tag: u32,
        gateway: &str,
        vrf: &str,
    ) -> SwitchResult<()>;

    async fn remove_network(
        &self,
        pkt_tag: u16,
        ext_pkt_tag: u32,
        gateway: &str,
        vrf: &str,
    ) -> SwitchResult<()>;

    async fn add_vtep_port(&self, port_no: u32, remote_ip: IpAddr) -> SwitchResult<()>;

    async fn remove_vtep_port(&self, port_no: u32, remote_ip: IpAddr) -> SwitchResult<()>;

    async fn add_uplink(&self, port_no: u32, name: &str) -> SwitchResult<()>;

    async fn remove_uplink(&self, port_no: u32) -> SwitchResult<()>;

    async fn add_master(&self, master: &ServiceInfo) -> SwitchResult<()>;

    async fn remove_master(&self, master: &ServiceInfo) -> SwitchResult<()>;

    async fn add_bgp(&self, config: &BgpConfig) -> SwitchResult<()>;

    async fn delete_bgp(&self) -> SwitchResult<()>;

    async fn add_svc_spec(&self, name: &str, spec: &ServiceSpec) -> SwitchResult<()>;

    async fn del_svc_spec(&self, name: &str, spec: &ServiceSpec) -> SwitchResult<()>;

    async fn svc_provider_update(&self, name: &str, providers: &[String]);

    async fn get_endpoint_stats(&self) -> SwitchResult<HashMap<String, EndpointStats>>;

    async fn inspect_state(&self) -> SwitchResult<serde_json::Value>;

    async fn inspect_bgp(&self) -> SwitchResult<serde_json::Value>;

    async fn global_config_update(&self, config: &GlobalConfig) -> SwitchResult<()>;

    /// Blocks until the dataplane has (re)connected to the control channel.
    async fn wait_for_switch_connection(&self);

    /// Releases the agent.
    async fn delete(&self);
}

/// Host bridge used by host-only switches.
#[async_trait]
pub trait HostBridge: Send + Sync {
    async fn add_host_port(&self, endpoint: &EndpointInfo) -> SwitchResult<()>;

    async fn del_host_port(&self, port_no: u32) -> SwitchResult<()>;

    /// Blocks until the dataplane has connected to the control channel.
    async fn wait_for_switch_connection(&self);

    async fn delete(&self);
}

/// Builds control agents and host bridges for a switch.
#[async_trait]
pub trait BackendFactory: Send + Sync {
    async fn new_agent(&self, params: &AgentParams) -> SwitchResult<Arc<dyn ControlAgent>>;

    async fn new_host_bridge(
        &self,
        bridge_name: &str,
        datapath: Datapath,
        ctrl_port: u16,
    ) -> SwitchResult<Arc<dyn HostBridge>>;
}
