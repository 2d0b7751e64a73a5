//! Contract of the node-local switch configuration store (OVSDB) client.
//!
//! The engine only consumes this interface; the wire protocol behind it is
//! the implementor's business.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::sync::Arc;

use crate::error::SwitchResult;

/// Interface type for ports backed by a veth pair.
pub const INTF_TYPE_SYSTEM: &str = "";

/// Interface type for OVS internal ports.
pub const INTF_TYPE_INTERNAL: &str = "internal";

/// Bridge behaviour when no controller is connected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailMode {
    /// Drop everything until a controller installs flows.
    Secure,
    /// Fall back to normal L2 learning.
    Standalone,
}

impl FailMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailMode::Secure => "secure",
            FailMode::Standalone => "standalone",
        }
    }
}

/// A port registration in the config store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortSpec {
    /// Switch-side port name.
    pub name: String,
    /// Interface type: [`INTF_TYPE_SYSTEM`] or [`INTF_TYPE_INTERNAL`].
    pub intf_type: String,
    /// Attachment id stored in the interface's external ids.
    pub attachment_id: String,
    /// Access VLAN tag; 0 means trunk/untagged.
    pub tag: u16,
    /// Ingress policing burst (kbits).
    pub burst: u32,
    /// Ingress policing rate (kbps); 0 disables policing.
    pub bandwidth: u64,
}

/// Controller target string for a TCP controller.
pub fn controller_target(ip: IpAddr, port: u16) -> String {
    format!("tcp:{}:{}", ip, port)
}

/// Client of the switch configuration store, bound to one bridge.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Returns true if a port with this name exists on the bridge.
    async fn is_port_name_present(&self, name: &str) -> bool;

    /// Adds a port to the bridge.
    async fn create_port(&self, spec: &PortSpec) -> SwitchResult<()>;

    /// Removes a port from the bridge.
    async fn delete_port(&self, name: &str) -> SwitchResult<()>;

    /// Updates ingress policing on an existing port.
    async fn update_policing_rate(&self, name: &str, burst: u32, bandwidth: u64)
        -> SwitchResult<()>;

    /// Resolves the forwarding (OpenFlow) port number of a port.
    async fn ofp_port_no(&self, name: &str) -> SwitchResult<u32>;

    /// Returns true if the controller target is configured on the bridge.
    async fn is_controller_present(&self, target: &str) -> bool;

    /// Appends a TCP controller to the bridge's controller list.
    async fn add_controller(&self, ip: IpAddr, port: u16) -> SwitchResult<()>;

    /// Looks up a VTEP interface by remote IP, returning its name.
    async fn is_vtep_present(&self, remote_ip: IpAddr) -> Option<String>;

    /// Creates a VTEP interface towards `remote_ip`.
    async fn create_vtep(&self, name: &str, remote_ip: IpAddr) -> SwitchResult<()>;

    /// Deletes a VTEP interface.
    async fn delete_vtep(&self, name: &str) -> SwitchResult<()>;

    /// Releases the client and the bridge it manages.
    async fn delete(&self);
}

/// Opens config-store clients.
#[async_trait]
pub trait ConfigStoreConnector: Send + Sync {
    /// Opens (or reuses) a client bound to `bridge`.
    async fn connect(&self, bridge: &str, fail_mode: FailMode)
        -> SwitchResult<Arc<dyn ConfigStore>>;
}
