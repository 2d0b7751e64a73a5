//! The forwarding backend bound to a switch.

use std::fmt;
use std::sync::Arc;

use ovsnet_common::{ControlAgent, EndpointInfo, HostBridge, SwitchResult};

/// Exactly one backend per switch, fixed at construction.
///
/// Tunnel and VLAN switches drive a control agent; host-only switches drive
/// a host bridge.
#[derive(Clone)]
pub enum Backend {
    Agent(Arc<dyn ControlAgent>),
    HostBridge(Arc<dyn HostBridge>),
}

impl Backend {
    pub fn agent(&self) -> Option<&Arc<dyn ControlAgent>> {
        match self {
            Backend::Agent(agent) => Some(agent),
            Backend::HostBridge(_) => None,
        }
    }

    pub fn host_bridge(&self) -> Option<&Arc<dyn HostBridge>> {
        match self {
            Backend::Agent(_) => None,
            Backend::HostBridge(bridge) => Some(bridge),
        }
    }

    /// Registers an endpoint port with whichever backend is bound.
    pub async fn attach_endpoint(&self, endpoint: &EndpointInfo) -> SwitchResult<()> {
        match self {
            Backend::Agent(agent) => agent.add_local_endpoint(endpoint).await,
            Backend::HostBridge(bridge) => bridge.add_host_port(endpoint).await,
        }
    }

    pub async fn detach_endpoint(&self, port_no: u32) -> SwitchResult<()> {
        match self {
            Backend::Agent(agent) => agent.remove_local_endpoint(port_no).await,
            Backend::HostBridge(bridge) => bridge.del_host_port(port_no).await,
        }
    }

    pub async fn wait_for_switch_connection(&self) {
        match self {
            Backend::Agent(agent) => agent.wait_for_switch_connection().await,
            Backend::HostBridge(bridge) => bridge.wait_for_switch_connection().await,
        }
    }

    pub async fn delete(&self) {
        match self {
            Backend::Agent(agent) => agent.delete().await,
            Backend::HostBridge(bridge) => bridge.delete().await,
        }
    }
}

impl fmt::Debug for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Agent(_) => f.write_str("Backend::Agent"),
            Backend::HostBridge(_) => f.write_str("Backend::HostBridge"),
        }
    }
}
