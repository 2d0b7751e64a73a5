//! Switch constants and the (network type, forwarding mode) selection table.

use std::net::{IpAddr, Ipv4Addr};

use ovsnet_common::{Datapath, ForwardingMode, NetworkType};

/// Agent coordination port for VXLAN switches.
pub const VXLAN_AGENT_PORT: u16 = 9002;

/// Agent coordination port for VLAN switches.
pub const VLAN_AGENT_PORT: u16 = 9003;

/// Placeholder agent port for host-only switches (no agent runs).
pub const UNUSED_AGENT_PORT: u16 = 9004;

/// OpenFlow control channel port for VXLAN switches.
pub const VXLAN_CTRL_PORT: u16 = 6633;

/// OpenFlow control channel port for VLAN switches.
pub const VLAN_CTRL_PORT: u16 = 6634;

/// OpenFlow control channel port for host-only switches.
pub const HOST_CTRL_PORT: u16 = 6635;

/// Controller address written into the bridge's controller list.
pub const CONTROLLER_IP: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

/// Endpoint MTU leaving room for VXLAN encapsulation:
/// inner ethernet (14) + outer IP (20) + outer UDP (8) + VXLAN header (8).
pub const VXLAN_ENDPOINT_MTU: u32 = 1450;

/// Access VLAN of host ports.
pub const HOST_VLAN: u16 = 2;

/// Attachment id prefix of uplink ports.
pub const UPLINK_ID_PREFIX: &str = "uplink";

/// Attachment id prefix of host ports.
pub const HOST_PORT_ID_PREFIX: &str = "host";

/// Datapath and port selection for a switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwitchProfile {
    pub datapath: Datapath,
    pub agent_port: u16,
    pub ctrl_port: u16,
}

impl SwitchProfile {
    /// Selects the profile of an agent-backed switch.
    pub fn for_agent(net_type: NetworkType, mode: ForwardingMode) -> Option<Self> {
        let (datapath, agent_port, ctrl_port) = match (net_type, mode) {
            (NetworkType::Vxlan, ForwardingMode::Bridge) => {
                (Datapath::TunnelBridge, VXLAN_AGENT_PORT, VXLAN_CTRL_PORT)
            }
            (NetworkType::Vxlan, ForwardingMode::Routing) => {
                (Datapath::TunnelRouter, VXLAN_AGENT_PORT, VXLAN_CTRL_PORT)
            }
            (NetworkType::Vlan, ForwardingMode::Bridge) => {
                (Datapath::VlanBridge, VLAN_AGENT_PORT, VLAN_CTRL_PORT)
            }
            (NetworkType::Vlan, ForwardingMode::Routing) => {
                (Datapath::VlanRouter, VLAN_AGENT_PORT, VLAN_CTRL_PORT)
            }
            (NetworkType::Host, _) => return None,
        };
        Some(Self {
            datapath,
            agent_port,
            ctrl_port,
        })
    }

    /// Profile of a host-only switch.
    pub fn host() -> Self {
        Self {
            datapath: Datapath::HostBridge,
            agent_port: UNUSED_AGENT_PORT,
            ctrl_port: HOST_CTRL_PORT,
        }
    }
}
