//! Switch type definitions shared between the engine and its collaborators.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::SwitchError;

/// Kind of network the switch carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkType {
    /// Overlay tunnel (VXLAN) network.
    Vxlan,
    /// Tagged VLAN network with physical uplinks.
    Vlan,
    /// Host-only network bridging host namespaces.
    Host,
}

impl NetworkType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NetworkType::Vxlan => "vxlan",
            NetworkType::Vlan => "vlan",
            NetworkType::Host => "host",
        }
    }
}

impl FromStr for NetworkType {
    type Err = SwitchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "vxlan" | "overlay-tunnel" => Ok(NetworkType::Vxlan),
            "vlan" | "tagged-vlan" => Ok(NetworkType::Vlan),
            "host" | "host-only" => Ok(NetworkType::Host),
            other => Err(SwitchError::invalid_config(
                "network_type",
                format!("Unknown network type '{}'. Expects 'vxlan', 'vlan' or 'host'", other),
            )),
        }
    }
}

impl fmt::Display for NetworkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Forwarding mode of an agent-backed switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ForwardingMode {
    /// L2 bridging.
    Bridge,
    /// L3 routing.
    Routing,
}

impl ForwardingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ForwardingMode::Bridge => "bridge",
            ForwardingMode::Routing => "routing",
        }
    }
}

impl FromStr for ForwardingMode {
    type Err = SwitchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bridge" => Ok(ForwardingMode::Bridge),
            "routing" => Ok(ForwardingMode::Routing),
            other => Err(SwitchError::invalid_config(
                "fwd_mode",
                format!("Invalid forwarding mode '{}'. Expects 'bridge' or 'routing'", other),
            )),
        }
    }
}

impl fmt::Display for ForwardingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Datapath programmed by the control agent or host bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Datapath {
    /// VXLAN bridging.
    TunnelBridge,
    /// VXLAN routing.
    TunnelRouter,
    /// VLAN bridging.
    VlanBridge,
    /// VLAN routing.
    VlanRouter,
    /// Host bridge.
    HostBridge,
}

impl Datapath {
    /// Identifier understood by the control agent.
    pub fn as_str(&self) -> &'static str {
        match self {
            Datapath::TunnelBridge => "vxlan",
            Datapath::TunnelRouter => "vrouter",
            Datapath::VlanBridge => "vlan",
            Datapath::VlanRouter => "vlrouter",
            Datapath::HostBridge => "hostbridge",
        }
    }
}

impl fmt::Display for Datapath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
