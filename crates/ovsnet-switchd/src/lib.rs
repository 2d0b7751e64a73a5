//! Node-local OVS switch provisioning engine
//!
//! ovsnet-switchd turns endpoint, network, uplink and host intents into
//! consistent state across three systems:
//! - Kernel links (veth pairs, MTU, MAC, addresses)
//! - The OVS configuration store (ports, VTEPs, controller)
//! - The forwarding-control agent or host bridge
//!
//! [`OvsSwitch::new`] bootstraps a bridge; the provisioning operations are
//! methods on [`OvsSwitch`], grouped by module:
//! - [`port`]: endpoint ports
//! - [`vtep`]: overlay tunnel endpoints
//! - [`uplink`]: trunk uplinks of VLAN switches
//! - [`host_port`]: host-facing ports of host-only switches
//! - [`passthrough`]: networks, masters, BGP, services and inspection
//!
//! [`link::ShellLinkLayer`] and [`vsctl::OvsVsctlConnector`] are the
//! production link layer and config store.

pub mod backend;
pub mod commands;
pub mod config;
pub mod host_port;
pub mod link;
pub mod naming;
pub mod passthrough;
pub mod port;
pub mod switch;
pub mod types;
pub mod uplink;
pub mod vsctl;
pub mod vtep;

pub use backend::Backend;
pub use config::{HostConfig, NamingConfig, SettleTimings, SwitchConfig};
pub use link::ShellLinkLayer;
pub use naming::{host_ip_mac, vxlan_if_name, PortNaming};
pub use port::PortRequest;
pub use switch::{OvsSwitch, SwitchDeps};
pub use types::SwitchProfile;
pub use uplink::{UplinkRegistry, UplinkRole};
pub use vsctl::{OvsVsctl, OvsVsctlConnector};
