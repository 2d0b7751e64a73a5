//! Shared building blocks for the OVS switch provisioning engine.
//!
//! - [`error`]: error type and classification used by every crate
//! - [`shell`]: quoted shell command execution
//! - [`store`], [`agent`], [`link`]: contracts of the three backing systems
//!   the engine keeps consistent (config store, control agent / host
//!   bridge, kernel link layer)
//! - [`endpoint`], [`mac`], [`types`]: data model
//!
//! # Architecture
//!
//! Provisioning a port touches three systems in a fixed order:
//!
//! 1. Create kernel links (veth pair, MTU, MAC)
//! 2. Register the port in the config store (OVSDB)
//! 3. Register the endpoint with the control agent, keyed by the
//!    forwarding port number the config store assigned

pub mod agent;
pub mod endpoint;
pub mod error;
pub mod link;
pub mod mac;
pub mod shell;
pub mod store;
pub mod types;

pub use agent::{
    AgentParams, ArpMode, BackendFactory, BgpConfig, ControlAgent, GlobalConfig, HostBridge,
    ServiceInfo, ServicePort, ServiceSpec,
};
pub use endpoint::{EndpointConfig, EndpointInfo, EndpointStats, OperEndpointState};
pub use error::{ErrorKind, SwitchError, SwitchResult};
pub use link::LinkLayer;
pub use mac::MacAddress;
pub use store::{ConfigStore, ConfigStoreConnector, FailMode, PortSpec};
pub use types::{Datapath, ForwardingMode, NetworkType};
