//! Switch configuration file support
//!
//! Loads and validates the switch configuration from TOML files.
//! Mode strings are kept as strings and parsed when the switch is built,
//! so a bad value surfaces as an invalid-configuration error there.

use ovsnet_common::{ForwardingMode, NetworkType, SwitchError, SwitchResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::{IpAddr, Ipv4Addr};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::naming::DEFAULT_PAIR_ANCHOR;

/// Settle intervals around dataplane reconfiguration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettleTimings {
    /// Wait after registering a port before resolving its port number
    #[serde(default = "default_port_settle")]
    pub port_settle_ms: u64,

    /// Wait after adding or removing an uplink, before the connection wait
    #[serde(default = "default_uplink_reconnect")]
    pub uplink_reconnect_ms: u64,

    /// Wait after releasing the backends on teardown
    #[serde(default = "default_teardown_settle")]
    pub teardown_settle_ms: u64,
}

/// Naming rules
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamingConfig {
    /// Substring that gets a `v` prefix on the switch side of a veth pair
    #[serde(default = "default_pair_anchor")]
    pub pair_anchor: String,
}

/// Host-port addressing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostConfig {
    /// Upper two octets of host-port addresses
    #[serde(default = "default_host_subnet")]
    pub subnet: Ipv4Addr,
}

/// Complete switch configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwitchConfig {
    #[serde(default = "default_bridge_name")]
    pub bridge_name: String,

    /// vxlan | vlan | host
    #[serde(default = "default_network_type")]
    pub network_type: String,

    /// bridge | routing; ignored for host
    #[serde(default = "default_fwd_mode")]
    pub fwd_mode: String,

    /// Tunnel source address; empty when unset
    #[serde(default)]
    pub local_ip: String,

    /// Extra router arguments passed through to the agent
    #[serde(default)]
    pub router_info: Vec<String>,

    #[serde(default)]
    pub timings: SettleTimings,

    #[serde(default)]
    pub naming: NamingConfig,

    #[serde(default)]
    pub host: HostConfig,
}

// Default functions
fn default_port_settle() -> u64 {
    300
}

fn default_uplink_reconnect() -> u64 {
    1000
}

fn default_teardown_settle() -> u64 {
    300
}

fn default_pair_anchor() -> String {
    DEFAULT_PAIR_ANCHOR.to_string()
}

fn default_host_subnet() -> Ipv4Addr {
    Ipv4Addr::new(172, 20, 0, 0)
}

fn default_bridge_name() -> String {
    "contivVxlanBridge".to_string()
}

fn default_network_type() -> String {
    "vxlan".to_string()
}

fn default_fwd_mode() -> String {
    "bridge".to_string()
}

impl Default for SettleTimings {
    fn default() -> Self {
        Self {
            port_settle_ms: default_port_settle(),
            uplink_reconnect_ms: default_uplink_reconnect(),
            teardown_settle_ms: default_teardown_settle(),
        }
    }
}

impl SettleTimings {
    /// No waiting at all, for in-memory collaborators
    pub fn zero() -> Self {
        Self {
            port_settle_ms: 0,
            uplink_reconnect_ms: 0,
            teardown_settle_ms: 0,
        }
    }

    pub fn port_settle(&self) -> Duration {
        Duration::from_millis(self.port_settle_ms)
    }

    pub fn uplink_reconnect(&self) -> Duration {
        Duration::from_millis(self.uplink_reconnect_ms)
    }

    pub fn teardown_settle(&self) -> Duration {
        Duration::from_millis(self.teardown_settle_ms)
    }
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            pair_anchor: default_pair_anchor(),
        }
    }
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            subnet: default_host_subnet(),
        }
    }
}

impl Default for SwitchConfig {
    fn default() -> Self {
        Self {
            bridge_name: default_bridge_name(),
            network_type: default_network_type(),
            fwd_mode: default_fwd_mode(),
            local_ip: String::new(),
            router_info: Vec::new(),
            timings: SettleTimings::default(),
            naming: NamingConfig::default(),
            host: HostConfig::default(),
        }
    }
}

impl SwitchConfig {
    /// Load configuration from file, falling back to defaults if file not found
    pub fn load_or_default(path: impl AsRef<Path>) -> SwitchResult<Self> {
        let path = path.as_ref();

        match fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(|e| {
                SwitchError::invalid_config(
                    "config file",
                    format!("Failed to parse {}: {}", path.display(), e),
                )
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "Config file not found, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(SwitchError::resource_unavailable(
                format!("config file {}", path.display()),
                e.to_string(),
            )),
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> SwitchResult<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self).map_err(|e| {
            SwitchError::invalid_config("config file", format!("Failed to serialize: {}", e))
        })?;

        fs::write(path, content).map_err(|e| {
            SwitchError::resource_unavailable(
                format!("config file {}", path.display()),
                e.to_string(),
            )
        })
    }

    /// Parsed network type
    pub fn network_type(&self) -> SwitchResult<NetworkType> {
        self.network_type.parse()
    }

    /// Parsed forwarding mode
    pub fn fwd_mode(&self) -> SwitchResult<ForwardingMode> {
        self.fwd_mode.parse()
    }

    /// Parsed local IP; empty means unset
    pub fn local_ip(&self) -> SwitchResult<Option<IpAddr>> {
        if self.local_ip.is_empty() {
            return Ok(None);
        }
        self.local_ip.parse().map(Some).map_err(|_| {
            SwitchError::invalid_config("local_ip", format!("'{}' is not an IP", self.local_ip))
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> SwitchResult<()> {
        if self.bridge_name.is_empty() {
            return Err(SwitchError::invalid_config(
                "bridge_name",
                "must not be empty",
            ));
        }

        if self.network_type()? != NetworkType::Host {
            self.fwd_mode()?;
        }

        self.local_ip()?;

        if self.naming.pair_anchor.is_empty() {
            return Err(SwitchError::invalid_config(
                "naming.pair_anchor",
                "must not be empty",
            ));
        }

        Ok(())
    }
}
