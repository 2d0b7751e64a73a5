//! Uplink ports of VLAN switches
//!
//! The registry holds every uplink that is registered with both the config
//! store and the control agent. One lock covers the whole registry and is
//! held for the full drain in [`OvsSwitch::remove_uplink_port`].

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use ovsnet_common::{ControlAgent, NetworkType, PortSpec, SwitchResult};
use tokio::sync::Mutex;
use tracing::{error, info, instrument, warn};

use crate::switch::OvsSwitch;
use crate::types::UPLINK_ID_PREFIX;

/// Role of an interface in the uplink registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UplinkRole {
    Port,
}

impl UplinkRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UplinkRole::Port => "port",
        }
    }
}

impl fmt::Display for UplinkRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Interface name to role, ordered by name.
#[derive(Debug, Default)]
pub struct UplinkRegistry {
    entries: Mutex<BTreeMap<String, UplinkRole>>,
}

impl UplinkRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the registry in name order.
    pub async fn snapshot(&self) -> Vec<(String, UplinkRole)> {
        self.entries
            .lock()
            .await
            .iter()
            .map(|(name, role)| (name.clone(), *role))
            .collect()
    }

    pub async fn contains(&self, name: &str) -> bool {
        self.entries.lock().await.contains_key(name)
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

impl OvsSwitch {
    /// Adds a trunk interface as an uplink. Only valid on VLAN switches.
    #[instrument(skip(self), fields(bridge = %self.bridge_name))]
    pub async fn add_uplink_port(&self, intf_name: &str) -> SwitchResult<()> {
        if self.net_type != NetworkType::Vlan {
            return Err(self.misuse("add uplink"));
        }
        let agent = self.agent().ok_or_else(|| self.no_agent())?;

        let created = if self.store.is_port_name_present(intf_name).await {
            false
        } else {
            let spec = PortSpec {
                name: intf_name.to_string(),
                attachment_id: format!("{}{}", UPLINK_ID_PREFIX, intf_name),
                ..Default::default()
            };
            self.store.create_port(&spec).await.map_err(|e| {
                error!(uplink = %intf_name, error = %e, "Failed to register uplink");
                e
            })?;
            true
        };

        // Port changes reset the control channel
        self.settle(self.timings.uplink_reconnect()).await;
        agent.wait_for_switch_connection().await;

        match self.register_uplink(agent, intf_name).await {
            Ok(port_no) => {
                self.uplinks
                    .entries
                    .lock()
                    .await
                    .insert(intf_name.to_string(), UplinkRole::Port);
                info!(uplink = %intf_name, port_no, "Uplink added");
                Ok(())
            }
            Err(e) => {
                error!(uplink = %intf_name, error = %e, "Failed to add uplink");
                if created {
                    self.compensate_port(intf_name).await;
                }
                Err(e)
            }
        }
    }

    async fn register_uplink(
        &self,
        agent: &Arc<dyn ControlAgent>,
        intf_name: &str,
    ) -> SwitchResult<u32> {
        let port_no = self.resolve_port_no(intf_name).await?;
        agent.add_uplink(port_no, intf_name).await?;
        Ok(port_no)
    }

    /// Removes every registered uplink in name order.
    ///
    /// The first failure stops the drain; that entry and all later ones stay
    /// registered.
    #[instrument(skip(self), fields(bridge = %self.bridge_name))]
    pub async fn remove_uplink_port(&self) -> SwitchResult<()> {
        if self.net_type != NetworkType::Vlan {
            return Err(self.misuse("remove uplink"));
        }
        let agent = self.agent().ok_or_else(|| self.no_agent())?;

        let mut entries = self.uplinks.entries.lock().await;
        let names: Vec<String> = entries.keys().cloned().collect();

        for name in names {
            let port_no = self.resolve_port_no(&name).await?;

            if self.store.is_port_name_present(&name).await {
                self.store.delete_port(&name).await.map_err(|e| {
                    error!(uplink = %name, error = %e, "Failed to delete uplink port");
                    e
                })?;
            } else {
                warn!(uplink = %name, "Uplink port already gone from store");
            }

            self.settle(self.timings.uplink_reconnect()).await;

            agent.remove_uplink(port_no).await.map_err(|e| {
                error!(uplink = %name, port_no, error = %e, "Failed to remove uplink");
                e
            })?;

            entries.remove(&name);
            info!(uplink = %name, port_no, "Uplink removed");
        }

        Ok(())
    }

    /// Registered uplinks in name order.
    pub async fn uplinks(&self) -> Vec<String> {
        self.uplinks
            .snapshot()
            .await
            .into_iter()
            .map(|(name, _)| name)
            .collect()
    }
}
