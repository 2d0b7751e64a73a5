//! Switch bootstrap and teardown
//!
//! A switch binds one bridge in the config store to exactly one forwarding
//! backend. Construction runs the bootstrap in a fixed order:
//!
//! 1. Validate the config and parse the modes (no side effects)
//! 2. Connect the config store client in secure fail mode
//! 3. Build the control agent or host bridge
//! 4. Make sure the bridge points at the local controller
//! 5. Wait for the dataplane to connect

use std::net::{IpAddr, Ipv4Addr};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use ovsnet_common::store::controller_target;
use ovsnet_common::{
    AgentParams, BackendFactory, ConfigStore, ConfigStoreConnector, ControlAgent, Datapath,
    FailMode, ForwardingMode, HostBridge, LinkLayer, NetworkType, SwitchError, SwitchResult,
};
use tracing::{debug, error, info, instrument, warn};

use crate::backend::Backend;
use crate::config::{SettleTimings, SwitchConfig};
use crate::naming::PortNaming;
use crate::types::{SwitchProfile, CONTROLLER_IP};
use crate::uplink::UplinkRegistry;

/// Collaborators a switch is built from.
pub struct SwitchDeps<'a> {
    pub store: &'a dyn ConfigStoreConnector,
    pub backends: &'a dyn BackendFactory,
    pub link: Arc<dyn LinkLayer>,
}

/// A provisioned OVS bridge and its forwarding backend.
pub struct OvsSwitch {
    pub(crate) bridge_name: String,
    pub(crate) net_type: NetworkType,
    pub(crate) fwd_mode: Option<ForwardingMode>,
    pub(crate) profile: SwitchProfile,
    pub(crate) store: Arc<dyn ConfigStore>,
    pub(crate) backend: Backend,
    pub(crate) uplinks: UplinkRegistry,
    pub(crate) link: Arc<dyn LinkLayer>,
    pub(crate) naming: PortNaming,
    pub(crate) timings: SettleTimings,
    pub(crate) host_subnet: Ipv4Addr,
    deleted: AtomicBool,
}

impl OvsSwitch {
    /// Builds a switch and blocks until its dataplane is connected.
    ///
    /// The config is validated before any collaborator is touched. If a
    /// later step fails, everything acquired so far is released.
    #[instrument(skip(config, deps), fields(bridge = %config.bridge_name))]
    pub async fn new(config: &SwitchConfig, deps: SwitchDeps<'_>) -> SwitchResult<Self> {
        config.validate().map_err(|e| {
            error!(error = %e, "Invalid switch configuration");
            e
        })?;

        let net_type = config.network_type()?;
        let (fwd_mode, profile) = match net_type {
            NetworkType::Host => (None, SwitchProfile::host()),
            _ => {
                let mode = config.fwd_mode()?;
                let profile = SwitchProfile::for_agent(net_type, mode).ok_or_else(|| {
                    SwitchError::invalid_config(
                        "network_type",
                        format!("{} has no agent datapath", net_type),
                    )
                })?;
                (Some(mode), profile)
            }
        };
        let local_ip = config.local_ip()?;

        let store = deps
            .store
            .connect(&config.bridge_name, FailMode::Secure)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to connect to config store");
                e
            })?;

        let backend = match Self::build_backend(config, net_type, profile, local_ip, &deps).await {
            Ok(backend) => backend,
            Err(e) => {
                error!(error = %e, datapath = %profile.datapath, "Failed to build backend");
                store.delete().await;
                return Err(e);
            }
        };

        let target = controller_target(CONTROLLER_IP, profile.ctrl_port);
        if !store.is_controller_present(&target).await {
            if let Err(e) = store.add_controller(CONTROLLER_IP, profile.ctrl_port).await {
                error!(controller = %target, error = %e, "Failed to add controller");
                backend.delete().await;
                store.delete().await;
                return Err(e);
            }
            debug!(controller = %target, "Controller added");
        }

        backend.wait_for_switch_connection().await;

        info!(
            network_type = %net_type,
            datapath = %profile.datapath,
            ctrl_port = profile.ctrl_port,
            "Switch connected"
        );

        Ok(Self {
            bridge_name: config.bridge_name.clone(),
            net_type,
            fwd_mode,
            profile,
            store,
            backend,
            uplinks: UplinkRegistry::new(),
            link: deps.link,
            naming: PortNaming::new(config.naming.pair_anchor.clone()),
            timings: config.timings.clone(),
            host_subnet: config.host.subnet,
            deleted: AtomicBool::new(false),
        })
    }

    async fn build_backend(
        config: &SwitchConfig,
        net_type: NetworkType,
        profile: SwitchProfile,
        local_ip: Option<IpAddr>,
        deps: &SwitchDeps<'_>,
    ) -> SwitchResult<Backend> {
        if net_type == NetworkType::Host {
            let bridge = deps
                .backends
                .new_host_bridge(&config.bridge_name, profile.datapath, profile.ctrl_port)
                .await?;
            return Ok(Backend::HostBridge(bridge));
        }

        let params = AgentParams {
            bridge_name: config.bridge_name.clone(),
            datapath: profile.datapath,
            local_ip,
            agent_port: profile.agent_port,
            ctrl_port: profile.ctrl_port,
            router_info: config.router_info.clone(),
        };
        let agent = deps.backends.new_agent(&params).await?;
        Ok(Backend::Agent(agent))
    }

    /// Releases the backend and the config store client.
    ///
    /// Only the first call does anything.
    #[instrument(skip(self), fields(bridge = %self.bridge_name))]
    pub async fn delete(&self) {
        if self.deleted.swap(true, Ordering::SeqCst) {
            debug!("Switch already deleted");
            return;
        }

        self.backend.delete().await;
        self.store.delete().await;
        tokio::time::sleep(self.timings.teardown_settle()).await;

        info!("Switch deleted");
    }

    pub fn bridge_name(&self) -> &str {
        &self.bridge_name
    }

    pub fn network_type(&self) -> NetworkType {
        self.net_type
    }

    /// Forwarding mode; `None` for host-only switches.
    pub fn fwd_mode(&self) -> Option<ForwardingMode> {
        self.fwd_mode
    }

    pub fn datapath(&self) -> Datapath {
        self.profile.datapath
    }

    pub fn profile(&self) -> SwitchProfile {
        self.profile
    }

    pub fn backend(&self) -> &Backend {
        &self.backend
    }

    pub fn naming(&self) -> &PortNaming {
        &self.naming
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted.load(Ordering::SeqCst)
    }

    pub(crate) fn agent(&self) -> Option<&Arc<dyn ControlAgent>> {
        self.backend.agent()
    }

    pub(crate) fn host_bridge(&self) -> Option<&Arc<dyn HostBridge>> {
        self.backend.host_bridge()
    }

    /// Builds (and logs) a misuse error for `operation`.
    pub(crate) fn misuse(&self, operation: &str) -> SwitchError {
        let err = SwitchError::misuse(operation, self.net_type);
        error!(bridge = %self.bridge_name, error = %err, "Invalid operation for switch type");
        err
    }

    pub(crate) fn no_agent(&self) -> SwitchError {
        SwitchError::NoControlAgent {
            bridge: self.bridge_name.clone(),
        }
    }

    pub(crate) async fn settle(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    pub(crate) async fn resolve_port_no(&self, port_name: &str) -> SwitchResult<u32> {
        self.store.ofp_port_no(port_name).await.map_err(|e| {
            error!(port = %port_name, error = %e, "Failed to resolve port number");
            e
        })
    }

    /// Deletes a leftover store entry with this name, if any.
    pub(crate) async fn remove_stale_port(&self, port_name: &str) {
        if !self.store.is_port_name_present(port_name).await {
            return;
        }
        debug!(port = %port_name, "Replacing existing port");
        if let Err(e) = self.store.delete_port(port_name).await {
            warn!(port = %port_name, error = %e, "Failed to delete existing port");
        }
    }

    /// Undoes a store registration after a later step failed.
    pub(crate) async fn compensate_port(&self, port_name: &str) {
        if let Err(e) = self.store.delete_port(port_name).await {
            warn!(port = %port_name, error = %e, "Failed to roll back port registration");
        }
    }
}
