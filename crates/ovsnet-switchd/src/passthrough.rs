//! Operations forwarded to the control agent as-is.
//!
//! Mutations are no-ops on a switch without an agent; queries fail with
//! [`ovsnet_common::SwitchError::NoControlAgent`].

use std::collections::HashMap;

use ovsnet_common::{
    BgpConfig, EndpointStats, GlobalConfig, NetworkType, ServiceInfo, ServiceSpec, SwitchResult,
};
use tracing::{debug, info, instrument};

use crate::switch::OvsSwitch;

impl OvsSwitch {
    #[instrument(skip(self), fields(bridge = %self.bridge_name))]
    pub async fn create_network(
        &self,
        pkt_tag: u16,
        ext_pkt_tag: u32,
        gateway: &str,
        vrf: &str,
    ) -> SwitchResult<()> {
        let Some(agent) = self.agent() else {
            return Ok(());
        };
        agent.add_network(pkt_tag, ext_pkt_tag, gateway, vrf).await?;
        info!(pkt_tag, ext_pkt_tag, vrf, "Network added");
        Ok(())
    }

    #[instrument(skip(self), fields(bridge = %self.bridge_name))]
    pub async fn delete_network(
        &self,
        pkt_tag: u16,
        ext_pkt_tag: u32,
        gateway: &str,
        vrf: &str,
    ) -> SwitchResult<()> {
        let Some(agent) = self.agent() else {
            return Ok(());
        };
        agent
            .remove_network(pkt_tag, ext_pkt_tag, gateway, vrf)
            .await?;
        info!(pkt_tag, ext_pkt_tag, vrf, "Network removed");
        Ok(())
    }

    #[instrument(skip(self), fields(bridge = %self.bridge_name))]
    pub async fn add_master(&self, master: &ServiceInfo) -> SwitchResult<()> {
        match self.agent() {
            Some(agent) => agent.add_master(master).await,
            None => Ok(()),
        }
    }

    #[instrument(skip(self), fields(bridge = %self.bridge_name))]
    pub async fn delete_master(&self, master: &ServiceInfo) -> SwitchResult<()> {
        match self.agent() {
            Some(agent) => agent.remove_master(master).await,
            None => Ok(()),
        }
    }

    /// Starts BGP peering. Only VLAN switches peer.
    #[instrument(skip(self), fields(bridge = %self.bridge_name))]
    pub async fn add_bgp(&self, config: &BgpConfig) -> SwitchResult<()> {
        if self.net_type != NetworkType::Vlan {
            debug!(network_type = %self.net_type, "BGP not used on this switch type");
            return Ok(());
        }
        match self.agent() {
            Some(agent) => agent.add_bgp(config).await,
            None => Ok(()),
        }
    }

    #[instrument(skip(self), fields(bridge = %self.bridge_name))]
    pub async fn delete_bgp(&self) -> SwitchResult<()> {
        if self.net_type != NetworkType::Vlan {
            return Ok(());
        }
        match self.agent() {
            Some(agent) => agent.delete_bgp().await,
            None => Ok(()),
        }
    }

    #[instrument(skip(self, spec), fields(bridge = %self.bridge_name))]
    pub async fn add_svc_spec(&self, name: &str, spec: &ServiceSpec) -> SwitchResult<()> {
        match self.agent() {
            Some(agent) => agent.add_svc_spec(name, spec).await,
            None => Ok(()),
        }
    }

    #[instrument(skip(self, spec), fields(bridge = %self.bridge_name))]
    pub async fn del_svc_spec(&self, name: &str, spec: &ServiceSpec) -> SwitchResult<()> {
        match self.agent() {
            Some(agent) => agent.del_svc_spec(name, spec).await,
            None => Ok(()),
        }
    }

    pub async fn svc_provider_update(&self, name: &str, providers: &[String]) {
        if let Some(agent) = self.agent() {
            agent.svc_provider_update(name, providers).await;
        }
    }

    pub async fn get_endpoint_stats(&self) -> SwitchResult<HashMap<String, EndpointStats>> {
        self.agent()
            .ok_or_else(|| self.no_agent())?
            .get_endpoint_stats()
            .await
    }

    pub async fn inspect_state(&self) -> SwitchResult<serde_json::Value> {
        self.agent().ok_or_else(|| self.no_agent())?.inspect_state().await
    }

    pub async fn inspect_bgp(&self) -> SwitchResult<serde_json::Value> {
        self.agent().ok_or_else(|| self.no_agent())?.inspect_bgp().await
    }

    #[instrument(skip(self), fields(bridge = %self.bridge_name))]
    pub async fn global_config_update(&self, config: &GlobalConfig) -> SwitchResult<()> {
        let agent = self.agent().ok_or_else(|| self.no_agent())?;
        agent.global_config_update(config).await?;
        info!(arp_mode = ?config.arp_mode, "Global config updated");
        Ok(())
    }
}
