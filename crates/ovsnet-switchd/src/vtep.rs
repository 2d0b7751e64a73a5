//! Overlay tunnel endpoints.

use std::net::IpAddr;

use ovsnet_common::SwitchResult;
use tracing::{debug, error, info, instrument, warn};

use crate::naming::vxlan_if_name;
use crate::switch::OvsSwitch;

impl OvsSwitch {
    /// Creates (or adopts) the VTEP towards `vtep_ip` and registers it with
    /// the control agent, when one is bound.
    #[instrument(skip(self), fields(bridge = %self.bridge_name))]
    pub async fn create_vtep(&self, vtep_ip: IpAddr) -> SwitchResult<()> {
        let intf_name = vxlan_if_name(vtep_ip);

        match self.store.is_vtep_present(vtep_ip).await {
            Some(existing) if existing == intf_name => {
                debug!(vtep = %intf_name, "VTEP already present");
            }
            existing => {
                if let Some(old) = existing {
                    info!(
                        old = %old,
                        new = %intf_name,
                        "VTEP present under another name, recreating"
                    );
                }
                if let Err(e) = self.store.create_vtep(&intf_name, vtep_ip).await {
                    warn!(vtep = %intf_name, error = %e, "Failed to create VTEP interface");
                }
            }
        }

        self.settle(self.timings.port_settle()).await;

        let port_no = self.resolve_port_no(&intf_name).await?;
        if let Some(agent) = self.agent() {
            agent.add_vtep_port(port_no, vtep_ip).await.map_err(|e| {
                error!(vtep = %intf_name, port_no, error = %e, "Failed to add VTEP port");
                e
            })?;
        }

        info!(vtep = %intf_name, remote_ip = %vtep_ip, port_no, "VTEP created");
        Ok(())
    }

    /// Deregisters the VTEP towards `vtep_ip` and deletes its interface.
    ///
    /// Without a control agent only the store entry is removed.
    #[instrument(skip(self), fields(bridge = %self.bridge_name))]
    pub async fn delete_vtep(&self, vtep_ip: IpAddr) -> SwitchResult<()> {
        let intf_name = vxlan_if_name(vtep_ip);

        let port_no = self.resolve_port_no(&intf_name).await?;
        if let Some(agent) = self.agent() {
            agent.remove_vtep_port(port_no, vtep_ip).await.map_err(|e| {
                error!(vtep = %intf_name, port_no, error = %e, "Failed to remove VTEP port");
                e
            })?;
        }

        self.store.delete_vtep(&intf_name).await?;

        info!(vtep = %intf_name, remote_ip = %vtep_ip, "VTEP deleted");
        Ok(())
    }
}
