//! Host-facing ports of host-only switches.

use ovsnet_common::endpoint::parse_ip_lenient;
use ovsnet_common::store::{INTF_TYPE_INTERNAL, INTF_TYPE_SYSTEM};
use ovsnet_common::{EndpointInfo, PortSpec, SwitchResult};
use tracing::{error, info, instrument, warn};

use crate::naming::host_ip_mac;
use crate::switch::OvsSwitch;
use crate::types::{HOST_PORT_ID_PREFIX, HOST_VLAN};

impl OvsSwitch {
    /// Adds a host port with an address derived from `index`.
    ///
    /// A port living in the host namespace is an internal port registered
    /// with the host bridge; otherwise it is one end of a veth pair.
    #[instrument(skip(self), fields(bridge = %self.bridge_name))]
    pub async fn add_host_port(
        &self,
        intf_name: &str,
        index: u16,
        is_host_ns: bool,
    ) -> SwitchResult<()> {
        if self.host_bridge().is_none() {
            return Err(self.misuse("add host port"));
        }

        let port_name = self.naming.ovs_port_name(intf_name, is_host_ns);

        let intf_type = if is_host_ns {
            INTF_TYPE_INTERNAL
        } else {
            self.link
                .create_veth_pair(intf_name, &port_name)
                .await
                .map_err(|e| {
                    error!(intf = %intf_name, error = %e, "Failed to create veth pair");
                    e
                })?;
            self.link.set_link_up(&port_name).await?;
            INTF_TYPE_SYSTEM
        };

        self.remove_stale_port(&port_name).await;

        let spec = PortSpec {
            name: port_name.clone(),
            intf_type: intf_type.to_string(),
            attachment_id: format!("{}{}", HOST_PORT_ID_PREFIX, intf_name),
            tag: HOST_VLAN,
            ..Default::default()
        };
        self.store.create_port(&spec).await.map_err(|e| {
            error!(port = %port_name, error = %e, "Failed to register host port");
            e
        })?;

        if let Err(e) = self
            .attach_host_port(intf_name, &port_name, index, is_host_ns)
            .await
        {
            error!(port = %port_name, error = %e, "Host port provisioning failed, rolling back");
            self.compensate_port(&port_name).await;
            return Err(e);
        }

        info!(port = %port_name, index, is_host_ns, "Host port added");
        Ok(())
    }

    async fn attach_host_port(
        &self,
        intf_name: &str,
        port_name: &str,
        index: u16,
        is_host_ns: bool,
    ) -> SwitchResult<()> {
        self.settle(self.timings.port_settle()).await;

        let port_no = self.resolve_port_no(port_name).await?;
        let (cidr, mac) = host_ip_mac(self.host_subnet, index);

        self.link.set_link_mac(intf_name, &mac.to_string()).await?;
        self.link.set_link_ip(intf_name, &cidr).await?;
        self.link.set_link_up(intf_name).await?;

        if is_host_ns {
            let endpoint = EndpointInfo {
                port_no,
                mac_addr: Some(mac),
                ip_addr: parse_ip_lenient(&cidr),
                ..Default::default()
            };
            self.backend.attach_endpoint(&endpoint).await?;
        }
        Ok(())
    }

    /// Removes a host port from the store, the host bridge and the kernel.
    ///
    /// A port number that cannot be resolved is logged only; the host bridge
    /// is then not asked to deregister anything.
    #[instrument(skip(self), fields(bridge = %self.bridge_name))]
    pub async fn del_host_port(&self, intf_name: &str, is_host_ns: bool) -> SwitchResult<()> {
        if self.host_bridge().is_none() {
            return Err(self.misuse("delete host port"));
        }

        let port_name = self.naming.ovs_port_name(intf_name, is_host_ns);
        let port_no = match self.store.ofp_port_no(&port_name).await {
            Ok(port_no) => Some(port_no),
            Err(e) => {
                warn!(port = %port_name, error = %e, "Failed to resolve host port number");
                None
            }
        };

        if self.store.is_port_name_present(&port_name).await {
            if let Err(e) = self.store.delete_port(&port_name).await {
                warn!(port = %port_name, error = %e, "Failed to delete host port");
            }
        }

        if is_host_ns {
            match port_no {
                Some(port_no) => self.backend.detach_endpoint(port_no).await?,
                None => warn!(port = %port_name, "Port number unknown, host bridge left as is"),
            }
        } else {
            self.link
                .delete_veth_pair(intf_name, &port_name)
                .await
                .map_err(|e| {
                    error!(intf = %intf_name, error = %e, "Failed to delete veth pair");
                    e
                })?;
        }

        info!(port = %port_name, "Host port deleted");
        Ok(())
    }
}
