//! Endpoint port provisioning
//!
//! Creating a port touches the kernel, the config store and the control
//! agent in that order. Once the port is registered in the store, any later
//! failure deletes the registration again before the error is returned.

use ovsnet_common::endpoint::parse_ip_lenient;
use ovsnet_common::store::{INTF_TYPE_INTERNAL, INTF_TYPE_SYSTEM};
use ovsnet_common::{
    EndpointConfig, EndpointInfo, MacAddress, OperEndpointState, PortSpec, SwitchError,
    SwitchResult,
};
use tracing::{debug, error, info, instrument, warn};

use crate::switch::OvsSwitch;
use crate::types::VXLAN_ENDPOINT_MTU;

/// Everything needed to provision one endpoint port.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PortRequest {
    /// Namespace-side interface name.
    pub intf_name: String,
    pub endpoint: EndpointConfig,
    /// Endpoint-group tag; the port's access VLAN.
    pub pkt_tag: u16,
    /// Network tag reported to the agent.
    pub nw_pkt_tag: u16,
    pub burst: u32,
    pub dscp: u8,
    /// Attach `intf_name` directly as an internal port instead of a veth pair.
    pub skip_veth_pair: bool,
    pub bandwidth: u64,
}

impl PortRequest {
    fn endpoint_info(&self, port_no: u32) -> EndpointInfo {
        let mac_addr = MacAddress::parse_lenient(&self.endpoint.mac_address);
        if mac_addr.is_none() {
            warn!(
                intf = %self.intf_name,
                mac = %self.endpoint.mac_address,
                "Malformed endpoint MAC, registering without one"
            );
        }

        EndpointInfo {
            port_no,
            mac_addr,
            vlan: self.nw_pkt_tag,
            ip_addr: parse_ip_lenient(&self.endpoint.ip_address),
            ipv6_addr: parse_ip_lenient(&self.endpoint.ipv6_address),
            endpoint_group: self.endpoint.endpoint_group_id,
            endpoint_group_vlan: self.pkt_tag,
            dscp: self.dscp,
        }
    }
}

impl OvsSwitch {
    /// Provisions an endpoint port and registers it with the control agent.
    #[instrument(skip(self, req), fields(bridge = %self.bridge_name, intf = %req.intf_name))]
    pub async fn create_port(&self, req: &PortRequest) -> SwitchResult<()> {
        if self.agent().is_none() {
            return Err(self.misuse("create port"));
        }

        let port_name = self.naming.ovs_port_name(&req.intf_name, req.skip_veth_pair);

        let intf_type = if req.skip_veth_pair {
            INTF_TYPE_INTERNAL
        } else {
            self.link
                .create_veth_pair(&req.intf_name, &port_name)
                .await
                .map_err(|e| {
                    error!(error = %e, "Failed to create veth pair");
                    e
                })?;
            self.link.set_link_up(&port_name).await.map_err(|e| {
                error!(port = %port_name, error = %e, "Failed to bring up port");
                e
            })?;
            INTF_TYPE_SYSTEM
        };

        self.remove_stale_port(&port_name).await;

        let spec = PortSpec {
            name: port_name.clone(),
            intf_type: intf_type.to_string(),
            attachment_id: req.endpoint.id.clone(),
            tag: req.pkt_tag,
            burst: req.burst,
            bandwidth: req.bandwidth,
        };
        self.store.create_port(&spec).await.map_err(|e| {
            error!(port = %port_name, error = %e, "Failed to register port");
            e
        })?;

        if let Err(e) = self.attach_port(req, &port_name).await {
            error!(port = %port_name, error = %e, "Port provisioning failed, rolling back");
            self.compensate_port(&port_name).await;
            return Err(e);
        }

        info!(port = %port_name, endpoint = %req.endpoint.id, "Port created");
        Ok(())
    }

    async fn attach_port(&self, req: &PortRequest, port_name: &str) -> SwitchResult<()> {
        self.settle(self.timings.port_settle()).await;

        self.link
            .set_link_mtu(&req.intf_name, VXLAN_ENDPOINT_MTU)
            .await?;
        self.link
            .set_link_mac(&req.intf_name, &req.endpoint.mac_address)
            .await?;

        let port_no = self.resolve_port_no(port_name).await?;
        let endpoint = req.endpoint_info(port_no);

        self.backend.attach_endpoint(&endpoint).await
    }

    /// Updates policing and DSCP of an existing port.
    #[instrument(skip(self), fields(bridge = %self.bridge_name))]
    pub async fn update_endpoint(
        &self,
        port_name: &str,
        burst: u32,
        dscp: u8,
        bandwidth: u64,
    ) -> SwitchResult<()> {
        self.store
            .update_policing_rate(port_name, burst, bandwidth)
            .await
            .map_err(|e| {
                error!(port = %port_name, error = %e, "Failed to update policing rate");
                e
            })?;

        let Some(agent) = self.agent() else {
            debug!(port = %port_name, "No control agent, policing updated only");
            return Ok(());
        };

        let port_no = self.resolve_port_no(port_name).await?;
        let endpoint = EndpointInfo {
            port_no,
            dscp,
            ..Default::default()
        };
        agent.update_local_endpoint(&endpoint).await.map_err(|e| {
            error!(port = %port_name, error = %e, "Failed to update endpoint");
            e
        })?;

        info!(port = %port_name, bandwidth, burst, dscp, "Endpoint updated");
        Ok(())
    }

    /// Re-sends the full endpoint descriptor of an existing port.
    ///
    /// Links and the config store are left untouched.
    #[instrument(skip(self, req), fields(bridge = %self.bridge_name, intf = %req.intf_name))]
    pub async fn update_port(&self, req: &PortRequest) -> SwitchResult<()> {
        let Some(agent) = self.agent() else {
            return Ok(());
        };

        let port_name = self.naming.ovs_port_name(&req.intf_name, req.skip_veth_pair);
        let port_no = self.resolve_port_no(&port_name).await?;
        let endpoint = req.endpoint_info(port_no);

        agent.add_local_endpoint(&endpoint).await.map_err(|e| {
            error!(port = %port_name, error = %e, "Failed to update port");
            e
        })?;

        debug!(port = %port_name, port_no, "Port descriptor refreshed");
        Ok(())
    }

    /// Removes an endpoint port from the agent, the store and the kernel.
    ///
    /// Every step is attempted; the last failure is returned. Ports owned by
    /// a VTEP are left alone.
    #[instrument(skip(self, oper), fields(bridge = %self.bridge_name, intf = %oper.port_name))]
    pub async fn delete_port(
        &self,
        oper: &OperEndpointState,
        skip_veth_pair: bool,
    ) -> SwitchResult<()> {
        if oper.is_vtep() {
            debug!(vtep = %oper.vtep_ip, "Port belongs to a VTEP, skipping");
            return Ok(());
        }

        let port_name = self.naming.ovs_port_name(&oper.port_name, skip_veth_pair);
        let mut last_err: Option<SwitchError> = None;

        match self.resolve_port_no(&port_name).await {
            Ok(port_no) if self.agent().is_some() => {
                if let Err(e) = self.backend.detach_endpoint(port_no).await {
                    warn!(port = %port_name, port_no, error = %e, "Failed to remove endpoint");
                }
            }
            Ok(_) => {}
            Err(e) => last_err = Some(e),
        }

        if let Err(e) = self.store.delete_port(&port_name).await {
            error!(port = %port_name, error = %e, "Failed to delete port");
            last_err = Some(e);
        }

        if !skip_veth_pair {
            if let Err(e) = self
                .link
                .delete_veth_pair(&oper.port_name, &port_name)
                .await
            {
                error!(port = %port_name, error = %e, "Failed to delete veth pair");
                last_err = Some(e);
            }
        }

        match last_err {
            Some(e) => Err(e),
            None => {
                info!(port = %port_name, "Port deleted");
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(mac: &str, ipv6: &str) -> PortRequest {
        PortRequest {
            intf_name: "port1".to_string(),
            endpoint: EndpointConfig {
                id: "ep1".to_string(),
                mac_address: mac.to_string(),
                ip_address: "10.1.1.5".to_string(),
                ipv6_address: ipv6.to_string(),
                endpoint_group_id: 7,
            },
            pkt_tag: 5,
            nw_pkt_tag: 100,
            dscp: 10,
            ..Default::default()
        }
    }

    #[test]
    fn test_endpoint_info_tags() {
        let info = request("02:00:00:00:00:01", "").endpoint_info(9);
        assert_eq!(info.port_no, 9);
        assert_eq!(info.vlan, 100);
        assert_eq!(info.endpoint_group_vlan, 5);
        assert_eq!(info.endpoint_group, 7);
        assert_eq!(info.dscp, 10);
        assert_eq!(info.mac_addr.unwrap().to_string(), "02:00:00:00:00:01");
        assert_eq!(info.ip_addr, Some("10.1.1.5".parse().unwrap()));
        assert_eq!(info.ipv6_addr, None);
    }

    #[test]
    fn test_endpoint_info_malformed_mac() {
        let info = request("not-a-mac", "2001:db8::5").endpoint_info(1);
        assert_eq!(info.mac_addr, None);
        assert_eq!(info.ipv6_addr, Some("2001:db8::5".parse().unwrap()));
    }
}
