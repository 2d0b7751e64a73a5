//! `ovs-vsctl`-backed config store client

use std::net::IpAddr;
use std::sync::Arc;

use async_trait::async_trait;
use ovsnet_common::shell::{self, shellquote, OVS_VSCTL_CMD};
use ovsnet_common::store::{controller_target, INTF_TYPE_SYSTEM};
use ovsnet_common::{
    ConfigStore, ConfigStoreConnector, FailMode, PortSpec, SwitchError, SwitchResult,
};
#[cfg(test)]
use parking_lot::Mutex;
use tracing::{debug, info, instrument, warn};

/// External id key carrying the attachment id
pub const ATTACHMENT_ID_KEY: &str = "endpoint-id";

/// Build bridge creation command
pub fn build_add_bridge_cmd(bridge: &str, fail_mode: FailMode) -> String {
    format!(
        "{} --may-exist add-br {} -- set-fail-mode {} {}",
        OVS_VSCTL_CMD,
        shellquote(bridge),
        shellquote(bridge),
        fail_mode.as_str()
    )
}

/// Build bridge deletion command
pub fn build_del_bridge_cmd(bridge: &str) -> String {
    format!("{} --if-exists del-br {}", OVS_VSCTL_CMD, shellquote(bridge))
}

/// Build port listing command
pub fn build_list_ports_cmd(bridge: &str) -> String {
    format!("{} list-ports {}", OVS_VSCTL_CMD, shellquote(bridge))
}

/// Build port creation command
///
/// Tag 0 leaves the port untagged; bandwidth 0 leaves policing off.
pub fn build_add_port_cmd(bridge: &str, spec: &PortSpec) -> String {
    let mut cmd = format!(
        "{} --may-exist add-port {} {}",
        OVS_VSCTL_CMD,
        shellquote(bridge),
        shellquote(&spec.name)
    );
    if spec.tag != 0 {
        cmd.push_str(&format!(" tag={}", spec.tag));
    }

    cmd.push_str(&format!(" -- set Interface {}", shellquote(&spec.name)));
    if spec.intf_type != INTF_TYPE_SYSTEM {
        cmd.push_str(&format!(" type={}", shellquote(&spec.intf_type)));
    }
    cmd.push_str(&format!(
        " {}",
        shellquote(&format!(
            "external_ids:{}={}",
            ATTACHMENT_ID_KEY, spec.attachment_id
        ))
    ));
    if spec.bandwidth != 0 {
        cmd.push_str(&format!(
            " ingress_policing_rate={} ingress_policing_burst={}",
            spec.bandwidth, spec.burst
        ));
    }
    cmd
}

/// Build port deletion command
pub fn build_del_port_cmd(bridge: &str, name: &str) -> String {
    format!(
        "{} --if-exists del-port {} {}",
        OVS_VSCTL_CMD,
        shellquote(bridge),
        shellquote(name)
    )
}

/// Build ingress policing update command
pub fn build_set_policing_cmd(name: &str, burst: u32, bandwidth: u64) -> String {
    format!(
        "{} set Interface {} ingress_policing_rate={} ingress_policing_burst={}",
        OVS_VSCTL_CMD,
        shellquote(name),
        bandwidth,
        burst
    )
}

/// Build OpenFlow port number query
pub fn build_get_ofport_cmd(name: &str) -> String {
    format!("{} get Interface {} ofport", OVS_VSCTL_CMD, shellquote(name))
}

/// Build controller listing command
pub fn build_get_controller_cmd(bridge: &str) -> String {
    format!("{} get-controller {}", OVS_VSCTL_CMD, shellquote(bridge))
}

/// Build controller list replacement command
pub fn build_set_controller_cmd(bridge: &str, targets: &[String]) -> String {
    let quoted: Vec<String> = targets.iter().map(|t| shellquote(t)).collect();
    format!(
        "{} set-controller {} {}",
        OVS_VSCTL_CMD,
        shellquote(bridge),
        quoted.join(" ")
    )
}

/// Build VTEP lookup by remote IP
pub fn build_find_vtep_cmd(remote_ip: IpAddr) -> String {
    format!(
        "{} --bare --columns=name find Interface type=vxlan {}",
        OVS_VSCTL_CMD,
        shellquote(&format!("options:remote_ip=\"{}\"", remote_ip))
    )
}

/// Build VTEP creation command
pub fn build_add_vtep_cmd(bridge: &str, name: &str, remote_ip: IpAddr) -> String {
    format!(
        "{} --may-exist add-port {} {} -- set Interface {} type=vxlan {} options:key=flow",
        OVS_VSCTL_CMD,
        shellquote(bridge),
        shellquote(name),
        shellquote(name),
        shellquote(&format!("options:remote_ip=\"{}\"", remote_ip))
    )
}

/// Parse `get Interface <p> ofport` output
///
/// OVS reports `-1` or `[]` until the datapath has assigned a number.
pub fn parse_ofport(name: &str, output: &str) -> SwitchResult<u32> {
    match output.trim() {
        "" | "[]" | "-1" => Err(SwitchError::port_not_ready(name)),
        value => value.parse::<u32>().map_err(|_| {
            SwitchError::resource_unavailable(
                format!("ofport of {}", name),
                format!("unexpected value '{}'", value),
            )
        }),
    }
}

/// Split a single-column vsctl listing into names
pub fn parse_name_list(output: &str) -> Vec<String> {
    output
        .lines()
        .map(|l| l.trim().trim_matches('"'))
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

/// Config store client bound to one bridge
pub struct OvsVsctl {
    bridge: String,

    #[cfg(test)]
    mock_mode: bool,

    #[cfg(test)]
    captured_commands: Mutex<Vec<String>>,
}

impl OvsVsctl {
    pub fn new(bridge: impl Into<String>) -> Self {
        Self {
            bridge: bridge.into(),
            #[cfg(test)]
            mock_mode: false,
            #[cfg(test)]
            captured_commands: Mutex::new(Vec::new()),
        }
    }

    #[cfg(test)]
    pub fn new_mock(bridge: &str) -> Self {
        let mut client = Self::new(bridge);
        client.mock_mode = true;
        client
    }

    #[cfg(test)]
    pub fn get_captured_commands(&self) -> Vec<String> {
        self.captured_commands.lock().clone()
    }

    pub fn bridge(&self) -> &str {
        &self.bridge
    }

    /// Execute shell command (or capture in mock mode)
    async fn exec(&self, cmd: &str) -> SwitchResult<String> {
        #[cfg(test)]
        if self.mock_mode {
            self.captured_commands.lock().push(cmd.to_string());
            return Ok(String::new());
        }

        shell::exec_or_throw(cmd).await
    }

    async fn controllers(&self) -> SwitchResult<Vec<String>> {
        let output = self.exec(&build_get_controller_cmd(&self.bridge)).await?;
        Ok(parse_name_list(&output))
    }
}

#[async_trait]
impl ConfigStore for OvsVsctl {
    async fn is_port_name_present(&self, name: &str) -> bool {
        match self.exec(&build_list_ports_cmd(&self.bridge)).await {
            Ok(output) => parse_name_list(&output).iter().any(|p| p == name),
            Err(e) => {
                warn!(bridge = %self.bridge, error = %e, "Failed to list ports");
                false
            }
        }
    }

    async fn create_port(&self, spec: &PortSpec) -> SwitchResult<()> {
        self.exec(&build_add_port_cmd(&self.bridge, spec)).await?;
        debug!(bridge = %self.bridge, port = %spec.name, "Port added");
        Ok(())
    }

    async fn delete_port(&self, name: &str) -> SwitchResult<()> {
        self.exec(&build_del_port_cmd(&self.bridge, name)).await?;
        debug!(bridge = %self.bridge, port = %name, "Port deleted");
        Ok(())
    }

    async fn update_policing_rate(
        &self,
        name: &str,
        burst: u32,
        bandwidth: u64,
    ) -> SwitchResult<()> {
        self.exec(&build_set_policing_cmd(name, burst, bandwidth))
            .await
            .map(|_| ())
    }

    async fn ofp_port_no(&self, name: &str) -> SwitchResult<u32> {
        let output = self.exec(&build_get_ofport_cmd(name)).await?;
        parse_ofport(name, &output)
    }

    async fn is_controller_present(&self, target: &str) -> bool {
        match self.controllers().await {
            Ok(list) => list.iter().any(|c| c == target),
            Err(e) => {
                warn!(bridge = %self.bridge, error = %e, "Failed to read controllers");
                false
            }
        }
    }

    async fn add_controller(&self, ip: IpAddr, port: u16) -> SwitchResult<()> {
        let mut targets = self.controllers().await?;
        targets.push(controller_target(ip, port));
        self.exec(&build_set_controller_cmd(&self.bridge, &targets))
            .await
            .map(|_| ())
    }

    async fn is_vtep_present(&self, remote_ip: IpAddr) -> Option<String> {
        match self.exec(&build_find_vtep_cmd(remote_ip)).await {
            Ok(output) => parse_name_list(&output).into_iter().next(),
            Err(e) => {
                warn!(remote_ip = %remote_ip, error = %e, "VTEP lookup failed");
                None
            }
        }
    }

    async fn create_vtep(&self, name: &str, remote_ip: IpAddr) -> SwitchResult<()> {
        self.exec(&build_add_vtep_cmd(&self.bridge, name, remote_ip))
            .await
            .map(|_| ())
    }

    async fn delete_vtep(&self, name: &str) -> SwitchResult<()> {
        self.exec(&build_del_port_cmd(&self.bridge, name))
            .await
            .map(|_| ())
    }

    async fn delete(&self) {
        if let Err(e) = self.exec(&build_del_bridge_cmd(&self.bridge)).await {
            warn!(bridge = %self.bridge, error = %e, "Failed to delete bridge");
        }
    }
}

/// Opens `ovs-vsctl` clients, creating the bridge on connect
#[derive(Debug, Default, Clone)]
pub struct OvsVsctlConnector;

impl OvsVsctlConnector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ConfigStoreConnector for OvsVsctlConnector {
    #[instrument(skip(self))]
    async fn connect(
        &self,
        bridge: &str,
        fail_mode: FailMode,
    ) -> SwitchResult<Arc<dyn ConfigStore>> {
        shell::exec_or_throw(&build_add_bridge_cmd(bridge, fail_mode))
            .await
            .map_err(|e| {
                SwitchError::resource_unavailable(format!("bridge {}", bridge), e.to_string())
            })?;

        info!(bridge, fail_mode = fail_mode.as_str(), "Connected to config store");
        Ok(Arc::new(OvsVsctl::new(bridge)))
    }
}
