//! Shell-backed link layer

use async_trait::async_trait;
use ovsnet_common::{shell, LinkLayer, SwitchResult};
#[cfg(test)]
use parking_lot::Mutex;
use tracing::debug;

use crate::commands::*;

/// Link layer driving `/sbin/ip`
pub struct ShellLinkLayer {
    #[cfg(test)]
    mock_mode: bool,

    #[cfg(test)]
    captured_commands: Mutex<Vec<String>>,
}

impl ShellLinkLayer {
    pub fn new() -> Self {
        Self {
            #[cfg(test)]
            mock_mode: false,
            #[cfg(test)]
            captured_commands: Mutex::new(Vec::new()),
        }
    }

    #[cfg(test)]
    pub fn new_mock() -> Self {
        let mut link = Self::new();
        link.mock_mode = true;
        link
    }

    #[cfg(test)]
    pub fn get_captured_commands(&self) -> Vec<String> {
        self.captured_commands.lock().clone()
    }

    /// Execute shell command (or capture in mock mode)
    async fn exec(&self, cmd: &str) -> SwitchResult<()> {
        #[cfg(test)]
        if self.mock_mode {
            self.captured_commands.lock().push(cmd.to_string());
            return Ok(());
        }

        shell::exec_or_throw(cmd).await.map(|_| ())
    }
}

impl Default for ShellLinkLayer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LinkLayer for ShellLinkLayer {
    async fn create_veth_pair(&self, name: &str, peer: &str) -> SwitchResult<()> {
        debug!(name, peer, "Creating veth pair");
        self.exec(&build_add_veth_pair_cmd(name, peer)).await
    }

    async fn delete_veth_pair(&self, name: &str, peer: &str) -> SwitchResult<()> {
        debug!(name, peer, "Deleting veth pair");
        self.exec(&build_del_veth_pair_cmd(name)).await
    }

    async fn set_link_up(&self, name: &str) -> SwitchResult<()> {
        self.exec(&build_set_link_up_cmd(name)).await
    }

    async fn set_link_mtu(&self, name: &str, mtu: u32) -> SwitchResult<()> {
        self.exec(&build_set_link_mtu_cmd(name, mtu)).await
    }

    async fn set_link_mac(&self, name: &str, mac: &str) -> SwitchResult<()> {
        self.exec(&build_set_link_mac_cmd(name, mac)).await
    }

    async fn set_link_ip(&self, name: &str, cidr: &str) -> SwitchResult<()> {
        self.exec(&build_add_link_addr_cmd(name, cidr)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_veth_lifecycle_commands() {
        let link = ShellLinkLayer::new_mock();

        link.create_veth_pair("port1", "vport1").await.unwrap();
        link.set_link_up("vport1").await.unwrap();
        link.set_link_mtu("port1", 1450).await.unwrap();
        link.delete_veth_pair("port1", "vport1").await.unwrap();

        let cmds = link.get_captured_commands();
        assert_eq!(cmds.len(), 4);
        assert!(cmds[0].contains("type veth peer name \"vport1\""));
        assert!(cmds[1].contains("\"vport1\" up"));
        assert!(cmds[2].contains("mtu 1450"));
        assert_eq!(cmds[3], "/sbin/ip link del \"port1\"");
    }

    #[tokio::test]
    async fn test_host_addressing_commands() {
        let link = ShellLinkLayer::new_mock();

        link.set_link_mac("hport1", "02:02:ac:14:00:05").await.unwrap();
        link.set_link_ip("hport1", "172.20.0.5/16").await.unwrap();

        let cmds = link.get_captured_commands();
        assert!(cmds[0].contains("address \"02:02:ac:14:00:05\""));
        assert!(cmds[1].contains("addr add \"172.20.0.5/16\" dev \"hport1\""));
    }
}
