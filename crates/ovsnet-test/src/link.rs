//! In-memory link layer

use std::collections::BTreeMap;

use async_trait::async_trait;
use ovsnet_common::{LinkLayer, SwitchError, SwitchResult};
use parking_lot::Mutex;

use crate::recorder::{CallLog, FailureInjector};

/// Observable state of one interface.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkState {
    /// Other end of the veth pair, if this is one.
    pub peer: Option<String>,
    pub up: bool,
    pub mtu: Option<u32>,
    pub mac: Option<String>,
    pub addrs: Vec<String>,
}

/// Link layer tracking interfaces by name.
///
/// Veth pairs must be created before they are deleted. Interfaces that
/// were not created through the fake (internal ports) are tracked from
/// their first configuration call.
#[derive(Debug)]
pub struct FakeLinkLayer {
    log: CallLog,
    failures: FailureInjector,
    links: Mutex<BTreeMap<String, LinkState>>,
}

impl FakeLinkLayer {
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            failures: FailureInjector::new(),
            links: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn failures(&self) -> &FailureInjector {
        &self.failures
    }

    pub fn link(&self, name: &str) -> Option<LinkState> {
        self.links.lock().get(name).cloned()
    }

    pub fn link_names(&self) -> Vec<String> {
        self.links.lock().keys().cloned().collect()
    }

    pub fn exists(&self, name: &str) -> bool {
        self.links.lock().contains_key(name)
    }

    fn check(&self, op: &str, name: &str) -> SwitchResult<()> {
        match self.failures.store_error(op, name) {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn update(&self, name: &str, f: impl FnOnce(&mut LinkState)) {
        f(self.links.lock().entry(name.to_string()).or_default());
    }
}

#[async_trait]
impl LinkLayer for FakeLinkLayer {
    async fn create_veth_pair(&self, name: &str, peer: &str) -> SwitchResult<()> {
        self.log
            .record("link", "create_veth_pair", format!("{} {}", name, peer));
        self.check("create_veth_pair", name)?;

        let mut links = self.links.lock();
        if links.contains_key(name) || links.contains_key(peer) {
            return Err(SwitchError::resource_unavailable(
                "create_veth_pair",
                format!("{} or {} already exists", name, peer),
            ));
        }
        links.insert(
            name.to_string(),
            LinkState {
                peer: Some(peer.to_string()),
                ..Default::default()
            },
        );
        links.insert(
            peer.to_string(),
            LinkState {
                peer: Some(name.to_string()),
                ..Default::default()
            },
        );
        Ok(())
    }

    async fn delete_veth_pair(&self, name: &str, peer: &str) -> SwitchResult<()> {
        self.log
            .record("link", "delete_veth_pair", format!("{} {}", name, peer));
        self.check("delete_veth_pair", name)?;

        let mut links = self.links.lock();
        let state = links.remove(name).ok_or_else(|| {
            SwitchError::resource_unavailable("delete_veth_pair", format!("no link {}", name))
        })?;
        if let Some(other) = state.peer {
            links.remove(&other);
        }
        Ok(())
    }

    async fn set_link_up(&self, name: &str) -> SwitchResult<()> {
        self.log.record("link", "set_link_up", name);
        self.check("set_link_up", name)?;
        self.update(name, |l| l.up = true);
        Ok(())
    }

    async fn set_link_mtu(&self, name: &str, mtu: u32) -> SwitchResult<()> {
        self.log
            .record("link", "set_link_mtu", format!("{} {}", name, mtu));
        self.check("set_link_mtu", name)?;
        self.update(name, |l| l.mtu = Some(mtu));
        Ok(())
    }

    async fn set_link_mac(&self, name: &str, mac: &str) -> SwitchResult<()> {
        self.log
            .record("link", "set_link_mac", format!("{} {}", name, mac));
        self.check("set_link_mac", name)?;
        self.update(name, |l| l.mac = Some(mac.to_string()));
        Ok(())
    }

    async fn set_link_ip(&self, name: &str, cidr: &str) -> SwitchResult<()> {
        self.log
            .record("link", "set_link_ip", format!("{} {}", name, cidr));
        self.check("set_link_ip", name)?;
        self.update(name, |l| l.addrs.push(cidr.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_veth_pair_lifecycle() {
        let link = FakeLinkLayer::new(CallLog::new());

        link.create_veth_pair("port1", "vport1").await.unwrap();
        link.set_link_up("vport1").await.unwrap();
        assert_eq!(link.link("port1").unwrap().peer.as_deref(), Some("vport1"));
        assert!(link.link("vport1").unwrap().up);

        assert!(link.create_veth_pair("port1", "vport1").await.is_err());

        link.delete_veth_pair("port1", "vport1").await.unwrap();
        assert!(link.link_names().is_empty());
        assert!(link.delete_veth_pair("port1", "vport1").await.is_err());
    }

    #[tokio::test]
    async fn test_untracked_interface_configuration() {
        let link = FakeLinkLayer::new(CallLog::new());
        link.set_link_ip("hport1", "172.20.0.1/16").await.unwrap();

        let state = link.link("hport1").unwrap();
        assert_eq!(state.peer, None);
        assert_eq!(state.addrs, vec!["172.20.0.1/16"]);
    }
}
