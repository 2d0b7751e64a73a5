//! Contract of the host link layer.

use async_trait::async_trait;

use crate::error::SwitchResult;

/// Kernel link operations, all addressed by interface name.
#[async_trait]
pub trait LinkLayer: Send + Sync {
    /// Creates a veth pair `name`/`peer`.
    async fn create_veth_pair(&self, name: &str, peer: &str) -> SwitchResult<()>;

    /// Deletes the veth pair that `name` belongs to.
    async fn delete_veth_pair(&self, name: &str, peer: &str) -> SwitchResult<()>;

    async fn set_link_up(&self, name: &str) -> SwitchResult<()>;

    async fn set_link_mtu(&self, name: &str, mtu: u32) -> SwitchResult<()>;

    /// Sets the interface MAC from its string form.
    async fn set_link_mac(&self, name: &str, mac: &str) -> SwitchResult<()>;

    /// Adds an address in CIDR notation.
    async fn set_link_ip(&self, name: &str, cidr: &str) -> SwitchResult<()>;
}

