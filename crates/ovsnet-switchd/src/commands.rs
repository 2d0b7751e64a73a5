//! Shell command builders for link-layer operations

use ovsnet_common::shell::{shellquote, IP_CMD};

/// Build veth pair creation command
pub fn build_add_veth_pair_cmd(name: &str, peer: &str) -> String {
    format!(
        "{} link add {} txqueuelen 0 type veth peer name {}",
        IP_CMD,
        shellquote(name),
        shellquote(peer)
    )
}

/// Build veth pair deletion command
///
/// Deleting either end removes the pair.
pub fn build_del_veth_pair_cmd(name: &str) -> String {
    format!("{} link del {}", IP_CMD, shellquote(name))
}

/// Build link bring-up command
pub fn build_set_link_up_cmd(name: &str) -> String {
    format!("{} link set dev {} up", IP_CMD, shellquote(name))
}

/// Build link MTU command
pub fn build_set_link_mtu_cmd(name: &str, mtu: u32) -> String {
    format!("{} link set dev {} mtu {}", IP_CMD, shellquote(name), mtu)
}

/// Build link MAC address command
pub fn build_set_link_mac_cmd(name: &str, mac: &str) -> String {
    format!(
        "{} link set dev {} address {}",
        IP_CMD,
        shellquote(name),
        shellquote(mac)
    )
}

/// Build address assignment command
pub fn build_add_link_addr_cmd(name: &str, cidr: &str) -> String {
    format!(
        "{} addr add {} dev {}",
        IP_CMD,
        shellquote(cidr),
        shellquote(name)
    )
}
