//! Interface naming and per-index host addressing.

use std::net::{IpAddr, Ipv4Addr};

use ovsnet_common::MacAddress;

/// Default anchor substituted in paired port names (`port1` -> `vport1`).
pub const DEFAULT_PAIR_ANCHOR: &str = "port";

/// Prefix of VTEP interface names.
pub const VXLAN_IF_PREFIX: &str = "vxif";

/// Prefix length of host-port addresses.
pub const HOST_PREFIX_LEN: u8 = 16;

/// Derives switch-side port names from namespace-side interface names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortNaming {
    anchor: String,
}

impl PortNaming {
    pub fn new(anchor: impl Into<String>) -> Self {
        Self {
            anchor: anchor.into(),
        }
    }

    pub fn anchor(&self) -> &str {
        &self.anchor
    }

    /// Returns the switch-side name for `intf_name`.
    ///
    /// With pairing, the first occurrence of the anchor gets a `v` prefix;
    /// names without the anchor, and unpaired names, are returned as is.
    pub fn ovs_port_name(&self, intf_name: &str, skip_veth_pair: bool) -> String {
        if skip_veth_pair || self.anchor.is_empty() {
            return intf_name.to_string();
        }
        intf_name.replacen(&self.anchor, &format!("v{}", self.anchor), 1)
    }
}

impl Default for PortNaming {
    fn default() -> Self {
        Self::new(DEFAULT_PAIR_ANCHOR)
    }
}

/// Returns the VTEP interface name for a tunnel peer.
///
/// IPv4 octets are zero-padded before the dots are dropped, so distinct
/// peers never share a name (`1.11.1.1` and `11.1.1.1` differ).
pub fn vxlan_if_name(vtep_ip: IpAddr) -> String {
    match vtep_ip {
        IpAddr::V4(v4) => {
            let digits: String = v4.octets().iter().map(|o| format!("{:03}", o)).collect();
            format!("{}{}", VXLAN_IF_PREFIX, digits)
        }
        IpAddr::V6(v6) => {
            let digits: String = v6.segments().iter().map(|s| format!("{:04x}", s)).collect();
            format!("{}{}", VXLAN_IF_PREFIX, digits)
        }
    }
}

/// Derives the host-port address and MAC for interface number `index`.
///
/// The upper two octets come from `subnet`, the lower two from `index`;
/// the MAC is `02:02` followed by the four address octets.
pub fn host_ip_mac(subnet: Ipv4Addr, index: u16) -> (String, MacAddress) {
    let [b0, b1, _, _] = subnet.octets();
    let [b2, b3] = index.to_be_bytes();
    let ip = format!("{}/{}", Ipv4Addr::new(b0, b1, b2, b3), HOST_PREFIX_LEN);
    let mac = MacAddress::new([0x02, 0x02, b0, b1, b2, b3]);
    (ip, mac)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_ovs_port_name_paired() {
        let naming = PortNaming::default();
        assert_eq!(naming.ovs_port_name("port1", false), "vport1");
        assert_eq!(naming.ovs_port_name("ep-port-port", false), "ep-vport-port");
    }

    #[test]
    fn test_ovs_port_name_skip_pairing() {
        let naming = PortNaming::default();
        assert_eq!(naming.ovs_port_name("port1", true), "port1");
    }

    #[test]
    fn test_ovs_port_name_without_anchor() {
        let naming = PortNaming::default();
        assert_eq!(naming.ovs_port_name("eth0", false), "eth0");
    }

    #[test]
    fn test_ovs_port_name_custom_anchor() {
        let naming = PortNaming::new("eth");
        assert_eq!(naming.ovs_port_name("eth-a", false), "veth-a");
        assert_eq!(naming.ovs_port_name("eth-a", true), "eth-a");
    }

    #[test]
    fn test_vxlan_if_name() {
        let ip: IpAddr = "10.0.0.1".parse().unwrap();
        assert_eq!(vxlan_if_name(ip), "vxif010000000001");
        assert_eq!(vxlan_if_name(ip), vxlan_if_name(ip));
    }

    #[test]
    fn test_vxlan_if_name_no_collisions() {
        let a: IpAddr = "1.11.1.1".parse().unwrap();
        let b: IpAddr = "11.1.1.1".parse().unwrap();
        assert_ne!(vxlan_if_name(a), vxlan_if_name(b));

        let names: HashSet<String> = (0..=255u8)
            .flat_map(|x| {
                [
                    IpAddr::V4(Ipv4Addr::new(10, x, 1, 1)),
                    IpAddr::V4(Ipv4Addr::new(10, 1, x, 1)),
                ]
            })
            .map(vxlan_if_name)
            .collect();
        // (10.1.1.1) appears in both sequences
        assert_eq!(names.len(), 511);
    }

    #[test]
    fn test_host_ip_mac() {
        let subnet = Ipv4Addr::new(172, 20, 0, 0);
        let (ip, mac) = host_ip_mac(subnet, 5);
        assert_eq!(ip, "172.20.0.5/16");
        assert_eq!(mac.to_string(), "02:02:ac:14:00:05");

        let (ip, mac) = host_ip_mac(subnet, 0x0102);
        assert_eq!(ip, "172.20.1.2/16");
        assert_eq!(mac.to_string(), "02:02:ac:14:01:02");
    }
}
