//! Endpoint metadata and the descriptor registered with the control agent.

use serde::{Deserialize, Serialize};
use std::net::IpAddr;

use crate::mac::MacAddress;

/// Endpoint configuration handed down by the network master.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// Endpoint id, stored as the port's attachment id in the config store.
    pub id: String,
    /// MAC address string; may be malformed.
    pub mac_address: String,
    /// IPv4 address string; empty when unassigned.
    pub ip_address: String,
    /// IPv6 address string; empty when unassigned.
    #[serde(default)]
    pub ipv6_address: String,
    /// Endpoint group identifier.
    #[serde(default)]
    pub endpoint_group_id: i32,
}

/// Operational record of a provisioned endpoint port.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperEndpointState {
    /// Namespace-side interface name.
    pub port_name: String,
    /// Tunnel peer address when the port belongs to a VTEP; empty otherwise.
    #[serde(default)]
    pub vtep_ip: String,
}

impl OperEndpointState {
    /// Returns true when this port is owned by the VTEP path.
    pub fn is_vtep(&self) -> bool {
        !self.vtep_ip.is_empty()
    }
}

/// Endpoint descriptor registered with the control agent or host bridge.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointInfo {
    pub port_no: u32,
    pub mac_addr: Option<MacAddress>,
    pub vlan: u16,
    pub ip_addr: Option<IpAddr>,
    pub ipv6_addr: Option<IpAddr>,
    pub endpoint_group: i32,
    pub endpoint_group_vlan: u16,
    pub dscp: u8,
}

/// Parses an optional address; empty or malformed input yields `None`.
pub fn parse_ip_lenient(s: &str) -> Option<IpAddr> {
    s.split('/').next().and_then(|addr| addr.parse().ok())
}

/// Per-endpoint counters reported by the control agent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointStats {
    pub endpoint_id: String,
    pub port_no: u32,
    pub rx_packets: u64,
    pub rx_bytes: u64,
    pub tx_packets: u64,
    pub tx_bytes: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ip_lenient() {
        assert_eq!(parse_ip_lenient("10.1.1.5"), Some("10.1.1.5".parse().unwrap()));
        assert_eq!(parse_ip_lenient("10.1.1.5/24"), Some("10.1.1.5".parse().unwrap()));
        assert_eq!(parse_ip_lenient("2001:db8::1"), Some("2001:db8::1".parse().unwrap()));
        assert_eq!(parse_ip_lenient(""), None);
        assert_eq!(parse_ip_lenient("garbage"), None);
    }

    #[test]
    fn test_oper_state_is_vtep() {
        let mut oper = OperEndpointState {
            port_name: "port1".to_string(),
            vtep_ip: String::new(),
        };
        assert!(!oper.is_vtep());
        oper.vtep_ip = "10.0.0.2".to_string();
        assert!(oper.is_vtep());
    }

    #[test]
    fn test_endpoint_config_deserialize_defaults() {
        let cfg: EndpointConfig = serde_json::from_str(
            r#"{"id":"ep1","mac_address":"02:00:00:00:00:01","ip_address":"10.1.1.5"}"#,
        )
        .unwrap();
        assert_eq!(cfg.ipv6_address, "");
        assert_eq!(cfg.endpoint_group_id, 0);
    }
}
