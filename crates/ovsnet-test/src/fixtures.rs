//! Test fixtures for common switch scenarios

use std::sync::Arc;

use ovsnet_common::EndpointConfig;

use crate::agent::{FakeBackendFactory, FakeControlAgent, FakeHostBridge};
use crate::link::FakeLinkLayer;
use crate::recorder::CallLog;
use crate::store::{FakeConfigStore, FakeStoreConnector};

/// One set of in-memory collaborators sharing a call log.
pub struct TestEnv {
    pub log: CallLog,
    pub store: Arc<FakeConfigStore>,
    pub connector: FakeStoreConnector,
    pub agent: Arc<FakeControlAgent>,
    pub host_bridge: Arc<FakeHostBridge>,
    pub factory: FakeBackendFactory,
    pub link: Arc<FakeLinkLayer>,
}

impl TestEnv {
    pub fn new() -> Self {
        let log = CallLog::new();
        let store = Arc::new(FakeConfigStore::new(log.clone()));
        let agent = Arc::new(FakeControlAgent::new(log.clone()));
        let host_bridge = Arc::new(FakeHostBridge::new(log.clone()));

        Self {
            connector: FakeStoreConnector::new(log.clone(), store.clone()),
            factory: FakeBackendFactory::new(log.clone(), agent.clone(), host_bridge.clone()),
            link: Arc::new(FakeLinkLayer::new(log.clone())),
            log,
            store,
            agent,
            host_bridge,
        }
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}

/// Endpoint metadata fixtures
pub mod endpoint_fixtures {
    use super::*;

    /// Endpoint with an IPv4 address and no group
    pub fn endpoint(id: &str, mac: &str, ip: &str) -> EndpointConfig {
        EndpointConfig {
            id: id.to_string(),
            mac_address: mac.to_string(),
            ip_address: ip.to_string(),
            ..Default::default()
        }
    }

    /// Standard endpoint `ep1` at 10.1.1.5
    pub fn default_endpoint() -> EndpointConfig {
        endpoint("ep1", "02:00:00:00:00:01", "10.1.1.5")
    }

    /// Dual-stack endpoint in a group
    pub fn dual_stack_endpoint(id: &str, group: i32) -> EndpointConfig {
        EndpointConfig {
            id: id.to_string(),
            mac_address: "02:00:00:00:00:02".to_string(),
            ip_address: "10.1.1.6".to_string(),
            ipv6_address: "2001:db8::6".to_string(),
            endpoint_group_id: group,
        }
    }

    /// Endpoint whose MAC cannot be parsed
    pub fn malformed_mac_endpoint(id: &str) -> EndpointConfig {
        endpoint(id, "02:00:zz", "10.1.1.7")
    }
}

/// Pass-through payload fixtures
pub mod control_fixtures {
    use ovsnet_common::{ArpMode, BgpConfig, GlobalConfig, ServiceInfo, ServicePort, ServiceSpec};

    pub fn master(host_addr: &str) -> ServiceInfo {
        ServiceInfo {
            host_addr: host_addr.to_string(),
            port: 9001,
        }
    }

    pub fn bgp_config() -> BgpConfig {
        BgpConfig {
            hostname: "node1".to_string(),
            router_ip: "50.1.1.1/24".to_string(),
            as_number: "65002".to_string(),
            neighbor_as: "500".to_string(),
            neighbor: "50.1.1.2".to_string(),
        }
    }

    pub fn service_spec() -> ServiceSpec {
        ServiceSpec {
            ip_address: "10.254.0.10".to_string(),
            ports: vec![ServicePort {
                protocol: "TCP".to_string(),
                svc_port: 80,
                prov_port: 8080,
            }],
        }
    }

    pub fn proxy_arp() -> GlobalConfig {
        GlobalConfig {
            arp_mode: ArpMode::Proxy,
        }
    }
}
