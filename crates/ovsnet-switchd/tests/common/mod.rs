//! Shared setup for switch integration tests

#![allow(dead_code)]

use ovsnet_common::{EndpointConfig, SwitchResult};
use ovsnet_switchd::{OvsSwitch, PortRequest, SettleTimings, SwitchConfig, SwitchDeps};
use ovsnet_test::{init_test_logging, TestEnv};

/// Config with zero settle timings and local IP 10.0.0.1
pub fn config(network_type: &str, fwd_mode: &str) -> SwitchConfig {
    SwitchConfig {
        bridge_name: format!("{}Bridge", network_type),
        network_type: network_type.to_string(),
        fwd_mode: fwd_mode.to_string(),
        local_ip: "10.0.0.1".to_string(),
        timings: SettleTimings::zero(),
        ..Default::default()
    }
}

pub async fn build_switch(env: &TestEnv, config: &SwitchConfig) -> SwitchResult<OvsSwitch> {
    init_test_logging();
    let deps = SwitchDeps {
        store: &env.connector,
        backends: &env.factory,
        link: env.link.clone(),
    };
    OvsSwitch::new(config, deps).await
}

/// Builds a switch and clears the bootstrap calls from the log.
pub async fn ready_switch(env: &TestEnv, network_type: &str, fwd_mode: &str) -> OvsSwitch {
    let switch = build_switch(env, &config(network_type, fwd_mode))
        .await
        .expect("switch bootstrap failed");
    env.log.clear();
    switch
}

pub fn port_request(intf_name: &str, endpoint: EndpointConfig) -> PortRequest {
    PortRequest {
        intf_name: intf_name.to_string(),
        endpoint,
        pkt_tag: 5,
        nw_pkt_tag: 100,
        ..Default::default()
    }
}
