//! Control-agent pass-through tests

mod common;

use common::{port_request, ready_switch};
use ovsnet_common::{ArpMode, ErrorKind, SwitchError};
use ovsnet_test::{control_fixtures, endpoint_fixtures, TestEnv};
use pretty_assertions::assert_eq;

#[tokio::test]
async fn test_network_lifecycle() {
    let env = TestEnv::new();
    let switch = ready_switch(&env, "vxlan", "routing").await;

    switch
        .create_network(100, 10000, "10.1.1.254", "default")
        .await
        .unwrap();
    let networks = env.agent.networks();
    assert_eq!(networks.len(), 1);
    assert_eq!(networks[0].pkt_tag, 100);
    assert_eq!(networks[0].vrf, "default");

    switch
        .delete_network(100, 10000, "10.1.1.254", "default")
        .await
        .unwrap();
    assert!(env.agent.networks().is_empty());
}

#[tokio::test]
async fn test_network_rejection_propagates() {
    let env = TestEnv::new();
    let switch = ready_switch(&env, "vlan", "bridge").await;
    env.agent.failures().fail_on("add_network", Some("100"));

    let err = switch
        .create_network(100, 0, "", "default")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ControlAgentRejected);
    assert!(!err.is_fatal());
}

#[tokio::test]
async fn test_master_lifecycle() {
    let env = TestEnv::new();
    let switch = ready_switch(&env, "vxlan", "bridge").await;
    let master = control_fixtures::master("192.168.2.10");

    switch.add_master(&master).await.unwrap();
    assert_eq!(env.agent.masters(), vec![master.clone()]);

    switch.delete_master(&master).await.unwrap();
    assert!(env.agent.masters().is_empty());
}

#[tokio::test]
async fn test_bgp_only_on_vlan_switch() {
    let env = TestEnv::new();
    let switch = ready_switch(&env, "vxlan", "routing").await;

    switch.add_bgp(&control_fixtures::bgp_config()).await.unwrap();
    switch.delete_bgp().await.unwrap();
    assert!(env.log.is_empty());

    let env = TestEnv::new();
    let switch = ready_switch(&env, "vlan", "routing").await;

    switch.add_bgp(&control_fixtures::bgp_config()).await.unwrap();
    assert_eq!(env.agent.bgp(), Some(control_fixtures::bgp_config()));
    let bgp = switch.inspect_bgp().await.unwrap();
    assert_eq!(bgp["hostname"], "node1");

    switch.delete_bgp().await.unwrap();
    assert_eq!(env.agent.bgp(), None);
}

#[tokio::test]
async fn test_service_specs_and_providers() {
    let env = TestEnv::new();
    let switch = ready_switch(&env, "vxlan", "bridge").await;
    let spec = control_fixtures::service_spec();

    switch.add_svc_spec("web", &spec).await.unwrap();
    assert_eq!(env.agent.service("web"), Some(spec.clone()));

    let providers = vec!["10.1.1.5".to_string(), "10.1.1.6".to_string()];
    switch.svc_provider_update("web", &providers).await;
    assert_eq!(env.agent.providers("web"), Some(providers));

    switch.del_svc_spec("web", &spec).await.unwrap();
    assert_eq!(env.agent.service("web"), None);
}

#[tokio::test]
async fn test_queries_and_global_config() {
    let env = TestEnv::new();
    let switch = ready_switch(&env, "vxlan", "bridge").await;
    switch
        .create_port(&port_request("port1", endpoint_fixtures::default_endpoint()))
        .await
        .unwrap();

    let stats = switch.get_endpoint_stats().await.unwrap();
    assert_eq!(stats.len(), 1);
    assert_eq!(stats["1"].port_no, 1);

    let state = switch.inspect_state().await.unwrap();
    assert_eq!(state["endpoints"], serde_json::json!([1]));

    switch
        .global_config_update(&control_fixtures::proxy_arp())
        .await
        .unwrap();
    assert_eq!(
        env.agent.global_config().map(|c| c.arp_mode),
        Some(ArpMode::Proxy)
    );
}

#[tokio::test]
async fn test_host_switch_queries_fail() {
    let env = TestEnv::new();
    let switch = ready_switch(&env, "host", "").await;

    let err = switch.get_endpoint_stats().await.unwrap_err();
    assert!(matches!(err, SwitchError::NoControlAgent { .. }));
    assert_eq!(err.kind(), ErrorKind::Misuse);
    assert!(!err.is_fatal());

    assert!(switch.inspect_state().await.is_err());
    assert!(switch.inspect_bgp().await.is_err());
    assert!(switch
        .global_config_update(&control_fixtures::proxy_arp())
        .await
        .is_err());
}

#[tokio::test]
async fn test_host_switch_mutations_are_noops() {
    let env = TestEnv::new();
    let switch = ready_switch(&env, "host", "").await;
    let master = control_fixtures::master("192.168.2.10");
    let spec = control_fixtures::service_spec();

    switch.create_network(100, 0, "", "default").await.unwrap();
    switch.delete_network(100, 0, "", "default").await.unwrap();
    switch.add_master(&master).await.unwrap();
    switch.delete_master(&master).await.unwrap();
    switch.add_svc_spec("web", &spec).await.unwrap();
    switch.del_svc_spec("web", &spec).await.unwrap();
    switch.svc_provider_update("web", &[]).await;

    assert!(env.log.is_empty());
}
