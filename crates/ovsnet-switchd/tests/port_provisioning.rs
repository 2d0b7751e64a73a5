//! Endpoint port create, update and delete tests

mod common;

use std::sync::Arc;

use common::{port_request, ready_switch};
use ovsnet_common::{EndpointInfo, ErrorKind, OperEndpointState, SwitchError};
use ovsnet_test::{assert_call_order, endpoint_fixtures, StateVerifier, TestEnv, FIRST_OFPORT};
use pretty_assertions::assert_eq;

fn oper(port_name: &str) -> OperEndpointState {
    OperEndpointState {
        port_name: port_name.to_string(),
        vtep_ip: String::new(),
    }
}

#[tokio::test]
async fn test_create_port_order_and_state() {
    let env = TestEnv::new();
    let switch = ready_switch(&env, "vxlan", "bridge").await;
    let req = port_request("port1", endpoint_fixtures::default_endpoint());

    switch.create_port(&req).await.unwrap();

    assert_call_order(
        &env.log,
        &[
            "link.create_veth_pair port1 vport1",
            "link.set_link_up vport1",
            "store.is_port_name_present vport1",
            "store.create_port vport1",
            "link.set_link_mtu port1 1450",
            "link.set_link_mac port1 02:00:00:00:00:01",
            "store.ofp_port_no vport1",
            "agent.add_local_endpoint",
        ],
    )
    .unwrap();

    let stored = env.store.port("vport1").unwrap();
    assert_eq!(stored.spec.intf_type, "");
    assert_eq!(stored.spec.attachment_id, "ep1");
    assert_eq!(stored.spec.tag, 5);

    let endpoint = env.agent.endpoint(stored.ofport).unwrap();
    assert_eq!(endpoint.vlan, 100);
    assert_eq!(endpoint.endpoint_group_vlan, 5);
    assert_eq!(endpoint.ip_addr, Some("10.1.1.5".parse().unwrap()));
    assert_eq!(
        endpoint.mac_addr.map(|m| m.to_string()).as_deref(),
        Some("02:00:00:00:00:01")
    );

    let link = env.link.link("port1").unwrap();
    assert_eq!(link.mtu, Some(1450));
    assert!(env.link.link("vport1").unwrap().up);
}

#[tokio::test]
async fn test_create_then_delete_leaves_nothing() {
    let env = TestEnv::new();
    let switch = ready_switch(&env, "vxlan", "bridge").await;
    let req = port_request("port1", endpoint_fixtures::default_endpoint());

    switch.create_port(&req).await.unwrap();
    switch.delete_port(&oper("port1"), false).await.unwrap();

    StateVerifier::new(&env)
        .assert_port_cleaned("port1", "vport1")
        .unwrap();
    assert_call_order(
        &env.log,
        &[
            "agent.remove_local_endpoint",
            "store.delete_port vport1",
            "link.delete_veth_pair port1 vport1",
        ],
    )
    .unwrap();
}

#[tokio::test]
async fn test_create_replaces_existing_store_entry() {
    let env = TestEnv::new();
    let stale = env.store.seed_port("vport1");
    let switch = ready_switch(&env, "vlan", "bridge").await;
    let req = port_request("port1", endpoint_fixtures::default_endpoint());

    switch.create_port(&req).await.unwrap();

    let stored = env.store.port("vport1").unwrap();
    assert_ne!(stored.ofport, stale);
    assert_eq!(stored.spec.attachment_id, "ep1");
    assert!(env.agent.endpoint(stored.ofport).is_some());
    assert_call_order(&env.log, &["store.delete_port vport1", "store.create_port vport1"])
        .unwrap();
}

#[tokio::test]
async fn test_stale_entry_delete_failure_is_logged_only() {
    let env = TestEnv::new();
    env.store.seed_port("vport1");
    env.store.failures().fail_on("delete_port", Some("vport1"));
    let switch = ready_switch(&env, "vxlan", "bridge").await;
    let req = port_request("port1", endpoint_fixtures::default_endpoint());

    // The stale entry survives, so registration itself fails
    let err = switch.create_port(&req).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ResourceUnavailable);
    assert!(env.log.contains("store.create_port vport1"));
}

#[tokio::test]
async fn test_agent_rejection_rolls_back_store() {
    let env = TestEnv::new();
    let switch = ready_switch(&env, "vxlan", "bridge").await;
    env.agent
        .failures()
        .fail_on("add_local_endpoint", Some(&FIRST_OFPORT.to_string()));
    let req = port_request("port1", endpoint_fixtures::default_endpoint());

    let err = switch.create_port(&req).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ControlAgentRejected);
    assert!(!env.store.has_port("vport1"));
    assert!(env.agent.endpoints().is_empty());
    assert_call_order(&env.log, &["agent.add_local_endpoint", "store.delete_port vport1"])
        .unwrap();
}

#[tokio::test]
async fn test_link_failure_after_registration_rolls_back_store() {
    let env = TestEnv::new();
    let switch = ready_switch(&env, "vxlan", "bridge").await;
    env.link.failures().fail_on("set_link_mtu", Some("port1"));
    let req = port_request("port1", endpoint_fixtures::default_endpoint());

    assert!(switch.create_port(&req).await.is_err());
    assert!(!env.store.has_port("vport1"));
    assert!(!env.log.contains("agent."));
}

#[tokio::test]
async fn test_veth_failure_registers_nothing() {
    let env = TestEnv::new();
    let switch = ready_switch(&env, "vxlan", "bridge").await;
    env.link.failures().fail_on("create_veth_pair", None);
    let req = port_request("port1", endpoint_fixtures::default_endpoint());

    assert!(switch.create_port(&req).await.is_err());
    assert!(env.log.for_system("store").is_empty());
    assert!(env.log.for_system("agent").is_empty());
}

#[tokio::test]
async fn test_malformed_mac_is_tolerated() {
    let env = TestEnv::new();
    let switch = ready_switch(&env, "vxlan", "bridge").await;
    let req = port_request("port1", endpoint_fixtures::malformed_mac_endpoint("ep9"));

    switch.create_port(&req).await.unwrap();

    let endpoint = env.agent.endpoints().pop().unwrap();
    assert_eq!(endpoint.mac_addr, None);
    assert_eq!(endpoint.ip_addr, Some("10.1.1.7".parse().unwrap()));
}

#[tokio::test]
async fn test_create_port_without_pairing() {
    let env = TestEnv::new();
    let switch = ready_switch(&env, "vxlan", "routing").await;
    let mut req = port_request("port1", endpoint_fixtures::dual_stack_endpoint("ep2", 3));
    req.skip_veth_pair = true;

    switch.create_port(&req).await.unwrap();

    assert!(!env.log.contains("link.create_veth_pair"));
    let stored = env.store.port("port1").unwrap();
    assert_eq!(stored.spec.intf_type, "internal");
    let endpoint = env.agent.endpoint(stored.ofport).unwrap();
    assert_eq!(endpoint.endpoint_group, 3);
    assert_eq!(endpoint.ipv6_addr, Some("2001:db8::6".parse().unwrap()));

    switch.delete_port(&oper("port1"), true).await.unwrap();
    assert!(!env.log.contains("link.delete_veth_pair"));
    assert!(!env.store.has_port("port1"));
}

#[tokio::test]
async fn test_create_port_on_host_switch_is_misuse() {
    let env = TestEnv::new();
    let switch = ready_switch(&env, "host", "").await;
    let req = port_request("port1", endpoint_fixtures::default_endpoint());

    let err = switch.create_port(&req).await.unwrap_err();

    assert!(matches!(err, SwitchError::Misuse { .. }));
    assert!(err.is_fatal());
    assert!(env.log.is_empty());
}

#[tokio::test]
async fn test_update_endpoint() {
    let env = TestEnv::new();
    let switch = ready_switch(&env, "vxlan", "bridge").await;
    switch
        .create_port(&port_request("port1", endpoint_fixtures::default_endpoint()))
        .await
        .unwrap();

    switch.update_endpoint("vport1", 100, 46, 2000).await.unwrap();

    let stored = env.store.port("vport1").unwrap();
    assert_eq!((stored.spec.burst, stored.spec.bandwidth), (100, 2000));
    assert_eq!(
        env.agent.endpoint_updates(),
        vec![EndpointInfo {
            port_no: stored.ofport,
            dscp: 46,
            ..Default::default()
        }]
    );
}

#[tokio::test]
async fn test_update_endpoint_on_host_switch_skips_agent() {
    let env = TestEnv::new();
    env.store.seed_port("hport1");
    let switch = ready_switch(&env, "host", "").await;

    switch.update_endpoint("hport1", 10, 8, 500).await.unwrap();

    assert_eq!(env.store.port("hport1").unwrap().spec.bandwidth, 500);
    assert!(!env.log.contains("store.ofp_port_no"));
    assert!(env.log.for_system("host_bridge").is_empty());
}

#[tokio::test]
async fn test_update_port_resends_descriptor_only() {
    let env = TestEnv::new();
    let switch = ready_switch(&env, "vxlan", "bridge").await;
    let mut req = port_request("port1", endpoint_fixtures::default_endpoint());
    switch.create_port(&req).await.unwrap();
    env.log.clear();

    req.nw_pkt_tag = 200;
    switch.update_port(&req).await.unwrap();

    assert_eq!(env.log.for_system("store"), vec!["store.ofp_port_no vport1"]);
    assert!(env.log.for_system("link").is_empty());
    let stored = env.store.port("vport1").unwrap();
    assert_eq!(env.agent.endpoint(stored.ofport).unwrap().vlan, 200);
}

#[tokio::test]
async fn test_update_port_without_agent_is_noop() {
    let env = TestEnv::new();
    let switch = ready_switch(&env, "host", "").await;
    let req = port_request("port1", endpoint_fixtures::default_endpoint());

    switch.update_port(&req).await.unwrap();
    assert!(env.log.is_empty());
}

#[tokio::test]
async fn test_delete_vtep_owned_port_is_noop() {
    let env = TestEnv::new();
    let switch = ready_switch(&env, "vxlan", "bridge").await;
    let oper = OperEndpointState {
        port_name: "port1".to_string(),
        vtep_ip: "10.0.0.2".to_string(),
    };

    switch.delete_port(&oper, false).await.unwrap();
    assert!(env.log.is_empty());
}

#[tokio::test]
async fn test_delete_continues_after_resolution_failure() {
    let env = TestEnv::new();
    let switch = ready_switch(&env, "vxlan", "bridge").await;
    switch
        .create_port(&port_request("port1", endpoint_fixtures::default_endpoint()))
        .await
        .unwrap();
    env.store.failures().fail_on("ofp_port_no", Some("vport1"));
    env.log.clear();

    let err = switch.delete_port(&oper("port1"), false).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ResourceUnavailable);
    assert!(!env.log.contains("agent.remove_local_endpoint"));
    assert!(!env.store.has_port("vport1"));
    assert!(!env.link.exists("port1"));
}

#[tokio::test]
async fn test_delete_suppresses_agent_failure() {
    let env = TestEnv::new();
    let switch = ready_switch(&env, "vxlan", "bridge").await;
    switch
        .create_port(&port_request("port1", endpoint_fixtures::default_endpoint()))
        .await
        .unwrap();
    env.agent.failures().fail_on("remove_local_endpoint", None);

    switch.delete_port(&oper("port1"), false).await.unwrap();

    assert!(!env.store.has_port("vport1"));
    assert!(!env.link.exists("vport1"));
}

#[tokio::test]
async fn test_delete_returns_last_failure() {
    let env = TestEnv::new();
    let switch = ready_switch(&env, "vxlan", "bridge").await;
    switch
        .create_port(&port_request("port1", endpoint_fixtures::default_endpoint()))
        .await
        .unwrap();
    env.store.failures().fail_on("delete_port", Some("vport1"));
    env.link.failures().fail_on("delete_veth_pair", Some("port1"));

    let err = switch.delete_port(&oper("port1"), false).await.unwrap_err();

    match err {
        SwitchError::ResourceUnavailable { resource, .. } => {
            assert_eq!(resource, "delete_veth_pair")
        }
        other => panic!("Expected veth failure, got {:?}", other),
    }
    assert!(env.agent.endpoints().is_empty());
}

#[tokio::test]
async fn test_concurrent_creates() {
    let env = TestEnv::new();
    let switch = Arc::new(ready_switch(&env, "vxlan", "bridge").await);

    let a = {
        let switch = switch.clone();
        tokio::spawn(async move {
            let ep = endpoint_fixtures::endpoint("ep1", "02:00:00:00:00:01", "10.1.1.1");
            let req = port_request("port1", ep);
            switch.create_port(&req).await
        })
    };
    let b = {
        let switch = switch.clone();
        tokio::spawn(async move {
            let ep = endpoint_fixtures::endpoint("ep2", "02:00:00:00:00:02", "10.1.1.2");
            let req = port_request("port2", ep);
            switch.create_port(&req).await
        })
    };

    a.await.unwrap().unwrap();
    b.await.unwrap().unwrap();

    assert_eq!(env.store.port_names(), vec!["vport1", "vport2"]);
    assert_eq!(env.agent.endpoints().len(), 2);
}
