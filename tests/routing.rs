use std::net::Ipv4Addr;

use serde_json::{json, Value};

use asbgpd::config::RouterConfig;
use asbgpd::handler::{Outbound, Router};

fn router(asn: u32, descriptors: &[&str]) -> Router {
    let descriptors: Vec<String> = descriptors.iter().map(|d| d.to_string()).collect();
    Router::new(&RouterConfig::new(asn, &descriptors).unwrap())
}

fn addr(s: &str) -> Ipv4Addr {
    s.parse().unwrap()
}

fn frame(value: Value) -> Vec<u8> {
    serde_json::to_vec(&value).unwrap()
}

fn update(src: &str, network: &str, netmask: &str, localpref: u32, as_path: &[u32]) -> Vec<u8> {
    frame(json!({
        "src": src,
        "dst": "192.168.0.1",
        "type": "update",
        "msg": {
            "network": network,
            "netmask": netmask,
            "localpref": localpref,
            "selfOrigin": false,
            "ASPath": as_path,
            "origin": "IGP",
        },
    }))
}

fn data(src: &str, dst: &str) -> Vec<u8> {
    frame(json!({
        "src": src,
        "dst": dst,
        "type": "data",
        "msg": "payload",
    }))
}

fn parse(outbound: &Outbound) -> Value {
    serde_json::from_slice(&outbound.frame).unwrap()
}

#[test]
fn test_data_follows_learned_route() {
    let mut router = router(1, &["7001-192.168.0.2-cust"]);
    let customer = addr("192.168.0.2");

    let outbound = router.handle_frame(
        customer,
        &update("192.168.0.2", "172.16.0.0", "255.255.0.0", 100, &[2]),
    );
    // Single neighbor, nobody else to re-advertise to
    assert!(outbound.is_empty());
    assert_eq!(router.rib().len(), 1);

    let packet = data("192.168.0.25", "172.16.5.5");
    let outbound = router.handle_frame(customer, &packet);
    assert_eq!(outbound.len(), 1);
    assert_eq!(outbound[0].to, customer);
    // Forwarded untouched
    assert_eq!(outbound[0].frame, packet);
}

#[test]
fn test_peer_to_peer_data_is_dropped() {
    let mut router = router(1, &["7001-10.1.0.2-peer", "7002-10.2.0.2-peer"]);
    let p = addr("10.1.0.2");
    let q = addr("10.2.0.2");

    let outbound = router.handle_frame(p, &update("10.1.0.2", "10.0.0.0", "255.0.0.0", 100, &[2]));
    // Peer-learned routes are not advertised to the other peer
    assert!(outbound.is_empty());

    let outbound = router.handle_frame(q, &data("10.2.0.25", "10.1.2.3"));
    assert!(outbound.is_empty());
}

#[test]
fn test_longest_prefix_beats_local_pref() {
    let mut router = router(1, &["7001-192.168.0.2-cust", "7002-172.20.0.2-cust"]);
    let first = addr("192.168.0.2");
    let second = addr("172.20.0.2");

    router.handle_frame(first, &update("192.168.0.2", "10.0.0.0", "255.0.0.0", 200, &[2]));
    router.handle_frame(second, &update("172.20.0.2", "10.1.0.0", "255.255.0.0", 50, &[3]));

    let outbound = router.handle_frame(first, &data("192.168.0.25", "10.1.2.3"));
    assert_eq!(outbound.len(), 1);
    assert_eq!(outbound[0].to, second);
}

#[test]
fn test_sibling_routes_aggregate() {
    let mut router = router(1, &["7001-192.168.0.2-cust"]);
    let customer = addr("192.168.0.2");

    router.handle_frame(
        customer,
        &update("192.168.0.2", "192.168.0.0", "255.255.255.0", 100, &[2]),
    );
    router.handle_frame(
        customer,
        &update("192.168.0.2", "192.168.1.0", "255.255.255.0", 100, &[2]),
    );
    assert_eq!(router.rib().len(), 1);

    let dump = frame(json!({
        "src": "192.168.0.2",
        "dst": "192.168.0.1",
        "type": "dump",
        "msg": {},
    }));
    let outbound = router.handle_frame(customer, &dump);
    assert_eq!(outbound.len(), 1);
    let value = parse(&outbound[0]);
    assert_eq!(
        value["msg"],
        json!([{
            "network": "192.168.0.0",
            "netmask": "255.255.254.0",
            "peer": "192.168.0.2",
            "localpref": 100,
            "ASPath": [2],
            "selfOrigin": false,
            "origin": "IGP",
        }])
    );
}

#[test]
fn test_withdraw_splits_aggregate() {
    let mut router = router(1, &["7001-192.168.0.2-cust"]);
    let customer = addr("192.168.0.2");

    router.handle_frame(
        customer,
        &update("192.168.0.2", "192.168.0.0", "255.255.255.0", 100, &[2]),
    );
    router.handle_frame(
        customer,
        &update("192.168.0.2", "192.168.1.0", "255.255.255.0", 100, &[2]),
    );

    let withdraw = frame(json!({
        "src": "192.168.0.2",
        "dst": "192.168.0.1",
        "type": "withdraw",
        "msg": [{"network": "192.168.1.0", "netmask": "255.255.255.0"}],
    }));
    router.handle_frame(customer, &withdraw);

    let entries = router.rib().entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].prefix.to_string(), "192.168.0.0/24");
}

#[test]
fn test_lowest_next_hop_breaks_tie() {
    let mut router = router(1, &["7001-1.2.3.2-cust", "7002-4.5.6.2-cust"]);
    let low = addr("1.2.3.2");
    let high = addr("4.5.6.2");

    router.handle_frame(low, &update("1.2.3.2", "10.0.0.0", "255.0.0.0", 100, &[2]));
    router.handle_frame(high, &update("4.5.6.2", "10.0.0.0", "255.0.0.0", 100, &[2]));

    let outbound = router.handle_frame(low, &data("1.2.3.25", "10.1.2.3"));
    assert_eq!(outbound.len(), 1);
    assert_eq!(outbound[0].to, low);
}

#[test]
fn test_withdrawals_invert_announcements() {
    // Interleave announcements and withdrawals across neighbors; the
    // final table only reflects what was never withdrawn
    let mut router = router(1, &["7001-192.168.0.2-cust", "7002-172.20.0.2-cust"]);
    let first = addr("192.168.0.2");
    let second = addr("172.20.0.2");

    router.handle_frame(first, &update("192.168.0.2", "10.0.0.0", "255.0.0.0", 100, &[2]));
    router.handle_frame(second, &update("172.20.0.2", "172.16.0.0", "255.255.0.0", 100, &[3]));
    router.handle_frame(
        second,
        &frame(json!({
            "src": "172.20.0.2",
            "dst": "172.20.0.1",
            "type": "withdraw",
            "msg": [{"network": "172.16.0.0", "netmask": "255.255.0.0"}],
        })),
    );
    router.handle_frame(
        first,
        &frame(json!({
            "src": "192.168.0.2",
            "dst": "192.168.0.1",
            "type": "withdraw",
            "msg": [{"network": "10.0.0.0", "netmask": "255.0.0.0"}],
        })),
    );

    assert!(router.rib().is_empty());
}
