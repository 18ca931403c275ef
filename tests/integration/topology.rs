//! tests/integration/topology.rs
//!
//! Ring topology scenarios: multi-hop rumor ordering and private unicast
//! routing via a learned route.

use std::time::Duration;

use crate::common::harness::{link, TestNode};

/// S2 — ring of three. Two rumors from A must be visible, in order, at
/// every node, and B/C must end up tracking the same count for A.
#[tokio::test]
async fn ring_of_three_converges_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let mut a = TestNode::spawn("A", &dir.path().join("a"), false).await;
    let mut b = TestNode::spawn("B", &dir.path().join("b"), false).await;
    let mut c = TestNode::spawn("C", &dir.path().join("c"), false).await;

    link(&a, &b).await;
    link(&b, &c).await;
    link(&c, &a).await;

    a.send_rumor("r1").await;
    a.send_rumor("r2").await;

    for node in [&mut a, &mut b, &mut c] {
        let converged = node
            .wait_for(Duration::from_secs(5), |s| {
                s.messages.iter().any(|m| m == "A: r2")
            })
            .await;
        assert!(
            converged,
            "node {} never converged on A's second rumor: {:?}",
            node.name,
            node.snapshot()
        );

        let order = node
            .snapshot()
            .messages
            .iter()
            .filter(|m| m.starts_with("A: r"))
            .cloned()
            .collect::<Vec<_>>();
        assert_eq!(
            order,
            vec!["A: r1".to_string(), "A: r2".to_string()],
            "node {} must see A's rumors in id order",
            node.name
        );
    }

    a.shutdown();
    b.shutdown();
    c.shutdown();
}

/// S3 — private unicast over a learned route. C routes a private message
/// to A through B; only A records it, B is a transparent relay.
#[tokio::test]
async fn private_message_is_delivered_only_to_its_destination() {
    let dir = tempfile::tempdir().unwrap();
    let mut a = TestNode::spawn("A", &dir.path().join("a"), false).await;
    let mut b = TestNode::spawn("B", &dir.path().join("b"), false).await;
    let mut c = TestNode::spawn("C", &dir.path().join("c"), false).await;

    link(&a, &b).await;
    link(&b, &c).await;
    link(&c, &a).await;

    // A rumor from A gives every node (including C, via B) a route back to A.
    a.send_rumor("hello").await;
    let c_has_route = c
        .wait_for(Duration::from_secs(3), |s| {
            s.destinations.iter().any(|d| d == "A")
        })
        .await;
    assert!(c_has_route, "C never learned a route to A: {:?}", c.snapshot());

    c.send_private("A", "hi").await;

    let a_got_it = a
        .wait_for(Duration::from_secs(2), |s| {
            s.messages.iter().any(|m| m == "C (private): hi")
        })
        .await;
    assert!(a_got_it, "A never received C's private message: {:?}", a.snapshot());

    // B only relays; it must never surface the private text in its own log.
    let b_snapshot = b.snapshot();
    assert!(
        !b_snapshot.messages.iter().any(|m| m.contains("hi")),
        "B should not record a private message addressed to A: {:?}",
        b_snapshot
    );

    a.shutdown();
    b.shutdown();
    c.shutdown();
}
