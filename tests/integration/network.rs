//! tests/integration/network.rs
//!
//! Two-node rumor dissemination and simple-broadcast scenarios.

use std::time::Duration;

use crate::common::harness::{fake_peer, link, recv_packet, send_packet, TestNode};
use peerster::domain::{GossipPacket, SimpleMessage};

/// S1 — two nodes, rumor mongered between them converges within the
/// anti-entropy period.
#[tokio::test]
async fn two_node_rumor_reaches_the_other_side() {
    let dir = tempfile::tempdir().unwrap();
    let mut a = TestNode::spawn("A", &dir.path().join("a"), false).await;
    let mut b = TestNode::spawn("B", &dir.path().join("b"), false).await;
    link(&a, &b).await;

    a.send_rumor("hello").await;

    let seen = b
        .wait_for(Duration::from_secs(2), |s| {
            s.messages.iter().any(|m| m == "A: hello")
        })
        .await;
    assert!(seen, "B never received A's rumor: {:?}", b.snapshot());

    let a_caught_up = a
        .wait_for(Duration::from_secs(2), |s| {
            s.messages.iter().any(|m| m == "A: hello")
        })
        .await;
    assert!(a_caught_up);

    a.shutdown();
    b.shutdown();
}

/// S1 continued — a node with no peers still records the client's text
/// locally even though there is nobody to monger it to.
#[tokio::test]
async fn rumor_with_no_peers_is_still_recorded_locally() {
    let dir = tempfile::tempdir().unwrap();
    let mut a = TestNode::spawn("A", &dir.path().join("a"), false).await;

    a.send_rumor("solo").await;

    let recorded = a
        .wait_for(Duration::from_secs(1), |s| {
            s.messages.iter().any(|m| m == "A: solo")
        })
        .await;
    assert!(recorded);

    a.shutdown();
}

/// S4 — simple mode floods to every peer, re-stamping `relay` to the
/// immediate predecessor, and never echoes back to whoever it just
/// received the packet from.
#[tokio::test]
async fn simple_broadcast_relays_to_every_peer_but_not_back_to_sender() {
    let dir = tempfile::tempdir().unwrap();
    let node = TestNode::spawn("A", &dir.path().join("a"), true).await;

    let origin = fake_peer().await;
    let other = fake_peer().await;
    node.add_peer(origin.local_addr().unwrap()).await;
    node.add_peer(other.local_addr().unwrap()).await;
    // Give the admin datagram a moment to register both peers.
    tokio::time::sleep(Duration::from_millis(100)).await;

    let msg = SimpleMessage {
        origin: "X".into(),
        relay: origin.local_addr().unwrap().to_string(),
        contents: "broadcast".into(),
    };
    send_packet(&origin, node.gossip_addr, &GossipPacket::Simple(msg)).await;

    let relayed = recv_packet(&other, Duration::from_secs(1))
        .await
        .expect("the other peer should receive the relayed broadcast");
    match relayed {
        GossipPacket::Simple(m) => {
            assert_eq!(m.contents, "broadcast");
            assert_eq!(m.relay, node.gossip_addr.to_string());
        }
        other => panic!("expected a SimpleMessage, got {other:?}"),
    }

    let echoed_back = recv_packet(&origin, Duration::from_millis(300)).await;
    assert!(
        echoed_back.is_none(),
        "node must never send the broadcast back to its immediate sender, got {echoed_back:?}"
    );

    node.shutdown();
}
