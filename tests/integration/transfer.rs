//! tests/integration/transfer.rs
//!
//! File upload/download over a learned route, and retry under packet loss.

use std::time::Duration;

use crate::common::harness::{fake_peer, link, recv_packet, send_packet, TestNode};
use peerster::domain::{DataReply, DataRequest, GossipPacket, Rumor};
use sha2::{Digest, Sha256};

fn pattern_bytes(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

async fn wait_for_route(from: &mut TestNode, to_origin: &str, via: &TestNode) {
    via.send_rumor("route-bootstrap").await;
    let ok = from
        .wait_for(Duration::from_secs(3), |s| {
            s.destinations.iter().any(|d| d == to_origin)
        })
        .await;
    assert!(ok, "{} never learned a route to {to_origin}", from.name);
}

/// S5 — a 20000-byte file (3 chunks: 8192, 8192, 3616) uploaded at A is
/// downloaded at B byte-for-byte.
#[tokio::test]
async fn file_download_reconstructs_byte_for_byte() {
    let dir = tempfile::tempdir().unwrap();
    let mut a = TestNode::spawn("A", &dir.path().join("a"), false).await;
    let mut b = TestNode::spawn("B", &dir.path().join("b"), false).await;
    link(&a, &b).await;

    wait_for_route(&mut b, "A", &a).await;

    let contents = pattern_bytes(20_000);
    a.put_shared_file("f.bin", &contents);
    a.upload("f.bin").await;

    let meta_hash_hex = a
        .wait_for(Duration::from_secs(2), |s| {
            s.files.iter().any(|(name, _)| name == "f.bin")
        })
        .await
        .then(|| {
            a.snapshot()
                .files
                .into_iter()
                .find(|(name, _)| name == "f.bin")
                .map(|(_, hash)| hash)
        })
        .flatten()
        .expect("A should have recorded the uploaded file's hash");

    b.download("f.bin", &meta_hash_hex, "A").await;

    let downloaded_path = b.downloaded_file_path("f.bin");
    let reconstructed = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if let Ok(bytes) = std::fs::read(&downloaded_path) {
                if bytes.len() == contents.len() {
                    return bytes;
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    })
    .await
    .expect("download should complete within 5s");

    assert_eq!(reconstructed, contents);

    a.shutdown();
    b.shutdown();
}

/// S6 — a raw socket stands in for A so the test can deterministically
/// drop exactly one reply: B's metafile request goes unanswered, its
/// 5-second retry timer re-sends it, and only then does "A" reply. The
/// download must still complete, with no duplicate chunk ever recorded.
#[tokio::test]
async fn download_retries_after_a_dropped_reply() {
    let dir = tempfile::tempdir().unwrap();
    let mut b = TestNode::spawn("B", &dir.path().join("b"), false).await;

    let fake_a = fake_peer().await;
    let fake_a_addr = fake_a.local_addr().unwrap();
    b.add_peer(fake_a_addr).await;

    // A single rumor from "A" (relayed by our fake socket) is enough for
    // B's RouteTable to learn fake_a_addr as the next hop toward "A".
    send_packet(
        &fake_a,
        b.gossip_addr,
        &GossipPacket::Rumor(Rumor {
            origin: "A".to_string(),
            id: 1,
            text: String::new(),
        }),
    )
    .await;
    let routed = b
        .wait_for(Duration::from_secs(2), |s| {
            s.destinations.iter().any(|d| d == "A")
        })
        .await;
    assert!(routed, "B never learned a route to A: {:?}", b.snapshot());

    let contents = pattern_bytes(1000);
    let chunk_hash: [u8; 32] = Sha256::digest(&contents).into();
    let meta_file = chunk_hash.to_vec();
    let meta_hash: [u8; 32] = Sha256::digest(&meta_file).into();

    b.download("small.bin", &hex::encode(meta_hash), "A").await;

    // First metafile request: drop it, simulating a lost reply by simply
    // never answering.
    let first_request = recv_packet(&fake_a, Duration::from_secs(2))
        .await
        .expect("B should send an initial metafile request");
    match &first_request {
        GossipPacket::DataRequest(req) => assert_eq!(req.hash_value, meta_hash),
        other => panic!("expected a DataRequest, got {other:?}"),
    }

    // The retry timer is armed for 5s; wait for the re-sent request.
    let retried_request = recv_packet(&fake_a, Duration::from_secs(7))
        .await
        .expect("B should retry the metafile request after 5s");
    let retried: DataRequest = match retried_request {
        GossipPacket::DataRequest(req) => req,
        other => panic!("expected a retried DataRequest, got {other:?}"),
    };
    assert_eq!(retried.hash_value, meta_hash);
    assert_eq!(retried.destination, "A");

    // Now actually answer: metafile reply, then the single chunk reply.
    send_packet(
        &fake_a,
        b.gossip_addr,
        &GossipPacket::DataReply(DataReply {
            origin: "A".to_string(),
            destination: retried.origin.clone(),
            hop_limit: 10,
            hash_value: meta_hash,
            data: meta_file,
        }),
    )
    .await;

    let chunk_request = recv_packet(&fake_a, Duration::from_secs(2))
        .await
        .expect("B should request the single chunk after the metafile reply");
    let chunk_request = match chunk_request {
        GossipPacket::DataRequest(req) => req,
        other => panic!("expected a chunk DataRequest, got {other:?}"),
    };
    assert_eq!(chunk_request.hash_value, chunk_hash);

    send_packet(
        &fake_a,
        b.gossip_addr,
        &GossipPacket::DataReply(DataReply {
            origin: "A".to_string(),
            destination: chunk_request.origin,
            hop_limit: 10,
            hash_value: chunk_hash,
            data: contents.clone(),
        }),
    )
    .await;

    let downloaded_path = b.downloaded_file_path("small.bin");
    let reconstructed = tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            if let Ok(bytes) = std::fs::read(&downloaded_path) {
                if bytes.len() == contents.len() {
                    return bytes;
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    })
    .await
    .expect("download should complete once the retried reply is answered");
    assert_eq!(reconstructed, contents);

    // No further chunk request should appear: a single chunk stored once.
    let extra = recv_packet(&fake_a, Duration::from_millis(500)).await;
    assert!(
        extra.is_none(),
        "no further requests expected once the download is complete, got {extra:?}"
    );

    b.shutdown();
}
