use bytes::Bytes;
use rendezvous_core::{PeerId, SignalMessage, SignalPayload, codec};
use rendezvous_server::{MemoryHub, SignalingTransport};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::timeout;

use crate::integration::{default_harness, init_tracing};
use crate::utils::{MockEngine, SERVER_ID, dispatcher, frame, frame_to_server, request};

const ROOM: &str = "sample";

/// Next frame on `rx` that `who` did not send itself.
async fn next_from_other(rx: &mut mpsc::Receiver<Bytes>, who: &str) -> SignalMessage {
    loop {
        let raw = timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("timed out waiting for a frame")
            .expect("room closed");
        let message = codec::decode(&raw).expect("frame must decode");
        if message.sender.as_str() != who {
            return message;
        }
    }
}

#[tokio::test]
async fn test_run_loop_answers_request_through_room() {
    init_tracing();

    let hub = MemoryHub::new();
    let engine = MockEngine::new();

    let server_transport = Arc::new(hub.transport());
    let inbound = server_transport
        .join(ROOM, &PeerId::from(SERVER_ID))
        .await
        .expect("server join");
    let server = dispatcher(Arc::new(engine.clone()), server_transport.clone());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let running = tokio::spawn(server.run(inbound, shutdown_rx));

    let alice = hub.transport();
    let mut alice_rx = alice.join(ROOM, &PeerId::from("alice")).await.expect("alice join");
    alice
        .send(frame("alice", None, request()))
        .await
        .expect("alice send");

    let offer = next_from_other(&mut alice_rx, "alice").await;
    assert_eq!(offer.sender, PeerId::from(SERVER_ID));
    assert_eq!(offer.to, Some(PeerId::from("alice")));
    assert!(matches!(offer.payload, SignalPayload::Offer { .. }));

    shutdown_tx.send(true).expect("dispatcher still running");
    timeout(Duration::from_secs(2), running)
        .await
        .expect("dispatcher did not stop")
        .expect("dispatcher panicked");

    let connections = engine.connections().await;
    assert_eq!(connections.len(), 1);
    assert_eq!(connections[0].close_count().await, 1);
}

#[tokio::test]
async fn test_run_loop_stops_when_inbound_closes() {
    init_tracing();

    let engine = MockEngine::new();
    let hub = MemoryHub::new();
    let server = dispatcher(Arc::new(engine.clone()), Arc::new(hub.transport()));

    let (tx, rx) = mpsc::channel(4);
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);
    drop(tx);

    timeout(Duration::from_secs(2), server.run(rx, shutdown_rx))
        .await
        .expect("dispatcher did not stop");
    assert_eq!(engine.create_attempts().await, 0);
}

#[tokio::test]
async fn test_shutdown_closes_every_connection() {
    let mut h = default_harness();

    for peer in ["alice", "bob", "carol"] {
        h.dispatcher.dispatch(&frame_to_server(peer, request())).await;
    }
    assert_eq!(h.dispatcher.registry().len(), 3);

    h.dispatcher.shutdown().await;

    assert!(h.dispatcher.registry().is_empty());
    for conn in h.engine.connections().await {
        assert_eq!(conn.close_count().await, 1);
    }

    // A second shutdown has nothing left to close.
    h.dispatcher.shutdown().await;
    for conn in h.engine.connections().await {
        assert_eq!(conn.close_count().await, 1);
    }
}
