use rendezvous_core::{IceCandidate, PayloadKind, PeerId, SignalPayload};
use rendezvous_server::{DispatchOutcome, HandleState, SignalError};

use crate::integration::{create_harness, default_harness};
use crate::utils::{
    Call, EngineScript, MockEngine, RecordingTransport, candidate, frame_to_server,
    host_candidate, request,
};

#[tokio::test]
async fn test_candidate_without_connection_touches_nothing() {
    let mut h = default_harness();

    let outcome = h.dispatcher.dispatch(&frame_to_server("bob", candidate(5000))).await;

    assert!(matches!(
        outcome,
        DispatchOutcome::UnknownPeer { kind: PayloadKind::Candidate, .. }
    ));
    assert_eq!(h.engine.create_attempts().await, 0);
    assert_eq!(h.transport.sent_count().await, 0);
}

#[tokio::test]
async fn test_candidate_is_added_to_connection() {
    let mut h = default_harness();

    h.dispatcher.dispatch(&frame_to_server("alice", request())).await;
    let outcome = h.dispatcher.dispatch(&frame_to_server("alice", candidate(6000))).await;

    assert!(matches!(outcome, DispatchOutcome::CandidateAdded { .. }));
    assert_eq!(
        h.engine.connections().await[0].calls().await,
        vec![Call::Offer, Call::AddIceCandidate(host_candidate(6000))]
    );
    // Candidates are accepted before the answer arrives too.
    assert_eq!(
        h.dispatcher.registry().state(&PeerId::from("alice")),
        Some(HandleState::Offering)
    );
}

#[tokio::test]
async fn test_sdp_attribute_form_is_accepted() {
    let mut h = default_harness();
    let attr = IceCandidate::new("a=candidate:1 1 udp 2130706431 192.0.2.1 4000 typ host", None, None);

    h.dispatcher.dispatch(&frame_to_server("alice", request())).await;
    let outcome = h
        .dispatcher
        .dispatch(&frame_to_server("alice", SignalPayload::Candidate(attr)))
        .await;

    assert!(matches!(outcome, DispatchOutcome::CandidateAdded { .. }));
}

#[tokio::test]
async fn test_malformed_candidate_is_dropped() {
    let mut h = default_harness();
    let alice = PeerId::from("alice");

    h.dispatcher.dispatch(&frame_to_server("alice", request())).await;

    for line in ["", "candidate:", "not a candidate", "a=mid:0"] {
        let bad = IceCandidate::new(line, Some("0".to_owned()), Some(0));
        let outcome = h
            .dispatcher
            .dispatch(&frame_to_server("alice", SignalPayload::Candidate(bad)))
            .await;
        assert!(matches!(
            outcome,
            DispatchOutcome::Failed(SignalError::CandidateDecode { .. })
        ));
    }

    assert_eq!(h.engine.connections().await[0].calls().await, vec![Call::Offer]);
    assert_eq!(h.dispatcher.registry().state(&alice), Some(HandleState::Offering));
}

#[tokio::test]
async fn test_rejected_candidate_keeps_connection() {
    let engine = MockEngine::with_script(EngineScript {
        fail_add_candidate: true,
        ..Default::default()
    });
    let mut h = create_harness(engine, RecordingTransport::new());
    let alice = PeerId::from("alice");

    h.dispatcher.dispatch(&frame_to_server("alice", request())).await;
    let outcome = h.dispatcher.dispatch(&frame_to_server("alice", candidate(6000))).await;

    assert!(matches!(
        outcome,
        DispatchOutcome::Failed(SignalError::CandidateAdd { .. })
    ));
    assert!(h.dispatcher.registry().contains(&alice));
    assert_eq!(h.engine.connections().await[0].close_count().await, 0);

    // Later candidates are still attempted.
    h.dispatcher.dispatch(&frame_to_server("alice", candidate(6001))).await;
    let adds = h.engine.connections().await[0]
        .calls()
        .await
        .into_iter()
        .filter(|c| matches!(c, Call::AddIceCandidate(_)))
        .count();
    assert_eq!(adds, 2);
}

#[tokio::test]
async fn test_candidate_goes_to_current_connection_after_supersede() {
    let mut h = default_harness();

    h.dispatcher.dispatch(&frame_to_server("alice", request())).await;
    h.dispatcher.dispatch(&frame_to_server("alice", request())).await;
    h.dispatcher.dispatch(&frame_to_server("alice", candidate(6000))).await;

    let connections = h.engine.connections().await;
    assert_eq!(connections[0].calls().await, vec![Call::Offer, Call::Close]);
    assert_eq!(
        connections[1].calls().await,
        vec![Call::Offer, Call::AddIceCandidate(host_candidate(6000))]
    );
}
