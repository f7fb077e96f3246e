use crate::config::ServerConfig;
use crate::dispatch::{HandleState, PeerRegistry};
use crate::engine::{PeerConnection, PeerEngine};
use crate::error::SignalError;
use crate::signaling::{SignalingTransport, TransportError};
use bytes::Bytes;
use rendezvous_core::codec;
use rendezvous_core::{
    IceCandidate, PayloadKind, PeerId, SessionDescription, SignalMessage, SignalPayload,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

/// What handling one inbound message amounted to.
#[derive(Debug)]
pub enum DispatchOutcome {
    /// Sent by this peer and echoed back by the transport.
    SelfEcho,
    /// Addressed to another member.
    NotAddressed,
    /// A fresh offer was sent. `superseded` is set when an older connection
    /// to the same peer was closed first.
    Offered { peer: PeerId, superseded: bool },
    OfferIgnored { peer: PeerId },
    /// Answer applied and every local candidate sent.
    CandidatesSent { peer: PeerId, count: usize },
    CandidateAdded { peer: PeerId },
    /// Answer or Candidate from a peer with no connection.
    UnknownPeer { peer: PeerId, kind: PayloadKind },
    /// Logged and dropped.
    Failed(SignalError),
}

/// Drives the per-peer negotiation state machine.
///
/// Every inbound message goes through [`dispatch`](Self::dispatch) on a
/// single task, which is the only place the [`PeerRegistry`] is touched.
pub struct Dispatcher {
    id: PeerId,
    engine: Arc<dyn PeerEngine>,
    transport: Arc<dyn SignalingTransport>,
    registry: PeerRegistry,
    candidate_pause: Duration,
}

impl Dispatcher {
    pub fn new(
        id: PeerId,
        engine: Arc<dyn PeerEngine>,
        transport: Arc<dyn SignalingTransport>,
    ) -> Self {
        Self {
            id,
            engine,
            transport,
            registry: PeerRegistry::new(),
            candidate_pause: ServerConfig::default().candidate_pause,
        }
    }

    pub fn from_config(
        config: &ServerConfig,
        engine: Arc<dyn PeerEngine>,
        transport: Arc<dyn SignalingTransport>,
    ) -> Self {
        Self::new(config.id.clone(), engine, transport).with_candidate_pause(config.candidate_pause)
    }

    pub fn with_candidate_pause(mut self, pause: Duration) -> Self {
        self.candidate_pause = pause;
        self
    }

    pub fn registry(&self) -> &PeerRegistry {
        &self.registry
    }

    /// Process inbound frames until `shutdown` fires or the transport
    /// closes, then close every remaining connection.
    pub async fn run(mut self, mut inbound: mpsc::Receiver<Bytes>, mut shutdown: watch::Receiver<bool>) {
        info!("Dispatcher for {} started", self.id);

        while !*shutdown.borrow() {
            tokio::select! {
                frame = inbound.recv() => {
                    match frame {
                        Some(raw) => {
                            self.dispatch(&raw).await;
                        }
                        None => {
                            info!("Signaling channel closed");
                            break;
                        }
                    }
                }

                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        self.shutdown().await;
        info!("Dispatcher for {} finished", self.id);
    }

    pub async fn shutdown(&mut self) {
        if self.registry.is_empty() {
            return;
        }
        info!("Closing {} peer connection(s)", self.registry.len());
        self.registry.close_all().await;
    }

    /// Handle one raw signaling frame. Errors never escape: they are logged
    /// and reported as [`DispatchOutcome::Failed`].
    pub async fn dispatch(&mut self, raw: &[u8]) -> DispatchOutcome {
        match self.handle(raw).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("{}", e);
                DispatchOutcome::Failed(e)
            }
        }
    }

    async fn handle(&mut self, raw: &[u8]) -> Result<DispatchOutcome, SignalError> {
        let message = codec::decode(raw)?;

        if message.sender == self.id {
            return Ok(DispatchOutcome::SelfEcho);
        }
        if !message.is_addressed_to(&self.id) {
            return Ok(DispatchOutcome::NotAddressed);
        }

        debug!("recv: {} from {}", message.kind(), message.sender);

        let SignalMessage { sender, payload, .. } = message;
        match payload {
            SignalPayload::Request => self.on_request(sender).await,
            SignalPayload::Offer { .. } => {
                debug!("Ignoring offer from {}", sender);
                Ok(DispatchOutcome::OfferIgnored { peer: sender })
            }
            SignalPayload::Answer { description } => self.on_answer(sender, &description).await,
            SignalPayload::Candidate(candidate) => self.on_candidate(sender, candidate).await,
        }
    }

    async fn on_request(&mut self, peer: PeerId) -> Result<DispatchOutcome, SignalError> {
        let superseded = self.registry.close(&peer).await;
        if superseded {
            info!("Superseding previous connection for {}", peer);
        }

        let handle = self
            .engine
            .new_connection(&peer)
            .await
            .map_err(|source| SignalError::ConnectionCreate {
                peer: peer.clone(),
                source,
            })?;

        // A connection is registered only once its offer went out.
        if let Err(e) = self.send_offer(&peer, handle.as_ref()).await {
            handle.close().await;
            return Err(e);
        }

        info!("Offer completed: {}", peer);
        self.registry.insert(peer.clone(), handle, HandleState::Offering);

        Ok(DispatchOutcome::Offered { peer, superseded })
    }

    async fn send_offer(&self, peer: &PeerId, handle: &dyn PeerConnection) -> Result<(), SignalError> {
        let offer = handle.offer().await.map_err(|source| SignalError::Offer {
            peer: peer.clone(),
            source,
        })?;
        let description = offer.to_blob().map_err(|e| SignalError::Offer {
            peer: peer.clone(),
            source: e.into(),
        })?;
        self.send(peer, SignalPayload::Offer { description }).await
    }

    async fn on_answer(&mut self, peer: PeerId, description: &str) -> Result<DispatchOutcome, SignalError> {
        let Some(slot) = self.registry.get(&peer) else {
            warn!("connection failed: {}", peer);
            return Ok(DispatchOutcome::UnknownPeer {
                peer,
                kind: PayloadKind::Answer,
            });
        };

        let desc = SessionDescription::from_blob(description).map_err(|source| {
            SignalError::DescriptionDecode {
                peer: peer.clone(),
                source,
            }
        })?;

        let applied = slot.handle.set_remote_description(desc).await;
        if let Err(source) = applied {
            self.registry.close(&peer).await;
            return Err(SignalError::RemoteDescription { peer, source });
        }

        let candidates = match self.registry.get_mut(&peer) {
            Some(slot) => {
                slot.state = HandleState::Negotiating;
                slot.handle.ice_candidates().await
            }
            None => Vec::new(),
        };

        info!("Sending {} candidate(s) to {}", candidates.len(), peer);
        let count = self.send_candidates(&peer, candidates).await?;

        Ok(DispatchOutcome::CandidatesSent { peer, count })
    }

    /// Send one Candidate message per candidate, in order. The first failed
    /// send aborts the rest.
    async fn send_candidates(&self, peer: &PeerId, candidates: Vec<IceCandidate>) -> Result<usize, SignalError> {
        let mut sent = 0;
        for candidate in candidates {
            if sent > 0 && !self.candidate_pause.is_zero() {
                tokio::time::sleep(self.candidate_pause).await;
            }
            debug!("candidate: {:?}", candidate.candidate);
            self.send(peer, SignalPayload::Candidate(candidate)).await?;
            sent += 1;
        }
        Ok(sent)
    }

    async fn on_candidate(&mut self, peer: PeerId, candidate: IceCandidate) -> Result<DispatchOutcome, SignalError> {
        let Some(slot) = self.registry.get(&peer) else {
            warn!("connection failed: {}", peer);
            return Ok(DispatchOutcome::UnknownPeer {
                peer,
                kind: PayloadKind::Candidate,
            });
        };

        candidate
            .validate()
            .map_err(|source| SignalError::CandidateDecode {
                peer: peer.clone(),
                source,
            })?;

        slot.handle
            .add_ice_candidate(candidate)
            .await
            .map_err(|source| SignalError::CandidateAdd {
                peer: peer.clone(),
                source,
            })?;

        Ok(DispatchOutcome::CandidateAdded { peer })
    }

    async fn send(&self, to: &PeerId, payload: SignalPayload) -> Result<(), SignalError> {
        let kind = payload.kind();
        debug!("send: {} to {}", kind, to);

        let message = SignalMessage::direct(self.id.clone(), to.clone(), payload);
        let result = match codec::encode(&message) {
            Ok(bytes) => self.transport.send(bytes).await,
            Err(e) => Err(TransportError::from(e)),
        };

        result.map_err(|source| SignalError::Send {
            peer: to.clone(),
            kind,
            source,
        })
    }
}
