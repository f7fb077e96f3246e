use crate::engine::{ChannelHandler, EngineConfig, PeerConnection, PeerEngine};
use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use rendezvous_core::{IceCandidate, PeerId, SdpType, SessionDescription};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, watch};
use tokio::time::timeout;
use tracing::{debug, info, warn};
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::api::setting_engine::SettingEngine;
use webrtc::api::{API, APIBuilder};
use webrtc::data_channel::RTCDataChannel;
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;

const DATA_CHANNEL_LABEL: &str = "data";

/// [`PeerEngine`] backed by the `webrtc` crate.
pub struct WebRtcEngine {
    api: API,
    config: EngineConfig,
    handler: Arc<dyn ChannelHandler>,
}

impl WebRtcEngine {
    pub fn new(config: EngineConfig, handler: Arc<dyn ChannelHandler>) -> Result<Self> {
        // Codecs are registered even though only data channels are used.
        let mut m = MediaEngine::default();
        m.register_default_codecs()?;
        let registry = register_default_interceptors(Registry::new(), &mut m)?;

        let mut settings = SettingEngine::default();
        settings.set_include_loopback_candidate(config.include_loopback_candidates);

        let api = APIBuilder::new()
            .with_media_engine(m)
            .with_interceptor_registry(registry)
            .with_setting_engine(settings)
            .build();

        Ok(Self {
            api,
            config,
            handler,
        })
    }

    fn rtc_config(&self) -> RTCConfiguration {
        let ice_servers = if self.config.ice_servers.is_empty() {
            vec![]
        } else {
            vec![RTCIceServer {
                urls: self.config.ice_servers.clone(),
                ..Default::default()
            }]
        };

        RTCConfiguration {
            ice_servers,
            ..Default::default()
        }
    }
}

#[async_trait]
impl PeerEngine for WebRtcEngine {
    async fn new_connection(&self, peer_id: &PeerId) -> Result<Box<dyn PeerConnection>> {
        let peer_connection = Arc::new(self.api.new_peer_connection(self.rtc_config()).await?);
        let handed_off = Arc::new(AtomicBool::new(false));

        let uid_state = peer_id.clone();
        peer_connection.on_peer_connection_state_change(Box::new(
            move |s: RTCPeerConnectionState| {
                let uid = uid_state.clone();
                Box::pin(async move {
                    info!("Peer connection state changed for {}: {:?}", uid, s);
                })
            },
        ));

        let candidates = Arc::new(Mutex::new(Vec::new()));
        let (gathered_tx, gathered_rx) = watch::channel(false);
        let gathered_tx = Arc::new(gathered_tx);

        let ice_candidates = Arc::clone(&candidates);
        let uid_ice = peer_id.clone();
        peer_connection.on_ice_candidate(Box::new(move |c: Option<RTCIceCandidate>| {
            let candidates = Arc::clone(&ice_candidates);
            let gathered_tx = Arc::clone(&gathered_tx);
            let uid = uid_ice.clone();

            Box::pin(async move {
                // `None` marks the end of gathering.
                let Some(candidate) = c else {
                    gathered_tx.send_replace(true);
                    return;
                };
                match candidate.to_json() {
                    Ok(init) => candidates.lock().await.push(IceCandidate {
                        candidate: init.candidate,
                        sdp_mid: init.sdp_mid,
                        sdp_m_line_index: init.sdp_mline_index,
                    }),
                    Err(e) => warn!("Dropping local candidate for {}: {}", uid, e),
                }
            })
        }));

        // Channels opened by the remote side.
        let handler = Arc::clone(&self.handler);
        let handed = Arc::clone(&handed_off);
        let uid_dc = peer_id.clone();
        peer_connection.on_data_channel(Box::new(move |dc: Arc<RTCDataChannel>| {
            let handler = Arc::clone(&handler);
            let handed = Arc::clone(&handed);
            let uid = uid_dc.clone();
            Box::pin(async move {
                debug!("Remote data channel '{}' for {}", dc.label(), uid);
                hand_off_on_open(&dc, handler, handed, uid);
            })
        }));

        // The offer must carry an application section, so the local
        // channel exists before offering.
        let dc = peer_connection
            .create_data_channel(DATA_CHANNEL_LABEL, None)
            .await
            .context("Failed to create data channel")?;
        hand_off_on_open(&dc, Arc::clone(&self.handler), handed_off, peer_id.clone());

        Ok(Box::new(WebRtcConnection {
            peer_id: peer_id.clone(),
            peer_connection,
            candidates,
            gathered: gathered_rx,
            gather_timeout: self.config.gather_timeout,
        }))
    }
}

/// Spawn the handler once `dc` opens, unless this connection already handed
/// off a channel.
fn hand_off_on_open(
    dc: &Arc<RTCDataChannel>,
    handler: Arc<dyn ChannelHandler>,
    handed_off: Arc<AtomicBool>,
    peer_id: PeerId,
) {
    let weak = Arc::downgrade(dc);
    dc.on_open(Box::new(move || {
        Box::pin(async move {
            let Some(channel) = weak.upgrade() else {
                return;
            };
            if handed_off.swap(true, Ordering::SeqCst) {
                debug!("Ignoring extra channel '{}' for {}", channel.label(), peer_id);
                return;
            }
            info!("DataChannel open and ready for {}", peer_id);
            tokio::spawn(async move {
                handler.serve(peer_id, channel).await;
            });
        })
    }));
}

pub struct WebRtcConnection {
    peer_id: PeerId,
    peer_connection: Arc<RTCPeerConnection>,
    candidates: Arc<Mutex<Vec<IceCandidate>>>,
    gathered: watch::Receiver<bool>,
    gather_timeout: Duration,
}

#[async_trait]
impl PeerConnection for WebRtcConnection {
    async fn offer(&self) -> Result<SessionDescription> {
        let offer = self.peer_connection.create_offer(None).await?;
        self.peer_connection
            .set_local_description(offer.clone())
            .await?;
        Ok(SessionDescription::offer(offer.sdp))
    }

    async fn set_remote_description(&self, desc: SessionDescription) -> Result<()> {
        let desc = match desc.sdp_type {
            SdpType::Answer => RTCSessionDescription::answer(desc.sdp)?,
            SdpType::Pranswer => RTCSessionDescription::pranswer(desc.sdp)?,
            SdpType::Offer => RTCSessionDescription::offer(desc.sdp)?,
            SdpType::Rollback => bail!("rollback descriptions are not supported"),
        };
        self.peer_connection.set_remote_description(desc).await?;
        Ok(())
    }

    async fn ice_candidates(&self) -> Vec<IceCandidate> {
        let mut gathered = self.gathered.clone();
        let complete = timeout(self.gather_timeout, gathered.wait_for(|done| *done))
            .await
            .is_ok_and(|waited| waited.is_ok());
        if !complete {
            debug!(
                "ICE gathering for {} still running after {:?}",
                self.peer_id, self.gather_timeout
            );
        }
        self.candidates.lock().await.clone()
    }

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<()> {
        let init = RTCIceCandidateInit {
            candidate: candidate.candidate,
            sdp_mid: candidate.sdp_mid,
            sdp_mline_index: candidate.sdp_m_line_index,
            username_fragment: None,
        };
        self.peer_connection.add_ice_candidate(init).await?;
        Ok(())
    }

    async fn close(&self) {
        if let Err(e) = self.peer_connection.close().await {
            warn!("Failed to close connection for {}: {}", self.peer_id, e);
        }
    }
}
