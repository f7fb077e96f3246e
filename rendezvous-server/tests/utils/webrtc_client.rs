use anyhow::{Context, Result};
use bytes::Bytes;
use rendezvous_core::{IceCandidate, SessionDescription};
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc, watch};
use webrtc::api::APIBuilder;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::api::setting_engine::SettingEngine;
use webrtc::data_channel::RTCDataChannel;
use webrtc::data_channel::data_channel_message::DataChannelMessage;
use webrtc::ice_transport::ice_candidate::RTCIceCandidateInit;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;

/// Answering side of a data-channel connection, for driving a responder
/// on the same machine.
pub struct WebRtcClient {
    peer_connection: Arc<RTCPeerConnection>,
    data_channel: Arc<Mutex<Option<Arc<RTCDataChannel>>>>,
    opened: Mutex<mpsc::Receiver<()>>,
    received: Mutex<mpsc::UnboundedReceiver<Bytes>>,
    candidates: Arc<Mutex<Vec<IceCandidate>>>,
    gathered: watch::Receiver<bool>,
}

impl WebRtcClient {
    pub async fn new() -> Result<Self> {
        let mut media_engine = MediaEngine::default();
        media_engine.register_default_codecs()?;
        let registry = register_default_interceptors(Registry::new(), &mut media_engine)?;

        let mut settings = SettingEngine::default();
        settings.set_include_loopback_candidate(true);

        let api = APIBuilder::new()
            .with_media_engine(media_engine)
            .with_interceptor_registry(registry)
            .with_setting_engine(settings)
            .build();
        let peer_connection = Arc::new(api.new_peer_connection(RTCConfiguration::default()).await?);

        let candidates = Arc::new(Mutex::new(Vec::new()));
        let (gathered_tx, gathered) = watch::channel(false);
        let gathered_tx = Arc::new(gathered_tx);
        let ice_candidates = Arc::clone(&candidates);
        peer_connection.on_ice_candidate(Box::new(move |candidate| {
            let candidates = Arc::clone(&ice_candidates);
            let gathered_tx = Arc::clone(&gathered_tx);
            Box::pin(async move {
                let Some(candidate) = candidate else {
                    gathered_tx.send_replace(true);
                    return;
                };
                if let Ok(init) = candidate.to_json() {
                    tracing::debug!("[WebRtcClient] ICE candidate generated");
                    candidates.lock().await.push(IceCandidate {
                        candidate: init.candidate,
                        sdp_mid: init.sdp_mid,
                        sdp_m_line_index: init.sdp_mline_index,
                    });
                }
            })
        }));

        let (open_tx, opened) = mpsc::channel(1);
        let (message_tx, received) = mpsc::unbounded_channel();
        let data_channel: Arc<Mutex<Option<Arc<RTCDataChannel>>>> = Arc::new(Mutex::new(None));
        let dc_slot = Arc::clone(&data_channel);
        peer_connection.on_data_channel(Box::new(move |dc: Arc<RTCDataChannel>| {
            let dc_slot = Arc::clone(&dc_slot);
            let open_tx = open_tx.clone();
            let message_tx = message_tx.clone();
            Box::pin(async move {
                tracing::debug!("[WebRtcClient] Data channel received: {}", dc.label());
                *dc_slot.lock().await = Some(Arc::clone(&dc));

                dc.on_open(Box::new(move || {
                    let open_tx = open_tx.clone();
                    Box::pin(async move {
                        let _ = open_tx.send(()).await;
                    })
                }));
                dc.on_message(Box::new(move |msg: DataChannelMessage| {
                    let _ = message_tx.send(Bytes::from(msg.data.to_vec()));
                    Box::pin(async {})
                }));
            })
        }));

        Ok(Self {
            peer_connection,
            data_channel,
            opened: Mutex::new(opened),
            received: Mutex::new(received),
            candidates,
            gathered,
        })
    }

    /// Apply an offer blob and return the answer blob.
    pub async fn answer(&self, offer_blob: &str) -> Result<String> {
        let offer = SessionDescription::from_blob(offer_blob)?;
        self.peer_connection
            .set_remote_description(RTCSessionDescription::offer(offer.sdp)?)
            .await?;
        let answer = self.peer_connection.create_answer(None).await?;
        self.peer_connection
            .set_local_description(answer.clone())
            .await?;
        Ok(SessionDescription::answer(answer.sdp).to_blob()?)
    }

    pub async fn add_candidate(&self, candidate: IceCandidate) -> Result<()> {
        self.peer_connection
            .add_ice_candidate(RTCIceCandidateInit {
                candidate: candidate.candidate,
                sdp_mid: candidate.sdp_mid,
                sdp_mline_index: candidate.sdp_m_line_index,
                username_fragment: None,
            })
            .await?;
        Ok(())
    }

    /// Local candidates, once gathering has finished.
    pub async fn gathered_candidates(&self) -> Result<Vec<IceCandidate>> {
        let mut gathered = self.gathered.clone();
        gathered
            .wait_for(|done| *done)
            .await
            .context("client dropped before gathering finished")?;
        Ok(self.candidates.lock().await.clone())
    }

    pub async fn wait_open(&self) -> Result<()> {
        self.opened
            .lock()
            .await
            .recv()
            .await
            .context("data channel never opened")
    }

    pub async fn send_text(&self, text: &str) -> Result<()> {
        let dc = self
            .data_channel
            .lock()
            .await
            .clone()
            .context("no data channel yet")?;
        dc.send_text(text.to_owned()).await?;
        Ok(())
    }

    pub async fn recv(&self) -> Option<Bytes> {
        self.received.lock().await.recv().await
    }

    pub async fn close(&self) -> Result<()> {
        self.peer_connection.close().await?;
        Ok(())
    }
}
