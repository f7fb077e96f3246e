use crate::signaling::{SignalingTransport, TransportError};
use async_trait::async_trait;
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use rendezvous_core::{HubControl, PeerId, Presence};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

const INBOX_CAPACITY: usize = 256;

struct WsSession {
    id: PeerId,
    outbound: mpsc::UnboundedSender<Message>,
    reader: JoinHandle<()>,
    /// Set once either socket task has ended.
    closed: Arc<AtomicBool>,
}

impl WsSession {
    fn queue(&self, msg: Message) -> Result<(), TransportError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(TransportError::Closed);
        }
        self.outbound.send(msg).map_err(|_| TransportError::Closed)
    }
}

/// WebSocket client of a [`RelayHub`](crate::hub::RelayHub).
///
/// Binary frames carry signaling bytes, text frames carry [`HubControl`]
/// JSON.
pub struct WsTransport {
    hub_url: String,
    session: Mutex<Option<WsSession>>,
}

impl WsTransport {
    pub fn new(hub_url: impl Into<String>) -> Self {
        Self {
            hub_url: hub_url.into(),
            session: Mutex::new(None),
        }
    }

    fn room_url(&self, room: &str, id: &PeerId) -> String {
        format!("{}/rooms/{}/{}", self.hub_url.trim_end_matches('/'), room, id)
    }
}

#[async_trait]
impl SignalingTransport for WsTransport {
    async fn join(&self, room: &str, id: &PeerId) -> Result<mpsc::Receiver<Bytes>, TransportError> {
        let url = self.room_url(room, id);
        let (socket, _) = connect_async(url.as_str()).await?;
        info!("Connected to signaling hub at {}", url);

        let (mut sink, mut stream) = socket.split();
        let (outbound, mut outbound_rx) = mpsc::unbounded_channel::<Message>();
        let (inbound, inbound_rx) = mpsc::channel(INBOX_CAPACITY);
        let closed = Arc::new(AtomicBool::new(false));

        let writer_closed = Arc::clone(&closed);
        tokio::spawn(async move {
            while let Some(msg) = outbound_rx.recv().await {
                if let Err(e) = sink.send(msg).await {
                    warn!("Signaling hub write failed: {}", e);
                    break;
                }
            }
            writer_closed.store(true, Ordering::Release);
            let _ = sink.close().await;
        });

        let reader_closed = Arc::clone(&closed);
        let reader = tokio::spawn(async move {
            while let Some(frame) = stream.next().await {
                match frame {
                    Ok(Message::Binary(data)) => {
                        if inbound.send(data).await.is_err() {
                            break;
                        }
                    }
                    Ok(Message::Text(text)) => match serde_json::from_str::<HubControl>(&text) {
                        Ok(HubControl::Presence { id, state }) => {
                            debug!("Presence from {}: {:?}", id, state);
                        }
                        Err(e) => warn!("Invalid control frame from hub: {}", e),
                    },
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(e) => {
                        warn!("Signaling hub read failed: {}", e);
                        break;
                    }
                }
            }
            reader_closed.store(true, Ordering::Release);
            info!("Signaling hub connection closed");
        });

        let previous = self.session.lock().await.replace(WsSession {
            id: id.clone(),
            outbound,
            reader,
            closed,
        });
        if let Some(previous) = previous {
            previous.reader.abort();
        }

        Ok(inbound_rx)
    }

    async fn send(&self, data: Bytes) -> Result<(), TransportError> {
        let session = self.session.lock().await;
        let session = session.as_ref().ok_or(TransportError::NotJoined)?;
        session.queue(Message::Binary(data))
    }

    async fn announce(&self, presence: Presence) -> Result<(), TransportError> {
        let session = self.session.lock().await;
        let session = session.as_ref().ok_or(TransportError::NotJoined)?;
        let frame = serde_json::to_string(&HubControl::presence(session.id.clone(), presence))?;
        session.queue(Message::text(frame))
    }

    async fn leave(&self) -> Result<(), TransportError> {
        let Some(session) = self.session.lock().await.take() else {
            return Err(TransportError::NotJoined);
        };
        let _ = session.outbound.send(Message::Close(None));
        session.reader.abort();
        Ok(())
    }
}
