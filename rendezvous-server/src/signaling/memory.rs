use crate::signaling::{SignalingTransport, TransportError};
use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use rendezvous_core::{PeerId, Presence};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{Mutex, broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

const ROOM_CAPACITY: usize = 256;
const INBOX_CAPACITY: usize = 256;

struct MemoryRoom {
    bus: broadcast::Sender<Bytes>,
    presence: DashMap<PeerId, Presence>,
}

/// In-process room hub. Every member of a room receives every frame sent
/// to it, the sender included.
#[derive(Clone, Default)]
pub struct MemoryHub {
    rooms: Arc<DashMap<String, Arc<MemoryRoom>>>,
}

impl MemoryHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a transport bound to this hub. It joins a room on
    /// [`SignalingTransport::join`].
    pub fn transport(&self) -> MemoryTransport {
        MemoryTransport {
            hub: self.clone(),
            joined: Mutex::new(None),
        }
    }

    /// Members of `room` whose latest announcement is [`Presence::Create`].
    pub fn announced(&self, room: &str) -> Vec<PeerId> {
        let Some(room) = self.rooms.get(room) else {
            return Vec::new();
        };
        let mut ids: Vec<PeerId> = room
            .presence
            .iter()
            .filter(|entry| *entry.value() == Presence::Create)
            .map(|entry| entry.key().clone())
            .collect();
        ids.sort();
        ids
    }

    fn room(&self, name: &str) -> Arc<MemoryRoom> {
        self.rooms
            .entry(name.to_owned())
            .or_insert_with(|| {
                let (bus, _) = broadcast::channel(ROOM_CAPACITY);
                Arc::new(MemoryRoom {
                    bus,
                    presence: DashMap::new(),
                })
            })
            .clone()
    }
}

struct Joined {
    id: PeerId,
    room: Arc<MemoryRoom>,
    forward: JoinHandle<()>,
}

pub struct MemoryTransport {
    hub: MemoryHub,
    joined: Mutex<Option<Joined>>,
}

#[async_trait]
impl SignalingTransport for MemoryTransport {
    async fn join(&self, room: &str, id: &PeerId) -> Result<mpsc::Receiver<Bytes>, TransportError> {
        let shared = self.hub.room(room);
        let mut bus_rx = shared.bus.subscribe();
        let (tx, rx) = mpsc::channel(INBOX_CAPACITY);

        let member = id.clone();
        let forward = tokio::spawn(async move {
            loop {
                match bus_rx.recv().await {
                    Ok(data) => {
                        if tx.send(data).await.is_err() {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("Member {} lagged, {} frames dropped", member, skipped);
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });

        let previous = self.joined.lock().await.replace(Joined {
            id: id.clone(),
            room: shared,
            forward,
        });
        if let Some(previous) = previous {
            previous.forward.abort();
        }

        debug!("{} joined memory room '{}'", id, room);
        Ok(rx)
    }

    async fn send(&self, data: Bytes) -> Result<(), TransportError> {
        let joined = self.joined.lock().await;
        let joined = joined.as_ref().ok_or(TransportError::NotJoined)?;
        // No receivers is not an error: delivery is at-most-once.
        let _ = joined.room.bus.send(data);
        Ok(())
    }

    async fn announce(&self, presence: Presence) -> Result<(), TransportError> {
        let joined = self.joined.lock().await;
        let joined = joined.as_ref().ok_or(TransportError::NotJoined)?;
        joined.room.presence.insert(joined.id.clone(), presence);
        Ok(())
    }

    async fn leave(&self) -> Result<(), TransportError> {
        let Some(joined) = self.joined.lock().await.take() else {
            return Err(TransportError::NotJoined);
        };
        joined.forward.abort();
        joined.room.presence.remove(&joined.id);
        Ok(())
    }
}
