use crate::hub::ws_handler::{members_handler, ws_handler};
use axum::Router;
use axum::extract::ws::Message;
use axum::routing::get;
use dashmap::DashMap;
use rendezvous_core::{PeerId, Presence};
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct HubConfig {
    pub listen: SocketAddr,
    /// How long a `create` announcement keeps a member listed.
    pub presence_ttl: Duration,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([0, 0, 0, 0], 8080)),
            presence_ttl: Duration::from_secs(30),
        }
    }
}

/// Registration of one socket. `conn` tells apart sockets that joined
/// under the same id.
struct Member {
    conn: u64,
    tx: mpsc::UnboundedSender<Message>,
}

struct HubInner {
    rooms: DashMap<String, DashMap<PeerId, Member>>,
    directory: DashMap<String, DashMap<PeerId, Instant>>,
    presence_ttl: Duration,
    next_conn: AtomicU64,
}

/// Relays frames between the members of each room and keeps a directory
/// of the members that announced themselves.
#[derive(Clone)]
pub struct RelayHub {
    inner: Arc<HubInner>,
}

impl RelayHub {
    pub fn new(presence_ttl: Duration) -> Self {
        Self {
            inner: Arc::new(HubInner {
                rooms: DashMap::new(),
                directory: DashMap::new(),
                presence_ttl,
                next_conn: AtomicU64::new(0),
            }),
        }
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/rooms/{room}/members", get(members_handler))
            .route("/rooms/{room}/{peer_id}", get(ws_handler))
            .with_state(self.clone())
    }

    pub async fn serve(self, listener: TcpListener) -> std::io::Result<()> {
        info!("Signaling hub listening on {}", listener.local_addr()?);
        axum::serve(listener, self.router()).await
    }

    /// Register a socket for `peer_id`, replacing any older socket with the
    /// same id. Returns the token to pass to [`remove_member`](Self::remove_member).
    pub(crate) fn add_member(&self, room: &str, peer_id: PeerId, tx: mpsc::UnboundedSender<Message>) -> u64 {
        let conn = self.inner.next_conn.fetch_add(1, Ordering::Relaxed);
        let members = self.inner.rooms.entry(room.to_owned()).or_default();
        if members.insert(peer_id.clone(), Member { conn, tx }).is_some() {
            warn!("Peer {} rejoined room '{}', replacing old socket", peer_id, room);
        }
        conn
    }

    /// Drop the registration made under `conn`. A newer socket that took
    /// over the same id keeps its membership and directory entry.
    pub(crate) fn remove_member(&self, room: &str, peer_id: &PeerId, conn: u64) {
        let removed = match self.inner.rooms.get(room) {
            Some(members) => members
                .remove_if(peer_id, |_, member| member.conn == conn)
                .is_some(),
            None => false,
        };
        self.inner.rooms.remove_if(room, |_, members| members.is_empty());
        if !removed {
            debug!("Socket {} of {} was already replaced", conn, peer_id);
            return;
        }

        if let Some(directory) = self.inner.directory.get(room) {
            directory.remove(peer_id);
        }
        self.inner
            .directory
            .remove_if(room, |_, directory| directory.is_empty());
    }

    /// Forward `msg` to every member of `room` except `from`.
    pub(crate) fn relay(&self, room: &str, from: &PeerId, msg: Message) {
        let Some(members) = self.inner.rooms.get(room) else {
            return;
        };
        for member in members.iter() {
            if member.key() == from {
                continue;
            }
            if member.value().tx.send(msg.clone()).is_err() {
                warn!("Failed to relay to {} in room '{}'", member.key(), room);
            }
        }
    }

    pub fn record_presence(&self, room: &str, peer_id: PeerId, state: Presence) {
        match state {
            Presence::Create => {
                self.inner
                    .directory
                    .entry(room.to_owned())
                    .or_default()
                    .insert(peer_id, Instant::now());
            }
            Presence::Bye => {
                if let Some(directory) = self.inner.directory.get(room) {
                    directory.remove(&peer_id);
                }
            }
        }
    }

    /// Members of `room` whose last `create` is younger than the presence TTL.
    pub fn members(&self, room: &str) -> Vec<PeerId> {
        let Some(directory) = self.inner.directory.get(room) else {
            return Vec::new();
        };
        let ttl = self.inner.presence_ttl;
        let mut members: Vec<PeerId> = directory
            .iter()
            .filter(|entry| entry.value().elapsed() < ttl)
            .map(|entry| entry.key().clone())
            .collect();
        members.sort();
        members
    }
}

impl From<&HubConfig> for RelayHub {
    fn from(config: &HubConfig) -> Self {
        Self::new(config.presence_ttl)
    }
}
