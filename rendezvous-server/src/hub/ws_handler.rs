use crate::hub::RelayHub;
use axum::Json;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Path, State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use rendezvous_core::{HubControl, PeerId};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

#[derive(Debug, Serialize)]
pub struct MembersResponse {
    pub room: String,
    pub members: Vec<PeerId>,
}

pub async fn members_handler(
    Path(room): Path<String>,
    State(hub): State<RelayHub>,
) -> Json<MembersResponse> {
    let members = hub.members(&room);
    Json(MembersResponse { room, members })
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Path((room, peer_id)): Path<(String, String)>,
    State(hub): State<RelayHub>,
) -> impl IntoResponse {
    let peer_id = PeerId::from(peer_id);

    ws.on_upgrade(move |socket| handle_socket(socket, room, peer_id, hub))
}

async fn handle_socket(socket: WebSocket, room: String, peer_id: PeerId, hub: RelayHub) {
    info!("Peer {} joined room '{}'", peer_id, room);

    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel();

    let conn = hub.add_member(&room, peer_id.clone(), tx);

    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(msg).await.is_err() {
                break;
            }
        }
    });

    let mut recv_task = tokio::spawn({
        let hub = hub.clone();
        let room = room.clone();
        let peer_id = peer_id.clone();

        async move {
            while let Some(Ok(msg)) = receiver.next().await {
                match msg {
                    Message::Binary(data) => hub.relay(&room, &peer_id, Message::Binary(data)),
                    Message::Text(text) => match serde_json::from_str::<HubControl>(&text) {
                        Ok(HubControl::Presence { id, state }) => {
                            if id != peer_id {
                                warn!("Peer {} announced presence as {}", peer_id, id);
                            }
                            debug!("Presence {:?} from {} in '{}'", state, peer_id, room);
                            hub.record_presence(&room, peer_id.clone(), state);
                            hub.relay(&room, &peer_id, Message::Text(text));
                        }
                        Err(e) => warn!("Invalid control frame from {}: {}", peer_id, e),
                    },
                    Message::Close(_) => break,
                    _ => {}
                }
            }
        }
    });

    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => send_task.abort(),
    };

    hub.remove_member(&room, &peer_id, conn);
    info!("Peer {} left room '{}'", peer_id, room);
}
