use async_trait::async_trait;
use rendezvous_core::PeerId;
use std::sync::Arc;
use tracing::{debug, info, warn};
use webrtc::data_channel::RTCDataChannel;
use webrtc::data_channel::data_channel_message::DataChannelMessage;

/// Receives the data channel of every successfully connected peer.
///
/// Called at most once per connection, on its own task. Whatever the
/// handler does with the channel afterwards is independent of signaling.
#[async_trait]
pub trait ChannelHandler: Send + Sync + 'static {
    async fn serve(&self, peer_id: PeerId, channel: Arc<RTCDataChannel>);
}

/// Writes every received message back on the channel it came from.
#[derive(Debug, Default, Clone, Copy)]
pub struct EchoHandler;

#[async_trait]
impl ChannelHandler for EchoHandler {
    async fn serve(&self, peer_id: PeerId, channel: Arc<RTCDataChannel>) {
        info!("Serving echo on channel '{}' for {}", channel.label(), peer_id);

        let echo = Arc::downgrade(&channel);
        let uid_msg = peer_id.clone();
        channel.on_message(Box::new(move |msg: DataChannelMessage| {
            let echo = echo.clone();
            let uid = uid_msg.clone();
            Box::pin(async move {
                let Some(channel) = echo.upgrade() else {
                    return;
                };
                let sent = if msg.is_string {
                    channel
                        .send_text(String::from_utf8_lossy(&msg.data).into_owned())
                        .await
                } else {
                    channel.send(&msg.data).await
                };
                match sent {
                    Ok(n) => debug!("Echoed {} bytes to {}", n, uid),
                    Err(e) => warn!("Echo to {} failed: {}", uid, e),
                }
            })
        }));

        channel.on_close(Box::new(move || {
            let uid = peer_id.clone();
            Box::pin(async move {
                info!("Channel closed for {}", uid);
            })
        }));
    }
}
