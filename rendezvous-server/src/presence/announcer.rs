use crate::error::SignalError;
use crate::signaling::SignalingTransport;
use rendezvous_core::Presence;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, error, info};

const MIN_INTERVAL: Duration = Duration::from_millis(10);

/// Keeps this peer discoverable by announcing [`Presence::Create`] to the
/// room once per interval.
///
/// Liveness: while [`run`](Self::run) is active, at least one announcement
/// is sent in every window of `interval`. Newcomers and restarted peers
/// rely on it to find this peer and send a Request.
pub struct PresenceAnnouncer {
    transport: Arc<dyn SignalingTransport>,
    interval: Duration,
}

impl PresenceAnnouncer {
    pub fn new(transport: Arc<dyn SignalingTransport>, interval: Duration) -> Self {
        Self {
            transport,
            interval: interval.max(MIN_INTERVAL),
        }
    }

    /// Announce until `shutdown` fires, then send a single farewell.
    ///
    /// A failed announcement ends the loop with an error.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> Result<(), SignalError> {
        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!("Announcing presence every {:?}", self.interval);

        while !*shutdown.borrow() {
            tokio::select! {
                _ = ticker.tick() => {
                    self.announce(Presence::Create).await?;
                }

                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        self.announce(Presence::Bye).await?;
        info!("Farewell announced");
        Ok(())
    }

    async fn announce(&self, state: Presence) -> Result<(), SignalError> {
        debug!("Announcing {:?}", state);
        self.transport.announce(state).await.map_err(|source| {
            error!("Presence announcement failed: {}", source);
            SignalError::Announce { state, source }
        })
    }
}
