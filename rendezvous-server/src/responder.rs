use crate::config::ServerConfig;
use crate::dispatch::Dispatcher;
use crate::engine::PeerEngine;
use crate::error::SignalError;
use crate::presence::PresenceAnnouncer;
use crate::signaling::SignalingTransport;
use std::future::Future;
use std::pin::pin;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

enum Exit {
    Requested,
    AnnounceFailed(Result<(), SignalError>),
    HubLost,
}

/// One room member answering connection requests: a [`Dispatcher`] and a
/// [`PresenceAnnouncer`] sharing a joined transport.
pub struct Responder {
    config: ServerConfig,
    engine: Arc<dyn PeerEngine>,
    transport: Arc<dyn SignalingTransport>,
}

impl Responder {
    pub fn new(
        config: ServerConfig,
        engine: Arc<dyn PeerEngine>,
        transport: Arc<dyn SignalingTransport>,
    ) -> Self {
        Self {
            config,
            engine,
            transport,
        }
    }

    /// Join the room and serve until `shutdown` resolves.
    ///
    /// Returns `Ok` only for a requested shutdown. A failed announcement or
    /// a closed signaling channel ends the run with an error, after every
    /// connection was closed and the room left.
    pub async fn run(self, shutdown: impl Future<Output = ()>) -> Result<(), SignalError> {
        self.config.validate()?;

        let inbound = self
            .transport
            .join(&self.config.room, &self.config.id)
            .await
            .map_err(|source| SignalError::Join {
                room: self.config.room.clone(),
                source,
            })?;
        info!("Serving room '{}' as {}", self.config.room, self.config.id);

        let (stop_tx, stop_rx) = watch::channel(false);
        let dispatcher = Dispatcher::from_config(&self.config, self.engine, Arc::clone(&self.transport));
        let announcer = PresenceAnnouncer::new(Arc::clone(&self.transport), self.config.announce_interval);

        let mut dispatching = pin!(dispatcher.run(inbound, stop_rx.clone()));
        let mut announcing = pin!(announcer.run(stop_rx));
        let mut shutdown = pin!(shutdown);

        let exit = tokio::select! {
            _ = &mut shutdown => Exit::Requested,
            result = &mut announcing => Exit::AnnounceFailed(result),
            _ = &mut dispatching => Exit::HubLost,
        };

        let _ = stop_tx.send(true);

        let result = match exit {
            Exit::Requested => {
                info!("Shutdown requested");
                let ((), announced) = tokio::join!(dispatching, announcing);
                announced
            }
            Exit::AnnounceFailed(result) => {
                dispatching.await;
                result
            }
            Exit::HubLost => {
                warn!("Signaling channel closed, leaving room '{}'", self.config.room);
                if let Err(e) = announcing.await {
                    debug!("Farewell not delivered: {}", e);
                }
                Err(SignalError::HubLost)
            }
        };

        if let Err(e) = self.transport.leave().await {
            debug!("Leaving room '{}': {}", self.config.room, e);
        }
        result
    }
}
