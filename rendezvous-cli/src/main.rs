use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rendezvous_core::PeerId;
use rendezvous_server::config::{DEFAULT_HUB_URL, DEFAULT_PEER_ID, DEFAULT_ROOM};
use rendezvous_server::{
    EchoHandler, EngineConfig, HubConfig, RelayHub, Responder, ServerConfig, WebRtcEngine,
    WsTransport,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "rendezvous")]
#[command(about = "Room-based WebRTC signaling")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Join a room and answer every peer that requests a connection.
    Serve {
        #[arg(long, default_value = DEFAULT_ROOM)]
        room: String,

        #[arg(long, default_value = DEFAULT_PEER_ID)]
        id: String,

        #[arg(long, default_value = DEFAULT_HUB_URL)]
        hub: String,

        /// STUN/TURN url, may be repeated. Defaults to a public STUN server.
        #[arg(long = "ice-server")]
        ice_servers: Vec<String>,

        #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u64).range(1..))]
        announce_interval_secs: u64,
    },
    /// Run the WebSocket relay that room members connect to.
    Hub {
        #[arg(long, default_value = "0.0.0.0:8080")]
        listen: SocketAddr,

        #[arg(long, default_value_t = 30, value_parser = clap::value_parser!(u64).range(1..))]
        presence_ttl_secs: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match Cli::parse().command {
        Commands::Serve {
            room,
            id,
            hub,
            ice_servers,
            announce_interval_secs,
        } => {
            let config = ServerConfig {
                room,
                id: PeerId::from(id),
                hub_url: hub,
                announce_interval: Duration::from_secs(announce_interval_secs),
                ..Default::default()
            };
            let mut engine_config = EngineConfig::default();
            if !ice_servers.is_empty() {
                engine_config.ice_servers = ice_servers;
            }
            serve(config, engine_config).await
        }
        Commands::Hub {
            listen,
            presence_ttl_secs,
        } => {
            let config = HubConfig {
                listen,
                presence_ttl: Duration::from_secs(presence_ttl_secs),
            };
            run_hub(config).await
        }
    }
}

async fn serve(config: ServerConfig, engine_config: EngineConfig) -> Result<()> {
    let engine = WebRtcEngine::new(engine_config, Arc::new(EchoHandler))
        .context("failed to set up WebRTC engine")?;
    let transport = Arc::new(WsTransport::new(config.hub_url.clone()));

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
    };

    Responder::new(config, Arc::new(engine), transport)
        .run(shutdown)
        .await
        .context("responder stopped")?;

    info!("Stopped");
    Ok(())
}

async fn run_hub(config: HubConfig) -> Result<()> {
    let listener = TcpListener::bind(config.listen)
        .await
        .with_context(|| format!("failed to bind {}", config.listen))?;

    RelayHub::from(&config)
        .serve(listener)
        .await
        .context("signaling hub stopped")
}
