//! Hexpulse multiplayer game server.

use anyhow::Context;
use hexpulse_core::GameConfig;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod protocol;
mod room;
mod server;

use server::ServerState;

const DEFAULT_TICK_HZ: f64 = 10.0;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Parse address from env or use default
    let addr: SocketAddr = std::env::var("SERVER_ADDR")
        .unwrap_or_else(|_| "0.0.0.0:8080".into())
        .parse()?;

    let tick_hz: f64 = match std::env::var("TICK_HZ") {
        Ok(raw) => {
            let hz: f64 = raw
                .parse()
                .with_context(|| format!("TICK_HZ must be a number, got {:?}", raw))?;
            anyhow::ensure!(
                hz.is_finite() && hz > 0.0,
                "TICK_HZ must be a positive finite number, got {:?}",
                raw
            );
            if hz != server::clamp_tick_hz(hz) {
                warn!(
                    "TICK_HZ {} clamped to {}..={}",
                    hz,
                    server::MIN_TICK_HZ,
                    server::MAX_TICK_HZ
                );
            }
            hz
        }
        Err(_) => DEFAULT_TICK_HZ,
    };

    let config = match std::env::var("HEXPULSE_CONFIG") {
        Ok(path) => {
            let json = std::fs::read_to_string(&path)
                .with_context(|| format!("reading game config {}", path))?;
            let config = GameConfig::from_json(&json)
                .with_context(|| format!("parsing game config {}", path))?;
            info!("Loaded game config from {}", path);
            config
        }
        Err(_) => GameConfig::default(),
    };

    info!("Starting Hexpulse server...");

    let state = Arc::new(ServerState::new(config, tick_hz));

    server::run_server(addr, state).await
}
