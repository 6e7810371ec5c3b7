//! Synapse API server binary.
//!
//! Usage:
//!   synapse-api --config synapse.toml
//!   synapse-api --port 8080 --bind 0.0.0.0
//!
//! # Environment Variables
//!
//! - `SYNAPSE_BIND_ADDR` - Server bind address (default: 127.0.0.1)
//! - `OPENAI_API_KEY` / `ANTHROPIC_API_KEY` / `GOOGLE_API_KEY` - reasoning provider key
//! - `SYNAPSE_BACKEND_API_KEY` - delivery platform API token
//! - `RUST_LOG` - log filter

use anyhow::Context;
use clap::Parser;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use synapse_api::{serve, AppState};
use synapse_coordinator::SynapseConfig;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "synapse-api", version, about = "Synapse disruption-resolution API server")]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long, default_value_t = 8080)]
    port: u16,

    /// Address to bind
    #[arg(short, long, env = "SYNAPSE_BIND_ADDR", default_value = "127.0.0.1")]
    bind: IpAddr,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,synapse_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let config = match args.config {
        Some(ref path) => SynapseConfig::from_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => {
            info!("No config file given, using defaults");
            SynapseConfig::default()
        }
    };

    let state = Arc::new(AppState::new(&config).context("building orchestrator")?);
    info!(
        planner = %state.orchestrator.planner_kind(),
        specialists = state.orchestrator.registry().len(),
        "Orchestrator ready"
    );

    serve(state, SocketAddr::new(args.bind, args.port)).await
}
