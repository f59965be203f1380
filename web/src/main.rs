//! Contrast game API server.
//!
//! Serves session CRUD plus move, AI-move, board-text and board-array
//! endpoints over HTTP/JSON. Sessions live in memory; an optional weight
//! file backs the ntuple and mcts AI assignments.

use anyhow::{Context, Result};
use axum::routing::{get, post};
use axum::Router;
use clap::Parser;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod handlers;
mod session;
mod types;

use contrast_ai::NTupleNetwork;
use session::GameSession;

#[derive(Parser, Debug)]
#[command(name = "contrast-web")]
#[command(about = "Contrast HTTP/JSON game API", long_about = None)]
struct Config {
    /// Listen address
    #[arg(long, default_value = "127.0.0.1:8080")]
    addr: String,

    /// Weight file for the ntuple and mcts AI assignments (omit for an
    /// untrained network)
    #[arg(long)]
    weights: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

pub struct AppState {
    pub sessions: Mutex<HashMap<String, GameSession>>,
    pub network: Arc<NTupleNetwork>,
}

fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/game/new", post(handlers::new_game))
        .route("/api/game/:id", get(handlers::get_state))
        .route("/api/game/:id/moves", get(handlers::legal_moves))
        .route("/api/game/:id/move", post(handlers::play_move))
        .route("/api/game/:id/ai_move", post(handlers::ai_move))
        .route("/api/game/:id/reset", post(handlers::reset))
        .route("/api/game/:id/board_text", get(handlers::board_text))
        .route("/api/game/:id/board_array", get(handlers::board_array))
        .with_state(state)
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut network = NTupleNetwork::new();
    match &config.weights {
        Some(path) => {
            network
                .load(path)
                .with_context(|| format!("loading weights from {}", path.display()))?;
            info!(path = %path.display(), weights = network.num_weights(), "network loaded");
        }
        None => info!("no weight file given, AI assignments use an untrained network"),
    }

    let state = Arc::new(AppState {
        sessions: Mutex::new(HashMap::new()),
        network: Arc::new(network),
    });

    let listener = tokio::net::TcpListener::bind(&config.addr)
        .await
        .with_context(|| format!("binding {}", config.addr))?;
    info!(addr = %config.addr, "listening");

    axum::serve(listener, build_router(state))
        .await
        .context("server error")?;
    Ok(())
}
