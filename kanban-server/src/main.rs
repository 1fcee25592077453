//! Kanban mock API server.
//!
//! An axum HTTP server exposing task CRUD under `/api/tasks`, with
//! configurable random 500s so clients can exercise their rollback paths.
//!
//! # Usage
//!
//! ```bash
//! # Run on default address 127.0.0.1:3001, tasks in memory
//! cargo run --bin kanban-server
//!
//! # Persist to a file and never fail
//! cargo run --bin kanban-server -- --data-file db.json \
//!     --read-failure-rate 0 --write-failure-rate 0
//!
//! # Or via environment variable
//! KANBAN_SERVER_ADDR=0.0.0.0:8080 cargo run --bin kanban-server
//! ```

use std::sync::Arc;

use clap::Parser;
use kanban_server::api::{self, AppState, FailureRates};
use kanban_server::config::{ServerCliArgs, ServerConfig};
use kanban_server::store::TaskTable;

#[tokio::main]
async fn main() {
    let cli = ServerCliArgs::parse();

    // Load config from CLI args + config file + env vars + defaults.
    let config = match ServerConfig::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            std::process::exit(1);
        }
    };

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    tracing::info!(
        addr = %config.bind_addr,
        read_failure_rate = config.read_failure_rate,
        write_failure_rate = config.write_failure_rate,
        "starting kanban server"
    );

    let table = match config.data_file.clone() {
        Some(path) => TaskTable::open(path).await,
        None => TaskTable::default(),
    };
    let rates = FailureRates {
        read: config.read_failure_rate,
        write: config.write_failure_rate,
    };
    let state = Arc::new(AppState::new(table, rates));

    match api::start_server_with_state(&config.bind_addr, state).await {
        Ok((bound_addr, handle)) => {
            tracing::info!(addr = %bound_addr, "endpoints available at /api/tasks");
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "server task failed");
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to start server");
            std::process::exit(1);
        }
    }
}
