//! Medtrace - Medical Device Custody Ledger Service
//!
//! Entry point: load config, init logging, connect PostgreSQL, ensure the
//! schema, then serve the custody API.

use std::sync::Arc;

use chrono::Duration;

use medtrace::config::AppConfig;
use medtrace::db::{schema, Database};
use medtrace::engine::TransitionEngine;
use medtrace::gateway::{run_gateway, state::AppState};
use medtrace::sequence::PgBatchSequencer;

fn get_env() -> String {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if (args[i] == "--env" || args[i] == "-e") && i + 1 < args.len() {
            return args[i + 1].clone();
        }
    }
    "dev".to_string()
}

/// Get port override from command line (--port argument)
fn get_port_override() -> Option<u16> {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if args[i] == "--port" && i + 1 < args.len() {
            return args[i + 1].parse().ok();
        }
    }
    None
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env = get_env();
    let mut config = AppConfig::load(&env);
    if let Some(port) = get_port_override() {
        config.gateway.port = port;
    }

    let _log_guard = medtrace::logging::init_logging(&config);
    tracing::info!("Starting medtrace custody ledger in {} mode", env);

    let db = Arc::new(Database::connect(&config.postgres_url).await?);
    schema::init_schema(db.pool()).await?;

    let sequencer = Arc::new(PgBatchSequencer::new(db.pool().clone()));
    let engine = Arc::new(TransitionEngine::new(
        db.clone(),
        sequencer,
        Duration::hours(config.recall.window_hours),
    ));

    let state = Arc::new(AppState::new(db, engine));
    run_gateway(&config, state).await
}
