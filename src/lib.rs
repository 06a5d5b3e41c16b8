//! Sarraf - precious-metals and FX quote aggregation backend
//!
//! Polls several independent upstream providers, normalizes their
//! formats into one quote schema, persists an append-only historical
//! series next to a latest-snapshot table and serves both to a client
//! route layer.

pub mod backfill;
pub mod config;
pub mod db;
pub mod error;
pub mod normalize;
pub mod providers;
pub mod refresh;
pub mod services;
pub mod state;

use config::Config;
use providers::types::Category;
use refresh::scheduler;
use state::AppState;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize and run the service until a shutdown signal arrives
pub async fn run() -> anyhow::Result<()> {
    // Initialize tracing/logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sarraf=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting sarraf...");

    let config = Config::from_env()?;
    let state = AppState::new(config)?;

    // Independent periodic triggers per category; each tick goes through
    // the staleness gate, so ticking faster than the threshold is cheap.
    scheduler::spawn_category_loop(
        state.orchestrator.clone(),
        Category::Metals,
        state.config.metals_refresh,
    );
    scheduler::spawn_category_loop(
        state.orchestrator.clone(),
        Category::Fx,
        state.config.fx_refresh,
    );

    // One-shot backfill; idempotent, so a crash mid-way is retried on the
    // next start.
    let db = state.db.clone();
    let archive_primary = state.providers.archive_primary.clone();
    let archive_secondary = state.providers.archive_secondary.clone();
    let backfill_years = state.config.backfill_years;
    tokio::spawn(async move {
        backfill::run(&db, archive_primary, archive_secondary, backfill_years).await;
    });

    tracing::info!("Sarraf started");

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received, exiting");
    Ok(())
}
