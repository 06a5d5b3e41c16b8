//! Periodic refresh scheduling
//!
//! One independent timer per category; each tick goes through
//! `refresh_if_stale`, which decouples "scheduled tick" from "actually
//! refreshed". Loop errors are logged and swallowed so a misbehaving
//! provider can never kill the process.

use crate::providers::types::Category;
use crate::refresh::RefreshOrchestrator;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Spawn the periodic refresh loop for one category
pub fn spawn_category_loop(
    orchestrator: Arc<RefreshOrchestrator>,
    category: Category,
    period: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        tracing::info!(
            "Refresh loop for '{}' started, tick every {}s",
            category,
            period.as_secs()
        );

        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            match orchestrator.refresh_if_stale(category).await {
                Ok(outcome) => {
                    tracing::debug!("Tick for '{}': {:?}", category, outcome);
                }
                Err(e) => {
                    tracing::error!("Refresh loop for '{}' hit an error: {}", category, e);
                }
            }
        }
    })
}
