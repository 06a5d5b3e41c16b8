//! Refresh orchestration
//!
//! Sequences adapter calls per category, gates attempts behind a
//! cooldown, picks the fallback chain on primary failure, persists the
//! winning batch and keeps the fetch ledger honest. Adapter failures are
//! converted into category-level outcomes here; nothing from a provider
//! is allowed to take down the scheduler.

pub mod scheduler;

use crate::db::models::FetchStatus;
use crate::db::Db;
use crate::error::{AppError, Result};
use crate::providers::types::{Category, NormalizedQuote};
use crate::providers::{Providers, SpotProvider};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

/// Outcome of one refresh trigger
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Quotes fetched and persisted
    Refreshed { persisted: usize },
    /// Category-level failure, recorded in the fetch ledger
    Failed { message: String },
    /// Second trigger inside the cooldown window; skipped, not queued
    SkippedCooldown,
    /// Data still fresh; `refresh_if_stale` did nothing
    SkippedFresh,
}

/// Per-category refresh state machine
pub struct RefreshOrchestrator {
    db: Arc<Db>,
    metals: Arc<dyn SpotProvider>,
    fx_primary: Arc<dyn SpotProvider>,
    fx_fallback: Arc<dyn SpotProvider>,
    cooldown: Duration,
    staleness: Duration,
}

impl RefreshOrchestrator {
    pub fn new(
        db: Arc<Db>,
        providers: &Providers,
        cooldown: Duration,
        staleness: Duration,
    ) -> Self {
        Self {
            db,
            metals: providers.metals.clone(),
            fx_primary: providers.fx_primary.clone(),
            fx_fallback: providers.fx_fallback.clone(),
            cooldown,
            staleness,
        }
    }

    /// Entry guard: true when no prior attempt exists or the cooldown has
    /// elapsed since the last one.
    ///
    /// This is a read+check, not an atomic claim - enough for the
    /// single-instance deployment this system assumes. A multi-instance
    /// deployment would need a conditional-update claim here.
    pub fn can_refresh(&self, category: Category) -> Result<bool> {
        let state = self.db.get_fetch_state(category)?;
        let now = Utc::now().timestamp();

        Ok(match state.and_then(|s| s.last_attempt_ts) {
            None => true,
            Some(last_attempt) => now - last_attempt >= self.cooldown.as_secs() as i64,
        })
    }

    /// Run one refresh attempt for a category, honoring the cooldown.
    pub async fn refresh(&self, category: Category) -> Result<RefreshOutcome> {
        if !self.can_refresh(category)? {
            tracing::debug!("Refresh of '{}' skipped, cooldown active", category);
            return Ok(RefreshOutcome::SkippedCooldown);
        }

        let fetched = match category {
            Category::Metals => self.fetch_metals().await,
            Category::Fx => self.fetch_fx().await,
        };

        let now = Utc::now().timestamp();
        match fetched {
            Ok(quotes) => match self.persist(&quotes, now) {
                Ok(persisted) => {
                    self.db
                        .record_fetch_attempt(category, FetchStatus::Success, None, now)?;
                    tracing::info!("Refreshed '{}': {} quotes persisted", category, persisted);
                    Ok(RefreshOutcome::Refreshed { persisted })
                }
                Err(e) => {
                    let message = e.to_string();
                    self.db.record_fetch_attempt(
                        category,
                        FetchStatus::Error,
                        Some(&message),
                        now,
                    )?;
                    tracing::error!("Persisting '{}' quotes failed: {}", category, message);
                    Ok(RefreshOutcome::Failed { message })
                }
            },
            Err(e) => {
                let message = e.to_string();
                self.db
                    .record_fetch_attempt(category, FetchStatus::Error, Some(&message), now)?;
                tracing::warn!("Refresh of '{}' failed: {}", category, message);
                Ok(RefreshOutcome::Failed { message })
            }
        }
    }

    /// Scheduler entry point: refresh only when the last success is older
    /// than the staleness threshold.
    pub async fn refresh_if_stale(&self, category: Category) -> Result<RefreshOutcome> {
        let state = self.db.get_fetch_state(category)?;
        let now = Utc::now().timestamp();

        let stale = match state.and_then(|s| s.last_success_ts) {
            None => true,
            Some(last_success) => now - last_success >= self.staleness.as_secs() as i64,
        };

        if !stale {
            return Ok(RefreshOutcome::SkippedFresh);
        }
        self.refresh(category).await
    }

    /// Metals path: primary feed only; an empty batch is a failure.
    async fn fetch_metals(&self) -> Result<Vec<NormalizedQuote>> {
        let quotes = self.metals.fetch_current().await?;
        if quotes.is_empty() {
            return Err(AppError::Provider(format!(
                "metals feed '{}' returned no quotes",
                self.metals.id()
            )));
        }
        Ok(quotes)
    }

    /// FX path: primary feed, falling back to the rate-table adapter when
    /// the primary errors or comes back empty. The used path is logged
    /// for observability; nothing downstream branches on it.
    async fn fetch_fx(&self) -> Result<Vec<NormalizedQuote>> {
        let primary_error = match self.fx_primary.fetch_current().await {
            Ok(quotes) if !quotes.is_empty() => {
                tracing::debug!("FX refresh served by primary '{}'", self.fx_primary.id());
                return Ok(quotes);
            }
            Ok(_) => format!("primary '{}' returned no quotes", self.fx_primary.id()),
            Err(e) => format!("primary '{}' failed: {}", self.fx_primary.id(), e),
        };

        tracing::warn!(
            "{}; falling back to '{}'",
            primary_error,
            self.fx_fallback.id()
        );

        match self.fx_fallback.fetch_current().await {
            Ok(quotes) if !quotes.is_empty() => {
                tracing::info!("FX refresh served by fallback '{}'", self.fx_fallback.id());
                Ok(quotes)
            }
            Ok(_) => Err(AppError::Provider(format!(
                "{}; fallback '{}' returned no quotes",
                primary_error,
                self.fx_fallback.id()
            ))),
            Err(e) => Err(AppError::Provider(format!(
                "{}; fallback '{}' failed: {}",
                primary_error,
                self.fx_fallback.id(),
                e
            ))),
        }
    }

    /// Historical append plus snapshot upsert. Only live-refresh data
    /// comes through here, so snapshot last-write-wins stays safe.
    fn persist(&self, quotes: &[NormalizedQuote], now: i64) -> Result<usize> {
        let persisted = self.db.append_history(quotes)?;
        self.db.upsert_latest(quotes, now)?;
        Ok(persisted)
    }
}
