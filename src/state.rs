//! Application state management

use crate::config::Config;
use crate::db::Db;
use crate::error::Result;
use crate::providers::bigpara::BigparaArchive;
use crate::providers::exchangerate::ExchangeRateProvider;
use crate::providers::harem::HaremProvider;
use crate::providers::investing::InvestingArchive;
use crate::providers::tcmb::TcmbProvider;
use crate::providers::{ArchiveProvider, Providers};
use crate::refresh::RefreshOrchestrator;
use crate::services::LatestCache;
use std::sync::Arc;

/// Application state shared across the scheduler, backfill and read path
pub struct AppState {
    /// Resolved operator configuration
    pub config: Config,

    /// SQLite database
    pub db: Arc<Db>,

    /// Provider set, bundled by role
    pub providers: Providers,

    /// Per-category refresh state machine
    pub orchestrator: Arc<RefreshOrchestrator>,

    /// Read-path latest cache
    pub latest_cache: LatestCache,
}

impl AppState {
    /// Create new application state: open the database, run migrations
    /// and wire the provider set.
    pub fn new(config: Config) -> Result<Self> {
        if let Some(parent) = config.db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        tracing::info!("Database file: {:?}", config.db_path);
        let db = Arc::new(Db::new(&config.db_path)?);
        Self::with_db(config, db)
    }

    /// Wire state over an already-open database (used by tests)
    pub fn with_db(config: Config, db: Arc<Db>) -> Result<Self> {
        let archive_primary: Option<Arc<dyn ArchiveProvider>> =
            config.archive_cookie.as_ref().map(|cookie| {
                Arc::new(InvestingArchive::new(
                    config.investing_url.as_str(),
                    cookie.as_str(),
                    config.archive_use_curl,
                )) as Arc<dyn ArchiveProvider>
            });
        if archive_primary.is_none() {
            tracing::warn!("No archive session cookie configured, protected archive disabled");
        }

        let providers = Providers {
            metals: Arc::new(HaremProvider::new(config.harem_url.as_str())),
            fx_primary: Arc::new(TcmbProvider::new(config.tcmb_url.as_str())),
            fx_fallback: Arc::new(ExchangeRateProvider::new(config.rates_url.as_str())),
            archive_primary,
            archive_secondary: Arc::new(BigparaArchive::new(config.bigpara_url.as_str())),
        };

        let orchestrator = Arc::new(RefreshOrchestrator::new(
            db.clone(),
            &providers,
            config.cooldown,
            config.staleness,
        ));

        let latest_cache = LatestCache::new(config.latest_cache_ttl);

        Ok(Self {
            config,
            db,
            providers,
            orchestrator,
            latest_cache,
        })
    }
}
