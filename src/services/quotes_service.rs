//! Quotes Service
//!
//! Serves the latest-snapshot rows per category behind a small TTL
//! cache. The cache is an explicit value object owned by `AppState` (not
//! process-wide state) so tests can construct isolated instances.

use crate::db::models::LatestSnapshot;
use crate::db::Db;
use crate::error::Result;
use crate::providers::types::Category;
use dashmap::DashMap;
use serde::Serialize;
use std::time::{Duration, Instant};

/// Result of a latest-quotes read
#[derive(Debug, Clone, Serialize)]
pub struct LatestResult {
    pub items: Vec<LatestSnapshot>,
    /// Most recent quote timestamp across the category, None before the
    /// first successful refresh
    pub last_updated_ts: Option<i64>,
}

struct CachedLatest {
    result: LatestResult,
    fetched_at: Instant,
}

/// Per-category TTL cache for the latest read path
pub struct LatestCache {
    ttl: Duration,
    entries: DashMap<Category, CachedLatest>,
}

impl LatestCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: DashMap::new(),
        }
    }

    fn get(&self, category: Category) -> Option<LatestResult> {
        self.entries
            .get(&category)
            .filter(|entry| entry.fetched_at.elapsed() < self.ttl)
            .map(|entry| entry.result.clone())
    }

    fn put(&self, category: Category, result: LatestResult) {
        self.entries.insert(
            category,
            CachedLatest {
                result,
                fetched_at: Instant::now(),
            },
        );
    }

    /// Drop a category's entry so the next read goes to the store
    pub fn invalidate(&self, category: Category) {
        self.entries.remove(&category);
    }
}

/// Quotes service for business logic
pub struct QuotesService;

impl QuotesService {
    /// Latest snapshot per instrument in a category.
    ///
    /// An absent snapshot (no successful refresh yet) yields an empty
    /// item list, not an error.
    pub fn get_latest(db: &Db, cache: &LatestCache, category: Category) -> Result<LatestResult> {
        if let Some(cached) = cache.get(category) {
            tracing::debug!("Latest '{}' served from cache", category);
            return Ok(cached);
        }

        let items = db.get_latest_for_category(category)?;
        let last_updated_ts = items.iter().map(|s| s.ts).max();

        let result = LatestResult {
            items,
            last_updated_ts,
        };
        cache.put(category, result.clone());
        Ok(result)
    }

    /// Latest snapshot for one instrument, bypassing the category cache
    pub fn get_latest_instrument(db: &Db, instrument_id: &str) -> Result<Option<LatestSnapshot>> {
        db.get_latest(instrument_id)
    }
}
