//! Historical backfill controller
//!
//! One-shot, idempotent bulk population of the historical series from
//! the archive adapters. Instruments whose stored history already covers
//! the lookback target are skipped, per-instrument failures never abort
//! the rest of the set, and the snapshot table is never touched here
//! (backfill writes old data; snapshot last-write-wins follows call
//! order).

use crate::db::Db;
use crate::providers::ArchiveProvider;
use chrono::{Duration as ChronoDuration, Utc};
use std::sync::Arc;

/// One configured (archive-code, instrument) pair
struct BackfillTarget {
    instrument_id: &'static str,
    /// Code on the protected archive, when it lists the instrument
    primary_code: Option<&'static str>,
    /// Code on the secondary archive, when it lists the instrument
    secondary_code: Option<&'static str>,
}

/// Archive codes per instrument. Derived instruments (ayar14, EURUSD)
/// have no archive series of their own and are absent here.
const TARGETS: &[BackfillTarget] = &[
    BackfillTarget {
        instrument_id: "gram",
        primary_code: Some("68"),
        secondary_code: Some("gram-altin"),
    },
    BackfillTarget {
        instrument_id: "ons",
        primary_code: Some("8830"),
        secondary_code: Some("ons-altin"),
    },
    BackfillTarget {
        instrument_id: "ceyrek",
        primary_code: None,
        secondary_code: Some("ceyrek-altin"),
    },
    BackfillTarget {
        instrument_id: "USDTRY",
        primary_code: Some("2111"),
        secondary_code: None,
    },
    BackfillTarget {
        instrument_id: "EURTRY",
        primary_code: Some("2112"),
        secondary_code: None,
    },
    BackfillTarget {
        instrument_id: "GBPTRY",
        primary_code: Some("2113"),
        secondary_code: None,
    },
];

/// Completion tally, logged once per run
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BackfillSummary {
    pub skipped: usize,
    pub filled: usize,
    pub failed: usize,
}

/// Run the backfill over every configured instrument.
///
/// `primary` is absent when no archive session cookie is configured; the
/// secondary archive then carries whatever it can.
pub async fn run(
    db: &Db,
    primary: Option<Arc<dyn ArchiveProvider>>,
    secondary: Arc<dyn ArchiveProvider>,
    target_years: i64,
) -> BackfillSummary {
    let now = Utc::now();
    let now_ts = now.timestamp();
    let end = now.date_naive();
    let start = end - ChronoDuration::days(target_years * 365);

    let mut summary = BackfillSummary::default();

    for target in TARGETS {
        let sufficient = match db.has_sufficient_history(target.instrument_id, target_years, now_ts)
        {
            Ok(sufficient) => sufficient,
            Err(e) => {
                tracing::warn!(
                    "Backfill check for '{}' failed: {}",
                    target.instrument_id,
                    e
                );
                summary.failed += 1;
                continue;
            }
        };
        if sufficient {
            tracing::debug!(
                "Backfill for '{}' skipped, history already covers {} years",
                target.instrument_id,
                target_years
            );
            summary.skipped += 1;
            continue;
        }

        // Prefer the protected archive, fall back to the secondary when
        // the primary is unavailable or fails for this instrument.
        let mut attempt = None;
        if let (Some(archive), Some(code)) = (primary.as_ref(), target.primary_code) {
            attempt = Some(
                archive
                    .fetch_history(target.instrument_id, code, start, end)
                    .await,
            );
        }

        let needs_secondary = !matches!(attempt, Some(Ok(ref quotes)) if !quotes.is_empty());
        if needs_secondary {
            if let Some(code) = target.secondary_code {
                if let Some(Err(ref e)) = attempt {
                    tracing::warn!(
                        "Primary archive failed for '{}' ({}), trying secondary",
                        target.instrument_id,
                        e
                    );
                }
                attempt = Some(
                    secondary
                        .fetch_history(target.instrument_id, code, start, end)
                        .await,
                );
            }
        }

        match attempt {
            Some(Ok(quotes)) if !quotes.is_empty() => match db.append_history(&quotes) {
                Ok(inserted) => {
                    tracing::info!(
                        "Backfilled '{}': {} historical rows",
                        target.instrument_id,
                        inserted
                    );
                    summary.filled += 1;
                }
                Err(e) => {
                    tracing::warn!(
                        "Backfill insert for '{}' failed: {}",
                        target.instrument_id,
                        e
                    );
                    summary.failed += 1;
                }
            },
            Some(Ok(_)) => {
                tracing::info!(
                    "Archives returned no rows for '{}', nothing to backfill",
                    target.instrument_id
                );
                summary.skipped += 1;
            }
            Some(Err(e)) if e.is_no_data() => {
                // Distinguished empty-result condition, not a failure
                tracing::info!("No archive data for '{}': {}", target.instrument_id, e);
                summary.skipped += 1;
            }
            Some(Err(e)) => {
                tracing::warn!("Backfill for '{}' failed: {}", target.instrument_id, e);
                summary.failed += 1;
            }
            None => {
                tracing::debug!(
                    "No archive configured for '{}', skipping",
                    target.instrument_id
                );
                summary.skipped += 1;
            }
        }
    }

    tracing::info!(
        "Backfill complete: {} filled, {} skipped, {} failed",
        summary.filled,
        summary.skipped,
        summary.failed
    );
    summary
}
