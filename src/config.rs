//! Operator configuration
//!
//! All knobs come from the environment (a `.env` file is honored in
//! development). Defaults are tuned for a single-instance deployment
//! polling free upstream feeds; the archive session cookie is the only
//! secret and is injected here, never read ambiently by business logic.

use crate::error::{AppError, Result};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_METALS_REFRESH_SECS: u64 = 60;
pub const DEFAULT_FX_REFRESH_SECS: u64 = 300;
pub const DEFAULT_COOLDOWN_SECS: u64 = 10;
pub const DEFAULT_STALENESS_SECS: u64 = 900;
pub const DEFAULT_LATEST_CACHE_SECS: u64 = 30;
pub const DEFAULT_BACKFILL_YEARS: i64 = 5;

/// Runtime configuration, resolved once at startup
#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite database file
    pub db_path: PathBuf,

    /// Scheduler tick period per category
    pub metals_refresh: Duration,
    pub fx_refresh: Duration,

    /// Minimum elapsed time between refresh attempts for one category
    pub cooldown: Duration,

    /// Elapsed time since last success after which a tick actually refreshes
    pub staleness: Duration,

    /// TTL of the read-path latest-snapshot cache
    pub latest_cache_ttl: Duration,

    /// Lookback target for the historical backfill
    pub backfill_years: i64,

    /// Operator-supplied session cookie for the protected archive.
    /// Rotated out-of-band; absent means the archive adapter is disabled.
    pub archive_cookie: Option<String>,

    /// Use the curl subprocess backend for the protected archive instead
    /// of the shared reqwest client
    pub archive_use_curl: bool,

    /// Provider base URLs, overridable for tests
    pub harem_url: String,
    pub tcmb_url: String,
    pub rates_url: String,
    pub investing_url: String,
    pub bigpara_url: String,
}

impl Config {
    /// Load configuration from the environment.
    pub fn from_env() -> Result<Self> {
        // Missing .env is fine; real deployments use actual env vars.
        let _ = dotenvy::dotenv();

        let config = Self {
            db_path: PathBuf::from(env_or("SARRAF_DB_PATH", "sarraf.db")),
            metals_refresh: Duration::from_secs(env_secs(
                "SARRAF_METALS_REFRESH_SECS",
                DEFAULT_METALS_REFRESH_SECS,
            )?),
            fx_refresh: Duration::from_secs(env_secs(
                "SARRAF_FX_REFRESH_SECS",
                DEFAULT_FX_REFRESH_SECS,
            )?),
            cooldown: Duration::from_secs(env_secs(
                "SARRAF_COOLDOWN_SECS",
                DEFAULT_COOLDOWN_SECS,
            )?),
            staleness: Duration::from_secs(env_secs(
                "SARRAF_STALENESS_SECS",
                DEFAULT_STALENESS_SECS,
            )?),
            latest_cache_ttl: Duration::from_secs(env_secs(
                "SARRAF_LATEST_CACHE_SECS",
                DEFAULT_LATEST_CACHE_SECS,
            )?),
            backfill_years: env_parse("SARRAF_BACKFILL_YEARS", DEFAULT_BACKFILL_YEARS)?,
            archive_cookie: std::env::var("SARRAF_ARCHIVE_COOKIE")
                .ok()
                .filter(|v| !v.is_empty()),
            archive_use_curl: env_or("SARRAF_ARCHIVE_USE_CURL", "false") == "true",
            harem_url: env_or("SARRAF_HAREM_URL", "https://canlipiyasalar.haremaltin.com"),
            tcmb_url: env_or("SARRAF_TCMB_URL", "https://www.tcmb.gov.tr/kurlar"),
            rates_url: env_or("SARRAF_RATES_URL", "https://open.er-api.com/v6/latest"),
            investing_url: env_or("SARRAF_INVESTING_URL", "https://www.investing.com"),
            bigpara_url: env_or("SARRAF_BIGPARA_URL", "https://bigpara.hurriyet.com.tr"),
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.cooldown.is_zero() {
            return Err(AppError::Config(
                "SARRAF_COOLDOWN_SECS must be at least 1".to_string(),
            ));
        }
        if self.staleness < self.cooldown {
            return Err(AppError::Config(format!(
                "staleness threshold ({}s) must not be below the cooldown ({}s)",
                self.staleness.as_secs(),
                self.cooldown.as_secs()
            )));
        }
        if self.backfill_years < 1 {
            return Err(AppError::Config(
                "SARRAF_BACKFILL_YEARS must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_secs(key: &str, default: u64) -> Result<u64> {
    match std::env::var(key) {
        Ok(raw) => raw
            .parse::<u64>()
            .map_err(|_| AppError::Config(format!("{} must be an integer, got '{}'", key, raw))),
        Err(_) => Ok(default),
    }
}

fn env_parse(key: &str, default: i64) -> Result<i64> {
    match std::env::var(key) {
        Ok(raw) => raw
            .parse::<i64>()
            .map_err(|_| AppError::Config(format!("{} must be an integer, got '{}'", key, raw))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Env mutation is process-global, so everything lives in one test.
    #[test]
    fn from_env_defaults_and_overrides() {
        let config = Config::from_env().unwrap();
        assert_eq!(config.cooldown, Duration::from_secs(DEFAULT_COOLDOWN_SECS));
        assert_eq!(
            config.staleness,
            Duration::from_secs(DEFAULT_STALENESS_SECS)
        );
        assert_eq!(config.backfill_years, DEFAULT_BACKFILL_YEARS);
        assert!(config.archive_cookie.is_none());
        assert!(!config.archive_use_curl);

        std::env::set_var("SARRAF_COOLDOWN_SECS", "3");
        std::env::set_var("SARRAF_ARCHIVE_COOKIE", "session=abc123");
        let config = Config::from_env().unwrap();
        assert_eq!(config.cooldown, Duration::from_secs(3));
        assert_eq!(config.archive_cookie.as_deref(), Some("session=abc123"));

        std::env::set_var("SARRAF_COOLDOWN_SECS", "not-a-number");
        assert!(Config::from_env().is_err());

        std::env::remove_var("SARRAF_COOLDOWN_SECS");
        std::env::remove_var("SARRAF_ARCHIVE_COOKIE");
    }
}
