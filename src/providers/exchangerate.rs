//! FX fallback adapter
//!
//! A generic multi-currency rate table quoted against a reference
//! currency (USD). Lira pairs are re-derived algebraically from the
//! table, so no buy/sell spread exists: every quote from this adapter
//! carries `buy = sell = None`.

use crate::error::{AppError, Result};
use crate::providers::types::NormalizedQuote;
use crate::providers::{build_client, SpotProvider};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;

const SOURCE: &str = "exchangerate";

/// Reference currency the upstream table is keyed against
const BASE_CURRENCY: &str = "USD";

#[derive(Debug, Deserialize)]
struct RatesResponse {
    #[serde(default)]
    base_code: Option<String>,
    rates: HashMap<String, f64>,
}

/// FX fallback adapter, used only when the primary FX feed fails
pub struct ExchangeRateProvider {
    client: Client,
    base_url: String,
}

impl ExchangeRateProvider {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: build_client(),
            base_url: base_url.into(),
        }
    }

    fn derive_pairs(&self, response: RatesResponse, ts: i64) -> Result<Vec<NormalizedQuote>> {
        if let Some(base) = response.base_code.as_deref() {
            if base != BASE_CURRENCY {
                return Err(AppError::Provider(format!(
                    "rate table keyed against '{}', expected '{}'",
                    base, BASE_CURRENCY
                )));
            }
        }

        let rate = |code: &str| -> Option<f64> {
            response.rates.get(code).copied().filter(|r| *r > 0.0)
        };

        let try_rate = rate("TRY");
        let eur = rate("EUR");
        let gbp = rate("GBP");

        let mut quotes = Vec::new();
        // reference/target ratio composition: X-TRY = (USD-TRY) / (USD-X)
        match try_rate {
            Some(try_rate) => {
                quotes.push(NormalizedQuote::price_only("USDTRY", ts, try_rate, SOURCE));
                match eur {
                    Some(eur) => {
                        quotes.push(NormalizedQuote::price_only(
                            "EURTRY",
                            ts,
                            try_rate / eur,
                            SOURCE,
                        ));
                        quotes.push(NormalizedQuote::price_only("EURUSD", ts, 1.0 / eur, SOURCE));
                    }
                    None => tracing::warn!("Rate table missing EUR, dropping EURTRY/EURUSD"),
                }
                match gbp {
                    Some(gbp) => quotes.push(NormalizedQuote::price_only(
                        "GBPTRY",
                        ts,
                        try_rate / gbp,
                        SOURCE,
                    )),
                    None => tracing::warn!("Rate table missing GBP, dropping GBPTRY"),
                }
            }
            None => {
                return Err(AppError::Provider(
                    "rate table missing the TRY rate".to_string(),
                ))
            }
        }

        Ok(quotes)
    }
}

#[async_trait]
impl SpotProvider for ExchangeRateProvider {
    fn id(&self) -> &'static str {
        SOURCE
    }

    async fn fetch_current(&self) -> Result<Vec<NormalizedQuote>> {
        let url = format!("{}/{}", self.base_url, BASE_CURRENCY);
        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(AppError::Provider(format!(
                "Rate table returned HTTP {}",
                response.status()
            )));
        }

        let body: RatesResponse = response.json().await?;
        let ts = Utc::now().timestamp();
        self.derive_pairs(body, ts)
    }
}
