//! Harem metals feed adapter
//!
//! Live bullion quotes as a JSON map of provider keys to buy/sell strings
//! in Turkish decimal format ("2.550,00"), occasionally with a currency
//! symbol glued on. Keys missing from the lookup table are ignored so
//! upstream additions don't break the batch.

use crate::error::{AppError, Result};
use crate::normalize::{parse_localized_price, ratio_quote, KARAT_14_RATIO, TROY_OUNCE_GRAMS};
use crate::providers::types::NormalizedQuote;
use crate::providers::{build_client, SpotProvider};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;

const SOURCE: &str = "harem";

/// Provider key -> internal instrument id. One table per adapter keeps
/// provider renames isolated here.
const KEY_MAP: &[(&str, &str)] = &[
    ("ALTIN", "gram"),
    ("CEYREK_YENI", "ceyrek"),
    ("ONS", "ons"),
];

#[derive(Debug, Deserialize)]
struct FeedResponse {
    data: HashMap<String, FeedRow>,
}

#[derive(Debug, Deserialize)]
struct FeedRow {
    alis: String,
    satis: String,
}

/// Primary metals adapter
pub struct HaremProvider {
    client: Client,
    base_url: String,
}

impl HaremProvider {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: build_client(),
            base_url: base_url.into(),
        }
    }

    fn parse_rows(&self, response: FeedResponse, ts: i64) -> Vec<NormalizedQuote> {
        let mut quotes = Vec::new();

        for (provider_key, instrument_id) in KEY_MAP {
            let Some(row) = response.data.get(*provider_key) else {
                continue;
            };

            let buy = parse_localized_price(&row.alis);
            let sell = parse_localized_price(&row.satis);
            match (buy, sell) {
                (Ok(buy), Ok(sell)) => {
                    let mut quote =
                        NormalizedQuote::with_sides(*instrument_id, ts, buy, sell, SOURCE);
                    quote.raw = Some(format!(
                        "{{\"alis\":\"{}\",\"satis\":\"{}\"}}",
                        row.alis, row.satis
                    ));
                    quotes.push(quote);
                }
                _ => {
                    tracing::warn!(
                        "Dropping metals key '{}' ({}): unparseable buy '{}' / sell '{}'",
                        provider_key,
                        instrument_id,
                        row.alis,
                        row.satis
                    );
                }
            }
        }

        // Derived instruments: karat variant always; ounce only when the
        // feed row was missing or dropped (measured data stays ahead of
        // computed, and the derived ounce keeps the base's currency).
        if let Some(gram) = quotes.iter().find(|q| q.instrument_id == "gram").cloned() {
            quotes.push(ratio_quote(&gram, "ayar14", KARAT_14_RATIO));
            if !quotes.iter().any(|q| q.instrument_id == "ons") {
                quotes.push(ratio_quote(&gram, "ons", TROY_OUNCE_GRAMS));
            }
        }

        quotes
    }
}

#[async_trait]
impl SpotProvider for HaremProvider {
    fn id(&self) -> &'static str {
        SOURCE
    }

    async fn fetch_current(&self) -> Result<Vec<NormalizedQuote>> {
        let url = format!("{}/ajax/all", self.base_url);
        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(AppError::Provider(format!(
                "Metals feed returned HTTP {}",
                response.status()
            )));
        }

        let body: FeedResponse = response.json().await?;
        let ts = Utc::now().timestamp();
        Ok(self.parse_rows(body, ts))
    }
}
