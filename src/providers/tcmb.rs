//! Central-bank FX feed adapter (TCMB)
//!
//! Daily indicative rates as an XML bulletin keyed by ISO currency code.
//! A 404 means "no bulletin for this date" (weekend/holiday), which is a
//! distinguished non-error so callers don't retry or count it as a
//! failure.

use crate::error::{AppError, Result};
use crate::normalize::cross_rate;
use crate::providers::types::NormalizedQuote;
use crate::providers::{build_client, SpotProvider};
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Europe::Istanbul;
use reqwest::Client;
use serde::Deserialize;

const SOURCE: &str = "tcmb";

/// ISO code -> internal instrument id
const CURRENCY_MAP: &[(&str, &str)] = &[
    ("USD", "USDTRY"),
    ("EUR", "EURTRY"),
    ("GBP", "GBPTRY"),
];

#[derive(Debug, Deserialize)]
struct Bulletin {
    #[serde(rename = "@Tarih")]
    tarih: Option<String>,
    #[serde(rename = "Currency", default)]
    currencies: Vec<CurrencyNode>,
}

#[derive(Debug, Deserialize)]
struct CurrencyNode {
    #[serde(rename = "@Kod")]
    kod: String,
    #[serde(rename = "Unit", default)]
    unit: Option<String>,
    #[serde(rename = "ForexBuying", default)]
    forex_buying: Option<String>,
    #[serde(rename = "ForexSelling", default)]
    forex_selling: Option<String>,
}

/// Primary FX adapter
pub struct TcmbProvider {
    client: Client,
    base_url: String,
}

impl TcmbProvider {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: build_client(),
            base_url: base_url.into(),
        }
    }

    /// Fetch the bulletin for a specific past date. Weekends and holidays
    /// yield `AppError::NoData`.
    pub async fn fetch_for_date(&self, date: NaiveDate) -> Result<Vec<NormalizedQuote>> {
        let url = format!(
            "{}/{}/{}.xml",
            self.base_url,
            date.format("%Y%m"),
            date.format("%d%m%Y")
        );
        self.fetch_document(&url).await
    }

    async fn fetch_document(&self, url: &str) -> Result<Vec<NormalizedQuote>> {
        let response = self.client.get(url).send().await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(AppError::NoData(format!("no bulletin at {}", url)));
        }
        if !response.status().is_success() {
            return Err(AppError::Provider(format!(
                "FX feed returned HTTP {}",
                response.status()
            )));
        }

        let body = response.text().await?;
        parse_bulletin(&body)
    }
}

#[async_trait]
impl SpotProvider for TcmbProvider {
    fn id(&self) -> &'static str {
        SOURCE
    }

    async fn fetch_current(&self) -> Result<Vec<NormalizedQuote>> {
        let url = format!("{}/today.xml", self.base_url);
        self.fetch_document(&url).await
    }
}

/// Parse one XML bulletin into normalized quotes plus the derived cross
/// rate. Pure; exercised directly by tests.
fn parse_bulletin(xml: &str) -> Result<Vec<NormalizedQuote>> {
    let bulletin: Bulletin = quick_xml::de::from_str(xml)?;
    let ts = bulletin_ts(bulletin.tarih.as_deref());

    let mut quotes = Vec::new();
    for (code, instrument_id) in CURRENCY_MAP {
        let Some(node) = bulletin.currencies.iter().find(|c| c.kod == *code) else {
            continue;
        };

        let unit: f64 = node
            .unit
            .as_deref()
            .and_then(|u| u.trim().parse().ok())
            .filter(|u| *u > 0.0)
            .unwrap_or(1.0);

        let buy = parse_rate(node.forex_buying.as_deref()).map(|v| v / unit);
        let sell = parse_rate(node.forex_selling.as_deref()).map(|v| v / unit);

        let price = match (buy, sell) {
            (Some(b), Some(s)) => (b + s) / 2.0,
            (Some(b), None) => b,
            (None, Some(s)) => s,
            (None, None) => {
                tracing::warn!("Currency '{}' has no usable forex fields, skipping", code);
                continue;
            }
        };

        quotes.push(NormalizedQuote {
            instrument_id: instrument_id.to_string(),
            ts,
            price,
            buy,
            sell,
            source: SOURCE.to_string(),
            raw: None,
        });
    }

    // EURUSD from the two lira legs, buy/sell by bid/ask inversion
    let eur = quotes.iter().find(|q| q.instrument_id == "EURTRY").cloned();
    let usd = quotes.iter().find(|q| q.instrument_id == "USDTRY").cloned();
    if let (Some(eur), Some(usd)) = (eur, usd) {
        if let Some(cross) = cross_rate(&eur, &usd, "EURUSD") {
            quotes.push(cross);
        }
    }

    Ok(quotes)
}

/// Bulletin rates are dot-decimal; empty elements mean "not quoted".
fn parse_rate(raw: Option<&str>) -> Option<f64> {
    raw.map(str::trim)
        .filter(|v| !v.is_empty())
        .and_then(|v| v.parse().ok())
}

/// Bulletins are stamped at the publication time of the daily list
/// (provider-local afternoon); fall back to now when the date attribute
/// is missing or malformed.
fn bulletin_ts(tarih: Option<&str>) -> i64 {
    let publication = NaiveTime::from_hms_opt(15, 30, 0).unwrap_or_default();
    tarih
        .and_then(|t| NaiveDate::parse_from_str(t, "%d.%m.%Y").ok())
        .and_then(|d| Istanbul.from_local_datetime(&d.and_time(publication)).earliest())
        .map(|dt| dt.timestamp())
        .unwrap_or_else(|| Utc::now().timestamp())
}
