//! Common provider types

use serde::{Deserialize, Serialize};

/// Refresh category, one fetch-state row per variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Metals,
    Fx,
}

impl Category {
    /// Stable key used as the fetch-state primary key
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Metals => "metals",
            Category::Fx => "fx",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "metals" => Some(Category::Metals),
            "fx" => Some(Category::Fx),
            _ => None,
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One normalized price observation, produced by an adapter and consumed
/// immediately by the orchestrator or backfill controller.
///
/// `price` is always present; `buy`/`sell` are independently optional
/// (some sources publish only one side, the fallback FX feed publishes
/// neither).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedQuote {
    pub instrument_id: String,
    /// Unix timestamp, seconds
    pub ts: i64,
    pub price: f64,
    pub buy: Option<f64>,
    pub sell: Option<f64>,
    /// Adapter tag, e.g. "harem" or "tcmb_calculated" for derived rows
    pub source: String,
    /// Opaque raw-payload capture for audit
    pub raw: Option<String>,
}

impl NormalizedQuote {
    /// Mid-price quote with both sides present.
    pub fn with_sides(
        instrument_id: impl Into<String>,
        ts: i64,
        buy: f64,
        sell: f64,
        source: impl Into<String>,
    ) -> Self {
        Self {
            instrument_id: instrument_id.into(),
            ts,
            price: (buy + sell) / 2.0,
            buy: Some(buy),
            sell: Some(sell),
            source: source.into(),
            raw: None,
        }
    }

    /// Price-only quote (no spread information).
    pub fn price_only(
        instrument_id: impl Into<String>,
        ts: i64,
        price: f64,
        source: impl Into<String>,
    ) -> Self {
        Self {
            instrument_id: instrument_id.into(),
            ts,
            price,
            buy: None,
            sell: None,
            source: source.into(),
            raw: None,
        }
    }
}

/// Suffix appended to a source tag for derived (computed, not measured) rows
pub const CALCULATED_SUFFIX: &str = "_calculated";

/// Tag a source as carrying a computed value
pub fn calculated_source(base: &str) -> String {
    format!("{}{}", base, CALCULATED_SUFFIX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_round_trip() {
        assert_eq!(Category::parse("metals"), Some(Category::Metals));
        assert_eq!(Category::parse("fx"), Some(Category::Fx));
        assert_eq!(Category::parse("bond"), None);
        assert_eq!(Category::Metals.as_str(), "metals");
    }

    #[test]
    fn with_sides_computes_mid() {
        let q = NormalizedQuote::with_sides("gram", 1_700_000_000, 2550.0, 2555.0, "harem");
        assert_eq!(q.price, 2552.5);
        assert_eq!(q.buy, Some(2550.0));
        assert_eq!(q.sell, Some(2555.0));
    }

    #[test]
    fn calculated_tagging() {
        assert_eq!(calculated_source("tcmb"), "tcmb_calculated");
    }
}
