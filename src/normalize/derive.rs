//! Derived-instrument computation
//!
//! Two derivation shapes exist: a fixed multiplicative ratio applied to a
//! base quote (karat variants, gram/ounce conversion) and an algebraic
//! cross rate combining two quotes in the same quote currency. Derived
//! rows are tagged with a "_calculated" source suffix so consumers can
//! tell computed values from measured ones.

use crate::providers::types::{calculated_source, NormalizedQuote, CALCULATED_SUFFIX};

/// Grams per troy ounce
pub const TROY_OUNCE_GRAMS: f64 = 31.103_476_8;

/// Purity ratio of 14-karat relative to fine gold
pub const KARAT_14_RATIO: f64 = 14.0 / 24.0;

/// Derive a quote by applying a fixed ratio to a base quote.
///
/// Buy and sell scale independently and stay absent when the base has no
/// such side.
pub fn ratio_quote(base: &NormalizedQuote, instrument_id: &str, ratio: f64) -> NormalizedQuote {
    NormalizedQuote {
        instrument_id: instrument_id.to_string(),
        ts: base.ts,
        price: base.price * ratio,
        buy: base.buy.map(|b| b * ratio),
        sell: base.sell.map(|s| s * ratio),
        source: derived_tag(&base.source),
        raw: None,
    }
}

/// Derive a cross rate `num/den` between two quotes sharing a quote
/// currency (e.g. EURUSD from EURTRY and USDTRY).
///
/// The mid comes from the two mids. Buy/sell use bid/ask inversion
/// (`num.buy / den.sell`, `num.sell / den.buy`) and are only populated
/// when both legs carry the needed side.
pub fn cross_rate(
    num: &NormalizedQuote,
    den: &NormalizedQuote,
    instrument_id: &str,
) -> Option<NormalizedQuote> {
    if den.price == 0.0 {
        return None;
    }

    let buy = match (num.buy, den.sell) {
        (Some(b), Some(s)) if s != 0.0 => Some(b / s),
        _ => None,
    };
    let sell = match (num.sell, den.buy) {
        (Some(s), Some(b)) if b != 0.0 => Some(s / b),
        _ => None,
    };

    Some(NormalizedQuote {
        instrument_id: instrument_id.to_string(),
        ts: num.ts.max(den.ts),
        price: num.price / den.price,
        buy,
        sell,
        source: derived_tag(&num.source),
        raw: None,
    })
}

/// Source tag for a derived row; never double-suffixes.
fn derived_tag(base_source: &str) -> String {
    if base_source.ends_with(CALCULATED_SUFFIX) {
        base_source.to_string()
    } else {
        calculated_source(base_source)
    }
}
