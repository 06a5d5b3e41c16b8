//! Secondary historical archive adapter
//!
//! No cookie needed, but the payload is not a clean JSON document: the
//! endpoint returns a JavaScript text block embedding parallel arrays of
//! localized price strings and localized date strings. The arrays are
//! pulled out by marker matching (keys may be unquoted in the
//! surrounding block), and dates use Turkish month names that often
//! arrive mojibake'd.

use crate::error::{AppError, Result};
use crate::normalize::{date_to_ts, parse_localized_price, parse_month_name_date};
use crate::providers::types::NormalizedQuote;
use crate::providers::{build_client, ArchiveProvider};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use reqwest::Client;
use serde_json::Value;

const SOURCE: &str = "bigpara";

/// Secondary archive adapter (no auth)
pub struct BigparaArchive {
    client: Client,
    base_url: String,
}

impl BigparaArchive {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: build_client(),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl ArchiveProvider for BigparaArchive {
    fn id(&self) -> &'static str {
        SOURCE
    }

    async fn fetch_history(
        &self,
        instrument_id: &str,
        market_code: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<NormalizedQuote>> {
        let days = (Utc::now().date_naive() - start).num_days().max(1);
        let url = format!(
            "{}/api/altin/{}/grafik?gun={}",
            self.base_url, market_code, days
        );

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(AppError::Provider(format!(
                "Secondary archive returned HTTP {}",
                response.status()
            )));
        }

        let body = response.text().await?;
        parse_chart_block(&body, instrument_id, start, end)
    }
}

/// Parse the JS chart block into normalized quotes within [start, end].
fn parse_chart_block(
    body: &str,
    instrument_id: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<NormalizedQuote>> {
    let prices = extract_array_after(body, "fiyat")?;
    let dates = extract_array_after(body, "tarih")?;

    if prices.len() != dates.len() {
        tracing::warn!(
            "Chart block arrays disagree ({} prices vs {} dates), zipping the shorter",
            prices.len(),
            dates.len()
        );
    }

    let mut quotes = Vec::new();
    for (price_raw, date_raw) in prices.iter().zip(dates.iter()) {
        let date = match parse_month_name_date(date_raw) {
            Ok(date) => date,
            Err(e) => {
                tracing::warn!("Skipping chart row ({}): {}", date_raw, e);
                continue;
            }
        };
        if date < start || date > end {
            continue;
        }

        let price = match parse_localized_price(price_raw) {
            Ok(price) => price,
            Err(e) => {
                tracing::warn!("Skipping chart row ({}): {}", price_raw, e);
                continue;
            }
        };

        let mut quote =
            NormalizedQuote::price_only(instrument_id, date_to_ts(date), price, SOURCE);
        quote.raw = Some(format!(
            "{{\"fiyat\":\"{}\",\"tarih\":\"{}\"}}",
            price_raw, date_raw
        ));
        quotes.push(quote);
    }

    quotes.sort_by_key(|q| q.ts);
    Ok(quotes)
}

/// Locate the array following `key` in a JS-like block and parse it. The
/// array payloads themselves are valid JSON even when the surrounding
/// object is not (unquoted keys), so only the brackets need matching.
fn extract_array_after(text: &str, key: &str) -> Result<Vec<String>> {
    let key_pos = text
        .find(key)
        .ok_or_else(|| AppError::Provider(format!("chart block has no '{}' series", key)))?;

    let after = &text[key_pos + key.len()..];
    let open = after
        .find('[')
        .ok_or_else(|| AppError::Provider(format!("no array after '{}'", key)))?;

    // Everything between the key and the bracket must be separator noise,
    // otherwise the match belongs to some other construct.
    if after[..open]
        .chars()
        .any(|c| !c.is_whitespace() && !matches!(c, ':' | '"' | '\''))
    {
        return Err(AppError::Provider(format!(
            "unexpected text between '{}' and its array",
            key
        )));
    }

    let slice = matched_brackets(&after[open..])
        .ok_or_else(|| AppError::Provider(format!("unterminated array after '{}'", key)))?;

    let values: Vec<Value> = serde_json::from_str(slice)?;
    Ok(values
        .into_iter()
        .map(|v| match v {
            Value::String(s) => s,
            other => other.to_string(),
        })
        .collect())
}

/// Return the slice covering one bracket-balanced array, string-aware.
fn matched_brackets(text: &str) -> Option<&str> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '[' => depth += 1,
            ']' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(&text[..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLOCK: &str = r#"
        window.grafik = { kod: 'gram-altin',
            seri: { fiyat: ["7356.1000","7360.2500","7401.0000"],
                    tarih: ["12 Þubat 2024","13 Þubat 2024","14 Şubat 2024"] } };
        chart.render(window.grafik);
    "#;

    fn range() -> (NaiveDate, NaiveDate) {
        (
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
        )
    }

    #[test]
    fn extracts_parallel_arrays_from_js_block() {
        let (start, end) = range();
        let quotes = parse_chart_block(BLOCK, "gram", start, end).unwrap();

        assert_eq!(quotes.len(), 3);
        assert_eq!(quotes[0].price, 7356.1);
        assert_eq!(quotes[2].price, 7401.0);
        assert!(quotes.windows(2).all(|w| w[0].ts < w[1].ts));
        assert!(quotes.iter().all(|q| q.source == "bigpara"));
    }

    #[test]
    fn mojibake_dates_tolerated() {
        let (start, end) = range();
        let quotes = parse_chart_block(BLOCK, "gram", start, end).unwrap();
        // "12 Þubat 2024" decodes to Feb 12
        assert_eq!(quotes[0].ts, date_to_ts(NaiveDate::from_ymd_opt(2024, 2, 12).unwrap()));
    }

    #[test]
    fn bad_dates_skipped_not_fatal() {
        let block = r#"d = { fiyat: ["100.5","101.5"], tarih: ["12 Þubat 2024","lorem"] };"#;
        let (start, end) = range();
        let quotes = parse_chart_block(block, "gram", start, end).unwrap();
        assert_eq!(quotes.len(), 1);
    }

    #[test]
    fn range_filter_applies() {
        let start = NaiveDate::from_ymd_opt(2024, 2, 13).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 2, 13).unwrap();
        let quotes = parse_chart_block(BLOCK, "gram", start, end).unwrap();
        assert_eq!(quotes.len(), 1);
        assert_eq!(quotes[0].price, 7360.25);
    }

    #[test]
    fn missing_series_is_whole_batch_failure() {
        let (start, end) = range();
        assert!(parse_chart_block("<html>maintenance</html>", "gram", start, end).is_err());
    }

    #[test]
    fn bracket_matching_survives_strings() {
        assert_eq!(matched_brackets(r#"["a]b","c"] trailing"#), Some(r#"["a]b","c"]"#));
        assert!(matched_brackets(r#"["unterminated"#).is_none());
    }
}
