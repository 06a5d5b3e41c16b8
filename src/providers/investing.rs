//! Protected historical archive adapter
//!
//! The archive sits behind Cloudflare and rejects generic HTTP clients,
//! so requests present a full browser fingerprint plus an
//! operator-supplied session cookie (rotated out-of-band; this system
//! never obtains or refreshes it). When the ordinary client stack is
//! still blocked upstream, a curl subprocess with identical headers can
//! be selected via configuration; the orchestrator and backfill never
//! see the difference.

use crate::error::{AppError, Result};
use crate::normalize::{date_to_ts, parse_archive_date, parse_localized_price};
use crate::providers::types::NormalizedQuote;
use crate::providers::{build_client, ArchiveProvider, HTTP_TIMEOUT_SECS};
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde_json::Value;
use tokio::process::Command;

const SOURCE: &str = "investing";

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Cookie-gated archive adapter
pub struct InvestingArchive {
    client: Client,
    base_url: String,
    session_cookie: String,
    use_curl: bool,
}

impl InvestingArchive {
    pub fn new(
        base_url: impl Into<String>,
        session_cookie: impl Into<String>,
        use_curl: bool,
    ) -> Self {
        Self {
            client: build_client(),
            base_url: base_url.into(),
            session_cookie: session_cookie.into(),
            use_curl,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/instruments/HistoricalDataAjax", self.base_url)
    }

    fn headers(&self) -> Vec<(&'static str, String)> {
        vec![
            ("User-Agent", USER_AGENT.to_string()),
            (
                "Accept",
                "application/json, text/javascript, */*; q=0.01".to_string(),
            ),
            ("Accept-Language", "tr-TR,tr;q=0.9,en;q=0.8".to_string()),
            ("X-Requested-With", "XMLHttpRequest".to_string()),
            ("Referer", self.base_url.clone()),
            ("Cookie", self.session_cookie.clone()),
        ]
    }

    fn form_fields(market_code: &str, start: NaiveDate, end: NaiveDate) -> Vec<(&'static str, String)> {
        vec![
            ("curr_id", market_code.to_string()),
            ("locale", "tr".to_string()),
            ("startDate", format!("{} 00:00:00", start.format("%Y-%m-%d"))),
            ("endDate", format!("{} 23:59:59", end.format("%Y-%m-%d"))),
        ]
    }

    async fn post_reqwest(&self, form: &[(&'static str, String)]) -> Result<String> {
        let mut request = self.client.post(self.endpoint()).form(form);
        for (name, value) in self.headers() {
            request = request.header(name, value);
        }

        let response = request.send().await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(AppError::NoData("archive has no rows for range".to_string()));
        }
        if !response.status().is_success() {
            return Err(AppError::Provider(format!(
                "Archive returned HTTP {}",
                response.status()
            )));
        }

        Ok(response.text().await?)
    }

    /// Subprocess backend. `-w` appends the status code on its own line
    /// so non-2xx responses stay distinguishable without `--fail`.
    async fn post_curl(&self, form: &[(&'static str, String)]) -> Result<String> {
        let body = form
            .iter()
            .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");

        let mut command = Command::new("curl");
        command
            .arg("-s")
            .arg("-X")
            .arg("POST")
            .arg("--max-time")
            .arg(HTTP_TIMEOUT_SECS.to_string())
            .arg("-w")
            .arg("\n%{http_code}")
            .arg("--data")
            .arg(&body);
        for (name, value) in self.headers() {
            command.arg("-H").arg(format!("{}: {}", name, value));
        }
        command.arg(self.endpoint());

        let output = command.output().await?;
        if !output.status.success() {
            return Err(AppError::Provider(format!(
                "curl exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let (payload, status) = stdout
            .rsplit_once('\n')
            .ok_or_else(|| AppError::Provider("curl produced no status line".to_string()))?;
        let status: u16 = status
            .trim()
            .parse()
            .map_err(|_| AppError::Provider(format!("bad curl status line '{}'", status)))?;

        if status == 404 {
            return Err(AppError::NoData("archive has no rows for range".to_string()));
        }
        if !(200..300).contains(&status) {
            return Err(AppError::Provider(format!("Archive returned HTTP {}", status)));
        }

        Ok(payload.to_string())
    }
}

#[async_trait]
impl ArchiveProvider for InvestingArchive {
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
        let form = Self::form_fields(market_code, start, end);
        let body = if self.use_curl {
            self.post_curl(&form).await?
        } else {
            self.post_reqwest(&form).await?
        };

        parse_rows(&body, instrument_id)
    }
}

/// Parse the archive response. Rows live under a `data` key (or the
/// provider's alternate `attr` key); a missing array is a whole-batch
/// failure, an unparseable row is skipped.
fn parse_rows(body: &str, instrument_id: &str) -> Result<Vec<NormalizedQuote>> {
    let value: Value = serde_json::from_str(body)?;

    let rows = value
        .get("data")
        .or_else(|| value.get("attr"))
        .and_then(Value::as_array)
        .ok_or_else(|| {
            AppError::Provider("archive response has no 'data'/'attr' array".to_string())
        })?;

    let mut quotes = Vec::new();
    for row in rows {
        let date_raw = row
            .get("rowDate")
            .or_else(|| row.get("date"))
            .and_then(Value::as_str);
        let price_raw = row
            .get("last_close")
            .or_else(|| row.get("price"))
            .or_else(|| row.get("close"));

        let (Some(date_raw), Some(price_raw)) = (date_raw, price_raw) else {
            tracing::warn!("Skipping archive row without date/price: {}", row);
            continue;
        };

        let date = match parse_archive_date(date_raw) {
            Ok(date) => date,
            Err(e) => {
                tracing::warn!("Skipping archive row ({}): {}", date_raw, e);
                continue;
            }
        };

        let price = match price_raw {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => parse_localized_price(s).ok(),
            _ => None,
        };
        let Some(price) = price else {
            tracing::warn!("Skipping archive row with unparseable price: {}", price_raw);
            continue;
        };

        let mut quote =
            NormalizedQuote::price_only(instrument_id, date_to_ts(date), price, SOURCE);
        quote.raw = Some(row.to_string());
        quotes.push(quote);
    }

    quotes.sort_by_key(|q| q.ts);
    Ok(quotes)
}
