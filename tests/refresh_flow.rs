//! End-to-end refresh flow against mocked upstream feeds

use sarraf::config::Config;
use sarraf::db::Db;
use sarraf::error::AppError;
use sarraf::providers::tcmb::TcmbProvider;
use sarraf::providers::types::Category;
use sarraf::providers::SpotProvider;
use sarraf::refresh::RefreshOutcome;
use sarraf::services::{HistoryService, LatestCache, QuotesService};
use sarraf::state::AppState;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_config(harem_url: &str, tcmb_url: &str, rates_url: &str) -> Config {
    Config {
        db_path: PathBuf::from(":memory:"),
        metals_refresh: Duration::from_secs(60),
        fx_refresh: Duration::from_secs(300),
        cooldown: Duration::ZERO,
        staleness: Duration::from_secs(900),
        latest_cache_ttl: Duration::ZERO,
        backfill_years: 5,
        archive_cookie: None,
        archive_use_curl: false,
        harem_url: harem_url.to_string(),
        tcmb_url: tcmb_url.to_string(),
        rates_url: rates_url.to_string(),
        investing_url: "http://unused".to_string(),
        bigpara_url: "http://unused".to_string(),
    }
}

fn state_with(config: Config) -> AppState {
    let db = Arc::new(Db::open_in_memory().unwrap());
    AppState::with_db(config, db).unwrap()
}

#[tokio::test]
async fn metals_refresh_end_to_end() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ajax/all"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": { "ALTIN": { "alis": "2.550,00", "satis": "2.555,00" } }
        })))
        .mount(&server)
        .await;

    let state = state_with(test_config(&server.uri(), "http://unused", "http://unused"));

    let outcome = state.orchestrator.refresh(Category::Metals).await.unwrap();
    assert!(matches!(outcome, RefreshOutcome::Refreshed { .. }));

    // one historical row for the measured instrument
    assert_eq!(state.db.count_history("gram").unwrap(), 1);

    // snapshot carries the mid price and no day-ago reference yet
    let snapshot = state.db.get_latest("gram").unwrap().unwrap();
    assert_eq!(snapshot.price, 2552.5);
    assert_eq!(snapshot.buy, Some(2550.0));
    assert_eq!(snapshot.sell, Some(2555.0));
    assert!(snapshot.price_day_ago.is_none());
    assert_eq!(snapshot.source, "harem");

    // a derived instrument came along, tagged as computed
    let derived = state.db.get_latest("ayar14").unwrap().unwrap();
    assert_eq!(derived.source, "harem_calculated");
    assert!((derived.price - 2552.5 * 14.0 / 24.0).abs() < 1e-9);

    // ledger shows a clean success
    let fetch_state = state.db.get_fetch_state(Category::Metals).unwrap().unwrap();
    assert_eq!(fetch_state.last_status.as_deref(), Some("success"));
    assert_eq!(fetch_state.consecutive_failures, 0);
}

#[tokio::test]
async fn fx_falls_back_when_primary_is_down() {
    let fx_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/today.xml"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&fx_server)
        .await;

    let rates_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/USD"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "base_code": "USD",
            "rates": { "TRY": 35.1, "EUR": 0.92, "GBP": 0.79 }
        })))
        .mount(&rates_server)
        .await;

    let state = state_with(test_config(
        "http://unused",
        &fx_server.uri(),
        &rates_server.uri(),
    ));

    let outcome = state.orchestrator.refresh(Category::Fx).await.unwrap();
    assert!(matches!(outcome, RefreshOutcome::Refreshed { .. }));

    // fallback output is what got persisted: no spreads, fallback tag
    let snapshot = state.db.get_latest("USDTRY").unwrap().unwrap();
    assert_eq!(snapshot.source, "exchangerate");
    assert_eq!(snapshot.price, 35.1);
    assert!(snapshot.buy.is_none());
    assert!(snapshot.sell.is_none());

    // category-level success despite the primary being down
    let fetch_state = state.db.get_fetch_state(Category::Fx).unwrap().unwrap();
    assert_eq!(fetch_state.last_status.as_deref(), Some("success"));
    assert_eq!(fetch_state.consecutive_failures, 0);
}

#[tokio::test]
async fn fx_primary_serves_spreads_and_cross_rate() {
    let fx_server = MockServer::start().await;
    let bulletin = r#"<?xml version="1.0" encoding="UTF-8"?>
<Tarih_Date Tarih="12.02.2024" Date="02/12/2024">
  <Currency Kod="USD"><Unit>1</Unit><ForexBuying>35.0</ForexBuying><ForexSelling>35.2</ForexSelling></Currency>
  <Currency Kod="EUR"><Unit>1</Unit><ForexBuying>38.4</ForexBuying><ForexSelling>38.6</ForexSelling></Currency>
</Tarih_Date>"#;
    Mock::given(method("GET"))
        .and(path("/today.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(bulletin))
        .mount(&fx_server)
        .await;

    let state = state_with(test_config("http://unused", &fx_server.uri(), "http://unused"));

    state.orchestrator.refresh(Category::Fx).await.unwrap();

    let usd = state.db.get_latest("USDTRY").unwrap().unwrap();
    assert_eq!(usd.source, "tcmb");
    assert!((usd.price - 35.1).abs() < 1e-9);

    let cross = state.db.get_latest("EURUSD").unwrap().unwrap();
    assert_eq!(cross.source, "tcmb_calculated");
    assert!((cross.price - 38.5 / 35.1).abs() < 1e-9);
}

#[tokio::test]
async fn weekend_bulletin_is_no_data_not_an_error() {
    let fx_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&fx_server)
        .await;

    let provider = TcmbProvider::new(fx_server.uri());
    let date = chrono::NaiveDate::from_ymd_opt(2024, 2, 11).unwrap(); // a Sunday
    let result = provider.fetch_for_date(date).await;

    match result {
        Err(e) => assert!(e.is_no_data(), "expected NoData, got {}", e),
        Ok(_) => panic!("expected NoData"),
    }
}

#[tokio::test]
async fn consecutive_failures_accumulate_until_a_success() {
    let fx_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&fx_server)
        .await;

    let state = state_with(test_config("http://unused", &fx_server.uri(), &fx_server.uri()));

    for expected in 1..=3 {
        let outcome = state.orchestrator.refresh(Category::Fx).await.unwrap();
        assert!(matches!(outcome, RefreshOutcome::Failed { .. }));
        let fetch_state = state.db.get_fetch_state(Category::Fx).unwrap().unwrap();
        assert_eq!(fetch_state.consecutive_failures, expected);
    }
}

#[tokio::test]
async fn read_path_sees_committed_data() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ajax/all"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": { "ALTIN": { "alis": "2.550,00", "satis": "2.555,00" } }
        })))
        .mount(&server)
        .await;

    let state = state_with(test_config(&server.uri(), "http://unused", "http://unused"));

    // before any refresh: "no data yet", not a crash
    let cache = LatestCache::new(Duration::ZERO);
    let empty = QuotesService::get_latest(&state.db, &cache, Category::Metals).unwrap();
    assert!(empty.items.is_empty());

    state.orchestrator.refresh(Category::Metals).await.unwrap();

    let latest = QuotesService::get_latest(&state.db, &cache, Category::Metals).unwrap();
    assert!(!latest.items.is_empty());
    assert!(latest.last_updated_ts.is_some());

    let history = HistoryService::get_history(&state.db, "gram", None, None, None).unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].price, 2552.5);
}

#[tokio::test]
async fn malformed_metals_payload_fails_the_category() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ajax/all"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let state = state_with(test_config(&server.uri(), "http://unused", "http://unused"));

    let outcome = state.orchestrator.refresh(Category::Metals).await.unwrap();
    assert!(matches!(outcome, RefreshOutcome::Failed { .. }));
    let fetch_state = state.db.get_fetch_state(Category::Metals).unwrap().unwrap();
    assert_eq!(fetch_state.last_status.as_deref(), Some("error"));
}

#[tokio::test]
async fn direct_provider_error_types() {
    // transport-level failure surfaces as an adapter error, not a panic
    let provider = TcmbProvider::new("http://127.0.0.1:1");
    let result = provider.fetch_current().await;
    assert!(matches!(result, Err(AppError::Http(_))));
}
