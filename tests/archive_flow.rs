//! Archive adapters against mocked upstream endpoints

use chrono::NaiveDate;
use sarraf::providers::bigpara::BigparaArchive;
use sarraf::providers::investing::InvestingArchive;
use sarraf::providers::ArchiveProvider;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn range() -> (NaiveDate, NaiveDate) {
    (
        NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
        NaiveDate::from_ymd_opt(2024, 2, 29).unwrap(),
    )
}

#[tokio::test]
async fn protected_archive_posts_form_with_session_cookie() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/instruments/HistoricalDataAjax"))
        .and(header("Cookie", "session=abc123"))
        .and(header("X-Requested-With", "XMLHttpRequest"))
        .and(body_string_contains("curr_id=8830"))
        .and(body_string_contains("startDate=2024-02-01"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": [
                { "rowDate": "12.02.2024", "last_close": "2.050,00" },
                { "rowDate": "13.02.2024", "last_close": "2.060,50" }
            ]
        })))
        .mount(&server)
        .await;

    let archive = InvestingArchive::new(server.uri(), "session=abc123", false);
    let (start, end) = range();
    let quotes = archive.fetch_history("ons", "8830", start, end).await.unwrap();

    assert_eq!(quotes.len(), 2);
    assert_eq!(quotes[0].price, 2050.0);
    assert_eq!(quotes[1].price, 2060.5);
    assert!(quotes.iter().all(|q| q.instrument_id == "ons"));
    assert!(quotes.iter().all(|q| q.source == "investing"));
}

#[tokio::test]
async fn protected_archive_maps_404_to_no_data() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let archive = InvestingArchive::new(server.uri(), "session=abc123", false);
    let (start, end) = range();
    let result = archive.fetch_history("ons", "8830", start, end).await;

    match result {
        Err(e) => assert!(e.is_no_data(), "expected NoData, got {}", e),
        Ok(_) => panic!("expected NoData"),
    }
}

#[tokio::test]
async fn protected_archive_skips_bad_rows() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": [
                { "rowDate": "12.02.2024", "last_close": "2.050,00" },
                { "rowDate": "Toplam", "last_close": "x" }
            ]
        })))
        .mount(&server)
        .await;

    let archive = InvestingArchive::new(server.uri(), "session=abc123", false);
    let (start, end) = range();
    let quotes = archive.fetch_history("ons", "8830", start, end).await.unwrap();
    assert_eq!(quotes.len(), 1);
}

#[tokio::test]
async fn secondary_archive_parses_js_chart_block() {
    let server = MockServer::start().await;
    let block = r#"window.grafik = { seri: {
        fiyat: ["2050.5000","2061.0000"],
        tarih: ["12 Þubat 2024","13 Şubat 2024"] } };"#;
    Mock::given(method("GET"))
        .and(path("/api/altin/gram-altin/grafik"))
        .respond_with(ResponseTemplate::new(200).set_body_string(block))
        .mount(&server)
        .await;

    let archive = BigparaArchive::new(server.uri());
    let (start, end) = range();
    let quotes = archive
        .fetch_history("gram", "gram-altin", start, end)
        .await
        .unwrap();

    assert_eq!(quotes.len(), 2);
    assert_eq!(quotes[0].price, 2050.5);
    assert!(quotes.iter().all(|q| q.source == "bigpara"));
    assert!(quotes.iter().all(|q| q.buy.is_none() && q.sell.is_none()));
}

#[tokio::test]
async fn secondary_archive_maintenance_page_is_batch_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>bakim</html>"))
        .mount(&server)
        .await;

    let archive = BigparaArchive::new(server.uri());
    let (start, end) = range();
    assert!(archive
        .fetch_history("gram", "gram-altin", start, end)
        .await
        .is_err());
}
