//! Eastmoney adapter tests against a mock HTTP server.

use chrono::NaiveDate;
use serde_json::json;
use stockscope_common::MarketConfig;
use stockscope_server::data::{EastmoneyAdapter, MarketDataProvider, ProviderError};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn adapter(server: &MockServer) -> EastmoneyAdapter {
    EastmoneyAdapter::new(&MarketConfig {
        kline_url: format!("{}/api/qt/stock/kline/get", server.uri()),
        profile_url: format!("{}/api/qt/stock/get", server.uri()),
        timeout_secs: 5,
        ..MarketConfig::default()
    })
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[tokio::test]
async fn test_daily_history_request_and_parse() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/qt/stock/kline/get"))
        .and(query_param("secid", "1.600519"))
        .and(query_param("klt", "101"))
        .and(query_param("fqt", "0"))
        .and(query_param("beg", "20240102"))
        .and(query_param("end", "20240105"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "rc": 0,
            "data": {
                "code": "600519",
                "klines": [
                    "2024-01-02,1715.00,1685.01,1718.19,1678.10,32155,5440083968.00,2.36,-1.73,-29.59,0.26",
                    "2024-01-03,1681.11,1694.00,1695.22,1676.33,20174,3399055104.00,1.12,0.53,8.99,0.16"
                ]
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let rows = adapter(&server)
        .daily_history("600519", date(2024, 1, 2), date(2024, 1, 5))
        .await
        .unwrap();

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].date, date(2024, 1, 2));
    assert_eq!(rows[0].close, 1685.01);
    assert_eq!(rows[0].pct_change, -1.73);
    assert_eq!(rows[0].turnover_rate, Some(0.26));
    // 5440083968 / 0.26 / 1e6
    assert_eq!(rows[0].market_cap, Some(20923.4));
}

#[tokio::test]
async fn test_shenzhen_symbol_uses_market_zero() {
    let server = MockServer::start().await;

    Mock::given(path("/api/qt/stock/kline/get"))
        .and(query_param("secid", "0.000001"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "rc": 0,
            "data": { "klines": [] }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let rows = adapter(&server)
        .daily_history("000001", date(2024, 1, 2), date(2024, 1, 5))
        .await
        .unwrap();
    assert!(rows.is_empty());
}

#[tokio::test]
async fn test_null_data_is_empty_history() {
    let server = MockServer::start().await;

    Mock::given(path("/api/qt/stock/kline/get"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "rc": 0, "data": null })))
        .mount(&server)
        .await;

    let rows = adapter(&server)
        .daily_history("600000", date(2024, 1, 2), date(2024, 1, 5))
        .await
        .unwrap();
    assert!(rows.is_empty());
}

#[tokio::test]
async fn test_api_error_code() {
    let server = MockServer::start().await;

    Mock::given(path("/api/qt/stock/kline/get"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "rc": 102, "data": null })))
        .mount(&server)
        .await;

    let err = adapter(&server)
        .daily_history("600000", date(2024, 1, 2), date(2024, 1, 5))
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::Internal(msg) if msg.contains("rc=102")));
}

#[tokio::test]
async fn test_http_failure_is_network_error() {
    let server = MockServer::start().await;

    Mock::given(path("/api/qt/stock/kline/get"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = adapter(&server)
        .daily_history("600000", date(2024, 1, 2), date(2024, 1, 5))
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::Network(_)));
}

#[tokio::test]
async fn test_invalid_symbol_rejected_without_request() {
    let server = MockServer::start().await;

    Mock::given(path("/api/qt/stock/kline/get"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = adapter(&server)
        .daily_history("ABC", date(2024, 1, 2), date(2024, 1, 5))
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::InvalidRequest(_)));
}

#[tokio::test]
async fn test_stock_profile() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/qt/stock/get"))
        .and(query_param("secid", "1.600519"))
        .and(query_param("fltt", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "rc": 0,
            "data": {
                "f43": 1700.0,
                "f57": "600519",
                "f58": "贵州茅台",
                "f84": 1256197800.0,
                "f85": 1256197800.0,
                "f116": 2135536260000.0,
                "f117": 2135536260000.0,
                "f127": "酿酒行业",
                "f189": 20010827
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let profile = adapter(&server).stock_profile("600519").await.unwrap();
    assert_eq!(profile.name.as_deref(), Some("贵州茅台"));
    assert_eq!(profile.total_market_cap, Some(2135536260000.0));
    assert_eq!(profile.listing_date, Some(date(2001, 8, 27)));
}

#[tokio::test]
async fn test_stock_profile_missing_is_not_available() {
    let server = MockServer::start().await;

    Mock::given(path("/api/qt/stock/get"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "rc": 0, "data": null })))
        .mount(&server)
        .await;

    let err = adapter(&server).stock_profile("000000").await.unwrap_err();
    assert!(matches!(err, ProviderError::DataNotAvailable(_)));
}
