//! Eastmoney adapter for A-share market data.
//!
//! # Data Sources
//! - Daily K-line: push2his.eastmoney.com (unadjusted, `fqt=0`)
//! - Single-stock snapshot: push2.eastmoney.com
//!
//! No API key is required. Endpoints are taken from [`MarketConfig`] so a mock
//! server can stand in during tests.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::time::Duration;
use stockscope_common::MarketConfig;
use tracing::{debug, warn};

use super::provider::{MarketDataProvider, ProviderError};
use super::{PriceRow, StockProfile};

// ============================================================================
// Constants
// ============================================================================

/// Daily bars
const KLT_DAILY: &str = "101";

/// No price adjustment (不复权)
const FQT_NONE: &str = "0";

const KLINE_FIELDS1: &str = "f1,f2,f3,f4,f5,f6";
const KLINE_FIELDS2: &str = "f51,f52,f53,f54,f55,f56,f57,f58,f59,f60,f61";

/// Snapshot fields: price, code, name, total shares, float shares,
/// total cap, float cap, industry, listing date
const PROFILE_FIELDS: &str = "f43,f57,f58,f84,f85,f116,f117,f127,f189";

/// Public token the web front-end sends with every quote request
const UT_TOKEN: &str = "7eea3edcaed734bea9cbfc24409ed989";

/// Minimum comma-separated fields in a kline line
const KLINE_FIELD_COUNT: usize = 11;

// ============================================================================
// Symbol Mapping
// ============================================================================

/// Convert a stock symbol to Eastmoney `secid` format.
///
/// Plain codes: "600000" -> "1.600000" (SH), "000001" -> "0.000001" (SZ/BJ).
/// Suffixed codes: "600000.SH" -> "1.600000".
fn to_secid(symbol: &str) -> Option<String> {
    let symbol = symbol.trim();

    let (code, market) = match symbol.split_once('.') {
        Some((code, exchange)) => {
            let market = match exchange.to_uppercase().as_str() {
                "SH" => "1",
                "SZ" | "BJ" => "0",
                _ => return None,
            };
            (code, market)
        }
        None => {
            let market = if symbol.starts_with('6') || symbol.starts_with('9') {
                "1"
            } else {
                "0"
            };
            (symbol, market)
        }
    };

    if code.len() != 6 || !code.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    Some(format!("{}.{}", market, code))
}

// ============================================================================
// Eastmoney Adapter
// ============================================================================

/// Eastmoney adapter for A-share daily history and company snapshots.
pub struct EastmoneyAdapter {
    client: reqwest::Client,
    kline_url: String,
    profile_url: String,
}

impl EastmoneyAdapter {
    /// Create an adapter from market config
    pub fn new(config: &MarketConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.as_str())
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            kline_url: config.kline_url.clone(),
            profile_url: config.profile_url.clone(),
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<T, ProviderError> {
        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(ProviderError::Network(format!("HTTP {}", status)));
        }

        response
            .json()
            .await
            .map_err(|e| ProviderError::Internal(format!("Failed to parse response: {}", e)))
    }

    /// Fetch daily K-line rows from eastmoney
    async fn fetch_kline(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PriceRow>, ProviderError> {
        let secid = to_secid(symbol)
            .ok_or_else(|| ProviderError::InvalidRequest(format!("Invalid symbol format: {}", symbol)))?;
        let beg = start.format("%Y%m%d").to_string();
        let end = end.format("%Y%m%d").to_string();

        debug!(symbol = symbol, secid = %secid, beg = %beg, end = %end, "Fetching kline from eastmoney");

        let data: KlineResponse = self
            .get_json(
                &self.kline_url,
                &[
                    ("secid", secid.as_str()),
                    ("ut", UT_TOKEN),
                    ("fields1", KLINE_FIELDS1),
                    ("fields2", KLINE_FIELDS2),
                    ("klt", KLT_DAILY),
                    ("fqt", FQT_NONE),
                    ("beg", beg.as_str()),
                    ("end", end.as_str()),
                ],
            )
            .await?;

        if data.rc != 0 {
            return Err(ProviderError::Internal(format!(
                "Eastmoney API error: rc={}",
                data.rc
            )));
        }

        let klines = data.data.and_then(|d| d.klines).unwrap_or_default();
        let rows = parse_klines(&klines)?;

        debug!(symbol = symbol, rows = rows.len(), "Parsed kline rows");
        Ok(rows)
    }

    /// Fetch the single-stock snapshot
    async fn fetch_profile(&self, symbol: &str) -> Result<StockProfile, ProviderError> {
        let secid = to_secid(symbol)
            .ok_or_else(|| ProviderError::InvalidRequest(format!("Invalid symbol format: {}", symbol)))?;

        debug!(symbol = symbol, secid = %secid, "Fetching profile from eastmoney");

        let data: ProfileResponse = self
            .get_json(
                &self.profile_url,
                &[
                    ("secid", secid.as_str()),
                    ("ut", UT_TOKEN),
                    ("fltt", "2"),
                    ("invt", "2"),
                    ("fields", PROFILE_FIELDS),
                ],
            )
            .await?;

        if data.rc != 0 {
            return Err(ProviderError::Internal(format!(
                "Eastmoney API error: rc={}",
                data.rc
            )));
        }

        let fields = data
            .data
            .ok_or_else(|| ProviderError::DataNotAvailable(format!("No profile for {}", symbol)))?;

        Ok(parse_profile(symbol, &fields))
    }
}

// ============================================================================
// Payload Parsing
// ============================================================================

/// Parse eastmoney kline strings into price rows.
///
/// Line format:
/// `date,open,close,high,low,volume,amount,amplitude,pct_change,change,turnover_rate`
fn parse_klines(klines: &[String]) -> Result<Vec<PriceRow>, ProviderError> {
    let mut rows = Vec::with_capacity(klines.len());

    for line in klines {
        let parts: Vec<&str> = line.split(',').collect();
        if parts.len() < KLINE_FIELD_COUNT {
            warn!(line = line.as_str(), "Invalid kline format, skipping");
            continue;
        }

        let date = NaiveDate::parse_from_str(parts[0], "%Y-%m-%d")
            .map_err(|e| ProviderError::Internal(format!("Failed to parse date: {}", e)))?;

        rows.push(
            PriceRow {
                date,
                open: required_number(parts[1], "open")?,
                close: required_number(parts[2], "close")?,
                high: required_number(parts[3], "high")?,
                low: required_number(parts[4], "low")?,
                volume: required_number(parts[5], "volume")?,
                amount: required_number(parts[6], "amount")?,
                amplitude: required_number(parts[7], "amplitude")?,
                pct_change: required_number(parts[8], "pct_change")?,
                change: required_number(parts[9], "change")?,
                turnover_rate: optional_number(parts[10]),
                market_cap: None,
            }
            .with_market_cap(),
        );
    }

    rows.sort_by_key(|r| r.date);
    Ok(rows)
}

fn required_number(raw: &str, field: &str) -> Result<f64, ProviderError> {
    raw.trim()
        .parse::<f64>()
        .map_err(|e| ProviderError::Internal(format!("Failed to parse {}: {}", field, e)))
}

/// Eastmoney writes "-" for unavailable numbers.
fn optional_number(raw: &str) -> Option<f64> {
    match raw.trim() {
        "" | "-" => None,
        s => s.parse::<f64>().ok().filter(|v| v.is_finite()),
    }
}

fn json_number(fields: &Map<String, Value>, key: &str) -> Option<f64> {
    match fields.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => optional_number(s),
        _ => None,
    }
}

fn json_text(fields: &Map<String, Value>, key: &str) -> Option<String> {
    match fields.get(key)? {
        Value::String(s) if !s.trim().is_empty() && s.trim() != "-" => Some(s.trim().to_string()),
        _ => None,
    }
}

/// Listing date arrives as a `YYYYMMDD` integer.
fn json_listing_date(fields: &Map<String, Value>, key: &str) -> Option<NaiveDate> {
    let raw = match fields.get(key)? {
        Value::Number(n) => n.as_u64()?.to_string(),
        Value::String(s) => s.trim().to_string(),
        _ => return None,
    };
    NaiveDate::parse_from_str(&raw, "%Y%m%d").ok()
}

fn parse_profile(symbol: &str, fields: &Map<String, Value>) -> StockProfile {
    StockProfile {
        code: json_text(fields, "f57").unwrap_or_else(|| symbol.trim().to_string()),
        name: json_text(fields, "f58"),
        industry: json_text(fields, "f127"),
        total_shares: json_number(fields, "f84"),
        float_shares: json_number(fields, "f85"),
        total_market_cap: json_number(fields, "f116"),
        float_market_cap: json_number(fields, "f117"),
        latest_price: json_number(fields, "f43"),
        listing_date: json_listing_date(fields, "f189"),
    }
}

// ============================================================================
// MarketDataProvider Implementation
// ============================================================================

#[async_trait]
impl MarketDataProvider for EastmoneyAdapter {
    fn name(&self) -> &'static str {
        "eastmoney"
    }

    async fn daily_history(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PriceRow>, ProviderError> {
        self.fetch_kline(symbol, start, end).await
    }

    async fn stock_profile(&self, symbol: &str) -> Result<StockProfile, ProviderError> {
        self.fetch_profile(symbol).await
    }
}

// ============================================================================
// Eastmoney API Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct KlineResponse {
    /// Return code (0 = success)
    rc: i32,
    data: Option<KlineData>,
}

#[derive(Debug, Deserialize)]
struct KlineData {
    klines: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct ProfileResponse {
    rc: i32,
    data: Option<Map<String, Value>>,
}
