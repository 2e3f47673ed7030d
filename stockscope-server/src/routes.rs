//! HTTP routes for the StockScope service.

use axum::{
    body::Bytes,
    extract::{Query, State},
    response::Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use stockscope_common::util::is_compact_date;
use stockscope_common::{Error, Result};
use tracing::{info, warn};

use crate::analysis::{
    self, market_cap_extremes, top_rows, MarketCapPoint, SortColumn, SortOrder, TOP_ROWS,
};
use crate::data::{CompanySnapshot, PriceRow};
use crate::reports::{FinancialReportReader, ReportRow};
use crate::screener::{ScreenedStock, ScreenerEngine, ScreeningCriteria};
use crate::{AppState, SERVICE_NAME};

// ============================================================================
// Request Types
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct StockDataQuery {
    pub symbol: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub sort_column: Option<String>,
    pub sort_order: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SymbolQuery {
    pub symbol: Option<String>,
}

// ============================================================================
// Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub service: String,
}

/// Price history, summary table and turnover statistics for one stock.
///
/// Statistics fields are `null` when no row has a positive turnover rate.
#[derive(Debug, Serialize)]
pub struct StockDataResponse {
    pub stock_name: String,
    pub row_count: usize,
    pub table: Vec<PriceRow>,
    pub df: Vec<PriceRow>,
    pub max_market_cap: Option<MarketCapPoint>,
    pub min_market_cap: Option<MarketCapPoint>,
    pub log_bands: Option<[f64; 5]>,
    pub real_turnover_values: Option<[f64; 5]>,
    pub histogram_image: Option<String>,
    pub histogram_mime: Option<&'static str>,
    pub turnover_above_2sigma: Vec<PriceRow>,
    pub turnover_below_2sigma: Vec<PriceRow>,
}

#[derive(Debug, Serialize)]
pub struct StockInfoResponse {
    pub stock_info: CompanySnapshot,
}

#[derive(Debug, Serialize)]
pub struct FinancialReportResponse {
    pub stock_abbr: String,
    pub columns: Vec<&'static str>,
    pub table: Vec<ReportRow>,
}

#[derive(Debug, Serialize)]
pub struct FilteredStocksResponse {
    pub columns: Vec<&'static str>,
    pub data: Vec<ScreenedStock>,
    /// `[rows, columns]`
    pub results_amount: [usize; 2],
    /// Report periods every stock was checked against, oldest first
    pub files_considered: Vec<String>,
}

// ============================================================================
// Validation
// ============================================================================

fn required_symbol(raw: Option<&str>) -> Result<String> {
    match raw.map(str::trim) {
        Some(s) if !s.is_empty() => Ok(s.to_string()),
        _ => Err(Error::InvalidInput("symbol is required".into())),
    }
}

fn required_date(field: &str, raw: Option<&str>) -> Result<NaiveDate> {
    let raw = raw
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| Error::InvalidInput(format!("{} is required", field)))?;

    if !is_compact_date(raw) {
        return Err(Error::InvalidInput(format!(
            "{} must be YYYYMMDD, got {}",
            field, raw
        )));
    }

    NaiveDate::parse_from_str(raw, "%Y%m%d")
        .map_err(|_| Error::InvalidInput(format!("{} is not a calendar date: {}", field, raw)))
}

fn sort_column(raw: Option<&str>) -> Result<SortColumn> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(s) => s.parse().map_err(Error::InvalidInput),
        None => Ok(SortColumn::default()),
    }
}

/// A JSON number or a numeric string.
fn number_field(body: &Map<String, Value>, key: &str) -> Result<f64> {
    let invalid = || Error::InvalidInput(format!("{} must be a number", key));

    match body.get(key) {
        None | Some(Value::Null) => Err(Error::InvalidInput(format!("{} is required", key))),
        Some(Value::Number(n)) => n.as_f64().ok_or_else(invalid),
        Some(Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(invalid),
        Some(_) => Err(invalid()),
    }
}

fn years_field(body: &Map<String, Value>) -> Result<usize> {
    let years = number_field(body, "years")?;
    if years.fract() != 0.0 || years < 1.0 {
        return Err(Error::InvalidInput(format!(
            "years must be a whole number >= 1, got {}",
            years
        )));
    }
    Ok(years as usize)
}

/// Parse a screening request body.
///
/// Keys: `years`, `roe`, `gross_margin`, `net_profit`, `income_growth`,
/// `net_pro_growth`.
pub fn parse_screening_request(body: &[u8]) -> Result<ScreeningCriteria> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| Error::InvalidInput(format!("Malformed JSON body: {}", e)))?;
    let Value::Object(fields) = value else {
        return Err(Error::InvalidInput("Request body must be a JSON object".into()));
    };

    Ok(ScreeningCriteria {
        years: years_field(&fields)?,
        min_roe: number_field(&fields, "roe")?,
        min_gross_margin: number_field(&fields, "gross_margin")?,
        min_net_profit: number_field(&fields, "net_profit")?,
        min_revenue_growth: number_field(&fields, "income_growth")?,
        min_net_profit_growth: number_field(&fields, "net_pro_growth")?,
    })
}

/// Run blocking file work off the async runtime.
async fn blocking<T, E, F>(work: F) -> Result<T>
where
    F: FnOnce() -> std::result::Result<T, E> + Send + 'static,
    T: Send + 'static,
    E: Into<Error> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| Error::Internal(format!("Background task failed: {}", e)))?
        .map_err(Into::into)
}

// ============================================================================
// Route Handlers
// ============================================================================

/// Health check endpoint
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        service: SERVICE_NAME.to_string(),
    })
}

/// Price history with turnover statistics and histogram
pub async fn get_stock_data(
    State(state): State<Arc<AppState>>,
    Query(query): Query<StockDataQuery>,
) -> Result<Json<StockDataResponse>> {
    let symbol = required_symbol(query.symbol.as_deref())?;
    let start = required_date("start_date", query.start_date.as_deref())?;
    let end = required_date("end_date", query.end_date.as_deref())?;
    if start > end {
        return Err(Error::InvalidInput(format!(
            "start_date {} is after end_date {}",
            start.format("%Y%m%d"),
            end.format("%Y%m%d")
        )));
    }
    let column = sort_column(query.sort_column.as_deref())?;
    let order = SortOrder::parse(query.sort_order.as_deref());

    let stock_name = state.symbols.name_for(&symbol).to_string();
    info!(symbol = %symbol, stock_name = %stock_name, provider = state.provider.name(), "Fetching price history");

    let rows = state.provider.daily_history(&symbol, start, end).await?;
    if rows.is_empty() {
        return Err(Error::NotFound(format!(
            "No price data for {} between {} and {}",
            symbol,
            start.format("%Y%m%d"),
            end.format("%Y%m%d")
        )));
    }

    let extremes = market_cap_extremes(&rows);
    let table = top_rows(&rows, column, order, TOP_ROWS);
    let stats = analysis::analyze(&rows);
    let histogram = state.histogram.render(stats.as_ref(), &stock_name);

    let (log_bands, real_turnover_values, above, below) = match stats {
        Some(stats) => (
            Some(stats.band.log_edges),
            Some(stats.band.real_edges),
            stats.above,
            stats.below,
        ),
        None => (None, None, Vec::new(), Vec::new()),
    };

    info!(
        symbol = %symbol,
        rows = rows.len(),
        above = above.len(),
        below = below.len(),
        "Stock data ready"
    );

    Ok(Json(StockDataResponse {
        stock_name,
        row_count: rows.len(),
        table,
        df: rows,
        max_market_cap: extremes.max,
        min_market_cap: extremes.min,
        log_bands,
        real_turnover_values,
        histogram_mime: histogram.as_ref().map(|h| h.mime),
        histogram_image: histogram.map(|h| h.data),
        turnover_above_2sigma: above,
        turnover_below_2sigma: below,
    }))
}

/// Company profile snapshot
pub async fn get_stock_info(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SymbolQuery>,
) -> Result<Json<StockInfoResponse>> {
    let symbol = required_symbol(query.symbol.as_deref())?;

    let mut profile = state.provider.stock_profile(&symbol).await?;
    if profile.name.is_none() {
        profile.name = Some(state.symbols.name_for(&symbol).to_string());
    }

    Ok(Json(StockInfoResponse {
        stock_info: CompanySnapshot::from(profile),
    }))
}

/// Multi-year performance history for one stock
pub async fn get_financial_report(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SymbolQuery>,
) -> Result<Json<FinancialReportResponse>> {
    let symbol = required_symbol(query.symbol.as_deref())?;
    let reader = FinancialReportReader::from_config(&state.config.reports);

    let report = blocking(move || reader.read(&symbol)).await?;

    Ok(Json(FinancialReportResponse {
        stock_abbr: report.stock_abbr,
        columns: report.columns,
        table: report.rows,
    }))
}

/// Multi-year fundamental screen
pub async fn get_filtered_stocks(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<FilteredStocksResponse>> {
    let criteria = parse_screening_request(&body)?;
    info!(?criteria, "Screening stocks");

    let engine = ScreenerEngine::new(state.reports.clone());
    let result = blocking(move || engine.run(&criteria)).await?;

    if result.stocks.is_empty() {
        warn!("Screen returned no stocks");
    }

    Ok(Json(FilteredStocksResponse {
        results_amount: result.shape(),
        columns: result.columns,
        data: result.stocks,
        files_considered: result.files_considered,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use test_case::test_case;

    #[test]
    fn test_required_symbol() {
        assert_eq!(required_symbol(Some(" 600519 ")).unwrap(), "600519");
        assert!(required_symbol(Some("   ")).unwrap_err().is_invalid_input());
        assert!(required_symbol(None).unwrap_err().is_invalid_input());
    }

    #[test_case(None ; "missing")]
    #[test_case(Some("") ; "empty")]
    #[test_case(Some("2024-01-01") ; "dashed")]
    #[test_case(Some("2024011") ; "short")]
    #[test_case(Some("20240230") ; "not a calendar day")]
    #[test_case(Some("20241301") ; "bad month")]
    fn test_required_date_rejects(raw: Option<&str>) {
        assert!(required_date("start_date", raw).unwrap_err().is_invalid_input());
    }

    #[test]
    fn test_required_date_accepts() {
        assert_eq!(
            required_date("start_date", Some("20240229")).unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()
        );
    }

    #[test]
    fn test_sort_column_default_and_unknown() {
        assert_eq!(sort_column(None).unwrap(), SortColumn::TurnoverRate);
        assert_eq!(sort_column(Some("")).unwrap(), SortColumn::TurnoverRate);
        assert_eq!(sort_column(Some("收盘")).unwrap(), SortColumn::Close);
        assert!(sort_column(Some("pe")).unwrap_err().is_invalid_input());
    }

    #[test]
    fn test_parse_screening_request_numbers_and_strings() {
        let body = json!({
            "years": "3",
            "roe": 15,
            "gross_margin": "30.5",
            "net_profit": 100000000,
            "income_growth": " 10 ",
            "net_pro_growth": -5.5
        });

        let criteria = parse_screening_request(body.to_string().as_bytes()).unwrap();
        assert_eq!(criteria.years, 3);
        assert_eq!(criteria.min_roe, 15.0);
        assert_eq!(criteria.min_gross_margin, 30.5);
        assert_eq!(criteria.min_net_profit, 1.0e8);
        assert_eq!(criteria.min_revenue_growth, 10.0);
        assert_eq!(criteria.min_net_profit_growth, -5.5);
    }

    #[test_case(r#"{"years": 0, "roe": 1, "gross_margin": 1, "net_profit": 1, "income_growth": 1, "net_pro_growth": 1}"# ; "zero years")]
    #[test_case(r#"{"years": 2.5, "roe": 1, "gross_margin": 1, "net_profit": 1, "income_growth": 1, "net_pro_growth": 1}"# ; "fractional years")]
    #[test_case(r#"{"years": 3, "gross_margin": 1, "net_profit": 1, "income_growth": 1, "net_pro_growth": 1}"# ; "missing roe")]
    #[test_case(r#"{"years": 3, "roe": "high", "gross_margin": 1, "net_profit": 1, "income_growth": 1, "net_pro_growth": 1}"# ; "text roe")]
    #[test_case(r#"{"years": 3, "roe": true, "gross_margin": 1, "net_profit": 1, "income_growth": 1, "net_pro_growth": 1}"# ; "bool roe")]
    #[test_case(r#"[1, 2, 3]"# ; "not an object")]
    #[test_case(r#"{"years": "#; "truncated")]
    fn test_parse_screening_request_rejects(body: &str) {
        assert!(parse_screening_request(body.as_bytes())
            .unwrap_err()
            .is_invalid_input());
    }
}
