//! Market data module for A-shares.
//!
//! Daily price/turnover history and company profiles come from a
//! [`MarketDataProvider`]; display names come from the [`SymbolDirectory`].
//!
//! # Data Sources
//! - **Eastmoney** (default): public quote API, no key required

mod eastmoney;
mod provider;
mod symbols;

pub use eastmoney::EastmoneyAdapter;
pub use provider::{MarketDataProvider, ProviderError};
pub use symbols::{SymbolDirectory, UNKNOWN_SECURITY};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use stockscope_common::util::round_to;

/// Divisor turning `amount / turnover_rate(%)` into hundred-million yuan.
const MARKET_CAP_DIVISOR: f64 = 1_000_000.0;

/// Divisor for expressing share counts and market caps in hundred millions (亿).
pub const HUNDRED_MILLION: f64 = 100_000_000.0;

// ============================================================================
// Price Rows
// ============================================================================

/// One trading day of price and turnover data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRow {
    /// Trading day, serialized as `YYYY/MM/DD`
    #[serde(with = "slash_date")]
    pub date: NaiveDate,
    pub open: f64,
    pub close: f64,
    pub high: f64,
    pub low: f64,
    /// Shares traded (lots)
    pub volume: f64,
    /// Traded amount in yuan
    pub amount: f64,
    /// Intraday amplitude (%)
    pub amplitude: f64,
    /// Price change (%)
    pub pct_change: f64,
    /// Price change (yuan)
    pub change: f64,
    /// Turnover rate (%), absent when the provider has none
    pub turnover_rate: Option<f64>,
    /// Estimated market cap in hundred-million yuan
    pub market_cap: Option<f64>,
}

impl PriceRow {
    /// Fill in the derived market cap from amount and turnover rate.
    pub fn with_market_cap(mut self) -> Self {
        self.market_cap = derive_market_cap(self.amount, self.turnover_rate);
        self
    }

    /// Turnover rate when it is usable for log statistics.
    pub fn positive_turnover(&self) -> Option<f64> {
        self.turnover_rate.filter(|rate| *rate > 0.0)
    }
}

/// Estimate market cap (亿) from traded amount and turnover rate.
///
/// Undefined when the turnover rate is missing or not strictly positive.
pub fn derive_market_cap(amount: f64, turnover_rate: Option<f64>) -> Option<f64> {
    match turnover_rate {
        Some(rate) if rate > 0.0 => Some(round_to(amount / rate / MARKET_CAP_DIVISOR, 2)),
        _ => None,
    }
}

/// `YYYY/MM/DD` (de)serialization for trading days.
pub mod slash_date {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    pub const FORMAT: &str = "%Y/%m/%d";

    pub fn serialize<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&date.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveDate::parse_from_str(&raw, FORMAT).map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// Company Profile
// ============================================================================

/// Company profile as reported by the provider, in raw units (shares, yuan).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StockProfile {
    pub code: String,
    pub name: Option<String>,
    pub industry: Option<String>,
    pub total_shares: Option<f64>,
    pub float_shares: Option<f64>,
    pub total_market_cap: Option<f64>,
    pub float_market_cap: Option<f64>,
    pub latest_price: Option<f64>,
    pub listing_date: Option<NaiveDate>,
}

/// Company snapshot for display: share counts and market caps in 亿.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompanySnapshot {
    pub code: String,
    pub name: Option<String>,
    pub industry: Option<String>,
    pub total_shares: Option<f64>,
    pub float_shares: Option<f64>,
    pub total_market_cap: Option<f64>,
    pub float_market_cap: Option<f64>,
    /// Total market cap divided by total shares, in yuan
    pub current_price: Option<f64>,
    pub listing_date: Option<NaiveDate>,
}

impl From<StockProfile> for CompanySnapshot {
    fn from(profile: StockProfile) -> Self {
        let current_price = match (profile.total_market_cap, profile.total_shares) {
            (Some(cap), Some(shares)) if shares > 0.0 => Some(cap / shares),
            _ => None,
        };
        let in_hundred_millions = |v: Option<f64>| v.map(|x| x / HUNDRED_MILLION);

        Self {
            code: profile.code,
            name: profile.name,
            industry: profile.industry,
            total_shares: in_hundred_millions(profile.total_shares),
            float_shares: in_hundred_millions(profile.float_shares),
            total_market_cap: in_hundred_millions(profile.total_market_cap),
            float_market_cap: in_hundred_millions(profile.float_market_cap),
            current_price,
            listing_date: profile.listing_date,
        }
    }
}
