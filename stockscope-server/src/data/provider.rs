//! Market data provider abstraction.
//!
//! Handlers talk to a `dyn MarketDataProvider` so the HTTP layer can be
//! exercised against an in-memory stub.

use async_trait::async_trait;
use chrono::NaiveDate;
use std::fmt;
use stockscope_common::Error;

use super::{PriceRow, StockProfile};

// ============================================================================
// Provider Error
// ============================================================================

/// Errors specific to market data providers.
#[derive(Debug, Clone)]
pub enum ProviderError {
    /// Network error (connection failed, timeout, non-2xx status)
    Network(String),
    /// Data not available for the requested symbol
    DataNotAvailable(String),
    /// Invalid request parameters
    InvalidRequest(String),
    /// Upstream returned something we could not interpret
    Internal(String),
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network(msg) => write!(f, "Network error: {}", msg),
            Self::DataNotAvailable(msg) => write!(f, "Data not available: {}", msg),
            Self::InvalidRequest(msg) => write!(f, "Invalid request: {}", msg),
            Self::Internal(msg) => write!(f, "Provider error: {}", msg),
        }
    }
}

impl std::error::Error for ProviderError {}

impl From<ProviderError> for Error {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::DataNotAvailable(msg) => Error::NotFound(msg),
            ProviderError::InvalidRequest(msg) => Error::InvalidInput(msg),
            other => Error::External(other.to_string()),
        }
    }
}

// ============================================================================
// Market Data Provider Trait
// ============================================================================

/// Source of daily price history and company profiles.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Provider name used in logs (e.g., "eastmoney")
    fn name(&self) -> &'static str;

    /// Fetch unadjusted daily rows for `symbol` within `[start, end]`.
    ///
    /// Rows come back in ascending date order with `market_cap` filled in.
    /// An empty vector means the provider knows nothing for that range.
    async fn daily_history(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PriceRow>, ProviderError>;

    /// Fetch the company profile for `symbol`.
    async fn stock_profile(&self, symbol: &str) -> Result<StockProfile, ProviderError>;
}
