//! Price series analysis: turnover distribution, histogram, summary table.

pub mod histogram;
pub mod price_table;
pub mod turnover;

pub use histogram::{HistogramImage, HistogramRenderer};
pub use price_table::{
    market_cap_extremes, top_rows, MarketCapExtremes, MarketCapPoint, SortColumn, SortOrder,
    TOP_ROWS,
};
pub use turnover::{analyze, TurnoverBand, TurnoverStatistics};
