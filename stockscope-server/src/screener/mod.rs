//! Multi-year fundamental screener over the report files.
//!
//! # Usage
//!
//! ```ignore
//! use stockscope_server::reports::ReportDirectory;
//! use stockscope_server::screener::{ScreenerEngine, ScreeningCriteria};
//!
//! let engine = ScreenerEngine::new(ReportDirectory::new("financial_reports", "业绩报表"));
//! let result = engine.run(&criteria)?;
//! ```

pub mod config;
pub mod engine;

pub use config::ScreeningCriteria;
pub use engine::{ScreenedStock, ScreenerEngine, ScreeningResult, SCREENED_COLUMNS};
