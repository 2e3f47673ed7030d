//! Multi-year performance history for a single stock.

use serde::Serialize;
use std::ops::RangeInclusive;
use stockscope_common::ReportsConfig;
use tracing::{info, warn};

use super::{PerformanceRow, ReportDirectory, ReportError};

/// Columns of a [`ReportRow`], in display order.
pub const REPORT_COLUMNS: [&str; 8] = [
    "report_period",
    "total_revenue",
    "net_profit",
    "eps",
    "net_asset_per_share",
    "operating_cashflow_per_share",
    "gross_margin",
    "roe",
];

/// One fiscal year of a stock's performance, projected for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRow {
    pub report_period: String,
    pub total_revenue: Option<f64>,
    pub net_profit: Option<f64>,
    pub eps: Option<f64>,
    pub net_asset_per_share: Option<f64>,
    pub operating_cashflow_per_share: Option<f64>,
    pub gross_margin: Option<f64>,
    pub roe: Option<f64>,
}

impl ReportRow {
    fn project(report_period: &str, row: &PerformanceRow) -> Self {
        Self {
            report_period: report_period.to_string(),
            total_revenue: row.total_revenue,
            net_profit: row.net_profit,
            eps: row.eps,
            net_asset_per_share: row.net_asset_per_share,
            operating_cashflow_per_share: row.operating_cashflow_per_share,
            gross_margin: row.gross_margin,
            roe: row.roe,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinancialReport {
    pub stock_abbr: String,
    pub columns: Vec<&'static str>,
    pub rows: Vec<ReportRow>,
}

/// Reads the annual report files for a fixed range of years.
#[derive(Debug, Clone)]
pub struct FinancialReportReader {
    directory: ReportDirectory,
    years: RangeInclusive<i32>,
}

impl FinancialReportReader {
    pub fn new(directory: ReportDirectory, years: RangeInclusive<i32>) -> Self {
        Self { directory, years }
    }

    pub fn from_config(config: &ReportsConfig) -> Self {
        Self::new(
            ReportDirectory::from_config(config),
            config.first_year..=config.last_year,
        )
    }

    /// Collect every year's row for `stock_code`, oldest first.
    ///
    /// Missing yearly files and files without a code column are skipped.
    /// Unreadable files abort the whole read.
    pub fn read(&self, stock_code: &str) -> Result<FinancialReport, ReportError> {
        let code = stock_code.trim();
        let mut stock_abbr: Option<String> = None;
        let mut rows = Vec::new();

        for year in self.years.clone() {
            let file = self.directory.annual(year);
            if !file.path.exists() {
                warn!(path = %file.path.display(), "Report file does not exist");
                continue;
            }

            let Some(records) = file.load()? else {
                warn!(path = %file.path.display(), "Report file has no stock code column, skipping");
                continue;
            };

            for record in records.iter().filter(|r| r.stock_code.trim() == code) {
                stock_abbr.get_or_insert_with(|| record.stock_name.clone());
                rows.push(ReportRow::project(&file.period, record));
            }
        }

        let Some(stock_abbr) = stock_abbr else {
            warn!(code = code, "No performance data found");
            return Err(ReportError::NotFound(code.to_string()));
        };

        info!(code = code, years = rows.len(), "Loaded financial report");
        Ok(FinancialReport {
            stock_abbr,
            columns: REPORT_COLUMNS.to_vec(),
            rows,
        })
    }
}
