//! Screening engine.
//!
//! Finds stocks that meet every threshold in each of the most recent report
//! years, then describes them using the latest report.

use serde::Serialize;
use std::collections::HashSet;
use tracing::{info, warn};

use super::config::ScreeningCriteria;
use crate::reports::{PerformanceRow, ReportDirectory, ReportError};

// ============================================================================
// Screened Stock
// ============================================================================

/// Columns of a [`ScreenedStock`], in display order.
pub const SCREENED_COLUMNS: [&str; 10] = [
    "stock_code",
    "stock_name",
    "eps",
    "total_revenue",
    "net_profit",
    "net_asset_per_share",
    "roe",
    "operating_cashflow_per_share",
    "gross_margin",
    "industry",
];

/// A stock that passed screening, as of the latest report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScreenedStock {
    pub stock_code: String,
    pub stock_name: String,
    pub eps: Option<f64>,
    pub total_revenue: Option<f64>,
    pub net_profit: Option<f64>,
    pub net_asset_per_share: Option<f64>,
    pub roe: Option<f64>,
    pub operating_cashflow_per_share: Option<f64>,
    pub gross_margin: Option<f64>,
    pub industry: Option<String>,
}

impl From<PerformanceRow> for ScreenedStock {
    fn from(row: PerformanceRow) -> Self {
        Self {
            stock_code: row.stock_code,
            stock_name: row.stock_name,
            eps: row.eps,
            total_revenue: row.total_revenue,
            net_profit: row.net_profit,
            net_asset_per_share: row.net_asset_per_share,
            roe: row.roe,
            operating_cashflow_per_share: row.operating_cashflow_per_share,
            gross_margin: row.gross_margin,
            industry: row.industry,
        }
    }
}

// ============================================================================
// Screening Result
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct ScreeningResult {
    pub columns: Vec<&'static str>,
    pub stocks: Vec<ScreenedStock>,
    /// Report periods the criteria were checked against, oldest first
    pub files_considered: Vec<String>,
}

impl ScreeningResult {
    /// `[rows, columns]` of the result table.
    pub fn shape(&self) -> [usize; 2] {
        [self.stocks.len(), self.columns.len()]
    }
}

// ============================================================================
// Screener Engine
// ============================================================================

pub struct ScreenerEngine {
    directory: ReportDirectory,
}

impl ScreenerEngine {
    pub fn new(directory: ReportDirectory) -> Self {
        Self { directory }
    }

    /// Run a screen against the report files on disk.
    pub fn run(&self, criteria: &ScreeningCriteria) -> Result<ScreeningResult, ReportError> {
        let files = self.directory.list()?;
        let years = criteria.years.max(1);

        let selected = if years > files.len() {
            warn!(
                available = files.len(),
                requested = years,
                "Fewer report files than requested years, using all of them"
            );
            &files[..]
        } else {
            &files[files.len() - years..]
        };

        let mut common: Option<HashSet<String>> = None;
        for file in selected {
            let passing: HashSet<String> = file
                .load_required()?
                .into_iter()
                .filter(|row| criteria.passes(row))
                .map(|row| row.stock_code.trim().to_string())
                .collect();

            info!(period = %file.period, passing = passing.len(), "Screened report year");

            common = Some(match common {
                None => passing,
                Some(codes) => codes.intersection(&passing).cloned().collect(),
            });
        }

        let files_considered: Vec<String> = selected.iter().map(|f| f.period.clone()).collect();
        let common = common.unwrap_or_default();

        if common.is_empty() {
            warn!(years = selected.len(), "No stocks met the screening criteria");
            return Ok(ScreeningResult {
                columns: SCREENED_COLUMNS.to_vec(),
                stocks: Vec::new(),
                files_considered,
            });
        }

        // `list` never returns an empty vector
        let latest = &files[files.len() - 1];
        let stocks: Vec<ScreenedStock> = latest
            .load_required()?
            .into_iter()
            .filter(|row| common.contains(row.stock_code.trim()))
            .map(ScreenedStock::from)
            .collect();

        info!(
            matched = stocks.len(),
            latest = %latest.period,
            "Screening complete"
        );

        Ok(ScreeningResult {
            columns: SCREENED_COLUMNS.to_vec(),
            stocks,
            files_considered,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reports::test_support::{line, write_report};
    use tempfile::TempDir;

    fn criteria(years: usize) -> ScreeningCriteria {
        ScreeningCriteria {
            years,
            min_roe: 15.0,
            min_gross_margin: 30.0,
            min_net_profit: 1.0e8,
            min_revenue_growth: 5.0,
            min_net_profit_growth: 5.0,
        }
    }

    fn strong(code: &str, name: &str) -> String {
        line(code, name, "5.0", "1e10", "12", "2e9", "15", "25", "60")
    }

    fn weak(code: &str, name: &str) -> String {
        line(code, name, "0.5", "1e10", "1", "2e9", "1", "5", "20")
    }

    fn engine(dir: &TempDir) -> ScreenerEngine {
        ScreenerEngine::new(ReportDirectory::new(dir.path(), "业绩报表"))
    }

    fn codes(result: &ScreeningResult) -> Vec<&str> {
        result.stocks.iter().map(|s| s.stock_code.as_str()).collect()
    }

    #[test]
    fn test_intersection_across_years() {
        let dir = TempDir::new().unwrap();
        write_report(dir.path(), 2021, &[&strong("000001", "甲"), &strong("000002", "乙"), &weak("000003", "丙")]);
        write_report(dir.path(), 2022, &[&strong("000001", "甲"), &weak("000002", "乙"), &strong("000003", "丙")]);
        write_report(dir.path(), 2023, &[&strong("000003", "丙"), &strong("000002", "乙"), &strong("000001", "甲")]);

        let result = engine(&dir).run(&criteria(2)).unwrap();
        // latest file order is preserved
        assert_eq!(codes(&result), vec!["000003", "000001"]);
        assert_eq!(result.files_considered, vec!["20221231", "20231231"]);
        assert_eq!(result.shape(), [2, 10]);

        let result = engine(&dir).run(&criteria(3)).unwrap();
        assert_eq!(codes(&result), vec!["000001"]);
        assert_eq!(result.stocks[0].stock_name, "甲");
        assert_eq!(result.stocks[0].roe, Some(25.0));
    }

    #[test]
    fn test_more_years_than_files_uses_all() {
        let dir = TempDir::new().unwrap();
        write_report(dir.path(), 2022, &[&strong("000001", "甲")]);
        write_report(dir.path(), 2023, &[&strong("000001", "甲")]);

        let result = engine(&dir).run(&criteria(5)).unwrap();
        assert_eq!(codes(&result), vec!["000001"]);
        assert_eq!(result.files_considered.len(), 2);
    }

    #[test]
    fn test_empty_intersection_is_not_an_error() {
        let dir = TempDir::new().unwrap();
        write_report(dir.path(), 2023, &[&weak("000001", "甲")]);

        let result = engine(&dir).run(&criteria(1)).unwrap();
        assert!(result.stocks.is_empty());
        assert_eq!(result.columns, SCREENED_COLUMNS.to_vec());
        assert_eq!(result.shape(), [0, 10]);
    }

    #[test]
    fn test_missing_metric_fails_threshold() {
        let dir = TempDir::new().unwrap();
        let no_margin = line("000001", "甲", "5.0", "1e10", "12", "2e9", "15", "25", "");
        write_report(dir.path(), 2023, &[&no_margin]);

        assert!(engine(&dir).run(&criteria(1)).unwrap().stocks.is_empty());
    }

    fn zero_thresholds(years: usize) -> ScreeningCriteria {
        ScreeningCriteria {
            years,
            min_roe: 0.0,
            min_gross_margin: 0.0,
            min_net_profit: 0.0,
            min_revenue_growth: 0.0,
            min_net_profit_growth: 0.0,
        }
    }

    #[test]
    fn test_zero_thresholds_single_year_returns_all() {
        let dir = TempDir::new().unwrap();
        write_report(dir.path(), 2022, &[&strong("000009", "旧"), &weak("000001", "甲")]);
        write_report(
            dir.path(),
            2023,
            &[&strong("000001", "甲"), &weak("000002", "乙"), &line("000003", "丙", "0", "0", "0", "0", "0", "0", "0")],
        );

        let result = engine(&dir).run(&zero_thresholds(1)).unwrap();
        assert_eq!(codes(&result), vec!["000001", "000002", "000003"]);
        assert_eq!(result.files_considered, vec!["20231231"]);
    }

    #[test]
    fn test_zero_thresholds_exclude_negative_and_missing_metrics() {
        let dir = TempDir::new().unwrap();
        let shrinking = line("000002", "乙", "5.0", "1e10", "-5", "2e9", "15", "25", "60");
        let no_margin = line("000003", "丙", "5.0", "1e10", "12", "2e9", "15", "25", "");
        write_report(dir.path(), 2023, &[&strong("000001", "甲"), &shrinking, &no_margin]);

        let result = engine(&dir).run(&zero_thresholds(1)).unwrap();
        assert_eq!(codes(&result), vec!["000001"]);
    }

    #[test]
    fn test_monotone_in_years() {
        let dir = TempDir::new().unwrap();
        write_report(dir.path(), 2020, &[&strong("000001", "甲"), &weak("000002", "乙")]);
        write_report(dir.path(), 2021, &[&strong("000001", "甲"), &strong("000002", "乙")]);
        write_report(dir.path(), 2022, &[&strong("000001", "甲"), &strong("000002", "乙")]);

        let mut previous = usize::MAX;
        for years in 1..=3 {
            let count = engine(&dir).run(&criteria(years)).unwrap().stocks.len();
            assert!(count <= previous);
            previous = count;
        }
        assert_eq!(previous, 1);
    }

    #[test]
    fn test_no_report_files() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            engine(&dir).run(&criteria(1)),
            Err(ReportError::NoReportFiles { .. })
        ));
    }

    #[test]
    fn test_unreadable_selected_file_is_fatal() {
        let dir = TempDir::new().unwrap();
        write_report(dir.path(), 2022, &[&line("000001", "甲", "x", "1", "1", "1", "1", "1", "1")]);
        write_report(dir.path(), 2023, &[&strong("000001", "甲")]);

        assert!(matches!(
            engine(&dir).run(&criteria(2)),
            Err(ReportError::Read { .. })
        ));
        // the broken year is outside a one-year window
        assert!(engine(&dir).run(&criteria(1)).is_ok());
    }
}
