//! Screening criteria.

use crate::reports::PerformanceRow;

/// Thresholds a stock must meet in every one of the last `years` reports.
///
/// Each metric is a lower bound; a missing metric never passes.
#[derive(Debug, Clone, PartialEq)]
pub struct ScreeningCriteria {
    /// Number of most recent report files to require (>= 1)
    pub years: usize,
    /// Minimum return on equity (%)
    pub min_roe: f64,
    /// Minimum gross margin (%)
    pub min_gross_margin: f64,
    /// Minimum net profit (yuan)
    pub min_net_profit: f64,
    /// Minimum year-over-year revenue growth (%)
    pub min_revenue_growth: f64,
    /// Minimum year-over-year net profit growth (%)
    pub min_net_profit_growth: f64,
}

impl ScreeningCriteria {
    pub fn passes(&self, row: &PerformanceRow) -> bool {
        let at_least = |value: Option<f64>, min: f64| value.map_or(false, |v| v >= min);

        at_least(row.roe, self.min_roe)
            && at_least(row.gross_margin, self.min_gross_margin)
            && at_least(row.net_profit, self.min_net_profit)
            && at_least(row.revenue_growth, self.min_revenue_growth)
            && at_least(row.net_profit_growth, self.min_net_profit_growth)
    }
}
