//! Yearly performance report files (业绩报表).
//!
//! Each file is a full-market CSV export for one fiscal year, named
//! `<prefix>_<YYYY>1231.csv`. The report period is taken from the file name.

mod reader;

pub use reader::{FinancialReport, FinancialReportReader, ReportRow, REPORT_COLUMNS};

use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};
use stockscope_common::{Error, ReportsConfig};
use thiserror::Error as ThisError;
use tracing::debug;

use crate::csv_source;

/// Header of the stock code column, plus its accepted alias.
pub const CODE_COLUMN: &str = "股票代码";
const CODE_COLUMN_ALIAS: &str = "stock_code";

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, ThisError)]
pub enum ReportError {
    #[error("No performance data found for stock code {0}")]
    NotFound(String),

    #[error("Failed to read {path}: {message}")]
    Read { path: String, message: String },

    #[error("No report files matching {pattern} in {dir}")]
    NoReportFiles { dir: String, pattern: String },

    #[error("Report directory does not exist: {0}")]
    NoReportDirectory(String),
}

impl From<ReportError> for Error {
    fn from(err: ReportError) -> Self {
        match err {
            ReportError::NotFound(_) => Error::NotFound(err.to_string()),
            ReportError::Read { path, message } => Error::DataRead { path, message },
            ReportError::NoReportFiles { .. } => Error::Internal(err.to_string()),
            ReportError::NoReportDirectory(_) => Error::Config(err.to_string()),
        }
    }
}

// ============================================================================
// Performance Row
// ============================================================================

/// One stock in one fiscal year.
///
/// Headers follow the upstream export; English snake_case names are accepted
/// as aliases.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PerformanceRow {
    #[serde(rename = "股票代码", alias = "stock_code")]
    pub stock_code: String,

    #[serde(rename = "股票简称", alias = "stock_name", default)]
    pub stock_name: String,

    #[serde(rename = "每股收益", alias = "eps", default, deserialize_with = "lenient_f64")]
    pub eps: Option<f64>,

    #[serde(
        rename = "营业总收入-营业总收入",
        alias = "total_revenue",
        default,
        deserialize_with = "lenient_f64"
    )]
    pub total_revenue: Option<f64>,

    #[serde(
        rename = "营业总收入-同比增长",
        alias = "revenue_growth",
        default,
        deserialize_with = "lenient_f64"
    )]
    pub revenue_growth: Option<f64>,

    #[serde(
        rename = "营业总收入-季度环比增长",
        alias = "revenue_qoq_growth",
        default,
        deserialize_with = "lenient_f64"
    )]
    pub revenue_qoq_growth: Option<f64>,

    #[serde(
        rename = "净利润-净利润",
        alias = "net_profit",
        default,
        deserialize_with = "lenient_f64"
    )]
    pub net_profit: Option<f64>,

    #[serde(
        rename = "净利润-同比增长",
        alias = "net_profit_growth",
        default,
        deserialize_with = "lenient_f64"
    )]
    pub net_profit_growth: Option<f64>,

    #[serde(
        rename = "净利润-季度环比增长",
        alias = "net_profit_qoq_growth",
        default,
        deserialize_with = "lenient_f64"
    )]
    pub net_profit_qoq_growth: Option<f64>,

    #[serde(
        rename = "每股净资产",
        alias = "net_asset_per_share",
        default,
        deserialize_with = "lenient_f64"
    )]
    pub net_asset_per_share: Option<f64>,

    #[serde(rename = "净资产收益率", alias = "roe", default, deserialize_with = "lenient_f64")]
    pub roe: Option<f64>,

    #[serde(
        rename = "每股经营现金流量",
        alias = "operating_cashflow_per_share",
        default,
        deserialize_with = "lenient_f64"
    )]
    pub operating_cashflow_per_share: Option<f64>,

    #[serde(
        rename = "销售毛利率",
        alias = "gross_margin",
        default,
        deserialize_with = "lenient_f64"
    )]
    pub gross_margin: Option<f64>,

    #[serde(rename = "所处行业", alias = "industry", default)]
    pub industry: Option<String>,

    #[serde(rename = "最新公告日期", alias = "announcement_date", default)]
    pub announcement_date: Option<String>,
}

/// Parse a numeric cell; blanks and `-`, `--`, `nan` are missing.
pub fn parse_cell(raw: &str) -> Result<Option<f64>, String> {
    match raw.trim() {
        "" | "-" | "--" => Ok(None),
        s if s.eq_ignore_ascii_case("nan") => Ok(None),
        s => s
            .parse::<f64>()
            .map(Some)
            .map_err(|_| format!("invalid number: {}", s)),
    }
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw {
        Some(s) => parse_cell(&s).map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}

// ============================================================================
// Report Files
// ============================================================================

/// A report file and the period (`YYYYMMDD`) encoded in its name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportFile {
    pub path: PathBuf,
    pub period: String,
}

impl ReportFile {
    fn read_error(&self, message: impl Into<String>) -> ReportError {
        ReportError::Read {
            path: self.path.display().to_string(),
            message: message.into(),
        }
    }

    /// Parse every row. `Ok(None)` when the file has no stock code column.
    pub fn load(&self) -> Result<Option<Vec<PerformanceRow>>, ReportError> {
        let text = csv_source::read_utf8(&self.path).map_err(|e| self.read_error(e.to_string()))?;
        let mut reader = csv_source::reader(&text);

        let headers = reader
            .headers()
            .map_err(|e| self.read_error(e.to_string()))?;
        if !headers
            .iter()
            .any(|h| h == CODE_COLUMN || h == CODE_COLUMN_ALIAS)
        {
            return Ok(None);
        }

        let rows = reader
            .deserialize::<PerformanceRow>()
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| self.read_error(e.to_string()))?;

        debug!(path = %self.path.display(), rows = rows.len(), "Loaded report file");
        Ok(Some(rows))
    }

    /// Like [`load`](Self::load), but a missing code column is an error.
    pub fn load_required(&self) -> Result<Vec<PerformanceRow>, ReportError> {
        self.load()?
            .ok_or_else(|| self.read_error(format!("missing {} column", CODE_COLUMN)))
    }
}

/// The configured report directory and file naming.
#[derive(Debug, Clone)]
pub struct ReportDirectory {
    root: PathBuf,
    prefix: String,
}

impl ReportDirectory {
    pub fn new(root: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            prefix: prefix.into(),
        }
    }

    pub fn from_config(config: &ReportsConfig) -> Self {
        Self::new(&config.directory, &config.file_prefix)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Fail when the directory itself is missing.
    pub fn ensure_exists(&self) -> Result<(), ReportError> {
        if self.root.is_dir() {
            Ok(())
        } else {
            Err(ReportError::NoReportDirectory(self.root.display().to_string()))
        }
    }

    /// The annual report for `year` (period `<year>1231`), present or not.
    pub fn annual(&self, year: i32) -> ReportFile {
        let period = format!("{}1231", year);
        ReportFile {
            path: self.root.join(format!("{}_{}.csv", self.prefix, period)),
            period,
        }
    }

    /// Every `<prefix>_*.csv` file, sorted by file name.
    pub fn list(&self) -> Result<Vec<ReportFile>, ReportError> {
        let no_files = || ReportError::NoReportFiles {
            dir: self.root.display().to_string(),
            pattern: format!("{}_*.csv", self.prefix),
        };

        let entries = std::fs::read_dir(&self.root).map_err(|_| no_files())?;
        let stem_prefix = format!("{}_", self.prefix);

        let mut files: Vec<ReportFile> = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().is_file())
            .filter_map(|entry| {
                let name = entry.file_name().into_string().ok()?;
                let period = name.strip_prefix(&stem_prefix)?.strip_suffix(".csv")?;
                Some(ReportFile {
                    path: entry.path(),
                    period: period.to_string(),
                })
            })
            .collect();

        if files.is_empty() {
            return Err(no_files());
        }

        files.sort_by(|a, b| a.path.file_name().cmp(&b.path.file_name()));
        Ok(files)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::fs;
    use std::path::Path;

    pub const HEADER: &str = "序号,股票代码,股票简称,每股收益,营业总收入-营业总收入,营业总收入-同比增长,营业总收入-季度环比增长,净利润-净利润,净利润-同比增长,净利润-季度环比增长,每股净资产,净资产收益率,每股经营现金流量,销售毛利率,所处行业,最新公告日期";

    /// Write `<dir>/业绩报表_<year>1231.csv` with a BOM and the given data lines.
    pub fn write_report(dir: &Path, year: i32, lines: &[&str]) {
        let mut body = format!("\u{feff}{}\n", HEADER);
        for line in lines {
            body.push_str(line);
            body.push('\n');
        }
        fs::write(dir.join(format!("业绩报表_{}1231.csv", year)), body).unwrap();
    }

    /// A data line: code, name, eps, revenue, revenue growth, net profit,
    /// profit growth, roe, gross margin.
    #[allow(clippy::too_many_arguments)]
    pub fn line(
        code: &str,
        name: &str,
        eps: &str,
        revenue: &str,
        revenue_growth: &str,
        net_profit: &str,
        profit_growth: &str,
        roe: &str,
        gross_margin: &str,
    ) -> String {
        format!(
            "1,{code},{name},{eps},{revenue},{revenue_growth},1.0,{net_profit},{profit_growth},2.0,10.5,{roe},3.2,{gross_margin},银行,2024-03-15"
        )
    }
}
