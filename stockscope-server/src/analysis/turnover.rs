//! Log-turnover distribution and 2σ outlier detection.
//!
//! Turnover rates are treated as log-normal: statistics are taken over
//! `ln(turnover)` and mapped back with `exp` for display.

use serde::Serialize;
use statrs::statistics::Statistics;
use stockscope_common::util::round_to;
use tracing::{debug, warn};

use crate::data::PriceRow;

/// Band positions in units of σ around μ.
pub const BAND_SIGMAS: [f64; 5] = [-2.0, -1.0, 0.0, 1.0, 2.0];

/// Mean and sample standard deviation of `ln(turnover)`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogDistribution {
    pub log_turnover: Vec<f64>,
    pub mean: f64,
    pub std_dev: f64,
}

impl LogDistribution {
    /// Build from raw turnover rates, keeping only strictly positive ones.
    ///
    /// Returns `None` when no rate qualifies. A single value has σ = 0.
    pub fn from_rates<I>(rates: I) -> Option<Self>
    where
        I: IntoIterator<Item = Option<f64>>,
    {
        let log_turnover: Vec<f64> = rates
            .into_iter()
            .flatten()
            .filter(|rate| *rate > 0.0)
            .map(f64::ln)
            .collect();

        if log_turnover.is_empty() {
            return None;
        }

        let mean = log_turnover.iter().mean();
        let std_dev = if log_turnover.len() > 1 {
            log_turnover.iter().std_dev()
        } else {
            0.0
        };

        Some(Self {
            log_turnover,
            mean,
            std_dev,
        })
    }

    pub fn band(&self) -> TurnoverBand {
        TurnoverBand::from_moments(self.mean, self.std_dev)
    }
}

/// The five reference lines μ-2σ .. μ+2σ in log space and as turnover %.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TurnoverBand {
    pub log_edges: [f64; 5],
    /// `exp(log_edges)`, rounded to 2 decimals for display
    pub real_edges: [f64; 5],
    /// `exp(μ-2σ)`, unrounded
    #[serde(skip)]
    pub lower_threshold: f64,
    /// `exp(μ+2σ)`, unrounded
    #[serde(skip)]
    pub upper_threshold: f64,
}

impl TurnoverBand {
    pub fn from_moments(mean: f64, std_dev: f64) -> Self {
        let log_edges = BAND_SIGMAS.map(|k| mean + k * std_dev);
        let real_edges = log_edges.map(|edge| round_to(edge.exp(), 2));

        Self {
            log_edges,
            real_edges,
            lower_threshold: log_edges[0].exp(),
            upper_threshold: log_edges[4].exp(),
        }
    }

    /// Which side of the ±2σ band a turnover rate falls on, if outside it.
    ///
    /// Missing and non-positive rates never classify.
    pub fn classify(&self, turnover_rate: Option<f64>) -> Option<OutlierSide> {
        let rate = turnover_rate.filter(|r| *r > 0.0)?;
        if rate < self.lower_threshold {
            Some(OutlierSide::Below)
        } else if rate > self.upper_threshold {
            Some(OutlierSide::Above)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutlierSide {
    Below,
    Above,
}

/// Distribution, band and the rows outside ±2σ.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TurnoverStatistics {
    #[serde(flatten)]
    pub distribution: LogDistribution,
    pub band: TurnoverBand,
    pub below: Vec<PriceRow>,
    pub above: Vec<PriceRow>,
}

/// Compute turnover statistics for a price series.
///
/// `None` when the series has no strictly positive turnover.
pub fn analyze(rows: &[PriceRow]) -> Option<TurnoverStatistics> {
    let Some(distribution) = LogDistribution::from_rates(rows.iter().map(PriceRow::positive_turnover))
    else {
        warn!(rows = rows.len(), "No valid turnover data");
        return None;
    };

    let band = distribution.band();
    let mut below = Vec::new();
    let mut above = Vec::new();

    for row in rows {
        match band.classify(row.turnover_rate) {
            Some(OutlierSide::Below) => below.push(row.clone()),
            Some(OutlierSide::Above) => above.push(row.clone()),
            None => {}
        }
    }

    debug!(
        samples = distribution.log_turnover.len(),
        mean = distribution.mean,
        std_dev = distribution.std_dev,
        below = below.len(),
        above = above.len(),
        "Computed turnover statistics"
    );

    Some(TurnoverStatistics {
        distribution,
        band,
        below,
        above,
    })
}
