//! Market-cap extremes and the sorted top-N slice of a price series.

use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use std::cmp::Ordering;
use std::str::FromStr;

use crate::data::{slash_date, PriceRow};

/// Rows kept in the summary table.
pub const TOP_ROWS: usize = 50;

/// Column a price table can be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortColumn {
    Date,
    Open,
    Close,
    High,
    Low,
    Amount,
    Volume,
    PctChange,
    #[default]
    TurnoverRate,
    MarketCap,
}

impl SortColumn {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Date => "date",
            Self::Open => "open",
            Self::Close => "close",
            Self::High => "high",
            Self::Low => "low",
            Self::Amount => "amount",
            Self::Volume => "volume",
            Self::PctChange => "pct_change",
            Self::TurnoverRate => "turnover_rate",
            Self::MarketCap => "market_cap",
        }
    }

    /// Sort key for a row; `None` sorts last.
    fn key(&self, row: &PriceRow) -> Option<f64> {
        match self {
            Self::Date => Some(f64::from(row.date.num_days_from_ce())),
            Self::Open => Some(row.open),
            Self::Close => Some(row.close),
            Self::High => Some(row.high),
            Self::Low => Some(row.low),
            Self::Amount => Some(row.amount),
            Self::Volume => Some(row.volume),
            Self::PctChange => Some(row.pct_change),
            Self::TurnoverRate => row.turnover_rate,
            Self::MarketCap => row.market_cap,
        }
        .filter(|v| !v.is_nan())
    }
}

impl FromStr for SortColumn {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "date" | "日期" => Ok(Self::Date),
            "open" | "开盘" => Ok(Self::Open),
            "close" | "收盘" => Ok(Self::Close),
            "high" | "最高" => Ok(Self::High),
            "low" | "最低" => Ok(Self::Low),
            "amount" | "成交额" => Ok(Self::Amount),
            "volume" | "成交量" => Ok(Self::Volume),
            "pct_change" | "涨跌幅" => Ok(Self::PctChange),
            "turnover_rate" | "换手率" => Ok(Self::TurnoverRate),
            "market_cap" | "市值（亿）" | "市值(亿)" => Ok(Self::MarketCap),
            other => Err(format!("Unknown sort column: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Ascending,
    #[default]
    Descending,
}

impl SortOrder {
    /// `asc` is ascending; anything else, including nothing, is descending.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some(s) if s.eq_ignore_ascii_case("asc") => Self::Ascending,
            _ => Self::Descending,
        }
    }
}

/// A market cap on a given day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MarketCapPoint {
    #[serde(with = "slash_date")]
    pub date: NaiveDate,
    pub market_cap: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct MarketCapExtremes {
    pub max: Option<MarketCapPoint>,
    pub min: Option<MarketCapPoint>,
}

/// Largest and smallest derived market cap; the earliest row wins ties.
pub fn market_cap_extremes(rows: &[PriceRow]) -> MarketCapExtremes {
    let points = rows.iter().filter_map(|row| {
        row.market_cap
            .filter(|cap| !cap.is_nan())
            .map(|market_cap| MarketCapPoint {
                date: row.date,
                market_cap,
            })
    });

    points.fold(MarketCapExtremes::default(), |mut acc, point| {
        if acc.max.map_or(true, |m| point.market_cap > m.market_cap) {
            acc.max = Some(point);
        }
        if acc.min.map_or(true, |m| point.market_cap < m.market_cap) {
            acc.min = Some(point);
        }
        acc
    })
}

/// First `limit` rows by `column` in `order`, returned in date order.
///
/// The sort is stable and rows without a value go last in either order.
pub fn top_rows(
    rows: &[PriceRow],
    column: SortColumn,
    order: SortOrder,
    limit: usize,
) -> Vec<PriceRow> {
    let mut sorted: Vec<&PriceRow> = rows.iter().collect();
    sorted.sort_by(|a, b| match (column.key(a), column.key(b)) {
        (Some(x), Some(y)) => {
            let ord = x.partial_cmp(&y).unwrap_or(Ordering::Equal);
            match order {
                SortOrder::Ascending => ord,
                SortOrder::Descending => ord.reverse(),
            }
        }
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });

    let mut top: Vec<PriceRow> = sorted.into_iter().take(limit).cloned().collect();
    top.sort_by_key(|r| r.date);
    top
}
