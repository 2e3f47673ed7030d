//! Frequency histogram of log turnover, rendered as a base64 SVG.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Serialize;
use std::fmt::Write;
use tracing::{debug, warn};

use super::turnover::TurnoverStatistics;

/// Equal-width buckets between the series min and max.
pub const BUCKETS: usize = 30;

pub const SVG_MIME: &str = "image/svg+xml";

const BAR_FILL: &str = "#87ceeb";
const REFERENCE_COLOR: &str = "green";
const GRID_COLOR: &str = "#dddddd";

/// Rendered chart, base64-encoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistogramImage {
    pub mime: &'static str,
    pub data: String,
}

/// Bucket counts over `[lo, hi]`; the last bucket is closed on the right.
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    pub lo: f64,
    pub hi: f64,
    pub counts: Vec<usize>,
}

impl Histogram {
    pub fn from_values(values: &[f64], buckets: usize) -> Option<Self> {
        if values.is_empty() || buckets == 0 {
            return None;
        }

        let (mut lo, mut hi) = values
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                (lo.min(*v), hi.max(*v))
            });
        if lo == hi {
            lo -= 0.5;
            hi += 0.5;
        }

        let width = (hi - lo) / buckets as f64;
        let mut counts = vec![0; buckets];
        for v in values {
            let idx = (((v - lo) / width).floor() as usize).min(buckets - 1);
            counts[idx] += 1;
        }

        Some(Self { lo, hi, counts })
    }

    pub fn bucket_width(&self) -> f64 {
        (self.hi - self.lo) / self.counts.len() as f64
    }

    pub fn max_count(&self) -> usize {
        self.counts.iter().copied().max().unwrap_or(0)
    }
}

/// SVG renderer for [`TurnoverStatistics`].
#[derive(Debug, Clone)]
pub struct HistogramRenderer {
    width: f64,
    height: f64,
    buckets: usize,
}

impl Default for HistogramRenderer {
    fn default() -> Self {
        Self {
            width: 1200.0,
            height: 600.0,
            buckets: BUCKETS,
        }
    }
}

/// Plot-area geometry shared by the drawing helpers.
struct Frame {
    left: f64,
    top: f64,
    width: f64,
    height: f64,
    x_min: f64,
    x_max: f64,
    y_max: f64,
}

impl Frame {
    fn x(&self, v: f64) -> f64 {
        self.left + (v - self.x_min) / (self.x_max - self.x_min) * self.width
    }

    fn y(&self, count: f64) -> f64 {
        self.top + self.height - count / self.y_max * self.height
    }

    fn bottom(&self) -> f64 {
        self.top + self.height
    }
}

impl HistogramRenderer {
    /// Render the chart for `name`, or `None` when there are no statistics.
    pub fn render(
        &self,
        stats: Option<&TurnoverStatistics>,
        name: &str,
    ) -> Option<HistogramImage> {
        let Some(stats) = stats else {
            warn!(stock = name, "Cannot render histogram without turnover statistics");
            return None;
        };

        let svg = self.render_svg(stats, name)?;
        debug!(stock = name, bytes = svg.len(), "Rendered turnover histogram");

        Some(HistogramImage {
            mime: SVG_MIME,
            data: STANDARD.encode(svg.as_bytes()),
        })
    }

    /// Raw SVG document.
    pub fn render_svg(&self, stats: &TurnoverStatistics, name: &str) -> Option<String> {
        let hist = Histogram::from_values(&stats.distribution.log_turnover, self.buckets)?;
        let edges = stats.band.log_edges;

        // x range covers the data and every reference line, plus 5% margins
        let lo = hist.lo.min(edges[0]);
        let hi = hist.hi.max(edges[4]);
        let pad = (hi - lo) * 0.05;
        let frame = Frame {
            left: 90.0,
            top: 60.0,
            width: self.width - 120.0,
            height: self.height - 130.0,
            x_min: lo - pad,
            x_max: hi + pad,
            y_max: (hist.max_count() as f64 * 1.05).max(1.0),
        };

        let mut svg = String::with_capacity(16 * 1024);
        self.write_document(&mut svg, &frame, &hist, stats, name).ok()?;
        Some(svg)
    }

    fn write_document(
        &self,
        svg: &mut String,
        frame: &Frame,
        hist: &Histogram,
        stats: &TurnoverStatistics,
        name: &str,
    ) -> std::fmt::Result {
        writeln!(
            svg,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}" font-family="sans-serif">"#,
            w = self.width,
            h = self.height
        )?;
        writeln!(svg, r#"<rect width="100%" height="100%" fill="white"/>"#)?;

        write_grid(svg, frame)?;

        let bucket_width = hist.bucket_width();
        for (i, count) in hist.counts.iter().enumerate() {
            if *count == 0 {
                continue;
            }
            let x0 = frame.x(hist.lo + i as f64 * bucket_width);
            let x1 = frame.x(hist.lo + (i + 1) as f64 * bucket_width);
            let y = frame.y(*count as f64);
            writeln!(
                svg,
                r#"<rect x="{:.2}" y="{:.2}" width="{:.2}" height="{:.2}" fill="{}" fill-opacity="0.7" stroke="black" stroke-width="1"/>"#,
                x0,
                y,
                x1 - x0,
                frame.bottom() - y,
                BAR_FILL
            )?;
        }

        let label_y = frame.y(frame.y_max * 0.8);
        for (log_edge, real_edge) in stats.band.log_edges.iter().zip(stats.band.real_edges) {
            let x = frame.x(*log_edge);
            writeln!(
                svg,
                r#"<line x1="{x:.2}" y1="{:.2}" x2="{x:.2}" y2="{:.2}" stroke="{c}" stroke-width="1" stroke-dasharray="6,4"/>"#,
                frame.top,
                frame.bottom(),
                c = REFERENCE_COLOR
            )?;
            for (offset, text) in [
                (4.0, format!("ln(x)={:.2}", log_edge)),
                (16.0, format!("换手率≈{:.2}%", real_edge)),
            ] {
                let tx = x + offset;
                writeln!(
                    svg,
                    r#"<text x="{tx:.2}" y="{label_y:.2}" transform="rotate(-90 {tx:.2} {label_y:.2})" text-anchor="end" font-size="12" fill="{c}">{}</text>"#,
                    escape_xml(&text),
                    c = REFERENCE_COLOR
                )?;
            }
        }

        writeln!(
            svg,
            r#"<rect x="{:.2}" y="{:.2}" width="{:.2}" height="{:.2}" fill="none" stroke="black" stroke-width="1"/>"#,
            frame.left, frame.top, frame.width, frame.height
        )?;

        write_text(
            svg,
            self.width / 2.0,
            35.0,
            19,
            &format!("{} 对数换手率的频数直方图", name),
            None,
        )?;
        write_text(
            svg,
            frame.left + frame.width / 2.0,
            self.height - 20.0,
            16,
            "对数换手率 ln(换手率)",
            None,
        )?;
        write_text(
            svg,
            30.0,
            frame.top + frame.height / 2.0,
            16,
            "出现次数",
            Some(-90),
        )?;

        writeln!(svg, "</svg>")
    }
}

fn write_grid(svg: &mut String, frame: &Frame) -> std::fmt::Result {
    const X_TICKS: usize = 6;
    for i in 0..=X_TICKS {
        let v = frame.x_min + (frame.x_max - frame.x_min) * i as f64 / X_TICKS as f64;
        let x = frame.x(v);
        writeln!(
            svg,
            r#"<line x1="{x:.2}" y1="{:.2}" x2="{x:.2}" y2="{:.2}" stroke="{GRID_COLOR}" stroke-width="1"/>"#,
            frame.top,
            frame.bottom()
        )?;
        writeln!(
            svg,
            r#"<text x="{x:.2}" y="{:.2}" text-anchor="middle" font-size="12">{v:.2}</text>"#,
            frame.bottom() + 18.0
        )?;
    }

    let step = ((frame.y_max / 5.0).ceil() as usize).max(1);
    let mut tick = 0;
    while (tick as f64) <= frame.y_max {
        let y = frame.y(tick as f64);
        writeln!(
            svg,
            r#"<line x1="{:.2}" y1="{y:.2}" x2="{:.2}" y2="{y:.2}" stroke="{GRID_COLOR}" stroke-width="1"/>"#,
            frame.left,
            frame.left + frame.width
        )?;
        writeln!(
            svg,
            r#"<text x="{:.2}" y="{:.2}" text-anchor="end" font-size="12">{tick}</text>"#,
            frame.left - 8.0,
            y + 4.0
        )?;
        tick += step;
    }
    Ok(())
}

fn write_text(
    svg: &mut String,
    x: f64,
    y: f64,
    size: u32,
    text: &str,
    rotate: Option<i32>,
) -> std::fmt::Result {
    let transform = rotate
        .map(|deg| format!(r#" transform="rotate({deg} {x:.2} {y:.2})""#))
        .unwrap_or_default();
    writeln!(
        svg,
        r#"<text x="{x:.2}" y="{y:.2}"{transform} text-anchor="middle" font-size="{size}">{}</text>"#,
        escape_xml(text)
    )
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::turnover::analyze;
    use crate::data::test_support::row;
    use crate::data::PriceRow;

    fn sample_stats() -> TurnoverStatistics {
        let rows: Vec<PriceRow> = (1..=28)
            .map(|d| row(d, Some(0.5 + d as f64 * 0.1)))
            .collect();
        analyze(&rows).unwrap()
    }

    fn decode(image: &HistogramImage) -> String {
        String::from_utf8(STANDARD.decode(&image.data).unwrap()).unwrap()
    }

    #[test]
    fn test_bucket_counts() {
        let values = [0.0, 0.1, 0.5, 0.99, 1.0];
        let hist = Histogram::from_values(&values, 2).unwrap();
        assert_eq!(hist.counts, vec![2, 3]);
        assert_eq!(hist.counts.iter().sum::<usize>(), values.len());
    }

    #[test]
    fn test_degenerate_range_is_widened() {
        let hist = Histogram::from_values(&[1.0, 1.0, 1.0], BUCKETS).unwrap();
        assert_eq!(hist.lo, 0.5);
        assert_eq!(hist.hi, 1.5);
        assert_eq!(hist.counts.len(), BUCKETS);
        assert_eq!(hist.max_count(), 3);
    }

    #[test]
    fn test_empty_values() {
        assert!(Histogram::from_values(&[], BUCKETS).is_none());
    }

    #[test]
    fn test_render_none_without_stats() {
        let renderer = HistogramRenderer::default();
        assert!(renderer.render(None, "平安银行").is_none());
    }

    #[test]
    fn test_render_contains_title_and_reference_labels() {
        let stats = sample_stats();
        let image = HistogramRenderer::default()
            .render(Some(&stats), "平安银行")
            .unwrap();
        assert_eq!(image.mime, SVG_MIME);

        let svg = decode(&image);
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains("平安银行 对数换手率的频数直方图"));
        assert_eq!(svg.matches("stroke-dasharray").count(), 5);
        assert_eq!(svg.matches("ln(x)=").count(), 5);
        assert_eq!(svg.matches("换手率≈").count(), 5);
        assert!(svg.contains(&format!("换手率≈{:.2}%", stats.band.real_edges[2])));
    }

    #[test]
    fn test_render_is_deterministic() {
        let stats = sample_stats();
        let renderer = HistogramRenderer::default();
        assert_eq!(
            renderer.render(Some(&stats), "平安银行"),
            renderer.render(Some(&stats), "平安银行")
        );
    }

    #[test]
    fn test_render_svg_writes_complete_document() {
        let svg = HistogramRenderer::default()
            .render_svg(&sample_stats(), "平安银行")
            .unwrap();
        assert!(svg.starts_with("<svg"));
        assert!(svg.trim_end().ends_with("</svg>"));
        assert_eq!(svg.matches("<svg").count(), 1);
    }

    #[test]
    fn test_title_is_escaped() {
        let stats = sample_stats();
        let svg = HistogramRenderer::default()
            .render_svg(&stats, "A&B<C>")
            .unwrap();
        assert!(svg.contains("A&amp;B&lt;C&gt;"));
    }
}
