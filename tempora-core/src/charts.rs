//! Chart rendering
//!
//! A [`ChartRenderer`] takes aggregate rows exactly as the engine returns
//! them and produces an opaque encoded image as a string. The bundled
//! [`SvgChartRenderer`] draws plain SVG and base64-encodes it, which is
//! enough to embed as a `data:image/svg+xml;base64,...` URL.

use base64::Engine as _;

use crate::error::Result;
use crate::types::{DistributionRow, EfficiencyRow, PeakHourBucket, TrendPoint};

/// Turns aggregate rows into an encoded chart image.
pub trait ChartRenderer {
    fn time_distribution(&self, rows: &[DistributionRow]) -> Result<String>;
    fn productivity_trends(&self, points: &[TrendPoint]) -> Result<String>;
    fn peak_hours(&self, buckets: &[PeakHourBucket]) -> Result<String>;
    fn category_efficiency(&self, rows: &[EfficiencyRow]) -> Result<String>;
}

/// `value / max`, or zero when `max` is not positive.
pub fn normalize(value: f64, max: f64) -> f64 {
    if max > 0.0 {
        value / max
    } else {
        0.0
    }
}

fn max_of(values: impl Iterator<Item = f64>) -> f64 {
    values.fold(0.0, f64::max)
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

const PALETTE: [&str; 6] = ["#4e79a7", "#f28e2b", "#59a14f", "#e15759", "#76b7b2", "#b07aa1"];

/// Simple SVG charts, base64-encoded.
#[derive(Debug, Clone)]
pub struct SvgChartRenderer {
    pub width: u32,
    pub height: u32,
}

impl Default for SvgChartRenderer {
    fn default() -> Self {
        Self {
            width: 720,
            height: 360,
        }
    }
}

impl SvgChartRenderer {
    fn document(&self, title: &str, body: &str) -> String {
        format!(
            concat!(
                r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" "#,
                r#"viewBox="0 0 {w} {h}" font-family="sans-serif" font-size="11">"#,
                r#"<text x="{cx}" y="18" text-anchor="middle" font-size="14">{title}</text>"#,
                "{body}</svg>"
            ),
            w = self.width,
            h = self.height,
            cx = self.width / 2,
            title = escape(title),
            body = body,
        )
    }

    fn encode(svg: &str) -> String {
        base64::engine::general_purpose::STANDARD.encode(svg.as_bytes())
    }

    /// Plot area as (left, top, width, height).
    fn plot_area(&self) -> (f64, f64, f64, f64) {
        let left = 40.0;
        let top = 32.0;
        (
            left,
            top,
            f64::from(self.width) - left - 16.0,
            f64::from(self.height) - top - 40.0,
        )
    }

    /// Vertical bars with labels under each one.
    fn bars(&self, bars: &[(String, f64)], fade_by_value: bool) -> String {
        let (left, top, width, height) = self.plot_area();
        let max = max_of(bars.iter().map(|(_, v)| *v));
        let slot = if bars.is_empty() {
            0.0
        } else {
            width / bars.len() as f64
        };

        let mut body = String::new();
        for (i, (label, value)) in bars.iter().enumerate() {
            let share = normalize(*value, max);
            let bar_height = share * height;
            let x = left + slot * i as f64 + slot * 0.1;
            let opacity = if fade_by_value { 0.3 + 0.7 * share } else { 0.8 };
            body.push_str(&format!(
                r#"<rect class="bar" x="{:.1}" y="{:.1}" width="{:.1}" height="{:.1}" fill="{}" fill-opacity="{:.2}"/>"#,
                x,
                top + height - bar_height,
                slot * 0.8,
                bar_height,
                PALETTE[i % PALETTE.len()],
                opacity,
            ));
            body.push_str(&format!(
                r#"<text x="{:.1}" y="{:.1}" text-anchor="middle">{}</text>"#,
                x + slot * 0.4,
                top + height + 14.0,
                escape(label),
            ));
        }
        body
    }
}

impl ChartRenderer for SvgChartRenderer {
    /// Share of time per category as one stacked bar.
    fn time_distribution(&self, rows: &[DistributionRow]) -> Result<String> {
        let (left, top, width, _) = self.plot_area();
        let total: f64 = rows.iter().map(|r| r.total_hours).sum();

        let mut body = String::new();
        let mut x = left;
        for (i, row) in rows.iter().enumerate() {
            let share = normalize(row.total_hours, total);
            let segment = share * width;
            body.push_str(&format!(
                r#"<rect class="segment" x="{:.1}" y="{:.1}" width="{:.1}" height="48" fill="{}"/>"#,
                x,
                top + 20.0,
                segment,
                PALETTE[i % PALETTE.len()],
            ));
            body.push_str(&format!(
                r#"<text x="{:.1}" y="{:.1}">{} {:.1}%</text>"#,
                left,
                top + 90.0 + 16.0 * i as f64,
                escape(&capitalize(&row.category)),
                share * 100.0,
            ));
            x += segment;
        }

        Ok(Self::encode(
            &self.document("Time Distribution by Category", &body),
        ))
    }

    /// Productive hours per day as a line.
    fn productivity_trends(&self, points: &[TrendPoint]) -> Result<String> {
        let (left, top, width, height) = self.plot_area();
        let max = max_of(points.iter().map(|p| p.productive_hours));
        let step = if points.len() > 1 {
            width / (points.len() - 1) as f64
        } else {
            0.0
        };

        let coords: Vec<(f64, f64)> = points
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let x = left + step * i as f64;
                let y = top + height - normalize(p.productive_hours, max) * height;
                (x, y)
            })
            .collect();

        let mut body = String::new();
        let polyline: Vec<String> = coords
            .iter()
            .map(|(x, y)| format!("{:.1},{:.1}", x, y))
            .collect();
        body.push_str(&format!(
            r#"<polyline points="{}" fill="none" stroke="{}" stroke-width="2"/>"#,
            polyline.join(" "),
            PALETTE[0],
        ));
        for ((x, y), point) in coords.iter().zip(points) {
            body.push_str(&format!(
                r#"<circle class="point" cx="{:.1}" cy="{:.1}" r="4" fill="{}"/>"#,
                x, y, PALETTE[0],
            ));
            body.push_str(&format!(
                r#"<text x="{:.1}" y="{:.1}" text-anchor="middle">{}</text>"#,
                x,
                y - 8.0,
                escape(&point.day_name),
            ));
            body.push_str(&format!(
                r#"<text x="{:.1}" y="{:.1}" text-anchor="middle">{}</text>"#,
                x,
                top + height + 14.0,
                point.date.format("%b %d"),
            ));
        }

        Ok(Self::encode(&self.document("Productivity Trends", &body)))
    }

    /// Work hours per hour of day; bar opacity tracks the value.
    fn peak_hours(&self, buckets: &[PeakHourBucket]) -> Result<String> {
        let bars: Vec<(String, f64)> = buckets.iter().map(|b| (b.label(), b.hours)).collect();
        Ok(Self::encode(
            &self.document("Peak Productivity Hours", &self.bars(&bars, true)),
        ))
    }

    fn category_efficiency(&self, rows: &[EfficiencyRow]) -> Result<String> {
        let bars: Vec<(String, f64)> = rows
            .iter()
            .map(|r| (capitalize(&r.category), r.avg_duration_hours))
            .collect();
        Ok(Self::encode(&self.document(
            "Average Event Length (hours)",
            &self.bars(&bars, false),
        )))
    }
}
