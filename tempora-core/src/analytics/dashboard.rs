//! Dashboard bundle: all four views for one user plus a few headline figures.

use serde::Serialize;

use crate::types::{DistributionRow, EfficiencyRow, PeakHourBucket, TrendPoint};

/// The four aggregate views computed together.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyticsDashboard {
    /// Hours per category, largest first
    pub distribution: Vec<DistributionRow>,
    /// Productive hours per day, oldest first
    pub trends: Vec<TrendPoint>,
    /// Work hours by start hour, always 24 entries
    pub peak_hours: Vec<PeakHourBucket>,
    /// Average event length per category
    pub efficiency: Vec<EfficiencyRow>,
}

impl AnalyticsDashboard {
    /// Hour with the most work time; earliest hour wins a tie.
    ///
    /// `None` when no work was recorded.
    pub fn peak_hour(&self) -> Option<u8> {
        let mut best: Option<&PeakHourBucket> = None;
        for bucket in &self.peak_hours {
            if bucket.hours > best.map_or(0.0, |b| b.hours) {
                best = Some(bucket);
            }
        }
        best.map(|b| b.hour)
    }

    /// Most productive day in the trend, if any day had productive time.
    pub fn best_day(&self) -> Option<&TrendPoint> {
        let mut best: Option<&TrendPoint> = None;
        for point in &self.trends {
            if point.productive_hours > best.map_or(0.0, |b| b.productive_hours) {
                best = Some(point);
            }
        }
        best
    }

    /// Hours across every category in the distribution window.
    pub fn total_tracked_hours(&self) -> f64 {
        self.distribution.iter().map(|row| row.total_hours).sum()
    }

    /// Productive hours across the whole trend.
    pub fn total_productive_hours(&self) -> f64 {
        self.trends.iter().map(|point| point.productive_hours).sum()
    }

    /// Format the peak hour for display (e.g., "2pm-3pm").
    pub fn format_peak_hour(&self) -> String {
        match self.peak_hour() {
            Some(hour) => format_hour_range(hour),
            None => "none".to_string(),
        }
    }
}

/// Format an hour as a one-hour range, e.g. `9` -> "9am-10am".
pub fn format_hour_range(hour: u8) -> String {
    let hour = u32::from(hour) % 24;
    let next_hour = (hour + 1) % 24;

    let format_hour = |h: u32| -> String {
        match h {
            0 => "12am".to_string(),
            1..=11 => format!("{}am", h),
            12 => "12pm".to_string(),
            _ => format!("{}pm", h - 12),
        }
    };

    format!("{}-{}", format_hour(hour), format_hour(next_hour))
}
