//! The aggregation engine
//!
//! Four independent read-only views over one user's events:
//!
//! | View | Window | Categories | Empty buckets |
//! |------|--------|------------|---------------|
//! | time distribution | trailing N days (default 30) | all | omitted |
//! | productivity trends | each of the last N calendar days (default 7) | [`PRODUCTIVE_CATEGORIES`] | zero-filled |
//! | peak hours | trailing N days (default 30) | [`PEAK_HOURS_CATEGORY`] | zero-filled |
//! | category efficiency | all time | [`EFFICIENCY_CATEGORIES`] | omitted |
//!
//! Every view is a pure function of the store contents, the inputs and
//! "now". The `*_at` variants take "now" explicitly; the plain variants
//! read the system clock.
//!
//! Calendar days and hours of the day are taken in the engine's fixed
//! offset (UTC unless configured).

use chrono::{DateTime, Duration, FixedOffset, Offset, Timelike, Utc};

use crate::config::AnalyticsConfig;
use crate::error::Result;
use crate::store::{EventFilter, EventStore, TypeFilter};
use crate::types::{
    round2, DistributionRow, EfficiencyRow, Event, PeakHourBucket, TrendPoint,
    EFFICIENCY_CATEGORIES, PEAK_HOURS_CATEGORY, PRODUCTIVE_CATEGORIES,
};
use crate::window::{local_date, TimeWindow};

use super::dashboard::AnalyticsDashboard;

/// Default trailing window for the time distribution.
pub const DEFAULT_DISTRIBUTION_DAYS: u32 = 30;
/// Default length of the productivity trend.
pub const DEFAULT_TREND_DAYS: u32 = 7;
/// Default trailing window for peak hours.
pub const DEFAULT_PEAK_DAYS: u32 = 30;
/// Longest trend series a config may request.
pub const MAX_TREND_DAYS: u32 = 366;
/// Longest trailing window a config may request for distribution and peak hours.
pub const MAX_WINDOW_DAYS: u32 = 36_600;

/// Computes aggregate views from an [`EventStore`].
///
/// Holds no mutable state; one instance may serve any number of users and
/// concurrent callers as long as the store allows shared reads.
pub struct TimeAnalytics<'a, S: EventStore + ?Sized> {
    store: &'a S,
    offset: FixedOffset,
}

impl<'a, S: EventStore + ?Sized> TimeAnalytics<'a, S> {
    /// Engine over `store`, using UTC calendar days.
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            offset: Utc.fix(),
        }
    }

    /// Engine using the offset from `config`.
    pub fn from_config(store: &'a S, config: &AnalyticsConfig) -> Result<Self> {
        Ok(Self::new(store).with_offset(config.offset()?))
    }

    /// Use `offset` for calendar days and hour-of-day.
    pub fn with_offset(mut self, offset: FixedOffset) -> Self {
        self.offset = offset;
        self
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    // ============================================
    // Time distribution
    // ============================================

    /// Hours per category over the last `days` days.
    pub fn time_distribution(&self, user_id: &str, days: u32) -> Result<Vec<DistributionRow>> {
        self.time_distribution_at(user_id, days, Utc::now())
    }

    pub fn time_distribution_at(
        &self,
        user_id: &str,
        days: u32,
        now: DateTime<Utc>,
    ) -> Result<Vec<DistributionRow>> {
        self.time_distribution_in(user_id, &TimeWindow::trailing_days(now, days))
    }

    /// Hours per category for events starting inside `window`.
    ///
    /// Ordered by total hours descending. Only categories with at least one
    /// matching event appear.
    pub fn time_distribution_in(
        &self,
        user_id: &str,
        window: &TimeWindow,
    ) -> Result<Vec<DistributionRow>> {
        let filter = EventFilter::for_user(user_id).started_within(*window);
        let rows: Vec<DistributionRow> = self
            .store
            .aggregate_by_type(&filter)?
            .into_iter()
            .filter(|totals| totals.event_count > 0)
            .map(|totals| DistributionRow {
                category: totals.event_type,
                total_hours: totals.total_hours.max(0.0),
                event_count: totals.event_count,
            })
            .collect();

        tracing::debug!(
            user_id,
            start = %window.start,
            end = %window.end,
            categories = rows.len(),
            "Computed time distribution"
        );
        Ok(rows)
    }

    // ============================================
    // Productivity trends
    // ============================================

    /// Productive hours for each of the last `days` calendar days, oldest first.
    pub fn productivity_trends(&self, user_id: &str, days: u32) -> Result<Vec<TrendPoint>> {
        self.productivity_trends_at(user_id, days, Utc::now())
    }

    /// One point per calendar day ending with the day containing `now`.
    ///
    /// Days without productive events yield `0.0`; hours are rounded to two
    /// decimals per day.
    pub fn productivity_trends_at(
        &self,
        user_id: &str,
        days: u32,
        now: DateTime<Utc>,
    ) -> Result<Vec<TrendPoint>> {
        let today = local_date(now, self.offset);
        let productive = TypeFilter::any_of(&PRODUCTIVE_CATEGORIES);
        let mut trends = Vec::with_capacity(days.min(MAX_TREND_DAYS) as usize);

        // Walk back from today, then flip to oldest-first. The series stops
        // early only when it runs past the earliest representable date.
        for back in 0..days {
            let Some(date) = today.checked_sub_signed(Duration::days(i64::from(back))) else {
                break;
            };
            let filter = EventFilter::for_user(user_id)
                .started_within(TimeWindow::day(date, self.offset))
                .of_type(productive.clone());
            let productive_hours: f64 = self
                .store
                .find(&filter)?
                .iter()
                .map(Event::duration_hours)
                .sum();

            trends.push(TrendPoint {
                date,
                productive_hours: round2(productive_hours),
                day_name: date.format("%A").to_string(),
            });
        }
        trends.reverse();

        tracing::debug!(user_id, days, %today, "Computed productivity trends");
        Ok(trends)
    }

    // ============================================
    // Peak hours
    // ============================================

    /// Work hours by hour-of-day over the last `days` days.
    pub fn peak_hours(&self, user_id: &str, days: u32) -> Result<Vec<PeakHourBucket>> {
        self.peak_hours_at(user_id, days, Utc::now())
    }

    /// Always 24 buckets, hour 0 first.
    ///
    /// Each event's whole duration lands in the bucket of its start hour,
    /// however many hours it spans.
    pub fn peak_hours_at(
        &self,
        user_id: &str,
        days: u32,
        now: DateTime<Utc>,
    ) -> Result<Vec<PeakHourBucket>> {
        let filter = EventFilter::for_user(user_id)
            .started_within(TimeWindow::trailing_days(now, days))
            .of_type(TypeFilter::Equals(PEAK_HOURS_CATEGORY.to_string()));
        let events = self.store.find(&filter)?;

        let mut hour_distribution = [0.0f64; 24];
        for event in &events {
            let Some(start) = event.start_time else {
                continue;
            };
            let hour = start.with_timezone(&self.offset).hour() as usize;
            hour_distribution[hour] += event.duration_hours();
        }

        tracing::debug!(user_id, days, events = events.len(), "Computed peak hours");
        Ok(hour_distribution
            .iter()
            .enumerate()
            .map(|(hour, &hours)| PeakHourBucket {
                hour: hour as u8,
                hours,
            })
            .collect())
    }

    // ============================================
    // Category efficiency
    // ============================================

    /// Average event length per category, across all time.
    ///
    /// Walks [`EFFICIENCY_CATEGORIES`] in order and skips categories the user
    /// has no events in.
    pub fn category_efficiency(&self, user_id: &str) -> Result<Vec<EfficiencyRow>> {
        let mut rows = Vec::new();

        for category in EFFICIENCY_CATEGORIES {
            let filter = EventFilter::for_user(user_id)
                .of_type(TypeFilter::Equals(category.to_string()));
            let events = self.store.find(&filter)?;
            if events.is_empty() {
                continue;
            }

            let total_hours: f64 = events.iter().map(Event::duration_hours).sum();
            rows.push(EfficiencyRow {
                category: category.to_string(),
                avg_duration_hours: round2(total_hours / events.len() as f64),
                total_events: events.len() as i64,
            });
        }

        tracing::debug!(user_id, categories = rows.len(), "Computed category efficiency");
        Ok(rows)
    }

    // ============================================
    // Dashboard
    // ============================================

    /// All four views using the windows from `config`.
    pub fn dashboard(&self, user_id: &str, config: &AnalyticsConfig) -> Result<AnalyticsDashboard> {
        self.dashboard_at(user_id, config, Utc::now())
    }

    pub fn dashboard_at(
        &self,
        user_id: &str,
        config: &AnalyticsConfig,
        now: DateTime<Utc>,
    ) -> Result<AnalyticsDashboard> {
        Ok(AnalyticsDashboard {
            distribution: self.time_distribution_at(user_id, config.distribution_days, now)?,
            trends: self.productivity_trends_at(user_id, config.trend_days, now)?,
            peak_hours: self.peak_hours_at(user_id, config.peak_days, now)?,
            efficiency: self.category_efficiency(user_id)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::store::{CategoryTotals, MemoryStore};
    use chrono::{NaiveDate, TimeZone};

    fn now() -> DateTime<Utc> {
        // A Friday
        Utc.with_ymd_and_hms(2024, 3, 15, 18, 0, 0).unwrap()
    }

    fn at(d: u32, h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, d, h, m, 0).unwrap()
    }

    fn hours(d: u32, h: u32, len_minutes: i64, category: &str) -> Event {
        let start = at(d, h, 0);
        Event::new("u1", category, start, start + Duration::minutes(len_minutes))
    }

    struct FailingStore;

    impl EventStore for FailingStore {
        fn find(&self, _filter: &EventFilter) -> Result<Vec<Event>> {
            Err(Error::StoreUnavailable("connection refused".to_string()))
        }
    }

    #[test]
    fn test_distribution_groups_and_sorts() {
        let store = MemoryStore::new(vec![
            hours(14, 9, 60, "work"),
            hours(13, 9, 120, "work"),
            hours(12, 9, 180, "work"),
        ]);
        let engine = TimeAnalytics::new(&store);

        let rows = engine.time_distribution_at("u1", 30, now()).unwrap();
        assert_eq!(
            rows,
            vec![DistributionRow {
                category: "work".to_string(),
                total_hours: 6.0,
                event_count: 3,
            }]
        );
    }

    #[test]
    fn test_distribution_respects_window_and_clamps() {
        let mut reversed = hours(10, 12, 60, "personal");
        reversed.end_time = Some(at(10, 11, 0));
        let store = MemoryStore::new(vec![
            hours(10, 9, 30, "health"),
            reversed,
            hours(10, 20, 90, "personal"),
            // outside the 30 day window
            Event::new("u1", "work", at(1, 9, 0) - Duration::days(40), at(1, 10, 0) - Duration::days(40)),
            // other user
            Event::new("u2", "work", at(10, 9, 0), at(10, 17, 0)),
        ]);
        let engine = TimeAnalytics::new(&store);

        let rows = engine.time_distribution_at("u1", 30, now()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].category, "personal");
        assert_eq!(rows[0].total_hours, 1.5);
        assert_eq!(rows[0].event_count, 2);
        assert_eq!(rows[1].category, "health");
        assert!(rows.iter().all(|r| r.total_hours >= 0.0));
        assert_eq!(rows.iter().map(|r| r.event_count).sum::<i64>(), 3);
    }

    #[test]
    fn test_trends_single_day() {
        let store = MemoryStore::new(vec![hours(15, 9, 150, "work")]);
        let engine = TimeAnalytics::new(&store);

        let trends = engine.productivity_trends_at("u1", 1, now()).unwrap();
        assert_eq!(
            trends,
            vec![TrendPoint {
                date: NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(),
                productive_hours: 2.5,
                day_name: "Friday".to_string(),
            }]
        );
    }

    #[test]
    fn test_trends_are_consecutive_oldest_first() {
        let store = MemoryStore::new(vec![
            hours(13, 8, 45, "health"),
            hours(13, 10, 20, "learning"),
            hours(13, 12, 600, "personal"),
            hours(11, 9, 60, "work"),
        ]);
        let engine = TimeAnalytics::new(&store);

        let trends = engine.productivity_trends_at("u1", 7, now()).unwrap();
        assert_eq!(trends.len(), 7);
        assert_eq!(trends[0].date, NaiveDate::from_ymd_opt(2024, 3, 9).unwrap());
        assert_eq!(trends[6].date, NaiveDate::from_ymd_opt(2024, 3, 15).unwrap());
        for pair in trends.windows(2) {
            assert_eq!(pair[1].date - pair[0].date, Duration::days(1));
        }

        let by_day: Vec<f64> = trends.iter().map(|t| t.productive_hours).collect();
        assert_eq!(by_day, vec![0.0, 0.0, 1.0, 0.0, 1.08, 0.0, 0.0]);
        assert_eq!(trends[0].day_name, "Saturday");
    }

    #[test]
    fn test_huge_windows_do_not_overflow() {
        let store = MemoryStore::new(vec![
            hours(15, 9, 60, "work"),
            Event::new(
                "u1",
                "work",
                DateTime::<Utc>::MIN_UTC,
                DateTime::<Utc>::MIN_UTC + Duration::hours(2),
            ),
        ]);
        let engine = TimeAnalytics::new(&store);

        let rows = engine.time_distribution_at("u1", 200_000_000, now()).unwrap();
        assert_eq!(rows[0].total_hours, 3.0);
        assert_eq!(rows[0].event_count, 2);

        let buckets = engine.peak_hours_at("u1", u32::MAX, now()).unwrap();
        assert_eq!(buckets.iter().map(|b| b.hours).sum::<f64>(), 3.0);

        let config = AnalyticsConfig {
            distribution_days: 200_000_000,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_trends_round_half_to_even() {
        // 7m30s is 0.125h and 37m30s is 0.625h
        let store = MemoryStore::new(vec![
            Event::new("u1", "work", at(15, 9, 0), at(15, 9, 7) + Duration::seconds(30)),
            Event::new("u1", "learning", at(14, 9, 0), at(14, 9, 37) + Duration::seconds(30)),
        ]);
        let engine = TimeAnalytics::new(&store);

        let trends = engine.productivity_trends_at("u1", 2, now()).unwrap();
        assert_eq!(trends[0].productive_hours, 0.62);
        assert_eq!(trends[1].productive_hours, 0.12);

        let efficiency = engine.category_efficiency("u1").unwrap();
        assert_eq!(efficiency[0].avg_duration_hours, 0.12);
    }

    #[test]
    fn test_trends_zero_days() {
        let store = MemoryStore::default();
        let engine = TimeAnalytics::new(&store);
        assert!(engine.productivity_trends_at("u1", 0, now()).unwrap().is_empty());
    }

    #[test]
    fn test_trends_use_local_days() {
        // 23:00 UTC on the 14th is 01:00 on the 15th at +02:00
        let store = MemoryStore::new(vec![hours(14, 23, 60, "work")]);
        let plus_two = FixedOffset::east_opt(2 * 3600).unwrap();

        let utc_trends = TimeAnalytics::new(&store)
            .productivity_trends_at("u1", 2, now())
            .unwrap();
        assert_eq!(utc_trends[0].productive_hours, 1.0);
        assert_eq!(utc_trends[1].productive_hours, 0.0);

        let local_trends = TimeAnalytics::new(&store)
            .with_offset(plus_two)
            .productivity_trends_at("u1", 2, now())
            .unwrap();
        assert_eq!(local_trends[0].productive_hours, 0.0);
        assert_eq!(local_trends[1].productive_hours, 1.0);
    }

    #[test]
    fn test_peak_hours_buckets_by_start_hour() {
        let store = MemoryStore::new(vec![
            hours(14, 9, 60, "work"),
            Event::new("u1", "work", at(13, 9, 40), at(13, 10, 10)),
            hours(14, 15, 60, "health"),
        ]);
        let engine = TimeAnalytics::new(&store);

        let buckets = engine.peak_hours_at("u1", 30, now()).unwrap();
        assert_eq!(buckets.len(), 24);
        for (i, bucket) in buckets.iter().enumerate() {
            assert_eq!(bucket.hour as usize, i);
            if i == 9 {
                assert_eq!(bucket.hours, 1.5);
            } else {
                assert_eq!(bucket.hours, 0.0);
            }
        }
    }

    #[test]
    fn test_peak_hours_long_event_not_split() {
        let store = MemoryStore::new(vec![hours(14, 22, 300, "work")]);
        let engine = TimeAnalytics::new(&store);

        let buckets = engine.peak_hours_at("u1", 30, now()).unwrap();
        assert_eq!(buckets[22].hours, 5.0);
        assert_eq!(buckets.iter().map(|b| b.hours).sum::<f64>(), 5.0);
    }

    #[test]
    fn test_efficiency_fixed_order_and_omission() {
        let store = MemoryStore::new(vec![
            hours(1, 9, 60, "other"),
            hours(2, 9, 60, "work"),
            hours(3, 9, 120, "work"),
            hours(4, 9, 40, "work"),
            hours(5, 9, 600, "learning"),
        ]);
        let engine = TimeAnalytics::new(&store);

        let rows = engine.category_efficiency("u1").unwrap();
        assert_eq!(
            rows,
            vec![
                EfficiencyRow {
                    category: "work".to_string(),
                    avg_duration_hours: 1.22,
                    total_events: 3,
                },
                EfficiencyRow {
                    category: "other".to_string(),
                    avg_duration_hours: 1.0,
                    total_events: 1,
                },
            ]
        );
    }

    #[test]
    fn test_empty_user_gets_well_formed_results() {
        let store = MemoryStore::default();
        let engine = TimeAnalytics::new(&store);

        assert!(engine.time_distribution_at("nobody", 30, now()).unwrap().is_empty());
        let trends = engine.productivity_trends_at("nobody", 7, now()).unwrap();
        assert_eq!(trends.len(), 7);
        assert!(trends.iter().all(|t| t.productive_hours == 0.0));
        let buckets = engine.peak_hours_at("nobody", 30, now()).unwrap();
        assert_eq!(buckets.len(), 24);
        assert!(buckets.iter().all(|b| b.hours == 0.0));
        assert!(engine.category_efficiency("nobody").unwrap().is_empty());
    }

    #[test]
    fn test_store_failure_propagates() {
        let engine = TimeAnalytics::new(&FailingStore);

        assert!(matches!(
            engine.time_distribution_at("u1", 30, now()),
            Err(Error::StoreUnavailable(_))
        ));
        assert!(engine.productivity_trends_at("u1", 7, now()).is_err());
        assert!(engine.peak_hours_at("u1", 30, now()).is_err());
        assert!(engine.category_efficiency("u1").is_err());
    }

    #[test]
    fn test_store_side_aggregation_is_used() {
        struct Pushdown;

        impl EventStore for Pushdown {
            fn find(&self, _filter: &EventFilter) -> Result<Vec<Event>> {
                Ok(vec![])
            }

            fn aggregate_by_type(&self, _filter: &EventFilter) -> Result<Vec<CategoryTotals>> {
                Ok(vec![CategoryTotals {
                    event_type: "work".to_string(),
                    total_hours: 2.0,
                    event_count: 1,
                }])
            }
        }

        let rows = TimeAnalytics::new(&Pushdown)
            .time_distribution_at("u1", 30, now())
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].total_hours, 2.0);
    }

    #[test]
    fn test_repeated_calls_are_identical() {
        let store = MemoryStore::new(vec![
            hours(14, 9, 61, "work"),
            hours(14, 11, 17, "health"),
            hours(12, 7, 33, "personal"),
        ]);
        let engine = TimeAnalytics::new(&store);
        let config = AnalyticsConfig::default();

        let first = engine.dashboard_at("u1", &config, now()).unwrap();
        let second = engine.dashboard_at("u1", &config, now()).unwrap();
        assert_eq!(first, second);
    }
}
