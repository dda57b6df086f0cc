//! tempora-report - time analytics for calendar events
//!
//! Print where a user's time goes: category distribution, daily productive
//! hours, peak working hours and average event length.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use tempora_core::analytics::format_hour_range;
use tempora_core::charts::normalize;
use tempora_core::{
    AnalyticsDashboard, CalendarPeriod, ChartRenderer, Config, Database, Event, SvgChartRenderer,
    TimeAnalytics,
};

#[derive(Parser, Debug)]
#[command(name = "tempora-report")]
#[command(about = "Time analytics for your calendar")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print analytics for one user
    Report(ReportArgs),
    /// Load a JSON array of events into the database
    Import {
        /// Path to the JSON file
        file: PathBuf,
    },
}

#[derive(Args, Debug)]
struct ReportArgs {
    /// User whose events are analysed
    #[arg(long)]
    user: String,

    /// Window length in days for every view (default: from config)
    #[arg(long)]
    days: Option<u32>,

    /// Which view to print
    #[arg(long, value_enum, default_value_t = View::All)]
    view: View,

    /// Export format (md = markdown, json = JSON, chart = base64 SVG payloads)
    #[arg(long)]
    export: Option<String>,

    /// Distribution for a single day (format: YYYY-MM-DD)
    #[arg(long, conflicts_with_all = ["week", "month", "year"])]
    day: Option<NaiveDate>,

    /// Distribution for the Monday-Sunday week containing a date (format: YYYY-MM-DD)
    #[arg(long, conflicts_with_all = ["month", "year"])]
    week: Option<NaiveDate>,

    /// Distribution for a month (format: YYYY-MM)
    #[arg(long, conflicts_with = "year")]
    month: Option<String>,

    /// Distribution for a year
    #[arg(long)]
    year: Option<i32>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum View {
    All,
    Distribution,
    Trends,
    Peak,
    Efficiency,
}

/// Everything the printers need.
struct Report {
    user: String,
    view: View,
    has_events: bool,
    window_days: u32,
    dashboard: AnalyticsDashboard,
    period: Option<PeriodSummary>,
}

/// Calendar period picked with --day/--week/--month/--year.
struct PeriodSummary {
    name: String,
    events: usize,
    previous_hours: f64,
}

impl Report {
    fn shows(&self, view: View) -> bool {
        self.view == View::All || self.view == view
    }

    fn distribution_heading(&self) -> String {
        match &self.period {
            Some(period) => period.name.clone(),
            None => format!("last {} days", self.window_days),
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration and database
    let config = Config::load().context("failed to load configuration")?;
    let _log_guard = tempora_core::logging::init(&config.logging).ok();

    let db_path = Config::database_path();
    let db = Database::open(&db_path).context("failed to open database")?;
    db.migrate().context("failed to run migrations")?;

    match cli.command {
        Command::Report(args) => run_report(&db, &config, args),
        Command::Import { file } => run_import(&db, &file),
    }
}

fn run_import(db: &Database, file: &Path) -> Result<()> {
    let content = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let events: Vec<Event> =
        serde_json::from_str(&content).context("failed to parse events JSON")?;

    let malformed = events.iter().filter(|e| e.is_malformed()).count();
    let inserted = db.insert_events(&events).context("failed to store events")?;
    tracing::info!(file = %file.display(), inserted, malformed, "Imported events");

    println!("Imported {} events from {}", inserted, file.display());
    if malformed > 0 {
        println!("   {} malformed (counted as zero hours)", malformed);
    }
    Ok(())
}

fn parse_period(args: &ReportArgs) -> Result<Option<CalendarPeriod>> {
    if let Some(date) = args.day {
        return Ok(Some(CalendarPeriod::Day(date)));
    }
    if let Some(date) = args.week {
        return Ok(Some(CalendarPeriod::Week(date)));
    }
    if let Some(month_str) = &args.month {
        // Parse YYYY-MM format
        let parts: Vec<&str> = month_str.split('-').collect();
        if parts.len() != 2 {
            anyhow::bail!("Invalid month format. Use YYYY-MM (e.g., 2024-12)");
        }
        let year: i32 = parts[0].parse().context("Invalid year")?;
        let month: u32 = parts[1].parse().context("Invalid month")?;
        if !(1..=12).contains(&month) {
            anyhow::bail!("Month must be between 1 and 12");
        }
        return Ok(Some(CalendarPeriod::Month(year, month)));
    }
    Ok(args.year.map(CalendarPeriod::Year))
}

fn run_report(db: &Database, config: &Config, args: ReportArgs) -> Result<()> {
    let period = parse_period(&args)?;

    let mut analytics_config = config.analytics.clone();
    if let Some(days) = args.days {
        analytics_config.distribution_days = days;
        analytics_config.trend_days = days;
        analytics_config.peak_days = days;
    }
    analytics_config
        .validate()
        .context("invalid analytics settings")?;

    let analytics = TimeAnalytics::from_config(db, &analytics_config)
        .context("invalid analytics settings")?;
    let mut dashboard = analytics
        .dashboard(&args.user, &analytics_config)
        .context("failed to compute analytics")?;

    let period = match period {
        Some(period) => {
            let offset = analytics.offset();
            dashboard.distribution = analytics
                .time_distribution_in(&args.user, &period.window(offset)?)
                .context("failed to compute period distribution")?;
            let previous = analytics
                .time_distribution_in(&args.user, &period.previous().window(offset)?)
                .context("failed to compute previous period distribution")?;
            let events = db
                .events_in_period(&args.user, &period, offset)
                .context("failed to list period events")?;
            Some(PeriodSummary {
                name: period.display_name(),
                events: events.len(),
                previous_hours: previous.iter().map(|row| row.total_hours).sum(),
            })
        }
        None => None,
    };

    let report = Report {
        has_events: db.count_events(&args.user).context("failed to count events")? > 0,
        user: args.user,
        view: args.view,
        window_days: analytics_config.distribution_days,
        dashboard,
        period,
    };

    // Output based on export format
    match args.export.as_deref() {
        Some("json") => print_json(&report)?,
        Some("md") => print_markdown(&report),
        Some("chart") => print_charts(&report)?,
        Some(other) => anyhow::bail!(
            "Unknown export format: {}. Use 'md', 'json' or 'chart'",
            other
        ),
        None => print_terminal(&report),
    }

    Ok(())
}

fn bar(value: f64, max: f64, width: usize) -> String {
    "█".repeat((normalize(value, max) * width as f64).round() as usize)
}

fn print_terminal(report: &Report) {
    let title = format!("Time analytics for {}", report.user);
    let dashboard = &report.dashboard;

    // Header
    println!();
    println!("╭{}╮", "─".repeat(60));
    println!("│{:^60}│", title);
    println!("╰{}╯", "─".repeat(60));
    println!();

    if !report.has_events {
        println!("  No events recorded for this user.");
        println!();
        return;
    }

    if report.shows(View::Distribution) {
        println!("TIME DISTRIBUTION ({})", report.distribution_heading());
        let total = dashboard.total_tracked_hours();
        if dashboard.distribution.is_empty() {
            println!("   No events in this window.");
        }
        for row in &dashboard.distribution {
            println!(
                "   {:<12} {:>7.2}h {:>4} event{}  {:>5.1}%",
                row.category,
                row.total_hours,
                row.event_count,
                if row.event_count == 1 { " " } else { "s" },
                normalize(row.total_hours, total) * 100.0
            );
        }
        if let Some(period) = &report.period {
            println!(
                "   {} events, {:.2}h tracked ({:.2}h the period before)",
                period.events, total, period.previous_hours
            );
        }
        println!();
    }

    if report.shows(View::Trends) {
        println!("PRODUCTIVITY TRENDS");
        let max = dashboard
            .trends
            .iter()
            .map(|point| point.productive_hours)
            .fold(0.0, f64::max);
        for point in &dashboard.trends {
            println!(
                "   {} {:<9} {:>6.2}h  {}",
                point.date.format("%b %d"),
                point.day_name,
                point.productive_hours,
                bar(point.productive_hours, max, 24)
            );
        }
        println!(
            "   Total: {:.2}h productive",
            dashboard.total_productive_hours()
        );
        println!();
    }

    if report.shows(View::Peak) {
        println!("PEAK HOURS");
        println!("   Peak hour: {}", dashboard.format_peak_hour());
        let max = dashboard
            .peak_hours
            .iter()
            .map(|bucket| bucket.hours)
            .fold(0.0, f64::max);
        for bucket in dashboard.peak_hours.iter().filter(|b| b.hours > 0.0) {
            println!(
                "   {}  {:>6.2}h  {}",
                bucket.label(),
                bucket.hours,
                bar(bucket.hours, max, 24)
            );
        }
        println!();
    }

    if report.shows(View::Efficiency) {
        println!("CATEGORY EFFICIENCY");
        for row in &dashboard.efficiency {
            println!(
                "   {:<12} avg {:>5.2}h over {} event{}",
                row.category,
                row.avg_duration_hours,
                row.total_events,
                if row.total_events == 1 { "" } else { "s" }
            );
        }
        println!();
    }
}

fn print_markdown(report: &Report) {
    let dashboard = &report.dashboard;

    println!("# Time analytics for {}", report.user);
    println!();

    if !report.has_events {
        println!("*No events recorded for this user.*");
        return;
    }

    if report.shows(View::Distribution) {
        println!("## Time Distribution ({})", report.distribution_heading());
        println!();
        println!("| Category | Hours | Events |");
        println!("|----------|-------|--------|");
        for row in &dashboard.distribution {
            println!(
                "| {} | {:.2} | {} |",
                row.category, row.total_hours, row.event_count
            );
        }
        println!();
        if let Some(period) = &report.period {
            println!(
                "- **Events in period:** {}\n- **Previous period:** {:.2}h",
                period.events, period.previous_hours
            );
            println!();
        }
    }

    if report.shows(View::Trends) {
        println!("## Productivity Trends");
        println!();
        println!("| Date | Day | Productive hours |");
        println!("|------|-----|------------------|");
        for point in &dashboard.trends {
            println!(
                "| {} | {} | {:.2} |",
                point.date, point.day_name, point.productive_hours
            );
        }
        println!();
    }

    if report.shows(View::Peak) {
        println!("## Peak Hours");
        println!();
        println!("- **Peak hour:** {}", dashboard.format_peak_hour());
        for bucket in dashboard.peak_hours.iter().filter(|b| b.hours > 0.0) {
            println!(
                "- {}: {:.2}h",
                format_hour_range(bucket.hour),
                bucket.hours
            );
        }
        println!();
    }

    if report.shows(View::Efficiency) {
        println!("## Category Efficiency");
        println!();
        println!("| Category | Avg hours | Events |");
        println!("|----------|-----------|--------|");
        for row in &dashboard.efficiency {
            println!(
                "| {} | {:.2} | {} |",
                row.category, row.avg_duration_hours, row.total_events
            );
        }
        println!();
    }

    println!("---");
    println!("*Generated by tempora-report*");
}

fn print_json(report: &Report) -> Result<()> {
    let dashboard = &report.dashboard;
    let mut json = serde_json::Map::new();

    json.insert("user".into(), serde_json::json!(report.user));
    json.insert(
        "period".into(),
        serde_json::json!(report.period.as_ref().map(|p| serde_json::json!({
            "name": p.name,
            "events": p.events,
            "previous_hours": p.previous_hours,
        }))),
    );
    if report.shows(View::Distribution) {
        json.insert(
            "distribution".into(),
            serde_json::to_value(&dashboard.distribution)?,
        );
        json.insert(
            "total_tracked_hours".into(),
            serde_json::json!(dashboard.total_tracked_hours()),
        );
    }
    if report.shows(View::Trends) {
        json.insert("trends".into(), serde_json::to_value(&dashboard.trends)?);
        json.insert(
            "total_productive_hours".into(),
            serde_json::json!(dashboard.total_productive_hours()),
        );
    }
    if report.shows(View::Peak) {
        json.insert(
            "peak_hours".into(),
            serde_json::to_value(&dashboard.peak_hours)?,
        );
        json.insert("peak_hour".into(), serde_json::json!(dashboard.peak_hour()));
    }
    if report.shows(View::Efficiency) {
        json.insert(
            "efficiency".into(),
            serde_json::to_value(&dashboard.efficiency)?,
        );
    }

    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::Value::Object(json))?
    );
    Ok(())
}

fn print_charts(report: &Report) -> Result<()> {
    let renderer = SvgChartRenderer::default();
    let dashboard = &report.dashboard;

    let mut charts = Vec::new();
    if report.shows(View::Distribution) {
        charts.push((
            "distribution",
            renderer.time_distribution(&dashboard.distribution)?,
        ));
    }
    if report.shows(View::Trends) {
        charts.push(("trends", renderer.productivity_trends(&dashboard.trends)?));
    }
    if report.shows(View::Peak) {
        charts.push(("peak_hours", renderer.peak_hours(&dashboard.peak_hours)?));
    }
    if report.shows(View::Efficiency) {
        charts.push((
            "efficiency",
            renderer.category_efficiency(&dashboard.efficiency)?,
        ));
    }

    for (name, payload) in charts {
        println!("{}: data:image/svg+xml;base64,{}", name, payload);
    }
    Ok(())
}
