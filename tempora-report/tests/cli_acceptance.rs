use chrono::{Duration, Utc};
use std::ffi::OsString;
use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};
use tempfile::TempDir;
use tempora_core::{Database, EventFilter, EventStore};

struct CliTestEnv {
    _temp_dir: TempDir,
    home: PathBuf,
    xdg_data: PathBuf,
    xdg_config: PathBuf,
    xdg_state: PathBuf,
}

impl CliTestEnv {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let base = temp_dir.path().to_path_buf();
        let home = base.join("home");
        let xdg_data = base.join("xdg-data");
        let xdg_config = base.join("xdg-config");
        let xdg_state = base.join("xdg-state");

        fs::create_dir_all(&home).expect("failed to create HOME");
        fs::create_dir_all(&xdg_data).expect("failed to create XDG_DATA_HOME");
        fs::create_dir_all(&xdg_config).expect("failed to create XDG_CONFIG_HOME");
        fs::create_dir_all(&xdg_state).expect("failed to create XDG_STATE_HOME");

        Self {
            _temp_dir: temp_dir,
            home,
            xdg_data,
            xdg_config,
            xdg_state,
        }
    }

    fn db_path(&self) -> PathBuf {
        self.xdg_data.join("tempora/events.db")
    }

    /// Write `events` as a JSON file under HOME and return its path.
    fn write_events(&self, events: serde_json::Value) -> PathBuf {
        let path = self.home.join("events.json");
        fs::write(&path, events.to_string()).expect("failed to write events fixture");
        path
    }
}

fn timestamp(instant: chrono::DateTime<Utc>) -> String {
    instant.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// Three work events of 1h, 2h and 3h starting three days ago, plus one
/// personal event with its bounds reversed.
fn recent_events() -> serde_json::Value {
    let start = Utc::now() - Duration::days(3);
    let event = |id: &str, event_type: &str, offset_h: i64, len_h: i64| {
        let begin = start + Duration::hours(offset_h);
        serde_json::json!({
            "id": id,
            "user_id": "alice",
            "title": format!("{} block", event_type),
            "start_time": timestamp(begin),
            "end_time": timestamp(begin + Duration::hours(len_h)),
            "event_type": event_type,
        })
    };

    serde_json::json!([
        event("w1", "work", 0, 1),
        event("w2", "work", 0, 2),
        event("w3", "work", 0, 3),
        event("p1", "personal", 5, -1),
    ])
}

fn run_bin(env: &CliTestEnv, args: &[&str]) -> Output {
    let bin_path = PathBuf::from(assert_cmd::cargo::cargo_bin!("tempora-report"));

    Command::new(bin_path)
        .args(args)
        .env("HOME", &env.home)
        .env("XDG_DATA_HOME", &env.xdg_data)
        .env("XDG_CONFIG_HOME", &env.xdg_config)
        .env("XDG_STATE_HOME", &env.xdg_state)
        .output()
        .unwrap_or_else(|e| panic!("failed to execute tempora-report: {e}"))
}

fn assert_success(args: &[&str], output: &Output) {
    if output.status.success() {
        return;
    }

    let rendered_args = args
        .iter()
        .map(|arg| OsString::from(arg).to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(" ");
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    panic!(
        "tempora-report {rendered_args} failed\nstatus: {}\nstdout:\n{}\nstderr:\n{}",
        output.status, stdout, stderr
    );
}

fn import(env: &CliTestEnv, events: serde_json::Value) {
    let file = env.write_events(events);
    let file = file.to_string_lossy().into_owned();
    let args = ["import", file.as_str()];
    let output = run_bin(env, &args);
    assert_success(&args, &output);
}

#[test]
fn import_populates_database() {
    let env = CliTestEnv::new();
    let file = env.write_events(recent_events());
    let file = file.to_string_lossy().into_owned();

    let args = ["import", file.as_str()];
    let output = run_bin(&env, &args);
    assert_success(&args, &output);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Imported 4 events"), "got:\n{stdout}");
    assert!(stdout.contains("1 malformed"), "got:\n{stdout}");

    let db_path = env.db_path();
    assert!(
        db_path.exists(),
        "database file should exist at {}",
        db_path.display()
    );

    let db = Database::open(&db_path).expect("failed to open db");
    db.migrate().expect("failed to migrate db");
    let events = db
        .find(&EventFilter::for_user("alice").sorted())
        .expect("failed to list events");
    assert_eq!(events.len(), 4);
    assert_eq!(events[0].title, "work block");
}

#[test]
fn json_report_matches_imported_events() {
    let env = CliTestEnv::new();
    import(&env, recent_events());

    let args = ["report", "--user", "alice", "--export", "json"];
    let output = run_bin(&env, &args);
    assert_success(&args, &output);

    let report: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("report should be JSON");

    let distribution = report["distribution"].as_array().unwrap();
    assert_eq!(distribution.len(), 2);
    assert_eq!(distribution[0]["category"], "work");
    assert_eq!(distribution[0]["total_hours"], 6.0);
    assert_eq!(distribution[0]["event_count"], 3);
    assert_eq!(distribution[1]["category"], "personal");
    assert_eq!(distribution[1]["total_hours"], 0.0);

    let peak_hours = report["peak_hours"].as_array().unwrap();
    assert_eq!(peak_hours.len(), 24);
    let peak_total: f64 = peak_hours
        .iter()
        .map(|bucket| bucket["hours"].as_f64().unwrap())
        .sum();
    assert_eq!(peak_total, 6.0);

    assert_eq!(report["trends"].as_array().unwrap().len(), 7);

    let efficiency = report["efficiency"].as_array().unwrap();
    assert_eq!(efficiency[0]["category"], "work");
    assert_eq!(efficiency[0]["avg_duration_hours"], 2.0);
    assert_eq!(efficiency[1]["category"], "personal");
    assert_eq!(efficiency[1]["avg_duration_hours"], 0.0);
}

#[test]
fn days_flag_sets_trend_length() {
    let env = CliTestEnv::new();

    let args = [
        "report", "--user", "bob", "--view", "trends", "--days", "3", "--export", "json",
    ];
    let output = run_bin(&env, &args);
    assert_success(&args, &output);

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let trends = report["trends"].as_array().unwrap();
    assert_eq!(trends.len(), 3);
    assert!(trends.iter().all(|point| point["productive_hours"] == 0.0));
    assert!(report.get("distribution").is_none());
}

#[test]
fn empty_user_gets_friendly_terminal_report() {
    let env = CliTestEnv::new();

    let args = ["report", "--user", "nobody"];
    let output = run_bin(&env, &args);
    assert_success(&args, &output);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Time analytics for nobody"));
    assert!(stdout.contains("No events recorded for this user."));
}

#[test]
fn terminal_report_lists_views() {
    let env = CliTestEnv::new();
    import(&env, recent_events());

    let args = ["report", "--user", "alice"];
    let output = run_bin(&env, &args);
    assert_success(&args, &output);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("TIME DISTRIBUTION (last 30 days)"));
    assert!(stdout.contains("PRODUCTIVITY TRENDS"));
    assert!(stdout.contains("PEAK HOURS"));
    assert!(stdout.contains("CATEGORY EFFICIENCY"));
}

#[test]
fn month_report_in_markdown() {
    let env = CliTestEnv::new();
    import(
        &env,
        serde_json::json!([
            {
                "user_id": "alice",
                "start_time": "2024-03-05T09:00:00Z",
                "end_time": "2024-03-05T11:30:00Z",
                "event_type": "learning",
            },
            {
                "user_id": "alice",
                "start_time": "2024-02-29T09:00:00Z",
                "end_time": "2024-02-29T10:00:00Z",
                "event_type": "work",
            },
        ]),
    );

    let args = [
        "report",
        "--user",
        "alice",
        "--month",
        "2024-03",
        "--view",
        "distribution",
        "--export",
        "md",
    ];
    let output = run_bin(&env, &args);
    assert_success(&args, &output);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("## Time Distribution (March 2024)"), "got:\n{stdout}");
    assert!(stdout.contains("| learning | 2.50 | 1 |"));
    assert!(!stdout.contains("| work |"));
    assert!(stdout.contains("**Events in period:** 1"));
    assert!(stdout.contains("**Previous period:** 1.00h"));
    assert!(!stdout.contains("## Peak Hours"));
}

#[test]
fn chart_export_prints_svg_payloads() {
    let env = CliTestEnv::new();

    let args = ["report", "--user", "alice", "--view", "peak", "--export", "chart"];
    let output = run_bin(&env, &args);
    assert_success(&args, &output);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("peak_hours: data:image/svg+xml;base64,"));
    assert_eq!(stdout.lines().count(), 1);
}

#[test]
fn bad_arguments_are_rejected() {
    let env = CliTestEnv::new();

    let output = run_bin(&env, &["report", "--user", "alice", "--export", "pdf"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Unknown export format"));

    let output = run_bin(&env, &["report", "--user", "alice", "--month", "2024-13"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Month must be between 1 and 12"));

    let output = run_bin(&env, &["report", "--user", "alice", "--days", "400"]);
    assert!(!output.status.success());
}
