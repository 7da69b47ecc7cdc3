//! Integration tests for the drugvision binary.
//!
//! These tests verify end-to-end behavior including:
//! - Plan entry and lifecycle changes
//! - Schedule output in each format
//! - Dose logging and adherence summaries
//! - CSV rollup

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn setup_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

/// CLI bound to a data dir, with config lookups kept inside it
fn cli(data_dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("drugvision"));
    cmd.arg("--data-dir")
        .arg(data_dir)
        .env("XDG_CONFIG_HOME", data_dir.join("config"))
        .env_remove("RUST_LOG");
    cmd
}

/// Add a plan and return its id as printed by the CLI
fn add_plan(data_dir: &Path, args: &[&str]) -> String {
    let output = cli(data_dir)
        .arg("plan")
        .arg("add")
        .args(args)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let stdout = String::from_utf8_lossy(&output);
    stdout
        .lines()
        .find(|l| l.contains("Added plan"))
        .and_then(|l| l.split_whitespace().last())
        .expect("plan id in output")
        .to_string()
}

fn log_dose(data_dir: &Path, id: &str, date: &str, time: &str) {
    cli(data_dir)
        .args(["log", id, "--date", date, "--time", time])
        .assert()
        .success();
}

fn summary_json(data_dir: &Path, id: &str) -> Value {
    let output = cli(data_dir)
        .args(["summary", id, "--json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    serde_json::from_slice(&output).expect("summary JSON")
}

#[test]
fn test_cli_help() {
    Command::new(assert_cmd::cargo::cargo_bin!("drugvision"))
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Medication schedule and adherence tracker",
        ));
}

#[test]
fn test_frequencies_lists_all_options() {
    let temp_dir = setup_test_dir();

    cli(temp_dir.path())
        .arg("frequencies")
        .assert()
        .success()
        .stdout(predicate::str::contains("once a day"))
        .stdout(predicate::str::contains("Alternate Days"))
        .stdout(predicate::str::contains("as needed"));
}

#[test]
fn test_add_and_list_plan() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    let id = add_plan(
        data_dir,
        &[
            "--name", "Metformin",
            "--dosage", "500mg",
            "--frequency", "twice a day",
            "--times", "morning,evening",
            "--start", "2024-01-01",
        ],
    );

    assert!(data_dir.join("plans.json").exists());

    cli(data_dir)
        .args(["plan", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains(&id[..8]))
        .stdout(predicate::str::contains("Metformin 500mg"))
        .stdout(predicate::str::contains("twice a day [morning,evening]"))
        .stdout(predicate::str::contains("ongoing"));
}

#[test]
fn test_add_plan_uses_default_times() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    add_plan(
        data_dir,
        &["--name", "Aspirin", "--dosage", "81mg", "--frequency", "everyday", "--start", "2024-01-01"],
    );

    cli(data_dir)
        .args(["plan", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("everyday [morning]"));
}

#[test]
fn test_unknown_frequency_rejected() {
    let temp_dir = setup_test_dir();

    cli(temp_dir.path())
        .args(["plan", "add", "--name", "X", "--dosage", "1mg", "--frequency", "thrice hourly"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown frequency"));

    assert!(!temp_dir.path().join("plans.json").exists());
}

#[test]
fn test_inverted_range_rejected() {
    let temp_dir = setup_test_dir();

    cli(temp_dir.path())
        .args([
            "plan", "add",
            "--name", "Warfarin",
            "--dosage", "1 tablet",
            "--frequency", "once a day",
            "--start", "2024-03-10",
            "--end", "2024-03-01",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid plan"));
}

#[test]
fn test_schedule_csv_everyday() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    let id = add_plan(
        data_dir,
        &[
            "--name", "Amoxicillin",
            "--dosage", "1 tablet",
            "--frequency", "everyday",
            "--times", "morning,evening",
            "--start", "2024-01-01",
            "--end", "2024-01-03",
        ],
    );

    cli(data_dir)
        .args(["schedule", &id, "--format", "csv"])
        .assert()
        .success()
        .stdout(
            "date,time_of_day\n\
             2024-01-01,morning\n\
             2024-01-01,evening\n\
             2024-01-02,morning\n\
             2024-01-02,evening\n\
             2024-01-03,morning\n\
             2024-01-03,evening\n",
        );
}

#[test]
fn test_schedule_json_weekly() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    let id = add_plan(
        data_dir,
        &[
            "--name", "Methotrexate",
            "--dosage", "1 tablet",
            "--frequency", "once a week",
            "--times", "morning",
            "--start", "2024-01-01",
            "--end", "2024-01-21",
        ],
    );

    let output = cli(data_dir)
        .args(["schedule", &id[..8], "--format", "json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let events: Value = serde_json::from_slice(&output).unwrap();
    let dates: Vec<_> = events
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["date"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(dates, vec!["2024-01-01", "2024-01-08", "2024-01-15"]);
}

#[test]
fn test_open_ended_schedule_uses_today_override() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    let id = add_plan(
        data_dir,
        &[
            "--name", "Levothyroxine",
            "--dosage", "1 tablet",
            "--frequency", "once a day",
            "--times", "morning",
            "--start", "2024-02-01",
        ],
    );

    cli(data_dir)
        .args(["--today", "2024-02-03", "schedule", &id])
        .assert()
        .success()
        .stdout(predicate::str::contains("2024-02-03  morning"))
        .stdout(predicate::str::contains("2024-02-04").not());
}

#[test]
fn test_as_needed_schedule_is_empty() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    let id = add_plan(
        data_dir,
        &[
            "--name", "Ibuprofen",
            "--dosage", "1 tablet",
            "--frequency", "as needed",
            "--start", "2024-01-01",
            "--end", "2024-01-31",
        ],
    );

    cli(data_dir)
        .args(["schedule", &id])
        .assert()
        .success()
        .stdout(predicate::str::contains("No scheduled doses"));
}

#[test]
fn test_summary_seven_of_ten() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    let id = add_plan(
        data_dir,
        &[
            "--name", "Atorvastatin",
            "--dosage", "1 tablet",
            "--frequency", "once a day",
            "--times", "night",
            "--start", "2024-04-01",
            "--end", "2024-04-10",
        ],
    );

    for day in 1..=7 {
        log_dose(data_dir, &id, &format!("2024-04-{:02}", day), "night");
    }

    let summary = summary_json(data_dir, &id);
    assert_eq!(summary["total_doses"], 10);
    assert_eq!(summary["taken_count"], 7);
    assert_eq!(summary["adherence_percentage"].as_f64(), Some(70.0));
    assert!(summary.get("daily").is_none());

    cli(data_dir)
        .args(["summary", &id])
        .assert()
        .success()
        .stdout(predicate::str::contains("Adherence:       70.00%"))
        .stdout(predicate::str::contains("Below the 80% adherence target"));
}

#[test]
fn test_unscheduled_dose_is_logged_but_not_counted() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    let id = add_plan(
        data_dir,
        &[
            "--name", "Prednisone",
            "--dosage", "1 tablet",
            "--frequency", "alternate days",
            "--times", "morning",
            "--start", "2024-02-01",
            "--end", "2024-02-05",
        ],
    );

    // 2024-02-03 is odd, so not a dose day
    cli(data_dir)
        .args(["log", &id, "--date", "2024-02-03", "--time", "morning"])
        .assert()
        .success()
        .stderr(predicate::str::contains("won't count toward adherence"));

    log_dose(data_dir, &id, "2024-02-04", "morning");

    let summary = summary_json(data_dir, &id);
    assert_eq!(summary["total_doses"], 2);
    assert_eq!(summary["taken_count"], 1);
    assert_eq!(summary["adherence_percentage"].as_f64(), Some(50.0));
}

#[test]
fn test_correcting_a_skipped_dose() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    let id = add_plan(
        data_dir,
        &[
            "--name", "Lisinopril",
            "--dosage", "1 tablet",
            "--frequency", "once a day",
            "--times", "morning",
            "--start", "2024-05-01",
            "--end", "2024-05-02",
        ],
    );

    cli(data_dir)
        .args(["log", &id, "--date", "2024-05-01", "--time", "morning", "--skipped"])
        .assert()
        .success()
        .stdout(predicate::str::contains("as skipped"));
    assert_eq!(summary_json(data_dir, &id)["taken_count"], 0);

    log_dose(data_dir, &id, "2024-05-01", "morning");
    assert_eq!(summary_json(data_dir, &id)["taken_count"], 1);
}

#[test]
fn test_daily_summary() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    let id = add_plan(
        data_dir,
        &[
            "--name", "Amoxicillin",
            "--dosage", "1 tablet",
            "--frequency", "everyday",
            "--times", "morning,evening",
            "--start", "2024-01-01",
            "--end", "2024-01-02",
        ],
    );
    log_dose(data_dir, &id, "2024-01-01", "morning");
    log_dose(data_dir, &id, "2024-01-01", "evening");
    log_dose(data_dir, &id, "2024-01-02", "evening");

    let output = cli(data_dir)
        .args(["summary", &id, "--daily", "--json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let report: Value = serde_json::from_slice(&output).unwrap();

    assert_eq!(report["taken_count"], 3);
    let daily = report["daily"].as_array().unwrap();
    assert_eq!(daily.len(), 2);
    assert_eq!(daily[0]["adherence_percentage"].as_f64(), Some(100.0));
    assert_eq!(daily[1]["adherence_percentage"].as_f64(), Some(50.0));
}

#[test]
fn test_today_shows_marks() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    let id = add_plan(
        data_dir,
        &[
            "--name", "Metformin",
            "--dosage", "1 tablet",
            "--frequency", "twice a day",
            "--times", "morning,evening",
            "--start", "2024-01-01",
        ],
    );
    log_dose(data_dir, &id, "2024-01-05", "morning");

    cli(data_dir)
        .args(["--today", "2024-01-05", "today"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Metformin"))
        .stdout(predicate::str::contains("✓ taken"))
        .stdout(predicate::str::contains("· pending"));
}

#[test]
fn test_completed_plans_drop_out_of_today() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    let id = add_plan(
        data_dir,
        &[
            "--name", "Cefalexin",
            "--dosage", "1 tablet",
            "--frequency", "everyday",
            "--times", "afternoon",
            "--start", "2024-01-01",
        ],
    );

    cli(data_dir)
        .args(["plan", "status", &id, "completed"])
        .assert()
        .success()
        .stdout(predicate::str::contains("marked completed"));

    cli(data_dir)
        .args(["--today", "2024-01-05", "today"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No doses due today"));
}

#[test]
fn test_plan_end_date_limits_schedule() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    let id = add_plan(
        data_dir,
        &[
            "--name", "Doxycycline",
            "--dosage", "1 tablet",
            "--frequency", "once a day",
            "--times", "morning",
            "--start", "2024-03-01",
        ],
    );

    cli(data_dir)
        .args(["plan", "end", &id, "2024-03-04"])
        .assert()
        .success();

    let summary = summary_json(data_dir, &id);
    assert_eq!(summary["total_doses"], 4);

    cli(data_dir)
        .args(["plan", "end", &id, "2024-02-01"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("before start date"));
}

#[test]
fn test_unknown_plan_id() {
    let temp_dir = setup_test_dir();

    cli(temp_dir.path())
        .args(["summary", "deadbeef"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Plan not found"));
}

#[test]
fn test_rollup_keeps_history() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    let id = add_plan(
        data_dir,
        &[
            "--name", "Omeprazole",
            "--dosage", "1 tablet",
            "--frequency", "once a day",
            "--times", "morning",
            "--start", "2024-06-01",
            "--end", "2024-06-04",
        ],
    );
    for day in 1..=3 {
        log_dose(data_dir, &id, &format!("2024-06-{:02}", day), "morning");
    }

    cli(data_dir)
        .arg("rollup")
        .assert()
        .success()
        .stdout(predicate::str::contains("Rolled up 3 adherence records"));

    let csv_content = fs::read_to_string(data_dir.join("adherence.csv")).unwrap();
    assert!(csv_content.starts_with("medication_id,date,time_of_day"));

    // Archived and live records both count
    log_dose(data_dir, &id, "2024-06-04", "morning");
    let summary = summary_json(data_dir, &id);
    assert_eq!(summary["taken_count"], 4);
    assert_eq!(summary["adherence_percentage"].as_f64(), Some(100.0));
}

#[test]
fn test_rollup_with_cleanup() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    let id = add_plan(
        data_dir,
        &["--name", "Vitamin D", "--dosage", "1000 IU", "--frequency", "once a week", "--start", "2024-01-01"],
    );
    log_dose(data_dir, &id, "2024-01-01", "morning");

    cli(data_dir)
        .args(["rollup", "--cleanup"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Cleaned up 1 processed logs"));

    let leftovers: Vec<_> = fs::read_dir(data_dir.join("log"))
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().ends_with(".processed"))
        .collect();
    assert!(leftovers.is_empty());
}

#[test]
fn test_empty_rollup() {
    let temp_dir = setup_test_dir();

    cli(temp_dir.path())
        .arg("rollup")
        .assert()
        .success()
        .stdout(predicate::str::contains("nothing to roll up"));
}

#[test]
fn test_config_threshold_applies() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    let config_path = data_dir.join("custom.toml");
    fs::write(&config_path, "[adherence]\nlow_threshold = 50.0\n").unwrap();

    let id = add_plan(
        data_dir,
        &[
            "--name", "Sertraline",
            "--dosage", "1 tablet",
            "--frequency", "once a day",
            "--times", "morning",
            "--start", "2024-01-01",
            "--end", "2024-01-04",
        ],
    );
    for day in 1..=3 {
        log_dose(data_dir, &id, &format!("2024-01-{:02}", day), "morning");
    }

    cli(data_dir)
        .arg("--config")
        .arg(&config_path)
        .args(["summary", &id])
        .assert()
        .success()
        .stdout(predicate::str::contains("75.00%"))
        .stdout(predicate::str::contains("Below the").not());
}

#[test]
fn test_dosage_is_required() {
    let temp_dir = setup_test_dir();

    cli(temp_dir.path())
        .args(["plan", "add", "--name", "Aspirin", "--frequency", "everyday"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--dosage"));

    assert!(!temp_dir.path().join("plans.json").exists());
}

#[test]
fn test_plan_drugs_are_stored_and_listed() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    add_plan(
        data_dir,
        &[
            "--name", "Co-codamol",
            "--dosage", "2 tablets",
            "--drugs", "Codeine,Paracetamol",
            "--frequency", "as needed",
            "--start", "2024-07-01",
        ],
    );

    cli(data_dir)
        .args(["plan", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("drugs: Codeine, Paracetamol"));

    let contents = fs::read_to_string(data_dir.join("plans.json")).unwrap();
    let store: Value = serde_json::from_str(&contents).unwrap();
    let plan = store["plans"].as_object().unwrap().values().next().unwrap();
    assert_eq!(plan["drugs"], serde_json::json!(["Codeine", "Paracetamol"]));
}

#[test]
fn test_plan_end_can_be_cleared() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    let id = add_plan(
        data_dir,
        &[
            "--name", "Levothyroxine",
            "--dosage", "50mcg",
            "--frequency", "once a day",
            "--times", "morning",
            "--start", "2024-03-01",
            "--end", "2024-03-02",
        ],
    );

    cli(data_dir)
        .args(["plan", "end", &id, "--clear"])
        .assert()
        .success()
        .stdout(predicate::str::contains("now open-ended"));

    cli(data_dir)
        .args(["plan", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("ongoing"));

    let output = cli(data_dir)
        .args(["--today", "2024-03-05", "summary", &id, "--json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let summary: Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(summary["total_doses"], 5);

    // A date and --clear together make no sense
    cli(data_dir)
        .args(["plan", "end", &id, "2024-03-10", "--clear"])
        .assert()
        .failure();

    // Neither is an error too
    cli(data_dir)
        .args(["plan", "end", &id])
        .assert()
        .failure();
}
