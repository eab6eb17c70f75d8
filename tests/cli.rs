//! End-to-end tests of the `campus-console` binary

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn console() -> Command {
    let mut cmd = Command::cargo_bin("campus-console").unwrap();
    cmd.env("NO_COLOR", "1").env_remove("RUST_LOG");
    cmd
}

#[test]
fn levels_of_class_form() {
    console()
        .args(["levels", "class"])
        .assert()
        .success()
        .stdout(predicate::str::contains("program_id"))
        .stdout(predicate::str::contains("specialization_id"))
        .stdout(predicate::str::contains("level_id"));
}

#[test]
fn unknown_form_is_a_usage_error() {
    console().args(["levels", "timetable"]).assert().failure();
}

#[test]
fn invalid_period_fails_with_message() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("period.json");
    fs::write(
        &file,
        r#"{"name": "Q1", "school_year_id": 1, "start_date": "2024-03-01", "end_date": "2024-01-01"}"#,
    )
    .unwrap();

    console()
        .args(["validate", "school-year-period", "--values"])
        .arg(&file)
        .assert()
        .failure()
        .stdout(predicate::str::contains("end date must be greater than start date"));
}

#[test]
fn valid_program_passes() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("program.json");
    fs::write(&file, r#"{"name": "Sciences", "code": "SCI"}"#).unwrap();

    console()
        .args(["validate", "program", "--values"])
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("valid"));
}

#[test]
fn list_from_fixture_dir() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("programs.json"),
        r#"[
            {"id": 1, "name": "Sciences", "status": 1},
            {"id": 2, "name": "Lettres", "status": 1},
            {"id": 3, "name": "Arts", "status": 0}
        ]"#,
    )
    .unwrap();

    console()
        .args(["list", "programs", "--status", "active", "--fixtures"])
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Sciences"))
        .stdout(predicate::str::contains("Lettres"))
        .stdout(predicate::str::contains("Arts").not())
        .stdout(predicate::str::contains("(2 total)"));
}

#[test]
fn cascade_clears_lower_levels() {
    console()
        .args([
            "cascade",
            "class",
            "--set",
            "program=1",
            "--set",
            "specialization=2",
            "--set",
            "program=3",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("specialization_id=2"))
        .stdout(predicate::str::contains("program = 3"));
}

fn administrators(count: u32) -> TempDir {
    let dir = TempDir::new().unwrap();
    let rows: Vec<String> = (1..=count)
        .map(|id| format!(r#"{{"id": {id}, "first_name": "Admin {id}", "status": 1}}"#))
        .collect();
    fs::write(dir.path().join("administrators.json"), format!("[{}]", rows.join(","))).unwrap();
    dir
}

#[test]
fn list_middle_page_offers_both_directions() {
    let dir = administrators(21);

    console()
        .args(["list", "administrators", "--page", "2", "--limit", "10", "--fixtures"])
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Administrator page 2/3 (21 total)"))
        .stdout(predicate::str::contains("Admin 11"))
        .stdout(predicate::str::contains("Admin 21").not())
        .stdout(predicate::str::contains("more: previous, next"));
}

#[test]
fn delete_last_row_shows_previous_page() {
    let dir = administrators(21);

    console()
        .args(["delete", "administrators", "21", "--page", "3", "--limit", "10", "--fixtures"])
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Deleted Administrator #21"))
        .stdout(predicate::str::contains("page 3 is empty, showing page 2"))
        .stdout(predicate::str::contains("Administrator page 2/2 (20 total)"))
        .stdout(predicate::str::contains("Admin 20"))
        .stdout(predicate::str::contains("more: previous"))
        .stdout(predicate::str::contains("next").not());
}

#[test]
fn delete_unknown_record_fails() {
    let dir = administrators(3);

    console()
        .args(["delete", "administrators", "99", "--fixtures"])
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to delete Administrator #99"));
}
