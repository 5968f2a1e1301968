use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use tempfile::TempDir;

fn bin() -> &'static str {
    env!("CARGO_BIN_EXE_dpsim")
}

fn write_build(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).expect("fixture should be written");
    path
}

const LONGSWORD_YAML: &str = "
weapon:
  name: Longsword
  enhancement: 5
character:
  strength_modifier: 10
simulation:
  round_cap: 300
";

const RAPIER_JSON: &str = r#"{
  "weapon": {"name": "Rapier"},
  "attack": {"bonus": 55, "progression": "hasted"},
  "simulation": {"round_cap": 300, "seed": 3}
}"#;

#[test]
fn simulate_command_emits_json_report() {
    let dir = TempDir::new().unwrap();
    let path = write_build(dir.path(), "longsword.yaml", LONGSWORD_YAML);

    let output = Command::new(bin())
        .args(["simulate", path.to_string_lossy().as_ref()])
        .output()
        .expect("simulate should run");

    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&output.stdout);
    let payload: serde_json::Value =
        serde_json::from_str(&stdout).expect("simulate should emit json");
    assert_eq!(payload["build"], "Longsword");
    assert!(payload["mean_dps"].as_f64().unwrap() > 0.0);
    assert_eq!(payload["slots"].as_array().map(Vec::len), Some(4));
    assert_eq!(payload["illegal_dual_wield"], false);
}

#[test]
fn simulate_overrides_seed_and_is_deterministic() {
    let dir = TempDir::new().unwrap();
    let path = write_build(dir.path(), "longsword.yaml", LONGSWORD_YAML);
    let run = || {
        Command::new(bin())
            .args(["simulate", path.to_string_lossy().as_ref(), "--seed", "77"])
            .output()
            .expect("simulate should run")
    };
    let first = run();
    let second = run();
    assert_eq!(first.status.code(), Some(0));
    assert_eq!(first.stdout, second.stdout);
}

#[test]
fn simulate_reports_config_errors_with_exit_code_one() {
    let dir = TempDir::new().unwrap();
    let path = write_build(dir.path(), "bad.yaml", "weapon:\n  name: Spork\n");

    let output = Command::new(bin())
        .args(["simulate", path.to_string_lossy().as_ref()])
        .output()
        .expect("simulate should run");

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("unknown weapon 'Spork'"));
}

#[test]
fn unparsable_numeric_flag_is_usage_error() {
    let dir = TempDir::new().unwrap();
    let path = write_build(dir.path(), "longsword.yaml", LONGSWORD_YAML);

    let output = Command::new(bin())
        .args(["simulate", path.to_string_lossy().as_ref(), "--rounds", "many", "--table"])
        .output()
        .expect("simulate should run");

    assert_eq!(output.status.code(), Some(2));
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("invalid --rounds value 'many'"), "{stderr}");

    let second = write_build(dir.path(), "rapier.json", RAPIER_JSON);
    let output = Command::new(bin())
        .args([
            "compare",
            path.to_string_lossy().as_ref(),
            second.to_string_lossy().as_ref(),
            "--workers",
            "two",
        ])
        .output()
        .expect("compare should run");
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn simulate_without_path_is_usage_error() {
    let output = Command::new(bin())
        .arg("simulate")
        .output()
        .expect("simulate should run");

    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("usage: dpsim simulate"));
}

#[test]
fn compare_command_keeps_input_order_and_writes_csv() {
    let dir = TempDir::new().unwrap();
    let first = write_build(dir.path(), "longsword.yaml", LONGSWORD_YAML);
    let second = write_build(dir.path(), "rapier.json", RAPIER_JSON);
    let csv_path = dir.path().join("out.csv");

    let output = Command::new(bin())
        .args([
            "compare",
            first.to_string_lossy().as_ref(),
            second.to_string_lossy().as_ref(),
            "--workers",
            "2",
            "--csv",
            csv_path.to_string_lossy().as_ref(),
        ])
        .output()
        .expect("compare should run");

    assert_eq!(output.status.code(), Some(0));
    let payload: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("compare should emit json");
    let reports = payload.as_array().expect("array of reports");
    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0]["build"], "Longsword");
    assert_eq!(reports[1]["build"], "Rapier");

    let summary = fs::read_to_string(&csv_path).unwrap();
    assert_eq!(summary.lines().count(), 3);
    let slots = fs::read_to_string(dir.path().join("out.slots.csv")).unwrap();
    // header + 4 standard slots + 5 hasted slots
    assert_eq!(slots.lines().count(), 10);
}

#[test]
fn compare_table_output_is_plain_text() {
    let dir = TempDir::new().unwrap();
    let first = write_build(dir.path(), "longsword.yaml", LONGSWORD_YAML);
    let second = write_build(dir.path(), "rapier.json", RAPIER_JSON);

    let output = Command::new(bin())
        .args([
            "compare",
            first.to_string_lossy().as_ref(),
            second.to_string_lossy().as_ref(),
            "--table",
        ])
        .output()
        .expect("compare should run");

    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("build: Longsword"));
    assert!(stdout.contains("build: Rapier"));
}

#[test]
fn weapons_and_progressions_list_catalogs() {
    let output = Command::new(bin())
        .arg("weapons")
        .output()
        .expect("weapons should run");
    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Longsword\t1d8\tmedium\t19-20\tx2\tslashing\tno"));
    assert!(stdout.contains("Executioner's Axe"));

    let output = Command::new(bin())
        .arg("progressions")
        .output()
        .expect("progressions should run");
    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("hasted\t+0 hasted -5 -10 -15"));
}

#[test]
fn unknown_command_prints_usage() {
    let output = Command::new(bin())
        .arg("serve")
        .output()
        .expect("binary should run");
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("usage: dpsim"));
}
