use std::path::PathBuf;
use std::process::{Command, Output};

fn run(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_ecm-compete"))
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("ecm-compete process should run: {e}"))
}

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("ecm-compete-{}-{name}", std::process::id()))
}

#[test]
fn short_preset_prints_report_and_exports() {
    let csv_path = temp_path("results.csv");
    let json_path = temp_path("results.json");
    let output = run(&[
        "--preset",
        "short",
        "--results-out",
        csv_path.to_string_lossy().as_ref(),
        "--json-out",
        json_path.to_string_lossy().as_ref(),
    ]);
    assert!(
        output.status.success(),
        "run failed: stderr={}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("--- Portfolio Report (2017) ---"), "{stdout}");
    assert!(stdout.contains("Measures:              6"));
    assert!(stdout.contains("[Max adoption potential, competed]"));

    // 6 measures x 2 schemes x 2 stages x 3 years, plus header
    let csv = std::fs::read_to_string(&csv_path).unwrap_or_default();
    assert_eq!(csv.lines().count(), 73);

    let json = std::fs::read_to_string(&json_path).unwrap_or_default();
    let doc: serde_json::Value = serde_json::from_str(&json).unwrap_or_default();
    assert_eq!(doc["first_year"], 2015);
    assert_eq!(doc["measures"].as_array().map(Vec::len), Some(6));

    let _ = std::fs::remove_file(csv_path);
    let _ = std::fs::remove_file(json_path);
}

#[test]
fn same_seed_same_report() {
    let a = run(&["--preset", "short", "--seed", "11"]);
    let b = run(&["--preset", "short", "--seed", "11"]);
    assert!(a.status.success());
    assert_eq!(a.stdout, b.stdout);
}

#[test]
fn unknown_preset_fails() {
    let output = run(&["--preset", "nonexistent"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("unknown preset"));
}

#[test]
fn invalid_config_reports_every_error() {
    let path = temp_path("bad.toml");
    let written = std::fs::write(
        &path,
        "[horizon]\nfirst_year = 2030\nlast_year = 2020\n\n[sample]\nsamples = 0\n",
    );
    assert!(written.is_ok());
    let output = run(&["--config", path.to_string_lossy().as_ref()]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("horizon.first_year"), "{stderr}");
    assert!(stderr.contains("sample.samples"), "{stderr}");
    let _ = std::fs::remove_file(path);
}

#[test]
fn measure_file_with_unknown_field_fails() {
    let path = temp_path("measures.json");
    let written = std::fs::write(&path, r#"{"measures": [], "version": 2}"#);
    assert!(written.is_ok());
    let output = run(&["--preset", "short", "--measures", path.to_string_lossy().as_ref()]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("cannot load measures"));
    let _ = std::fs::remove_file(path);
}
