// Integration tests for the `boq` binary: exit codes, stdout contracts and
// on-disk effects.
//
// Run with: cargo test -p boqsheet-cli --test cli_tests -- --nocapture

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use calamine::{open_workbook, Data, Reader, Xlsx};
use tempfile::TempDir;

fn boq(dir: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_boq"));
    cmd.current_dir(dir);
    // Never pick up the developer's own settings file
    cmd.env("BOQ_CONFIG", dir.join("no-settings.json"));
    cmd.env_remove("BOQ_LOG");
    cmd
}

fn run(dir: &Path, args: &[&str]) -> Output {
    boq(dir).args(args).output().expect("run boq")
}

fn stdout(out: &Output) -> String {
    String::from_utf8_lossy(&out.stdout).into_owned()
}

fn stderr(out: &Output) -> String {
    String::from_utf8_lossy(&out.stderr).into_owned()
}

fn assert_exit(out: &Output, code: i32) {
    assert_eq!(
        out.status.code(),
        Some(code),
        "stdout:\n{}\nstderr:\n{}",
        stdout(out),
        stderr(out)
    );
}

fn write(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, body).unwrap();
    path
}

fn worked_example() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "a.json",
        r#"{"name": "A", "items": [
            {"id": 1, "name": "Bolt", "quantity": 5, "unit": "pcs", "unit_price": 2.0},
            {"id": 2, "name": "Nut", "quantity": 3, "unit": "pcs", "unit_price": 4.0}]}"#,
    );
    write(
        dir.path(),
        "b.json",
        r#"{"name": "B", "items": [
            {"id": 2, "name": "Nut", "quantity": 1, "unit": "pcs", "unit_price": 4.0},
            {"id": 3, "name": "Washer", "quantity": 2, "unit_price": 1.5}]}"#,
    );
    dir
}

fn show_json(dir: &Path, file: &str) -> serde_json::Value {
    let out = run(dir, &["show", file, "--json"]);
    assert_exit(&out, 0);
    serde_json::from_str(stdout(&out).trim()).expect("show --json emits one JSON value")
}

// ===========================================================================
// combine
// ===========================================================================

#[test]
fn combine_json_report() {
    let dir = worked_example();
    let out = run(dir.path(), &["combine", "a.json", "b.json", "-o", "out.xlsx", "--json"]);
    assert_exit(&out, 0);

    let report: serde_json::Value = serde_json::from_str(stdout(&out).trim()).unwrap();
    assert_eq!(report["boqs"], serde_json::json!(["A", "B"]));
    assert_eq!(report["unique_items"], 3);
    assert_eq!(report["grand_total"].as_f64(), Some(29.0));
    assert_eq!(report["output"]["data_rows"], 3);
    assert_eq!(report["output"]["fingerprint"].as_str().unwrap().len(), 64);
    assert!(dir.path().join("out.xlsx").exists());
}

#[test]
fn combine_human_summary_and_sheet_name() {
    let dir = worked_example();
    let out = run(
        dir.path(),
        &["combine", "a.json", "b.json", "-o", "out.xlsx", "--sheet-name", "Smeta"],
    );
    assert_exit(&out, 0);
    let text = stdout(&out);
    assert!(text.contains("Combined 2 BoQ(s), 3 unique item(s)"), "{text}");
    assert!(text.contains("Grand total: 29.00"), "{text}");

    let mut wb: Xlsx<_> = open_workbook(dir.path().join("out.xlsx")).unwrap();
    let range = wb.worksheet_range("Smeta").unwrap();
    assert_eq!(range.get_value((0, 3)), Some(&Data::String("A".into())));
}

#[test]
fn combine_uses_settings_file() {
    let dir = worked_example();
    let settings = write(
        dir.path(),
        "settings.json",
        r#"{"labels.name": "Ad", "labels.grandTotal": "CƏMİ", "sheet.title": "Smeta 2024"}"#,
    );
    let out = boq(dir.path())
        .args(["combine", "a.json", "b.json", "-o", "out.xlsx", "-q"])
        .env("BOQ_CONFIG", &settings)
        .output()
        .unwrap();
    assert_exit(&out, 0);
    assert!(stdout(&out).is_empty(), "quiet combine prints nothing");

    let mut wb: Xlsx<_> = open_workbook(dir.path().join("out.xlsx")).unwrap();
    let range = wb.worksheet_range("Combined BoQ").unwrap();
    assert_eq!(range.get_value((0, 0)), Some(&Data::String("Smeta 2024".into())));
    assert_eq!(range.get_value((1, 0)), Some(&Data::String("Ad".into())));
    assert_eq!(range.get_value((5, 0)), Some(&Data::String("CƏMİ".into())));
}

#[test]
fn combine_conflict_warns_on_stderr() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "a.json", r#"{"name": "A", "items": [{"id": "x", "name": "Cable", "quantity": 1, "unit_price": 10}]}"#);
    write(dir.path(), "b.json", r#"{"name": "B", "items": [{"id": "x", "name": "Cable", "quantity": 2, "unit_price": 12}]}"#);

    let out = run(dir.path(), &["combine", "a.json", "b.json", "-o", "out.xlsx"]);
    assert_exit(&out, 0);
    let err = stderr(&out);
    assert!(err.contains("warning: product 'x' (Cable) differs in B"), "{err}");
    assert!(stdout(&out).contains("Grand total: 30.00"));
}

#[test]
fn combine_malformed_file_exit_code() {
    let dir = worked_example();
    write(dir.path(), "bad.json", r#"{"name": "Bad", "items": [{"id": 1, "quantity": -2}]}"#);
    fs::write(dir.path().join("out.xlsx"), b"previous").unwrap();

    let out = run(dir.path(), &["combine", "a.json", "bad.json", "-o", "out.xlsx"]);
    assert_exit(&out, 4);
    let err = stderr(&out);
    assert!(err.starts_with("error: "), "{err}");
    assert!(err.contains("bad.json"), "{err}");
    assert!(err.contains("hint:"), "{err}");
    assert_eq!(fs::read(dir.path().join("out.xlsx")).unwrap(), b"previous");
}

#[test]
fn combine_failure_exit_codes() {
    let dir = worked_example();
    write(dir.path(), "empty1.json", r#"{"name": "E1", "items": []}"#);
    write(dir.path(), "empty2.json", r#"{"name": "E2", "items": []}"#);

    assert_exit(&run(dir.path(), &["combine", "empty1.json", "empty2.json", "-o", "o.xlsx"]), 5);
    assert_exit(&run(dir.path(), &["combine", "a.json", "missing.json", "-o", "o.xlsx"]), 7);
    assert_exit(&run(dir.path(), &["combine", "a.json", "-o", "no-such-dir/o.xlsx"]), 6);
    assert!(!dir.path().join("o.xlsx").exists());
}

#[test]
fn combine_rejects_sheet_names_excel_cannot_hold() {
    let dir = worked_example();
    let long = "x".repeat(32);
    for name in [long.as_str(), "Q1/Q2", "a[1]", "What?"] {
        let out = run(dir.path(), &["combine", "a.json", "b.json", "-o", "out.xlsx", "--sheet-name", name]);
        assert_exit(&out, 2);
        assert!(!stderr(&out).contains("writable"), "{}", stderr(&out));
        assert!(!dir.path().join("out.xlsx").exists());
    }
}

#[test]
fn combine_requires_files() {
    let dir = tempfile::tempdir().unwrap();
    assert_exit(&run(dir.path(), &["combine", "-o", "o.xlsx"]), 2);
}

// ===========================================================================
// validate
// ===========================================================================

#[test]
fn validate_reports_every_file() {
    let dir = worked_example();
    write(dir.path(), "bad.json", r#"{"name": "Bad"}"#);

    let out = run(dir.path(), &["validate", "a.json", "bad.json", "b.json"]);
    assert_exit(&out, 4);
    let text = stdout(&out);
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("ok ") && lines[0].contains("(A, 2 item(s))"));
    assert!(lines[1].starts_with("FAIL") && lines[1].contains("'items'"));
    assert!(lines[2].starts_with("ok "));

    let out = run(dir.path(), &["validate", "a.json", "b.json", "--json"]);
    assert_exit(&out, 0);
    let entries: serde_json::Value = serde_json::from_str(stdout(&out).trim()).unwrap();
    assert_eq!(entries.as_array().unwrap().len(), 2);
    assert_eq!(entries[1]["items"], 2);
}

// ===========================================================================
// authoring
// ===========================================================================

#[test]
fn authoring_flow() {
    let dir = tempfile::tempdir().unwrap();
    let d = dir.path();
    write(
        d,
        "catalog.json",
        r#"[{"id": 7, "name": "Valve DN50", "price": 35.0, "unit": "pcs", "category": "Plumbing"}]"#,
    );

    assert_exit(&run(d, &["new", "Site A", "-o", "site.json"]), 0);
    assert_exit(&run(d, &["add", "site.json", "--id", "1", "--name", "Pipe", "--qty", "10", "--unit", "m", "--price", "4"]), 0);
    assert_exit(&run(d, &["add", "site.json", "--id", "1", "--name", "Pipe", "--qty", "5"]), 0);
    assert_exit(&run(d, &["add", "site.json", "--id", "7", "--qty", "2", "--catalog", "catalog.json"]), 0);

    let shown = show_json(d, "site.json");
    assert_eq!(shown["name"], "Site A");
    assert_eq!(shown["next_id"], 3);
    let items = shown["items"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["quantity"].as_f64(), Some(15.0));
    assert_eq!(items[1]["name"], "Valve DN50");
    assert_eq!(shown["total"].as_f64(), Some(15.0 * 4.0 + 2.0 * 35.0));

    assert_exit(&run(d, &["move", "site.json", "--id", "7", "--up"]), 0);
    assert_exit(&run(d, &["set-qty", "site.json", "--id", "1", "--qty", "1"]), 0);
    let shown = show_json(d, "site.json");
    assert_eq!(shown["items"][0]["id"], "7");
    assert_eq!(shown["items"][1]["quantity"].as_f64(), Some(1.0));

    assert_exit(&run(d, &["remove", "site.json", "--id", "7"]), 0);
    let shown = show_json(d, "site.json");
    assert_eq!(shown["items"].as_array().unwrap().len(), 1);
    assert_eq!(shown["total"].as_f64(), Some(4.0));
}

#[test]
fn refresh_updates_prices() {
    let dir = tempfile::tempdir().unwrap();
    let d = dir.path();
    write(d, "site.json", r#"{"name": "S", "items": [{"id": 7, "name": "Valve", "quantity": 2, "unit_price": 30}]}"#);
    write(d, "catalog.json", r#"[{"id": 7, "name": "Valve DN50", "price": 35.0}]"#);

    let out = run(d, &["refresh", "site.json", "--catalog", "catalog.json"]);
    assert_exit(&out, 0);
    assert!(stdout(&out).contains("1 price(s) updated"));
    assert_eq!(show_json(d, "site.json")["total"].as_f64(), Some(70.0));
}

#[test]
fn authoring_error_codes() {
    let dir = tempfile::tempdir().unwrap();
    let d = dir.path();
    write(d, "catalog.json", "[]");
    assert_exit(&run(d, &["new", "S", "-o", "site.json"]), 0);
    let before = fs::read(d.join("site.json")).unwrap();

    assert_exit(&run(d, &["new", "S", "-o", "site.json"]), 2);
    assert_exit(&run(d, &["add", "site.json", "--id", "9", "--qty", "1", "--catalog", "catalog.json"]), 10);
    assert_exit(&run(d, &["remove", "site.json", "--id", "9"]), 11);
    assert_exit(&run(d, &["add", "site.json", "--id", "1", "--name", "X", "--qty=-1"]), 12);
    // Neither --name nor --catalog
    assert_exit(&run(d, &["add", "site.json", "--id", "1", "--qty", "1"]), 2);
    assert_exit(&run(d, &["add", "site.json", "--id", "1", "--name", "X", "--qty", "1", "--price", "inf"]), 13);
    assert_exit(&run(d, &["add", "site.json", "--id", "1", "--name", "X", "--qty", "1", "--price", "NaN"]), 13);
    assert_exit(&run(d, &["add", "site.json", "--id", "", "--name", "X", "--qty", "1"]), 14);
    assert_exit(&run(d, &["add", "site.json", "--id", "  ", "--name", "X", "--qty", "1"]), 14);
    assert_exit(&run(d, &["set-qty", "site.json", "--id", "", "--qty", "1"]), 14);

    assert_eq!(fs::read(d.join("site.json")).unwrap(), before, "failed edits leave the file untouched");
}

#[test]
fn show_lists_items() {
    let dir = worked_example();
    let out = run(dir.path(), &["show", "a.json"]);
    assert_exit(&out, 0);
    let text = stdout(&out);
    assert!(text.starts_with("A (2 item(s))"), "{text}");
    assert!(text.contains("Bolt"));
    assert!(text.trim_end().ends_with("Total: 22.00"), "{text}");
}

// dirs::config_dir honours XDG_CONFIG_HOME only on Linux
#[cfg(target_os = "linux")]
#[test]
fn config_init_writes_defaults_once() {
    let dir = tempfile::tempdir().unwrap();
    let config_home = dir.path().join("xdg");
    let init = |force: bool| {
        let mut cmd = boq(dir.path());
        cmd.env("XDG_CONFIG_HOME", &config_home).args(["config", "init"]);
        if force {
            cmd.arg("--force");
        }
        cmd.output().expect("run boq")
    };

    let out = init(false);
    assert_exit(&out, 0);
    let path = config_home.join("boqsheet").join("settings.json");
    assert_eq!(stdout(&out).trim(), path.display().to_string());
    let written: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(written["sheet.name"], "Combined BoQ");

    assert_exit(&init(false), 2);
    assert_exit(&init(true), 0);
}
