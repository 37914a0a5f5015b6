use assert_cmd::Command;
use indoc::indoc;
use std::fs;
use tempfile::TempDir;

const SOURCE: &str = indoc! {"
    PROCEDURE save_emp IS
    BEGIN
      INSERT INTO emp VALUES (:EMP.ID);
      COMMIT;
    END save_emp;
"};

const TRIGGERS: &str = r#"[
  {"name": "WHEN-BUTTON-PRESSED", "code": "save_emp;", "block": "CONTROL", "item": "SAVE"}
]"#;

fn formsmap(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("formsmap").unwrap();
    cmd.current_dir(dir.path()).env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_analyze_json_to_stdout() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("emp.pll"), SOURCE).unwrap();
    fs::write(dir.path().join("triggers.json"), TRIGGERS).unwrap();

    let output = formsmap(&dir)
        .args(["analyze", "emp.pll", "--triggers", "triggers.json", "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["form"], "EMP");
    assert_eq!(value["triggers"][0]["called_program_units"][0], "SAVE_EMP");
    assert_eq!(value["hierarchy"]["entry_points"][0]["children"][0]["name"], "SAVE_EMP");
}

#[test]
fn test_config_page_number_applies() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("emp.pll"), SOURCE).unwrap();
    fs::write(
        dir.path().join("triggers.json"),
        r#"[{"name": "WHEN-VALIDATE-ITEM", "code": "IF :EMP.SAL < 0 THEN NULL; END IF;"}]"#,
    )
    .unwrap();
    fs::write(dir.path().join(".formsmap.toml"), "[target]\npage_number = 12\n").unwrap();

    let output = formsmap(&dir)
        .args(["analyze", "emp.pll", "-t", "triggers.json", "-f", "json", "-o", "out.json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    assert!(output.stdout.is_empty());

    let written = fs::read_to_string(dir.path().join("out.json")).unwrap();
    assert!(written.contains(":P12_SAL /* :EMP.SAL */"));
}

#[test]
fn test_empty_source_fails_with_message() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("blank.pll"), "-- nothing\n").unwrap();

    let output = formsmap(&dir)
        .args(["analyze", "blank.pll", "--format", "markdown"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("No procedures or functions found in blank.pll"));
}

#[test]
fn test_init_writes_config_once() {
    let dir = TempDir::new().unwrap();

    formsmap(&dir).arg("init").assert().success();
    assert!(dir.path().join(".formsmap.toml").exists());

    formsmap(&dir).arg("init").assert().failure();
    formsmap(&dir).args(["init", "--force"]).assert().success();
}
