use std::fs;

use assert_cmd::Command;
use assert_fs::prelude::*;
use dynform_spec::ResponseStore;
use predicates::prelude::*;
use serde_json::{Value, json};

fn survey() -> Value {
    json!({
        "sections": [
            { "title": "About", "fields": [
                { "label": "Name", "type": "text", "required": true }
            ]},
            { "title": "Work", "fields": [
                { "label": "Employed?", "type": "radio", "options": ["Yes", "No"], "required": true },
                { "label": "Employer Name", "type": "text", "required": true,
                  "showWhen": { "key": "Employed?", "equals": "Yes" } },
                { "label": "Jobs", "type": "multiple", "rowLabels": ["Latest"],
                  "columnLabels": ["Company", "Role"], "tableData": [["", ""]] }
            ]}
        ]
    })
}

#[test]
fn wizard_command_gates_steps_and_writes_payload() -> Result<(), Box<dyn std::error::Error>> {
    let workspace = assert_fs::TempDir::new()?;
    let schema = workspace.child("schema.json");
    schema.write_str(&survey().to_string())?;
    let out = workspace.child("response.json");

    let stdin = ["", "Ada", "1", "", "Acme", ":back", "", "2", "Initech | Engineer", ""]
        .join("\n");
    Command::cargo_bin("dynform")?
        .arg("wizard")
        .arg("--schema")
        .arg(schema.path())
        .arg("--out")
        .arg(out.path())
        .write_stdin(format!("{}\n", stdin))
        .assert()
        .success()
        .stderr(predicate::str::contains("Name is required"))
        .stderr(predicate::str::contains("Employer Name is required"));

    let written: Value = serde_json::from_str(&fs::read_to_string(out.path())?)?;
    assert_eq!(
        written,
        json!({
            "Name": "Ada",
            "Employed?": "No",
            "Jobs": {
                "rows": ["Latest"],
                "columns": ["Company", "Role"],
                "values": [["Initech", "Engineer"]]
            }
        })
    );
    Ok(())
}

#[test]
fn validate_command_reports_missing_answers() -> Result<(), Box<dyn std::error::Error>> {
    let workspace = assert_fs::TempDir::new()?;
    let schema = workspace.child("schema.json");
    schema.write_str(&json!({ "success": true, "schema": survey() }).to_string())?;
    let responses = workspace.child("responses.json");
    responses.write_str(&json!({ "Name": "Ada", "Employed?": "Yes" }).to_string())?;

    Command::cargo_bin("dynform")?
        .arg("validate")
        .arg("--schema")
        .arg(schema.path())
        .arg("--responses")
        .arg(responses.path())
        .assert()
        .failure()
        .stdout(predicate::str::contains("Validation result: invalid"))
        .stdout(predicate::str::contains("Employer Name: Employer Name is required"));

    responses.write_str(&json!({ "Name": "Ada", "Employed?": "No" }).to_string())?;
    Command::cargo_bin("dynform")?
        .arg("validate")
        .arg("--schema")
        .arg(schema.path())
        .arg("--responses")
        .arg(responses.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Validation result: valid"));
    Ok(())
}

#[test]
fn clean_command_drops_blank_rows_and_options() -> Result<(), Box<dyn std::error::Error>> {
    let workspace = assert_fs::TempDir::new()?;
    let schema = workspace.child("schema.json");
    schema.write_str(
        &json!({
            "sections": [{ "title": "S", "fields": [
                { "label": "Pick", "type": "select", "options": ["a", "", "b"] },
                { "label": "Grid", "type": "checkbox-matrix",
                  "rowLabels": ["x", ""], "columnLabels": ["c"],
                  "tableData": [[true], [false]] }
            ]}]
        })
        .to_string(),
    )?;
    let out = workspace.child("clean.json");

    Command::cargo_bin("dynform")?
        .arg("clean")
        .arg("--schema")
        .arg(schema.path())
        .arg("--out")
        .arg(out.path())
        .assert()
        .success();

    let cleaned: Value = serde_json::from_str(&fs::read_to_string(out.path())?)?;
    let fields = &cleaned["sections"][0]["fields"];
    assert_eq!(fields[0]["options"], json!(["a", "b"]));
    assert_eq!(fields[1]["rowLabels"], json!(["x"]));
    assert_eq!(fields[1]["tableData"], json!([[true]]));
    assert!(fields[0]["id"].is_string());
    Ok(())
}

#[test]
fn render_command_uses_config_messages() -> Result<(), Box<dyn std::error::Error>> {
    let workspace = assert_fs::TempDir::new()?;
    let schema = workspace.child("schema.json");
    schema.write_str(&survey().to_string())?;
    let config = workspace.child("config.json");
    config.write_str(r#"{ "messages": { "required": "Missing: {{label}}" } }"#)?;

    Command::cargo_bin("dynform")?
        .arg("render")
        .arg("--schema")
        .arg(schema.path())
        .arg("--config")
        .arg(config.path())
        .arg("--step")
        .arg("2")
        .arg("--show-errors")
        .assert()
        .success()
        .stdout(predicate::str::contains("Step 2/2: Work"))
        .stdout(predicate::str::contains("! Missing: Employed?"))
        .stdout(predicate::str::contains("Employer Name").not());

    Command::cargo_bin("dynform")?
        .arg("render")
        .arg("--schema")
        .arg(schema.path())
        .arg("--step")
        .arg("3")
        .assert()
        .failure();
    Ok(())
}

#[test]
fn draft_is_written_between_steps_and_resumed() -> Result<(), Box<dyn std::error::Error>> {
    let workspace = assert_fs::TempDir::new()?;
    let schema = workspace.child("schema.json");
    schema.write_str(&survey().to_string())?;
    let draft = workspace.child("draft.cbor");
    let out = workspace.child("response.json");

    Command::cargo_bin("dynform")?
        .arg("wizard")
        .arg("--schema")
        .arg(schema.path())
        .arg("--draft")
        .arg(draft.path())
        .write_stdin("Grace\n")
        .assert()
        .failure();
    draft.assert(predicate::path::exists());

    let bytes = fs::read(draft.path())?;
    let store = ResponseStore::from_cbor(&bytes)?;
    assert!(
        store
            .iter()
            .any(|(_, answer)| answer.as_text() == Some("Grace"))
    );

    Command::cargo_bin("dynform")?
        .arg("wizard")
        .arg("--schema")
        .arg(schema.path())
        .arg("--draft")
        .arg(draft.path())
        .arg("--out")
        .arg(out.path())
        .write_stdin("\n2\n\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("current: Grace"))
        .stderr(predicate::str::contains("Name is required").not());

    let written: Value = serde_json::from_str(&fs::read_to_string(out.path())?)?;
    assert_eq!(written["Name"], json!("Grace"));
    assert_eq!(written["Employed?"], json!("No"));
    draft.assert(predicate::path::missing());
    Ok(())
}

#[test]
fn json_schema_command_prints_document() -> Result<(), Box<dyn std::error::Error>> {
    Command::cargo_bin("dynform")?
        .arg("json-schema")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"sections\""));
    Ok(())
}
