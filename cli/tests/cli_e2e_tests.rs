//! CLI end-to-end tests exercising realistic, messy LLM-shaped inputs
//! against small hand-written schemas, rather than strict/fixture JSON.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn cmd() -> Command {
    Command::cargo_bin("jsonish").expect("binary should exist")
}

fn recipe_ingredient_schema() -> String {
    serde_json::json!({
        "anyOf": [
            {"type": "string"},
            {"type": "integer"}
        ]
    })
    .to_string()
}

#[test]
fn fenced_json_with_commentary_is_recovered() {
    let dir = TempDir::new().unwrap();
    let schema_path = dir.path().join("schema.json");
    fs::write(
        &schema_path,
        serde_json::json!({
            "type": "object",
            "properties": {
                "title": {"type": "string"},
                "ready": {"type": "boolean"}
            },
            "required": ["title"]
        })
        .to_string(),
    )
    .unwrap();

    let input = "Here's the JSON you asked for:\n```json\n{\"title\": \"Omelette\", \"ready\": true}\n```\nLet me know if you need anything else!";

    cmd()
        .args(["parse", "--schema", schema_path.to_str().unwrap()])
        .write_stdin(input)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"title\":\"Omelette\""))
        .stdout(predicate::str::contains("\"ready\":true"));
}

#[test]
fn bare_number_coerces_against_a_union_of_string_and_int() {
    let dir = TempDir::new().unwrap();
    let schema_path = dir.path().join("schema.json");
    fs::write(&schema_path, recipe_ingredient_schema()).unwrap();

    cmd()
        .args(["parse", "--schema", schema_path.to_str().unwrap()])
        .write_stdin("42")
        .assert()
        .success()
        .stdout(predicate::str::contains("42"));
}

#[test]
fn prose_with_an_embedded_number_prefers_the_string_arm() {
    let dir = TempDir::new().unwrap();
    let schema_path = dir.path().join("schema.json");
    fs::write(&schema_path, recipe_ingredient_schema()).unwrap();

    cmd()
        .args(["parse", "--schema", schema_path.to_str().unwrap()])
        .write_stdin("1 cup butter")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"1 cup butter\""));
}

#[test]
fn enum_matches_despite_surrounding_prose_and_markdown_emphasis() {
    let dir = TempDir::new().unwrap();
    let schema_path = dir.path().join("schema.json");
    fs::write(
        &schema_path,
        serde_json::json!({"enum": ["ONE", "TWO", "THREE"]}).to_string(),
    )
    .unwrap();

    cmd()
        .args(["parse", "--schema", schema_path.to_str().unwrap()])
        .write_stdin("The answer is **two**.")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"TWO\""));
}

#[test]
fn recursive_schema_parses_nested_structures() {
    let dir = TempDir::new().unwrap();
    let schema_path = dir.path().join("schema.json");
    fs::write(
        &schema_path,
        serde_json::json!({
            "$defs": {
                "Node": {
                    "type": "object",
                    "properties": {
                        "value": {"type": "integer"},
                        "children": {"type": "array", "items": {"$ref": "#/$defs/Node"}}
                    },
                    "required": ["value"]
                }
            },
            "$ref": "#/$defs/Node"
        })
        .to_string(),
    )
    .unwrap();

    let input = r#"{"value": 1, "children": [{"value": 2, "children": []}]}"#;

    cmd()
        .args(["parse", "--schema", schema_path.to_str().unwrap()])
        .write_stdin(input)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"value\":2"));
}

#[test]
fn malformed_schema_file_fails_with_nonempty_stderr() {
    let dir = TempDir::new().unwrap();
    let schema_path = dir.path().join("schema.json");
    fs::write(&schema_path, "not json at all {{{").unwrap();

    cmd()
        .args(["parse", "--schema", schema_path.to_str().unwrap()])
        .write_stdin("{}")
        .assert()
        .failure()
        .stderr(predicate::str::is_empty().not());
}
