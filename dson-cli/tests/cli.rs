use predicates::prelude::*;
use serde_json::Value;
use std::error::Error;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

const SAMPLE_TREE: &str = r#"[
    {"key": "__revision_dont_touch", "type": "int", "value": 2},
    {"key": "base_root", "type": "object", "fields": [
        {"key": "gold", "type": "int", "value": 2500},
        {"key": "estate_name", "type": "string", "value": "Hamlet"},
        {"key": "flags", "type": "object", "fields": [
            {"key": "tutorial_done", "type": "bool", "value": true}
        ]}
    ]}
]"#;

struct SampleFile {
    _dir: TempDir,
    dir_path: PathBuf,
    dson_path: PathBuf,
}

fn build_sample_file() -> Result<SampleFile, Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let input_path = dir.path().join("tree.json");
    let dson_path = dir.path().join("persist.estate.json");
    fs::write(&input_path, SAMPLE_TREE)?;

    assert_cmd::Command::cargo_bin("dson")?
        .args([
            "encode",
            input_path.to_str().unwrap(),
            "-o",
            dson_path.to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Encoded 5 fields (2 objects)"));

    Ok(SampleFile {
        dir_path: dir.path().to_path_buf(),
        _dir: dir,
        dson_path,
    })
}

#[test]
fn encode_writes_magic_number() -> Result<(), Box<dyn Error>> {
    let sample = build_sample_file()?;
    let bytes = fs::read(&sample.dson_path)?;
    assert_eq!(&bytes[0..4], &[0x01, 0xB1, 0x00, 0x00]);
    Ok(())
}

#[test]
fn inspect_table_lists_fields() -> Result<(), Box<dyn Error>> {
    let sample = build_sample_file()?;
    let output = assert_cmd::Command::cargo_bin("dson")?
        .args(["inspect", sample.dson_path.to_str().unwrap()])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let stdout = String::from_utf8(output)?;
    assert!(stdout.contains("Revision: 2"));
    assert!(stdout.contains("estate_name"));
    assert!(stdout.contains("tutorial_done"));
    Ok(())
}

#[test]
fn inspect_json_output_parses() -> Result<(), Box<dyn Error>> {
    let sample = build_sample_file()?;
    let output = assert_cmd::Command::cargo_bin("dson")?
        .args([
            "inspect",
            sample.dson_path.to_str().unwrap(),
            "--format",
            "json",
        ])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let report: Value = serde_json::from_slice(&output)?;
    assert_eq!(report["revision"], 2);
    assert_eq!(report["num_objects"], 2);
    let fields = report["fields"].as_array().unwrap();
    assert_eq!(fields.len(), 5);
    assert_eq!(fields[0]["name"], "base_root");
    assert_eq!(fields[0]["parent"], -1);
    assert_eq!(fields[1]["type"], "int");
    assert_eq!(fields[2]["type"], "string");
    Ok(())
}

#[test]
fn decode_reproduces_tree() -> Result<(), Box<dyn Error>> {
    let sample = build_sample_file()?;
    let output = assert_cmd::Command::cargo_bin("dson")?
        .args(["decode", sample.dson_path.to_str().unwrap()])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let decoded: Value = serde_json::from_slice(&output)?;
    let expected: Value = serde_json::from_str(SAMPLE_TREE)?;
    assert_eq!(decoded, expected);
    Ok(())
}

#[test]
fn decode_then_encode_is_stable() -> Result<(), Box<dyn Error>> {
    let sample = build_sample_file()?;
    let tree_path = sample.dir_path.join("decoded.json");
    let again_path = sample.dir_path.join("again.json");

    assert_cmd::Command::cargo_bin("dson")?
        .args([
            "decode",
            sample.dson_path.to_str().unwrap(),
            "-o",
            tree_path.to_str().unwrap(),
            "--pretty",
        ])
        .assert()
        .success();
    assert_cmd::Command::cargo_bin("dson")?
        .args([
            "encode",
            tree_path.to_str().unwrap(),
            "-o",
            again_path.to_str().unwrap(),
        ])
        .assert()
        .success();

    assert_eq!(fs::read(&sample.dson_path)?, fs::read(&again_path)?);
    Ok(())
}

#[test]
fn hash_prints_name_hash() -> Result<(), Box<dyn Error>> {
    assert_cmd::Command::cargo_bin("dson")?
        .args(["hash", "foo"])
        .assert()
        .success()
        .stdout(predicate::str::contains("name_hash=15503136"))
        .stdout(predicate::str::contains("hash=292512"));
    Ok(())
}

#[test]
fn encode_rejects_missing_revision() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let input_path = dir.path().join("tree.json");
    fs::write(
        &input_path,
        r#"[{"key": "foo", "type": "bool", "value": true}]"#,
    )?;

    assert_cmd::Command::cargo_bin("dson")?
        .args([
            "encode",
            input_path.to_str().unwrap(),
            "-o",
            dir.path().join("out.json").to_str().unwrap(),
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("RevisionNotFound"));
    Ok(())
}

#[test]
fn encode_rejects_unknown_type() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let input_path = dir.path().join("tree.json");
    fs::write(
        &input_path,
        r#"[{"key": "__revision_dont_touch", "type": "int", "value": 0},
            {"key": "hp", "type": "quaternion", "value": 1}]"#,
    )?;

    assert_cmd::Command::cargo_bin("dson")?
        .args([
            "encode",
            input_path.to_str().unwrap(),
            "-o",
            dir.path().join("out.json").to_str().unwrap(),
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("quaternion"));
    Ok(())
}

#[test]
fn inspect_rejects_non_dson_input() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("plain.json");
    fs::write(&path, r#"{"not": "dson", "padding": "........................................................."}"#)?;

    assert_cmd::Command::cargo_bin("dson")?
        .args(["inspect", path.to_str().unwrap()])
        .assert()
        .failure();
    Ok(())
}
