//! End-to-end tests for the numjitc CLI.
//!
//! Each test writes a JSON tree (and optionally a config or source file)
//! to a temp dir, invokes `numjitc compile`, and checks its output.

use std::path::Path;
use std::process::{Command, Output};

// ── Helpers ────────────────────────────────────────────────────────────

const TOTAL: &str = r#"{
    "name": "total",
    "args": ["xs"],
    "body": [
        {"kind": {"Assign": {
            "targets": [{"kind": {"Name": {"id": "s", "ctx": "Store"}}}],
            "value": {"kind": {"Const": {"Float": 0.0}}}
        }}},
        {"kind": {"For": {
            "target": {"kind": {"Name": {"id": "x", "ctx": "Store"}}},
            "iter": {"kind": {"Name": {"id": "xs"}}},
            "body": [{"kind": {"AugAssign": {
                "target": {"kind": {"Name": {"id": "s", "ctx": "Store"}}},
                "op": "Add",
                "value": {"kind": {"Name": {"id": "x"}}}
            }}}]
        }}},
        {"kind": {"Return": {"value": {"kind": {"Name": {"id": "s"}}}}}}
    ]
}"#;

fn numjitc(dir: &Path, tree: &str, args: &[&str]) -> Output {
    let path = dir.join("tree.json");
    std::fs::write(&path, tree).expect("failed to write tree.json");
    Command::new(env!("CARGO_BIN_EXE_numjitc"))
        .arg("compile")
        .arg(&path)
        .args(args)
        .output()
        .expect("failed to invoke numjitc")
}

fn stdout(output: &Output) -> String {
    assert!(
        output.status.success(),
        "numjitc failed:\nstderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn stderr(output: &Output) -> String {
    assert_eq!(output.status.code(), Some(1), "expected numjitc to fail");
    String::from_utf8_lossy(&output.stderr).to_string()
}

// ── Tests ──────────────────────────────────────────────────────────────

#[test]
fn test_compile_prints_lowered_tree() {
    let dir = tempfile::tempdir().unwrap();
    let out = stdout(&numjitc(dir.path(), TOTAL, &["--arg", "float64[:]"]));
    assert!(out.starts_with("def total(xs):"), "{}", out);
    assert!(out.contains("# $t0: int64 (index)"), "{}", out);
    assert!(out.contains("for x in range(0, xs.shape[0], 1):  # index $t0"));
    assert!(out.contains("x = data(xs)[$t0]"));
}

#[test]
fn test_emit_signature() {
    let dir = tempfile::tempdir().unwrap();
    let out = stdout(&numjitc(
        dir.path(),
        TOTAL,
        &["--arg", "float32[:]", "--emit", "signature"],
    ));
    assert_eq!(out.trim(), "total: (float32[:]) -> float64");
}

#[test]
fn test_emit_json_round_trips_through_the_tree_format() {
    let dir = tempfile::tempdir().unwrap();
    let out = stdout(&numjitc(
        dir.path(),
        TOTAL,
        &["--arg", "float64[:]", "--emit", "json"],
    ));
    let value: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(value["name"], "total");
    assert_eq!(value["temps"].as_array().map(Vec::len), Some(1));
}

#[test]
fn test_config_sets_index_type() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("numjit.toml");
    std::fs::write(&config, "[types]\nindex_type = \"int32\"\n").unwrap();
    let out = stdout(&numjitc(
        dir.path(),
        TOTAL,
        &["--arg", "float64[:]", "--config", config.to_str().unwrap()],
    ));
    assert!(out.contains("# $t0: int32 (index)"), "{}", out);
}

#[test]
fn test_entry_calls_another_function_in_the_tree() {
    let tree = r#"[
        {"name": "f", "args": ["y"], "body": [
            {"kind": {"Return": {"value": {"kind": {"Call": {
                "func": {"kind": {"Name": {"id": "square"}}},
                "args": [{"kind": {"Name": {"id": "y"}}}]
            }}}}}}
        ]},
        {"name": "square", "args": ["x"], "body": [
            {"kind": {"Return": {"value": {"kind": {"BinOp": {
                "left": {"kind": {"Name": {"id": "x"}}},
                "op": "Mult",
                "right": {"kind": {"Name": {"id": "x"}}}
            }}}}}}
        ]}
    ]"#;
    let dir = tempfile::tempdir().unwrap();
    let out = stdout(&numjitc(dir.path(), tree, &["--arg", "float64"]));
    assert!(out.contains("return @square__float64(y)"), "{}", out);
}

#[test]
fn test_type_error_as_json() {
    let tree = r#"{"name": "f", "args": [], "body": [
        {"kind": {"Return": {"value": {"kind": {"Name": {"id": "y"}}, "span": {"start": 20, "end": 21}}}}},
        {"kind": {"Assign": {
            "targets": [{"kind": {"Name": {"id": "y", "ctx": "Store"}}}],
            "value": {"kind": {"Const": {"Int": 1}}}
        }}}
    ]}"#;
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("f.py");
    std::fs::write(&source, "def f():\n    return y\n    y = 1\n").unwrap();

    let err = stderr(&numjitc(
        dir.path(),
        tree,
        &["--source", source.to_str().unwrap(), "--json"],
    ));
    let line = err.lines().last().unwrap();
    let json: serde_json::Value = serde_json::from_str(line).unwrap();
    assert_eq!(json["code"], "E0013");
    assert_eq!(json["line"], 2);
    assert_eq!(json["column"], 12);
}

#[test]
fn test_unknown_entry() {
    let dir = tempfile::tempdir().unwrap();
    let err = stderr(&numjitc(dir.path(), TOTAL, &["--entry", "g"]));
    assert!(err.contains("error: no function named `g`"), "{}", err);
}

#[test]
fn test_malformed_tree() {
    let dir = tempfile::tempdir().unwrap();
    let err = stderr(&numjitc(dir.path(), "{\"name\": 3}", &[]));
    assert!(err.contains("Failed to parse"), "{}", err);
}
