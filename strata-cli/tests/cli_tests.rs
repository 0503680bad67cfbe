//! Integration tests for the Strata CLI

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const V1: &str = "CREATE TABLE users (\n  id INTEGER PRIMARY KEY,\n  name TEXT NOT NULL\n);\n\nCREATE INDEX users_name ON users (name);\n";
const V2: &str = "CREATE TABLE users (\n  id INTEGER PRIMARY KEY,\n  name TEXT NOT NULL,\n  email TEXT\n);\n\nCREATE INDEX users_name ON users (name);\n";

/// Get the strata binary, isolated from any ambient configuration
#[allow(deprecated)]
fn strata_cmd(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("strata").unwrap();
    cmd.current_dir(dir)
        .env_remove("STRATA_CONFIG")
        .env_remove("RUST_LOG")
        .env("NO_COLOR", "1");
    cmd
}

fn write_schema(dir: &Path, name: &str, sql: &str) {
    fs::write(dir.join(name), sql).unwrap();
}

fn digest_of(dir: &Path, target: &str) -> String {
    let output = strata_cmd(dir).args(["digest", target]).output().unwrap();
    assert!(output.status.success(), "digest {} failed", target);
    let stdout = String::from_utf8(output.stdout).unwrap();
    stdout
        .split_whitespace()
        .last()
        .expect("digest output")
        .to_string()
}

fn apply(dir: &Path, db: &str, schema: &str) {
    strata_cmd(dir).args(["apply", db, schema]).assert().success();
}

#[test]
fn test_help_command() {
    let dir = TempDir::new().unwrap();
    strata_cmd(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Strata CLI"))
        .stdout(predicate::str::contains("digest"))
        .stdout(predicate::str::contains("diff"))
        .stdout(predicate::str::contains("history"))
        .stdout(predicate::str::contains("apply"));
}

#[test]
fn test_version_command() {
    let dir = TempDir::new().unwrap();
    strata_cmd(dir.path())
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("Version"))
        .stdout(predicate::str::contains("0.1.0"))
        .stdout(predicate::str::contains("SQLite"));
}

#[test]
fn test_digest_of_sql_file() {
    let dir = TempDir::new().unwrap();
    write_schema(dir.path(), "schema.sql", V1);

    strata_cmd(dir.path())
        .args(["digest", "schema.sql"])
        .assert()
        .success()
        .stdout(predicate::str::is_match("^sql: [0-9a-f]{64}\n$").unwrap());
}

#[test]
fn test_digest_ignores_formatting() {
    let dir = TempDir::new().unwrap();
    write_schema(dir.path(), "a.sql", V1);
    write_schema(
        dir.path(),
        "b.txt",
        "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT NOT NULL);\nCREATE INDEX users_name ON users (name);",
    );

    let a = digest_of(dir.path(), "a.sql");
    let output = strata_cmd(dir.path())
        .args(["digest", "--sql", "b.txt"])
        .output()
        .unwrap();
    let b = String::from_utf8(output.stdout).unwrap();
    assert_eq!(b.trim(), format!("sql: {}", a));
}

#[test]
fn test_digest_missing_database() {
    let dir = TempDir::new().unwrap();
    strata_cmd(dir.path())
        .args(["digest", "missing.db"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));
    assert!(!dir.path().join("missing.db").exists());
}

#[test]
fn test_digest_without_path_uses_config() {
    let dir = TempDir::new().unwrap();
    write_schema(dir.path(), "schema.sql", V1);
    apply(dir.path(), "app.db", "schema.sql");
    fs::write(
        dir.path().join("strata.toml"),
        "[database]\nurl = \"app.db\"\n",
    )
    .unwrap();

    strata_cmd(dir.path())
        .arg("digest")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("db:  "));
}

#[test]
fn test_apply_then_database_digest_matches_sql() {
    let dir = TempDir::new().unwrap();
    write_schema(dir.path(), "schema.sql", V1);

    strata_cmd(dir.path())
        .args(["apply", "app.db", "schema.sql"])
        .assert()
        .success()
        .stdout(predicate::str::contains("applying initial schema"));

    assert_eq!(digest_of(dir.path(), "app.db"), digest_of(dir.path(), "schema.sql"));

    strata_cmd(dir.path())
        .args(["apply", "app.db", "schema.sql"])
        .assert()
        .success()
        .stdout(predicate::str::contains("up-to-date"));
}

#[test]
fn test_apply_refuses_changed_schema_without_rules() {
    let dir = TempDir::new().unwrap();
    write_schema(dir.path(), "v1.sql", V1);
    write_schema(dir.path(), "v2.sql", V2);
    apply(dir.path(), "app.db", "v1.sql");

    strata_cmd(dir.path())
        .args(["apply", "app.db", "v2.sql"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Migration error"));
}

#[test]
fn test_diff_matching() {
    let dir = TempDir::new().unwrap();
    write_schema(dir.path(), "schema.sql", V1);
    apply(dir.path(), "app.db", "schema.sql");

    strata_cmd(dir.path())
        .args(["diff", "app.db", "schema.sql"])
        .assert()
        .success()
        .stdout(predicate::str::contains("db:  "))
        .stdout(predicate::str::contains("sql: "));
}

#[test]
fn test_diff_mismatch_fails() {
    let dir = TempDir::new().unwrap();
    write_schema(dir.path(), "v1.sql", V1);
    write_schema(dir.path(), "v2.sql", V2);
    apply(dir.path(), "app.db", "v1.sql");

    strata_cmd(dir.path())
        .args(["diff", "app.db", "v2.sql"])
        .assert()
        .failure()
        .stdout(predicate::str::contains(">> Modify table \"users\""))
        .stdout(predicate::str::contains("add column email TEXT"))
        .stderr(predicate::str::contains("does not match"));
}

#[test]
fn test_diff_rule_stub() {
    let dir = TempDir::new().unwrap();
    write_schema(dir.path(), "v1.sql", V1);
    write_schema(dir.path(), "v2.sql", V2);
    apply(dir.path(), "app.db", "v1.sql");
    let source = digest_of(dir.path(), "v1.sql");
    let target = digest_of(dir.path(), "v2.sql");

    strata_cmd(dir.path())
        .args(["diff", "--rule", "app.db", "v2.sql"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("UpdateRule::from_fn("))
        .stdout(predicate::str::contains(format!("\"{}\"", source)))
        .stdout(predicate::str::contains(format!("\"{}\"", target)))
        .stdout(predicate::str::contains("// >> Modify table \"users\""))
        .stdout(predicate::str::contains("todo!()"));

    strata_cmd(dir.path())
        .args(["diff", "--rule", "app.db", "v1.sql"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no rule needed"));
}

#[test]
fn test_history_text_and_json() {
    let dir = TempDir::new().unwrap();
    write_schema(dir.path(), "schema.sql", V1);
    apply(dir.path(), "app.db", "schema.sql");
    let digest = digest_of(dir.path(), "schema.sql");

    let line = format!(r"^\S+Z\t{}\t\[{} bytes\]\n$", digest, V1.len());
    strata_cmd(dir.path())
        .args(["history", "app.db"])
        .assert()
        .success()
        .stdout(predicate::str::is_match(line).unwrap());

    let output = strata_cmd(dir.path())
        .args(["history", "app.db", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    let record: serde_json::Value = serde_json::from_str(stdout.trim()).unwrap();
    assert_eq!(record["digest"], digest.as_str());
    assert_eq!(record["schema"], V1);
}

#[test]
fn test_history_filters() {
    let dir = TempDir::new().unwrap();
    write_schema(dir.path(), "schema.sql", V1);
    apply(dir.path(), "app.db", "schema.sql");
    let digest = digest_of(dir.path(), "schema.sql");

    strata_cmd(dir.path())
        .args(["history", "app.db", "latest"])
        .assert()
        .success()
        .stdout(predicate::str::contains(digest.as_str()));

    strata_cmd(dir.path())
        .args(["history", "app.db", &digest[..8]])
        .assert()
        .success()
        .stdout(predicate::str::contains(digest.as_str()));

    let other = if digest.starts_with('0') { "1" } else { "0" };
    strata_cmd(dir.path())
        .args(["history", "app.db", other])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

#[test]
fn test_history_missing_table() {
    let dir = TempDir::new().unwrap();
    write_schema(dir.path(), "schema.sql", V1);
    apply(dir.path(), "app.db", "schema.sql");

    strata_cmd(dir.path())
        .args(["--history-table", "other_history", "history", "app.db"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no history table \"other_history\""));
}

#[test]
fn test_custom_history_table() {
    let dir = TempDir::new().unwrap();
    write_schema(dir.path(), "schema.sql", V1);

    strata_cmd(dir.path())
        .args(["--history-table", "versions", "apply", "app.db", "schema.sql"])
        .assert()
        .success();

    strata_cmd(dir.path())
        .args(["--history-table", "versions", "history", "app.db"])
        .assert()
        .success()
        .stdout(predicate::str::contains("bytes"));

    strata_cmd(dir.path())
        .args(["history", "app.db"])
        .assert()
        .failure();

    let db = digest_of(dir.path(), "app.db");
    let output = strata_cmd(dir.path())
        .args(["--history-table", "versions", "digest", "app.db"])
        .output()
        .unwrap();
    let with_table = String::from_utf8(output.stdout).unwrap();
    assert_eq!(with_table.trim(), format!("db:  {}", digest_of(dir.path(), "schema.sql")));
    assert_ne!(db, digest_of(dir.path(), "schema.sql"));
}

#[test]
fn test_config_file_history_table() {
    let dir = TempDir::new().unwrap();
    write_schema(dir.path(), "schema.sql", V1);
    fs::write(dir.path().join("strata.toml"), "[history]\ntable = \"ledger\"\n").unwrap();
    apply(dir.path(), "app.db", "schema.sql");

    strata_cmd(dir.path())
        .args(["history", "app.db", "latest"])
        .assert()
        .success();

    strata_cmd(dir.path())
        .args(["--history-table", "_schema_history", "history", "app.db"])
        .assert()
        .failure();
}

#[test]
fn test_missing_config_file() {
    let dir = TempDir::new().unwrap();
    strata_cmd(dir.path())
        .args(["--config", "nope.toml", "version"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}
