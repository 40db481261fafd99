//! Smoke tests to verify command wiring

use assert_cmd::Command;
use predicates::prelude::*;

const DB_VARS: [&str; 5] = ["DB_HOST", "DB_PORT", "DB_NAME", "DB_USER", "DB_PASSWORD"];

fn bookshelf() -> Command {
    let mut cmd = Command::cargo_bin("bookshelf").unwrap();
    for var in DB_VARS {
        cmd.env_remove(var);
    }
    cmd
}

#[test]
fn test_help_lists_commands() {
    bookshelf()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("serve"))
        .stdout(predicate::str::contains("check-db"));
}

#[test]
fn test_serve_help() {
    bookshelf()
        .arg("serve")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--connection-mode"))
        .stdout(predicate::str::contains("--metrics-port"))
        .stdout(predicate::str::contains("--no-seed"));
}

#[test]
fn test_serve_rejects_unknown_backend() {
    bookshelf()
        .args(["serve", "--backend", "sqlite"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"));
}

#[test]
fn test_check_db_without_config() {
    bookshelf()
        .arg("check-db")
        .assert()
        .failure()
        .stderr(predicate::str::contains("DB_HOST"))
        .stderr(predicate::str::contains("DB_PASSWORD"));
}

#[test]
fn test_postgres_serve_without_config_binds_nothing() {
    bookshelf()
        .args(["serve", "--backend", "postgres", "--port", "0", "--metrics-port", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing required environment variables"));
}
