use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn ledger(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("ledger").unwrap();
    cmd.env("LEDGER_DATA_DIR", dir.path()).env_remove("LEDGER_LOG");
    cmd
}

#[test]
fn init_creates_database_and_settings() {
    let dir = TempDir::new().unwrap();

    ledger(&dir)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialization complete"));

    assert!(dir.path().join("ledger.db").exists());
    assert!(dir.path().join("config.json").exists());
}

#[test]
fn transaction_updates_account_balance() {
    let dir = TempDir::new().unwrap();

    ledger(&dir)
        .args(["account", "create", "Checking", "--balance", "100.00"])
        .assert()
        .success();
    ledger(&dir)
        .args(["txn", "add", "Checking", "-25.50", "--date", "2024-01-05", "--payee", "Grocer"])
        .assert()
        .success()
        .stdout(predicate::str::contains("expense"));

    ledger(&dir)
        .args(["account", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("$74.50"));

    ledger(&dir)
        .args(["txn", "list", "--account", "checking"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Grocer"));
}

#[test]
fn reimporting_the_same_file_fails() {
    let dir = TempDir::new().unwrap();
    let csv = dir.path().join("jan.csv");
    fs::write(
        &csv,
        "date,amount,description\n2024-01-02,-3.50,Coffee\n2024-01-03,bad,Broken\n",
    )
    .unwrap();

    ledger(&dir)
        .args(["account", "create", "Checking"])
        .assert()
        .success();

    ledger(&dir)
        .args(["import"])
        .arg(&csv)
        .args(["--account", "Checking"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Imported: 1"))
        .stdout(predicate::str::contains("line 3"));

    ledger(&dir)
        .args(["import"])
        .arg(&csv)
        .args(["--account", "Checking"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already imported"));

    ledger(&dir)
        .args(["history", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("jan.csv"));
}

#[test]
fn dry_run_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let csv = dir.path().join("feb.csv");
    fs::write(&csv, "date,amount,description\n2024-02-01,10.00,Refund\n").unwrap();

    ledger(&dir)
        .args(["account", "create", "Checking"])
        .assert()
        .success();

    ledger(&dir)
        .args(["import"])
        .arg(&csv)
        .args(["--account", "Checking", "--dry-run", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"dry_run\": true"));

    ledger(&dir)
        .args(["history", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No imports yet"));

    // The real import is still accepted after a dry run
    ledger(&dir)
        .args(["import"])
        .arg(&csv)
        .args(["--account", "Checking"])
        .assert()
        .success();
}

#[test]
fn unknown_account_is_reported() {
    let dir = TempDir::new().unwrap();

    ledger(&dir)
        .args(["txn", "add", "Nowhere", "5"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Account not found: Nowhere"));
}
