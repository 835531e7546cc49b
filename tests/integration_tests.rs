//! Integration tests for the taskboard binary
//!
//! These tests drive the CLI end to end: argument parsing, configuration
//! layering and database initialization.

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// Helper to create a taskboard Command with a clean environment
fn taskboard() -> Command {
    let mut cmd = cargo_bin_cmd!("taskboard");
    cmd.env_remove("TASKBOARD_HOST")
        .env_remove("TASKBOARD_PORT")
        .env_remove("TASKBOARD_DB_PATH")
        .env_remove("TASKBOARD_LOG_LEVEL")
        .env_remove("TASKBOARD_USER")
        .env_remove("RUST_LOG");
    cmd
}

fn create_temp_dir() -> TempDir {
    TempDir::new().unwrap()
}

// =============================================================================
// Basic CLI Tests
// =============================================================================

mod cli_basics {
    use super::*;

    #[test]
    fn test_taskboard_help() {
        taskboard()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("serve"))
            .stdout(predicate::str::contains("watch"));
    }

    #[test]
    fn test_taskboard_version() {
        taskboard()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
    }

    #[test]
    fn test_unknown_subcommand_fails() {
        taskboard().arg("frobnicate").assert().failure();
    }

    #[test]
    fn test_watch_requires_user() {
        let dir = create_temp_dir();
        taskboard()
            .current_dir(dir.path())
            .args(["watch", "1"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("--user"));
    }
}

// =============================================================================
// Init Tests
// =============================================================================

mod init {
    use super::*;

    #[test]
    fn test_init_creates_database() {
        let dir = create_temp_dir();
        let db_path = dir.path().join("data").join("board.db");

        taskboard()
            .current_dir(dir.path())
            .args(["init", "--db-path"])
            .arg(&db_path)
            .assert()
            .success()
            .stdout(predicate::str::contains("Board database initialized"));

        assert!(db_path.exists());
    }

    #[test]
    fn test_init_is_idempotent() {
        let dir = create_temp_dir();
        let db_path = dir.path().join("board.db");

        for _ in 0..2 {
            taskboard()
                .current_dir(dir.path())
                .args(["init", "--db-path"])
                .arg(&db_path)
                .assert()
                .success();
        }
        assert!(db_path.exists());
    }

    #[test]
    fn test_init_uses_db_path_from_config_file() {
        let dir = create_temp_dir();
        fs::write(
            dir.path().join("taskboard.toml"),
            "[server]\ndb_path = \"from-config.db\"\n",
        )
        .unwrap();

        taskboard()
            .current_dir(dir.path())
            .arg("init")
            .assert()
            .success();

        assert!(dir.path().join("from-config.db").exists());
    }

    #[test]
    fn test_env_overrides_config_file() {
        let dir = create_temp_dir();
        fs::write(
            dir.path().join("taskboard.toml"),
            "[server]\ndb_path = \"from-config.db\"\n",
        )
        .unwrap();

        taskboard()
            .current_dir(dir.path())
            .env("TASKBOARD_DB_PATH", "from-env.db")
            .arg("init")
            .assert()
            .success();

        assert!(dir.path().join("from-env.db").exists());
        assert!(!dir.path().join("from-config.db").exists());
    }
}

// =============================================================================
// Configuration Errors
// =============================================================================

mod config_errors {
    use super::*;

    #[test]
    fn test_missing_explicit_config_fails() {
        let dir = create_temp_dir();
        taskboard()
            .current_dir(dir.path())
            .args(["--config", "nope.toml", "init"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Failed to read config file"));
    }

    #[test]
    fn test_malformed_config_fails() {
        let dir = create_temp_dir();
        fs::write(dir.path().join("taskboard.toml"), "[server\nport = ").unwrap();

        taskboard()
            .current_dir(dir.path())
            .arg("init")
            .assert()
            .failure()
            .stderr(predicate::str::contains("Failed to parse taskboard.toml"));
    }

    #[test]
    fn test_invalid_port_env_fails() {
        let dir = create_temp_dir();
        taskboard()
            .current_dir(dir.path())
            .env("TASKBOARD_PORT", "not-a-port")
            .args(["init", "--db-path", "x.db"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("TASKBOARD_PORT"));
    }

    #[test]
    fn test_zero_poll_interval_rejected() {
        let dir = create_temp_dir();
        fs::write(
            dir.path().join("taskboard.toml"),
            "[sync]\npoll_interval_secs = 0\n",
        )
        .unwrap();

        taskboard()
            .current_dir(dir.path())
            .args(["init", "--db-path", "x.db"])
            .assert()
            .failure();
        assert!(!dir.path().join("x.db").exists());
    }
}
