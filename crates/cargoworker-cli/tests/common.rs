//! Shared fixture for CLI integration tests.
//!
//! Each integration test file compiles this module separately, so not every
//! helper is used everywhere.
#![cfg(test)]
#![allow(dead_code)]

use assert_cmd::Command;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use uuid::Uuid;

pub struct TestFixture {
    _temp_dir: TempDir,
    project: PathBuf,
    out: PathBuf,
    run_id: Uuid,
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

impl TestFixture {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let project = temp_dir.path().join("project");
        let out = temp_dir.path().join("out");

        fs::create_dir_all(&project).expect("Failed to create project dir");

        Self {
            _temp_dir: temp_dir,
            project,
            out,
            run_id: Uuid::new_v4(),
        }
    }

    pub fn project(&self) -> &Path {
        &self.project
    }

    pub fn out(&self) -> &Path {
        &self.out
    }

    pub fn run_dir(&self) -> PathBuf {
        self.out.join(self.run_id.to_string())
    }

    pub fn write(&self, rel: &str, content: &str) {
        let path = self.project.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent dir");
        }
        fs::write(path, content).expect("Failed to write fixture file");
    }

    /// Command with isolated output, a fixed run id and no console logs
    pub fn command(&self) -> Command {
        let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("cargoworker");
        for key in [
            "CARGOWORKER_IN",
            "CARGOWORKER_OUT",
            "CARGOWORKER_RUN_ID",
            "CARGOWORKER_DB",
            "CARGOWORKER_LOG_FILE_PATH",
            "CARGOWORKER_PLAN_LANGUAGE",
            "CARGOWORKER_PLAN_IGNORE",
            "CARGOWORKER_PLAN_INCLUDE",
        ] {
            cmd.env_remove(key);
        }
        cmd.arg("--out")
            .arg(&self.out)
            .arg("--run-id")
            .arg(self.run_id.to_string())
            .arg("--log-console")
            .arg("false");
        cmd
    }

    pub fn stats(&self) -> serde_json::Value {
        let content = fs::read_to_string(self.run_dir().join("stats.json"))
            .expect("stats.json should exist");
        serde_json::from_str(&content).expect("stats.json should be valid JSON")
    }
}
