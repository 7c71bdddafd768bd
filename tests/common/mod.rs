//! Shared helpers for driving the `baudit` binary against fixture benchmarks.

use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

pub fn find_in_path(name: &str) -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    for dir in std::env::split_paths(&path_var) {
        let candidate = dir.join(name);
        if candidate.is_file() {
            return Some(candidate);
        }
    }
    None
}

/// Temp workspace holding a benchmarks dir and an empty config.
pub struct Workspace {
    pub root: TempDir,
}

impl Workspace {
    pub fn create() -> Self {
        let root = tempfile::tempdir().expect("create temp dir");
        std::fs::create_dir(root.path().join("benchmarks")).expect("create benchmarks dir");
        std::fs::write(root.path().join("config.json"), "{}").expect("write config");
        Self { root }
    }

    pub fn benchmarks_dir(&self) -> PathBuf {
        self.root.path().join("benchmarks")
    }

    pub fn config_path(&self) -> PathBuf {
        self.root.path().join("config.json")
    }

    /// Write one benchmark file whose single sub-category holds `tests`.
    pub fn write_benchmark(&self, file: &str, tests: Value) {
        let audit = serde_json::json!({
            "benchmark_type": "k8s",
            "categories": [{
                "name": "Control Plane Components",
                "sub_category": {
                    "name": "1.1 Master Node Configuration Files",
                    "audit_tests": tests
                }
            }]
        });
        let text = serde_json::to_string_pretty(&audit).expect("serialize benchmark");
        std::fs::write(self.benchmarks_dir().join(file), text).expect("write benchmark");
    }

    pub fn write_raw(&self, file: &str, text: &str) {
        std::fs::write(self.benchmarks_dir().join(file), text).expect("write benchmark");
    }

    /// Run `baudit <subcommand> --benchmarks <dir> --config <cfg> <extra...>`.
    pub fn run(&self, subcommand: &str, extra: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_baudit"))
            .arg(subcommand)
            .arg("--benchmarks")
            .arg(self.benchmarks_dir())
            .arg("--config")
            .arg(self.config_path())
            .args(extra)
            .env_remove("RUST_LOG")
            .output()
            .expect("run baudit")
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.root.path().join(name)
    }
}

pub fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

pub fn read_json(path: &Path) -> Value {
    let text = std::fs::read_to_string(path).expect("read json");
    serde_json::from_str(&text).expect("parse json")
}
