//! Schema types for benchmark definitions and per-test results.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One benchmark definition file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Audit {
    #[serde(default)]
    pub benchmark_type: Option<String>,
    pub categories: Vec<Category>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
    pub sub_category: SubCategory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubCategory {
    pub name: String,
    pub audit_tests: Vec<AuditBench>,
}

/// A single compliance test: probes, their parameter wiring, and the
/// assertion evaluated over every combination of probe output lines.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditBench {
    pub name: String,
    #[serde(default)]
    pub profile_applicability: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "audit")]
    pub audit_command: Vec<String>,
    /// Source probe indices per probe index. Entries are kept as strings so a
    /// malformed index is reported at run time instead of failing the load.
    #[serde(default)]
    pub command_params: BTreeMap<usize, Vec<String>>,
    #[serde(default)]
    pub check_type: Option<String>,
    #[serde(default)]
    pub remediation: Option<String>,
    #[serde(default)]
    pub impact: Option<String>,
    #[serde(default)]
    pub additional_info: Option<String>,
    #[serde(default)]
    pub default_value: Option<String>,
    #[serde(default)]
    pub references: Vec<String>,
    pub eval_expr: String,
    #[serde(default, skip_deserializing)]
    pub test_result: TestResult,
}

impl AuditBench {
    /// Declared source indices for the probe at `index`.
    pub fn params_for(&self, index: usize) -> &[String] {
        self.command_params
            .get(&index)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Verdict for reporting; `fail_on_empty` turns a vacuous pass into a
    /// failure.
    pub fn verdict(&self, fail_on_empty: bool) -> Verdict {
        if fail_on_empty && self.test_result.is_empty() {
            return Verdict::Fail;
        }
        self.test_result.verdict()
    }
}

/// Counter pair accumulated over the combinations of one test.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestResult {
    pub num_of_exec: u64,
    pub num_of_success: u64,
}

impl TestResult {
    /// Count one evaluated combination.
    pub fn record(&mut self, matched: bool) {
        self.num_of_exec += 1;
        if matched {
            self.num_of_success += 1;
        }
    }

    /// Fold a delta produced by an evaluation run into this pair.
    pub fn absorb(&mut self, delta: TestResult) {
        self.num_of_exec += delta.num_of_exec;
        self.num_of_success += delta.num_of_success;
    }

    /// Every combination must hold; zero combinations is a vacuous pass.
    pub fn verdict(&self) -> Verdict {
        if self.num_of_success == self.num_of_exec {
            Verdict::Pass
        } else {
            Verdict::Fail
        }
    }

    pub fn is_empty(&self) -> bool {
        self.num_of_exec == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Pass,
    Fail,
}
