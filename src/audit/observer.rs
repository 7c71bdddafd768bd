//! Event sinks handed to the audit engine.
//!
//! Every recoverable failure in a run is reported here rather than raised,
//! so the engine itself never reaches for a process-wide logger.

use super::evaluate::ExpressionError;
use crate::model::{AuditBench, Verdict};
use tracing::{debug, warn};

pub trait AuditObserver {
    fn param_rejected(&self, bench: &AuditBench, probe: usize, raw: &str) {
        warn!(test = %bench.name, probe, param = raw, "failed to translate param to a probe index");
    }

    fn probe_skipped(&self, bench: &AuditBench, probe: usize, source: usize) {
        debug!(
            test = %bench.name,
            probe,
            source,
            "source value unavailable; probe not executed"
        );
    }

    fn probe_failed(&self, bench: &AuditBench, probe: usize, command: &str, reason: &str) {
        warn!(test = %bench.name, probe, command, reason, "failed to execute probe");
    }

    fn evaluating(&self, bench: &AuditBench, combinations: usize) {
        debug!(test = %bench.name, combinations, "evaluating assertion");
    }

    fn binding_unusable(&self, bench: &AuditBench, probe: usize) {
        debug!(
            test = %bench.name,
            probe,
            "probe value unusable; combination counted as not matched"
        );
    }

    fn expression_failed(&self, bench: &AuditBench, error: &ExpressionError) {
        warn!(test = %bench.name, error = %error, "assertion not evaluated");
    }

    fn test_finished(&self, bench: &AuditBench) {
        debug!(
            test = %bench.name,
            exec = bench.test_result.num_of_exec,
            success = bench.test_result.num_of_success,
            "test finished"
        );
    }
}

/// Logs through `tracing` only; used when a report is rendered at the end.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl AuditObserver for TracingObserver {}

/// Prints one pass/fail line per test as soon as it finishes.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleObserver {
    fail_on_empty: bool,
}

impl ConsoleObserver {
    pub fn new(fail_on_empty: bool) -> Self {
        Self { fail_on_empty }
    }
}

impl AuditObserver for ConsoleObserver {
    fn test_finished(&self, bench: &AuditBench) {
        TracingObserver.test_finished(bench);
        println!("{}", console_line(bench, self.fail_on_empty));
    }
}

pub fn console_line(bench: &AuditBench, fail_on_empty: bool) -> String {
    match bench.verdict(fail_on_empty) {
        Verdict::Pass => format!("\u{2705} {}", bench.name),
        Verdict::Fail => format!("\u{274c} {}", bench.name),
    }
}
