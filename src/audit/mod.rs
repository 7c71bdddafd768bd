//! Audit evaluation engine.
//!
//! ## Pipeline summary
//! - **Capture**: probes run in declared order; `#x` tokens are filled from
//!   earlier captures, and a probe whose source is unusable is skipped with a
//!   dummy value chosen by the [`PlaceholderPolicy`].
//! - **Combine**: captured outputs are split into lines and walked as a
//!   Cartesian product, one line per probe.
//! - **Assert**: each combination is bound into the assertion template and
//!   evaluated; the test passes only if every combination holds.
//!
//! Every failure below the benchmark-definition level is recovered: a
//! combination that binds a failed or skipped probe, or an empty value used
//! as a bare placeholder, is counted as not matched without being evaluated.
//! Expression errors are counted the same way.
//!
//! ## Example walkthrough
//! ```text
//! audit:     ["kubectl get ns -o name"]
//! eval_expr: '$0' != 'namespace/default'
//! stdout:    namespace/default\nnamespace/prod\n
//! -> 2 combinations, 1 true -> fail (1/2)
//! ```

pub mod combinations;
pub mod evaluate;
pub mod observer;
pub mod sanitize;
pub mod substitute;

use crate::benchmarks::TestFilter;
use crate::model::{Audit, AuditBench, TestResult, Verdict};
use crate::probe::ProbeExecutor;
use combinations::Combinations;
use evaluate::{ExpressionError, ExpressionEvaluator};
use observer::AuditObserver;
use sanitize::{AssertionTemplate, SentinelLiterals};
use substitute::{parse_source_indices, substitute_params, PlaceholderPolicy, Substitution};

/// Value recorded for one probe of a test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CapturedValue {
    /// Raw stdout, possibly several lines.
    Output(String),
    /// The probe ran but reported an error; its value reads as empty.
    Failed,
    /// Dummy for a skipped probe whose placeholder is used as a string.
    Unavailable,
    /// Dummy for a skipped probe whose placeholder is used as a number.
    MalformedNumber,
}

/// One probe's contribution to a single combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding<'a> {
    Line(&'a str),
    Failed,
    NotANumber,
    NotAString,
}

/// Knobs that shape how unusable values are rendered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineOptions {
    pub placeholder_policy: PlaceholderPolicy,
    pub sentinels: SentinelLiterals,
}

pub struct AuditEngine<'a> {
    executor: &'a dyn ProbeExecutor,
    evaluator: &'a dyn ExpressionEvaluator,
    observer: &'a dyn AuditObserver,
    options: EngineOptions,
}

impl<'a> AuditEngine<'a> {
    pub fn new(
        executor: &'a dyn ProbeExecutor,
        evaluator: &'a dyn ExpressionEvaluator,
        observer: &'a dyn AuditObserver,
        options: EngineOptions,
    ) -> Self {
        Self {
            executor,
            evaluator,
            observer,
            options,
        }
    }

    /// Run every selected test of a benchmark file. Returns how many ran.
    pub fn run_audit(&self, audit: &mut Audit, filter: &TestFilter) -> usize {
        let mut ran = 0;
        for category in &mut audit.categories {
            for bench in &mut category.sub_category.audit_tests {
                if !filter.selects(&bench.name) {
                    continue;
                }
                self.run_test(bench);
                ran += 1;
            }
        }
        ran
    }

    /// Capture, combine, and assert one test, folding the counts into it.
    pub fn run_test(&self, bench: &mut AuditBench) -> Verdict {
        let template = AssertionTemplate::parse(&bench.eval_expr);
        let captured = self.capture_probes(bench, template.as_ref().ok());
        let delta = self.evaluate(bench, &template, &captured);
        bench.test_result.absorb(delta);
        self.observer.test_finished(bench);
        bench.test_result.verdict()
    }

    /// Run the probes of `bench` in declared order.
    pub fn capture_probes(
        &self,
        bench: &AuditBench,
        template: Option<&AssertionTemplate>,
    ) -> Vec<CapturedValue> {
        let mut captured = Vec::with_capacity(bench.audit_command.len());
        for (index, probe) in bench.audit_command.iter().enumerate() {
            let (sources, rejected) = parse_source_indices(bench.params_for(index));
            for raw in rejected {
                self.observer.param_rejected(bench, index, raw);
            }

            let command = match substitute_params(probe, &sources, &captured) {
                Substitution::Command(command) => command,
                Substitution::Unavailable { source } => {
                    self.observer.probe_skipped(bench, index, source);
                    captured.push(self.options.placeholder_policy.dummy_for(template, index));
                    continue;
                }
            };

            let value = match self.executor.execute(&command) {
                Ok(output) if output.stderr.is_empty() => CapturedValue::Output(output.stdout),
                Ok(output) => {
                    self.observer
                        .probe_failed(bench, index, &command, output.stderr.trim_end());
                    CapturedValue::Failed
                }
                Err(err) => {
                    self.observer
                        .probe_failed(bench, index, &command, &format!("{err:#}"));
                    CapturedValue::Failed
                }
            };
            captured.push(value);
        }
        captured
    }

    /// Evaluate the assertion once per combination and return the counts.
    pub fn evaluate(
        &self,
        bench: &AuditBench,
        template: &Result<AssertionTemplate, ExpressionError>,
        captured: &[CapturedValue],
    ) -> TestResult {
        let mut delta = TestResult::default();
        let combinations = Combinations::new(captured);
        self.observer.evaluating(bench, combinations.total());
        for combination in combinations {
            let outcome = match template {
                Ok(template) => {
                    if let Some(probe) = template.unusable_binding(&combination) {
                        self.observer.binding_unusable(bench, probe);
                        delta.record(false);
                        continue;
                    }
                    template
                        .render(&combination, &self.options.sentinels)
                        .and_then(|expr| self.evaluator.evaluate(&expr))
                }
                Err(err) => Err(err.clone()),
            };
            match outcome {
                Ok(matched) => delta.record(matched),
                Err(err) => {
                    self.observer.expression_failed(bench, &err);
                    delta.record(false);
                }
            }
        }
        delta
    }
}
