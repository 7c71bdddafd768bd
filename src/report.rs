//! Audit summaries for humans and machines.
use crate::benchmarks::{LoadedAudit, TestFilter};
use crate::model::Verdict;
use crate::util::now_epoch_ms;
use anyhow::Result;
use serde::Serialize;

pub const REPORT_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize)]
pub struct AuditReport {
    pub schema_version: u32,
    pub generated_at_epoch_ms: u128,
    pub total_tests: usize,
    pub passed: usize,
    pub failed: usize,
    /// Tests that evaluated zero combinations, whatever their verdict.
    pub vacuous: usize,
    pub failed_tests: Vec<FailedTest>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailedTest {
    pub name: String,
    pub category: String,
    pub sub_category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remediation: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<String>,
    pub num_of_exec: u64,
    pub num_of_success: u64,
}

/// Summarize the selected tests of already-evaluated benchmarks.
pub fn build_report(
    audits: &[LoadedAudit],
    filter: &TestFilter,
    fail_on_empty: bool,
) -> Result<AuditReport> {
    let mut report = AuditReport {
        schema_version: REPORT_SCHEMA_VERSION,
        generated_at_epoch_ms: now_epoch_ms()?,
        total_tests: 0,
        passed: 0,
        failed: 0,
        vacuous: 0,
        failed_tests: Vec::new(),
    };
    let selected = audits
        .iter()
        .flat_map(|loaded| loaded.tests())
        .filter(|(_, _, bench)| filter.selects(&bench.name));
    for (category, sub_category, bench) in selected {
        report.total_tests += 1;
        if bench.test_result.is_empty() {
            report.vacuous += 1;
        }
        match bench.verdict(fail_on_empty) {
            Verdict::Pass => report.passed += 1,
            Verdict::Fail => {
                report.failed += 1;
                report.failed_tests.push(FailedTest {
                    name: bench.name.clone(),
                    category: category.to_string(),
                    sub_category: sub_category.to_string(),
                    description: bench.description.clone(),
                    remediation: bench.remediation.clone(),
                    references: bench.references.clone(),
                    num_of_exec: bench.test_result.num_of_exec,
                    num_of_success: bench.test_result.num_of_success,
                });
            }
        }
    }
    Ok(report)
}

pub fn render_text(report: &AuditReport) -> String {
    let mut out = String::new();
    for test in &report.failed_tests {
        out.push_str(&format!("\u{274c} {}\n", test.name));
        out.push_str(&format!(
            "  category: {} / {}\n",
            test.category, test.sub_category
        ));
        if let Some(description) = &test.description {
            out.push_str(&format!("  description: {description}\n"));
        }
        out.push_str(&format!(
            "  combinations: {}/{} passed\n",
            test.num_of_success, test.num_of_exec
        ));
        if let Some(remediation) = &test.remediation {
            out.push_str(&format!("  remediation: {remediation}\n"));
        }
        for reference in &test.references {
            out.push_str(&format!("  reference: {reference}\n"));
        }
        out.push('\n');
    }
    out.push_str(&format!(
        "{} tests: {} passed, {} failed",
        report.total_tests, report.passed, report.failed
    ));
    if report.vacuous > 0 {
        out.push_str(&format!(
            " ({} with no evaluated combinations)",
            report.vacuous
        ));
    }
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::benchmarks::parse_audit;
    use crate::model::TestResult;
    use std::path::PathBuf;

    fn loaded() -> LoadedAudit {
        let text = r#"{
            "categories": [{
                "name": "Control Plane Components",
                "sub_category": {
                    "name": "1.2 API Server",
                    "audit_tests": [
                        {"name": "1.2.1 anonymous auth", "audit": ["ps"], "eval_expr": "true",
                         "description": "Disable anonymous requests",
                         "remediation": "set --anonymous-auth=false",
                         "references": ["https://kubernetes.io/docs/admin/kube-apiserver/"]},
                        {"name": "1.2.2 basic auth", "audit": ["ps"], "eval_expr": "true"},
                        {"name": "1.2.3 token auth", "audit": [], "eval_expr": "true"}
                    ]
                }
            }]
        }"#;
        let mut audit = parse_audit(text).unwrap();
        let tests = &mut audit.categories[0].sub_category.audit_tests;
        tests[0].test_result = TestResult {
            num_of_exec: 3,
            num_of_success: 1,
        };
        tests[1].test_result = TestResult {
            num_of_exec: 2,
            num_of_success: 2,
        };
        LoadedAudit {
            path: PathBuf::from("k8s.json"),
            audit,
        }
    }

    #[test]
    fn counts_verdicts_and_lists_failures() {
        let report = build_report(&[loaded()], &TestFilter::default(), false).unwrap();
        assert_eq!(report.total_tests, 3);
        assert_eq!(report.passed, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(report.vacuous, 1);
        let failed = &report.failed_tests[0];
        assert_eq!(failed.name, "1.2.1 anonymous auth");
        assert_eq!(failed.sub_category, "1.2 API Server");
        assert_eq!((failed.num_of_exec, failed.num_of_success), (3, 1));
    }

    #[test]
    fn fail_on_empty_counts_vacuous_tests_as_failed() {
        let report = build_report(&[loaded()], &TestFilter::default(), true).unwrap();
        assert_eq!(report.failed, 2);
        assert_eq!(report.failed_tests[1].name, "1.2.3 token auth");
    }

    #[test]
    fn filter_limits_report() {
        let filter = TestFilter::new(vec!["1.2.2".to_string()], Vec::new());
        let report = build_report(&[loaded()], &filter, false).unwrap();
        assert_eq!(report.total_tests, 1);
        assert!(report.failed_tests.is_empty());
    }

    #[test]
    fn text_report_includes_remediation_and_summary() {
        let report = build_report(&[loaded()], &TestFilter::default(), false).unwrap();
        let text = render_text(&report);
        assert!(text.contains("\u{274c} 1.2.1 anonymous auth"));
        assert!(text.contains("combinations: 1/3 passed"));
        assert!(text.contains("remediation: set --anonymous-auth=false"));
        assert!(text.ends_with(
            "3 tests: 2 passed, 1 failed (1 with no evaluated combinations)\n"
        ));
    }

    #[test]
    fn json_omits_empty_optional_fields() {
        let mut report = build_report(&[loaded()], &TestFilter::default(), true).unwrap();
        report.generated_at_epoch_ms = 0;
        let value = serde_json::to_value(&report).unwrap();
        let vacuous = &value["failed_tests"][1];
        assert!(vacuous.get("remediation").is_none());
        assert!(vacuous.get("references").is_none());
        assert_eq!(value["failed"], 2);
    }
}
