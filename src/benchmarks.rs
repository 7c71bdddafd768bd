//! Benchmark definition loading.
//!
//! Definitions are JSON files in one directory. Any read, parse, or
//! structural error here is fatal: nothing is evaluated against a
//! half-loaded benchmark set.

use crate::model::{Audit, AuditBench};
use crate::util::display_path;
use anyhow::{anyhow, Context, Result};
use regex::Regex;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// A parsed benchmark file and where it came from.
#[derive(Debug, Clone)]
pub struct LoadedAudit {
    pub path: PathBuf,
    pub audit: Audit,
}

impl LoadedAudit {
    pub fn tests(&self) -> impl Iterator<Item = (&str, &str, &AuditBench)> {
        self.audit.categories.iter().flat_map(|category| {
            category.sub_category.audit_tests.iter().map(move |bench| {
                (
                    category.name.as_str(),
                    category.sub_category.name.as_str(),
                    bench,
                )
            })
        })
    }
}

/// Load every `*.json` file directly under `dir`, in lexical order.
pub fn load_benchmarks(dir: &Path) -> Result<Vec<LoadedAudit>> {
    let entries =
        fs::read_dir(dir).with_context(|| format!("read benchmarks dir {}", dir.display()))?;
    let mut paths = Vec::new();
    for entry in entries {
        let entry = entry.with_context(|| format!("read entry in {}", dir.display()))?;
        let path = entry.path();
        if path.is_file() && path.extension().and_then(|ext| ext.to_str()) == Some("json") {
            paths.push(path);
        }
    }
    paths.sort();
    if paths.is_empty() {
        return Err(anyhow!("no benchmark files (*.json) in {}", dir.display()));
    }

    let mut audits = Vec::with_capacity(paths.len());
    for path in paths {
        let text =
            fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?;
        let audit = parse_audit(&text)
            .with_context(|| format!("load benchmark {}", display_path(&path, Some(dir))))?;
        debug!(path = %path.display(), categories = audit.categories.len(), "loaded benchmark");
        audits.push(LoadedAudit { path, audit });
    }
    Ok(audits)
}

/// Parse and validate one benchmark file.
pub fn parse_audit(text: &str) -> Result<Audit> {
    let audit: Audit = serde_json::from_str(text).context("parse benchmark JSON")?;
    validate_audit(&audit)?;
    Ok(audit)
}

/// Structural checks that make a definition unusable. Suspicious but
/// runnable definitions are only logged.
pub fn validate_audit(audit: &Audit) -> Result<()> {
    let token = Regex::new(r"#(\d+)").expect("regex for probe parameter tokens");
    for category in &audit.categories {
        for bench in &category.sub_category.audit_tests {
            if bench.name.trim().is_empty() {
                return Err(anyhow!(
                    "test in {:?} / {:?} has an empty name",
                    category.name,
                    category.sub_category.name
                ));
            }
            validate_params(bench)?;
            warn_undeclared_tokens(bench, &token);
        }
    }
    Ok(())
}

fn validate_params(bench: &AuditBench) -> Result<()> {
    for (&probe, sources) in &bench.command_params {
        if probe >= bench.audit_command.len() {
            return Err(anyhow!(
                "test {:?} declares params for probe {probe} but has {} probes",
                bench.name,
                bench.audit_command.len()
            ));
        }
        for source in sources {
            match source.trim().parse::<usize>() {
                Ok(index) if index < probe => {}
                Ok(index) => {
                    return Err(anyhow!(
                        "test {:?} probe {probe} takes params from probe {index}, which does not run before it",
                        bench.name
                    ))
                }
                Err(_) => warn!(
                    test = %bench.name,
                    probe,
                    param = %source,
                    "param is not a probe index; it will be ignored"
                ),
            }
        }
    }
    Ok(())
}

fn warn_undeclared_tokens(bench: &AuditBench, token: &Regex) {
    for (probe, command) in bench.audit_command.iter().enumerate() {
        let declared: BTreeSet<&str> = bench
            .params_for(probe)
            .iter()
            .map(|param| param.trim())
            .collect();
        for cap in token.captures_iter(command) {
            let index = cap.get(1).map(|m| m.as_str()).unwrap_or_default();
            if !declared.contains(index) {
                warn!(
                    test = %bench.name,
                    probe,
                    token = %format!("#{index}"),
                    "probe references an undeclared param; it will not be substituted"
                );
            }
        }
    }
}

/// Name-prefix selection of tests (CIS ids such as `1.2.1`).
#[derive(Debug, Clone, Default)]
pub struct TestFilter {
    include: Vec<String>,
    exclude: Vec<String>,
}

impl TestFilter {
    pub fn new(include: Vec<String>, exclude: Vec<String>) -> Self {
        Self { include, exclude }
    }

    /// Exclusion wins over inclusion; no includes selects everything.
    pub fn selects(&self, name: &str) -> bool {
        if self.exclude.iter().any(|prefix| name.starts_with(prefix.as_str())) {
            return false;
        }
        self.include.is_empty() || self.include.iter().any(|prefix| name.starts_with(prefix.as_str()))
    }
}
