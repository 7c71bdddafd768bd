use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod audit;
mod benchmarks;
mod cli;
mod config;
mod model;
mod probe;
mod report;
mod util;

use audit::evaluate::EvalexprEvaluator;
use audit::observer::{AuditObserver, ConsoleObserver, TracingObserver};
use audit::AuditEngine;
use benchmarks::{load_benchmarks, TestFilter};
use cli::{AuditArgs, Command, RootArgs, SourceArgs, ValidateArgs};
use config::{config_stub, resolve_config, AuditConfig};
use probe::ShellExecutor;
use std::path::PathBuf;

fn main() -> Result<()> {
    let args = RootArgs::parse();
    init_tracing(args.verbose);

    match args.command {
        Command::Audit(args) => cmd_audit(args),
        Command::Validate(args) => cmd_validate(args),
        Command::Config => cmd_config(),
    }
}

/// Logs go to stderr so stdout stays the report channel.
fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| fallback.into()))
        .with_writer(std::io::stderr)
        .init();
}

fn resolve_sources(source: &SourceArgs) -> Result<(AuditConfig, PathBuf)> {
    let config = resolve_config(source.config.as_deref())?;
    let dir = config.benchmarks_dir(source.benchmarks.as_deref())?;
    Ok((config, dir))
}

fn cmd_audit(args: AuditArgs) -> Result<()> {
    let (config, dir) = resolve_sources(&args.source)?;
    let mut audits = load_benchmarks(&dir)?;
    let filter = TestFilter::new(args.include, args.exclude);
    let fail_on_empty = args.fail_on_empty || config.fail_on_empty;

    let executor = ShellExecutor::new(&config.shell, config.probe_timeout())?;
    let evaluator = EvalexprEvaluator;
    let console = ConsoleObserver::new(fail_on_empty);
    let observer: &dyn AuditObserver = if args.report || args.json {
        &TracingObserver
    } else {
        &console
    };
    let engine = AuditEngine::new(&executor, &evaluator, observer, config.engine_options());

    let mut ran = 0;
    for loaded in &mut audits {
        ran += engine.run_audit(&mut loaded.audit, &filter);
    }
    info!(tests = ran, dir = %dir.display(), "audit finished");

    let report = report::build_report(&audits, &filter, fail_on_empty)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if args.report {
        print!("{}", report::render_text(&report));
    }
    if let Some(out) = &args.out {
        util::write_json(out, &report)?;
        info!(path = %out.display(), "wrote audit report");
    }
    Ok(())
}

fn cmd_validate(args: ValidateArgs) -> Result<()> {
    let (_, dir) = resolve_sources(&args.source)?;
    let audits = load_benchmarks(&dir)?;
    let mut total = 0;
    for loaded in &audits {
        let tests = loaded.tests().count();
        total += tests;
        println!(
            "{}: {} categories, {} tests",
            util::display_path(&loaded.path, Some(&dir)),
            loaded.audit.categories.len(),
            tests
        );
    }
    println!("{} files, {} tests", audits.len(), total);
    Ok(())
}

fn cmd_config() -> Result<()> {
    println!("{}", config_stub()?);
    Ok(())
}
