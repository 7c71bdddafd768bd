//! CLI argument parsing for the benchmark auditor.
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Root CLI entrypoint.
#[derive(Parser, Debug)]
#[command(
    name = "baudit",
    version,
    about = "Run compliance benchmark probes and evaluate their assertions",
    after_help = "Examples:\n  baudit audit --benchmarks ~/.baudit/benchmarks\n  baudit audit --report --include 1.2\n  baudit audit --json --out /tmp/audit.json\n  baudit validate --benchmarks ./benchmarks\n  baudit config > ~/.config/baudit/config.json",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    /// Log debug events to stderr (RUST_LOG takes precedence)
    #[arg(long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    Audit(AuditArgs),
    Validate(ValidateArgs),
    /// Print a config stub with every default filled in
    Config,
}

/// Where benchmark definitions and settings come from.
#[derive(clap::Args, Debug)]
pub struct SourceArgs {
    /// Directory of benchmark definition files (*.json)
    #[arg(long, value_name = "DIR")]
    pub benchmarks: Option<PathBuf>,

    /// Config file; defaults to <config_dir>/baudit/config.json when present
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

#[derive(Parser, Debug)]
#[command(about = "Run every selected test and report pass/fail")]
pub struct AuditArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Print a report of failed tests after the run instead of per-test marks
    #[arg(long, conflicts_with = "json")]
    pub report: bool,

    /// Emit the audit report as JSON on stdout
    #[arg(long)]
    pub json: bool,

    /// Also write the JSON report to this path
    #[arg(long, value_name = "PATH")]
    pub out: Option<PathBuf>,

    /// Only run tests whose name starts with PREFIX (repeatable)
    #[arg(long, value_name = "PREFIX")]
    pub include: Vec<String>,

    /// Skip tests whose name starts with PREFIX (repeatable, wins over --include)
    #[arg(long, value_name = "PREFIX")]
    pub exclude: Vec<String>,

    /// Treat tests that evaluated zero combinations as failed
    #[arg(long)]
    pub fail_on_empty: bool,
}

#[derive(Parser, Debug)]
#[command(about = "Load and validate benchmark definitions without running probes")]
pub struct ValidateArgs {
    #[command(flatten)]
    pub source: SourceArgs,
}
