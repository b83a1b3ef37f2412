//! skipcheck CLI, the command-line host for the staleness check.
//!
//! Provides `skipcheck check` to ask whether a project must rebuild,
//! `skipcheck record` to snapshot its files after a successful build,
//! `skipcheck invalidate` to drop snapshots, and `skipcheck run` to execute
//! the configured phase commands while skipping up-to-date work.

#![warn(missing_docs)]

mod check;
mod invalidate;
mod pipeline;
mod record;
mod run;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use skipcheck_common::ProjectIdentity;
use tracing_subscriber::EnvFilter;

/// Exit code for errors, distinct from the `check` verdict codes.
const EXIT_ERROR: i32 = 2;

/// skipcheck: skip build steps when nothing changed.
#[derive(Parser, Debug)]
#[command(name = "skipcheck", version, about = "Incremental build staleness check")]
pub struct Cli {
    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose (debug-level) output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Project directory. Defaults to the nearest directory containing
    /// `skipcheck.toml`, starting from the current directory.
    #[arg(long, global = true)]
    pub project: Option<PathBuf>,

    /// User property, e.g. `-D build.check.enabled=true`.
    #[arg(short = 'D', global = true, value_name = "KEY=VALUE")]
    pub define: Vec<String>,

    /// Active build option, added to the project's configured options.
    #[arg(short = 'P', long = "option", global = true, value_name = "OPTION")]
    pub options: Vec<String>,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Decide whether the project must rebuild for the given phases.
    Check(CheckArgs),
    /// Record the project's current file set.
    Record,
    /// Delete the project's snapshots.
    Invalidate(InvalidateArgs),
    /// Run phase commands, skipping them when the project is up to date.
    Run(RunArgs),
}

/// Arguments for `skipcheck check`.
#[derive(Parser, Debug)]
pub struct CheckArgs {
    /// Requested phases, in execution order.
    #[arg(required = true)]
    pub phases: Vec<String>,

    /// Output format for the verdict.
    #[arg(short, long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,
}

/// Arguments for `skipcheck invalidate`.
#[derive(Parser, Debug)]
pub struct InvalidateArgs {
    /// Dependent project (`group:artifact:version`) whose snapshots are also
    /// deleted.
    #[arg(long = "downstream", value_name = "GROUP:ARTIFACT:VERSION")]
    pub downstream: Vec<ProjectIdentity>,
}

/// Arguments for `skipcheck run`.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Requested phases, in execution order.
    #[arg(required = true)]
    pub phases: Vec<String>,

    /// Treat the phases as explicitly requested: never skip them.
    #[arg(long)]
    pub explicit: bool,

    /// Dependent project (`group:artifact:version`) invalidated after the
    /// downstream phase runs.
    #[arg(long = "dependent", value_name = "GROUP:ARTIFACT:VERSION")]
    pub dependents: Vec<ProjectIdentity>,
}

/// Verdict output format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Human-readable terminal output.
    Text,
    /// Machine-readable JSON output.
    Json,
}

/// Global settings derived from CLI flags.
pub struct GlobalArgs {
    /// Whether to suppress non-error output.
    pub quiet: bool,
    /// Whether to print verbose/debug information.
    pub verbose: bool,
    /// Explicit project directory.
    pub project: Option<PathBuf>,
    /// Raw `-D` assignments.
    pub defines: Vec<String>,
    /// Extra active options from `-P`.
    pub options: Vec<String>,
}

fn main() {
    let cli = Cli::parse();

    let global = GlobalArgs {
        quiet: cli.quiet,
        verbose: cli.verbose,
        project: cli.project,
        defines: cli.define,
        options: cli.options,
    };
    init_logging(&global);

    let result = match cli.command {
        Command::Check(ref args) => check::run(args, &global),
        Command::Record => record::run(&global),
        Command::Invalidate(ref args) => invalidate::run(args, &global),
        Command::Run(ref args) => run::run(args, &global),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(EXIT_ERROR);
        }
    }
}

/// Installs the stderr log subscriber. `RUST_LOG` overrides the level
/// chosen by `--quiet`/`--verbose`.
fn init_logging(global: &GlobalArgs) {
    let level = if global.quiet {
        "warn"
    } else if global.verbose {
        "debug"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();
}
