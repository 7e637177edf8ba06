//! planclone — clone a Planner plan into a new plan for another group.
//!
//! # Usage
//!
//! ```text
//! planclone clone --source-plan <ID> --owner <GROUP_ID> --title <TITLE> [--dry-run] [--json]
//! planclone inspect <PLAN_ID> [--json]
//! planclone config show|init|path
//! ```
//!
//! The access token is read from `PLANCLONE_ACCESS_TOKEN` or `--token-file`.
//! Logs go to stderr; stdout carries only the result.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{clone::CloneArgs, config::ConfigCommand, inspect::InspectArgs};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "planclone",
    version,
    about = "Clone a Planner plan, its buckets and tasks into a new plan",
    long_about = None,
)]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    /// Emit logs as JSON lines on stderr.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Copy a plan into a new plan owned by another group.
    Clone(CloneArgs),

    /// Show a plan's buckets and tasks in the order a clone would create them.
    Inspect(InspectArgs),

    /// Show or create ~/.planclone/config.yaml.
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_json);
    match cli.command {
        Commands::Clone(args) => args.run(),
        Commands::Inspect(args) => args.run(),
        Commands::Config { command } => commands::config::run(command),
    }
}

fn init_tracing(verbose: bool, json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let builder = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    let _ = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}
