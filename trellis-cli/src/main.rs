//! Trellis — compose and render inheriting templates from the command line.
//!
//! # Usage
//!
//! ```text
//! trellis render <name> [--dir D]... [--ext E]... [--data file.json] [--config file.yaml] [--autoescape]
//! trellis compose <name> [--dir D]... [--ext E]... [--config file.yaml]
//! trellis list [--dir D]... [--ext E]... [--config file.yaml] [--json]
//! ```

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{compose::ComposeArgs, list::ListArgs, render::RenderArgs};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "trellis",
    version,
    about = "Compose and render templates that extend, include, and override each other",
    long_about = None,
)]
struct Cli {
    /// Log composition details to stderr (same as RUST_LOG=debug).
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Render a template to stdout.
    Render(RenderArgs),

    /// Show the rewritten inheritance chain and block table for a template.
    Compose(ComposeArgs),

    /// List every template the configured directories provide.
    List(ListArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.command {
        Commands::Render(args) => args.run(),
        Commands::Compose(args) => args.run(),
        Commands::List(args) => args.run(),
    }
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
