//! # edufund CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use edufund_cli::admin::{run_admin, AdminArgs};
use edufund_cli::npsn::{run_npsn, NpsnArgs};
use edufund_cli::openapi::{run_openapi, OpenApiArgs};

/// EduFund operator CLI.
#[derive(Parser, Debug)]
#[command(name = "edufund", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Admin credential tooling.
    Admin(AdminArgs),

    /// School registry lookups.
    Npsn(NpsnArgs),

    /// Export the OpenAPI document.
    Openapi(OpenApiArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Admin(args) => run_admin(&args),
        Commands::Npsn(args) => run_npsn(&args),
        Commands::Openapi(args) => run_openapi(&args),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            eprintln!("error: {e:#}");
            ExitCode::from(1)
        }
    }
}
