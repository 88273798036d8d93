mod commands;
mod progress;
mod summary;

use std::process::ExitCode;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "hdrmerge", about = "Merge bracketed raw exposures into one HDR image")]
#[command(version)]
struct Cli {
    /// Verbose output (-v: info, -vv: debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge one or more sets of exposures
    Merge(commands::merge::MergeArgs),
    /// Show frame count, geometry and capture time of a raw file
    Info(commands::info::InfoArgs),
    /// Print or save the default merge configuration
    Config(commands::config::ConfigArgs),
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        _ => EnvFilter::new("debug"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match &cli.command {
        Commands::Merge(args) => commands::merge::run(args),
        Commands::Info(args) => commands::info::run(args).map(|()| ExitCode::SUCCESS),
        Commands::Config(args) => commands::config::run(args).map(|()| ExitCode::SUCCESS),
    }
}
