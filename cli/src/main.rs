mod cli;
mod commands;

use cli::{Cli, Commands};
use commands::{extract, interpolate, shift};
use tracing_subscriber::EnvFilter;

/// Route logs to stderr: `-v` selects info, `-vv` debug. `RUST_LOG` takes precedence.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

pub fn run() -> anyhow::Result<()> {
    use clap::Parser;

    let cli = Cli::parse();
    init_logging(cli.verbose);

    match &cli.command {
        Commands::Interpolate(args) => interpolate::run(&cli, args),
        Commands::Shift(args) => shift::run(&cli, args),
        Commands::Extract(args) => extract::run(&cli, args),
    }
}

fn main() -> anyhow::Result<()> { run() }
