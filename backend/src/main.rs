mod commands;
mod error;

use clap::{self, Parser};
use std::io;
use std::process::ExitCode;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(clap::Parser)]
#[command(author, version, about = "Inspect the providers this plugin serves", long_about = None)]
struct Args {
    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, env = "RUST_LOG", global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: commands::Command,
}

fn init_logging(level: Option<&str>) {
    let filter = level
        .and_then(|l| EnvFilter::try_new(l).ok())
        .unwrap_or_else(|| EnvFilter::new("warn"));
    // stdout carries command output
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(io::stderr))
        .init();
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.log_level.as_deref());

    tfcp_plugins::init();

    let stdout = io::stdout();
    match commands::run(&args.command, &mut stdout.lock()) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            tracing::error!("{}", e);
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
