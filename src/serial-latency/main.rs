use std::process::ExitCode;

use clap::Parser;
use run::{SweepOptions, handle_sweep};
use tracing_subscriber::EnvFilter;

mod run;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let opts = SweepOptions::parse();

    match handle_sweep(opts) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("[ERR] {}", e);
            ExitCode::FAILURE
        }
    }
}
