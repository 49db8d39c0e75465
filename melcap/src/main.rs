//! melcap CLI - burn word-synchronised captions into videos

use clap::Parser;
use melcap::cli::{Cli, run};
use melcap::error::{exit_status, with_hint};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let (non_blocking, _guard) = tracing_appender::non_blocking(std::io::stderr());

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    if let Err(e) = color_eyre::install() {
        eprintln!("failed to install error report handler: {e}");
    }

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(report) => {
            let code = exit_status(&report);
            eprintln!("Error: {:?}", with_hint(report));
            code
        }
    }
}
