//! Sauntercast CLI entry point

use std::process::ExitCode;

use clap::Parser;

use sauntercast::cli::{app, Cli};

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() -> ExitCode {
    env_logger::init();

    let cli = Cli::parse();
    app::run(cli).await
}
