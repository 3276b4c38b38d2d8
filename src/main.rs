//! docquest binary entry point.

// The CLI boundary talks to stdout/stderr directly.
#![allow(clippy::print_stdout, clippy::print_stderr)]

use clap::Parser;
use tracing_subscriber::EnvFilter;

use docquest::cli::{self, Cli};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "docquest=debug"
    } else {
        "docquest=warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli::execute(&cli).await {
        Ok(output) => println!("{output}"),
        Err(e) => {
            eprintln!("Error: {e:#}");
            std::process::exit(1);
        }
    }
}
