//! Cascade CLI binary.
//!
//! Entry point for the `cascade` command. Initializes logging via `tracing`,
//! parses arguments with `clap`, and dispatches to a command handler. The
//! process exits with the status the command reports.

mod cli;
mod commands;

use miette::Result;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::parse();

    let default_filter = if args.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .init();

    let status = commands::dispatch(args).await?;
    if status != 0 {
        std::process::exit(status);
    }
    Ok(())
}
