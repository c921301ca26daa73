//! setlint CLI binary entry point
//!
//! Installs the log subscriber, then calls the library's `run_cli()`.

use anyhow::Result;
use setlint_cli::run_cli;

fn main() -> Result<()> {
    // Logs go to stderr so stdout stays clean for reports
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    run_cli()
}
