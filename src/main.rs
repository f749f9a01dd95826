use clap::Parser;
use size_rotate::cli::{run, Cli};
use size_rotate_core::RotateError;
use tracing_subscriber::EnvFilter;

/// Exit code for failures that carry no [`RotateError`].
const GENERIC_FAILURE: i32 = 1;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // Reports go to stdout; diagnostics go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    tracing::info!("CLI application startup: tracing initialised, environment loaded");

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => {
            tracing::info!("CLI completed successfully");
            std::process::exit(0);
        }
        Err(e) => {
            let code = e
                .downcast_ref::<RotateError>()
                .map(RotateError::exit_code)
                .unwrap_or(GENERIC_FAILURE);
            tracing::error!(error = %e, exit_code = code, "CLI exited with error");
            eprintln!("[ERROR] {e:#}");
            std::process::exit(code);
        }
    }
}
