///
/// CLI glue for size-rotate: argument parsing, config layering, wiring the
/// real collaborators (reqwest job server client, S3 store, truncator) into
/// the core pipelines, and printing a short report.
///
/// All decisions about thresholds, crumbs, keys and stage ordering live in
/// `size-rotate-core`; this module only assembles and reports.
///
/// Exit codes are chosen in `main` from the [`RotateError`] carried by the
/// returned `anyhow::Error`.
use crate::load_config::load_config;
use anyhow::Result;
use clap::{Parser, Subcommand};
use size_rotate_core::audit::AuditLog;
use size_rotate_core::config::RotateConfig;
use size_rotate_core::monitor::run_monitor;
use size_rotate_core::storage::S3Store;
use size_rotate_core::trigger::JenkinsClient;
use size_rotate_core::truncate::truncator_for;
use size_rotate_core::upload_job::UploadJob;
use size_rotate_core::RotateError;
use std::path::{Path, PathBuf};

/// CLI for size-rotate: archive a log file to object storage once it grows too large.
#[derive(Parser)]
#[clap(
    name = "size-rotate",
    version,
    about = "Trigger and run size-based log archival to object storage"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Check the log size and trigger the upload job once it reaches the threshold
    Check {
        /// Log file to check; defaults to the configured path
        log_path: Option<PathBuf>,
        /// Optional YAML config file
        #[clap(long)]
        config: Option<PathBuf>,
    },
    /// Upload the log to object storage, verify the object, then truncate the log
    Upload {
        /// Log file to archive
        #[clap(long, env = "LOG_PATH")]
        log_path: Option<PathBuf>,
        /// Destination bucket
        #[clap(long, env = "S3_BUCKET")]
        bucket: Option<String>,
        /// Optional YAML config file
        #[clap(long)]
        config: Option<PathBuf>,
    },
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::Check { log_path, config } => {
            let config = load(config.as_deref())?;
            check(&config, log_path.as_deref()).await
        }
        Commands::Upload {
            log_path,
            bucket,
            config,
        } => {
            let mut config = load(config.as_deref())?;
            if let Some(path) = log_path.filter(|p| !p.as_os_str().is_empty()) {
                config.log_path = path;
            }
            if let Some(bucket) = bucket.filter(|b| !b.is_empty()) {
                config.bucket_name = bucket;
            }
            upload(&config).await
        }
    }
}

fn load(path: Option<&Path>) -> Result<RotateConfig> {
    load_config(path).map_err(|e| RotateError::Config(format!("{e:#}")).into())
}

async fn check(config: &RotateConfig, log_path: Option<&Path>) -> Result<()> {
    tracing::info!(command = "check", "Starting size check");
    let audit = AuditLog::new(&config.audit_log);
    let server = JenkinsClient::from_config(config)
        .map_err(|e| RotateError::Config(format!("cannot build HTTP client: {e}")))?;

    match run_monitor(config, log_path, &server, &audit).await {
        Ok(report) => {
            match &report.trigger {
                Some(receipt) => println!(
                    "Threshold reached: {} is {} bytes (limit {}). Job '{}' accepted (HTTP {}).",
                    report.path.display(),
                    report.size,
                    report.threshold,
                    receipt.job,
                    receipt.status
                ),
                None => println!(
                    "Below threshold: {} is {} bytes (limit {}). Nothing to do.",
                    report.path.display(),
                    report.size,
                    report.threshold
                ),
            }
            tracing::info!(command = "check", ?report, "Size check complete");
            Ok(())
        }
        Err(e) => {
            tracing::error!(command = "check", error = %e, exit_code = e.exit_code(), "Size check failed");
            Err(e.into())
        }
    }
}

async fn upload(config: &RotateConfig) -> Result<()> {
    tracing::info!(
        command = "upload",
        log_path = %config.log_path.display(),
        bucket = %config.bucket_name,
        "Starting upload job"
    );
    let store = S3Store::from_config(config).await;
    let truncator = truncator_for(config.truncate_mode);
    let job = UploadJob::from_config(&store, truncator, config);

    match job
        .run_with_timeout(&config.log_path, config.job_timeout())
        .await
    {
        Ok(report) => {
            println!(
                "Source: {} ({} bytes, modified {})",
                report.metadata.path.display(),
                report.metadata.size,
                report
                    .metadata
                    .modified
                    .map(|m| m.to_rfc3339())
                    .unwrap_or_else(|| "unknown".to_string())
            );
            println!(
                "Uploaded {} bytes to s3://{}/{}",
                report.bytes_uploaded, report.record.bucket, report.record.key
            );
            println!("Verified and truncated {}", report.record.source.display());
            tracing::info!(command = "upload", ?report, "Upload job complete");
            Ok(())
        }
        Err(e) => {
            tracing::error!(command = "upload", error = %e, exit_code = e.exit_code(), "Upload job failed");
            Err(e.into())
        }
    }
}
