//! Monitor pipeline: probe the log file, gate on the threshold, and trigger
//! the remote upload job when the file is too large.
//!
//! A below-threshold file is a successful no-op and touches no network.
//! Every step is written to the audit log.

use std::path::{Path, PathBuf};
use tracing::{error, info};

use crate::audit::AuditLog;
use crate::config::RotateConfig;
use crate::contract::JobServer;
use crate::error::RotateError;
use crate::probe::{self, ThresholdDecision};
use crate::trigger::{TriggerClient, TriggerReceipt};

#[derive(Debug)]
pub struct MonitorReport {
    pub path: PathBuf,
    pub size: u64,
    pub threshold: u64,
    pub decision: ThresholdDecision,
    /// Present only when the job server accepted a trigger.
    pub trigger: Option<TriggerReceipt>,
}

/// Run one monitor pass for `log_path` (or the configured default).
pub async fn run_monitor<J>(
    config: &RotateConfig,
    log_path: Option<&Path>,
    server: &J,
    audit: &AuditLog,
) -> Result<MonitorReport, RotateError>
where
    J: JobServer,
{
    let path = probe::resolve_path(log_path, &config.log_path);
    info!(path = %path.display(), threshold = config.threshold_bytes, "[MONITOR] Starting size check");

    let size = match probe::probe_size(&path) {
        Ok(size) => size,
        Err(e) => {
            error!(error = %e, "[MONITOR][ERROR] Size probe failed");
            audit.error(format!("File not found: {}", path.display()));
            return Err(e);
        }
    };
    audit.info(format!("Size of {}: {} bytes", path.display(), size));

    let decision = probe::evaluate(size, config.threshold_bytes);
    if !decision.exceeds() {
        info!(size, threshold = config.threshold_bytes, "[MONITOR] Below threshold, nothing to do");
        audit.info(format!(
            "Below threshold ({} < {}), no action",
            size, config.threshold_bytes
        ));
        return Ok(MonitorReport {
            path,
            size,
            threshold: config.threshold_bytes,
            decision,
            trigger: None,
        });
    }

    info!(size, threshold = config.threshold_bytes, "[MONITOR] Threshold reached, triggering job");
    audit.warn(format!(
        "Threshold reached ({} >= {}), triggering job '{}'",
        size, config.threshold_bytes, config.job_name
    ));

    let receipt = TriggerClient::new(server, config, audit)
        .trigger(&path)
        .await?;

    Ok(MonitorReport {
        path,
        size,
        threshold: config.threshold_bytes,
        decision,
        trigger: Some(receipt),
    })
}
