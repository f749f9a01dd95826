//! Error taxonomy shared by the monitor and the upload job.
//!
//! Every variant is terminal for the current run. Nothing in this crate
//! retries; re-running is the job of whatever schedules the binary. Each
//! variant maps to a stable process exit code so a supervisor can alert on
//! specific failures.

use std::io;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Boxed error returned by collaborator traits (HTTP transport, object
/// store, truncation capability).
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum RotateError {
    /// The source file is missing at one of the check points.
    #[error("log file not found: {}", path.display())]
    NotFound { path: PathBuf },

    /// The source file exists (or may exist) but cannot be stat'ed.
    #[error("cannot access log file {} ({kind:?}): {detail}", path.display())]
    Inaccessible {
        path: PathBuf,
        kind: io::ErrorKind,
        detail: String,
    },

    /// Credential or crumb exchange with the job server failed.
    #[error("authentication with job server failed: {0}")]
    AuthFailure(String),

    /// The crumb issuer answered, but not with a usable crumb.
    #[error("malformed crumb response: {0}")]
    ProtocolError(String),

    /// The job server did not accept the trigger request.
    #[error("job trigger rejected{}: {detail}", status.map(|s| format!(" with status {s}")).unwrap_or_default())]
    RemoteTriggerFailure { status: Option<u16>, detail: String },

    #[error("upload of {key} to bucket {bucket} failed: {detail}")]
    UploadFailure {
        bucket: String,
        key: String,
        detail: String,
    },

    /// The upload reported success but the object cannot be read back.
    #[error("uploaded object {key} not found in bucket {bucket}: {detail}")]
    VerifyFailure {
        bucket: String,
        key: String,
        detail: String,
    },

    #[error("cannot truncate {}: {detail}", path.display())]
    TruncateFailure { path: PathBuf, detail: String },

    #[error("upload job exceeded its {limit:?} time limit")]
    Timeout { limit: Duration },

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl RotateError {
    /// Process exit code for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            RotateError::NotFound { .. } | RotateError::Inaccessible { .. } => 1,
            RotateError::AuthFailure(_) | RotateError::ProtocolError(_) => 2,
            RotateError::RemoteTriggerFailure { .. } => 3,
            RotateError::UploadFailure { .. } => 4,
            RotateError::VerifyFailure { .. } => 5,
            RotateError::TruncateFailure { .. } => 6,
            RotateError::Timeout { .. } => 7,
            RotateError::Config(_) => 78,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn monitor_exit_codes_match_cli_contract() {
        let not_found = RotateError::NotFound {
            path: PathBuf::from("/var/log/missing.log"),
        };
        assert_eq!(not_found.exit_code(), 1);
        assert_eq!(RotateError::AuthFailure("empty body".into()).exit_code(), 2);
        assert_eq!(RotateError::ProtocolError("no crumb".into()).exit_code(), 2);
        let rejected = RotateError::RemoteTriggerFailure {
            status: Some(500),
            detail: "Internal Server Error".into(),
        };
        assert_eq!(rejected.exit_code(), 3);
    }

    #[test]
    fn trigger_failure_message_carries_status() {
        let rejected = RotateError::RemoteTriggerFailure {
            status: Some(403),
            detail: "No valid crumb".into(),
        };
        assert_eq!(
            rejected.to_string(),
            "job trigger rejected with status 403: No valid crumb"
        );

        let unreachable = RotateError::RemoteTriggerFailure {
            status: None,
            detail: "connection refused".into(),
        };
        assert_eq!(unreachable.to_string(), "job trigger rejected: connection refused");
    }

    #[test]
    fn sub_second_timeout_is_not_rounded_away() {
        let err = RotateError::Timeout {
            limit: Duration::from_millis(250),
        };
        assert_eq!(err.to_string(), "upload job exceeded its 250ms time limit");
    }

    #[test]
    fn upload_job_exit_codes_are_distinct() {
        let codes = [
            RotateError::UploadFailure {
                bucket: "b".into(),
                key: "k".into(),
                detail: "d".into(),
            }
            .exit_code(),
            RotateError::VerifyFailure {
                bucket: "b".into(),
                key: "k".into(),
                detail: "d".into(),
            }
            .exit_code(),
            RotateError::TruncateFailure {
                path: PathBuf::from("/x"),
                detail: "d".into(),
            }
            .exit_code(),
            RotateError::Timeout {
                limit: Duration::from_secs(1),
            }
            .exit_code(),
        ];
        assert_eq!(codes, [4, 5, 6, 7]);
    }
}
