use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};

/// Log file watched when no path is given on the command line.
pub const DEFAULT_LOG_PATH: &str = "/var/log/app/application.log";
/// 1 GiB.
pub const DEFAULT_THRESHOLD_BYTES: u64 = 1 << 30;
pub const DEFAULT_BUCKET: &str = "log-archive";
pub const DEFAULT_JOB_NAME: &str = "log-upload";
pub const DEFAULT_JOB_PARAMETER: &str = "LOG_PATH";

/// Explicit configuration handed to every component at construction.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RotateConfig {
    pub log_path: PathBuf,
    pub threshold_bytes: u64,
    /// Base URL of the job server, without trailing slash.
    pub remote_base_url: String,
    pub job_name: String,
    /// Query parameter the job reads the log path from.
    pub job_parameter: String,
    pub credentials: Credentials,
    pub bucket_name: String,
    /// AWS region; `None` defers to the SDK's default provider chain.
    pub region: Option<String>,
    /// Custom endpoint for S3-compatible stores (MinIO, LocalStack).
    pub endpoint: Option<String>,
    pub force_path_style: bool,
    /// Append-only audit log written by the monitor.
    pub audit_log: PathBuf,
    pub job_timeout_secs: u64,
    pub request_timeout_secs: u64,
    /// Overrides the detected short hostname used in object keys.
    pub hostname: Option<String>,
    pub truncate_mode: TruncateMode,
}

impl Default for RotateConfig {
    fn default() -> Self {
        Self {
            log_path: PathBuf::from(DEFAULT_LOG_PATH),
            threshold_bytes: DEFAULT_THRESHOLD_BYTES,
            remote_base_url: "http://localhost:8080".to_string(),
            job_name: DEFAULT_JOB_NAME.to_string(),
            job_parameter: DEFAULT_JOB_PARAMETER.to_string(),
            credentials: Credentials::default(),
            bucket_name: DEFAULT_BUCKET.to_string(),
            region: None,
            endpoint: None,
            force_path_style: false,
            audit_log: PathBuf::from("/tmp/size-rotate-monitor.log"),
            job_timeout_secs: 30 * 60,
            request_timeout_secs: 30,
            hostname: None,
            truncate_mode: TruncateMode::Direct,
        }
    }
}

impl RotateConfig {
    pub fn job_timeout(&self) -> Duration {
        Duration::from_secs(self.job_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn trace_loaded(&self) {
        info!(
            log_path = %self.log_path.display(),
            threshold_bytes = self.threshold_bytes,
            remote_base_url = %self.remote_base_url,
            job_name = %self.job_name,
            bucket = %self.bucket_name,
            region = self.region.as_deref().unwrap_or("<default chain>"),
            "Loaded RotateConfig"
        );
        debug!(?self, "RotateConfig loaded (full debug)");
    }
}

/// Basic-auth pair for the job server.
#[derive(Clone, Default, Deserialize)]
#[serde(default)]
pub struct Credentials {
    pub username: String,
    pub secret: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            secret: secret.into(),
        }
    }

    pub fn is_complete(&self) -> bool {
        !self.username.is_empty() && !self.secret.is_empty()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// How the upload job obtains write access for the final truncation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TruncateMode {
    /// Open the file for writing as the current user.
    Direct,
    /// Delegate to `sudo -n truncate -s 0`.
    Sudo,
}
