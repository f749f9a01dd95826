//! Upload job: existence check -> upload -> verify -> truncate.
//!
//! Every stage is a hard gate; the first failure aborts the rest. The
//! generated object key moves from the upload stage to the verify stage in
//! memory. Truncation only runs after the store confirmed the object is
//! readable, so a failed verify leaves the source file untouched.
//!
//! # Delivery semantics
//! The job is at-least-once: if truncation fails after a verified upload,
//! the file stays large and the next run archives it again under a new key.
//! Keys carry one-second resolution, so two uploads of the same basename
//! from the same host within one second map to the same key and the second
//! overwrites the first.

use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::config::RotateConfig;
use crate::contract::{ObjectStore, Truncator};
use crate::error::{BoxError, RotateError};
use crate::probe::{self, FileMetadata};

pub const KEY_PREFIX: &str = "logs";

/// `logs/<host>/<basename>.<YYYYMMDDTHHMMSS>` in UTC.
pub fn object_key(host: &str, source: &Path, at: DateTime<Utc>) -> String {
    let basename = source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "log".to_string());
    format!(
        "{KEY_PREFIX}/{host}/{basename}.{}",
        at.format("%Y%m%dT%H%M%S")
    )
}

/// Hostname up to the first dot.
pub fn short_hostname(full: &str) -> &str {
    full.split('.').next().unwrap_or(full)
}

/// Short hostname from the override, or from the OS.
pub fn resolve_hostname(override_host: Option<&str>) -> String {
    let full = match override_host {
        Some(h) if !h.is_empty() => h.to_string(),
        _ => sysinfo::System::host_name().unwrap_or_else(|| {
            warn!("Could not determine hostname, using 'localhost'");
            "localhost".to_string()
        }),
    };
    short_hostname(&full).to_string()
}

/// Where a file was archived.
#[derive(Debug, Clone)]
pub struct UploadRecord {
    pub source: PathBuf,
    pub bucket: String,
    pub key: String,
}

#[derive(Debug, Clone)]
pub struct UploadReport {
    pub metadata: FileMetadata,
    pub record: UploadRecord,
    pub bytes_uploaded: u64,
    pub truncated: bool,
}

pub struct UploadJob<'a, S: ObjectStore> {
    store: &'a S,
    truncator: Arc<dyn Truncator>,
    bucket: String,
    host: String,
}

impl<'a, S: ObjectStore> UploadJob<'a, S> {
    pub fn new(
        store: &'a S,
        truncator: Arc<dyn Truncator>,
        bucket: impl Into<String>,
        host: impl Into<String>,
    ) -> Self {
        Self {
            store,
            truncator,
            bucket: bucket.into(),
            host: host.into(),
        }
    }

    pub fn from_config(
        store: &'a S,
        truncator: Arc<dyn Truncator>,
        config: &RotateConfig,
    ) -> Self {
        Self::new(
            store,
            truncator,
            config.bucket_name.clone(),
            resolve_hostname(config.hostname.as_deref()),
        )
    }

    /// Run all four stages for `source`.
    pub async fn run(&self, source: &Path) -> Result<UploadReport, RotateError> {
        info!(source = %source.display(), bucket = %self.bucket, "[JOB] Starting upload job");

        let metadata = self.check_source(source).await?;
        let (record, bytes_uploaded) = self.upload(source).await?;
        self.verify(&record).await?;
        self.truncate(source).await?;

        info!(key = %record.key, bytes_uploaded, "[JOB] Upload job complete");
        Ok(UploadReport {
            metadata,
            record,
            bytes_uploaded,
            truncated: true,
        })
    }

    /// [`run`](Self::run) bounded by a wall-clock limit. Stages still pending
    /// when the limit passes are abandoned. Truncator calls run on the
    /// blocking pool, so a hung privileged write is bounded too; the
    /// abandoned call itself is left to finish in the background.
    pub async fn run_with_timeout(
        &self,
        source: &Path,
        limit: Duration,
    ) -> Result<UploadReport, RotateError> {
        match tokio::time::timeout(limit, self.run(source)).await {
            Ok(result) => result,
            Err(_) => {
                error!(source = %source.display(), limit = ?limit, "[JOB][ERROR] Upload job timed out");
                Err(RotateError::Timeout { limit })
            }
        }
    }

    async fn check_source(&self, source: &Path) -> Result<FileMetadata, RotateError> {
        let metadata = probe::inspect(source)?;
        info!(
            path = %metadata.path.display(),
            size = metadata.size,
            modified = ?metadata.modified,
            "[CHECK] Source file present"
        );

        let truncator = Arc::clone(&self.truncator);
        let path = source.to_path_buf();
        let preflight =
            run_blocking(source, move || truncator.ensure_capability(&path)).await;
        if let Err(detail) = preflight {
            error!(path = %source.display(), error = %detail, "[CHECK][ERROR] Missing truncation capability");
            return Err(RotateError::TruncateFailure {
                path: source.to_path_buf(),
                detail,
            });
        }
        Ok(metadata)
    }

    async fn upload(&self, source: &Path) -> Result<(UploadRecord, u64), RotateError> {
        let key = object_key(&self.host, source, Utc::now());
        info!(bucket = %self.bucket, key = %key, "[UPLOAD] Copying file to object store");

        match self.store.put_file(&self.bucket, &key, source).await {
            Ok(bytes) => {
                info!(key = %key, bytes, "[UPLOAD] Transfer finished");
                Ok((
                    UploadRecord {
                        source: source.to_path_buf(),
                        bucket: self.bucket.clone(),
                        key,
                    },
                    bytes,
                ))
            }
            Err(e) => {
                error!(key = %key, error = %e, "[UPLOAD][ERROR] Transfer failed");
                Err(RotateError::UploadFailure {
                    bucket: self.bucket.clone(),
                    key,
                    detail: e.to_string(),
                })
            }
        }
    }

    async fn verify(&self, record: &UploadRecord) -> Result<(), RotateError> {
        info!(bucket = %record.bucket, key = %record.key, "[VERIFY] Checking uploaded object");
        let detail = match self.store.head_object(&record.bucket, &record.key).await {
            Ok(true) => {
                info!(key = %record.key, "[VERIFY] Object present");
                return Ok(());
            }
            Ok(false) => "head-object reported the object absent".to_string(),
            Err(e) => format!("head-object failed: {e}"),
        };
        error!(key = %record.key, detail = %detail, "[VERIFY][ERROR] Uploaded object not readable");
        Err(RotateError::VerifyFailure {
            bucket: record.bucket.clone(),
            key: record.key.clone(),
            detail,
        })
    }

    async fn truncate(&self, source: &Path) -> Result<(), RotateError> {
        // The path may have been removed while the upload ran.
        if !source.exists() {
            error!(path = %source.display(), "[TRUNCATE][ERROR] Source vanished before truncation");
            return Err(RotateError::NotFound {
                path: source.to_path_buf(),
            });
        }
        let truncator = Arc::clone(&self.truncator);
        let path = source.to_path_buf();
        match run_blocking(source, move || truncator.truncate(&path)).await {
            Ok(()) => {
                info!(path = %source.display(), "[TRUNCATE] Source truncated to zero bytes");
                Ok(())
            }
            Err(detail) => {
                error!(path = %source.display(), error = %detail, "[TRUNCATE][ERROR] Truncation failed");
                Err(RotateError::TruncateFailure {
                    path: source.to_path_buf(),
                    detail,
                })
            }
        }
    }
}

/// Run a blocking truncator call off the async worker so the job's timeout
/// can fire while it is stuck.
async fn run_blocking<F>(source: &Path, call: F) -> Result<(), String>
where
    F: FnOnce() -> Result<(), BoxError> + Send + 'static,
{
    match tokio::task::spawn_blocking(call).await {
        Ok(result) => result.map_err(|e| e.to_string()),
        Err(join_error) => {
            error!(path = %source.display(), error = %join_error, "Truncator task did not complete");
            Err(format!("truncator task failed: {join_error}"))
        }
    }
}
