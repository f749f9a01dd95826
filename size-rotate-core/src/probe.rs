//! Size probing and the threshold gate.

use chrono::{DateTime, Utc};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{error, info};

use crate::error::RotateError;

/// Snapshot of the log file taken at a check point.
#[derive(Debug, Clone)]
pub struct FileMetadata {
    pub path: PathBuf,
    pub size: u64,
    pub modified: Option<DateTime<Utc>>,
}

/// Outcome of comparing a probed size against the threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThresholdDecision {
    Below,
    AtOrAbove,
}

impl ThresholdDecision {
    pub fn exceeds(self) -> bool {
        self == ThresholdDecision::AtOrAbove
    }
}

/// Pure comparison; reaching the threshold exactly counts as exceeding it.
pub fn evaluate(size: u64, threshold: u64) -> ThresholdDecision {
    if size >= threshold {
        ThresholdDecision::AtOrAbove
    } else {
        ThresholdDecision::Below
    }
}

/// Stat `path` and return its metadata, or `NotFound` if it is absent.
pub fn inspect(path: &Path) -> Result<FileMetadata, RotateError> {
    match fs::metadata(path) {
        Ok(meta) if meta.is_file() => {
            let snapshot = FileMetadata {
                path: path.to_path_buf(),
                size: meta.len(),
                modified: meta.modified().ok().map(DateTime::<Utc>::from),
            };
            info!(path = %path.display(), size = snapshot.size, "[PROBE] Read file size");
            Ok(snapshot)
        }
        Ok(_) => {
            error!(path = %path.display(), "[PROBE] Path exists but is not a regular file");
            Err(RotateError::NotFound {
                path: path.to_path_buf(),
            })
        }
        Err(e) => Err(stat_error(path, e)),
    }
}

/// Missing files are `NotFound`; anything else (permissions, I/O) keeps its
/// error kind so an unreadable file is not mistaken for a rotated-away one.
pub fn stat_error(path: &Path, err: io::Error) -> RotateError {
    if err.kind() == io::ErrorKind::NotFound {
        error!(path = %path.display(), "[PROBE] File does not exist");
        RotateError::NotFound {
            path: path.to_path_buf(),
        }
    } else {
        error!(path = %path.display(), kind = ?err.kind(), error = %err, "[PROBE] Failed to stat file");
        RotateError::Inaccessible {
            path: path.to_path_buf(),
            kind: err.kind(),
            detail: err.to_string(),
        }
    }
}

/// Byte length of `path`.
pub fn probe_size(path: &Path) -> Result<u64, RotateError> {
    inspect(path).map(|m| m.size)
}

/// Resolve an optional command-line path against the configured default.
pub fn resolve_path(given: Option<&Path>, default: &Path) -> PathBuf {
    match given {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => default.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn threshold_boundary_is_inclusive() {
        let threshold = 1u64 << 30;
        assert_eq!(evaluate(threshold - 1, threshold), ThresholdDecision::Below);
        assert_eq!(evaluate(threshold, threshold), ThresholdDecision::AtOrAbove);
        assert_eq!(evaluate(u64::MAX, threshold), ThresholdDecision::AtOrAbove);
        assert_eq!(evaluate(0, threshold), ThresholdDecision::Below);
    }

    #[test]
    fn zero_threshold_always_exceeds() {
        assert!(evaluate(0, 0).exceeds());
    }

    #[test]
    fn probe_reports_byte_length() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"0123456789").unwrap();
        file.flush().unwrap();
        assert_eq!(probe_size(file.path()).unwrap(), 10);
    }

    #[test]
    fn probe_of_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("gone.log");
        match probe_size(&missing) {
            Err(RotateError::NotFound { path }) => assert_eq!(path, missing),
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[test]
    fn permission_error_is_not_reported_as_missing() {
        let path = Path::new("/var/log/secure/app.log");
        let err = stat_error(
            path,
            io::Error::new(io::ErrorKind::PermissionDenied, "Permission denied (os error 13)"),
        );
        match &err {
            RotateError::Inaccessible { path: p, kind, .. } => {
                assert_eq!(p, path);
                assert_eq!(*kind, io::ErrorKind::PermissionDenied);
            }
            other => panic!("expected Inaccessible, got {other:?}"),
        }
        assert!(err.to_string().contains("Permission denied"));
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn missing_file_error_is_not_found() {
        let err = stat_error(
            Path::new("/tmp/gone.log"),
            io::Error::from(io::ErrorKind::NotFound),
        );
        assert!(matches!(err, RotateError::NotFound { .. }));
    }

    #[test]
    fn directory_is_not_a_log_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            probe_size(dir.path()),
            Err(RotateError::NotFound { .. })
        ));
    }

    #[test]
    fn empty_path_falls_back_to_default() {
        let default = Path::new("/var/log/app/application.log");
        assert_eq!(resolve_path(None, default), default);
        assert_eq!(resolve_path(Some(Path::new("")), default), default);
        assert_eq!(
            resolve_path(Some(Path::new("/tmp/other.log")), default),
            PathBuf::from("/tmp/other.log")
        );
    }
}
