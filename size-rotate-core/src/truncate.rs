//! Truncation capabilities.
//!
//! Both implementations shrink the existing file to zero bytes instead of
//! replacing it, so the inode, ownership and mode survive and any writer
//! holding the file open in append mode keeps working.

use std::fs::OpenOptions;
use std::path::Path;
use std::process::Command;
use std::sync::Arc;

use crate::config::TruncateMode;
use crate::contract::Truncator;
use crate::error::BoxError;

/// Truncates with the privileges of the current process.
#[derive(Debug, Default)]
pub struct DirectTruncator;

impl Truncator for DirectTruncator {
    fn ensure_capability(&self, path: &Path) -> Result<(), BoxError> {
        // Opening for write without truncating proves access and changes nothing.
        OpenOptions::new().write(true).open(path)?;
        Ok(())
    }

    fn truncate(&self, path: &Path) -> Result<(), BoxError> {
        let file = OpenOptions::new().write(true).open(path)?;
        file.set_len(0)?;
        file.sync_all()?;
        tracing::debug!(path = %path.display(), "Truncated file in place");
        Ok(())
    }
}

/// Delegates to `sudo -n truncate -s 0`. Non-interactive: a sudo that would
/// prompt for a password counts as a missing capability.
#[derive(Debug, Default)]
pub struct SudoTruncator;

impl Truncator for SudoTruncator {
    fn ensure_capability(&self, path: &Path) -> Result<(), BoxError> {
        let status = Command::new("sudo").arg("-n").arg("true").status();
        match status {
            Ok(s) if s.success() => Ok(()),
            Ok(s) => Err(format!(
                "passwordless sudo unavailable for truncating {} (exit {s})",
                path.display()
            )
            .into()),
            Err(e) => Err(format!("failed to launch sudo: {e}").into()),
        }
    }

    fn truncate(&self, path: &Path) -> Result<(), BoxError> {
        let output = Command::new("sudo")
            .arg("-n")
            .arg("truncate")
            .arg("-s")
            .arg("0")
            .arg(path)
            .output()?;
        if output.status.success() {
            tracing::debug!(path = %path.display(), "Truncated file via sudo");
            Ok(())
        } else {
            Err(format!(
                "sudo truncate exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )
            .into())
        }
    }
}

pub fn truncator_for(mode: TruncateMode) -> Arc<dyn Truncator> {
    match mode {
        TruncateMode::Direct => Arc::new(DirectTruncator),
        TruncateMode::Sudo => Arc::new(SudoTruncator),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Write;

    #[test]
    fn direct_truncation_keeps_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.log");
        fs::write(&path, b"line one\nline two\n").unwrap();

        let truncator = DirectTruncator;
        truncator.ensure_capability(&path).unwrap();
        truncator.truncate(&path).unwrap();

        assert!(path.exists());
        assert_eq!(fs::metadata(&path).unwrap().len(), 0);
    }

    #[test]
    fn open_appender_keeps_writing_after_truncation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.log");
        fs::write(&path, b"old contents").unwrap();
        let mut appender = OpenOptions::new().append(true).open(&path).unwrap();

        DirectTruncator.truncate(&path).unwrap();
        appender.write_all(b"new").unwrap();
        appender.flush().unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"new");
    }

    #[test]
    fn capability_check_fails_for_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(DirectTruncator
            .ensure_capability(&dir.path().join("missing.log"))
            .is_err());
    }

    #[cfg(unix)]
    #[test]
    fn truncation_preserves_inode() {
        use std::os::unix::fs::MetadataExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.log");
        fs::write(&path, b"payload").unwrap();
        let before = fs::metadata(&path).unwrap().ino();

        DirectTruncator.truncate(&path).unwrap();

        assert_eq!(fs::metadata(&path).unwrap().ino(), before);
    }
}
