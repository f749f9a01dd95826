#![allow(unused)]

//! # contract: collaborator seams for the monitor and the upload job
//!
//! The core never talks to the network or escalates privilege directly. It
//! drives three traits instead:
//!
//! - [`JobServer`]: raw HTTP round trips to the job server (crumb issuer and
//!   parameterised build endpoint). Status/body interpretation stays in
//!   [`crate::trigger::TriggerClient`].
//! - [`ObjectStore`]: copy-local-file-to-key and head-object.
//! - [`Truncator`]: the capability to overwrite the log file to zero length.
//!
//! All traits are annotated for `mockall`, so tests can script every
//! collaborator and assert which calls were (or were not) made.

use async_trait::async_trait;
use mockall::{automock, predicate::*};
use std::path::Path;

use crate::error::BoxError;

/// Status and body of one HTTP exchange with the job server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
}

impl HttpReply {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Anti-forgery token plus the header name it must be echoed under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Crumb {
    pub value: String,
    pub request_field: String,
}

/// Transport to a Jenkins-style job server.
///
/// Implementors attach the configured credentials to every request. A
/// non-2xx status is *not* an error at this level; only failures to get a
/// response at all are.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait JobServer: Send + Sync {
    /// `GET {base}/crumbIssuer/api/json`.
    async fn issue_crumb(&self) -> Result<HttpReply, BoxError>;

    /// `POST {base}/job/{job}/buildWithParameters?{parameter}={value}` with
    /// the crumb attached as a header. `value` is passed unencoded.
    async fn build_with_parameters(
        &self,
        job: &str,
        parameter: &str,
        value: &str,
        crumb: &Crumb,
    ) -> Result<HttpReply, BoxError>;
}

/// Minimal object-store surface the upload job consumes.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Copy the bytes of `local_path` to `(bucket, key)`. Returns the number
    /// of bytes sent.
    async fn put_file(&self, bucket: &str, key: &str, local_path: &Path) -> Result<u64, BoxError>;

    /// Whether `(bucket, key)` exists. `Ok(false)` means a definite "absent".
    async fn head_object(&self, bucket: &str, key: &str) -> Result<bool, BoxError>;
}

/// Capability to overwrite a file to zero length in place.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
pub trait Truncator: Send + Sync {
    /// Fail fast if the host environment does not grant write access.
    fn ensure_capability(&self, path: &Path) -> Result<(), BoxError>;

    /// Truncate `path` to zero bytes, keeping its inode and permissions.
    fn truncate(&self, path: &Path) -> Result<(), BoxError>;
}
