#![doc = "size-rotate-core: core logic library for size-rotate."]

//! Size-triggered log archival, in two halves:
//!
//! - the **monitor** ([`monitor::run_monitor`]) probes a log file and, once it
//!   reaches the configured threshold, asks a Jenkins-style job server to run
//!   the upload job;
//! - the **upload job** ([`upload_job::UploadJob`]) copies the file to object
//!   storage, verifies the object, and truncates the file in place.
//!
//! Network and privilege boundaries sit behind the traits in [`contract`] so
//! both halves can be exercised with mocks.

pub mod audit;
pub mod config;
pub mod contract;
pub mod error;
pub mod monitor;
pub mod probe;
pub mod storage;
pub mod trigger;
pub mod truncate;
pub mod upload_job;

pub use error::RotateError;
