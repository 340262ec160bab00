//! Progress-callback trait for per-EBD pipeline events.
//!
//! Inject an [`Arc<dyn ProcessingProgressCallback>`] via
//! [`crate::config::RunConfigBuilder::progress_callback`] to follow a run as
//! it walks the EBDs of a document.
//!
//! # Why callbacks instead of printing?
//!
//! The library never writes to stdout. The CLI turns these events into a
//! progress bar and coloured lines; tests count them; other hosts can forward
//! them wherever they like.
//!
//! # Example
//!
//! ```rust
//! use ebd_toolchain::{ProcessingProgressCallback, RunConfig, EbdDescriptor};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     started: AtomicUsize,
//! }
//!
//! impl ProcessingProgressCallback for CountingCallback {
//!     fn on_ebd_start(&self, index: usize, total: usize, ebd: &EbdDescriptor) {
//!         self.started.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("[{index}/{total}] {} ({})", ebd.key, ebd.title);
//!     }
//! }
//!
//! let config = RunConfig::builder()
//!     .progress_callback(Arc::new(CountingCallback { started: AtomicUsize::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use crate::config::ExportType;
use crate::error::StageFailure;
use crate::scrape::EbdDescriptor;
use std::path::Path;
use std::sync::Arc;

/// Called by the pipeline as it processes each EBD.
///
/// EBDs are processed one after another, so events for one EBD never
/// interleave with those of another. All methods have default no-op
/// implementations so callers only override what they care about.
pub trait ProcessingProgressCallback: Send + Sync {
    /// Called once after key discovery, before the first EBD.
    fn on_run_start(&self, total_ebds: usize) {
        let _ = total_ebds;
    }

    /// Called before any stage runs for an EBD.
    ///
    /// # Arguments
    /// * `index` — 1-indexed position in discovery order
    /// * `total` — number of EBDs in the document
    /// * `ebd`   — key, title and chapter of the EBD
    fn on_ebd_start(&self, index: usize, total: usize, ebd: &EbdDescriptor) {
        let _ = (index, total, ebd);
    }

    /// Called after an artifact file has been written.
    fn on_artifact_written(&self, ebd_key: &str, export_type: ExportType, path: &Path) {
        let _ = (ebd_key, export_type, path);
    }

    /// Called for every classified failure, right after it is recorded in
    /// the ledger.
    fn on_stage_failure(&self, ebd_key: &str, failure: &StageFailure) {
        let _ = (ebd_key, failure);
    }

    /// Called once after every EBD has been attempted.
    ///
    /// # Arguments
    /// * `processed` — number of EBDs attempted
    /// * `failures`  — number of classified failures recorded
    fn on_run_complete(&self, processed: usize, failures: usize) {
        let _ = (processed, failures);
    }
}

/// A no-op implementation for callers that don't need progress events.
///
/// This is the default when no callback is configured.
pub struct NoopProgressCallback;

impl ProcessingProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::RunConfig`].
pub type ProgressCallback = Arc<dyn ProcessingProgressCallback>;
