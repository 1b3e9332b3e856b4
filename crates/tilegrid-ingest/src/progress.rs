//! Message-passing progress reporting.
//!
//! Workers never share a counter; each emits a completion event on an
//! mpsc channel and a single aggregator task consumes them, tallies the
//! totals, and forwards each event to an optional observer (the CLI
//! hangs its progress bar here).

use std::sync::Arc;

/// How one image finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageOutcome {
    /// Loaded and committed to the catalog by this run.
    Ingested,
    /// Already catalogued; nothing was done.
    Skipped,
}

/// One completed image.
#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub partition: usize,
    pub pathname: String,
    pub outcome: ImageOutcome,
}

/// Observer invoked by the aggregator for every completion event.
pub type ProgressCallback = Arc<dyn Fn(&ProgressEvent) + Send + Sync>;
