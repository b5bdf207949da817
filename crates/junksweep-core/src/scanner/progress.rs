/// Scan progress reporting — lightweight messages sent from the scan
/// thread to whoever is driving the scan via a crossbeam channel.
///
/// The discovered entries themselves live in the shared `LiveEntries`;
/// these messages carry only counters, root-level results and status.
use std::path::PathBuf;
use std::time::Duration;

/// Progress updates sent from the scan thread.
#[derive(Debug, Clone)]
pub enum ScanProgress {
    /// Emitted at each root boundary, just before the cancellation check.
    RootStarted {
        index: usize,
        total: usize,
        root: PathBuf,
    },
    /// One walker unit finished and its entries were appended.
    Batch {
        root: PathBuf,
        criterion: String,
        added: usize,
        entries_so_far: usize,
    },
    /// The root could not be scanned and was skipped.
    RootSkipped { root: PathBuf, reason: String },
    /// Every walker for the root has finished.
    RootFinished {
        root: PathBuf,
        found: usize,
        /// Fraction of roots processed, in `[0, 1]`.
        fraction: f32,
    },
    /// All roots processed.
    Complete { duration: Duration, entries: usize },
    /// Stopped at a root boundary on request; entries found so far are kept.
    Cancelled { duration: Duration, entries: usize },
}

impl ScanProgress {
    /// `true` for the last message a scan sends.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete { .. } | Self::Cancelled { .. })
    }
}
