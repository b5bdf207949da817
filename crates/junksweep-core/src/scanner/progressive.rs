/// Interim classification while a scan is still running.
///
/// A consumer thread wakes every `interval`, and if the live entry count
/// changed since its last pass, reclassifies a copy of the live entries
/// and publishes the result. Its output is advisory; the caller runs one
/// authoritative classification after the scan ends.
use super::LiveEntries;
use crate::activity::{ActivityCategory, ActivityLog};
use crate::analysis::PatternClassifier;
use crate::error::ScanError;
use crate::model::Pattern;

use crossbeam_channel::{RecvTimeoutError, Sender};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Default cadence between interim passes.
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(2_000);

/// Handle to the running consumer thread.
pub struct ProgressiveClassifier {
    stop_tx: Sender<()>,
    latest: Arc<RwLock<Vec<Pattern>>>,
    passes: Arc<AtomicUsize>,
    thread: Option<thread::JoinHandle<()>>,
}

impl ProgressiveClassifier {
    /// Start the consumer. Dropping the handle without [`stop`] also ends
    /// the thread at its next wake-up.
    ///
    /// [`stop`]: ProgressiveClassifier::stop
    pub fn spawn(
        live: LiveEntries,
        classifier: PatternClassifier,
        interval: Duration,
        log: ActivityLog,
    ) -> Result<Self, ScanError> {
        let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(1);
        let latest: Arc<RwLock<Vec<Pattern>>> = Arc::new(RwLock::new(Vec::new()));
        let passes = Arc::new(AtomicUsize::new(0));

        let published = latest.clone();
        let counter = passes.clone();
        let thread = thread::Builder::new()
            .name("junksweep-progressive".into())
            .spawn(move || {
                let mut last_count = 0usize;
                loop {
                    match stop_rx.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => {}
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }

                    let snapshot = {
                        let entries = live.read();
                        if entries.len() == last_count {
                            continue;
                        }
                        entries.clone()
                    };
                    last_count = snapshot.len();

                    let patterns = classifier.classify(&snapshot);
                    let pass = counter.fetch_add(1, Ordering::Relaxed) + 1;
                    log.debug(
                        ActivityCategory::Scanning,
                        format!(
                            "Interim pass {pass}: {} entries in {} patterns",
                            snapshot.len(),
                            patterns.len()
                        ),
                    );
                    *published.write() = patterns;
                }
            })
            .map_err(|err| ScanError::Spawn("progressive classifier", err))?;

        Ok(Self {
            stop_tx,
            latest,
            passes,
            thread: Some(thread),
        })
    }

    /// The most recent interim pattern set (empty before the first pass).
    pub fn latest(&self) -> Vec<Pattern> {
        self.latest.read().clone()
    }

    /// Interim passes completed so far.
    pub fn passes(&self) -> usize {
        self.passes.load(Ordering::Relaxed)
    }

    /// Stop the thread and wait for it. Returns the number of passes run.
    pub fn stop(mut self) -> usize {
        let _ = self.stop_tx.try_send(());
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
        self.passes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DiscoveredEntry;
    use std::time::Instant;

    fn wait_for(mut done: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if done() {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        false
    }

    #[test]
    fn publishes_when_entries_grow() {
        let live: LiveEntries = Arc::new(RwLock::new(Vec::new()));
        let pc = ProgressiveClassifier::spawn(
            live.clone(),
            PatternClassifier::default(),
            Duration::from_millis(10),
            ActivityLog::new(50),
        )
        .unwrap();

        live.write().push(DiscoveredEntry::dir("/p/node_modules", 10));
        assert!(wait_for(|| pc.latest().len() == 1));

        live.write().push(DiscoveredEntry::file("/p/a.log", 99));
        assert!(wait_for(|| pc.latest().len() == 2));
        assert_eq!(pc.latest()[0].name(), "*.log files");

        assert!(pc.stop() >= 2);
    }

    #[test]
    fn unchanged_entries_are_not_reclassified() {
        let live: LiveEntries = Arc::new(RwLock::new(vec![DiscoveredEntry::file("/p/a.log", 1)]));
        let pc = ProgressiveClassifier::spawn(
            live,
            PatternClassifier::default(),
            Duration::from_millis(5),
            ActivityLog::new(50),
        )
        .unwrap();
        assert!(wait_for(|| pc.passes() == 1));
        thread::sleep(Duration::from_millis(50));
        assert_eq!(pc.stop(), 1);
    }

    #[test]
    fn stop_returns_promptly() {
        let live: LiveEntries = Arc::new(RwLock::new(Vec::new()));
        let pc = ProgressiveClassifier::spawn(
            live,
            PatternClassifier::default(),
            Duration::from_secs(60),
            ActivityLog::new(5),
        )
        .unwrap();
        let started = Instant::now();
        assert_eq!(pc.stop(), 0);
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
