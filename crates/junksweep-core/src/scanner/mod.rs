/// Scanner module — orchestrates filesystem scanning.
///
/// One background thread walks the configured roots in order. Within a
/// root, one [`walker::walk`] per match criterion runs concurrently on a
/// rayon pool; each finished walk sends its batch back over a crossbeam
/// channel and the scan thread appends it to the shared [`LiveEntries`].
/// Walkers never touch the shared collection themselves.
///
/// Cancellation is checked at root boundaries only: walkers already
/// running for the current root finish and their entries are kept.
pub mod policy;
pub mod progress;
pub mod progressive;
pub mod walker;

use crate::activity::{ActivityCategory, ActivityLog};
use crate::error::ScanError;
use crate::model::{format_count, DiscoveredEntry};
use policy::PathPolicy;
use progress::ScanProgress;
use walker::{MatchCriterion, WalkOptions, WalkReport};

use crossbeam_channel::{Receiver, Sender};
use parking_lot::{Mutex, RwLock};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// A shared, concurrently-readable entry collection.
///
/// Only the scan thread writes, one short write lock per walker batch.
/// Readers (the progressive classifier, a UI) take a read lock.
pub type LiveEntries = Arc<RwLock<Vec<DiscoveredEntry>>>;

/// Maximum number of progress messages that may queue up in the channel.
///
/// A consumer that falls behind stalls the scan thread at the next send
/// rather than letting the queue grow without bound.
pub const PROGRESS_CHANNEL_CAPACITY: usize = 4_096;

/// What to scan.
#[derive(Debug, Clone, Default)]
pub struct ScanRequest {
    pub roots: Vec<PathBuf>,
    /// Literals matching directories of exactly that name.
    pub directory_names: Vec<String>,
    /// Literals matching any entry whose name contains them.
    pub name_patterns: Vec<String>,
    pub extensions: Vec<String>,
}

impl ScanRequest {
    /// Directory names, then name literals, then extensions, each in the
    /// order given.
    pub fn criteria(&self) -> Vec<MatchCriterion> {
        self.directory_names
            .iter()
            .filter(|d| !d.is_empty())
            .map(MatchCriterion::directory)
            .chain(
                self.name_patterns
                    .iter()
                    .filter(|p| !p.is_empty())
                    .map(MatchCriterion::name),
            )
            .chain(
                self.extensions
                    .iter()
                    .filter(|e| !e.trim_start_matches('.').is_empty())
                    .map(|e| MatchCriterion::extension(e)),
            )
            .collect()
    }
}

/// Tuning for the coordinator.
#[derive(Debug, Clone, Copy)]
pub struct ScanOptions {
    /// Threads in the pool that runs concurrent walkers for one root.
    pub walker_threads: usize,
    /// Threads each individual walk may use internally.
    pub walk_parallelism: usize,
    /// Bound of the progress channel. `0` makes every send a rendezvous.
    pub progress_capacity: usize,
    /// Drop entries nested beneath another matched directory when done.
    pub collapse_nested: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            walker_threads: num_cpus::get(),
            walk_parallelism: 1,
            progress_capacity: PROGRESS_CHANNEL_CAPACITY,
            collapse_nested: true,
        }
    }
}

/// Coordinator state. The fraction is the share of roots processed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScanState {
    Idle,
    Scanning { fraction: f32 },
}

/// What a finished (or cancelled) scan produced.
#[derive(Debug, Clone, Default)]
pub struct ScanSummary {
    pub entries: Vec<DiscoveredEntry>,
    /// Roots that were skipped, with the reason.
    pub skipped_roots: Vec<(PathBuf, String)>,
    /// Entries below a root that could not be read.
    pub unreadable: u64,
    pub cancelled: bool,
    pub duration: Duration,
}

/// Runs scans one at a time.
///
/// Cheap to clone; clones share the same state, so a scan started through
/// one clone blocks a second start through another.
#[derive(Debug, Clone)]
pub struct ScanCoordinator {
    policy: Arc<PathPolicy>,
    options: ScanOptions,
    state: Arc<Mutex<ScanState>>,
    log: ActivityLog,
}

impl ScanCoordinator {
    pub fn new(policy: PathPolicy, options: ScanOptions, log: ActivityLog) -> Self {
        Self {
            policy: Arc::new(policy),
            options,
            state: Arc::new(Mutex::new(ScanState::Idle)),
            log,
        }
    }

    pub fn state(&self) -> ScanState {
        *self.state.lock()
    }

    pub fn is_scanning(&self) -> bool {
        matches!(self.state(), ScanState::Scanning { .. })
    }

    pub fn options(&self) -> &ScanOptions {
        &self.options
    }

    /// Start a scan on a background thread.
    ///
    /// Rejected with [`ScanError::AlreadyScanning`] while another scan from
    /// this coordinator is still running.
    pub fn start(&self, request: ScanRequest) -> Result<ScanHandle, ScanError> {
        {
            let mut state = self.state.lock();
            if matches!(*state, ScanState::Scanning { .. }) {
                return Err(ScanError::AlreadyScanning);
            }
            *state = ScanState::Scanning { fraction: 0.0 };
        }

        let (progress_tx, progress_rx) =
            crossbeam_channel::bounded::<ScanProgress>(self.options.progress_capacity);
        let cancel_flag = Arc::new(AtomicBool::new(false));
        let live_entries: LiveEntries = Arc::new(RwLock::new(Vec::new()));

        let run = ScanRun {
            request,
            policy: self.policy.clone(),
            options: self.options,
            progress_tx,
            cancel_flag: cancel_flag.clone(),
            live_entries: live_entries.clone(),
            state: self.state.clone(),
            log: self.log.clone(),
        };

        let thread = thread::Builder::new()
            .name("junksweep-scanner".into())
            .spawn(move || run.execute());

        match thread {
            Ok(thread) => Ok(ScanHandle {
                progress_rx,
                live_entries,
                cancel_flag,
                thread: Some(thread),
            }),
            Err(err) => {
                *self.state.lock() = ScanState::Idle;
                Err(ScanError::Spawn("scanner", err))
            }
        }
    }
}

/// Handle to a running or completed scan. Allows cancellation and
/// receiving progress updates.
pub struct ScanHandle {
    /// Receiver for progress updates from the scan thread.
    pub progress_rx: Receiver<ScanProgress>,
    /// Entries found so far; grows while the scan runs.
    pub live_entries: LiveEntries,
    cancel_flag: Arc<AtomicBool>,
    thread: Option<thread::JoinHandle<ScanSummary>>,
}

impl ScanHandle {
    /// Request the scan to stop at the next root boundary.
    pub fn cancel(&self) {
        self.cancel_flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel_flag.load(Ordering::Relaxed)
    }

    pub fn entry_count(&self) -> usize {
        self.live_entries.read().len()
    }

    /// Drain remaining progress and wait for the scan thread.
    ///
    /// Progress already consumed by the caller is not replayed.
    pub fn wait(mut self) -> ScanSummary {
        for _ in self.progress_rx.iter() {}
        match self.thread.take().map(thread::JoinHandle::join) {
            Some(Ok(summary)) => summary,
            _ => {
                warn!("scanner thread ended abnormally; keeping entries found so far");
                ScanSummary {
                    entries: self.live_entries.read().clone(),
                    cancelled: true,
                    ..ScanSummary::default()
                }
            }
        }
    }
}

/// Resets the coordinator to `Idle` however the scan thread exits.
struct IdleOnDrop(Arc<Mutex<ScanState>>);

impl Drop for IdleOnDrop {
    fn drop(&mut self) {
        *self.0.lock() = ScanState::Idle;
    }
}

/// Everything the scan thread owns.
struct ScanRun {
    request: ScanRequest,
    policy: Arc<PathPolicy>,
    options: ScanOptions,
    progress_tx: Sender<ScanProgress>,
    cancel_flag: Arc<AtomicBool>,
    live_entries: LiveEntries,
    state: Arc<Mutex<ScanState>>,
    log: ActivityLog,
}

impl ScanRun {
    fn execute(self) -> ScanSummary {
        let idle_guard = IdleOnDrop(self.state.clone());
        let start = Instant::now();
        let criteria = self.request.criteria();
        let roots = &self.request.roots;

        self.log.info(
            ActivityCategory::Scanning,
            format!(
                "Scan started: {} roots, {} criteria",
                roots.len(),
                criteria.len()
            ),
        );

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.options.walker_threads.max(1))
            .thread_name(|i| format!("junksweep-walker-{i}"))
            .build()
            .map_err(|err| warn!("walker pool unavailable, using the global pool: {err}"))
            .ok();

        let mut seen: HashSet<String> = HashSet::new();
        let mut summary = ScanSummary::default();

        for (index, root) in roots.iter().enumerate() {
            let _ = self.progress_tx.send(ScanProgress::RootStarted {
                index,
                total: roots.len(),
                root: root.clone(),
            });
            if self.cancel_flag.load(Ordering::Relaxed) {
                summary.cancelled = true;
                break;
            }

            let found = match self.scan_root(root, &criteria, pool.as_ref(), &mut seen, &mut summary)
            {
                Ok(found) => {
                    self.log.info(
                        ActivityCategory::Scanning,
                        format!("{}: {} entries", root.display(), format_count(found as u64)),
                    );
                    found
                }
                Err(err) => {
                    let reason = err.to_string();
                    self.log
                        .warning(ActivityCategory::Scanning, format!("Skipped root: {reason}"));
                    let _ = self.progress_tx.send(ScanProgress::RootSkipped {
                        root: root.clone(),
                        reason: reason.clone(),
                    });
                    summary.skipped_roots.push((root.clone(), reason));
                    0
                }
            };

            let fraction = (index + 1) as f32 / roots.len() as f32;
            *self.state.lock() = ScanState::Scanning { fraction };
            let _ = self.progress_tx.send(ScanProgress::RootFinished {
                root: root.clone(),
                found,
                fraction,
            });
        }

        if self.options.collapse_nested {
            let dropped = collapse_nested(&mut self.live_entries.write());
            if dropped > 0 {
                info!("dropped {dropped} entries nested inside matched directories");
            }
        }

        summary.entries = self.live_entries.read().clone();
        summary.duration = start.elapsed();
        let entries = summary.entries.len();

        // Idle before the terminal message so a consumer reacting to it can
        // start the next scan straight away.
        drop(idle_guard);

        if summary.cancelled {
            self.log.warning(
                ActivityCategory::Scanning,
                format!(
                    "Scan cancelled after {:.1}s with {} entries",
                    summary.duration.as_secs_f64(),
                    format_count(entries as u64)
                ),
            );
            let _ = self.progress_tx.send(ScanProgress::Cancelled {
                duration: summary.duration,
                entries,
            });
        } else {
            self.log.success(
                ActivityCategory::Scanning,
                format!(
                    "Scan complete in {:.1}s: {} entries, {} roots skipped",
                    summary.duration.as_secs_f64(),
                    format_count(entries as u64),
                    summary.skipped_roots.len()
                ),
            );
            let _ = self.progress_tx.send(ScanProgress::Complete {
                duration: summary.duration,
                entries,
            });
        }
        summary
    }

    /// Fan out one walk per criterion and append batches as they arrive.
    /// Returns the number of new entries recorded for this root.
    fn scan_root(
        &self,
        root: &Path,
        criteria: &[MatchCriterion],
        pool: Option<&rayon::ThreadPool>,
        seen: &mut HashSet<String>,
        summary: &mut ScanSummary,
    ) -> Result<usize, ScanError> {
        walker::check_root(root, &self.policy)?;

        let (done_tx, done_rx) =
            crossbeam_channel::unbounded::<(MatchCriterion, Result<WalkReport, ScanError>)>();
        let walk_options = WalkOptions {
            parallelism: self.options.walk_parallelism,
        };

        for (unit_root, criterion) in walker::units_for(root, criteria) {
            let tx = done_tx.clone();
            let policy = self.policy.clone();
            let job = move || {
                let result = walker::walk(&unit_root, &criterion, &policy, walk_options);
                let _ = tx.send((criterion, result));
            };
            match pool {
                Some(pool) => pool.spawn(job),
                None => rayon::spawn(job),
            }
        }
        drop(done_tx);

        let mut found = 0;
        for (criterion, result) in done_rx {
            let report = match result {
                Ok(report) => report,
                Err(err) => {
                    warn!("walk of {} for {criterion} failed: {err}", root.display());
                    continue;
                }
            };
            summary.unreadable += report.unreadable;

            let fresh: Vec<DiscoveredEntry> = report
                .entries
                .into_iter()
                .filter(|e| seen.insert(e.path.clone()))
                .collect();
            let added = fresh.len();
            let entries_so_far = {
                let mut live = self.live_entries.write();
                live.extend(fresh);
                live.len()
            };
            found += added;

            let _ = self.progress_tx.send(ScanProgress::Batch {
                root: root.to_path_buf(),
                criterion: criterion.to_string(),
                added,
                entries_so_far,
            });
        }
        Ok(found)
    }
}

/// Remove entries that lie strictly beneath a matched directory entry.
///
/// Returns how many were removed. Order of the survivors is preserved.
pub fn collapse_nested(entries: &mut Vec<DiscoveredEntry>) -> usize {
    let dirs: HashSet<PathBuf> = entries
        .iter()
        .filter(|e| e.is_dir)
        .map(|e| PathBuf::from(&e.path))
        .collect();
    if dirs.is_empty() {
        return 0;
    }
    let before = entries.len();
    entries.retain(|e| {
        !Path::new(&e.path)
            .ancestors()
            .skip(1)
            .any(|a| dirs.contains(a))
    });
    before - entries.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn criteria_put_names_before_extensions() {
        let req = ScanRequest {
            roots: vec![],
            directory_names: vec!["node_modules".into(), String::new()],
            name_patterns: vec![".DS_Store".into()],
            extensions: vec![".log".into(), "tmp".into(), ".".into()],
        };
        assert_eq!(
            req.criteria(),
            vec![
                MatchCriterion::directory("node_modules"),
                MatchCriterion::name(".DS_Store"),
                MatchCriterion::extension("log"),
                MatchCriterion::extension("tmp"),
            ]
        );
    }

    #[test]
    fn collapse_drops_entries_under_matched_dirs() {
        let mut entries = vec![
            DiscoveredEntry::dir("/p/build", 100),
            DiscoveredEntry::file("/p/build/out.log", 5),
            DiscoveredEntry::dir("/p/build/cache", 20),
            DiscoveredEntry::file("/p/builder.log", 7),
            DiscoveredEntry::file("/p/app.log", 3),
        ];
        assert_eq!(collapse_nested(&mut entries), 2);
        let paths: Vec<&str> = entries.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["/p/build", "/p/builder.log", "/p/app.log"]);
    }

    #[test]
    fn collapse_ignores_files_as_parents() {
        let mut entries = vec![
            DiscoveredEntry::file("/p/x.tmp", 1),
            DiscoveredEntry::file("/p/x.tmp/y", 1),
        ];
        assert_eq!(collapse_nested(&mut entries), 0);
    }

    #[test]
    fn new_coordinator_is_idle() {
        let c = ScanCoordinator::new(
            PathPolicy::with_prefixes(vec![]),
            ScanOptions::default(),
            ActivityLog::new(10),
        );
        assert_eq!(c.state(), ScanState::Idle);
        assert!(!c.is_scanning());
    }
}
