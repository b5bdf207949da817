/// Top-level orchestration: scan, classify, persist, clean up, answer.
///
/// A `CleanupSession` is built once at startup from its collaborators and
/// owns the current entries and patterns. Nothing here is global; a
/// frontend holds the session and calls into it.
use crate::activity::{ActivityCategory, ActivityLog};
use crate::analysis::query::{self, Answer};
use crate::analysis::{AiCapability, ClassificationSource, PatternClassifier};
use crate::cleanup::{remove_paths, DeletionExecutor, DeletionReport, SystemTrash, TrashDirectory};
use crate::config::Config;
use crate::error::{ScanError, StoreError};
use crate::model::{describe_age, format_count, format_size, DiscoveredEntry, Pattern, ScanSnapshot};
use crate::scanner::progress::ScanProgress;
use crate::scanner::progressive::ProgressiveClassifier;
use crate::scanner::{ScanCoordinator, ScanHandle, ScanOptions};
use crate::store::{ScanStore, SNAPSHOT_FILE};
use chrono::{DateTime, Utc};
use crossbeam_channel::Receiver;
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

/// A scan in progress plus its interim classifier.
pub struct ActiveScan {
    handle: ScanHandle,
    progressive: Option<ProgressiveClassifier>,
}

impl ActiveScan {
    pub fn progress(&self) -> &Receiver<ScanProgress> {
        &self.handle.progress_rx
    }

    pub fn cancel(&self) {
        self.handle.cancel();
    }

    pub fn entry_count(&self) -> usize {
        self.handle.entry_count()
    }

    /// Latest interim grouping; advisory until the scan is finished.
    pub fn interim_patterns(&self) -> Vec<Pattern> {
        self.progressive
            .as_ref()
            .map(ProgressiveClassifier::latest)
            .unwrap_or_default()
    }
}

/// What [`CleanupSession::finish_scan`] did.
#[derive(Debug, Clone)]
pub struct ScanOutcome {
    pub entries: usize,
    pub patterns: usize,
    pub skipped_roots: Vec<(PathBuf, String)>,
    pub cancelled: bool,
    pub duration: Duration,
    pub source: ClassificationSource,
    pub interim_passes: usize,
    pub saved: bool,
}

pub struct CleanupSession {
    config: Config,
    log: ActivityLog,
    store: ScanStore,
    capability: AiCapability,
    executor: Box<dyn DeletionExecutor>,
    classifier: PatternClassifier,
    coordinator: ScanCoordinator,
    entries: Vec<DiscoveredEntry>,
    patterns: Vec<Pattern>,
    taken_at: Option<DateTime<Utc>>,
}

impl CleanupSession {
    pub fn new(
        config: Config,
        log: ActivityLog,
        store: ScanStore,
        capability: AiCapability,
        executor: Box<dyn DeletionExecutor>,
    ) -> Self {
        let classifier = PatternClassifier::new(config.rule_set());
        let coordinator =
            ScanCoordinator::new(config.path_policy(), config.scan_options(), log.clone());
        log.info(
            ActivityCategory::System,
            format!("Session ready; AI: {}", capability.describe()),
        );
        Self {
            config,
            log,
            store,
            capability,
            executor,
            classifier,
            coordinator,
            entries: Vec::new(),
            patterns: Vec::new(),
            taken_at: None,
        }
    }

    /// Build every collaborator from `config`. Removed items go to the
    /// system trash unless a `trash_dir` is configured. A snapshot location
    /// the platform cannot provide falls back to `.junksweep/` in the
    /// working directory.
    pub fn from_config(config: Config, capability: AiCapability) -> Self {
        let log = ActivityLog::new(config.activity_log_capacity);
        let store = ScanStore::new(
            config
                .snapshot_location()
                .unwrap_or_else(|| PathBuf::from(".junksweep").join(SNAPSHOT_FILE)),
        );
        let executor: Box<dyn DeletionExecutor> = match config.trash_location() {
            Some(dir) => Box::new(TrashDirectory::new(dir)),
            None => Box::new(SystemTrash),
        };
        Self::new(config, log, store, capability, executor)
    }

    /// Replace the coordinator's tuning, e.g. to shrink the progress
    /// channel.
    pub fn with_scan_options(mut self, options: ScanOptions) -> Self {
        self.coordinator =
            ScanCoordinator::new(self.config.path_policy(), options, self.log.clone());
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn log(&self) -> &ActivityLog {
        &self.log
    }

    /// Where [`remove_pattern`](Self::remove_pattern) sends items.
    pub fn executor_name(&self) -> &str {
        self.executor.name()
    }

    pub fn store(&self) -> &ScanStore {
        &self.store
    }

    pub fn is_scanning(&self) -> bool {
        self.coordinator.is_scanning()
    }

    pub fn entries(&self) -> &[DiscoveredEntry] {
        &self.entries
    }

    /// Current patterns, largest first.
    pub fn patterns(&self) -> &[Pattern] {
        &self.patterns
    }

    /// The current state as a snapshot, if there is one.
    pub fn snapshot(&self) -> Option<ScanSnapshot> {
        self.taken_at.map(|taken_at| ScanSnapshot {
            entries: self.entries.clone(),
            patterns: self.patterns.clone(),
            taken_at,
        })
    }

    /// "3 hours ago" style age of the current results.
    pub fn snapshot_age(&self) -> Option<String> {
        self.taken_at.map(|t| describe_age(Utc::now() - t))
    }

    /// Load the stored snapshot into the session. Returns `true` if one
    /// was loaded.
    pub fn restore(&mut self) -> bool {
        match self.store.try_load() {
            Ok(Some(snapshot)) => {
                self.log.info(
                    ActivityCategory::System,
                    format!(
                        "Loaded {} patterns from scan taken {}",
                        snapshot.patterns.len(),
                        describe_age(Utc::now() - snapshot.taken_at)
                    ),
                );
                self.install(snapshot);
                true
            }
            Ok(None) => {
                self.log
                    .debug(ActivityCategory::System, "No previous scan on disk");
                false
            }
            Err(err) => {
                self.log.warning(
                    ActivityCategory::System,
                    format!("Ignoring stored scan: {err}"),
                );
                false
            }
        }
    }

    /// Start scanning `roots` (or the configured roots when empty) along
    /// with the interim classifier.
    pub fn start_scan(&self, roots: &[PathBuf]) -> Result<ActiveScan, ScanError> {
        let resolved = self.config.resolve_roots(roots);
        for dropped in &resolved.dropped {
            self.log
                .warning(ActivityCategory::Scanning, format!("Not scanning: {dropped}"));
        }
        let handle = self
            .coordinator
            .start(self.config.scan_request(resolved.roots))?;

        let progressive = match ProgressiveClassifier::spawn(
            handle.live_entries.clone(),
            self.classifier.clone(),
            self.config.progressive_interval(),
            self.log.clone(),
        ) {
            Ok(p) => Some(p),
            Err(err) => {
                self.log.warning(
                    ActivityCategory::Scanning,
                    format!("Interim classification disabled: {err}"),
                );
                None
            }
        };
        Ok(ActiveScan {
            handle,
            progressive,
        })
    }

    /// Wait for `scan`, classify its entries once more, and store the
    /// result as the current snapshot.
    pub fn finish_scan(&mut self, scan: ActiveScan) -> ScanOutcome {
        let summary = scan.handle.wait();
        let interim_passes = scan.progressive.map(ProgressiveClassifier::stop).unwrap_or(0);

        let classification = self.classifier.classify_with(
            &self.capability,
            &summary.entries,
            self.config.ai_timeout(),
            &self.log,
        );
        if classification.source == ClassificationSource::Rules {
            self.log.info(
                ActivityCategory::Scanning,
                format!(
                    "Grouped {} entries into {} patterns",
                    format_count(summary.entries.len() as u64),
                    classification.patterns.len()
                ),
            );
        }

        let snapshot = ScanSnapshot::new(summary.entries, classification.patterns);
        let saved = self.persist(&snapshot);
        let outcome = ScanOutcome {
            entries: snapshot.entries.len(),
            patterns: snapshot.patterns.len(),
            skipped_roots: summary.skipped_roots,
            cancelled: summary.cancelled,
            duration: summary.duration,
            source: classification.source,
            interim_passes,
            saved,
        };
        self.install(snapshot);
        outcome
    }

    /// Start a scan and block until it is done.
    pub fn scan(&mut self, roots: &[PathBuf]) -> Result<ScanOutcome, ScanError> {
        let scan = self.start_scan(roots)?;
        Ok(self.finish_scan(scan))
    }

    /// Trash every member of the pattern whose id or name is `key`, then
    /// regroup what is left and store it.
    ///
    /// Returns `None` if no pattern matches `key`.
    pub fn remove_pattern(&mut self, key: &str) -> Option<DeletionReport> {
        let pattern = self
            .patterns
            .iter()
            .find(|p| p.id() == key || p.name() == key)?
            .clone();

        self.log.info(
            ActivityCategory::Deletion,
            format!(
                "Removing '{}': {} items, {}, to the {}",
                pattern.name(),
                format_count(pattern.item_count() as u64),
                format_size(pattern.total_size()),
                self.executor.name()
            ),
        );
        let report = remove_paths(self.executor.as_ref(), pattern.paths(), &self.log);

        let removed: HashSet<&str> = report.removed.iter().map(String::as_str).collect();
        let remaining: Vec<DiscoveredEntry> = self
            .entries
            .iter()
            .filter(|e| !removed.contains(e.path.as_str()))
            .cloned()
            .collect();
        let patterns = self.classifier.classify(&remaining);

        let snapshot = ScanSnapshot {
            entries: remaining,
            patterns,
            taken_at: self.taken_at.unwrap_or_else(Utc::now),
        };
        self.persist(&snapshot);
        self.install(snapshot);
        Some(report)
    }

    pub fn ask(&self, question: &str) -> Answer {
        query::answer_with(
            &self.capability,
            question,
            &self.patterns,
            self.config.ai_timeout(),
            &self.log,
        )
    }

    /// Forget the current results and delete the stored snapshot.
    pub fn clear_cache(&mut self) -> Result<(), StoreError> {
        self.entries.clear();
        self.patterns.clear();
        self.taken_at = None;
        match self.store.clear() {
            Ok(()) => {
                self.log
                    .info(ActivityCategory::System, "Cleared stored scan results");
                Ok(())
            }
            Err(err) => {
                self.log.error(ActivityCategory::System, err.to_string());
                Err(err)
            }
        }
    }

    fn persist(&self, snapshot: &ScanSnapshot) -> bool {
        match self.store.save(snapshot) {
            Ok(()) => {
                self.log.success(
                    ActivityCategory::System,
                    format!("Saved scan results to {}", self.store.path().display()),
                );
                true
            }
            Err(err) => {
                self.log.error(
                    ActivityCategory::System,
                    format!("Could not save scan results: {err}"),
                );
                false
            }
        }
    }

    fn install(&mut self, snapshot: ScanSnapshot) {
        self.entries = snapshot.entries;
        self.patterns = snapshot.patterns;
        self.taken_at = Some(snapshot.taken_at);
    }
}
