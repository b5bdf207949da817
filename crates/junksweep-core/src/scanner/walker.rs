/// Directory walker — one recursive traversal of one root for one criterion.
///
/// Uses `jwalk` for the traversal. Pruning happens in `process_read_dir`,
/// before jwalk queues children for reading:
///
/// - hidden entries are dropped (except an entry whose name matches a
///   dot-prefixed criterion such as `.DS_Store` or `.venv`),
/// - entries under a [`PathPolicy`] prefix are dropped,
/// - matched directories have `read_children_path` cleared, so a matched
///   directory is reported once with its aggregate size and nothing
///   beneath it is visited.
///
/// The walker holds no shared state. Any number of walks can run at once.
use super::policy::PathPolicy;
use crate::error::ScanError;
use crate::model::DiscoveredEntry;
use std::ffi::OsStr;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// What a walk looks for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MatchCriterion {
    /// Entry name equals or contains the literal.
    Name(String),
    /// A directory whose name is exactly the literal.
    Directory(String),
    /// Entry name's extension equals this (stored without the period).
    Extension(String),
}

impl MatchCriterion {
    pub fn name(literal: impl Into<String>) -> Self {
        Self::Name(literal.into())
    }

    pub fn directory(literal: impl Into<String>) -> Self {
        Self::Directory(literal.into())
    }

    /// Extension criterion; a leading period is optional.
    pub fn extension(ext: &str) -> Self {
        Self::Extension(ext.trim_start_matches('.').to_string())
    }

    /// Case-sensitive match against an entry's final path component.
    pub fn matches(&self, file_name: &OsStr, is_dir: bool) -> bool {
        match self {
            Self::Name(lit) => !lit.is_empty() && file_name.to_string_lossy().contains(lit.as_str()),
            Self::Directory(lit) => is_dir && !lit.is_empty() && file_name == OsStr::new(lit),
            Self::Extension(ext) => Path::new(file_name)
                .extension()
                .is_some_and(|e| e == OsStr::new(ext)),
        }
    }

    /// `true` if a hidden entry with this name should still be considered.
    fn admits_hidden(&self, file_name: &OsStr, is_dir: bool) -> bool {
        matches!(self, Self::Name(lit) | Self::Directory(lit) if lit.starts_with('.'))
            && self.matches(file_name, is_dir)
    }
}

impl fmt::Display for MatchCriterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(lit) => write!(f, "name '{lit}'"),
            Self::Directory(lit) => write!(f, "directory '{lit}'"),
            Self::Extension(ext) => write!(f, "extension '.{ext}'"),
        }
    }
}

/// Tuning for a single walk.
#[derive(Debug, Clone, Copy)]
pub struct WalkOptions {
    /// Threads jwalk may use for this one walk. `1` walks serially.
    pub parallelism: usize,
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self { parallelism: 1 }
    }
}

/// Result of one successful walk.
#[derive(Debug, Default)]
pub struct WalkReport {
    pub entries: Vec<DiscoveredEntry>,
    /// Entries below the root that could not be read and were skipped.
    pub unreadable: u64,
}

fn is_hidden(name: &OsStr) -> bool {
    name.to_string_lossy().starts_with('.')
}

/// Fail if `root` is missing, excluded, or a directory that cannot be listed.
pub fn check_root(root: &Path, policy: &PathPolicy) -> Result<(), ScanError> {
    if !root.exists() {
        return Err(ScanError::RootMissing(root.to_path_buf()));
    }
    if policy.is_excluded(root) {
        return Err(ScanError::RootExcluded(root.to_path_buf()));
    }
    if root.is_dir() {
        // jwalk would turn a permission error here into a silent empty walk.
        fs::read_dir(root).map_err(|source| ScanError::RootUnreadable {
            path: root.to_path_buf(),
            source,
        })?;
    }
    Ok(())
}

/// Walk `root` and return every entry matching `criterion`.
///
/// The root itself is never reported, even when its own name matches.
///
/// A missing, excluded or unreadable root is an error; anything unreadable
/// below the root is skipped and counted.
pub fn walk(
    root: &Path,
    criterion: &MatchCriterion,
    policy: &PathPolicy,
    options: WalkOptions,
) -> Result<WalkReport, ScanError> {
    check_root(root, policy)?;

    let parallelism = if options.parallelism > 1 {
        jwalk::Parallelism::RayonNewPool(options.parallelism)
    } else {
        jwalk::Parallelism::Serial
    };

    let prune_criterion = criterion.clone();
    let prune_policy = policy.clone();

    let walker = jwalk::WalkDir::new(root)
        .skip_hidden(false)
        .follow_links(false)
        .parallelism(parallelism)
        .process_read_dir(move |depth, dir_path, _state, children| {
            // `None` is the synthetic read that yields the root itself.
            if depth.is_none() {
                return;
            }
            children.retain(|child| match child {
                Ok(e) => {
                    let is_dir = e.file_type.is_dir();
                    (!is_hidden(&e.file_name) || prune_criterion.admits_hidden(&e.file_name, is_dir))
                        && !prune_policy.is_excluded(&dir_path.join(&e.file_name))
                }
                // Keep errors so they are counted by the consumer.
                Err(_) => true,
            });
            for e in children.iter_mut().flatten() {
                if e.file_type.is_dir() && prune_criterion.matches(&e.file_name, true) {
                    e.read_children_path = None;
                }
            }
        });

    let mut report = WalkReport::default();
    for entry_result in walker {
        let entry = match entry_result {
            Ok(e) => e,
            Err(err) => {
                debug!("skipping unreadable entry under {}: {err}", root.display());
                report.unreadable += 1;
                continue;
            }
        };
        let is_dir = entry.file_type.is_dir();
        if entry.depth == 0 || !criterion.matches(&entry.file_name, is_dir) {
            continue;
        }

        let path = entry.path();
        let modified = fs::symlink_metadata(&path)
            .ok()
            .and_then(|m| m.modified().ok());
        let size = if is_dir {
            directory_size(&path)
        } else {
            match fs::symlink_metadata(&path) {
                Ok(m) => m.len(),
                Err(err) => {
                    debug!("skipping {}: {err}", path.display());
                    report.unreadable += 1;
                    continue;
                }
            }
        };
        report
            .entries
            .push(DiscoveredEntry::from_walk(&path, size, is_dir, modified));
    }

    debug!(
        "walked {} for {criterion}: {} matches, {} unreadable",
        root.display(),
        report.entries.len(),
        report.unreadable
    );
    Ok(report)
}

/// Sum of the sizes of all regular files beneath `dir`, hidden entries
/// excluded. Unreadable entries contribute nothing.
pub fn directory_size(dir: &Path) -> u64 {
    jwalk::WalkDir::new(dir)
        .skip_hidden(true)
        .follow_links(false)
        .parallelism(jwalk::Parallelism::Serial)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type.is_file())
        .filter_map(|e| fs::symlink_metadata(e.path()).ok())
        .map(|m| m.len())
        .sum()
}

/// Every (root, criterion) unit of work for one root.
pub fn units_for(root: &Path, criteria: &[MatchCriterion]) -> Vec<(PathBuf, MatchCriterion)> {
    criteria
        .iter()
        .map(|c| (root.to_path_buf(), c.clone()))
        .collect()
}
