/// Deletion — moving pattern members out of the way, one path at a time.
///
/// The actual move is behind [`DeletionExecutor`]. [`remove_paths`] calls it
/// once per path and keeps going after failures, so the caller gets a
/// per-path account and can retry just the failures.
///
/// [`SystemTrash`] hands items to the platform trash (Recycle Bin, macOS
/// Trash, freedesktop trash). [`TrashDirectory`] moves them into a plain
/// directory instead and is used when a `trash_dir` is configured.
use crate::activity::{ActivityCategory, ActivityLog};
use crate::error::CleanupError;
use crate::model::format_count;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Moves one path to wherever deleted items go.
pub trait DeletionExecutor: Send + Sync {
    /// Short label for logs.
    fn name(&self) -> &str;

    fn trash(&self, path: &Path) -> Result<(), CleanupError>;
}

fn ensure_exists(path: &Path) -> Result<(), CleanupError> {
    match fs::symlink_metadata(path) {
        Ok(_) => Ok(()),
        Err(_) => Err(CleanupError::NotFound(path.to_path_buf())),
    }
}

/// Executor backed by the operating system's trash.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTrash;

impl DeletionExecutor for SystemTrash {
    fn name(&self) -> &str {
        "system trash"
    }

    fn trash(&self, path: &Path) -> Result<(), CleanupError> {
        ensure_exists(path)?;
        trash::delete(path).map_err(|source| CleanupError::Trash {
            path: path.to_path_buf(),
            source,
        })?;
        debug!("trashed {}", path.display());
        Ok(())
    }
}

/// Executor that renames items into a plain directory.
///
/// Name clashes get a ` (2)`, ` (3)`, ... suffix. Items are never
/// overwritten. The directory must be on the same filesystem as the items.
#[derive(Debug, Clone)]
pub struct TrashDirectory {
    dir: PathBuf,
}

impl TrashDirectory {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// A free name in the trash directory for `path`.
    fn destination_for(&self, path: &Path) -> PathBuf {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "item".to_string());
        let first = self.dir.join(&name);
        if fs::symlink_metadata(&first).is_err() {
            return first;
        }
        (2u32..)
            .map(|n| self.dir.join(format!("{name} ({n})")))
            .find(|candidate| fs::symlink_metadata(candidate).is_err())
            .unwrap_or(first)
    }
}

impl DeletionExecutor for TrashDirectory {
    fn name(&self) -> &str {
        "trash directory"
    }

    fn trash(&self, path: &Path) -> Result<(), CleanupError> {
        ensure_exists(path)?;
        fs::create_dir_all(&self.dir).map_err(|source| CleanupError::Io {
            path: self.dir.clone(),
            source,
        })?;
        let dest = self.destination_for(path);
        fs::rename(path, &dest).map_err(|source| CleanupError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        debug!("trashed {} -> {}", path.display(), dest.display());
        Ok(())
    }
}

/// Outcome of a batch removal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeletionReport {
    pub success_count: usize,
    pub fail_count: usize,
    /// Paths that are gone now, including ones that had already vanished.
    pub removed: Vec<String>,
    /// Paths that could not be removed, with the reason.
    pub failed: Vec<(String, String)>,
}

impl DeletionReport {
    pub fn is_complete(&self) -> bool {
        self.fail_count == 0
    }
}

/// Trash every path in `paths`, continuing past failures.
///
/// A path that no longer exists counts as removed.
pub fn remove_paths(
    executor: &dyn DeletionExecutor,
    paths: &[String],
    log: &ActivityLog,
) -> DeletionReport {
    let mut report = DeletionReport::default();

    for path in paths {
        match executor.trash(Path::new(path)) {
            Ok(()) => {
                report.success_count += 1;
                report.removed.push(path.clone());
            }
            Err(CleanupError::NotFound(_)) => {
                log.warning(
                    ActivityCategory::Deletion,
                    format!("{path} was already gone"),
                );
                report.success_count += 1;
                report.removed.push(path.clone());
            }
            Err(err) => {
                log.error(ActivityCategory::Deletion, err.to_string());
                report.fail_count += 1;
                report.failed.push((path.clone(), err.to_string()));
            }
        }
    }

    let summary = format!(
        "Moved {} items to trash, {} failed",
        format_count(report.success_count as u64),
        format_count(report.fail_count as u64)
    );
    if report.is_complete() {
        log.success(ActivityCategory::Deletion, summary);
    } else {
        log.warning(ActivityCategory::Deletion, summary);
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::ActivityLevel;
    use tempfile::TempDir;

    #[test]
    fn moves_files_and_directories() {
        let tmp = TempDir::new().unwrap();
        let nm = tmp.path().join("p/node_modules");
        fs::create_dir_all(nm.join("lib")).unwrap();
        fs::write(nm.join("lib/a.js"), b"x").unwrap();
        let log_file = tmp.path().join("p/app.log");
        fs::write(&log_file, b"log").unwrap();

        let trash = TrashDirectory::new(tmp.path().join("trash"));
        let log = ActivityLog::new(20);
        let paths = vec![
            nm.to_string_lossy().into_owned(),
            log_file.to_string_lossy().into_owned(),
        ];
        let report = remove_paths(&trash, &paths, &log);

        assert_eq!(report.success_count, 2);
        assert!(report.is_complete());
        assert!(!nm.exists());
        assert!(!log_file.exists());
        assert!(tmp.path().join("trash/node_modules/lib/a.js").exists());
        assert!(tmp.path().join("trash/app.log").exists());
    }

    #[test]
    fn name_clashes_get_a_suffix() {
        let tmp = TempDir::new().unwrap();
        let trash = TrashDirectory::new(tmp.path().join("trash"));
        for dir in ["a", "b", "c"] {
            let f = tmp.path().join(dir).join("debug.log");
            fs::create_dir_all(f.parent().unwrap()).unwrap();
            fs::write(&f, dir).unwrap();
            trash.trash(&f).unwrap();
        }
        assert_eq!(fs::read_to_string(tmp.path().join("trash/debug.log")).unwrap(), "a");
        assert_eq!(fs::read_to_string(tmp.path().join("trash/debug.log (2)")).unwrap(), "b");
        assert_eq!(fs::read_to_string(tmp.path().join("trash/debug.log (3)")).unwrap(), "c");
    }

    #[test]
    fn missing_path_counts_as_removed() {
        let tmp = TempDir::new().unwrap();
        let trash = TrashDirectory::new(tmp.path().join("trash"));
        let gone = tmp.path().join("gone.tmp");
        assert!(matches!(trash.trash(&gone), Err(CleanupError::NotFound(_))));

        let log = ActivityLog::new(10);
        let report = remove_paths(&trash, &[gone.to_string_lossy().into_owned()], &log);
        assert_eq!(report.success_count, 1);
        assert_eq!(report.removed.len(), 1);
    }

    #[test]
    fn system_trash_reports_missing_paths_without_touching_the_trash() {
        let tmp = TempDir::new().unwrap();
        let gone = tmp.path().join("gone/node_modules");
        assert!(matches!(SystemTrash.trash(&gone), Err(CleanupError::NotFound(p)) if p == gone));

        let log = ActivityLog::new(10);
        let report = remove_paths(&SystemTrash, &[gone.to_string_lossy().into_owned()], &log);
        assert_eq!(report.success_count, 1);
        assert!(report.is_complete());
    }

    // Moves a real directory into the desktop trash of whoever runs it.
    #[test]
    #[ignore]
    fn system_trash_moves_directories_out_of_place() {
        let tmp = TempDir::new().unwrap();
        let nm = tmp.path().join("p/node_modules");
        fs::create_dir_all(nm.join("lib")).unwrap();
        fs::write(nm.join("lib/a.js"), b"x").unwrap();

        let log = ActivityLog::new(10);
        let report = remove_paths(&SystemTrash, &[nm.to_string_lossy().into_owned()], &log);
        assert_eq!(report.success_count, 1, "{:?}", report.failed);
        assert!(!nm.exists());
    }

    struct Picky;

    impl DeletionExecutor for Picky {
        fn name(&self) -> &str {
            "picky"
        }

        fn trash(&self, path: &Path) -> Result<(), CleanupError> {
            if path.to_string_lossy().contains("locked") {
                Err(CleanupError::Io {
                    path: path.to_path_buf(),
                    source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
                })
            } else {
                Ok(())
            }
        }
    }

    #[test]
    fn failures_are_counted_and_do_not_stop_the_batch() {
        let log = ActivityLog::new(10);
        let paths: Vec<String> = ["/p/a.log", "/p/locked.log", "/p/b.log"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let report = remove_paths(&Picky, &paths, &log);

        assert_eq!(report.success_count, 2);
        assert_eq!(report.fail_count, 1);
        assert_eq!(report.removed, vec!["/p/a.log", "/p/b.log"]);
        assert_eq!(report.failed[0].0, "/p/locked.log");
        assert_eq!(log.filtered(Some(ActivityLevel::Error), None).len(), 1);
        assert_eq!(log.filtered(Some(ActivityLevel::Warning), None).len(), 1);
    }
}
