/// Snapshot persistence — one JSON file holding the most recent scan.
///
/// `save` writes to a sibling temp file and renames it over the target, so
/// a reader sees either the old snapshot or the new one, never a partial
/// file. `load` never fails: a missing, unreadable, corrupt or
/// inconsistent file reads as "no previous scan".
use crate::error::StoreError;
use crate::model::{describe_age, ScanSnapshot};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Deserialize;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// File name used under the cache directory.
pub const SNAPSHOT_FILE: &str = "last_scan.json";

/// Just the timestamp, for age checks without keeping the whole snapshot.
#[derive(Deserialize)]
struct SnapshotHeader {
    #[serde(rename = "scanDate")]
    taken_at: DateTime<Utc>,
}

/// Owner of the on-disk snapshot file.
#[derive(Debug)]
pub struct ScanStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl ScanStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// `<cache_dir>/junksweep/last_scan.json`, if the platform has a cache
    /// directory.
    pub fn default_location() -> Option<PathBuf> {
        dirs::cache_dir().map(|d| d.join("junksweep").join(SNAPSHOT_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the stored snapshot with `snapshot`.
    ///
    /// A snapshot that fails [`ScanSnapshot::validate`] is refused and the
    /// existing file is left untouched.
    pub fn save(&self, snapshot: &ScanSnapshot) -> Result<(), StoreError> {
        snapshot.validate().map_err(StoreError::Integrity)?;

        let _guard = self.write_lock.lock();
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir).map_err(|e| StoreError::io(dir, e))?;
        }

        let tmp = self.path.with_extension("json.tmp");
        if let Err(err) = write_synced(&tmp, snapshot).and_then(|()| replace_file(&tmp, &self.path)) {
            // Nothing to remove if the temp file was never created.
            let _ = fs::remove_file(&tmp);
            return Err(err);
        }
        debug!(
            "saved snapshot with {} entries and {} patterns to {}",
            snapshot.entries.len(),
            snapshot.patterns.len(),
            self.path.display()
        );
        Ok(())
    }

    /// The stored snapshot, or `None` if there is no usable one.
    pub fn load(&self) -> Option<ScanSnapshot> {
        match self.try_load() {
            Ok(snapshot) => snapshot,
            Err(err) => {
                warn!("ignoring stored snapshot: {err}");
                None
            }
        }
    }

    /// Like [`load`](Self::load) but says why a present file was unusable.
    pub fn try_load(&self) -> Result<Option<ScanSnapshot>, StoreError> {
        let file = match File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::io(&self.path, e)),
        };
        let snapshot: ScanSnapshot = serde_json::from_reader(BufReader::new(file))?;
        snapshot.validate().map_err(StoreError::Integrity)?;
        Ok(Some(snapshot))
    }

    /// Remove the stored snapshot. Succeeds if there was none.
    pub fn clear(&self) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock();
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::io(&self.path, e)),
        }
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// When the stored snapshot was taken.
    pub fn taken_at(&self) -> Option<DateTime<Utc>> {
        let file = File::open(&self.path).ok()?;
        serde_json::from_reader::<_, SnapshotHeader>(BufReader::new(file))
            .ok()
            .map(|h| h.taken_at)
    }

    /// "5 minutes ago" style age of the stored snapshot.
    pub fn age_description(&self) -> Option<String> {
        self.age_description_at(Utc::now())
    }

    pub fn age_description_at(&self, now: DateTime<Utc>) -> Option<String> {
        self.taken_at().map(|t| describe_age(now - t))
    }
}

/// Write `snapshot` to `path` and flush it to disk.
fn write_synced(path: &Path, snapshot: &ScanSnapshot) -> Result<(), StoreError> {
    let file = File::create(path).map_err(|e| StoreError::io(path, e))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, snapshot)?;
    writer.flush().map_err(|e| StoreError::io(path, e))?;
    writer
        .get_ref()
        .sync_all()
        .map_err(|e| StoreError::io(path, e))
}

/// Rename `from` over `to`.
fn replace_file(from: &Path, to: &Path) -> Result<(), StoreError> {
    // Windows refuses to rename onto an existing file.
    #[cfg(windows)]
    {
        if to.exists() {
            fs::remove_file(to).map_err(|e| StoreError::io(to, e))?;
        }
    }
    fs::rename(from, to).map_err(|e| StoreError::io(to, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::PatternClassifier;
    use crate::model::DiscoveredEntry;
    use chrono::{Duration, TimeZone};
    use tempfile::TempDir;

    fn snapshot() -> ScanSnapshot {
        let modified = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 5).unwrap();
        let entries = vec![
            DiscoveredEntry::dir("/p/node_modules", 4096).with_modified(modified),
            DiscoveredEntry::file("/p/app.log", 12),
            DiscoveredEntry::file("/p/notes.txt", 3),
        ];
        let patterns = PatternClassifier::default().classify(&entries);
        ScanSnapshot::new(entries, patterns)
    }

    #[test]
    fn failed_save_leaves_no_temp_file() {
        let tmp = TempDir::new().unwrap();
        let target = tmp.path().join("last_scan.json");
        // A non-empty directory where the snapshot should go.
        fs::create_dir_all(target.join("occupied")).unwrap();

        let store = ScanStore::new(&target);
        assert!(store.save(&snapshot()).is_err());
        assert!(!tmp.path().join("last_scan.json.tmp").exists());
        assert!(target.join("occupied").is_dir());
    }

    #[test]
    fn save_then_load_round_trips() {
        let tmp = TempDir::new().unwrap();
        let store = ScanStore::new(tmp.path().join("nested/last_scan.json"));
        let snap = snapshot();

        store.save(&snap).unwrap();
        assert!(store.exists());
        assert!(!tmp.path().join("nested/last_scan.json.tmp").exists());
        assert_eq!(store.load(), Some(snap));
    }

    #[test]
    fn missing_file_loads_as_none() {
        let tmp = TempDir::new().unwrap();
        let store = ScanStore::new(tmp.path().join("last_scan.json"));
        assert!(store.load().is_none());
        assert!(store.try_load().unwrap().is_none());
        assert!(store.age_description().is_none());
    }

    #[test]
    fn corrupt_file_loads_as_none() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("last_scan.json");
        fs::write(&path, b"{\"files\": [").unwrap();
        let store = ScanStore::new(&path);
        assert!(store.load().is_none());
        assert!(matches!(store.try_load(), Err(StoreError::Json(_))));
    }

    #[test]
    fn inconsistent_file_loads_as_none() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("last_scan.json");
        let mut snap = snapshot();
        snap.entries.retain(|e| e.name != "app.log");
        fs::write(&path, serde_json::to_vec(&snap).unwrap()).unwrap();

        let store = ScanStore::new(&path);
        assert!(store.load().is_none());
        assert!(matches!(store.try_load(), Err(StoreError::Integrity(_))));
    }

    #[test]
    fn invalid_snapshot_is_not_saved() {
        let tmp = TempDir::new().unwrap();
        let store = ScanStore::new(tmp.path().join("last_scan.json"));
        let mut snap = snapshot();
        snap.entries.clear();
        assert!(matches!(store.save(&snap), Err(StoreError::Integrity(_))));
        assert!(!store.exists());
    }

    #[test]
    fn save_overwrites_rather_than_merges() {
        let tmp = TempDir::new().unwrap();
        let store = ScanStore::new(tmp.path().join("last_scan.json"));
        store.save(&snapshot()).unwrap();

        let entries = vec![DiscoveredEntry::file("/q/x.tmp", 1)];
        let patterns = PatternClassifier::default().classify(&entries);
        let second = ScanSnapshot::new(entries, patterns);
        store.save(&second).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded.entries.len(), 1);
        assert_eq!(loaded, second);
    }

    #[test]
    fn clear_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let store = ScanStore::new(tmp.path().join("last_scan.json"));
        store.save(&snapshot()).unwrap();
        store.clear().unwrap();
        assert!(!store.exists());
        store.clear().unwrap();
        assert!(store.load().is_none());
    }

    #[test]
    fn age_is_bucketed() {
        let tmp = TempDir::new().unwrap();
        let store = ScanStore::new(tmp.path().join("last_scan.json"));
        let snap = snapshot();
        store.save(&snap).unwrap();

        let at = |d: Duration| store.age_description_at(snap.taken_at + d).unwrap();
        assert_eq!(at(Duration::seconds(10)), "just now");
        assert_eq!(at(Duration::minutes(5)), "5 minutes ago");
        assert_eq!(at(Duration::hours(1)), "1 hour ago");
        assert_eq!(at(Duration::days(3)), "3 days ago");
    }
}
