/// A single filesystem entry that matched one of the scan criteria.
///
/// Entries are created by the directory walker and never mutated after
/// that. A whole scan's worth of entries is replaced wholesale by the next
/// scan, so there is no identity beyond the path.
use chrono::{DateTime, Utc};
use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::SystemTime;

/// A matched file or directory.
///
/// For directories `size` is the recursive sum of all regular files beneath
/// it, excluding hidden entries. The matched directory is reported as one
/// atomic unit; nothing inside it is reported separately.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredEntry {
    /// Absolute path, unique within one scan.
    pub path: String,

    /// Logical size in bytes.
    pub size: u64,

    /// Final path component.
    pub name: CompactString,

    #[serde(rename = "isDirectory")]
    pub is_dir: bool,

    /// Last-modified timestamp. `None` when the metadata could not be read.
    #[serde(rename = "modificationDate")]
    pub modified: Option<DateTime<Utc>>,
}

impl DiscoveredEntry {
    /// Create a regular-file entry.
    pub fn file(path: impl Into<String>, size: u64) -> Self {
        Self::new(path.into(), size, false, None)
    }

    /// Create a directory entry with an already-aggregated size.
    pub fn dir(path: impl Into<String>, size: u64) -> Self {
        Self::new(path.into(), size, true, None)
    }

    fn new(path: String, size: u64, is_dir: bool, modified: Option<DateTime<Utc>>) -> Self {
        let name = Path::new(&path)
            .file_name()
            .map(|n| CompactString::new(n.to_string_lossy()))
            .unwrap_or_else(|| CompactString::new(&path));
        Self {
            path,
            size,
            name,
            is_dir,
            modified,
        }
    }

    /// Build an entry from a walked path and its metadata timestamp.
    pub fn from_walk(path: &Path, size: u64, is_dir: bool, modified: Option<SystemTime>) -> Self {
        Self::new(
            path.to_string_lossy().into_owned(),
            size,
            is_dir,
            modified.map(DateTime::<Utc>::from),
        )
    }

    /// Attach a modification timestamp.
    pub fn with_modified(mut self, modified: DateTime<Utc>) -> Self {
        self.modified = Some(modified);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_is_final_component() {
        let e = DiscoveredEntry::file("/home/u/project/app.log", 10);
        assert_eq!(e.name, "app.log");
        assert!(!e.is_dir);
    }

    #[test]
    fn serialises_with_snapshot_field_names() {
        let e = DiscoveredEntry::dir("/p/build", 42);
        let json = serde_json::to_value(&e).unwrap();
        assert_eq!(json["size"], 42);
        assert_eq!(json["isDirectory"], true);
        assert!(json["modificationDate"].is_null());
        assert_eq!(json["name"], "build");
    }
}
