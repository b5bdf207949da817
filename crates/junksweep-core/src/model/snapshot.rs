/// The persisted bundle of one scan: entries, derived patterns, timestamp.
use super::entry::DiscoveredEntry;
use super::format::format_size;
use super::pattern::Pattern;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::Write;

/// One scan's results.
///
/// Every path referenced by a pattern must appear in `entries`, and each
/// pattern's total must match the sizes of those entries. [`validate`]
/// checks both.
///
/// [`validate`]: ScanSnapshot::validate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanSnapshot {
    #[serde(rename = "files")]
    pub entries: Vec<DiscoveredEntry>,
    pub patterns: Vec<Pattern>,
    #[serde(rename = "scanDate")]
    pub taken_at: DateTime<Utc>,
}

impl ScanSnapshot {
    /// Bundle entries and patterns, stamped with the current time.
    pub fn new(entries: Vec<DiscoveredEntry>, patterns: Vec<Pattern>) -> Self {
        Self {
            entries,
            patterns,
            taken_at: Utc::now(),
        }
    }

    /// Check referential integrity between patterns and entries.
    ///
    /// Returns a description of the first violation found.
    pub fn validate(&self) -> Result<(), String> {
        let sizes: HashMap<&str, u64> = self
            .entries
            .iter()
            .map(|e| (e.path.as_str(), e.size))
            .collect();

        let mut owner: HashMap<&str, &str> = HashMap::with_capacity(self.entries.len());
        for pattern in &self.patterns {
            let mut total: u64 = 0;
            for path in pattern.paths() {
                let Some(size) = sizes.get(path.as_str()) else {
                    return Err(format!(
                        "pattern '{}' references unknown path {path}",
                        pattern.name()
                    ));
                };
                if let Some(other) = owner.insert(path.as_str(), pattern.name()) {
                    return Err(format!(
                        "path {path} belongs to both '{other}' and '{}'",
                        pattern.name()
                    ));
                }
                total += size;
            }
            if total != pattern.total_size() {
                return Err(format!(
                    "pattern '{}' records {} bytes but its entries sum to {total}",
                    pattern.name(),
                    pattern.total_size()
                ));
            }
        }
        Ok(())
    }

    /// Write a one-row-per-pattern CSV report.
    pub fn write_patterns_csv<W: Write>(&self, writer: W) -> csv::Result<()> {
        let mut w = csv::Writer::from_writer(writer);
        w.write_record(["pattern", "safety", "items", "total_bytes", "total", "reason"])?;
        for p in &self.patterns {
            w.write_record([
                p.name(),
                p.safety().label(),
                p.item_count().to_string().as_str(),
                p.total_size().to_string().as_str(),
                format_size(p.total_size()).as_str(),
                p.rationale(),
            ])?;
        }
        w.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SafetyTier;

    fn sample() -> ScanSnapshot {
        let entries = vec![
            DiscoveredEntry::dir("/p/node_modules", 4_096),
            DiscoveredEntry::file("/p/app.log", 100),
        ];
        let patterns = vec![
            Pattern::new("node_modules", &entries[..1], SafetyTier::High, "deps"),
            Pattern::new("*.log files", &entries[1..], SafetyTier::Medium, "logs"),
        ];
        ScanSnapshot::new(entries, patterns)
    }

    #[test]
    fn consistent_snapshot_validates() {
        assert_eq!(sample().validate(), Ok(()));
    }

    #[test]
    fn dangling_pattern_path_is_rejected() {
        let mut snap = sample();
        snap.entries.pop();
        let err = snap.validate().unwrap_err();
        assert!(err.contains("/p/app.log"), "{err}");
    }

    #[test]
    fn overlapping_patterns_are_rejected() {
        let mut snap = sample();
        let dup = Pattern::new("again", &snap.entries[..1], SafetyTier::Low, "x");
        snap.patterns.push(dup);
        assert!(snap.validate().is_err());
    }

    #[test]
    fn size_drift_is_rejected() {
        let mut snap = sample();
        snap.entries[0].size += 1;
        assert!(snap.validate().is_err());
    }

    #[test]
    fn csv_report_has_one_row_per_pattern() {
        let mut buf = Vec::new();
        sample().write_patterns_csv(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("node_modules,High,1,4096,4.0 KB,"));
    }
}
