/// Named groups of discovered entries with aggregate stats and a safety tier.
///
/// A `Pattern`'s `item_count` and `total_size` are always derived from its
/// member set. There is no setter for either; the only way to change a
/// pattern is to build a new one, which is what every classification pass
/// does.
use super::entry::DiscoveredEntry;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use uuid::Uuid;

/// How confidently a pattern's contents can be deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SafetyTier {
    High,
    Medium,
    Low,
}

impl SafetyTier {
    /// Human-readable label for display.
    pub fn label(self) -> &'static str {
        match self {
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
        }
    }
}

impl fmt::Display for SafetyTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A named group of discovered entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "PatternRecord", try_from = "PatternRecord")]
pub struct Pattern {
    id: String,
    name: String,
    paths: Vec<String>,
    safety: SafetyTier,
    rationale: String,
    total_size: u64,
}

impl Pattern {
    /// Build a pattern from its member entries.
    ///
    /// Duplicate paths among `members` are recorded once.
    pub fn new<'a>(
        name: impl Into<String>,
        members: impl IntoIterator<Item = &'a DiscoveredEntry>,
        safety: SafetyTier,
        rationale: impl Into<String>,
    ) -> Self {
        let mut paths: Vec<String> = Vec::new();
        let mut total_size: u64 = 0;
        let mut seen = HashSet::new();
        for entry in members {
            if seen.insert(entry.path.as_str()) {
                paths.push(entry.path.clone());
                total_size += entry.size;
            }
        }
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            paths,
            safety,
            rationale: rationale.into(),
            total_size,
        }
    }

    /// Stable unique identifier generated at creation.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Grouping key, e.g. `node_modules` or `*.log files`.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    pub fn safety(&self) -> SafetyTier {
        self.safety
    }

    pub fn rationale(&self) -> &str {
        &self.rationale
    }

    /// Number of member paths.
    pub fn item_count(&self) -> usize {
        self.paths.len()
    }

    /// Sum of member entry sizes.
    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    /// `true` if `path` is one of this pattern's members.
    pub fn contains_path(&self, path: &str) -> bool {
        self.paths.iter().any(|p| p == path)
    }
}

/// On-disk representation of a [`Pattern`].
///
/// `count` is written for readers of the file but never trusted on load:
/// a record whose `count` disagrees with its path list is rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct PatternRecord {
    id: String,
    #[serde(rename = "patternName")]
    pattern_name: String,
    paths: Vec<String>,
    #[serde(rename = "safetyScore")]
    safety_score: SafetyTier,
    reason: String,
    count: usize,
    #[serde(rename = "totalSize")]
    total_size: u64,
}

impl From<Pattern> for PatternRecord {
    fn from(p: Pattern) -> Self {
        Self {
            count: p.paths.len(),
            id: p.id,
            pattern_name: p.name,
            paths: p.paths,
            safety_score: p.safety,
            reason: p.rationale,
            total_size: p.total_size,
        }
    }
}

impl TryFrom<PatternRecord> for Pattern {
    type Error = String;

    fn try_from(r: PatternRecord) -> Result<Self, Self::Error> {
        if r.count != r.paths.len() {
            return Err(format!(
                "pattern '{}' declares {} items but lists {} paths",
                r.pattern_name,
                r.count,
                r.paths.len()
            ));
        }
        Ok(Self {
            id: r.id,
            name: r.pattern_name,
            paths: r.paths,
            safety: r.safety_score,
            rationale: r.reason,
            total_size: r.total_size,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries() -> Vec<DiscoveredEntry> {
        vec![
            DiscoveredEntry::dir("/a/node_modules", 700),
            DiscoveredEntry::dir("/b/node_modules", 300),
        ]
    }

    #[test]
    fn stats_are_derived_from_members() {
        let e = entries();
        let p = Pattern::new("node_modules", &e, SafetyTier::High, "regenerable");
        assert_eq!(p.item_count(), 2);
        assert_eq!(p.total_size(), 1_000);
        assert!(p.contains_path("/b/node_modules"));
    }

    #[test]
    fn duplicate_members_are_counted_once() {
        let e = entries();
        let p = Pattern::new(
            "node_modules",
            e.iter().chain(e.iter()),
            SafetyTier::High,
            "regenerable",
        );
        assert_eq!(p.item_count(), 2);
        assert_eq!(p.total_size(), 1_000);
    }

    #[test]
    fn ids_are_unique() {
        let e = entries();
        let a = Pattern::new("x", &e, SafetyTier::Low, "r");
        let b = Pattern::new("x", &e, SafetyTier::Low, "r");
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn record_uses_snapshot_field_names() {
        let e = entries();
        let p = Pattern::new("node_modules", &e, SafetyTier::High, "regenerable");
        let json = serde_json::to_value(&p).unwrap();
        assert_eq!(json["patternName"], "node_modules");
        assert_eq!(json["safetyScore"], "High");
        assert_eq!(json["count"], 2);
        assert_eq!(json["totalSize"], 1_000);
        assert_eq!(json["reason"], "regenerable");
    }

    #[test]
    fn inconsistent_count_is_rejected() {
        let json = r#"{"id":"1","patternName":"x","paths":["/a"],
            "safetyScore":"Low","reason":"r","count":3,"totalSize":1}"#;
        assert!(serde_json::from_str::<Pattern>(json).is_err());
    }
}
