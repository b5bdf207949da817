/// Rule tables for grouping discovered entries and rating their safety.
///
/// The same ordered tables drive both the walker's match criteria and the
/// classifier's grouping, so anything the scanner can find the classifier
/// can name.
use crate::model::SafetyTier;
use std::collections::HashSet;

/// Known disposable-artifact names, in priority order.
///
/// Matching is case-sensitive and the first literal that matches wins, so
/// more specific names come first. Literals in [`DIRECTORY_LITERALS`] match
/// only a directory of exactly that name; the rest match any entry whose
/// name contains them.
pub const COMMON_TEMP_PATTERNS: &[&str] = &[
    // Dependencies
    "node_modules",
    "bower_components",
    ".venv",
    "Pods",
    // Build output
    "DerivedData",
    "__pycache__",
    ".pytest_cache",
    ".mypy_cache",
    ".gradle",
    ".next",
    ".nuxt",
    ".parcel-cache",
    ".turbo",
    "dist",
    "build",
    "target",
    // OS metadata
    ".DS_Store",
    "Thumbs.db",
    // Logs, temp, cache
    "logs",
    "tmp",
    "temp",
    "Caches",
    "cache",
];

/// Known disposable file extensions, in priority order.
pub const FILE_EXTENSIONS: &[&str] = &[
    ".log", ".tmp", ".temp", ".bak", ".old", ".swp", ".dmp", ".crash", ".part", ".crdownload",
    ".cache", ".zip", ".dmg", ".pkg",
];

/// Literals that are always regenerable from a manifest or a build.
pub const HIGH_SAFETY: &[&str] = &[
    "node_modules",
    "bower_components",
    ".venv",
    "Pods",
    "DerivedData",
    "__pycache__",
    ".pytest_cache",
    ".mypy_cache",
    ".gradle",
    ".next",
    ".nuxt",
    ".parcel-cache",
    ".turbo",
    "dist",
    "build",
    "target",
];

/// Literals that name a directory artifact. `build.rs`, `distance.pdf` or
/// `attempt.docx` never match them.
pub const DIRECTORY_LITERALS: &[&str] = &[
    "node_modules",
    "bower_components",
    ".venv",
    "Pods",
    "DerivedData",
    "__pycache__",
    ".pytest_cache",
    ".mypy_cache",
    ".gradle",
    ".next",
    ".nuxt",
    ".parcel-cache",
    ".turbo",
    "dist",
    "build",
    "target",
    "logs",
    "tmp",
    "temp",
    "Caches",
    "cache",
];

/// Logs, temp files, caches and OS metadata: usually safe, worth a glance.
///
/// Extension groups are listed by their generated label.
pub const MEDIUM_SAFETY: &[&str] = &[
    ".DS_Store",
    "Thumbs.db",
    "logs",
    "tmp",
    "temp",
    "Caches",
    "cache",
    "*.log files",
    "*.tmp files",
    "*.temp files",
    "*.swp files",
    "*.dmp files",
    "*.crash files",
    "*.cache files",
];

/// Label for entries that match no literal and no extension.
pub const OTHER_LABEL: &str = "Other temporary files";

pub const HIGH_RATIONALE: &str =
    "Dependency or build output that can be regenerated; safe to delete.";
pub const MEDIUM_RATIONALE: &str =
    "Logs, caches or temporary files that are usually safe to delete.";
pub const LOW_RATIONALE: &str = "Not a recognised artifact; review before deleting.";

/// Label of the group an extension's matches are collected under.
pub fn extension_label(ext: &str) -> String {
    format!("*{} files", normalize_extension(ext))
}

/// Return `ext` with exactly one leading period.
pub fn normalize_extension(ext: &str) -> String {
    format!(".{}", ext.trim_start_matches('.'))
}

/// The ordered tables the classifier and walker share.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleSet {
    pub temp_patterns: Vec<String>,
    pub extensions: Vec<String>,
    pub high_safety: HashSet<String>,
    pub medium_safety: HashSet<String>,
    /// Literals matched against whole directory names only.
    pub directory_literals: HashSet<String>,
}

impl Default for RuleSet {
    fn default() -> Self {
        Self {
            temp_patterns: owned(COMMON_TEMP_PATTERNS),
            extensions: owned(FILE_EXTENSIONS),
            high_safety: owned(HIGH_SAFETY).into_iter().collect(),
            medium_safety: owned(MEDIUM_SAFETY).into_iter().collect(),
            directory_literals: owned(DIRECTORY_LITERALS).into_iter().collect(),
        }
    }
}

impl RuleSet {
    /// Build a rule set from custom ordered tables, keeping the built-in
    /// safety sets and adding `extra_high` / `extra_medium` to them.
    /// Extra High literals are directory literals as well.
    pub fn with_tables(
        temp_patterns: Vec<String>,
        extensions: Vec<String>,
        extra_high: &[String],
        extra_medium: &[String],
    ) -> Self {
        let mut rules = Self {
            temp_patterns,
            extensions: extensions.iter().map(|e| normalize_extension(e)).collect(),
            ..Self::default()
        };
        rules.high_safety.extend(extra_high.iter().cloned());
        rules.directory_literals.extend(extra_high.iter().cloned());
        rules.medium_safety.extend(extra_medium.iter().cloned());
        rules
    }

    pub fn is_directory_literal(&self, literal: &str) -> bool {
        self.directory_literals.contains(literal)
    }

    /// The first literal matching an entry called `name`, by table order.
    pub fn match_literal(&self, name: &str, is_dir: bool) -> Option<&str> {
        self.temp_patterns
            .iter()
            .find(|lit| {
                if lit.is_empty() {
                    false
                } else if self.is_directory_literal(lit) {
                    is_dir && name == lit.as_str()
                } else {
                    name.contains(lit.as_str())
                }
            })
            .map(String::as_str)
    }

    /// The first extension `path` ends with, by table order.
    pub fn match_extension(&self, path: &str) -> Option<&str> {
        self.extensions
            .iter()
            .find(|ext| path.ends_with(ext.as_str()))
            .map(String::as_str)
    }

    /// Safety tier for a group label.
    pub fn tier_for(&self, group: &str) -> SafetyTier {
        if self.high_safety.contains(group) {
            SafetyTier::High
        } else if self.medium_safety.contains(group) {
            SafetyTier::Medium
        } else {
            SafetyTier::Low
        }
    }

    /// Fixed rationale text for a tier.
    pub fn rationale_for(tier: SafetyTier) -> &'static str {
        match tier {
            SafetyTier::High => HIGH_RATIONALE,
            SafetyTier::Medium => MEDIUM_RATIONALE,
            SafetyTier::Low => LOW_RATIONALE,
        }
    }
}

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
