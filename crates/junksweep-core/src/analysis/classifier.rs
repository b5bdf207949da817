/// Pattern classification — groups discovered entries into named patterns.
///
/// The rule-based pass is deterministic and always available. Each entry
/// lands in exactly one group, chosen by the first rule that matches:
///
/// 1. the first literal in `temp_patterns` it matches (directory literals
///    need a directory of exactly that name, others a name containing it),
/// 2. the first extension in `extensions` its path ends with,
/// 3. the "Other temporary files" fallback.
///
/// Groups are rebuilt from scratch on every call and returned sorted by
/// total size, largest first. Ties keep the order in which the groups were
/// first seen.
///
/// An external classifier may propose its own grouping. Its output is
/// accepted only if every candidate passes validation; a single bad
/// candidate discards the whole proposal in favour of the rule-based pass.
use super::ai::{call_with_timeout, AiCapability, CandidatePattern};
use super::rules::{extension_label, RuleSet, OTHER_LABEL};
use crate::activity::{ActivityCategory, ActivityLog};
use crate::error::ClassifierError;
use crate::model::{DiscoveredEntry, Pattern, SafetyTier};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

/// Where a pattern set came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassificationSource {
    Rules,
    External,
}

/// Result of [`PatternClassifier::classify_with`].
#[derive(Debug, Clone)]
pub struct Classification {
    pub patterns: Vec<Pattern>,
    pub source: ClassificationSource,
}

/// A group under construction.
struct Group<'a> {
    name: String,
    members: Vec<&'a DiscoveredEntry>,
    safety: Option<SafetyTier>,
    reason: Option<String>,
}

/// Groups entries into patterns using a [`RuleSet`].
#[derive(Debug, Clone, Default)]
pub struct PatternClassifier {
    rules: Arc<RuleSet>,
}

impl PatternClassifier {
    pub fn new(rules: RuleSet) -> Self {
        Self {
            rules: Arc::new(rules),
        }
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Name of the group the rules put `entry` in.
    pub fn group_name(&self, entry: &DiscoveredEntry) -> String {
        if let Some(lit) = self.rules.match_literal(&entry.name, entry.is_dir) {
            return lit.to_string();
        }
        if let Some(ext) = self.rules.match_extension(&entry.path) {
            return extension_label(ext);
        }
        OTHER_LABEL.to_string()
    }

    /// Deterministic rule-based classification.
    pub fn classify(&self, entries: &[DiscoveredEntry]) -> Vec<Pattern> {
        let mut groups: Vec<Group<'_>> = Vec::new();
        self.group_into(&mut groups, entries.iter());
        self.finish(groups)
    }

    /// Classify with the external backend when there is one, falling back
    /// to the rules on timeout, backend error or failed validation.
    pub fn classify_with(
        &self,
        capability: &AiCapability,
        entries: &[DiscoveredEntry],
        timeout: Duration,
        log: &ActivityLog,
    ) -> Classification {
        let AiCapability::Available(backend) = capability else {
            return self.rule_based(entries);
        };

        let backend = Arc::clone(backend);
        let owned = entries.to_vec();
        let proposal = call_with_timeout(timeout, move || backend.classify(&owned));

        match proposal.and_then(|candidates| self.accept_external(&candidates, entries)) {
            Ok(patterns) => {
                log.success(
                    ActivityCategory::Ai,
                    format!(
                        "{} grouped {} entries into {} patterns",
                        capability.describe(),
                        entries.len(),
                        patterns.len()
                    ),
                );
                Classification {
                    patterns,
                    source: ClassificationSource::External,
                }
            }
            Err(err) => {
                log.warning(
                    ActivityCategory::Ai,
                    format!("{err}; using rule-based classification"),
                );
                self.rule_based(entries)
            }
        }
    }

    fn rule_based(&self, entries: &[DiscoveredEntry]) -> Classification {
        Classification {
            patterns: self.classify(entries),
            source: ClassificationSource::Rules,
        }
    }

    /// Validate an external proposal and turn it into patterns.
    ///
    /// Every candidate needs a unique non-empty name and at least one path
    /// drawn from `entries`, and no path may be claimed twice. Paths unknown to
    /// `entries` are dropped. Entries no candidate claims are grouped by
    /// the rules, merging into a candidate group of the same name.
    pub fn accept_external(
        &self,
        candidates: &[CandidatePattern],
        entries: &[DiscoveredEntry],
    ) -> Result<Vec<Pattern>, ClassifierError> {
        if candidates.is_empty() {
            return Err(ClassifierError::Rejected("no patterns proposed".into()));
        }

        let by_path: HashMap<&str, &DiscoveredEntry> =
            entries.iter().map(|e| (e.path.as_str(), e)).collect();
        let mut claimed: HashSet<&str> = HashSet::new();
        let mut names: HashSet<&str> = HashSet::new();
        let mut groups: Vec<Group<'_>> = Vec::with_capacity(candidates.len());

        for candidate in candidates {
            let name = candidate.name.trim();
            if name.is_empty() {
                return Err(ClassifierError::Rejected("pattern with an empty name".into()));
            }
            if !names.insert(name) {
                return Err(ClassifierError::Rejected(format!(
                    "pattern '{name}' is proposed twice"
                )));
            }
            let mut members = Vec::new();
            for path in &candidate.paths {
                let Some(&entry) = by_path.get(path.as_str()) else {
                    continue;
                };
                if !claimed.insert(entry.path.as_str()) {
                    return Err(ClassifierError::Rejected(format!(
                        "{path} is claimed by more than one pattern"
                    )));
                }
                members.push(entry);
            }
            if members.is_empty() {
                return Err(ClassifierError::Rejected(format!(
                    "pattern '{name}' matches none of the scanned entries"
                )));
            }
            let reason = candidate
                .reason
                .as_deref()
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .map(str::to_string);
            groups.push(Group {
                name: name.to_string(),
                members,
                safety: candidate.safety,
                reason,
            });
        }

        let leftovers = entries
            .iter()
            .filter(|e| !claimed.contains(e.path.as_str()));
        self.group_into(&mut groups, leftovers);
        Ok(self.finish(groups))
    }

    /// Append each entry to the group the rules name, creating groups in
    /// first-seen order.
    fn group_into<'a>(
        &self,
        groups: &mut Vec<Group<'a>>,
        entries: impl Iterator<Item = &'a DiscoveredEntry>,
    ) {
        let mut index: HashMap<String, usize> = groups
            .iter()
            .enumerate()
            .map(|(i, g)| (g.name.clone(), i))
            .collect();

        for entry in entries {
            let name = self.group_name(entry);
            match index.get(&name) {
                Some(&i) => groups[i].members.push(entry),
                None => {
                    index.insert(name.clone(), groups.len());
                    groups.push(Group {
                        name,
                        members: vec![entry],
                        safety: None,
                        reason: None,
                    });
                }
            }
        }
    }

    fn finish(&self, groups: Vec<Group<'_>>) -> Vec<Pattern> {
        let mut patterns: Vec<Pattern> = groups
            .into_iter()
            .map(|g| {
                let safety = g.safety.unwrap_or_else(|| self.rules.tier_for(&g.name));
                let reason = g
                    .reason
                    .unwrap_or_else(|| RuleSet::rationale_for(safety).to_string());
                Pattern::new(g.name, g.members, safety, reason)
            })
            .collect();
        // Stable: ties keep first-seen order.
        patterns.sort_by(|a, b| b.total_size().cmp(&a.total_size()));
        patterns
    }
}
