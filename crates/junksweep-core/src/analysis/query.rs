/// Rule-based answers to simple questions about the current patterns.
///
/// When an external backend is available it gets the first try, with a
/// plain-text summary of the patterns as context; any failure or timeout
/// falls through to the keyword rules here.
use super::ai::{call_with_timeout, AiCapability};
use crate::activity::{ActivityCategory, ActivityLog};
use crate::model::{format_count, format_size, Pattern, SafetyTier};
use std::time::Duration;

/// How many patterns the default summary lists.
const SUMMARY_LIMIT: usize = 3;

const HELP_TEXT: &str = "Try asking: \"what is the largest pattern?\", \
\"what is safe to delete?\", \"how much space can I free?\", \
\"how many patterns are there?\" or name a pattern such as node_modules.";

/// Who produced an answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerSource {
    Rules,
    External,
}

#[derive(Debug, Clone)]
pub struct Answer {
    pub text: String,
    pub source: AnswerSource,
}

/// Answer `question` with the external backend if possible, otherwise by
/// the keyword rules.
pub fn answer_with(
    capability: &AiCapability,
    question: &str,
    patterns: &[Pattern],
    timeout: Duration,
    log: &ActivityLog,
) -> Answer {
    if let AiCapability::Available(backend) = capability {
        let backend = backend.clone();
        let q = question.to_string();
        let context = describe_patterns(patterns);
        match call_with_timeout(timeout, move || backend.answer(&q, &context)) {
            Ok(text) if !text.trim().is_empty() => {
                return Answer {
                    text,
                    source: AnswerSource::External,
                };
            }
            Ok(_) => log.warning(
                ActivityCategory::Ai,
                "external backend returned an empty answer; using rules",
            ),
            Err(err) => log.warning(ActivityCategory::Ai, format!("{err}; using rules")),
        }
    }
    Answer {
        text: respond(question, patterns),
        source: AnswerSource::Rules,
    }
}

/// Keyword-driven answer. Never fails.
pub fn respond(question: &str, patterns: &[Pattern]) -> String {
    let q = question.to_lowercase();

    if q.contains("help") {
        return HELP_TEXT.to_string();
    }
    if patterns.is_empty() {
        return "No scan results yet. Run a scan first.".to_string();
    }
    if let Some(p) = mentioned_pattern(&q, patterns) {
        return describe_one(p);
    }
    if q.contains("largest") || q.contains("biggest") {
        // Patterns are kept sorted by size, but don't rely on it here.
        if let Some(p) = patterns.iter().max_by_key(|p| p.total_size()) {
            return format!("The largest pattern is {}", describe_one(p));
        }
    }
    if q.contains("safe") {
        return describe_safe(patterns);
    }
    if q.contains("how many") || q.contains("count") {
        let items: usize = patterns.iter().map(Pattern::item_count).sum();
        return format!(
            "{} patterns covering {} items.",
            patterns.len(),
            format_count(items as u64)
        );
    }
    if q.contains("total") || q.contains("how much") || q.contains("space") || q.contains("free") {
        let total: u64 = patterns.iter().map(Pattern::total_size).sum();
        return format!(
            "Deleting every pattern would free about {}.",
            format_size(total)
        );
    }
    summary(patterns)
}

/// Plain-text pattern listing used as context for an external backend.
pub fn describe_patterns(patterns: &[Pattern]) -> String {
    patterns
        .iter()
        .map(|p| {
            format!(
                "{} | safety {} | {} items | {}",
                p.name(),
                p.safety(),
                p.item_count(),
                format_size(p.total_size())
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn mentioned_pattern<'a>(q: &str, patterns: &'a [Pattern]) -> Option<&'a Pattern> {
    patterns.iter().find(|p| {
        let key = p
            .name()
            .trim_start_matches(['*', '.'])
            .trim_end_matches(" files")
            .to_lowercase();
        key.len() > 2 && q.contains(&key)
    })
}

fn describe_one(p: &Pattern) -> String {
    format!(
        "{}: {} items, {} ({} safety). {}",
        p.name(),
        format_count(p.item_count() as u64),
        format_size(p.total_size()),
        p.safety(),
        p.rationale()
    )
}

fn describe_safe(patterns: &[Pattern]) -> String {
    let safe: Vec<&Pattern> = patterns
        .iter()
        .filter(|p| p.safety() == SafetyTier::High)
        .collect();
    if safe.is_empty() {
        return "Nothing is rated High safety. Review Medium patterns before deleting.".to_string();
    }
    let total: u64 = safe.iter().map(|p| p.total_size()).sum();
    let names: Vec<&str> = safe.iter().map(|p| p.name()).collect();
    format!(
        "Safe to delete ({}): {}.",
        format_size(total),
        names.join(", ")
    )
}

fn summary(patterns: &[Pattern]) -> String {
    let total: u64 = patterns.iter().map(Pattern::total_size).sum();
    let top: Vec<String> = patterns
        .iter()
        .take(SUMMARY_LIMIT)
        .map(|p| format!("{} ({})", p.name(), format_size(p.total_size())))
        .collect();
    format!(
        "Found {} patterns totalling {}. Largest: {}.",
        patterns.len(),
        format_size(total),
        top.join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::ai::AiBackend;
    use crate::analysis::PatternClassifier;
    use crate::error::ClassifierError;
    use crate::model::DiscoveredEntry;
    use std::sync::Arc;

    fn patterns() -> Vec<Pattern> {
        PatternClassifier::default().classify(&[
            DiscoveredEntry::dir("/p/node_modules", 2 * 1024 * 1024),
            DiscoveredEntry::file("/p/app.log", 2048),
            DiscoveredEntry::file("/p/notes.txt", 10),
        ])
    }

    #[test]
    fn no_patterns_asks_for_a_scan() {
        assert!(respond("what is big?", &[]).contains("Run a scan"));
    }

    #[test]
    fn largest_names_the_biggest_pattern() {
        let a = respond("What is the LARGEST thing?", &patterns());
        assert!(a.starts_with("The largest pattern is node_modules"), "{a}");
    }

    #[test]
    fn safe_lists_high_tier_only() {
        let a = respond("what is safe to delete", &patterns());
        assert!(a.contains("node_modules"));
        assert!(!a.contains("*.log files"));
    }

    #[test]
    fn named_pattern_is_described() {
        let a = respond("tell me about the log files", &patterns());
        assert!(a.starts_with("*.log files: 1 items, 2.0 KB"), "{a}");
    }

    #[test]
    fn total_sums_all_patterns() {
        let a = respond("how much space can I free?", &patterns());
        assert!(a.contains("2.0 MB"), "{a}");
    }

    #[test]
    fn count_reports_patterns_and_items() {
        assert_eq!(
            respond("how many are there", &patterns()),
            "3 patterns covering 3 items."
        );
    }

    #[test]
    fn unknown_question_gets_summary() {
        let a = respond("hello", &patterns());
        assert!(a.starts_with("Found 3 patterns"), "{a}");
    }

    #[test]
    fn help_works_without_patterns() {
        assert_eq!(respond("help", &[]), HELP_TEXT);
    }

    struct Echo(bool);

    impl AiBackend for Echo {
        fn name(&self) -> &str {
            "echo"
        }
        fn classify(
            &self,
            _e: &[DiscoveredEntry],
        ) -> Result<Vec<crate::analysis::ai::CandidatePattern>, ClassifierError> {
            Err(ClassifierError::Unavailable)
        }
        fn answer(&self, q: &str, context: &str) -> Result<String, ClassifierError> {
            if self.0 {
                Ok(format!("{q} / {}", context.lines().count()))
            } else {
                Err(ClassifierError::Backend("down".into()))
            }
        }
    }

    #[test]
    fn external_answer_is_preferred() {
        let cap = AiCapability::Available(Arc::new(Echo(true)));
        let a = answer_with(&cap, "why", &patterns(), Duration::from_secs(5), &ActivityLog::new(5));
        assert_eq!(a.source, AnswerSource::External);
        assert_eq!(a.text, "why / 3");
    }

    #[test]
    fn failing_backend_falls_back_to_rules() {
        let log = ActivityLog::new(5);
        let cap = AiCapability::Available(Arc::new(Echo(false)));
        let a = answer_with(&cap, "largest?", &patterns(), Duration::from_secs(5), &log);
        assert_eq!(a.source, AnswerSource::Rules);
        assert!(a.text.contains("node_modules"));
        assert_eq!(log.len(), 1);
    }
}
