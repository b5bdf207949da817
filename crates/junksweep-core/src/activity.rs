/// Activity log — leveled, categorised, human-readable events.
///
/// This is the event sink the rest of the crate reports into: scan start
/// and end, skipped roots, classification results, save/load outcomes and
/// deletion results. Every event is also mirrored to `tracing`.
///
/// There is no global instance. An `ActivityLog` is constructed once by
/// the caller and cloned into whichever component needs it; clones share
/// the same bounded buffer.
///
/// # Usage
///
/// ```
/// use junksweep_core::activity::{ActivityCategory, ActivityLog};
///
/// let log = ActivityLog::new(100);
/// log.info(ActivityCategory::Scanning, "Scan started");
/// assert_eq!(log.len(), 1);
/// ```
use chrono::{DateTime, Local};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::fmt;
use std::io::Write;
use std::sync::Arc;

/// Default number of events retained before the oldest are evicted.
pub const DEFAULT_CAPACITY: usize = 1_000;

/// Severity of an activity event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActivityLevel {
    Info,
    Success,
    Warning,
    Error,
    Debug,
}

impl ActivityLevel {
    pub fn label(self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Success => "SUCCESS",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
            Self::Debug => "DEBUG",
        }
    }
}

/// Subsystem an activity event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActivityCategory {
    Scanning,
    Ai,
    Deletion,
    System,
    General,
}

impl ActivityCategory {
    pub fn label(self) -> &'static str {
        match self {
            Self::Scanning => "scanning",
            Self::Ai => "ai",
            Self::Deletion => "deletion",
            Self::System => "system",
            Self::General => "general",
        }
    }
}

/// A single recorded event.
#[derive(Debug, Clone)]
pub struct ActivityEvent {
    pub timestamp: DateTime<Local>,
    pub level: ActivityLevel,
    pub category: ActivityCategory,
    pub message: String,
}

impl fmt::Display for ActivityEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {:<7} {:<8} {}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            self.level.label(),
            self.category.label(),
            self.message
        )
    }
}

struct Inner {
    capacity: usize,
    events: VecDeque<ActivityEvent>,
}

/// Shared, bounded event buffer.
#[derive(Clone)]
pub struct ActivityLog {
    inner: Arc<Mutex<Inner>>,
}

impl std::fmt::Debug for ActivityLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("ActivityLog")
            .field("capacity", &inner.capacity)
            .field("events", &inner.events.len())
            .finish()
    }
}

impl Default for ActivityLog {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl ActivityLog {
    /// Create a log retaining at most `capacity` events (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: Arc::new(Mutex::new(Inner {
                capacity,
                events: VecDeque::with_capacity(capacity.min(4_096)),
            })),
        }
    }

    /// Record an event, evicting the oldest one if the buffer is full.
    pub fn record(&self, level: ActivityLevel, category: ActivityCategory, message: impl Into<String>) {
        let message = message.into();
        let cat = category.label();
        match level {
            ActivityLevel::Info | ActivityLevel::Success => {
                tracing::info!(category = cat, "{message}")
            }
            ActivityLevel::Warning => tracing::warn!(category = cat, "{message}"),
            ActivityLevel::Error => tracing::error!(category = cat, "{message}"),
            ActivityLevel::Debug => tracing::debug!(category = cat, "{message}"),
        }

        let event = ActivityEvent {
            timestamp: Local::now(),
            level,
            category,
            message,
        };
        let mut inner = self.inner.lock();
        if inner.events.len() >= inner.capacity {
            inner.events.pop_front();
        }
        inner.events.push_back(event);
    }

    pub fn info(&self, category: ActivityCategory, message: impl Into<String>) {
        self.record(ActivityLevel::Info, category, message);
    }

    pub fn success(&self, category: ActivityCategory, message: impl Into<String>) {
        self.record(ActivityLevel::Success, category, message);
    }

    pub fn warning(&self, category: ActivityCategory, message: impl Into<String>) {
        self.record(ActivityLevel::Warning, category, message);
    }

    pub fn error(&self, category: ActivityCategory, message: impl Into<String>) {
        self.record(ActivityLevel::Error, category, message);
    }

    pub fn debug(&self, category: ActivityCategory, message: impl Into<String>) {
        self.record(ActivityLevel::Debug, category, message);
    }

    /// Copy of all retained events, oldest first.
    pub fn events(&self) -> Vec<ActivityEvent> {
        self.inner.lock().events.iter().cloned().collect()
    }

    /// Retained events matching the given level and/or category.
    pub fn filtered(
        &self,
        level: Option<ActivityLevel>,
        category: Option<ActivityCategory>,
    ) -> Vec<ActivityEvent> {
        self.inner
            .lock()
            .events
            .iter()
            .filter(|e| level.is_none_or(|l| e.level == l))
            .filter(|e| category.is_none_or(|c| e.category == c))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.inner.lock().events.clear();
    }

    /// Write all retained events as CSV (`timestamp,level,category,message`).
    pub fn export_csv<W: Write>(&self, writer: W) -> csv::Result<()> {
        let mut w = csv::Writer::from_writer(writer);
        w.write_record(["timestamp", "level", "category", "message"])?;
        for e in self.events() {
            w.write_record([
                e.timestamp.to_rfc3339().as_str(),
                e.level.label(),
                e.category.label(),
                e.message.as_str(),
            ])?;
        }
        w.flush()?;
        Ok(())
    }

    /// Write all retained events, one formatted line each.
    pub fn export_text<W: Write>(&self, mut writer: W) -> std::io::Result<()> {
        for e in self.events() {
            writeln!(writer, "{e}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oldest_events_are_evicted_at_capacity() {
        let log = ActivityLog::new(3);
        for i in 0..5 {
            log.info(ActivityCategory::General, format!("event {i}"));
        }
        let events = log.events();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].message, "event 2");
        assert_eq!(events[2].message, "event 4");
    }

    #[test]
    fn clones_share_one_buffer() {
        let log = ActivityLog::new(10);
        let other = log.clone();
        other.warning(ActivityCategory::Scanning, "root missing");
        assert_eq!(log.len(), 1);
        log.clear();
        assert!(other.is_empty());
    }

    #[test]
    fn filter_by_level_and_category() {
        let log = ActivityLog::new(10);
        log.info(ActivityCategory::Scanning, "a");
        log.error(ActivityCategory::Deletion, "b");
        log.error(ActivityCategory::Scanning, "c");

        assert_eq!(log.filtered(Some(ActivityLevel::Error), None).len(), 2);
        assert_eq!(log.filtered(None, Some(ActivityCategory::Scanning)).len(), 2);
        let both = log.filtered(Some(ActivityLevel::Error), Some(ActivityCategory::Scanning));
        assert_eq!(both.len(), 1);
        assert_eq!(both[0].message, "c");
    }

    #[test]
    fn csv_export_quotes_messages() {
        let log = ActivityLog::new(10);
        log.success(ActivityCategory::System, "saved, 3 patterns");
        let mut buf = Vec::new();
        log.export_csv(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.starts_with("timestamp,level,category,message\n"));
        assert!(text.contains(",SUCCESS,system,\"saved, 3 patterns\""));
    }

    #[test]
    fn text_export_has_one_line_per_event() {
        let log = ActivityLog::new(10);
        log.debug(ActivityCategory::Ai, "fallback");
        log.info(ActivityCategory::General, "done");
        let mut buf = Vec::new();
        log.export_text(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text.lines().count(), 2);
        assert!(text.contains("DEBUG"));
    }
}
