/// Data model: discovered entries, patterns and the persisted snapshot.
pub mod entry;
pub mod format;
pub mod pattern;
pub mod snapshot;

pub use entry::DiscoveredEntry;
pub use format::{describe_age, format_count, format_size};
pub use pattern::{Pattern, SafetyTier};
pub use snapshot::ScanSnapshot;
