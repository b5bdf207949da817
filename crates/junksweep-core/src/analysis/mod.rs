/// Analysis modules — grouping discovered entries into patterns and
/// answering questions about them.

pub mod ai;
pub mod classifier;
pub mod query;
pub mod rules;

pub use ai::{AiBackend, AiCapability, CandidatePattern};
pub use classifier::{Classification, ClassificationSource, PatternClassifier};
pub use rules::RuleSet;
