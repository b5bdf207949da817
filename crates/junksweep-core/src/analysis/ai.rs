/// Optional external classification / question-answering capability.
///
/// Whether an external backend exists is decided once at startup and
/// captured in [`AiCapability`]. Call sites branch on the variant; nothing
/// probes for a backend at runtime. Every call goes through
/// [`call_with_timeout`] so a slow or hung backend cannot stall a scan.
use crate::error::ClassifierError;
use crate::model::{DiscoveredEntry, SafetyTier};
use crossbeam_channel::RecvTimeoutError;
use serde::Deserialize;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Default bound on a single external call.
pub const DEFAULT_AI_TIMEOUT: Duration = Duration::from_secs(10);

/// One group proposed by an external classifier.
///
/// Untrusted until it passes validation in the classifier.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CandidatePattern {
    #[serde(rename = "patternName")]
    pub name: String,
    pub paths: Vec<String>,
    #[serde(default, rename = "safetyScore")]
    pub safety: Option<SafetyTier>,
    #[serde(default)]
    pub reason: Option<String>,
}

/// An external text-generation backend.
pub trait AiBackend: Send + Sync {
    /// Short name used in log messages.
    fn name(&self) -> &str;

    /// Propose a grouping for `entries`.
    fn classify(&self, entries: &[DiscoveredEntry]) -> Result<Vec<CandidatePattern>, ClassifierError>;

    /// Answer `question` given a plain-text summary of the current patterns.
    fn answer(&self, question: &str, context: &str) -> Result<String, ClassifierError>;
}

/// Whether an external backend is available, resolved once.
#[derive(Clone, Default)]
pub enum AiCapability {
    #[default]
    Unavailable,
    Available(Arc<dyn AiBackend>),
}

impl AiCapability {
    /// Wrap an optional backend.
    pub fn resolve(backend: Option<Arc<dyn AiBackend>>) -> Self {
        match backend {
            Some(b) => Self::Available(b),
            None => Self::Unavailable,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available(_))
    }

    /// Backend name for log messages.
    pub fn describe(&self) -> &str {
        match self {
            Self::Available(b) => b.name(),
            Self::Unavailable => "unavailable",
        }
    }
}

impl std::fmt::Debug for AiCapability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unavailable => f.write_str("Unavailable"),
            Self::Available(b) => write!(f, "Available({})", b.name()),
        }
    }
}

/// Run `call` on a helper thread and wait at most `timeout` for it.
///
/// On timeout the helper thread is abandoned; its result is dropped when
/// it eventually finishes.
pub fn call_with_timeout<T, F>(timeout: Duration, call: F) -> Result<T, ClassifierError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, ClassifierError> + Send + 'static,
{
    let (tx, rx) = crossbeam_channel::bounded(1);
    thread::Builder::new()
        .name("junksweep-ai".into())
        .spawn(move || {
            let _ = tx.send(call());
        })
        .map_err(|e| ClassifierError::Backend(format!("failed to spawn backend thread: {e}")))?;

    match rx.recv_timeout(timeout) {
        Ok(result) => result,
        Err(RecvTimeoutError::Timeout) => Err(ClassifierError::Timeout(timeout)),
        Err(RecvTimeoutError::Disconnected) => Err(ClassifierError::Backend(
            "backend thread exited without a result".into(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fast_call_returns_its_result() {
        let r = call_with_timeout(Duration::from_secs(5), || Ok(7));
        assert_eq!(r.unwrap(), 7);
    }

    #[test]
    fn slow_call_times_out() {
        let r: Result<(), _> = call_with_timeout(Duration::from_millis(20), || {
            thread::sleep(Duration::from_millis(500));
            Ok(())
        });
        assert!(matches!(r, Err(ClassifierError::Timeout(_))));
    }

    #[test]
    fn panicking_call_is_reported_as_backend_error() {
        let r: Result<(), _> =
            call_with_timeout(Duration::from_secs(5), || panic!("backend blew up"));
        assert!(matches!(r, Err(ClassifierError::Backend(_))));
    }

    #[test]
    fn candidate_parses_from_snapshot_style_json() {
        let json = r#"[{"patternName":"Xcode builds","paths":["/a"],"safetyScore":"High"}]"#;
        let c: Vec<CandidatePattern> = serde_json::from_str(json).unwrap();
        assert_eq!(c[0].name, "Xcode builds");
        assert_eq!(c[0].safety, Some(SafetyTier::High));
        assert_eq!(c[0].reason, None);
    }

    #[test]
    fn capability_defaults_to_unavailable() {
        let cap = AiCapability::default();
        assert!(!cap.is_available());
        assert_eq!(cap.describe(), "unavailable");
    }
}
