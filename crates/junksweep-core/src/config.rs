/// User configuration, read from a TOML file.
///
/// Every field has a default, so an empty or partial file is valid and a
/// missing file means "all defaults". Paths may start with `~`.
///
/// ```toml
/// roots = ["~/Projects", "~/Downloads"]
/// extensions = [".log", ".tmp"]
/// high_safety = ["vendor"]
/// walker_threads = 4
/// ```
use crate::analysis::ai::DEFAULT_AI_TIMEOUT;
use crate::analysis::rules::{COMMON_TEMP_PATTERNS, FILE_EXTENSIONS};
use crate::analysis::RuleSet;
use crate::error::ConfigError;
use crate::scanner::policy::{self, expand_home, PathPolicy, ResolvedRoots};
use crate::scanner::progressive::DEFAULT_INTERVAL;
use crate::scanner::{ScanOptions, ScanRequest, PROGRESS_CHANNEL_CAPACITY};
use crate::store::ScanStore;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Home-relative folders scanned by default, when they exist.
const DEFAULT_HOME_ROOTS: &[&str] = &["Downloads", "Desktop", "Documents", "Developer", "Projects"];

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directories to scan, in order.
    pub roots: Vec<PathBuf>,
    /// Name literals, in priority order.
    pub name_patterns: Vec<String>,
    /// File extensions, in priority order.
    pub extensions: Vec<String>,
    /// Extra group names rated High, on top of the built-in set.
    pub high_safety: Vec<String>,
    /// Extra group names rated Medium, on top of the built-in set.
    pub medium_safety: Vec<String>,
    /// Extra locations the scanner must never enter.
    pub extra_excluded_prefixes: Vec<PathBuf>,
    pub snapshot_path: Option<PathBuf>,
    /// Move removed items into this directory instead of the system trash.
    pub trash_dir: Option<PathBuf>,
    pub progressive_interval_ms: u64,
    pub ai_timeout_ms: u64,
    pub walker_threads: usize,
    pub activity_log_capacity: usize,
    pub collapse_nested: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            roots: default_roots(dirs::home_dir().as_deref()),
            name_patterns: COMMON_TEMP_PATTERNS.iter().map(|s| s.to_string()).collect(),
            extensions: FILE_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
            high_safety: Vec::new(),
            medium_safety: Vec::new(),
            extra_excluded_prefixes: Vec::new(),
            snapshot_path: None,
            trash_dir: None,
            progressive_interval_ms: DEFAULT_INTERVAL.as_millis() as u64,
            ai_timeout_ms: DEFAULT_AI_TIMEOUT.as_millis() as u64,
            walker_threads: num_cpus::get(),
            activity_log_capacity: crate::activity::DEFAULT_CAPACITY,
            collapse_nested: true,
        }
    }
}

/// The default home folders plus the user cache directory, keeping only
/// those that exist.
fn default_roots(home: Option<&Path>) -> Vec<PathBuf> {
    let mut roots: Vec<PathBuf> = home
        .map(|h| DEFAULT_HOME_ROOTS.iter().map(|d| h.join(d)).collect())
        .unwrap_or_default();
    roots.extend(dirs::cache_dir());
    roots.retain(|r| r.is_dir());
    roots
}

impl Config {
    /// Parse the file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text, path)
    }

    /// Load `path`, or [`default_path`](Self::default_path) when `None`.
    /// A file that does not exist yields the defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path.map(Path::to_path_buf).or_else(Self::default_path) {
            Some(p) => p,
            None => return Ok(Self::default()),
        };
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load(&path)
    }

    fn parse(text: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// `<config_dir>/junksweep/config.toml`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("junksweep").join("config.toml"))
    }

    /// Grouping tables built from the configured literals and extensions.
    pub fn rule_set(&self) -> RuleSet {
        RuleSet::with_tables(
            self.name_patterns.clone(),
            self.extensions.clone(),
            &self.high_safety,
            &self.medium_safety,
        )
    }

    pub fn path_policy(&self) -> PathPolicy {
        let home = dirs::home_dir();
        let extra: Vec<PathBuf> = self
            .extra_excluded_prefixes
            .iter()
            .map(|p| expand_home(p, home.as_deref()))
            .collect();
        PathPolicy::new(home.as_deref(), &extra)
    }

    /// `roots`, or the configured roots when empty, with `~` expanded.
    /// Excluded, nested and repeated roots are reported in `dropped`.
    pub fn resolve_roots(&self, roots: &[PathBuf]) -> ResolvedRoots {
        let roots = if roots.is_empty() { &self.roots[..] } else { roots };
        policy::resolve_roots(roots, &self.path_policy(), dirs::home_dir().as_deref())
    }

    /// Scan request for already resolved `roots`. Directory literals become
    /// whole-name directory criteria; other literals match by containment.
    pub fn scan_request(&self, roots: Vec<PathBuf>) -> ScanRequest {
        let rules = self.rule_set();
        let (directory_names, name_patterns): (Vec<String>, Vec<String>) = self
            .name_patterns
            .iter()
            .cloned()
            .partition(|n| rules.is_directory_literal(n));
        ScanRequest {
            roots,
            directory_names,
            name_patterns,
            extensions: self.extensions.clone(),
        }
    }

    pub fn scan_options(&self) -> ScanOptions {
        ScanOptions {
            walker_threads: self.walker_threads.max(1),
            walk_parallelism: 1,
            progress_capacity: PROGRESS_CHANNEL_CAPACITY,
            collapse_nested: self.collapse_nested,
        }
    }

    /// Where the snapshot lives.
    pub fn snapshot_location(&self) -> Option<PathBuf> {
        match &self.snapshot_path {
            Some(p) => Some(expand_home(p, dirs::home_dir().as_deref())),
            None => ScanStore::default_location(),
        }
    }

    /// Directory trashed items are moved into, when one is configured.
    /// `None` means the system trash.
    pub fn trash_location(&self) -> Option<PathBuf> {
        self.trash_dir
            .as_ref()
            .map(|p| expand_home(p, dirs::home_dir().as_deref()))
    }

    pub fn progressive_interval(&self) -> Duration {
        Duration::from_millis(self.progressive_interval_ms.max(1))
    }

    pub fn ai_timeout(&self) -> Duration {
        Duration::from_millis(self.ai_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SafetyTier;
    use tempfile::TempDir;

    #[test]
    fn empty_document_is_all_defaults() {
        let cfg = Config::parse("", Path::new("x.toml")).unwrap();
        let def = Config::default();
        assert_eq!(cfg.name_patterns, def.name_patterns);
        assert_eq!(cfg.progressive_interval_ms, 2_000);
        assert_eq!(cfg.ai_timeout_ms, 10_000);
        assert_eq!(cfg.activity_log_capacity, 1_000);
        assert!(cfg.collapse_nested);
        assert_eq!(cfg.name_patterns[0], "node_modules");
    }

    #[test]
    fn partial_document_overrides_only_named_fields() {
        let cfg = Config::parse(
            r#"
                roots = ["/srv/work"]
                extensions = ["log"]
                high_safety = ["vendor"]
                walker_threads = 3
                collapse_nested = false
            "#,
            Path::new("x.toml"),
        )
        .unwrap();
        assert_eq!(cfg.roots, vec![PathBuf::from("/srv/work")]);
        assert_eq!(cfg.walker_threads, 3);
        assert!(!cfg.collapse_nested);
        assert_eq!(cfg.name_patterns.len(), COMMON_TEMP_PATTERNS.len());

        let rules = cfg.rule_set();
        assert_eq!(rules.extensions, vec![".log".to_string()]);
        assert_eq!(rules.tier_for("vendor"), SafetyTier::High);
        assert_eq!(rules.tier_for("node_modules"), SafetyTier::High);
    }

    #[test]
    fn invalid_document_is_a_parse_error() {
        let err = Config::parse("walker_threads = \"many\"", Path::new("bad.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("bad.toml"));
    }

    #[test]
    fn missing_file_gives_defaults_but_unreadable_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let missing = tmp.path().join("none.toml");
        let cfg = Config::load_or_default(Some(missing.as_path())).unwrap();
        assert_eq!(cfg.extensions, Config::default().extensions);

        assert!(matches!(
            Config::load(&missing),
            Err(ConfigError::Io { .. })
        ));
    }

    #[test]
    fn load_reads_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        fs::write(&path, "ai_timeout_ms = 250\n").unwrap();
        let cfg = Config::load_or_default(Some(path.as_path())).unwrap();
        assert_eq!(cfg.ai_timeout(), Duration::from_millis(250));
    }

    #[test]
    fn excluded_and_nested_roots_are_dropped() {
        let cfg = Config {
            roots: vec![
                PathBuf::from("/srv/work"),
                PathBuf::from("/srv/work/app"),
                PathBuf::from("/usr/lib"),
                PathBuf::from("/srv/scratch"),
            ],
            extra_excluded_prefixes: vec![PathBuf::from("/srv/scratch")],
            ..Config::default()
        };
        let resolved = cfg.resolve_roots(&[]);
        assert_eq!(resolved.roots, vec![PathBuf::from("/srv/work")]);
        assert_eq!(resolved.dropped.len(), 3);

        let explicit = cfg.resolve_roots(&[PathBuf::from("/tmp/other")]);
        assert_eq!(explicit.roots, vec![PathBuf::from("/tmp/other")]);
        assert!(explicit.dropped.is_empty());
    }

    #[test]
    fn scan_request_splits_directory_literals_from_name_literals() {
        let cfg = Config {
            name_patterns: vec!["node_modules".into(), ".DS_Store".into(), "vendor".into()],
            high_safety: vec!["vendor".into()],
            ..Config::default()
        };
        let req = cfg.scan_request(vec![PathBuf::from("/srv/work")]);
        assert_eq!(req.roots, vec![PathBuf::from("/srv/work")]);
        assert_eq!(req.directory_names, vec!["node_modules".to_string(), "vendor".to_string()]);
        assert_eq!(req.name_patterns, vec![".DS_Store".to_string()]);
        assert_eq!(req.extensions, cfg.extensions);
    }

    #[test]
    fn explicit_paths_win_over_platform_defaults() {
        let cfg = Config {
            snapshot_path: Some(PathBuf::from("/data/snap.json")),
            trash_dir: Some(PathBuf::from("/data/trash")),
            ..Config::default()
        };
        assert_eq!(cfg.snapshot_location(), Some(PathBuf::from("/data/snap.json")));
        assert_eq!(cfg.trash_location(), Some(PathBuf::from("/data/trash")));
        assert_eq!(Config::default().trash_location(), None);
    }
}
