/// Path policy — which paths the scanner must never enter.
///
/// Pure prefix checks against a deny-list of system locations. No I/O:
/// a path that does not exist is simply not excluded.
use std::fmt;
use std::path::{Path, PathBuf};

/// System and application locations that are never scanned.
///
/// Matching is by whole path components, so `/System` excludes
/// `/System/Library` but not `/SystemBackups`.
pub const SYSTEM_PREFIXES: &[&str] = &[
    // macOS
    "/System",
    "/Applications",
    "/Library/Preferences",
    "/Library/Application Support",
    "/private/var/db",
    "/private/var/vm",
    // Unix
    "/bin",
    "/sbin",
    "/usr/bin",
    "/usr/sbin",
    "/usr/lib",
    "/usr/libexec",
    "/lib",
    "/lib64",
    "/boot",
    "/dev",
    "/proc",
    "/sys",
    "/etc",
    // Windows
    "C:\\Windows",
    "C:\\Program Files",
    "C:\\Program Files (x86)",
];

/// Home-relative locations that hold user preferences and app state.
pub const HOME_PREFIXES: &[&str] = &[
    "Library/Preferences",
    "Library/Application Support",
    "Library/Keychains",
    "Library/Mail",
    "Applications",
];

/// Deny-list of protected path prefixes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPolicy {
    denied: Vec<PathBuf>,
}

impl Default for PathPolicy {
    fn default() -> Self {
        Self::new(dirs::home_dir().as_deref(), &[])
    }
}

impl PathPolicy {
    /// Built-in prefixes, home-relative prefixes under `home`, plus `extra`.
    pub fn new(home: Option<&Path>, extra: &[PathBuf]) -> Self {
        let mut denied: Vec<PathBuf> = SYSTEM_PREFIXES.iter().map(PathBuf::from).collect();
        if let Some(home) = home {
            denied.extend(HOME_PREFIXES.iter().map(|p| home.join(p)));
        }
        denied.extend(extra.iter().cloned());
        Self { denied }
    }

    /// A policy with exactly the given prefixes.
    pub fn with_prefixes(denied: Vec<PathBuf>) -> Self {
        Self { denied }
    }

    /// `true` if `path` is, or lies beneath, a denied prefix.
    pub fn is_excluded(&self, path: &Path) -> bool {
        self.denied.iter().any(|prefix| path.starts_with(prefix))
    }
}

/// Expand a leading `~` to `home`.
pub fn expand_home(path: &Path, home: Option<&Path>) -> PathBuf {
    match (path.strip_prefix("~"), home) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}

/// A root [`resolve_roots`] left out, and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DroppedRoot {
    Excluded(PathBuf),
    /// Inside, or the same as, a root listed earlier or above it.
    Covered { root: PathBuf, by: PathBuf },
}

impl fmt::Display for DroppedRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Excluded(root) => write!(f, "{} is a protected location", root.display()),
            Self::Covered { root, by } if root == by => {
                write!(f, "{} is listed more than once", root.display())
            }
            Self::Covered { root, by } => {
                write!(f, "{} is already covered by {}", root.display(), by.display())
            }
        }
    }
}

/// Roots to scan plus the ones that were dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedRoots {
    pub roots: Vec<PathBuf>,
    pub dropped: Vec<DroppedRoot>,
}

/// Expand and validate configured roots.
///
/// Excluded roots and roots nested inside another root are dropped so the
/// same subtree is never walked twice. Order is otherwise preserved.
pub fn resolve_roots(roots: &[PathBuf], policy: &PathPolicy, home: Option<&Path>) -> ResolvedRoots {
    let mut resolved = ResolvedRoots::default();
    let mut expanded: Vec<PathBuf> = Vec::with_capacity(roots.len());
    for root in roots.iter().map(|r| expand_home(r, home)) {
        if policy.is_excluded(&root) {
            resolved.dropped.push(DroppedRoot::Excluded(root));
        } else {
            expanded.push(root);
        }
    }

    for (i, root) in expanded.iter().enumerate() {
        let covering = expanded
            .iter()
            .enumerate()
            .find(|&(j, other)| i != j && root.starts_with(other) && (root != other || j < i));
        match covering {
            Some((_, by)) => resolved.dropped.push(DroppedRoot::Covered {
                root: root.clone(),
                by: by.clone(),
            }),
            None => resolved.roots.push(root.clone()),
        }
    }
    resolved
}
