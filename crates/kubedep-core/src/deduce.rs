//! Project-root deduction: mapping a package import path to the root of the
//! project that contains it.
//!
//! The flattener only sees the [`RootDeducer`] trait. [`StaticDeducer`] knows
//! the layout of the common code hosts and needs no network; vanity import
//! paths are resolved by an HTTP-backed deducer in `kubedep-remote`, chained
//! behind it with [`ChainDeducer`].

use kubedep_schema::{ImportPath, ProjectRoot};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, PoisonError};
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DeduceError {
    #[error("no deduction rule matches '{0}'")]
    Unknown(String),
    #[error("invalid import path '{path}': {reason}")]
    Invalid { path: String, reason: String },
    #[error("root lookup for '{path}' failed: {reason}")]
    Lookup { path: String, reason: String },
}

/// Capability that maps an import path to its project root.
pub trait RootDeducer: Send + Sync {
    fn deduce(&self, import_path: &ImportPath) -> Result<ProjectRoot, DeduceError>;
}

/// Hosts whose roots sit a fixed number of segments below a known prefix.
const VANITY_PREFIXES: &[(&str, usize)] = &[
    ("golang.org/x", 1),
    ("k8s.io", 1),
    ("sigs.k8s.io", 1),
    ("google.golang.org", 1),
    ("go.uber.org", 1),
    ("go.etcd.io", 1),
    ("gonum.org/v1", 1),
    ("cloud.google.com/go", 0),
    ("go.opencensus.io", 0),
];

const VCS_SUFFIXES: &[&str] = &[".git", ".hg", ".bzr", ".svn"];

/// Rule-based deduction for well-known hosts. Never touches the network.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticDeducer;

impl StaticDeducer {
    pub fn new() -> Self {
        Self
    }

    fn deduce_path(self, path: &str) -> Result<ProjectRoot, DeduceError> {
        let segments = split_segments(path)?;

        // An explicit VCS suffix (`example.org/repo.git/pkg`) ends the root.
        if let Some(end) = segments.iter().skip(1).position(|s| has_vcs_suffix(s)) {
            return Ok(join_root(&segments[..end + 2]));
        }

        match segments[0] {
            "github.com" | "bitbucket.org" => {
                take_root(path, &segments, 3, "expected host/owner/repo")
            }
            "launchpad.net" => take_root(path, &segments, 2, "expected launchpad.net/project"),
            "gopkg.in" => deduce_gopkg_in(path, &segments),
            _ => deduce_vanity(path, &segments),
        }
    }
}

fn has_vcs_suffix(segment: &str) -> bool {
    VCS_SUFFIXES
        .iter()
        .any(|suffix| segment.len() > suffix.len() && segment.ends_with(suffix))
}

fn deduce_vanity(path: &str, segments: &[&str]) -> Result<ProjectRoot, DeduceError> {
    let best = VANITY_PREFIXES
        .iter()
        .filter(|(prefix, _)| ProjectRoot::new(*prefix).contains(path))
        .max_by_key(|(prefix, _)| prefix.len());
    match best {
        Some((prefix, depth)) => {
            let prefix_len = prefix.split('/').count();
            take_root(
                path,
                segments,
                prefix_len + depth,
                &format!("expected {depth} path segment(s) below {prefix}"),
            )
        }
        None => Err(DeduceError::Unknown(path.to_owned())),
    }
}

impl RootDeducer for StaticDeducer {
    fn deduce(&self, import_path: &ImportPath) -> Result<ProjectRoot, DeduceError> {
        self.deduce_path(import_path.as_str())
    }
}

fn split_segments(path: &str) -> Result<Vec<&str>, DeduceError> {
    let invalid = |reason: &str| DeduceError::Invalid {
        path: path.to_owned(),
        reason: reason.to_owned(),
    };
    if path.is_empty() {
        return Err(invalid("empty import path"));
    }
    if path.chars().any(char::is_whitespace) {
        return Err(invalid("contains whitespace"));
    }
    let segments: Vec<&str> = path.split('/').collect();
    if segments.iter().any(|s| s.is_empty()) {
        return Err(invalid("empty path segment"));
    }
    if segments.iter().any(|s| *s == "." || *s == "..") {
        return Err(invalid("relative path segment"));
    }
    Ok(segments)
}

fn join_root(segments: &[&str]) -> ProjectRoot {
    ProjectRoot::new(segments.join("/"))
}

fn take_root(
    path: &str,
    segments: &[&str],
    n: usize,
    reason: &str,
) -> Result<ProjectRoot, DeduceError> {
    if segments.len() < n {
        return Err(DeduceError::Invalid {
            path: path.to_owned(),
            reason: reason.to_owned(),
        });
    }
    Ok(join_root(&segments[..n]))
}

/// `pkg.v3` style gopkg.in segment.
fn is_gopkg_versioned(segment: &str) -> bool {
    segment
        .rsplit_once(".v")
        .is_some_and(|(name, major)| {
            !name.is_empty() && !major.is_empty() && major.chars().all(|c| c.is_ascii_digit())
        })
}

fn deduce_gopkg_in(path: &str, segments: &[&str]) -> Result<ProjectRoot, DeduceError> {
    match segments {
        [_, pkg, ..] if is_gopkg_versioned(pkg) => Ok(join_root(&segments[..2])),
        [_, _, pkg, ..] if is_gopkg_versioned(pkg) => Ok(join_root(&segments[..3])),
        _ => Err(DeduceError::Invalid {
            path: path.to_owned(),
            reason: "expected gopkg.in/pkg.vN or gopkg.in/user/pkg.vN".to_owned(),
        }),
    }
}

/// Fixed prefix-to-root table. The longest matching prefix wins.
#[derive(Debug, Clone, Default)]
pub struct TableDeducer {
    entries: BTreeMap<String, ProjectRoot>,
}

impl TableDeducer {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, prefix: &str, root: &str) -> Self {
        self.insert(prefix, root);
        self
    }

    pub fn insert(&mut self, prefix: &str, root: &str) {
        self.entries.insert(
            prefix.trim_end_matches('/').to_owned(),
            ProjectRoot::from(root),
        );
    }
}

impl<P: AsRef<str>, R: AsRef<str>> FromIterator<(P, R)> for TableDeducer {
    fn from_iter<T: IntoIterator<Item = (P, R)>>(iter: T) -> Self {
        let mut table = Self::new();
        for (prefix, root) in iter {
            table.insert(prefix.as_ref(), root.as_ref());
        }
        table
    }
}

impl RootDeducer for TableDeducer {
    fn deduce(&self, import_path: &ImportPath) -> Result<ProjectRoot, DeduceError> {
        self.entries
            .iter()
            .filter(|(prefix, _)| ProjectRoot::new(prefix.as_str()).contains(import_path))
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(_, root)| root.clone())
            .ok_or_else(|| DeduceError::Unknown(import_path.to_string()))
    }
}

/// Memoizes successful deductions of an inner deducer.
pub struct CachingDeducer<D> {
    inner: D,
    cache: Mutex<HashMap<ImportPath, ProjectRoot>>,
}

impl<D: RootDeducer> CachingDeducer<D> {
    pub fn new(inner: D) -> Self {
        Self {
            inner,
            cache: Mutex::new(HashMap::new()),
        }
    }
}

impl<D: RootDeducer> RootDeducer for CachingDeducer<D> {
    fn deduce(&self, import_path: &ImportPath) -> Result<ProjectRoot, DeduceError> {
        if let Some(root) = self
            .cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(import_path)
        {
            tracing::trace!("deduction cache hit for {import_path}");
            return Ok(root.clone());
        }
        let root = self.inner.deduce(import_path)?;
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(import_path.clone(), root.clone());
        Ok(root)
    }
}

/// Tries each deducer in turn; only [`DeduceError::Unknown`] falls through.
#[derive(Default)]
pub struct ChainDeducer {
    links: Vec<Box<dyn RootDeducer>>,
}

impl ChainDeducer {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn then(mut self, deducer: impl RootDeducer + 'static) -> Self {
        self.links.push(Box::new(deducer));
        self
    }
}

impl RootDeducer for ChainDeducer {
    fn deduce(&self, import_path: &ImportPath) -> Result<ProjectRoot, DeduceError> {
        for link in &self.links {
            match link.deduce(import_path) {
                Err(DeduceError::Unknown(_)) => {}
                other => return other,
            }
        }
        Err(DeduceError::Unknown(import_path.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn lookup(deducer: &impl RootDeducer, path: &str) -> Result<ProjectRoot, DeduceError> {
        deducer.deduce(&ImportPath::from(path))
    }

    fn deduce(path: &str) -> Result<ProjectRoot, DeduceError> {
        lookup(&StaticDeducer::new(), path)
    }

    #[test]
    fn github_roots_are_owner_repo() {
        assert_eq!(
            deduce("github.com/onsi/ginkgo").unwrap(),
            "github.com/onsi/ginkgo"
        );
        assert_eq!(
            deduce("github.com/onsi/ginkgo/reporters/stenographer").unwrap(),
            "github.com/onsi/ginkgo"
        );
        assert!(matches!(
            deduce("github.com/onsi"),
            Err(DeduceError::Invalid { .. })
        ));
    }

    #[test]
    fn bitbucket_and_launchpad() {
        assert_eq!(
            deduce("bitbucket.org/ww/goautoneg/sub").unwrap(),
            "bitbucket.org/ww/goautoneg"
        );
        assert_eq!(
            deduce("launchpad.net/gocheck/x").unwrap(),
            "launchpad.net/gocheck"
        );
    }

    #[test]
    fn kubernetes_vanity_paths() {
        assert_eq!(deduce("k8s.io/api/core/v1").unwrap(), "k8s.io/api");
        assert_eq!(deduce("k8s.io/api/extensions").unwrap(), "k8s.io/api");
        assert_eq!(
            deduce("k8s.io/apimachinery/pkg/util/sets").unwrap(),
            "k8s.io/apimachinery"
        );
        assert_eq!(deduce("sigs.k8s.io/yaml").unwrap(), "sigs.k8s.io/yaml");
        assert!(matches!(deduce("k8s.io"), Err(DeduceError::Invalid { .. })));
    }

    #[test]
    fn golang_org_and_google() {
        assert_eq!(
            deduce("golang.org/x/net/http2").unwrap(),
            "golang.org/x/net"
        );
        assert_eq!(
            deduce("google.golang.org/grpc/codes").unwrap(),
            "google.golang.org/grpc"
        );
        assert_eq!(
            deduce("cloud.google.com/go/compute/metadata").unwrap(),
            "cloud.google.com/go"
        );
        assert_eq!(
            deduce("gonum.org/v1/gonum/mat").unwrap(),
            "gonum.org/v1/gonum"
        );
    }

    #[test]
    fn gopkg_in_forms() {
        assert_eq!(deduce("gopkg.in/yaml.v2").unwrap(), "gopkg.in/yaml.v2");
        assert_eq!(
            deduce("gopkg.in/square/go-jose.v2/jwt").unwrap(),
            "gopkg.in/square/go-jose.v2"
        );
        assert_eq!(
            deduce("gopkg.in/fsnotify.v1").unwrap(),
            "gopkg.in/fsnotify.v1"
        );
        assert!(deduce("gopkg.in/yaml").is_err());
    }

    #[test]
    fn vcs_suffix_ends_root() {
        assert_eq!(
            deduce("example.org/code/repo.git/pkg/sub").unwrap(),
            "example.org/code/repo.git"
        );
        assert!(matches!(
            deduce("example.org/plain/pkg"),
            Err(DeduceError::Unknown(_))
        ));
    }

    #[test]
    fn rejects_malformed_paths() {
        for path in [
            "",
            "github.com//x/y",
            "github.com/a/../b",
            "github.com/a b/c",
            "/abs/path",
        ] {
            assert!(
                matches!(deduce(path), Err(DeduceError::Invalid { .. })),
                "{path:?} should be invalid"
            );
        }
    }

    #[test]
    fn table_prefers_longest_prefix() {
        let table: TableDeducer = [
            ("example.org/mono", "example.org/mono"),
            ("example.org/mono/split", "example.org/mono/split"),
        ]
        .into_iter()
        .collect();
        assert_eq!(
            lookup(&table, "example.org/mono/split/pkg").unwrap(),
            "example.org/mono/split"
        );
        assert_eq!(
            lookup(&table, "example.org/mono/other").unwrap(),
            "example.org/mono"
        );
        assert!(matches!(
            lookup(&table, "example.org/monolith"),
            Err(DeduceError::Unknown(_))
        ));
    }

    struct Counting {
        calls: AtomicUsize,
    }

    impl RootDeducer for &'static Counting {
        fn deduce(&self, import_path: &ImportPath) -> Result<ProjectRoot, DeduceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(ProjectRoot::new(import_path.as_str()))
        }
    }

    #[test]
    fn caching_deducer_calls_inner_once_per_path() {
        let counting: &'static Counting = Box::leak(Box::new(Counting {
            calls: AtomicUsize::new(0),
        }));
        let cached = CachingDeducer::new(counting);
        lookup(&cached, "example.org/a").unwrap();
        lookup(&cached, "example.org/a").unwrap();
        lookup(&cached, "example.org/b").unwrap();
        assert_eq!(counting.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn chain_falls_through_unknown_only() {
        let mut table = TableDeducer::new();
        table.insert("vanity.example/tool", "vanity.example/tool");
        let chain = ChainDeducer::new().then(StaticDeducer::new()).then(table);
        assert_eq!(
            lookup(&chain, "vanity.example/tool/pkg").unwrap(),
            "vanity.example/tool"
        );
        // Invalid from the first link is final.
        assert!(matches!(
            lookup(&chain, "github.com/onsi"),
            Err(DeduceError::Invalid { .. })
        ));
        assert!(matches!(
            lookup(&chain, "nowhere.example/x"),
            Err(DeduceError::Unknown(_))
        ));
    }
}
