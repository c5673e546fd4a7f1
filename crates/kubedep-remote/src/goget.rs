//! Project-root deduction through the `?go-get=1` protocol.
//!
//! Vanity import paths publish their repository through a
//! `<meta name="go-import" content="prefix vcs repo-url">` tag on an HTML page
//! served at `https://<import path>?go-get=1`. The advertised prefix is the
//! project root.

use crate::http::HttpClient;
use crate::RemoteError;
use kubedep_core::{DeduceError, RootDeducer};
use kubedep_schema::{ImportPath, ProjectRoot};
use regex::Regex;

/// One parsed `go-import` meta tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoImport {
    pub prefix: String,
    pub vcs: String,
    pub repo: String,
}

/// Extracts `go-import` meta tags from an HTML document.
pub struct MetaParser {
    meta: Regex,
    name: Regex,
    content: Regex,
}

impl Default for MetaParser {
    fn default() -> Self {
        Self::new()
    }
}

impl MetaParser {
    pub fn new() -> Self {
        Self {
            meta: Regex::new(r"(?is)<meta\s[^>]*>").expect("valid meta pattern"),
            name: Regex::new(r#"(?i)\bname\s*=\s*["']go-import["']"#).expect("valid name pattern"),
            content: Regex::new(r#"(?i)\bcontent\s*=\s*["']([^"']*)["']"#)
                .expect("valid content pattern"),
        }
    }

    pub fn parse(&self, html: &str) -> Vec<GoImport> {
        self.meta
            .find_iter(html)
            .map(|m| m.as_str())
            .filter(|tag| self.name.is_match(tag))
            .filter_map(|tag| self.content.captures(tag))
            .filter_map(|caps| {
                let mut fields = caps[1].split_whitespace();
                match (fields.next(), fields.next(), fields.next(), fields.next()) {
                    (Some(prefix), Some(vcs), Some(repo), None) => Some(GoImport {
                        prefix: prefix.to_owned(),
                        vcs: vcs.to_owned(),
                        repo: repo.to_owned(),
                    }),
                    _ => None,
                }
            })
            .collect()
    }
}

/// Pick the single go-import entry whose prefix contains `path`.
///
/// `mod` entries (module proxies) are ignored.
pub fn select_root(path: &str, imports: &[GoImport]) -> Result<ProjectRoot, RemoteError> {
    let mut matching: Vec<&GoImport> = imports
        .iter()
        .filter(|i| i.vcs != "mod")
        .filter(|i| ProjectRoot::new(i.prefix.as_str()).contains(path))
        .collect();
    matching.dedup_by(|a, b| a.prefix == b.prefix);
    match matching.as_slice() {
        [] => Err(RemoteError::NoGoImport(path.to_owned())),
        [only] => Ok(ProjectRoot::new(only.prefix.as_str())),
        many => Err(RemoteError::AmbiguousGoImport {
            path: path.to_owned(),
            prefixes: many
                .iter()
                .map(|i| i.prefix.as_str())
                .collect::<Vec<_>>()
                .join(", "),
        }),
    }
}

/// Deduces roots of vanity import paths by fetching their go-get page.
pub struct GoGetDeducer {
    client: HttpClient,
    parser: MetaParser,
    endpoint: Option<String>,
}

impl Default for GoGetDeducer {
    fn default() -> Self {
        Self::new()
    }
}

impl GoGetDeducer {
    pub fn new() -> Self {
        Self {
            client: HttpClient::new(),
            parser: MetaParser::new(),
            endpoint: None,
        }
    }

    /// Serve every lookup from `{endpoint}/<import path>?go-get=1` instead of
    /// `https://<import path>?go-get=1`.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = Some(endpoint.trim_end_matches('/').to_owned());
        self
    }

    fn url_for(&self, path: &str) -> String {
        match &self.endpoint {
            Some(endpoint) => format!("{endpoint}/{path}?go-get=1"),
            None => format!("https://{path}?go-get=1"),
        }
    }

    pub fn lookup(&self, path: &str) -> Result<ProjectRoot, RemoteError> {
        let body = self.client.get(&self.url_for(path))?;
        let html = String::from_utf8_lossy(&body);
        let imports = self.parser.parse(&html);
        tracing::trace!("{path}: {} go-import tags", imports.len());
        select_root(path, &imports)
    }
}

impl RootDeducer for GoGetDeducer {
    fn deduce(&self, import_path: &ImportPath) -> Result<ProjectRoot, DeduceError> {
        let root = self
            .lookup(import_path.as_str())
            .map_err(|e| DeduceError::Lookup {
                path: import_path.to_string(),
                reason: e.to_string(),
            })?;
        tracing::debug!("go-get: {import_path} -> {root}");
        Ok(root)
    }
}
