use crate::http::HttpClient;
use crate::{RemoteError, SnapshotSource};
use kubedep_schema::profile::VERSION_PLACEHOLDER;
use kubedep_schema::{parse_snapshot_file, parse_snapshot_slice, Godeps, PlatformVersion};
use std::path::PathBuf;

/// Fetches Godeps.json from a URL template containing `{version}`.
pub struct HttpSource {
    url_template: String,
    client: HttpClient,
}

impl HttpSource {
    pub fn new(url_template: &str) -> Self {
        Self {
            url_template: url_template.to_owned(),
            client: HttpClient::new(),
        }
    }

    pub fn url(&self, version: &PlatformVersion) -> String {
        self.url_template
            .replace(VERSION_PLACEHOLDER, version.as_str())
    }
}

impl SnapshotSource for HttpSource {
    fn describe(&self) -> String {
        self.url_template.clone()
    }

    fn fetch(&self, version: &PlatformVersion) -> Result<Godeps, RemoteError> {
        let url = self.url(version);
        let body = self.client.get(&url)?;
        let godeps = parse_snapshot_slice(&body)?;
        tracing::info!(
            "fetched {} dependency records from {url}",
            godeps.deps.len()
        );
        Ok(godeps)
    }
}

/// Reads a local Godeps.json. The platform version is not consulted.
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SnapshotSource for FileSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn fetch(&self, _version: &PlatformVersion) -> Result<Godeps, RemoteError> {
        let godeps = parse_snapshot_file(&self.path)?;
        tracing::info!(
            "read {} dependency records from {}",
            godeps.deps.len(),
            self.path.display()
        );
        Ok(godeps)
    }
}
