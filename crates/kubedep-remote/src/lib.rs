//! Network-facing collaborators for kubedep.
//!
//! This crate fetches the Godeps.json snapshot for a platform release
//! (`HttpSource`, or `FileSource` for a local copy) and deduces project roots
//! of vanity import paths through the go-get protocol (`GoGetDeducer`).

pub mod goget;
pub mod http;
pub mod source;

pub use goget::{GoGetDeducer, GoImport, MetaParser};
pub use source::{FileSource, HttpSource};

use kubedep_schema::{Godeps, PlatformVersion};
use thiserror::Error;

/// Sent as `User-Agent` on every request.
pub const USER_AGENT: &str = concat!("kubedep/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("snapshot error: {0}")]
    Snapshot(#[from] kubedep_schema::SnapshotError),
    #[error("no go-import meta tag covers '{0}'")]
    NoGoImport(String),
    #[error("ambiguous go-import meta tags for '{path}': {prefixes}")]
    AmbiguousGoImport { path: String, prefixes: String },
}

/// Where the dependency snapshot for a release comes from.
pub trait SnapshotSource {
    /// Human-readable location, for diagnostics.
    fn describe(&self) -> String;

    fn fetch(&self, version: &PlatformVersion) -> Result<Godeps, RemoteError>;
}
