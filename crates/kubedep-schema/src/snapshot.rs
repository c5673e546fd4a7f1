use crate::types::{ImportPath, Revision};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("failed to read snapshot file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to decode snapshot: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("snapshot dependency #{index} has an empty import path")]
    EmptyImportPath { index: usize },
    #[error("snapshot dependency '{import_path}' has an empty revision")]
    EmptyRevision { import_path: String },
}

/// A Godeps.json document as published in a Kubernetes release tree.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct Godeps {
    #[serde(default)]
    pub import_path: String,
    #[serde(default)]
    pub go_version: String,
    #[serde(default)]
    pub godep_version: String,
    #[serde(default)]
    pub packages: Vec<String>,
    #[serde(default)]
    pub deps: Vec<DependencyRecord>,
}

/// One package-level entry of the snapshot: an import path pinned to a revision.
///
/// Import paths are not unique per project: `k8s.io/api/core/v1` and
/// `k8s.io/api/extensions` appear as separate records.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct DependencyRecord {
    pub import_path: ImportPath,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub rev: Revision,
}

impl DependencyRecord {
    pub fn new(import_path: impl Into<String>, rev: impl Into<String>) -> Self {
        Self {
            import_path: ImportPath::new(import_path),
            comment: None,
            rev: Revision::new(rev),
        }
    }
}

impl Godeps {
    /// Reject records that could never be flattened meaningfully.
    pub fn validate(&self) -> Result<(), SnapshotError> {
        for (index, dep) in self.deps.iter().enumerate() {
            if dep.import_path.trim().is_empty() {
                return Err(SnapshotError::EmptyImportPath { index });
            }
            if dep.rev.trim().is_empty() {
                return Err(SnapshotError::EmptyRevision {
                    import_path: dep.import_path.to_string(),
                });
            }
        }
        Ok(())
    }
}

pub fn parse_snapshot_slice(input: &[u8]) -> Result<Godeps, SnapshotError> {
    let godeps: Godeps = serde_json::from_slice(input)?;
    godeps.validate()?;
    Ok(godeps)
}

pub fn parse_snapshot_str(input: &str) -> Result<Godeps, SnapshotError> {
    parse_snapshot_slice(input.as_bytes())
}

pub fn parse_snapshot_file(path: impl AsRef<Path>) -> Result<Godeps, SnapshotError> {
    let content = fs::read(path)?;
    parse_snapshot_slice(&content)
}
