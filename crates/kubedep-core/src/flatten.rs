use crate::deduce::{DeduceError, RootDeducer};
use kubedep_schema::{DependencyRecord, ImportPath, ProjectRoot, Revision};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Project root to the single revision chosen for it.
pub type FlattenedMap = BTreeMap<ProjectRoot, Revision>;

#[derive(Debug, Error)]
pub enum FlattenError {
    #[error("failed to deduce project root for '{import_path}': {source}")]
    RootDeduction {
        import_path: ImportPath,
        source: DeduceError,
    },
    #[error("conflicting revisions for project root '{root}': '{first}' and '{second}'")]
    ConflictingRevision {
        root: ProjectRoot,
        first: Revision,
        second: Revision,
    },
}

/// How to pick a revision when two records deduce to the same root with different revisions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictPolicy {
    /// Fail with [`FlattenError::ConflictingRevision`].
    #[default]
    Reject,
    /// Keep the revision of the first record in snapshot order.
    First,
    /// Keep the revision of the last record in snapshot order.
    Last,
    /// Keep the lexicographically greatest revision.
    Greatest,
}

impl ConflictPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Reject => "reject",
            Self::First => "first",
            Self::Last => "last",
            Self::Greatest => "greatest",
        }
    }
}

/// Collapse package-level records onto their project roots.
///
/// The deducer is consulted once per distinct import path, in snapshot order.
/// Any deduction failure aborts the whole call; no partial map is returned.
pub fn flatten<D: RootDeducer + ?Sized>(
    records: &[DependencyRecord],
    deducer: &D,
    policy: ConflictPolicy,
) -> Result<FlattenedMap, FlattenError> {
    let mut roots: HashMap<&ImportPath, ProjectRoot> = HashMap::new();
    let mut flat = FlattenedMap::new();

    for record in records {
        let root = match roots.get(&record.import_path) {
            Some(root) => root.clone(),
            None => {
                let root = deducer.deduce(&record.import_path).map_err(|source| {
                    FlattenError::RootDeduction {
                        import_path: record.import_path.clone(),
                        source,
                    }
                })?;
                debug!("{} -> {root}", record.import_path);
                roots.insert(&record.import_path, root.clone());
                root
            }
        };

        let Some(existing) = flat.get_mut(&root) else {
            flat.insert(root, record.rev.clone());
            continue;
        };
        if *existing == record.rev {
            continue;
        }
        let chosen = match policy {
            ConflictPolicy::Reject => {
                return Err(FlattenError::ConflictingRevision {
                    root,
                    first: existing.clone(),
                    second: record.rev.clone(),
                });
            }
            ConflictPolicy::First => existing.clone(),
            ConflictPolicy::Last => record.rev.clone(),
            ConflictPolicy::Greatest => existing.clone().max(record.rev.clone()),
        };
        warn!(
            "conflicting revisions for {root} ('{existing}' vs '{}'), keeping '{chosen}' ({} policy)",
            record.rev,
            policy.as_str()
        );
        *existing = chosen;
    }

    info!(
        "flattened {} dependency records into {} project roots",
        records.len(),
        flat.len()
    );
    Ok(flat)
}
