use crate::types::{ProjectRoot, Revision};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("manifest serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("manifest JSON serialize error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("manifest parse error: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Pinned revision, plus an alternate fetch location, recorded for one project root.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Constraint {
    pub revision: Revision,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl Constraint {
    pub fn pinned(revision: impl Into<Revision>) -> Self {
        Self {
            revision: revision.into(),
            source: None,
        }
    }

    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

/// Final constraints keyed by project root. Ordered, so serialization is stable.
pub type ConstraintSet = BTreeMap<ProjectRoot, Constraint>;

/// The umbrella project constraint: the platform itself at its release tag.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RootConstraint {
    pub project: ProjectRoot,
    pub revision: Revision,
}

/// A dep manifest (`Gopkg.toml`) ready to be written out.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Manifest {
    pub ignored: Vec<String>,
    pub constraint: RootConstraint,
    pub overrides: ConstraintSet,
}

/// On-disk layout of `Gopkg.toml`: `[[constraint]]` and `[[override]]` tables.
#[derive(Debug, Default, Serialize, Deserialize)]
struct RawManifest {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    ignored: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    constraint: Vec<RawProject>,
    #[serde(default, rename = "override", skip_serializing_if = "Vec::is_empty")]
    overrides: Vec<RawProject>,
}

#[derive(Debug, Serialize, Deserialize)]
struct RawProject {
    name: ProjectRoot,
    revision: Revision,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    source: Option<String>,
}

impl Manifest {
    /// Assemble a manifest. No rewriting happens here: `overrides` is taken as-is.
    pub fn assemble(
        ignored: &[String],
        constraint: RootConstraint,
        overrides: ConstraintSet,
    ) -> Self {
        Self {
            ignored: ignored.to_vec(),
            constraint,
            overrides,
        }
    }

    fn to_raw(&self) -> RawManifest {
        RawManifest {
            ignored: self.ignored.clone(),
            constraint: vec![RawProject {
                name: self.constraint.project.clone(),
                revision: self.constraint.revision.clone(),
                source: None,
            }],
            overrides: self
                .overrides
                .iter()
                .map(|(root, c)| RawProject {
                    name: root.clone(),
                    revision: c.revision.clone(),
                    source: c.source.clone(),
                })
                .collect(),
        }
    }

    /// Serialize in dep's `Gopkg.toml` layout. Override entries come out sorted by name.
    pub fn to_toml(&self) -> Result<String, ManifestError> {
        Ok(toml::to_string_pretty(&self.to_raw())?)
    }

    pub fn to_json(&self) -> Result<String, ManifestError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Read back a `Gopkg.toml` written by [`Manifest::to_toml`].
    ///
    /// The first `[[constraint]]` is taken as the umbrella constraint.
    pub fn from_toml(input: &str) -> Result<Self, ManifestError> {
        let raw: RawManifest = toml::from_str(input)?;
        let constraint = raw
            .constraint
            .into_iter()
            .next()
            .map(|p| RootConstraint {
                project: p.name,
                revision: p.revision,
            })
            .ok_or_else(|| {
                <toml::de::Error as serde::de::Error>::custom("missing [[constraint]] table")
            })?;
        let overrides = raw
            .overrides
            .into_iter()
            .map(|p| {
                (
                    p.name,
                    Constraint {
                        revision: p.revision,
                        source: p.source,
                    },
                )
            })
            .collect();
        Ok(Self {
            ignored: raw.ignored,
            constraint,
            overrides,
        })
    }
}
