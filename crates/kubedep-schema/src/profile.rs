//! Conversion profiles: the hand-maintained tables that drive a conversion.
//!
//! A profile names where the snapshot for a release lives, which import
//! patterns dep should ignore, the umbrella project constraint, the family of
//! sibling projects pinned in lock-step with the platform, and override rules
//! for known upstream defects. The Kubernetes profile is built in.

use crate::manifest::RootConstraint;
use crate::types::{ProjectRoot, Revision};
use crate::version::PlatformVersion;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Placeholder substituted with the bare platform version in `snapshot_url`.
pub const VERSION_PLACEHOLDER: &str = "{version}";

pub const BUILTIN_PROFILE: &str = r#"profile_version = 1
snapshot_url = "https://raw.githubusercontent.com/kubernetes/kubernetes/v{version}/Godeps/Godeps.json"
ignored = ["github.com/docker/kube-e2e-image/*"]

[umbrella]
project = "k8s.io/kubernetes"
revision_prefix = "v"

[family]
prefix = "k8s.io"
tag = "kubernetes"
projects = [
    "apiextensions-apiserver",
    "apimachinery",
    "client-go",
    "api",
    "apiserver",
    "metrics",
]

[[override]]
root = "github.com/onsi/ginkgo"
revision = "8a7f310861b2f59f13b339dc506cd8d8c28b147c"
source = "https://github.com/jcsirot/ginkgo.git"

# dep cannot fetch fsnotify under its github path (golang/dep#1799)
[[override]]
root = "github.com/fsnotify/fsnotify"
rename = "gopkg.in/fsnotify.v1"
source = "https://github.com/fsnotify/fsnotify.git"
"#;

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("failed to read profile file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse profile: {0}")]
    ParseToml(#[from] toml::de::Error),
    #[error("unsupported profile_version: {0}, expected 1")]
    UnsupportedVersion(u32),
    #[error("snapshot_url must contain the {{version}} placeholder: '{0}'")]
    SnapshotUrlTemplate(String),
    #[error("umbrella.project must not be empty")]
    EmptyUmbrella,
    #[error("family.{0} must not be empty when family projects are listed")]
    EmptyFamilyField(&'static str),
    #[error("family project #{0} has an empty name")]
    EmptyFamilyProject(usize),
    #[error("override rule #{0} has an empty root")]
    EmptyOverrideRoot(usize),
    #[error("override rule for '{0}' changes nothing (set revision, source or rename)")]
    NoopOverride(String),
    #[error("duplicate override rule for '{0}'")]
    DuplicateOverride(String),
    #[error("override rules for '{first}' and '{second}' both rename to '{target}'")]
    DuplicateRenameTarget {
        first: String,
        second: String,
        target: String,
    },
    #[error("override rule for '{renamed}' renames to '{target}', which has its own override rule")]
    RenameOntoOverride { renamed: String, target: String },
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Profile {
    pub profile_version: u32,
    pub snapshot_url: String,
    #[serde(default)]
    pub ignored: Vec<String>,
    pub umbrella: UmbrellaSection,
    #[serde(default)]
    pub family: FamilySection,
    #[serde(default, rename = "override")]
    pub overrides: Vec<OverrideRule>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct UmbrellaSection {
    pub project: ProjectRoot,
    #[serde(default = "default_revision_prefix")]
    pub revision_prefix: String,
}

/// Sibling projects versioned in lock-step with the platform.
///
/// Each entry in `projects` is a name fragment: the root is
/// `<prefix>/<fragment>` and the pin is `<tag>-<platform version>`.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct FamilySection {
    #[serde(default)]
    pub prefix: String,
    #[serde(default)]
    pub tag: String,
    #[serde(default)]
    pub projects: Vec<String>,
}

/// Hand-maintained exception for one project root.
///
/// With `revision` set the rule fully replaces the snapshot revision; without
/// it the snapshot revision is kept. `rename` records the constraint under a
/// different root.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct OverrideRule {
    pub root: ProjectRoot,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<Revision>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rename: Option<ProjectRoot>,
}

fn default_revision_prefix() -> String {
    "v".to_owned()
}

impl OverrideRule {
    pub fn new(root: impl Into<ProjectRoot>) -> Self {
        Self {
            root: root.into(),
            revision: None,
            source: None,
            rename: None,
        }
    }

    #[must_use]
    pub fn with_revision(mut self, revision: impl Into<Revision>) -> Self {
        self.revision = Some(revision.into());
        self
    }

    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    #[must_use]
    pub fn with_rename(mut self, target: impl Into<ProjectRoot>) -> Self {
        self.rename = Some(target.into());
        self
    }

    /// Root the rewritten constraint is recorded under.
    pub fn target_root(&self) -> &ProjectRoot {
        self.rename.as_ref().unwrap_or(&self.root)
    }
}

impl FamilySection {
    pub fn new(prefix: &str, tag: &str, projects: &[&str]) -> Self {
        Self {
            prefix: prefix.to_owned(),
            tag: tag.to_owned(),
            projects: projects.iter().map(|p| (*p).to_owned()).collect(),
        }
    }

    pub fn roots(&self) -> Vec<ProjectRoot> {
        let prefix = self.prefix.trim_end_matches('/');
        self.projects
            .iter()
            .map(|p| ProjectRoot::new(format!("{prefix}/{}", p.trim_matches('/'))))
            .collect()
    }

    pub fn revision(&self, version: &PlatformVersion) -> Revision {
        Revision::new(format!("{}-{version}", self.tag))
    }

    fn validate(&self) -> Result<(), ProfileError> {
        if self.projects.is_empty() {
            return Ok(());
        }
        if self.prefix.trim().is_empty() {
            return Err(ProfileError::EmptyFamilyField("prefix"));
        }
        if self.tag.trim().is_empty() {
            return Err(ProfileError::EmptyFamilyField("tag"));
        }
        if let Some(index) = self
            .projects
            .iter()
            .position(|p| p.trim_matches('/').trim().is_empty())
        {
            return Err(ProfileError::EmptyFamilyProject(index));
        }
        Ok(())
    }
}

impl Profile {
    /// The built-in Kubernetes profile.
    pub fn builtin() -> Result<Self, ProfileError> {
        parse_profile_str(BUILTIN_PROFILE)
    }

    pub fn validate(&self) -> Result<(), ProfileError> {
        if self.profile_version != 1 {
            return Err(ProfileError::UnsupportedVersion(self.profile_version));
        }
        if !self.snapshot_url.contains(VERSION_PLACEHOLDER) {
            return Err(ProfileError::SnapshotUrlTemplate(self.snapshot_url.clone()));
        }
        if self.umbrella.project.trim().is_empty() {
            return Err(ProfileError::EmptyUmbrella);
        }
        self.family.validate()?;

        let mut roots = BTreeSet::new();
        let mut targets: Vec<(&ProjectRoot, &ProjectRoot)> = Vec::new();
        for (index, rule) in self.overrides.iter().enumerate() {
            if rule.root.trim().is_empty() {
                return Err(ProfileError::EmptyOverrideRoot(index));
            }
            if rule.revision.is_none() && rule.source.is_none() && rule.rename.is_none() {
                return Err(ProfileError::NoopOverride(rule.root.to_string()));
            }
            if !roots.insert(&rule.root) {
                return Err(ProfileError::DuplicateOverride(rule.root.to_string()));
            }
            if let Some(target) = &rule.rename {
                if let Some((first, _)) = targets.iter().find(|(_, t)| *t == target) {
                    return Err(ProfileError::DuplicateRenameTarget {
                        first: first.to_string(),
                        second: rule.root.to_string(),
                        target: target.to_string(),
                    });
                }
                targets.push((&rule.root, target));
            }
        }
        // A rename may not land on a root that another rule rewrites.
        for (renamed, target) in targets {
            if target != renamed && roots.contains(target) {
                return Err(ProfileError::RenameOntoOverride {
                    renamed: renamed.to_string(),
                    target: target.to_string(),
                });
            }
        }
        Ok(())
    }

    pub fn umbrella_constraint(&self, version: &PlatformVersion) -> RootConstraint {
        RootConstraint {
            project: self.umbrella.project.clone(),
            revision: Revision::new(format!("{}{version}", self.umbrella.revision_prefix)),
        }
    }
}

pub fn parse_profile_str(input: &str) -> Result<Profile, ProfileError> {
    let profile: Profile = toml::from_str(input)?;
    profile.validate()?;
    Ok(profile)
}

pub fn parse_profile_file(path: impl AsRef<Path>) -> Result<Profile, ProfileError> {
    let content = fs::read_to_string(path)?;
    parse_profile_str(&content)
}
