use crate::flatten::FlattenedMap;
use kubedep_schema::{
    Constraint, ConstraintSet, FamilySection, OverrideRule, PlatformVersion, ProjectRoot,
    VersionError,
};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Turns a flattened snapshot into manifest constraints.
///
/// Rules apply in a fixed order: raw snapshot pins, then override rules, then
/// family pins. A later stage always wins over an earlier one for the same
/// root, so family projects carry the platform pin whatever the snapshot or
/// an override rule says about them.
#[derive(Debug)]
pub struct Rewriter<'a> {
    overrides: BTreeMap<&'a ProjectRoot, &'a OverrideRule>,
    family: &'a FamilySection,
    version: &'a PlatformVersion,
}

impl<'a> Rewriter<'a> {
    /// Rules are keyed by root, so when two rules share a root the later one
    /// wins. `Profile::validate` rejects such profiles, along with renames
    /// onto a root that has its own rule; callers passing unvalidated rules
    /// get last-wins.
    pub fn new(
        overrides: &'a [OverrideRule],
        family: &'a FamilySection,
        version: &'a PlatformVersion,
    ) -> Self {
        Self {
            overrides: overrides.iter().map(|rule| (&rule.root, rule)).collect(),
            family,
            version,
        }
    }

    pub fn rewrite(&self, flat: FlattenedMap) -> ConstraintSet {
        let mut constraints = ConstraintSet::new();
        let mut overridden = Vec::new();

        for (root, revision) in flat {
            match self.overrides.get(&root) {
                Some(rule) => overridden.push((*rule, revision)),
                None => {
                    constraints.insert(root, Constraint::pinned(revision));
                }
            }
        }

        for (rule, snapshot_revision) in overridden {
            let constraint = Constraint {
                revision: rule.revision.clone().unwrap_or(snapshot_revision),
                source: rule.source.clone(),
            };
            let target = rule.target_root().clone();
            debug!(
                "override {} -> {target} @ {}",
                rule.root, constraint.revision
            );
            if let Some(previous) = constraints.insert(target, constraint) {
                debug!("override for {} replaced {}", rule.root, previous.revision);
            }
        }

        let family_revision = self.family.revision(self.version);
        for root in self.family.roots() {
            if let Some(previous) =
                constraints.insert(root.clone(), Constraint::pinned(family_revision.clone()))
            {
                debug!("family pin for {root} replaced {}", previous.revision);
            }
        }

        info!(
            "rewrote {} constraints ({} override rules, {} family projects)",
            constraints.len(),
            self.overrides.len(),
            self.family.projects.len()
        );
        constraints
    }
}

/// Rewrite `flat` for the platform release `version`.
///
/// Fails only when `version` is not a usable platform version.
pub fn rewrite(
    flat: FlattenedMap,
    overrides: &[OverrideRule],
    family: &FamilySection,
    version: &str,
) -> Result<ConstraintSet, VersionError> {
    let version = PlatformVersion::parse(version)?;
    Ok(Rewriter::new(overrides, family, &version).rewrite(flat))
}
