use crate::deduce::RootDeducer;
use crate::flatten::{flatten, ConflictPolicy};
use crate::rewrite::Rewriter;
use crate::CoreError;
use kubedep_schema::{Godeps, Manifest, PlatformVersion, Profile};
use tracing::info;

#[derive(Debug, Clone, Copy, Default)]
pub struct ConvertOptions {
    pub conflict_policy: ConflictPolicy,
}

/// Result of a successful conversion.
#[derive(Debug)]
pub struct ConversionResult {
    pub manifest: Manifest,
    /// Dependency records in the input snapshot.
    pub records: usize,
    /// Distinct project roots after flattening.
    pub roots: usize,
}

/// Runs snapshot → flatten → rewrite → assemble for one platform release.
///
/// Holds no state between conversions; the profile supplies the override
/// rules, family projects, ignore patterns and umbrella constraint. The profile
/// is validated on every call since its fields are public.
pub struct Converter<'a, D: ?Sized> {
    profile: &'a Profile,
    deducer: &'a D,
    options: ConvertOptions,
}

impl<'a, D: RootDeducer + ?Sized> Converter<'a, D> {
    pub fn new(profile: &'a Profile, deducer: &'a D, options: ConvertOptions) -> Self {
        Self {
            profile,
            deducer,
            options,
        }
    }

    pub fn convert(
        &self,
        snapshot: &Godeps,
        version: &PlatformVersion,
    ) -> Result<ConversionResult, CoreError> {
        info!(
            "converting {} dependency records for release {version}",
            snapshot.deps.len()
        );
        self.profile.validate()?;
        let flat = flatten(&snapshot.deps, self.deducer, self.options.conflict_policy)?;
        let roots = flat.len();

        let constraints =
            Rewriter::new(&self.profile.overrides, &self.profile.family, version).rewrite(flat);
        let manifest = Manifest::assemble(
            &self.profile.ignored,
            self.profile.umbrella_constraint(version),
            constraints,
        );

        Ok(ConversionResult {
            manifest,
            records: snapshot.deps.len(),
            roots,
        })
    }
}
