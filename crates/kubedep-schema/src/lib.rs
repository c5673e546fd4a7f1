//! Snapshot decoding, conversion profiles, and dep manifests for kubedep.
//!
//! This crate defines the data layer: Godeps.json snapshot decoding (`Godeps`,
//! `DependencyRecord`), platform version validation (`PlatformVersion`),
//! conversion profiles carrying override rules and the family project list
//! (`Profile`), and the `Gopkg.toml` manifest model (`Manifest`, `ConstraintSet`).

pub mod manifest;
pub mod profile;
pub mod snapshot;
pub mod types;
pub mod version;

pub use manifest::{Constraint, ConstraintSet, Manifest, ManifestError, RootConstraint};
pub use profile::{
    parse_profile_file, parse_profile_str, FamilySection, OverrideRule, Profile, ProfileError,
    UmbrellaSection, BUILTIN_PROFILE,
};
pub use snapshot::{
    parse_snapshot_file, parse_snapshot_slice, parse_snapshot_str, DependencyRecord, Godeps,
    SnapshotError,
};
pub use types::{ImportPath, ProjectRoot, Revision};
pub use version::{PlatformVersion, VersionError};
