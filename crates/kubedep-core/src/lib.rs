//! Dependency flattening and constraint rewriting for kubedep.
//!
//! This crate holds the decision logic of a conversion: deducing project roots
//! from import paths (`RootDeducer`), collapsing package-level snapshot records
//! onto those roots with an explicit conflict policy (`flatten`), applying
//! override rules and family pins (`Rewriter`), and the `Converter` that chains
//! them into a manifest.

pub mod convert;
pub mod deduce;
pub mod flatten;
pub mod rewrite;

pub use convert::{ConversionResult, ConvertOptions, Converter};
pub use deduce::{
    CachingDeducer, ChainDeducer, DeduceError, RootDeducer, StaticDeducer, TableDeducer,
};
pub use flatten::{flatten, ConflictPolicy, FlattenError, FlattenedMap};
pub use rewrite::{rewrite, Rewriter};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("profile error: {0}")]
    Profile(#[from] kubedep_schema::ProfileError),
    #[error("flatten error: {0}")]
    Flatten(#[from] FlattenError),
}
