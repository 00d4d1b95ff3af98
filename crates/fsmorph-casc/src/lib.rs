//! Cascade descriptions and morphotactics.
//!
//! A cascade file names an ordered sequence of transducers -- some
//! precompiled, some built from morphotactic (`.mtax`) descriptions or
//! word lists -- together with a weighting semiring, stringset
//! abbreviations and optional subcascade index lists for partial
//! loading. This crate parses those descriptions, assembles the
//! component transducers and composes or runs them.
//!
//! - [`cascade`] -- the cascade container, its description language and
//!   composition strategies
//! - [`mtax`] -- the morphotactic notation and its compiler

pub mod cascade;
pub mod mtax;

pub use cascade::{Cascade, Component, DirResources, MemResources, Resources};
pub use mtax::MTax;

use fsmorph_core::FsError;
use fsmorph_fst::FstError;

/// Error type for cascade and morphotactics loading.
#[derive(Debug, thiserror::Error)]
pub enum CascError {
    #[error("bad line {line} in {label}: {text:?}")]
    BadLine {
        label: String,
        line: usize,
        text: String,
    },
    #[error("{0:?} is not a subcascade label")]
    UnknownSubcascade(String),
    #[error("component {0} is not loaded")]
    NotLoaded(String),
    #[error("no such resource: {0}")]
    MissingResource(String),
    #[error("unknown shortcut target {target:?} in {label}")]
    UnknownTarget { label: String, target: String },
    #[error(transparent)]
    Fst(#[from] FstError),
    #[error(transparent)]
    Fs(#[from] FsError),
}
