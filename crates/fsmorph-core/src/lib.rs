//! Feature structures and semiring weights for weighted finite-state
//! morphology.
//!
//! Weighted transducers in this workspace do not carry numeric weights
//! alone: the main weighting algebra is unification over *sets* of
//! feature structures, so that an analysis accumulates grammatical
//! constraints while it is being transduced, and incompatible analyses
//! prune themselves. This crate provides that algebra.
//!
//! # Architecture
//!
//! - [`featstruct`] -- typed attribute-value records with freezing,
//!   cycle-safe equality and non-destructive inheritance
//! - [`unify`] -- unification as a two-case result (`Unified`/`Failed`)
//! - [`fsset`] -- sets of frozen feature structures (disjunctive
//!   ambiguity), the carrier of the unification semiring
//! - [`parse`] -- recursive-descent parser for the bracketed
//!   feature-structure literal syntax
//! - [`hierarchy`] -- explicit registry of named feature-structure types
//! - [`semiring`] -- the unification, probability and tropical semirings
//!   over a common [`Weight`](semiring::Weight) carrier

pub mod featstruct;
pub mod fsset;
pub mod hierarchy;
pub mod parse;
pub mod semiring;
pub mod unify;

pub use featstruct::{FeatStruct, Value};
pub use fsset::FsSet;
pub use hierarchy::TypeHierarchy;
pub use semiring::{Semiring, Weight};
pub use unify::{Unification, unify};

/// Error type for feature-structure parsing and access.
#[derive(Debug, thiserror::Error)]
pub enum FsError {
    #[error("parse error at position {position} in {text:?}: expected {expected}")]
    Parse {
        text: String,
        position: usize,
        expected: String,
    },
    #[error("path {path:?}: segment {segment:?} is not a nested structure")]
    MissingPath { path: String, segment: String },
    #[error("unknown feature-structure type {0:?}")]
    UnknownType(String),
    #[error("literal {0:?} denotes {1} structures where exactly one is required")]
    NotSingleton(String, usize),
    #[error("invalid weight literal {0:?}")]
    InvalidWeight(String),
}
