//! Weighted finite-state transducer engine.
//!
//! Transducers here are state/arc graphs whose arc weights live in one
//! of the semirings from `fsmorph-core` -- usually the unification
//! semiring, so that transducing a surface form accumulates feature
//! constraints and incompatible paths prune themselves.
//!
//! # Architecture
//!
//! - [`fst`] -- the state/arc graph, splicing and inversion
//! - [`compose`] -- pairwise product composition
//! - [`transduce`] -- ambiguity-preserving transduction
//! - [`segment`] -- multi-character segmentation units (digraphs etc.)
//! - [`stringset`] -- named string sets and their label algebra
//! - [`text`] -- the line-oriented compiled-FST format
//! - [`lexicon`] -- word-list compilation into trie-shaped FSTs

pub mod compose;
pub mod fst;
pub mod lexicon;
pub mod segment;
pub mod stringset;
pub mod text;
pub mod transduce;

pub use compose::compose;
pub use fst::{Arc, Fst, Label, State, StateId};
pub use lexicon::compile_lexicon;
pub use segment::SegmentationUnits;
pub use stringset::{StringSet, StringSetDict};
pub use text::{parse_fst, write_fst};
pub use transduce::Transduction;

use fsmorph_core::FsError;

/// Maximum number of search steps taken during one transduction.
/// A safety limit against epsilon cycles in pathological transducers.
pub const MAX_SEARCH_STEPS: u32 = 100_000;

/// Error type for FST construction, parsing and composition.
#[derive(Debug, thiserror::Error)]
pub enum FstError {
    #[error("bad line {line} in {label}: {text:?}")]
    BadLine {
        label: String,
        line: usize,
        text: String,
    },
    #[error("unknown state {state:?} in {label}")]
    UnknownState { label: String, state: String },
    #[error("{0} has no initial state")]
    NoInitial(String),
    #[error("cannot compose {left} over {left_semiring:?} with {right} over {right_semiring:?}")]
    SemiringMismatch {
        left: String,
        left_semiring: fsmorph_core::Semiring,
        right: String,
        right_semiring: fsmorph_core::Semiring,
    },
    #[error("cannot compose an empty sequence")]
    EmptyComposition,
    #[error("unknown stringset {0:?}")]
    UnknownStringSet(String),
    #[error(transparent)]
    Fs(#[from] FsError),
}
