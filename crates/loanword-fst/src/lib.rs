//! Weighted finite-state transducer engine.
//!
//! Mutable vector-backed transducers over the tropical semiring (weights are
//! costs, a path costs the sum of its arcs, alternatives take the minimum),
//! together with the algebra needed to build rule cascades: rational
//! operations, composition, epsilon removal, determinization, minimization
//! and n-best path search.
//!
//! # Architecture
//!
//! - [`weight`] -- Tropical semiring constants and a min-heap entry
//! - [`transition`] -- Arc layout `(ilabel, olabel, weight, target)`
//! - [`symbols`] -- Symbol table (string-to-label and label-to-string mapping)
//! - [`fst`] -- [`VectorFst`] and the rational operations
//! - [`compose`] -- Composition with an epsilon-sequencing filter
//! - [`rmepsilon`] -- Epsilon removal
//! - [`determinize`] -- Weighted determinization over encoded label pairs
//! - [`minimize`] -- Partition refinement
//! - [`shortest_path`] -- N-best paths and path enumeration
//! - [`format`] -- Binary header and serialized payload

pub mod compose;
pub mod determinize;
pub mod format;
pub mod fst;
pub mod minimize;
pub mod rmepsilon;
pub mod shortest_path;
pub mod symbols;
pub mod transition;
pub mod weight;

pub use compose::compose;
pub use determinize::determinize;
pub use fst::{ArcSortType, ProjectType, VectorFst};
pub use minimize::minimize;
pub use rmepsilon::rm_epsilon;
pub use shortest_path::{Path, accepted_paths, n_shortest_paths};
pub use symbols::SymbolTable;
pub use transition::Transition;

/// Arc label. Label 0 is reserved for epsilon.
pub type Label = u32;

/// State index. State 0 is the start state of every non-empty automaton.
pub type StateId = u32;

/// The empty label.
pub const EPSILON: Label = 0;

/// Error type for automaton construction, search and (de)serialization.
#[derive(Debug, thiserror::Error)]
pub enum FstError {
    #[error("invalid magic number in automaton header")]
    InvalidMagic,
    #[error("data too short: expected at least {expected} bytes, got {actual}")]
    TooShort { expected: usize, actual: usize },
    #[error("unsupported format version {0}")]
    UnsupportedVersion(u8),
    #[error("payload decode failed: {0}")]
    Payload(#[from] bincode::Error),
    #[error("determinization exceeded {limit} states")]
    DeterminizeLimit { limit: usize },
    #[error("path enumeration requires an acyclic automaton")]
    Cyclic,
    #[error("path enumeration exceeded {limit} paths")]
    PathLimit { limit: usize },
}
