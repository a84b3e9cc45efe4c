//! Optimality-Theory constraint cascades for loanword adaptation.
//!
//! Adaptation from a source (donor) language into a target language is a
//! cascade of weighted transducers: each rule copies its input and marks,
//! or charges for, one kind of change or constraint violation. Composing a
//! source vocabulary, the cascade and a target word gives every way the
//! word could have been borrowed, and its cheapest paths are the
//! predictions.
//!
//! # Architecture
//!
//! - [`rules`] -- One builder per rule, parameterized by [`rules::Mode`]
//! - [`pipeline`] -- Stage lists, cascade assembly, composition and tracing
//! - [`cache`] -- Content-addressed on-disk artifacts
//! - [`vocab`] -- Cached source vocabulary groups
//! - [`sample`] -- Per-sample automatons and reachability lists
//! - [`decode`] -- N-best decoding and result lines
//! - [`eval`] -- Accuracy at n
//! - [`runner`] -- One run over a corpus shard
//! - [`optimize`] -- Nelder-Mead weight search
//! - [`config`] -- TOML run and optimizer settings

pub mod cache;
pub mod config;
pub mod decode;
pub mod error;
pub mod eval;
pub mod optimize;
pub mod pipeline;
pub mod rules;
pub mod runner;
pub mod sample;
pub mod vocab;

pub use config::{ConfigFile, OptimizeConfig, RunConfig};
pub use decode::{DecodedPath, ResultLine, decode};
pub use error::{OtError, PipelineError};
pub use eval::AccuracyReport;
pub use optimize::{AdaptationObjective, CommandObjective, NelderMead, Objective, optimize};
pub use pipeline::{Pipeline, PipelineSpec, TraceReport};
pub use rules::{Mode, Rule};
pub use runner::{Run, RunSummary};
pub use sample::{SampleOutcome, Shard};
