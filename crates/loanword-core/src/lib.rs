//! Shared types for loanword adaptation cascades.
//!
//! The phone inventory of a language pair ([`alphabet::Alphabet`]), its
//! categorical features ([`features`]), the data tables a language pair
//! needs ([`profile::LanguageProfile`]), constraint weights
//! ([`weights::WeightVector`]) and the dictionary/corpus readers
//! ([`corpus`]).

pub mod alphabet;
pub mod atomic;
pub mod corpus;
pub mod error;
pub mod features;
pub mod hash;
pub mod profile;
pub mod weights;

pub use alphabet::Alphabet;
pub use error::CoreError;
pub use features::Dimension;
pub use profile::LanguageProfile;
pub use weights::WeightVector;
