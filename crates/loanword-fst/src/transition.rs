// Transition struct shared by every automaton in the engine.

use serde::{Deserialize, Serialize};

use crate::{EPSILON, Label, StateId};

/// One arc of a weighted transducer.
///
/// - `ilabel`: input label (0 = epsilon)
/// - `olabel`: output label (0 = epsilon)
/// - `weight`: tropical cost, non-negative in every automaton built here
/// - `target`: destination state
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    pub ilabel: Label,
    pub olabel: Label,
    pub weight: f64,
    pub target: StateId,
}

impl Transition {
    pub fn new(ilabel: Label, olabel: Label, weight: f64, target: StateId) -> Self {
        Self {
            ilabel,
            olabel,
            weight,
            target,
        }
    }

    /// True for an `ε:ε` arc.
    #[inline]
    pub fn is_epsilon(&self) -> bool {
        self.ilabel == EPSILON && self.olabel == EPSILON
    }

    /// Packs the label pair into one key, so a transducer can be handled as
    /// an acceptor over pairs.
    #[inline]
    pub fn encoded_label(&self) -> u64 {
        encode_pair(self.ilabel, self.olabel)
    }
}

#[inline]
pub fn encode_pair(ilabel: Label, olabel: Label) -> u64 {
    ((ilabel as u64) << 32) | olabel as u64
}

#[inline]
pub fn decode_pair(key: u64) -> (Label, Label) {
    ((key >> 32) as Label, (key & 0xFFFF_FFFF) as Label)
}
