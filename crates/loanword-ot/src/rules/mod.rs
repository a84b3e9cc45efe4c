//! Rule and constraint automaton builders.
//!
//! Every builder copies the alphabet through unchanged on its default arcs
//! and, where its trigger pattern matches, inserts one violation arc. In
//! [`Mode::Annotate`] the violation arc is `ε:<<NAME>>` with no cost and
//! every state also passes all constraint markers through, so markers
//! emitted upstream survive later compositions. In [`Mode::Weighted`] the
//! violation arc is `ε:ε` and costs the registered weight of the
//! constraint.

pub mod constraints;
pub mod morphology;
pub mod operations;
pub mod syllable;

use std::fmt;

use loanword_core::Alphabet;
use loanword_fst::weight::ONE;
use loanword_fst::{EPSILON, Label, StateId, VectorFst};
use serde::{Deserialize, Serialize};

use crate::error::OtError;

/// How violations appear on a path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Violations emit marker symbols; weights are applied at decode time.
    #[default]
    Annotate,
    /// Violations cost their constraint weight directly.
    Weighted,
}

impl Mode {
    pub fn name(self) -> &'static str {
        match self {
            Mode::Annotate => "annotate",
            Mode::Weighted => "weighted",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Position of a rule in the cascade. Stages must appear in non-decreasing
/// phase order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    Segmental,
    Syllabify,
    Prosodic,
    Unsyllabify,
}

/// Every rule a cascade can contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Rule {
    SourceMorphology,
    VowelDeletion,
    MinConsonantCount(usize),
    Degemination,
    PhoneSubstitution,
    Epenthesis,
    FinalVowelSubstitution,
    Syllabification,
    NoCoda,
    NoComplex,
    NoComplexMargin,
    NoComplexVowel,
    Onset,
    Peak,
    Ssp,
    Length,
    Unsyllabification,
    TargetMorphology,
}

impl Rule {
    pub fn name(&self) -> String {
        match self {
            Rule::SourceMorphology => "source-morphology".into(),
            Rule::VowelDeletion => "vowel-deletion".into(),
            Rule::MinConsonantCount(k) => format!("min-consonant-count-{k}"),
            Rule::Degemination => "degemination".into(),
            Rule::PhoneSubstitution => "phone-substitution".into(),
            Rule::Epenthesis => "epenthesis".into(),
            Rule::FinalVowelSubstitution => "final-vowel-substitution".into(),
            Rule::Syllabification => "syllabification".into(),
            Rule::NoCoda => "no-coda".into(),
            Rule::NoComplex => "no-complex".into(),
            Rule::NoComplexMargin => "no-complex-margin".into(),
            Rule::NoComplexVowel => "no-complex-vowel".into(),
            Rule::Onset => "onset".into(),
            Rule::Peak => "peak".into(),
            Rule::Ssp => "ssp".into(),
            Rule::Length => "length".into(),
            Rule::Unsyllabification => "unsyllabification".into(),
            Rule::TargetMorphology => "target-morphology".into(),
        }
    }

    pub fn phase(&self) -> Phase {
        match self {
            Rule::Syllabification => Phase::Syllabify,
            Rule::NoCoda
            | Rule::NoComplex
            | Rule::NoComplexMargin
            | Rule::NoComplexVowel
            | Rule::Onset
            | Rule::Peak
            | Rule::Ssp
            | Rule::Length => Phase::Prosodic,
            Rule::Unsyllabification => Phase::Unsyllabify,
            _ => Phase::Segmental,
        }
    }

    /// Builds the automaton of this rule.
    pub fn build(&self, b: &Builder<'_>) -> Result<VectorFst, OtError> {
        match *self {
            Rule::SourceMorphology => morphology::source_morphology(b),
            Rule::VowelDeletion => operations::vowel_deletion(b),
            Rule::MinConsonantCount(k) => operations::min_consonant_count(b, k),
            Rule::Degemination => operations::degemination(b),
            Rule::PhoneSubstitution => operations::phone_substitution(b),
            Rule::Epenthesis => operations::epenthesis(b),
            Rule::FinalVowelSubstitution => operations::final_vowel_substitution(b),
            Rule::Syllabification => syllable::syllabification(b),
            Rule::NoCoda => constraints::no_coda(b),
            Rule::NoComplex => constraints::no_complex(b),
            Rule::NoComplexMargin => constraints::no_complex_margin(b),
            Rule::NoComplexVowel => constraints::no_complex_vowel(b),
            Rule::Onset => constraints::onset(b),
            Rule::Peak => constraints::peak(b),
            Rule::Ssp => constraints::ssp(b),
            Rule::Length => constraints::length(b),
            Rule::Unsyllabification => syllable::unsyllabification(b),
            Rule::TargetMorphology => morphology::target_morphology(b),
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// Shared context of the builders: the alphabet, the mode and whether the
/// cascade keeps syllable boundaries in its output.
#[derive(Debug, Clone, Copy)]
pub struct Builder<'a> {
    pub alphabet: &'a Alphabet,
    pub mode: Mode,
    pub with_syllabification: bool,
}

impl<'a> Builder<'a> {
    pub fn new(alphabet: &'a Alphabet, mode: Mode, with_syllabification: bool) -> Self {
        Self {
            alphabet,
            mode,
            with_syllabification,
        }
    }

    /// Phones and syllable boundaries: every symbol a default arc copies.
    pub fn base_symbols(&self) -> Vec<Label> {
        let mut all = self.alphabet.boundaries().to_vec();
        all.extend_from_slice(self.alphabet.letters());
        all
    }

    /// Adds the violation arc of constraint `name` from `from` to `to`.
    pub fn violation(
        &self,
        fst: &mut VectorFst,
        from: StateId,
        to: StateId,
        name: &str,
    ) -> Result<(), OtError> {
        match self.mode {
            Mode::Annotate => {
                let marker = self.alphabet.marker(name)?;
                fst.add_arc(from, to, EPSILON, marker, ONE);
            }
            Mode::Weighted => {
                let w = self.alphabet.constraint_weight(name)?;
                fst.add_arc(from, to, EPSILON, EPSILON, w);
            }
        }
        Ok(())
    }

    /// Completes a rule automaton: in annotate mode every state passes the
    /// constraint markers through.
    pub fn finish(&self, mut fst: VectorFst) -> VectorFst {
        if self.mode == Mode::Annotate {
            add_marker_loops(&mut fst, self.alphabet);
        }
        fst
    }
}

/// Adds an identity arc `from -l:l-> to` for every label.
pub fn identity_arcs(fst: &mut VectorFst, from: StateId, to: StateId, labels: &[Label]) {
    for &l in labels {
        fst.add_arc(from, to, l, l, ONE);
    }
}

/// Adds identity self-loops for `labels` to every state that lacks them.
pub fn add_self_loops(fst: &mut VectorFst, labels: &[Label]) {
    let states: Vec<StateId> = fst.states().collect();
    for s in states {
        let missing: Vec<Label> = labels
            .iter()
            .copied()
            .filter(|&l| {
                !fst.transitions(s)
                    .iter()
                    .any(|t| t.target == s && t.ilabel == l && t.olabel == l)
            })
            .collect();
        identity_arcs(fst, s, s, &missing);
    }
}

/// Lets every registered constraint marker pass through every state.
pub fn add_marker_loops(fst: &mut VectorFst, alphabet: &Alphabet) {
    let markers: Vec<Label> = alphabet.markers().into_iter().map(|(l, _)| l).collect();
    add_self_loops(fst, &markers);
}

/// Lets syllable boundaries pass through every state.
pub fn add_boundary_loops(fst: &mut VectorFst, alphabet: &Alphabet) {
    add_self_loops(fst, &alphabet.boundaries());
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use loanword_core::WeightVector;
    use loanword_core::weights::MAX_V;

    const ALL_RULES: [Rule; 18] = [
        Rule::SourceMorphology,
        Rule::VowelDeletion,
        Rule::MinConsonantCount(1),
        Rule::Degemination,
        Rule::PhoneSubstitution,
        Rule::Epenthesis,
        Rule::FinalVowelSubstitution,
        Rule::Syllabification,
        Rule::NoCoda,
        Rule::NoComplex,
        Rule::NoComplexMargin,
        Rule::NoComplexVowel,
        Rule::Onset,
        Rule::Peak,
        Rule::Ssp,
        Rule::Length,
        Rule::Unsyllabification,
        Rule::TargetMorphology,
    ];

    #[test]
    fn segmental_rules_preserve_identity() {
        let abc = alphabet(1.0);
        for mode in [Mode::Annotate, Mode::Weighted] {
            let b = Builder::new(&abc, mode, false);
            for rule in [
                Rule::SourceMorphology,
                Rule::VowelDeletion,
                Rule::MinConsonantCount(1),
                Rule::Degemination,
                Rule::PhoneSubstitution,
                Rule::Epenthesis,
                Rule::FinalVowelSubstitution,
                Rule::TargetMorphology,
            ] {
                let fst = rule.build(&b).unwrap();
                assert_eq!(cost(&abc, &fst, "k i t a b", "k i t a b"), Some(0.0), "{rule} ({mode})");
            }
        }
    }

    #[test]
    fn prosodic_rules_preserve_identity() {
        // "ki.ta.bu" written with its boundaries violates nothing.
        let abc = alphabet(1.0);
        let syllabified = "k i .V. t a .V. b u .V.";
        for mode in [Mode::Annotate, Mode::Weighted] {
            let b = Builder::new(&abc, mode, true);
            for rule in [
                Rule::NoCoda,
                Rule::NoComplex,
                Rule::NoComplexMargin,
                Rule::NoComplexVowel,
                Rule::Onset,
                Rule::Peak,
                Rule::Ssp,
                Rule::Length,
            ] {
                let fst = rule.build(&b).unwrap();
                assert_eq!(cost(&abc, &fst, syllabified, syllabified), Some(0.0), "{rule} ({mode})");
            }
        }
    }

    #[test]
    fn annotate_rules_pass_markers_through() {
        let abc = alphabet(1.0);
        let b = Builder::new(&abc, Mode::Annotate, false);
        let marker = abc.marker(MAX_V).unwrap();
        for rule in ALL_RULES {
            let fst = rule.build(&b).unwrap();
            assert!(
                fst.transitions(0)
                    .iter()
                    .any(|t| t.ilabel == marker && t.olabel == marker && t.target == 0),
                "{rule}"
            );
        }
    }

    #[test]
    fn builders_need_registered_constraints() {
        let abc = Alphabet::new(&loanword_core::LanguageProfile::builtin("arabic-swahili").unwrap()).unwrap();
        for mode in [Mode::Annotate, Mode::Weighted] {
            let b = Builder::new(&abc, mode, false);
            let err = Rule::VowelDeletion.build(&b).unwrap_err();
            assert!(matches!(err, OtError::Core(loanword_core::CoreError::UnknownSymbol { .. })));
        }
    }

    #[test]
    fn weighted_violation_uses_registered_weight() {
        let mut abc = Alphabet::new(&loanword_core::LanguageProfile::builtin("arabic-swahili").unwrap()).unwrap();
        abc.register_constraint_weights(&WeightVector::from_pairs([(MAX_V, 2.5)]), 0.0)
            .unwrap();
        let b = Builder::new(&abc, Mode::Weighted, false);
        let fst = Rule::VowelDeletion.build(&b).unwrap();
        assert_eq!(cost(&abc, &fst, "k a t", "k t"), Some(2.5));
    }

    #[test]
    fn self_loops_are_not_duplicated() {
        let abc = alphabet(0.0);
        let mut fst = VectorFst::new();
        fst.add_state();
        fst.set_final(0, ONE);
        add_boundary_loops(&mut fst, &abc);
        add_boundary_loops(&mut fst, &abc);
        assert_eq!(fst.num_arcs(), 2);
    }

    #[test]
    fn phases_are_ordered() {
        assert!(Rule::Degemination.phase() < Rule::Syllabification.phase());
        assert!(Rule::Syllabification.phase() < Rule::Onset.phase());
        assert!(Rule::Length.phase() < Rule::Unsyllabification.phase());
        assert_eq!(Rule::MinConsonantCount(3).name(), "min-consonant-count-3");
    }
}
