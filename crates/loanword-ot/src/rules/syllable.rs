// Syllable boundary insertion and removal.

use loanword_core::weights::BIAS;
use loanword_fst::weight::ONE;
use loanword_fst::{EPSILON, VectorFst};

use super::{Builder, Mode, identity_arcs};
use crate::error::OtError;

/// Closes every consonant run with `.C.` and every vowel run with `.V.`.
///
/// Runs may be cut anywhere, so one word has many syllabifications; the
/// prosodic constraints downstream choose between them. A word always ends
/// with a boundary.
pub fn syllabification(b: &Builder<'_>) -> Result<VectorFst, OtError> {
    let abc = b.alphabet;
    let consonants = abc.consonants();
    let vowels = abc.vowels();
    let mut fst = VectorFst::new();
    let (open, in_consonants, in_vowels) = (fst.add_state(), fst.add_state(), fst.add_state());
    for s in [open, in_consonants, in_vowels] {
        identity_arcs(&mut fst, s, in_consonants, &consonants);
        identity_arcs(&mut fst, s, in_vowels, &vowels);
    }
    fst.add_arc(in_consonants, open, EPSILON, abc.consonant_boundary(), ONE);
    fst.add_arc(in_vowels, open, EPSILON, abc.vowel_boundary(), ONE);
    fst.set_final(open, ONE);
    Ok(b.finish(fst))
}

/// Deletes syllable boundaries.
///
/// In weighted mode the final weight carries the `<<BIAS>>` constraint; in
/// annotate mode the scoring automaton adds it instead.
pub fn unsyllabification(b: &Builder<'_>) -> Result<VectorFst, OtError> {
    let abc = b.alphabet;
    let mut fst = VectorFst::new();
    fst.add_state();
    identity_arcs(&mut fst, 0, 0, abc.letters());
    for boundary in abc.boundaries() {
        fst.add_arc(0, 0, boundary, EPSILON, ONE);
    }
    let final_weight = match b.mode {
        Mode::Weighted => abc.constraint_weight(BIAS)?,
        Mode::Annotate => ONE,
    };
    fst.set_final(0, final_weight);
    Ok(b.finish(fst))
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::super::{Builder, Mode};
    use super::*;
    use loanword_core::{Alphabet, LanguageProfile, WeightVector};

    #[test]
    fn syllabification_inserts_boundaries() {
        let abc = alphabet(1.0);
        let fst = syllabification(&Builder::new(&abc, Mode::Annotate, true)).unwrap();
        assert!(maps(&abc, &fst, "k i t a b u", "k i .V. t a .V. b u .V."));
        assert!(maps(&abc, &fst, "k i t a b u", "k .C. i t .V. a b u .V."));
        assert!(maps(&abc, &fst, "s t r a", "s t r .C. a .V."));
        // A word must end on a boundary.
        assert!(!maps(&abc, &fst, "k i", "k i"));
        // A vowel cannot close a consonant run.
        assert!(!maps(&abc, &fst, "k i", "k i .C."));
    }

    #[test]
    fn semivowels_close_either_run() {
        let abc = alphabet(1.0);
        let fst = syllabification(&Builder::new(&abc, Mode::Weighted, true)).unwrap();
        assert!(maps(&abc, &fst, "w a", "w .C. a .V."));
        assert!(maps(&abc, &fst, "w a", "w a .V."));
    }

    #[test]
    fn unsyllabification_removes_boundaries() {
        let abc = alphabet(1.0);
        let fst = unsyllabification(&Builder::new(&abc, Mode::Annotate, false)).unwrap();
        assert_eq!(cost(&abc, &fst, "k i .V. t a .V.", "k i t a"), Some(0.0));
        assert!(!maps(&abc, &fst, "k i .V.", "k i .V."));
    }

    #[test]
    fn weighted_unsyllabification_pays_bias() {
        let mut abc = Alphabet::new(&LanguageProfile::builtin("arabic-swahili").unwrap()).unwrap();
        abc.register_constraint_weights(&WeightVector::from_pairs([(BIAS, 4.0)]), 1.0)
            .unwrap();
        let fst = unsyllabification(&Builder::new(&abc, Mode::Weighted, false)).unwrap();
        assert_eq!(cost(&abc, &fst, "k i .V.", "k i"), Some(4.0));
    }

    #[test]
    fn syllabify_then_unsyllabify_is_identity() {
        let abc = alphabet(1.0);
        let b = Builder::new(&abc, Mode::Annotate, false);
        let round = loanword_fst::compose(
            &syllabification(&b).unwrap(),
            &unsyllabification(&b).unwrap(),
        );
        assert_eq!(cost(&abc, &round, "k i t a b u", "k i t a b u"), Some(0.0));
    }
}
