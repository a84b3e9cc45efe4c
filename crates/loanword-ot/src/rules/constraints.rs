// Prosodic markedness constraints over syllabified strings.
//
// Every constraint is an identity on its input; only the violation arcs
// differ. They expect words written with `.C.`/`.V.` after each syllable.

use loanword_core::weights::{COMPLEX, COMPLEX_MARGIN, COMPLEX_VOWEL, LEN, NOCODA, ONSET, PEAK, SSP};
use loanword_fst::weight::ONE;
use loanword_fst::{EPSILON, Label, VectorFst};

use super::{Builder, identity_arcs};
use crate::error::OtError;

/// Longest syllable, in phones, that [`length`] accepts for free.
pub const MAX_SYLLABLE_LENGTH: u32 = 3;

fn states(fst: &mut VectorFst, n: usize) {
    for _ in 0..n {
        fst.add_state();
    }
}

/// A consonant directly before a syllable boundary.
pub fn no_coda(b: &Builder<'_>) -> Result<VectorFst, OtError> {
    let abc = b.alphabet;
    let bounds = abc.boundaries();
    let mut fst = VectorFst::new();
    states(&mut fst, 4);
    identity_arcs(&mut fst, 0, 0, abc.letters());
    identity_arcs(&mut fst, 0, 1, &abc.consonants());
    identity_arcs(&mut fst, 1, 2, &bounds);
    b.violation(&mut fst, 2, 0, NOCODA)?;
    identity_arcs(&mut fst, 0, 3, &abc.vowels());
    identity_arcs(&mut fst, 0, 3, &bounds);
    identity_arcs(&mut fst, 3, 0, &bounds);
    fst.set_final(0, ONE);
    Ok(b.finish(fst))
}

/// Two consonants inside one syllable.
pub fn no_complex(b: &Builder<'_>) -> Result<VectorFst, OtError> {
    let abc = b.alphabet;
    let mut open: Vec<Label> = abc.vowels();
    open.extend(abc.boundaries());
    let pure_consonants = abc.pure_consonants();
    let mut fst = VectorFst::new();
    states(&mut fst, 3);
    identity_arcs(&mut fst, 0, 0, &open);
    identity_arcs(&mut fst, 1, 0, &open);
    identity_arcs(&mut fst, 0, 1, &pure_consonants);
    identity_arcs(&mut fst, 1, 2, &pure_consonants);
    b.violation(&mut fst, 2, 1, COMPLEX)?;
    fst.set_final(0, ONE);
    fst.set_final(1, ONE);
    Ok(b.finish(fst))
}

/// Consonants on both sides of a syllable boundary.
pub fn no_complex_margin(b: &Builder<'_>) -> Result<VectorFst, OtError> {
    let abc = b.alphabet;
    let bounds = abc.boundaries();
    let vowels = abc.vowels();
    let pure_consonants = abc.pure_consonants();
    let mut fst = VectorFst::new();
    states(&mut fst, 4);
    for s in 0..3 {
        identity_arcs(&mut fst, s, 0, &vowels);
    }
    identity_arcs(&mut fst, 0, 0, &bounds);
    identity_arcs(&mut fst, 1, 2, &bounds);
    identity_arcs(&mut fst, 2, 0, &bounds);
    identity_arcs(&mut fst, 0, 1, &pure_consonants);
    identity_arcs(&mut fst, 1, 1, &pure_consonants);
    identity_arcs(&mut fst, 2, 3, &pure_consonants);
    b.violation(&mut fst, 3, 1, COMPLEX_MARGIN)?;
    for s in 0..3 {
        fst.set_final(s, ONE);
    }
    Ok(b.finish(fst))
}

/// Two full vowels in a row, boundaries ignored.
pub fn no_complex_vowel(b: &Builder<'_>) -> Result<VectorFst, OtError> {
    let abc = b.alphabet;
    let consonants = abc.consonants();
    let pure_vowels = abc.pure_vowels();
    let bounds = abc.boundaries();
    let mut fst = VectorFst::new();
    states(&mut fst, 3);
    identity_arcs(&mut fst, 0, 0, &consonants);
    identity_arcs(&mut fst, 1, 0, &consonants);
    identity_arcs(&mut fst, 0, 1, &pure_vowels);
    identity_arcs(&mut fst, 1, 2, &pure_vowels);
    b.violation(&mut fst, 2, 1, COMPLEX_VOWEL)?;
    identity_arcs(&mut fst, 0, 0, &bounds);
    identity_arcs(&mut fst, 1, 1, &bounds);
    fst.set_final(0, ONE);
    fst.set_final(1, ONE);
    Ok(b.finish(fst))
}

/// A syllable that starts with a full vowel.
pub fn onset(b: &Builder<'_>) -> Result<VectorFst, OtError> {
    let abc = b.alphabet;
    let consonants = abc.consonants();
    let pure_vowels = abc.pure_vowels();
    let mut fst = VectorFst::new();
    states(&mut fst, 4);
    for s in [0, 3] {
        identity_arcs(&mut fst, s, 1, &consonants);
        identity_arcs(&mut fst, s, 2, &pure_vowels);
    }
    identity_arcs(&mut fst, 1, 1, abc.letters());
    identity_arcs(&mut fst, 1, 3, &abc.boundaries());
    b.violation(&mut fst, 2, 1, ONSET)?;
    fst.set_final(1, ONE);
    fst.set_final(3, ONE);
    Ok(b.finish(fst))
}

/// More than one full vowel before the next boundary.
///
/// Boundaries may also be skipped, so this only approximates one peak per
/// syllable.
pub fn peak(b: &Builder<'_>) -> Result<VectorFst, OtError> {
    let abc = b.alphabet;
    let peaks = abc.pure_vowels();
    let bounds = abc.boundaries();
    let mut not_peaks: Vec<Label> = abc
        .letters()
        .iter()
        .copied()
        .filter(|&l| !abc.is_pure_vowel(l))
        .collect();
    not_peaks.extend(bounds);
    let mut fst = VectorFst::new();
    states(&mut fst, 3);
    identity_arcs(&mut fst, 0, 0, &not_peaks);
    identity_arcs(&mut fst, 1, 1, &not_peaks);
    identity_arcs(&mut fst, 0, 1, &peaks);
    identity_arcs(&mut fst, 1, 2, &peaks);
    identity_arcs(&mut fst, 1, 0, &bounds);
    b.violation(&mut fst, 2, 1, PEAK)?;
    fst.set_final(0, ONE);
    Ok(b.finish(fst))
}

/// Sonority must rise to the peak and fall after it.
///
/// A syllable scans the sonority classes upwards then downwards, each class
/// optionally and repeatedly, before its boundary. A syllable that does not
/// fit can abandon the scan at the top of the fall at a cost.
pub fn ssp(b: &Builder<'_>) -> Result<VectorFst, OtError> {
    let abc = b.alphabet;
    let classes = abc.sonority_classes();
    let rising = classes.iter();
    let falling = classes.iter().rev();
    let mut fst = VectorFst::new();
    fst.add_state();
    let mut current = 0;
    for class in rising.chain(falling) {
        let next = fst.add_state();
        fst.add_arc(current, next, EPSILON, EPSILON, ONE);
        identity_arcs(&mut fst, current, next, class);
        identity_arcs(&mut fst, next, next, class);
        current = next;
    }
    identity_arcs(&mut fst, current, 0, &abc.boundaries());
    b.violation(&mut fst, current, 0, SSP)?;
    fst.set_final(0, ONE);
    Ok(b.finish(fst))
}

/// One violation per phone past [`MAX_SYLLABLE_LENGTH`] in a syllable.
pub fn length(b: &Builder<'_>) -> Result<VectorFst, OtError> {
    let abc = b.alphabet;
    let bounds = abc.boundaries();
    let mut fst = VectorFst::new();
    let last = MAX_SYLLABLE_LENGTH + 1;
    states(&mut fst, last as usize + 1);
    for s in 0..last {
        identity_arcs(&mut fst, s, s + 1, abc.letters());
    }
    for s in 1..last {
        identity_arcs(&mut fst, s, 0, &bounds);
    }
    b.violation(&mut fst, last, MAX_SYLLABLE_LENGTH, LEN)?;
    fst.set_final(0, ONE);
    Ok(b.finish(fst))
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::super::{Builder, Mode};
    use super::*;

    fn weighted(rule: fn(&Builder<'_>) -> Result<VectorFst, OtError>) -> (loanword_core::Alphabet, VectorFst) {
        let abc = alphabet(1.0);
        let fst = rule(&Builder::new(&abc, Mode::Weighted, true)).unwrap();
        (abc, fst)
    }

    fn self_cost(rule: fn(&Builder<'_>) -> Result<VectorFst, OtError>, word: &str) -> Option<f64> {
        let (abc, fst) = weighted(rule);
        cost(&abc, &fst, word, word)
    }

    #[test]
    fn no_coda_marks_closed_syllables() {
        assert_eq!(self_cost(no_coda, "k i .V. t a .V."), Some(0.0));
        assert_eq!(self_cost(no_coda, "k i t .C. a b .C."), Some(2.0));
        // Semivowels may close a syllable for free.
        assert_eq!(self_cost(no_coda, "k a w .V."), Some(0.0));
    }

    #[test]
    fn no_complex_marks_clusters() {
        assert_eq!(self_cost(no_complex, "k a .V."), Some(0.0));
        assert_eq!(self_cost(no_complex, "s t a .V."), Some(1.0));
        assert_eq!(self_cost(no_complex, "s t r a .V."), Some(2.0));
        // A boundary breaks the cluster.
        assert_eq!(self_cost(no_complex, "a s .C. t a .V."), Some(0.0));
    }

    #[test]
    fn no_complex_margin_marks_clusters_across_boundaries() {
        assert_eq!(self_cost(no_complex_margin, "a s .C. t a .V."), Some(1.0));
        assert_eq!(self_cost(no_complex_margin, "a .V. s a .V."), Some(0.0));
        assert_eq!(self_cost(no_complex_margin, "a s t a .V."), Some(0.0));
    }

    #[test]
    fn no_complex_vowel_marks_vowel_sequences() {
        assert_eq!(self_cost(no_complex_vowel, "k a i .V."), Some(1.0));
        assert_eq!(self_cost(no_complex_vowel, "k a .V. i .V."), Some(1.0));
        assert_eq!(self_cost(no_complex_vowel, "k a .V. t i .V."), Some(0.0));
        // Semivowels separate vowels.
        assert_eq!(self_cost(no_complex_vowel, "k a w i .V."), Some(0.0));
    }

    #[test]
    fn onset_marks_vowel_initial_syllables() {
        assert_eq!(self_cost(onset, "a .V. k a .V."), Some(1.0));
        assert_eq!(self_cost(onset, "k a .V. a .V."), Some(1.0));
        assert_eq!(self_cost(onset, "w a .V."), Some(0.0));
        assert_eq!(self_cost(onset, "k a .V."), Some(0.0));
    }

    #[test]
    fn peak_marks_second_vowel() {
        assert_eq!(self_cost(peak, "k a .V."), Some(0.0));
        assert_eq!(self_cost(peak, "k a i .V."), Some(1.0));
        assert_eq!(self_cost(peak, "k .C."), Some(0.0));
    }

    #[test]
    fn ssp_accepts_rise_and_fall() {
        assert_eq!(self_cost(ssp, "k a .V."), Some(0.0));
        assert_eq!(self_cost(ssp, "k a n .C."), Some(0.0));
        assert_eq!(self_cost(ssp, "p r a .V."), Some(0.0));
        // Falling sonority in the onset breaks the scan.
        assert_eq!(self_cost(ssp, "r p a .V."), Some(1.0));
    }

    #[test]
    fn length_counts_extra_phones() {
        assert_eq!(self_cost(length, "k a n .C."), Some(0.0));
        assert_eq!(self_cost(length, "s t r a .V."), Some(1.0));
        assert_eq!(self_cost(length, "s t r a n .C."), Some(2.0));
        assert_eq!(self_cost(length, "k a .V. s t r a .V."), Some(1.0));
    }

    #[test]
    fn annotate_constraints_emit_markers() {
        let abc = alphabet(1.0);
        let fst = no_coda(&Builder::new(&abc, Mode::Annotate, true)).unwrap();
        assert!(maps(&abc, &fst, "k a t .C.", "k a t .C. <<NOCODA>>"));
        assert!(!maps(&abc, &fst, "k a t .C.", "k a t .C."));
    }
}
