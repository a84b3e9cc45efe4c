// Segmental operations: substitution, insertion and deletion of phones.

use loanword_core::Dimension;
use loanword_core::weights::{
    DEP_IO, IDENT_CONSONANT, IDENT_GLOTTAL, IDENT_MANNER, IDENT_PHARYNGEAL, IDENT_PHARYNGEALIZED,
    IDENT_PLACE, IDENT_SONORITY, IDENT_VOICED, IDENT_VOWEL, MAX_IO, MAX_V, RO_MORPH,
};
use loanword_fst::weight::ONE;
use loanword_fst::{EPSILON, Label, VectorFst};

use super::{Builder, identity_arcs};
use crate::error::OtError;

/// Pairs two label sequences position by position, padding the shorter one
/// with epsilon.
fn align(source: &[Label], target: &[Label]) -> Vec<(Label, Label)> {
    (0..source.len().max(target.len()))
        .map(|i| {
            (
                source.get(i).copied().unwrap_or(EPSILON),
                target.get(i).copied().unwrap_or(EPSILON),
            )
        })
        .collect()
}

/// Deletes the second of two identical consonants, marking `<<MAX-IO>>`.
pub fn degemination(b: &Builder<'_>) -> Result<VectorFst, OtError> {
    let abc = b.alphabet;
    let mut fst = VectorFst::new();
    fst.add_state();
    identity_arcs(&mut fst, 0, 0, &b.base_symbols());
    for c in abc.consonants() {
        let kept = fst.add_state();
        let dropped = fst.add_state();
        fst.add_arc(0, kept, c, c, ONE);
        fst.add_arc(kept, dropped, c, EPSILON, ONE);
        b.violation(&mut fst, dropped, 0, MAX_IO)?;
    }
    fst.set_final(0, ONE);
    Ok(b.finish(fst))
}

/// Replaces a phone sequence by a similar one from the profile table.
///
/// Each candidate is one chain of aligned pairs followed by its identity
/// violations: manner, place, sonority and voicing mismatches, then exactly
/// one of the vowel or consonant identity markers, then the place-class
/// marker when the source is a single pharyngeal, pharyngealized or glottal
/// phone.
pub fn phone_substitution(b: &Builder<'_>) -> Result<VectorFst, OtError> {
    let abc = b.alphabet;
    let mut fst = VectorFst::new();
    fst.add_state();
    identity_arcs(&mut fst, 0, 0, &b.base_symbols());

    let differs = |s: Label, t: Label, dim: Dimension| {
        s != EPSILON && t != EPSILON && abc.categorize(s, dim) != abc.categorize(t, dim)
    };

    for (source, target) in abc.similar_phones() {
        let mut manner = false;
        let mut place = false;
        let mut sonority = false;
        let mut voiced = false;

        let mut current = 0;
        for (s, t) in align(source, target) {
            let next = fst.add_state();
            fst.add_arc(current, next, s, t, ONE);
            current = next;

            manner = manner || differs(s, t, Dimension::Manner);
            place = place || differs(s, t, Dimension::Place);
            sonority = differs(s, t, Dimension::Sonority);
            // Voicing only counts while the segment keeps manner and place.
            if !(manner || place) {
                voiced = differs(s, t, Dimension::Voicing);
            }
        }

        let mut markers: Vec<&str> = [
            (manner, IDENT_MANNER),
            (place, IDENT_PLACE),
            (sonority, IDENT_SONORITY),
            (voiced, IDENT_VOICED),
        ]
        .into_iter()
        .filter_map(|(hit, name)| hit.then_some(name))
        .collect();
        let violated = !markers.is_empty();

        let single_vowel = |seq: &[Label]| seq.len() == 1 && abc.is_vowel(seq[0]);
        if single_vowel(source) || (single_vowel(target) && !violated) {
            markers.push(IDENT_VOWEL);
        } else {
            markers.push(IDENT_CONSONANT);
        }

        if let [phone] = source.as_slice() {
            if abc.is_pharyngeal(*phone) {
                markers.push(IDENT_PHARYNGEAL);
            } else if abc.is_pharyngealized(*phone) {
                markers.push(IDENT_PHARYNGEALIZED);
            } else if abc.is_glottal(*phone) {
                markers.push(IDENT_GLOTTAL);
            }
        }

        for name in markers {
            let next = fst.add_state();
            b.violation(&mut fst, current, next, name)?;
            current = next;
        }
        fst.add_arc(current, 0, EPSILON, EPSILON, ONE);
    }

    fst.set_final(0, ONE);
    Ok(b.finish(fst))
}

/// Inserts a vowel after a consonant that is followed by another consonant
/// or ends the word, marking `<<DEP-IO>>` per inserted vowel.
pub fn epenthesis(b: &Builder<'_>) -> Result<VectorFst, OtError> {
    let abc = b.alphabet;
    let mut fst = VectorFst::new();
    let (start, after_consonant, inserted) = (fst.add_state(), fst.add_state(), fst.add_state());
    identity_arcs(&mut fst, start, start, &b.base_symbols());
    let consonants = abc.consonants();
    identity_arcs(&mut fst, start, after_consonant, &consonants);
    identity_arcs(&mut fst, inserted, start, &consonants);
    for v in abc.vowels() {
        let vowel = fst.add_state();
        fst.add_arc(after_consonant, vowel, EPSILON, v, ONE);
        b.violation(&mut fst, vowel, inserted, DEP_IO)?;
    }
    fst.set_final(start, ONE);
    fst.set_final(inserted, ONE);
    Ok(b.finish(fst))
}

/// Rewrites the end of the word with an entry of the final-vowel table,
/// marking `<<RO_MORPH>>`. Either side of an entry may be empty.
pub fn final_vowel_substitution(b: &Builder<'_>) -> Result<VectorFst, OtError> {
    let abc = b.alphabet;
    let base = b.base_symbols();
    let mut fst = VectorFst::new();
    let (start, end) = (fst.add_state(), fst.add_state());
    identity_arcs(&mut fst, start, start, &base);
    identity_arcs(&mut fst, start, end, &base);
    for (source, target) in abc.final_vowels() {
        let mut current = start;
        for (s, t) in align(source, target) {
            let next = fst.add_state();
            fst.add_arc(current, next, s, t, ONE);
            current = next;
        }
        b.violation(&mut fst, current, end, RO_MORPH)?;
    }
    identity_arcs(&mut fst, end, end, &abc.boundaries());
    fst.set_final(end, ONE);
    Ok(b.finish(fst))
}

/// Deletes any vowel, marking `<<MAX-V>>` per deletion.
pub fn vowel_deletion(b: &Builder<'_>) -> Result<VectorFst, OtError> {
    let mut fst = VectorFst::new();
    fst.add_state();
    identity_arcs(&mut fst, 0, 0, &b.base_symbols());
    for v in b.alphabet.vowels() {
        let deleted = fst.add_state();
        fst.add_arc(0, deleted, v, EPSILON, ONE);
        b.violation(&mut fst, deleted, 0, MAX_V)?;
    }
    fst.set_final(0, ONE);
    Ok(b.finish(fst))
}

/// Accepts only words with at least `k` consonants.
pub fn min_consonant_count(b: &Builder<'_>, k: usize) -> Result<VectorFst, OtError> {
    let base = b.base_symbols();
    let consonants = b.alphabet.consonants();
    let mut fst = VectorFst::new();
    fst.add_state();
    for i in 0..=k as u32 {
        identity_arcs(&mut fst, i, i, &base);
        if i > 0 {
            identity_arcs(&mut fst, i - 1, i, &consonants);
        }
    }
    fst.set_final(k as u32, ONE);
    Ok(b.finish(fst))
}
