// Affix stripping on the source side and affix attachment on the target side.

use loanword_core::weights::{SOURCE_MORPH, TARGET_MORPH};
use loanword_fst::weight::ONE;
use loanword_fst::{EPSILON, Label, VectorFst};

use super::{Builder, add_boundary_loops, identity_arcs};
use crate::error::OtError;

#[derive(Clone, Copy)]
enum Edit {
    Strip,
    Append,
}

/// Optional removal (or insertion) of one affix from `affixes`, each
/// costing one `name` violation.
fn affix_slot(
    b: &Builder<'_>,
    affixes: &[Vec<Label>],
    edit: Edit,
    name: &str,
) -> Result<VectorFst, OtError> {
    let mut fst = VectorFst::new();
    fst.add_state();
    fst.set_final(0, ONE);
    for affix in affixes {
        let mut current = 0;
        for &l in affix {
            let next = fst.add_state();
            match edit {
                Edit::Strip => fst.add_arc(current, next, l, EPSILON, ONE),
                Edit::Append => fst.add_arc(current, next, EPSILON, l, ONE),
            }
            current = next;
        }
        let done = fst.add_state();
        b.violation(&mut fst, current, done, name)?;
        fst.set_final(done, ONE);
    }
    Ok(fst)
}

fn stem(b: &Builder<'_>) -> VectorFst {
    let mut fst = VectorFst::new();
    fst.add_state();
    identity_arcs(&mut fst, 0, 0, &b.base_symbols());
    fst.set_final(0, ONE);
    fst
}

fn around_stem(
    b: &Builder<'_>,
    prefixes: &[Vec<Label>],
    suffixes: &[Vec<Label>],
    edit: Edit,
    name: &str,
) -> Result<VectorFst, OtError> {
    let mut fst = affix_slot(b, prefixes, edit, name)?;
    fst.concat(&stem(b));
    fst.concat(&affix_slot(b, suffixes, edit, name)?);
    if b.with_syllabification {
        add_boundary_loops(&mut fst, b.alphabet);
    }
    Ok(b.finish(fst))
}

/// Strips at most one source prefix and one source suffix, marking
/// `<<IT_MORPH>>` per stripped affix.
pub fn source_morphology(b: &Builder<'_>) -> Result<VectorFst, OtError> {
    let affixes = b.alphabet.affixes();
    around_stem(
        b,
        &affixes.source_prefixes,
        &affixes.source_suffixes,
        Edit::Strip,
        SOURCE_MORPH,
    )
}

/// Attaches at most one target prefix and one target suffix, marking
/// `<<MT_MORPH>>` per attached affix.
pub fn target_morphology(b: &Builder<'_>) -> Result<VectorFst, OtError> {
    let affixes = b.alphabet.affixes();
    around_stem(
        b,
        &affixes.target_prefixes,
        &affixes.target_suffixes,
        Edit::Append,
        TARGET_MORPH,
    )
}
