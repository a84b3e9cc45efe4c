// Relational composition with an epsilon-sequencing filter.

use std::borrow::Cow;
use std::collections::VecDeque;

use hashbrown::HashMap;

use crate::fst::{ArcSortType, VectorFst};
use crate::weight;
use crate::{EPSILON, StateId};

/// Filter state: 0 while the left operand may still take output-epsilon
/// moves, 1 once the right operand has taken an input-epsilon move.
type FilterState = u8;

type Triple = (StateId, StateId, FilterState);

/// Composes `left` with `right`: the result maps `x` to `z` with weight
/// `w1 + w2` whenever `left` maps `x` to `y` with `w1` and `right` maps `y`
/// to `z` with `w2`.
///
/// Between two real label matches, output-epsilon moves of `left` always
/// come before input-epsilon moves of `right`, so each alignment of the
/// two operands yields exactly one path. The result is trimmed; a relation
/// with no accepting path comes back with no states.
pub fn compose(left: &VectorFst, right: &VectorFst) -> VectorFst {
    let mut result = VectorFst::new();
    if left.is_empty() || right.is_empty() {
        return result;
    }

    let right: Cow<'_, VectorFst> = if right.is_arc_sorted(ArcSortType::Input) {
        Cow::Borrowed(right)
    } else {
        let mut sorted = right.clone();
        sorted.arc_sort(ArcSortType::Input);
        Cow::Owned(sorted)
    };

    let mut ids: HashMap<Triple, StateId> = HashMap::new();
    let mut queue: VecDeque<Triple> = VecDeque::new();

    let start = (0, 0, 0);
    ids.insert(start, result.add_state());
    queue.push_back(start);

    let mut lookup = |triple: Triple, result: &mut VectorFst, queue: &mut VecDeque<Triple>| {
        *ids.entry(triple).or_insert_with(|| {
            queue.push_back(triple);
            result.add_state()
        })
    };

    while let Some(triple @ (s1, s2, fs)) = queue.pop_front() {
        let current = lookup(triple, &mut result, &mut queue);

        if let (Some(w1), Some(w2)) = (left.final_weight(s1), right.final_weight(s2)) {
            result.set_final(current, weight::times(w1, w2));
        }

        let right_arcs = right.transitions(s2);
        for t1 in left.transitions(s1) {
            if t1.olabel == EPSILON {
                if fs == 0 {
                    let next = lookup((t1.target, s2, 0), &mut result, &mut queue);
                    result.add_arc(current, next, t1.ilabel, EPSILON, t1.weight);
                }
                continue;
            }
            let first = right_arcs.partition_point(|t| t.ilabel < t1.olabel);
            for t2 in right_arcs[first..].iter().take_while(|t| t.ilabel == t1.olabel) {
                let next = lookup((t1.target, t2.target, 0), &mut result, &mut queue);
                result.add_arc(
                    current,
                    next,
                    t1.ilabel,
                    t2.olabel,
                    weight::times(t1.weight, t2.weight),
                );
            }
        }

        for t2 in right_arcs.iter().take_while(|t| t.ilabel == EPSILON) {
            let next = lookup((s1, t2.target, 1), &mut result, &mut queue);
            result.add_arc(current, next, EPSILON, t2.olabel, t2.weight);
        }
    }

    result.connect();
    tracing::trace!(
        states = result.num_states(),
        arcs = result.num_arcs(),
        "composed"
    );
    result
}
