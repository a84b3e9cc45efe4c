// Weighted determinization over encoded label pairs.

use std::collections::{BTreeMap, VecDeque};

use hashbrown::HashMap;

use crate::fst::VectorFst;
use crate::rmepsilon::rm_epsilon;
use crate::transition::decode_pair;
use crate::weight;
use crate::{FstError, StateId};

/// A determinized state: original states with their residual weights.
type Subset = Vec<(StateId, f64)>;

fn subset_key(subset: &Subset) -> Vec<(StateId, i64)> {
    subset.iter().map(|&(s, r)| (s, weight::quantize(r))).collect()
}

/// Determinizes `fst`, treating each `(ilabel, olabel)` pair as one symbol.
///
/// `ε:ε` arcs are removed first. The result has at most one arc per label
/// pair leaving each state, and every path keeps the minimum weight of the
/// equivalent paths in the input. Subset construction only terminates on
/// automatons without weighted cycles, so `max_states` bounds the result
/// and overflowing it is an error.
pub fn determinize(fst: &VectorFst, max_states: usize) -> Result<VectorFst, FstError> {
    let input = rm_epsilon(fst);
    let mut result = VectorFst::new();
    if input.is_empty() {
        return Ok(result);
    }

    let mut ids: HashMap<Vec<(StateId, i64)>, StateId> = HashMap::new();
    let mut queue: VecDeque<(StateId, Subset)> = VecDeque::new();

    let start: Subset = vec![(0, weight::ONE)];
    ids.insert(subset_key(&start), result.add_state());
    queue.push_back((0, start));

    while let Some((current, subset)) = queue.pop_front() {
        let mut final_weight: Option<f64> = None;
        // label pair -> (min arc weight, target -> min path weight)
        let mut moves: BTreeMap<u64, (f64, BTreeMap<StateId, f64>)> = BTreeMap::new();

        for &(q, residual) in &subset {
            if let Some(w) = input.final_weight(q) {
                let total = weight::times(residual, w);
                final_weight = Some(final_weight.map_or(total, |f| weight::plus(f, total)));
            }
            for t in input.transitions(q) {
                let total = weight::times(residual, t.weight);
                let entry = moves
                    .entry(t.encoded_label())
                    .or_insert_with(|| (weight::ZERO, BTreeMap::new()));
                entry.0 = weight::plus(entry.0, total);
                let target = entry.1.entry(t.target).or_insert(weight::ZERO);
                *target = weight::plus(*target, total);
            }
        }

        if let Some(w) = final_weight {
            result.set_final(current, w);
        }

        for (label, (arc_weight, targets)) in moves {
            let next: Subset = targets
                .into_iter()
                .map(|(s, w)| (s, (w - arc_weight).max(0.0)))
                .collect();
            let key = subset_key(&next);
            let next_id = match ids.get(&key) {
                Some(&id) => id,
                None => {
                    if result.num_states() >= max_states {
                        return Err(FstError::DeterminizeLimit { limit: max_states });
                    }
                    let id = result.add_state();
                    ids.insert(key, id);
                    queue.push_back((id, next));
                    id
                }
            };
            let (ilabel, olabel) = decode_pair(label);
            result.add_arc(current, next_id, ilabel, olabel, arc_weight);
        }
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shortest_path::accepted_paths;
    use crate::EPSILON;

    fn is_deterministic(fst: &VectorFst) -> bool {
        fst.states().all(|s| {
            let mut labels: Vec<u64> = fst.transitions(s).iter().map(|t| t.encoded_label()).collect();
            let before = labels.len();
            labels.sort_unstable();
            labels.dedup();
            labels.len() == before
        })
    }

    #[test]
    fn merges_shared_prefixes() {
        let seqs: Vec<Vec<u32>> = vec![vec![1, 2, 3], vec![1, 2, 4], vec![1, 5]];
        let fst = VectorFst::from_sequences(seqs.iter().map(Vec::as_slice));
        let det = determinize(&fst, 100).unwrap();
        assert!(is_deterministic(&det));
        assert_eq!(det.transitions(0).len(), 1);
        assert_eq!(accepted_paths(&det, 10).unwrap().len(), 3);
    }

    #[test]
    fn keeps_minimum_weight() {
        let mut fst = VectorFst::new();
        fst.add_arc(0, 1, 1, 1, 5.0);
        fst.add_arc(0, 2, 1, 1, 2.0);
        fst.set_final(1, 0.0);
        fst.set_final(2, 0.0);
        let det = determinize(&fst, 100).unwrap();
        let paths = accepted_paths(&det, 10).unwrap();
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0].weight, 2.0);
    }

    #[test]
    fn pairs_are_distinct_symbols() {
        let mut fst = VectorFst::new();
        fst.add_arc(0, 1, 1, 2, 0.0);
        fst.add_arc(0, 1, 1, EPSILON, 0.0);
        fst.set_final(1, 0.0);
        let det = determinize(&fst, 100).unwrap();
        assert_eq!(det.transitions(0).len(), 2);
    }

    #[test]
    fn state_limit_is_enforced() {
        let seqs: Vec<Vec<u32>> = (1..20).map(|i| vec![i, i, i]).collect();
        let fst = VectorFst::from_sequences(seqs.iter().map(Vec::as_slice));
        let err = determinize(&fst, 5).unwrap_err();
        assert!(matches!(err, FstError::DeterminizeLimit { limit: 5 }));
    }
}
