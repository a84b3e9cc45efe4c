// Minimization by partition refinement.

use hashbrown::HashMap;

use crate::fst::VectorFst;
use crate::weight;
use crate::StateId;

/// Class signature: previous class, quantized final weight and the set of
/// `(label pair, quantized weight, target class)` moves.
type Signature = (usize, Option<i64>, Vec<(u64, i64, usize)>);

/// Merges states that accept the same weighted continuations.
///
/// Refinement starts from the final-weight partition and splits classes
/// until every state of a class has the same moves into the same classes.
/// On a deterministic automaton this gives the minimal automaton for its
/// weight distribution; on any other input the result is still equivalent.
pub fn minimize(fst: &VectorFst) -> VectorFst {
    let mut input = fst.clone();
    input.connect();
    let n = input.num_states();
    if n == 0 {
        return input;
    }

    let mut class: Vec<usize> = vec![0; n];
    let mut num_classes = 0;
    loop {
        let mut ids: HashMap<Signature, usize> = HashMap::new();
        let mut next: Vec<usize> = Vec::with_capacity(n);
        for s in input.states() {
            let mut moves: Vec<(u64, i64, usize)> = input
                .transitions(s)
                .iter()
                .map(|t| (t.encoded_label(), weight::quantize(t.weight), class[t.target as usize]))
                .collect();
            moves.sort_unstable();
            moves.dedup();
            let signature = (class[s as usize], input.final_weight(s).map(weight::quantize), moves);
            let len = ids.len();
            next.push(*ids.entry(signature).or_insert(len));
        }
        let refined = ids.len();
        class = next;
        if refined == num_classes {
            break;
        }
        num_classes = refined;
    }

    // Renumber classes so the start state's class becomes state 0.
    let mut order: Vec<Option<StateId>> = vec![None; num_classes];
    let mut next_id: StateId = 0;
    order[class[0]] = Some(next_id);
    next_id += 1;
    for s in 0..n {
        if order[class[s]].is_none() {
            order[class[s]] = Some(next_id);
            next_id += 1;
        }
    }
    let id_of = |s: usize| order[class[s]].unwrap_or_default();

    let mut result = VectorFst::new();
    for _ in 0..num_classes {
        result.add_state();
    }
    let mut emitted = vec![false; num_classes];
    for s in 0..n {
        let c = class[s];
        if emitted[c] {
            continue;
        }
        emitted[c] = true;
        let from = id_of(s);
        if let Some(w) = input.final_weight(s as StateId) {
            result.set_final(from, w);
        }
        let mut seen: Vec<(u64, i64, StateId)> = Vec::new();
        for t in input.transitions(s as StateId) {
            let to = id_of(t.target as usize);
            let key = (t.encoded_label(), weight::quantize(t.weight), to);
            if seen.contains(&key) {
                continue;
            }
            seen.push(key);
            result.add_arc(from, to, t.ilabel, t.olabel, t.weight);
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::determinize::determinize;
    use crate::shortest_path::accepted_paths;

    #[test]
    fn merges_common_suffixes() {
        let seqs: Vec<Vec<u32>> = vec![vec![1, 9], vec![2, 9], vec![3, 9]];
        let fst = VectorFst::from_sequences(seqs.iter().map(Vec::as_slice));
        let det = determinize(&fst, 100).unwrap();
        let min = minimize(&det);
        assert_eq!(min.num_states(), 3);
        assert_eq!(accepted_paths(&min, 10).unwrap().len(), 3);
    }

    #[test]
    fn different_weights_stay_apart() {
        let mut fst = VectorFst::new();
        fst.add_arc(0, 1, 1, 1, 0.0);
        fst.add_arc(0, 2, 2, 2, 0.0);
        fst.set_final(1, 0.0);
        fst.set_final(2, 1.0);
        let min = minimize(&fst);
        assert_eq!(min.num_states(), 3);
    }

    #[test]
    fn start_stays_state_zero() {
        let mut fst = VectorFst::new();
        fst.add_arc(0, 1, 1, 1, 0.0);
        fst.add_arc(1, 2, 1, 1, 0.0);
        fst.set_final(2, 0.0);
        let min = minimize(&fst);
        assert_eq!(min.transitions(0).len(), 1);
        assert!(!min.is_final(0));
        let paths = accepted_paths(&min, 10).unwrap();
        assert_eq!(paths[0].input_labels(), vec![1, 1]);
    }

    #[test]
    fn empty_stays_empty() {
        assert!(minimize(&VectorFst::new()).is_empty());
    }
}
