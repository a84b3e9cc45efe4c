// Epsilon removal.

use std::collections::BinaryHeap;

use hashbrown::HashMap;

use crate::fst::VectorFst;
use crate::weight::{self, MinEntry};
use crate::StateId;

/// Shortest `ε:ε` distances from `source` to every state reachable through
/// epsilon arcs alone (including `source` itself at distance 0).
fn epsilon_closure(fst: &VectorFst, source: StateId) -> Vec<(StateId, f64)> {
    let mut dist: HashMap<StateId, f64> = HashMap::new();
    let mut done: HashMap<StateId, f64> = HashMap::new();
    let mut heap = BinaryHeap::new();
    let mut seq = 0u64;

    dist.insert(source, weight::ONE);
    heap.push(MinEntry { priority: weight::ONE, seq, item: source });

    while let Some(MinEntry { priority, item: s, .. }) = heap.pop() {
        if done.contains_key(&s) {
            continue;
        }
        done.insert(s, priority);
        for t in fst.transitions(s).iter().filter(|t| t.is_epsilon()) {
            let candidate = weight::times(priority, t.weight);
            let better = dist.get(&t.target).is_none_or(|&d| candidate < d);
            if better && !done.contains_key(&t.target) {
                dist.insert(t.target, candidate);
                seq += 1;
                heap.push(MinEntry { priority: candidate, seq, item: t.target });
            }
        }
    }

    let mut closure: Vec<(StateId, f64)> = done.into_iter().collect();
    closure.sort_by_key(|&(s, _)| s);
    closure
}

/// Returns an equivalent automaton without `ε:ε` arcs.
///
/// Arcs with epsilon on only one side are kept. Weights of removed epsilon
/// paths are folded into the arcs and final weights that follow them.
pub fn rm_epsilon(fst: &VectorFst) -> VectorFst {
    let mut result = VectorFst::new();
    if fst.is_empty() {
        return result;
    }
    for _ in fst.states() {
        result.add_state();
    }

    for s in fst.states() {
        let closure = epsilon_closure(fst, s);
        let mut final_weight: Option<f64> = None;
        for &(q, d) in &closure {
            if let Some(w) = fst.final_weight(q) {
                let total = weight::times(d, w);
                final_weight = Some(final_weight.map_or(total, |f| weight::plus(f, total)));
            }
            for t in fst.transitions(q).iter().filter(|t| !t.is_epsilon()) {
                result.add_arc(s, t.target, t.ilabel, t.olabel, weight::times(d, t.weight));
            }
        }
        if let Some(w) = final_weight {
            result.set_final(s, w);
        }
    }

    result.connect();
    result
}
