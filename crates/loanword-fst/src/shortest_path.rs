// N-best path search and exhaustive path enumeration.

use std::collections::BinaryHeap;

use crate::fst::VectorFst;
use crate::transition::Transition;
use crate::weight::{self, MinEntry};
use crate::{EPSILON, FstError, Label, StateId};

/// Default bound on heap pops during n-best search.
pub const MAX_POP_COUNT: usize = 1_000_000;

/// One accepting path: its arcs in order and its total weight (arc weights
/// plus the final weight of the last state).
#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    pub transitions: Vec<Transition>,
    pub weight: f64,
}

impl Path {
    /// Non-epsilon input labels.
    pub fn input_labels(&self) -> Vec<Label> {
        self.transitions
            .iter()
            .map(|t| t.ilabel)
            .filter(|&l| l != EPSILON)
            .collect()
    }

    /// Non-epsilon output labels.
    pub fn output_labels(&self) -> Vec<Label> {
        self.transitions
            .iter()
            .map(|t| t.olabel)
            .filter(|&l| l != EPSILON)
            .collect()
    }
}

/// Cost of the cheapest completion from every state to acceptance
/// (`weight::ZERO` where acceptance is impossible).
pub fn distance_to_final(fst: &VectorFst) -> Vec<f64> {
    let n = fst.num_states();
    let mut predecessors: Vec<Vec<(StateId, f64)>> = vec![Vec::new(); n];
    for s in fst.states() {
        for t in fst.transitions(s) {
            predecessors[t.target as usize].push((s, t.weight));
        }
    }

    let mut dist = vec![weight::ZERO; n];
    let mut done = vec![false; n];
    let mut heap = BinaryHeap::new();
    let mut seq = 0u64;
    for (s, w) in fst.finals() {
        if w < dist[s as usize] {
            dist[s as usize] = w;
            heap.push(MinEntry { priority: w, seq, item: s });
            seq += 1;
        }
    }

    while let Some(MinEntry { priority, item: s, .. }) = heap.pop() {
        if done[s as usize] {
            continue;
        }
        done[s as usize] = true;
        for &(p, w) in &predecessors[s as usize] {
            let candidate = weight::times(w, priority);
            if candidate < dist[p as usize] {
                dist[p as usize] = candidate;
                heap.push(MinEntry { priority: candidate, seq, item: p });
                seq += 1;
            }
        }
    }
    dist
}

/// A node of the search tree: the arc that reached `state` from `parent`.
struct Node {
    state: StateId,
    parent: Option<usize>,
    transition: Option<Transition>,
    cost: f64,
}

#[derive(Clone, Copy)]
enum Item {
    /// Expand the node's outgoing arcs.
    Expand(usize),
    /// The node's state is final; popping this reports the path.
    Complete(usize),
}

/// The `n` lowest-weight accepting paths, in non-decreasing weight order.
///
/// Best-first search over partial paths, guided by the exact distance to
/// acceptance. Equal-weight candidates leave the queue in the order they
/// were discovered. Paths are not deduplicated by label content. The search
/// stops after `max_pops` heap pops even if fewer than `n` paths were found.
pub fn n_shortest_paths(fst: &VectorFst, n: usize, max_pops: usize) -> Vec<Path> {
    let mut paths = Vec::new();
    if fst.is_empty() || n == 0 {
        return paths;
    }

    let heuristic = distance_to_final(fst);
    if heuristic[0].is_infinite() {
        return paths;
    }

    let mut nodes: Vec<Node> = vec![Node {
        state: 0,
        parent: None,
        transition: None,
        cost: weight::ONE,
    }];
    let mut expansions = vec![0usize; fst.num_states()];
    let mut heap = BinaryHeap::new();
    let mut seq = 0u64;
    heap.push(MinEntry { priority: heuristic[0], seq, item: Item::Expand(0) });

    let mut pops = 0;
    while let Some(MinEntry { item, .. }) = heap.pop() {
        pops += 1;
        if pops > max_pops {
            tracing::debug!(max_pops, found = paths.len(), "n-best search hit pop limit");
            break;
        }
        match item {
            Item::Complete(idx) => {
                paths.push(rebuild(&nodes, idx, fst));
                if paths.len() >= n {
                    break;
                }
            }
            Item::Expand(idx) => {
                let state = nodes[idx].state;
                let cost = nodes[idx].cost;
                if expansions[state as usize] >= n {
                    continue;
                }
                expansions[state as usize] += 1;

                if let Some(w) = fst.final_weight(state) {
                    seq += 1;
                    heap.push(MinEntry {
                        priority: weight::times(cost, w),
                        seq,
                        item: Item::Complete(idx),
                    });
                }
                for t in fst.transitions(state) {
                    let h = heuristic[t.target as usize];
                    if h.is_infinite() {
                        continue;
                    }
                    let child_cost = weight::times(cost, t.weight);
                    nodes.push(Node {
                        state: t.target,
                        parent: Some(idx),
                        transition: Some(*t),
                        cost: child_cost,
                    });
                    seq += 1;
                    heap.push(MinEntry {
                        priority: weight::times(child_cost, h),
                        seq,
                        item: Item::Expand(nodes.len() - 1),
                    });
                }
            }
        }
    }
    paths
}

fn rebuild(nodes: &[Node], leaf: usize, fst: &VectorFst) -> Path {
    let mut transitions = Vec::new();
    let mut cursor = Some(leaf);
    while let Some(idx) = cursor {
        if let Some(t) = nodes[idx].transition {
            transitions.push(t);
        }
        cursor = nodes[idx].parent;
    }
    transitions.reverse();
    let final_weight = fst.final_weight(nodes[leaf].state).unwrap_or(weight::ZERO);
    Path {
        transitions,
        weight: weight::times(nodes[leaf].cost, final_weight),
    }
}

/// Every accepting path of an acyclic automaton, in depth-first order.
///
/// Fails with [`FstError::Cyclic`] on a reachable cycle and with
/// [`FstError::PathLimit`] once more than `limit` paths were produced.
pub fn accepted_paths(fst: &VectorFst, limit: usize) -> Result<Vec<Path>, FstError> {
    let mut paths = Vec::new();
    if fst.is_empty() {
        return Ok(paths);
    }
    let mut on_stack = vec![false; fst.num_states()];
    let mut prefix = Vec::new();
    walk(fst, 0, weight::ONE, &mut prefix, &mut on_stack, &mut paths, limit)?;
    Ok(paths)
}

fn walk(
    fst: &VectorFst,
    state: StateId,
    cost: f64,
    prefix: &mut Vec<Transition>,
    on_stack: &mut [bool],
    paths: &mut Vec<Path>,
    limit: usize,
) -> Result<(), FstError> {
    if on_stack[state as usize] {
        return Err(FstError::Cyclic);
    }
    on_stack[state as usize] = true;

    if let Some(w) = fst.final_weight(state) {
        if paths.len() >= limit {
            return Err(FstError::PathLimit { limit });
        }
        paths.push(Path {
            transitions: prefix.clone(),
            weight: weight::times(cost, w),
        });
    }
    for t in fst.transitions(state) {
        prefix.push(*t);
        walk(fst, t.target, weight::times(cost, t.weight), prefix, on_stack, paths, limit)?;
        prefix.pop();
    }

    on_stack[state as usize] = false;
    Ok(())
}
