// Mutable vector-backed transducer and the rational operations.

use serde::{Deserialize, Serialize};

use crate::transition::Transition;
use crate::weight::{self, ONE};
use crate::{EPSILON, Label, StateId};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct State {
    final_weight: Option<f64>,
    transitions: Vec<Transition>,
}

/// Which side of the arcs to sort on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArcSortType {
    Input,
    Output,
}

/// Which side of the relation to keep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectType {
    Input,
    Output,
}

/// Weighted transducer stored as a vector of states.
///
/// State 0 is the start state; an automaton without states accepts nothing.
/// States are created on demand by [`VectorFst::add_arc`] and
/// [`VectorFst::set_final`].
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VectorFst {
    states: Vec<State>,
}

impl std::fmt::Debug for VectorFst {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorFst")
            .field("num_states", &self.num_states())
            .field("num_arcs", &self.num_arcs())
            .field("num_finals", &self.finals().count())
            .finish()
    }
}

impl VectorFst {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acceptor for exactly one label sequence.
    pub fn linear_chain(labels: &[Label]) -> Self {
        let mut fst = Self::new();
        fst.add_state();
        fst.add_chain(0, labels.iter().map(|&l| (l, l)), 0.0);
        fst
    }

    /// Acceptor for a set of label sequences.
    ///
    /// Every sequence gets its own branch out of the start state, so the
    /// result is non-deterministic; minimize it when that matters.
    pub fn from_sequences<'a, I>(sequences: I) -> Self
    where
        I: IntoIterator<Item = &'a [Label]>,
    {
        let mut fst = Self::new();
        fst.add_state();
        for seq in sequences {
            fst.add_chain(0, seq.iter().map(|&l| (l, l)), 0.0);
        }
        fst
    }

    /// Appends a branch of `pairs` starting at `from` that ends in a new final
    /// state with `final_weight`. Returns that final state.
    pub fn add_chain<I>(&mut self, from: StateId, pairs: I, final_weight: f64) -> StateId
    where
        I: IntoIterator<Item = (Label, Label)>,
    {
        let mut current = from;
        for (ilabel, olabel) in pairs {
            let next = self.add_state();
            self.add_arc(current, next, ilabel, olabel, ONE);
            current = next;
        }
        if current == from {
            // An empty branch makes `from` itself final.
            let merged = match self.final_weight(from) {
                Some(w) => weight::plus(w, final_weight),
                None => final_weight,
            };
            self.set_final(from, merged);
        } else {
            self.set_final(current, final_weight);
        }
        current
    }

    pub fn add_state(&mut self) -> StateId {
        self.states.push(State::default());
        (self.states.len() - 1) as StateId
    }

    fn ensure_state(&mut self, s: StateId) {
        let needed = s as usize + 1;
        if self.states.len() < needed {
            self.states.resize_with(needed, State::default);
        }
    }

    pub fn add_arc(&mut self, from: StateId, to: StateId, ilabel: Label, olabel: Label, weight: f64) {
        self.ensure_state(from.max(to));
        self.states[from as usize]
            .transitions
            .push(Transition::new(ilabel, olabel, weight, to));
    }

    pub fn set_final(&mut self, s: StateId, weight: f64) {
        self.ensure_state(s);
        self.states[s as usize].final_weight = Some(weight);
    }

    pub fn clear_final(&mut self, s: StateId) {
        if let Some(state) = self.states.get_mut(s as usize) {
            state.final_weight = None;
        }
    }

    pub fn final_weight(&self, s: StateId) -> Option<f64> {
        self.states.get(s as usize).and_then(|st| st.final_weight)
    }

    pub fn is_final(&self, s: StateId) -> bool {
        self.final_weight(s).is_some()
    }

    pub fn transitions(&self, s: StateId) -> &[Transition] {
        self.states
            .get(s as usize)
            .map(|st| st.transitions.as_slice())
            .unwrap_or(&[])
    }

    pub fn num_states(&self) -> usize {
        self.states.len()
    }

    pub fn num_arcs(&self) -> usize {
        self.states.iter().map(|s| s.transitions.len()).sum()
    }

    /// True when the automaton has no states. Results of [`crate::compose`]
    /// are trimmed, so an empty relation always shows up as no states.
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn states(&self) -> impl Iterator<Item = StateId> {
        0..self.states.len() as StateId
    }

    /// `(state, final weight)` of every final state.
    pub fn finals(&self) -> impl Iterator<Item = (StateId, f64)> + '_ {
        self.states
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.final_weight.map(|w| (i as StateId, w)))
    }

    fn start_has_incoming(&self) -> bool {
        self.states
            .iter()
            .any(|s| s.transitions.iter().any(|t| t.target == 0))
    }

    /// Appends the states of `other` with their ids shifted by the current
    /// state count; returns the shift.
    fn append_states(&mut self, other: &VectorFst) -> StateId {
        let offset = self.states.len() as StateId;
        self.states.extend(other.states.iter().map(|s| State {
            final_weight: s.final_weight,
            transitions: s
                .transitions
                .iter()
                .map(|t| Transition { target: t.target + offset, ..*t })
                .collect(),
        }));
        offset
    }

    /// Moves every state up by one and makes the new state 0 an
    /// epsilon-linked start that nothing re-enters.
    fn push_fresh_start(&mut self) {
        let old = std::mem::take(&mut self.states);
        let shifted = VectorFst { states: old };
        self.states.push(State::default());
        let offset = self.append_states(&shifted);
        self.add_arc(0, offset, EPSILON, EPSILON, ONE);
    }

    /// Union in place: accepts what either operand accepts.
    pub fn union(&mut self, other: &VectorFst) {
        if other.is_empty() {
            return;
        }
        if self.is_empty() {
            *self = other.clone();
            return;
        }
        if self.start_has_incoming() {
            self.push_fresh_start();
        }
        let offset = self.append_states(other);
        self.add_arc(0, offset, EPSILON, EPSILON, ONE);
    }

    /// Concatenation in place: a path of `self` followed by a path of `other`.
    pub fn concat(&mut self, other: &VectorFst) {
        if self.is_empty() {
            return;
        }
        if other.is_empty() {
            self.states.clear();
            return;
        }
        let finals: Vec<(StateId, f64)> = self.finals().collect();
        let offset = self.append_states(other);
        for (s, w) in finals {
            self.clear_final(s);
            self.add_arc(s, offset, EPSILON, EPSILON, w);
        }
    }

    /// Kleene star in place.
    pub fn closure(&mut self) {
        if self.is_empty() {
            self.add_state();
            self.set_final(0, ONE);
            return;
        }
        if self.start_has_incoming() {
            self.push_fresh_start();
        }
        let finals: Vec<(StateId, f64)> = self.finals().filter(|&(s, _)| s != 0).collect();
        for (s, w) in finals {
            self.add_arc(s, 0, EPSILON, EPSILON, w);
        }
        self.set_final(0, ONE);
    }

    /// Stable sort of every state's arcs by the chosen label.
    pub fn arc_sort(&mut self, sort_type: ArcSortType) {
        for state in &mut self.states {
            match sort_type {
                ArcSortType::Input => state.transitions.sort_by_key(|t| (t.ilabel, t.olabel)),
                ArcSortType::Output => state.transitions.sort_by_key(|t| (t.olabel, t.ilabel)),
            }
        }
    }

    pub fn is_arc_sorted(&self, sort_type: ArcSortType) -> bool {
        self.states.iter().all(|s| {
            s.transitions.windows(2).all(|w| match sort_type {
                ArcSortType::Input => w[0].ilabel <= w[1].ilabel,
                ArcSortType::Output => w[0].olabel <= w[1].olabel,
            })
        })
    }

    /// Copies one side of every arc onto the other.
    pub fn project(&mut self, project_type: ProjectType) {
        for state in &mut self.states {
            for t in &mut state.transitions {
                match project_type {
                    ProjectType::Input => t.olabel = t.ilabel,
                    ProjectType::Output => t.ilabel = t.olabel,
                }
            }
        }
    }

    /// Removes states that are not on some path from the start to a final
    /// state, renumbering the survivors in their original order.
    pub fn connect(&mut self) {
        let n = self.states.len();
        if n == 0 {
            return;
        }

        let mut accessible = vec![false; n];
        let mut stack = vec![0usize];
        accessible[0] = true;
        while let Some(s) = stack.pop() {
            for t in &self.states[s].transitions {
                let next = t.target as usize;
                if !accessible[next] {
                    accessible[next] = true;
                    stack.push(next);
                }
            }
        }

        let mut predecessors: Vec<Vec<usize>> = vec![Vec::new(); n];
        for (s, state) in self.states.iter().enumerate() {
            for t in &state.transitions {
                predecessors[t.target as usize].push(s);
            }
        }
        let mut coaccessible = vec![false; n];
        let mut stack: Vec<usize> = self.finals().map(|(s, _)| s as usize).collect();
        for &s in &stack {
            coaccessible[s] = true;
        }
        while let Some(s) = stack.pop() {
            for &p in &predecessors[s] {
                if !coaccessible[p] {
                    coaccessible[p] = true;
                    stack.push(p);
                }
            }
        }

        if !(accessible[0] && coaccessible[0]) {
            self.states.clear();
            return;
        }

        let mut remap = vec![None; n];
        let mut next_id: StateId = 0;
        for s in 0..n {
            if accessible[s] && coaccessible[s] {
                remap[s] = Some(next_id);
                next_id += 1;
            }
        }
        let old = std::mem::take(&mut self.states);
        self.states = old
            .into_iter()
            .enumerate()
            .filter(|(s, _)| remap[*s].is_some())
            .map(|(_, state)| State {
                final_weight: state.final_weight,
                transitions: state
                    .transitions
                    .into_iter()
                    .filter_map(|t| remap[t.target as usize].map(|target| Transition { target, ..t }))
                    .collect(),
            })
            .collect();
    }
}
