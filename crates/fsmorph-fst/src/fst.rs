// The weighted FST graph.
//
// States are owned by the FST and referenced by index everywhere, so
// the automaton graph may contain cycles without any ownership cycle.

use std::fmt;

use hashbrown::HashMap;

use fsmorph_core::{Semiring, Weight};

use crate::segment::SegmentationUnits;
use crate::FstError;

pub type StateId = usize;

/// An arc label: a literal symbol (possibly a multi-character
/// segmentation unit) or epsilon, spelled `--` in the text formats.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Label {
    Epsilon,
    Sym(String),
}

impl Label {
    pub fn sym(s: impl Into<String>) -> Self {
        Label::Sym(s.into())
    }

    /// Parse the text-format spelling: `--` is epsilon.
    pub fn parse(s: &str) -> Self {
        if s == "--" {
            Label::Epsilon
        } else {
            Label::Sym(s.to_string())
        }
    }

    pub fn is_epsilon(&self) -> bool {
        matches!(self, Label::Epsilon)
    }

    pub fn as_sym(&self) -> Option<&str> {
        match self {
            Label::Sym(s) => Some(s),
            Label::Epsilon => None,
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Epsilon => write!(f, "--"),
            Label::Sym(s) => write!(f, "{s}"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Arc {
    pub input: Label,
    pub output: Label,
    pub target: StateId,
    pub weight: Weight,
}

#[derive(Clone, Debug)]
pub struct State {
    pub label: String,
    pub is_final: bool,
    pub arcs: Vec<Arc>,
}

/// A weighted finite-state transducer: one initial state, any number of
/// final states, arcs carrying input/output labels and a weight from
/// the FST's semiring.
#[derive(Clone)]
pub struct Fst {
    label: String,
    semiring: Semiring,
    states: Vec<State>,
    by_label: HashMap<String, StateId>,
    initial: Option<StateId>,
}

impl Fst {
    pub fn new(label: impl Into<String>, semiring: Semiring) -> Self {
        Fst {
            label: label.into(),
            semiring,
            states: Vec::new(),
            by_label: HashMap::new(),
            initial: None,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn set_label(&mut self, label: impl Into<String>) {
        self.label = label.into();
    }

    pub fn semiring(&self) -> Semiring {
        self.semiring
    }

    pub fn num_states(&self) -> usize {
        self.states.len()
    }

    pub fn num_arcs(&self) -> usize {
        self.states.iter().map(|s| s.arcs.len()).sum()
    }

    /// Index of the state with this label, creating it if necessary.
    /// The first state ever created becomes the initial state.
    pub fn state(&mut self, label: &str) -> StateId {
        if let Some(&id) = self.by_label.get(label) {
            return id;
        }
        let id = self.states.len();
        self.states.push(State {
            label: label.to_string(),
            is_final: false,
            arcs: Vec::new(),
        });
        self.by_label.insert(label.to_string(), id);
        if self.initial.is_none() {
            self.initial = Some(id);
        }
        id
    }

    /// A new state with a label no other state uses, for internal
    /// chain states.
    pub fn fresh_state(&mut self, stem: &str) -> StateId {
        let mut n = self.states.len();
        loop {
            let label = format!("{stem}.{n}");
            if !self.by_label.contains_key(&label) {
                return self.state(&label);
            }
            n += 1;
        }
    }

    pub fn state_id(&self, label: &str) -> Option<StateId> {
        self.by_label.get(label).copied()
    }

    pub fn state_label(&self, id: StateId) -> &str {
        &self.states[id].label
    }

    pub fn set_initial(&mut self, id: StateId) {
        self.initial = Some(id);
    }

    pub fn initial(&self) -> Option<StateId> {
        self.initial
    }

    pub fn set_final(&mut self, id: StateId) {
        self.states[id].is_final = true;
    }

    pub fn is_final(&self, id: StateId) -> bool {
        self.states[id].is_final
    }

    pub fn final_states(&self) -> Vec<StateId> {
        (0..self.states.len()).filter(|&i| self.states[i].is_final).collect()
    }

    pub fn arcs(&self, id: StateId) -> &[Arc] {
        &self.states[id].arcs
    }

    pub fn states(&self) -> &[State] {
        &self.states
    }

    pub fn add_arc(&mut self, src: StateId, dst: StateId, input: Label, output: Label, weight: Weight) {
        self.states[src].arcs.push(Arc {
            input,
            output,
            target: dst,
            weight,
        });
    }

    /// Expand a literal into a chain of identity arcs, one per
    /// segmentation unit; the path's weight rides the final arc.
    pub fn add_string_path(
        &mut self,
        literal: &str,
        src: StateId,
        dst: StateId,
        weight: Weight,
        seg_units: &SegmentationUnits,
    ) {
        let units = seg_units.segment(literal);
        let stem = self.label.clone();
        let mut current = src;
        for (i, unit) in units.iter().enumerate() {
            let last = i + 1 == units.len();
            let next = if last { dst } else { self.fresh_state(&stem) };
            let w = if last { weight.clone() } else { self.semiring.one() };
            self.add_arc(current, next, Label::sym(unit.clone()), Label::sym(unit.clone()), w);
            current = next;
        }
        if units.is_empty() {
            self.add_arc(src, dst, Label::Epsilon, Label::Epsilon, weight);
        }
    }

    /// Splice a sub-FST between two states: an epsilon entry arc
    /// carrying `weight` into the sub-FST's initial state, and epsilon
    /// exit arcs from each of its final states. The spliced copies keep
    /// no final markings of their own.
    pub fn insert(
        &mut self,
        sub: &Fst,
        src: StateId,
        dst: StateId,
        weight: Weight,
    ) -> Result<(), FstError> {
        let sub_initial = sub
            .initial()
            .ok_or_else(|| FstError::NoInitial(sub.label.clone()))?;
        let mut mapping: Vec<StateId> = Vec::with_capacity(sub.states.len());
        for state in &sub.states {
            let label = format!("{}:{}", sub.label, state.label);
            let id = self.fresh_labeled_state(&label);
            mapping.push(id);
        }
        for (i, state) in sub.states.iter().enumerate() {
            for arc in &state.arcs {
                self.add_arc(
                    mapping[i],
                    mapping[arc.target],
                    arc.input.clone(),
                    arc.output.clone(),
                    arc.weight.clone(),
                );
            }
            if state.is_final {
                self.add_arc(
                    mapping[i],
                    dst,
                    Label::Epsilon,
                    Label::Epsilon,
                    self.semiring.one(),
                );
            }
        }
        self.add_arc(src, mapping[sub_initial], Label::Epsilon, Label::Epsilon, weight);
        Ok(())
    }

    pub(crate) fn fresh_labeled_state(&mut self, stem: &str) -> StateId {
        if !self.by_label.contains_key(stem) {
            return self.state(stem);
        }
        self.fresh_state(stem)
    }

    /// A new FST with every arc's input and output swapped, turning an
    /// analysis transducer into a generation transducer. Involutive.
    pub fn invert(&self) -> Fst {
        let mut inv = self.clone();
        inv.label = format!("{}_inv", self.label);
        for state in &mut inv.states {
            for arc in &mut state.arcs {
                std::mem::swap(&mut arc.input, &mut arc.output);
            }
        }
        inv
    }
}

impl fmt::Debug for Fst {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fst")
            .field("label", &self.label)
            .field("semiring", &self.semiring)
            .field("states", &self.states.len())
            .field("arcs", &self.num_arcs())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fsmorph_core::FsSet;

    fn uni_one() -> Weight {
        Semiring::Unification.one()
    }

    #[test]
    fn first_state_is_initial() {
        let mut fst = Fst::new("t", Semiring::Unification);
        let s0 = fst.state("s0");
        let s1 = fst.state("s1");
        assert_eq!(fst.initial(), Some(s0));
        assert_ne!(s0, s1);
        assert_eq!(fst.state("s0"), s0);
    }

    #[test]
    fn fresh_states_do_not_collide() {
        let mut fst = Fst::new("t", Semiring::Unification);
        fst.state("t.0");
        let q = fst.fresh_state("t");
        assert_ne!(fst.state_label(q), "t.0");
    }

    #[test]
    fn string_path_expands_per_unit() {
        let mut fst = Fst::new("t", Semiring::Unification);
        let s0 = fst.state("s0");
        let s1 = fst.state("s1");
        let units = SegmentationUnits::new(["sh"]);
        let w = Weight::Fs(FsSet::parse("[+x]").unwrap());
        fst.add_string_path("sha", s0, s1, w.clone(), &units);
        // "sh" + "a": two arcs, weight on the last.
        assert_eq!(fst.num_arcs(), 2);
        let first = &fst.arcs(s0)[0];
        assert_eq!(first.input, Label::sym("sh"));
        assert_eq!(first.weight, uni_one());
        let last = &fst.arcs(first.target)[0];
        assert_eq!(last.input, Label::sym("a"));
        assert_eq!(last.weight, w);
        assert_eq!(last.target, s1);
    }

    #[test]
    fn insert_splices_through_epsilons() {
        let mut sub = Fst::new("lex", Semiring::Unification);
        let a = sub.state("a");
        let b = sub.state("b");
        sub.add_arc(a, b, Label::sym("x"), Label::sym("x"), uni_one());
        sub.set_final(b);

        let mut fst = Fst::new("t", Semiring::Unification);
        let s0 = fst.state("s0");
        let s1 = fst.state("s1");
        let w = Weight::Fs(FsSet::parse("[+lex]").unwrap());
        fst.insert(&sub, s0, s1, w.clone()).unwrap();

        // Entry epsilon carries the weight.
        let entry = &fst.arcs(s0)[0];
        assert!(entry.input.is_epsilon());
        assert_eq!(entry.weight, w);
        // The spliced copy of b is not final in the host.
        let copied_b = fst.state_id("lex:b").unwrap();
        assert!(!fst.is_final(copied_b));
        // Exit epsilon from the copied final state.
        assert!(fst.arcs(copied_b).iter().any(|a| a.target == s1 && a.input.is_epsilon()));
    }

    #[test]
    fn invert_swaps_labels_and_is_involutive() {
        let mut fst = Fst::new("t", Semiring::Unification);
        let s0 = fst.state("s0");
        let s1 = fst.state("s1");
        fst.add_arc(s0, s1, Label::sym("a"), Label::sym("b"), uni_one());
        fst.set_final(s1);

        let inv = fst.invert();
        let arc = &inv.arcs(s0)[0];
        assert_eq!(arc.input, Label::sym("b"));
        assert_eq!(arc.output, Label::sym("a"));

        let back = inv.invert();
        let arc = &back.arcs(s0)[0];
        assert_eq!(arc.input, Label::sym("a"));
        assert_eq!(arc.output, Label::sym("b"));
    }

    #[test]
    fn epsilon_label_spelling() {
        assert_eq!(Label::parse("--"), Label::Epsilon);
        assert_eq!(Label::parse("a"), Label::sym("a"));
        assert_eq!(Label::Epsilon.to_string(), "--");
    }
}
