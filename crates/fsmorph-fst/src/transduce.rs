// Transduction: running an input string through a weighted FST and
// collecting every accepted output together with its weight.

use hashbrown::HashMap;

use crate::fst::{Fst, Label, StateId};
use crate::segment::SegmentationUnits;
use crate::MAX_SEARCH_STEPS;
use fsmorph_core::Weight;

/// One accepted analysis: an output string and its accumulated weight.
#[derive(Clone, Debug, PartialEq)]
pub struct Transduction {
    pub output: String,
    pub weight: Weight,
}

impl Fst {
    /// Transduce `input` through this FST, returning every output
    /// reachable on an accepting path, with weights multiplied along
    /// each path and added across paths that produce the same output.
    ///
    /// `init_weight`, when given, is multiplied into every path before
    /// its first arc; a path whose accumulated weight hits the
    /// semiring zero is abandoned. Results come back sorted by output
    /// so callers see a stable order.
    pub fn transduce(
        &self,
        input: &str,
        init_weight: Option<&Weight>,
        units: &SegmentationUnits,
    ) -> Vec<Transduction> {
        let Some(initial) = self.initial() else {
            return Vec::new();
        };
        let symbols = units.segment(input);
        let semiring = self.semiring();
        let start = match init_weight {
            Some(w) => w.clone(),
            None => semiring.one(),
        };
        if semiring.is_zero(&start) {
            return Vec::new();
        }

        // Explicit stack of (state, symbols consumed, output so far,
        // weight so far). Depth-first, with a global step limit so
        // epsilon cycles cannot loop forever.
        let mut stack: Vec<(StateId, usize, String, Weight)> =
            vec![(initial, 0, String::new(), start)];
        let mut merged: HashMap<String, Weight> = HashMap::new();
        let mut steps: u32 = 0;

        while let Some((state, consumed, output, weight)) = stack.pop() {
            steps += 1;
            if steps > MAX_SEARCH_STEPS {
                log::warn!(
                    "transduction of {:?} through {} exceeded {} steps; returning partial results",
                    input,
                    self.label(),
                    MAX_SEARCH_STEPS
                );
                break;
            }
            if consumed == symbols.len() && self.is_final(state) {
                merged
                    .entry(output.clone())
                    .and_modify(|w| *w = semiring.add(w, &weight))
                    .or_insert_with(|| weight.clone());
            }
            for arc in self.arcs(state) {
                let next_consumed = match &arc.input {
                    Label::Epsilon => consumed,
                    Label::Sym(s) => {
                        if symbols.get(consumed).map(String::as_str) != Some(s.as_str()) {
                            continue;
                        }
                        consumed + 1
                    }
                };
                let next_weight = semiring.mul(&weight, &arc.weight);
                if semiring.is_zero(&next_weight) {
                    continue;
                }
                let mut next_output = output.clone();
                if let Label::Sym(s) = &arc.output {
                    next_output.push_str(s);
                }
                stack.push((arc.target, next_consumed, next_output, next_weight));
            }
        }

        let mut results: Vec<Transduction> = merged
            .into_iter()
            .map(|(output, weight)| Transduction { output, weight })
            .collect();
        results.sort_by(|a, b| a.output.cmp(&b.output));
        results
    }

    /// True if the FST accepts `input` with at least one output.
    pub fn accepts(&self, input: &str, units: &SegmentationUnits) -> bool {
        !self.transduce(input, None, units).is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fsmorph_core::{FsSet, Semiring};

    fn uni(text: &str) -> Weight {
        Weight::Fs(FsSet::parse(text).unwrap())
    }

    /// Accepts "cat", outputs "cat" with weight [+n].
    fn cat_fst() -> Fst {
        let mut fst = Fst::new("cat", Semiring::Unification);
        let start = fst.state("start");
        let end = fst.state("end");
        fst.set_final(end);
        fst.add_string_path("cat", start, end, uni("[+n]"), &SegmentationUnits::none());
        fst
    }

    #[test]
    fn identity_path_yields_its_weight() {
        let fst = cat_fst();
        let results = fst.transduce("cat", None, &SegmentationUnits::none());
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].output, "cat");
        assert_eq!(results[0].weight, uni("[+n]"));
    }

    #[test]
    fn rejected_input_yields_nothing() {
        let fst = cat_fst();
        assert!(fst.transduce("dog", None, &SegmentationUnits::none()).is_empty());
        assert!(fst.transduce("ca", None, &SegmentationUnits::none()).is_empty());
        assert!(fst.transduce("cats", None, &SegmentationUnits::none()).is_empty());
    }

    #[test]
    fn init_weight_multiplies_into_every_path() {
        let fst = cat_fst();
        let results = fst.transduce("cat", Some(&uni("[+x]")), &SegmentationUnits::none());
        assert_eq!(results[0].weight, uni("[+n, +x]"));
    }

    #[test]
    fn clashing_init_weight_kills_the_path() {
        let fst = cat_fst();
        let results = fst.transduce("cat", Some(&uni("[-n]")), &SegmentationUnits::none());
        assert!(results.is_empty());
    }

    #[test]
    fn ambiguous_outputs_all_survive() {
        let mut fst = Fst::new("amb", Semiring::Unification);
        let s0 = fst.state("0");
        let s1 = fst.state("1");
        let s2 = fst.state("2");
        fst.add_arc(s0, s1, Label::sym("a"), Label::sym("x"), uni("[+x]"));
        fst.add_arc(s0, s2, Label::sym("a"), Label::sym("y"), uni("[+y]"));
        fst.set_final(s1);
        fst.set_final(s2);
        let results = fst.transduce("a", None, &SegmentationUnits::none());
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].output, "x");
        assert_eq!(results[1].output, "y");
    }

    #[test]
    fn equal_outputs_merge_with_semiring_add() {
        // Two paths both output "x"; the union of their feature sets
        // survives.
        let mut fst = Fst::new("merge", Semiring::Unification);
        let s0 = fst.state("0");
        let s1 = fst.state("1");
        let s2 = fst.state("2");
        fst.add_arc(s0, s1, Label::sym("a"), Label::sym("x"), uni("[+p]"));
        fst.add_arc(s0, s2, Label::sym("a"), Label::sym("x"), uni("[+q]"));
        fst.set_final(s1);
        fst.set_final(s2);
        let results = fst.transduce("a", None, &SegmentationUnits::none());
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].weight, uni("[+p];[+q]"));
    }

    #[test]
    fn tropical_weights_take_the_minimum_across_paths() {
        let mut fst = Fst::new("trop", Semiring::Tropical);
        let s0 = fst.state("0");
        let s1 = fst.state("1");
        let s2 = fst.state("2");
        fst.add_arc(s0, s1, Label::sym("a"), Label::sym("x"), Weight::Num(3.0));
        fst.add_arc(s0, s2, Label::sym("a"), Label::sym("x"), Weight::Num(1.0));
        fst.set_final(s1);
        fst.set_final(s2);
        let results = fst.transduce("a", None, &SegmentationUnits::none());
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].weight, Weight::Num(1.0));
    }

    #[test]
    fn probability_weights_sum_across_paths() {
        let mut fst = Fst::new("prob", Semiring::Probability);
        let s0 = fst.state("0");
        let s1 = fst.state("1");
        let s2 = fst.state("2");
        fst.add_arc(s0, s1, Label::sym("a"), Label::sym("x"), Weight::Num(0.25));
        fst.add_arc(s0, s2, Label::sym("a"), Label::sym("x"), Weight::Num(0.5));
        fst.set_final(s1);
        fst.set_final(s2);
        let results = fst.transduce("a", None, &SegmentationUnits::none());
        assert_eq!(results[0].weight, Weight::Num(0.75));
    }

    #[test]
    fn epsilon_cycles_terminate_at_the_step_limit() {
        let mut fst = Fst::new("loop", Semiring::Unification);
        let s0 = fst.state("0");
        fst.add_arc(s0, s0, Label::Epsilon, Label::Epsilon, uni("[]"));
        fst.set_final(s0);
        let results = fst.transduce("", None, &SegmentationUnits::none());
        // The empty accepting path is still found.
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].output, "");
    }

    #[test]
    fn multichar_units_segment_before_matching() {
        let units = SegmentationUnits::new(["sh", "a"]);
        let mut fst = Fst::new("sh", Semiring::Unification);
        let s0 = fst.state("0");
        let s1 = fst.state("1");
        let s2 = fst.state("2");
        fst.add_arc(s0, s1, Label::sym("sh"), Label::sym("Š"), uni("[]"));
        fst.add_arc(s1, s2, Label::sym("a"), Label::sym("a"), uni("[]"));
        fst.set_final(s2);
        let results = fst.transduce("sha", None, &units);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].output, "Ša");
    }

    #[test]
    fn inversion_swaps_transduction_direction() {
        let fst = cat_fst();
        let inv = fst.invert();
        let results = inv.transduce("cat", None, &SegmentationUnits::none());
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].output, "cat");
        assert_eq!(results[0].weight, uni("[+n]"));
    }
}
