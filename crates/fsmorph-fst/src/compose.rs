// Composition of weighted transducers.
//
// The pair product is built breadth-first from the pair of initial
// states, so only reachable product states are ever materialized.

use hashbrown::HashMap;
use std::collections::VecDeque;

use crate::fst::{Fst, Label, StateId};
use crate::FstError;

/// Compose a sequence of FSTs into one, pairwise from the left.
/// All FSTs must share one semiring.
pub fn compose(fsts: &[&Fst], label: &str) -> Result<Fst, FstError> {
    let (first, rest) = fsts.split_first().ok_or(FstError::EmptyComposition)?;
    let mut result = (*first).clone();
    for next in rest {
        result = compose_pair(&result, next, label)?;
    }
    result.set_label(label);
    Ok(result)
}

// Epsilon filter on product states. From `Free` either side may take
// an epsilon move, alone or paired with the other side's; once one
// side has moved alone, the other side may not move alone or pair up
// until a symbol is matched. With the filter, every interleaving of
// an epsilon block in A with one in B collapses to a single product
// path, so weights are not counted more than once.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
enum Filter {
    Free,
    AOnly,
    BOnly,
}

/// The product automaton of `a` and `b`: an arc of A whose output
/// matches an arc of B's input produces a product arc labeled with A's
/// input and B's output, weighted with the semiring product. An
/// epsilon output in A advances A alone; an epsilon input in B
/// advances B alone; epsilon moves pass through the filter above.
/// Product finals are pairs of finals.
pub fn compose_pair(a: &Fst, b: &Fst, label: &str) -> Result<Fst, FstError> {
    if a.semiring() != b.semiring() {
        return Err(FstError::SemiringMismatch {
            left: a.label().to_string(),
            left_semiring: a.semiring(),
            right: b.label().to_string(),
            right_semiring: b.semiring(),
        });
    }
    let a_init = a
        .initial()
        .ok_or_else(|| FstError::NoInitial(a.label().to_string()))?;
    let b_init = b
        .initial()
        .ok_or_else(|| FstError::NoInitial(b.label().to_string()))?;

    let semiring = a.semiring();
    let mut product = Fst::new(label, semiring);
    let mut pair_ids: HashMap<(StateId, StateId, Filter), StateId> = HashMap::new();
    let mut queue: VecDeque<(StateId, StateId, Filter)> = VecDeque::new();

    let init = intern(
        a,
        b,
        &mut product,
        &mut pair_ids,
        &mut queue,
        a_init,
        b_init,
        Filter::Free,
    );
    product.set_initial(init);

    while let Some((p, q, filter)) = queue.pop_front() {
        let src = pair_ids[&(p, q, filter)];
        for arc_a in a.arcs(p) {
            match &arc_a.output {
                Label::Epsilon => {
                    if filter != Filter::BOnly {
                        // A emits nothing: B stays put.
                        let dst = intern(
                            a,
                            b,
                            &mut product,
                            &mut pair_ids,
                            &mut queue,
                            arc_a.target,
                            q,
                            Filter::AOnly,
                        );
                        product.add_arc(
                            src,
                            dst,
                            arc_a.input.clone(),
                            Label::Epsilon,
                            arc_a.weight.clone(),
                        );
                    }
                    if filter == Filter::Free {
                        // Both sides move on epsilon at once.
                        for arc_b in b.arcs(q) {
                            if !arc_b.input.is_epsilon() {
                                continue;
                            }
                            let weight = semiring.mul(&arc_a.weight, &arc_b.weight);
                            if semiring.is_zero(&weight) {
                                continue;
                            }
                            let dst = intern(
                                a,
                                b,
                                &mut product,
                                &mut pair_ids,
                                &mut queue,
                                arc_a.target,
                                arc_b.target,
                                Filter::Free,
                            );
                            product.add_arc(
                                src,
                                dst,
                                arc_a.input.clone(),
                                arc_b.output.clone(),
                                weight,
                            );
                        }
                    }
                }
                Label::Sym(mid) => {
                    for arc_b in b.arcs(q) {
                        if arc_b.input.as_sym() == Some(mid.as_str()) {
                            let weight = semiring.mul(&arc_a.weight, &arc_b.weight);
                            if semiring.is_zero(&weight) {
                                continue;
                            }
                            let dst = intern(
                                a,
                                b,
                                &mut product,
                                &mut pair_ids,
                                &mut queue,
                                arc_a.target,
                                arc_b.target,
                                Filter::Free,
                            );
                            product.add_arc(
                                src,
                                dst,
                                arc_a.input.clone(),
                                arc_b.output.clone(),
                                weight,
                            );
                        }
                    }
                }
            }
        }
        if filter != Filter::AOnly {
            for arc_b in b.arcs(q) {
                if arc_b.input.is_epsilon() {
                    // B consumes nothing: A stays put.
                    let dst = intern(
                        a,
                        b,
                        &mut product,
                        &mut pair_ids,
                        &mut queue,
                        p,
                        arc_b.target,
                        Filter::BOnly,
                    );
                    product.add_arc(
                        src,
                        dst,
                        Label::Epsilon,
                        arc_b.output.clone(),
                        arc_b.weight.clone(),
                    );
                }
            }
        }
    }

    Ok(product)
}

/// Look up or create the product state for `(p, q)` under a filter
/// state.
#[allow(clippy::too_many_arguments)]
fn intern(
    a: &Fst,
    b: &Fst,
    product: &mut Fst,
    pair_ids: &mut HashMap<(StateId, StateId, Filter), StateId>,
    queue: &mut VecDeque<(StateId, StateId, Filter)>,
    p: StateId,
    q: StateId,
    filter: Filter,
) -> StateId {
    *pair_ids.entry((p, q, filter)).or_insert_with(|| {
        let id = product.fresh_labeled_state(&format!("{}~{}", a.state_label(p), b.state_label(q)));
        if a.is_final(p) && b.is_final(q) {
            product.set_final(id);
        }
        queue.push_back((p, q, filter));
        id
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::SegmentationUnits;
    use fsmorph_core::{FsSet, Semiring, Weight};

    fn uni(text: &str) -> Weight {
        Weight::Fs(FsSet::parse(text).unwrap())
    }

    /// a:b with the given weight, single arc.
    fn single_arc(label: &str, input: &str, output: &str, weight: Weight) -> Fst {
        let mut fst = Fst::new(label, Semiring::Unification);
        let s0 = fst.state("0");
        let s1 = fst.state("1");
        fst.add_arc(s0, s1, Label::sym(input), Label::sym(output), weight);
        fst.set_final(s1);
        fst
    }

    #[test]
    fn symbols_chain_through_the_middle_tape() {
        let ab = single_arc("f", "a", "b", uni("[+x]"));
        let bc = single_arc("g", "b", "c", uni("[+y]"));
        let fg = compose(&[&ab, &bc], "fg").unwrap();

        let results = fg.transduce("a", None, &SegmentationUnits::none());
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].output, "c");
        assert_eq!(results[0].weight, uni("[+x, +y]"));
    }

    #[test]
    fn mismatched_middle_symbols_disconnect() {
        let ab = single_arc("f", "a", "b", uni("[]"));
        let xc = single_arc("g", "x", "c", uni("[]"));
        let fg = compose(&[&ab, &xc], "fg").unwrap();
        assert!(fg.transduce("a", None, &SegmentationUnits::none()).is_empty());
    }

    #[test]
    fn epsilon_output_advances_left_side_alone() {
        // f: a -> epsilon, then b -> b. g: b -> c.
        let mut f = Fst::new("f", Semiring::Unification);
        let s0 = f.state("0");
        let s1 = f.state("1");
        let s2 = f.state("2");
        f.add_arc(s0, s1, Label::sym("a"), Label::Epsilon, uni("[]"));
        f.add_arc(s1, s2, Label::sym("b"), Label::sym("b"), uni("[]"));
        f.set_final(s2);
        let g = single_arc("g", "b", "c", uni("[]"));

        let fg = compose(&[&f, &g], "fg").unwrap();
        let results = fg.transduce("ab", None, &SegmentationUnits::none());
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].output, "c");
    }

    #[test]
    fn epsilon_input_advances_right_side_alone() {
        // f: a -> b. g: epsilon -> x, then b -> c.
        let f = single_arc("f", "a", "b", uni("[]"));
        let mut g = Fst::new("g", Semiring::Unification);
        let s0 = g.state("0");
        let s1 = g.state("1");
        let s2 = g.state("2");
        g.add_arc(s0, s1, Label::Epsilon, Label::sym("x"), uni("[]"));
        g.add_arc(s1, s2, Label::sym("b"), Label::sym("c"), uni("[]"));
        g.set_final(s2);

        let fg = compose(&[&f, &g], "fg").unwrap();
        let results = fg.transduce("a", None, &SegmentationUnits::none());
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].output, "xc");
    }

    #[test]
    fn interleaved_epsilon_moves_are_not_double_counted() {
        // f: a -> epsilon. g: epsilon -> x. The composed relation maps
        // a -> x with the single product of the two weights.
        let mut f = Fst::new("f", Semiring::Probability);
        let f0 = f.state("0");
        let f1 = f.state("1");
        f.add_arc(f0, f1, Label::sym("a"), Label::Epsilon, Weight::Num(0.5));
        f.set_final(f1);
        let mut g = Fst::new("g", Semiring::Probability);
        let g0 = g.state("0");
        let g1 = g.state("1");
        g.add_arc(g0, g1, Label::Epsilon, Label::sym("x"), Weight::Num(0.5));
        g.set_final(g1);

        let fg = compose(&[&f, &g], "fg").unwrap();
        let results = fg.transduce("a", None, &SegmentationUnits::none());
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].output, "x");
        assert_eq!(results[0].weight, Weight::Num(0.25));
    }

    #[test]
    fn composition_is_associative_in_behavior() {
        let ab = single_arc("f", "a", "b", uni("[+x]"));
        let bc = single_arc("g", "b", "c", uni("[+y]"));
        let cd = single_arc("h", "c", "d", uni("[+z]"));

        let left = compose(&[&compose(&[&ab, &bc], "fg").unwrap(), &cd], "l").unwrap();
        let right = compose(&[&ab, &compose(&[&bc, &cd], "gh").unwrap()], "r").unwrap();
        let flat = compose(&[&ab, &bc, &cd], "fgh").unwrap();

        let units = SegmentationUnits::none();
        let l = left.transduce("a", None, &units);
        let r = right.transduce("a", None, &units);
        let f = flat.transduce("a", None, &units);
        assert_eq!(l.len(), 1);
        assert_eq!(l[0].output, "d");
        assert_eq!(l[0].weight, uni("[+x, +y, +z]"));
        assert_eq!(r[0].output, "d");
        assert_eq!(r[0].weight, l[0].weight);
        assert_eq!(f[0].output, "d");
        assert_eq!(f[0].weight, l[0].weight);
    }

    #[test]
    fn zero_weight_product_arcs_are_pruned() {
        let ab = single_arc("f", "a", "b", uni("[tm=prf]"));
        let bc = single_arc("g", "b", "c", uni("[tm=imf]"));
        let fg = compose(&[&ab, &bc], "fg").unwrap();
        assert!(fg.transduce("a", None, &SegmentationUnits::none()).is_empty());
    }

    #[test]
    fn semiring_mismatch_is_an_error() {
        let f = single_arc("f", "a", "b", uni("[]"));
        let mut g = Fst::new("g", Semiring::Tropical);
        let s0 = g.state("0");
        let s1 = g.state("1");
        g.add_arc(s0, s1, Label::sym("b"), Label::sym("c"), Weight::Num(1.0));
        g.set_final(s1);
        assert!(matches!(
            compose(&[&f, &g], "fg"),
            Err(FstError::SemiringMismatch { .. })
        ));
    }

    #[test]
    fn empty_sequence_is_an_error() {
        assert!(matches!(compose(&[], "x"), Err(FstError::EmptyComposition)));
    }

    #[test]
    fn singleton_sequence_is_cloned() {
        let f = single_arc("f", "a", "b", uni("[]"));
        let c = compose(&[&f], "c").unwrap();
        assert_eq!(c.num_arcs(), 1);
        assert_eq!(c.label(), "c");
    }
}
