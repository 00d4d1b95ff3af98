// Lexicon compilation: a word list becomes a trie-shaped identity
// transducer. Entries share prefixes; each entry's weight rides a
// final epsilon arc into one shared final state, so a weight never
// leaks onto a prefix shared with other entries.

use hashbrown::HashMap;

use crate::fst::{Fst, Label, StateId};
use crate::segment::SegmentationUnits;
use crate::FstError;
use fsmorph_core::{Semiring, TypeHierarchy};

/// Compile word-list text (`form [FSS]` per line, weight optional,
/// `#` comments and blank lines ignored) into a trie FST transducing
/// each form to itself.
pub fn compile_lexicon(
    label: &str,
    text: &str,
    semiring: Semiring,
    seg_units: &SegmentationUnits,
    hierarchy: &TypeHierarchy,
) -> Result<Fst, FstError> {
    let mut fst = Fst::new(label, semiring);
    let start = fst.state("start");
    let fin = fst.state("fin");
    fst.set_final(fin);

    // Trie edges already built, keyed by source state and unit.
    let mut edges: HashMap<(StateId, String), StateId> = HashMap::new();

    for raw in text.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let (form, weight_text) = match line.split_once(char::is_whitespace) {
            Some((form, rest)) => (form, rest.trim()),
            None => (line, ""),
        };
        let weight = if weight_text.is_empty() {
            semiring.one()
        } else {
            semiring.parse_with(weight_text, hierarchy)?
        };

        let mut current = start;
        for unit in seg_units.segment(form) {
            current = match edges.get(&(current, unit.clone())) {
                Some(&next) => next,
                None => {
                    let next = fst.fresh_state(label);
                    fst.add_arc(
                        current,
                        next,
                        Label::sym(unit.clone()),
                        Label::sym(unit.clone()),
                        semiring.one(),
                    );
                    edges.insert((current, unit), next);
                    next
                }
            };
        }
        fst.add_arc(current, fin, Label::Epsilon, Label::Epsilon, weight);
    }
    Ok(fst)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fsmorph_core::{FsSet, Weight};

    fn uni(text: &str) -> Weight {
        Weight::Fs(FsSet::parse(text).unwrap())
    }

    fn compile(text: &str) -> Fst {
        compile_lexicon(
            "lex",
            text,
            Semiring::Unification,
            &SegmentationUnits::none(),
            &TypeHierarchy::new(),
        )
        .unwrap()
    }

    #[test]
    fn each_form_transduces_to_itself_with_its_weight() {
        let lex = compile("cat [+n]\ndog [+n]\nrun [+v]\n");
        let units = SegmentationUnits::none();
        let results = lex.transduce("cat", None, &units);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].output, "cat");
        assert_eq!(results[0].weight, uni("[+n]"));
        assert_eq!(lex.transduce("run", None, &units)[0].weight, uni("[+v]"));
    }

    #[test]
    fn shared_prefixes_do_not_mix_weights() {
        let lex = compile("can [+aux]\ncane [+n]\n");
        let units = SegmentationUnits::none();
        let can = lex.transduce("can", None, &units);
        assert_eq!(can.len(), 1);
        assert_eq!(can[0].weight, uni("[+aux]"));
        let cane = lex.transduce("cane", None, &units);
        assert_eq!(cane.len(), 1);
        assert_eq!(cane[0].weight, uni("[+n]"));
    }

    #[test]
    fn prefix_sharing_actually_shares_states() {
        let lex = compile("abc\nabd\n");
        // start, fin, a, ab, abc, abd.
        assert_eq!(lex.num_states(), 6);
    }

    #[test]
    fn duplicate_forms_keep_both_weights() {
        let lex = compile("bank [sem=river]\nbank [sem=money]\n");
        let results = lex.transduce("bank", None, &SegmentationUnits::none());
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].weight, uni("[sem=river];[sem=money]"));
    }

    #[test]
    fn weightless_entry_gets_the_semiring_one() {
        let lex = compile("the\n");
        let results = lex.transduce("the", None, &SegmentationUnits::none());
        assert_eq!(results[0].weight, Semiring::Unification.one());
    }

    #[test]
    fn comments_and_blanks_are_ignored() {
        let lex = compile("# nouns\n\ncat [+n]\n");
        assert!(lex.accepts("cat", &SegmentationUnits::none()));
    }

    #[test]
    fn multichar_units_segment_forms() {
        let units = SegmentationUnits::new(["ch"]);
        let lex = compile_lexicon(
            "lex",
            "chat\ncat\n",
            Semiring::Unification,
            &units,
            &TypeHierarchy::new(),
        )
        .unwrap();
        assert!(lex.accepts("chat", &units));
        assert!(lex.accepts("cat", &units));
        // "chat" is c-h-a-t only if "ch" were not a unit; with the unit
        // registered the trie branches at the first symbol.
        assert!(!lex.accepts("hat", &units));
    }
}
