// Line-oriented compiled-FST format.
//
//   # comment
//   start <state>
//   final <state>
//   <src> -> <dst> <in>:<out> [weight]
//
// `--` is the epsilon label. A single label with no `:` stands for an
// identity arc; if it names a stringset in scope it expands to one
// identity arc per member. A missing weight defaults to the semiring
// one.

use crate::fst::{Fst, Label};
use crate::stringset::StringSetDict;
use crate::FstError;
use fsmorph_core::{Semiring, TypeHierarchy};

/// Parse the text form of a compiled FST.
pub fn parse_fst(
    label: &str,
    text: &str,
    semiring: Semiring,
    stringsets: &StringSetDict,
    hierarchy: &TypeHierarchy,
) -> Result<Fst, FstError> {
    let mut fst = Fst::new(label, semiring);
    for (lineno, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let bad = || FstError::BadLine {
            label: label.to_string(),
            line: lineno + 1,
            text: raw.to_string(),
        };

        if let Some(state) = line.strip_prefix("start ") {
            let id = fst.state(state.trim());
            fst.set_initial(id);
            continue;
        }
        if let Some(state) = line.strip_prefix("final ") {
            let id = fst.state(state.trim());
            fst.set_final(id);
            continue;
        }

        let (src_part, rest) = line.split_once("->").ok_or_else(bad)?;
        let src = src_part.trim();
        if src.is_empty() {
            return Err(bad());
        }
        let (dst, rest) = rest.trim().split_once(char::is_whitespace).ok_or_else(bad)?;
        let (labels, weight_text) = match rest.trim().split_once(char::is_whitespace) {
            Some((labels, weight)) => (labels, weight.trim()),
            None => (rest.trim(), ""),
        };
        if labels.is_empty() {
            return Err(bad());
        }
        let weight = if weight_text.is_empty() {
            semiring.one()
        } else {
            semiring.parse_with(weight_text, hierarchy)?
        };

        let src = fst.state(src);
        let dst = fst.state(dst);
        match labels.split_once(':') {
            Some((input, output)) => {
                fst.add_arc(src, dst, Label::parse(input), Label::parse(output), weight);
            }
            None if labels == "--" => {
                fst.add_arc(src, dst, Label::Epsilon, Label::Epsilon, weight);
            }
            None => {
                if let Some(set) = stringsets.generate(labels) {
                    // One identity arc per member; the weight applies
                    // to each.
                    for member in set.iter() {
                        fst.add_arc(
                            src,
                            dst,
                            Label::sym(member),
                            Label::sym(member),
                            weight.clone(),
                        );
                    }
                } else if labels.contains('-') || labels.contains('&') {
                    return Err(FstError::UnknownStringSet(labels.to_string()));
                } else {
                    fst.add_arc(src, dst, Label::sym(labels), Label::sym(labels), weight);
                }
            }
        }
    }
    if fst.initial().is_none() {
        return Err(FstError::NoInitial(label.to_string()));
    }
    Ok(fst)
}

/// Emit the text form of an FST, suitable for `parse_fst`.
pub fn write_fst(fst: &Fst) -> String {
    let one = fst.semiring().one();
    let mut out = String::new();
    if let Some(initial) = fst.initial() {
        out.push_str(&format!("start {}\n", fst.state_label(initial)));
    }
    for id in fst.final_states() {
        out.push_str(&format!("final {}\n", fst.state_label(id)));
    }
    for (id, state) in fst.states().iter().enumerate() {
        for arc in &state.arcs {
            out.push_str(&format!(
                "{} -> {} {}:{}",
                fst.state_label(id),
                fst.state_label(arc.target),
                arc.input,
                arc.output,
            ));
            if arc.weight != one {
                out.push_str(&format!(" {}", arc.weight));
            }
            out.push('\n');
        }
    }
    out
}
