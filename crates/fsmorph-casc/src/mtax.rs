// Morphotactics: a linear state notation compiled into an FST.
//
//   $ stem
//     +verbs+ [+v]
//     [tm=prf]
//       al [tm=prf]
//     -> fin [+irr]
//
// `$ label` opens a state (the first is initial); a bare `[...]` line
// sets a feature structure applied to the more-indented paths below
// it; other lines declare paths to the next state or shortcuts to a
// named state. `--` is an epsilon path. An implicit final state `fin`
// ends the chain.

use crate::cascade::Resources;
use crate::CascError;
use fsmorph_core::{FeatStruct, FsSet, Semiring, TypeHierarchy, Weight};
use fsmorph_fst::lexicon::compile_lexicon;
use fsmorph_fst::{Fst, Label, SegmentationUnits};

/// Name of the implicit final state.
pub const FINAL_STATE: &str = "fin";
/// Input literal meaning "no input".
const NO_INPUT: &str = "--";

#[derive(Clone, Debug)]
enum PathInput {
    /// A literal to spell out, one arc per segmentation unit.
    Literal(String),
    /// An epsilon transition.
    Empty,
    /// A lexicon to splice in, by label.
    Lexicon(String),
}

#[derive(Clone, Debug)]
enum Shortcut {
    /// An epsilon arc to a named state.
    Weighted { target: String, weight: Weight },
    /// A lexicon spliced straight to a named state.
    Lexicon { target: String, lexicon: String },
}

#[derive(Debug)]
struct MtaxState {
    label: String,
    paths: Vec<(PathInput, Weight)>,
    shortcuts: Vec<Shortcut>,
}

/// A parsed morphotactic description: an ordered list of states, each
/// with its paths to the following state and shortcuts elsewhere.
#[derive(Debug)]
pub struct MTax {
    label: String,
    semiring: Semiring,
    states: Vec<MtaxState>,
}

impl MTax {
    /// Parse morphotactic text. Lines ending in `;` continue onto the
    /// next line; `#` starts a comment.
    pub fn parse(
        label: &str,
        text: &str,
        semiring: Semiring,
        hierarchy: &TypeHierarchy,
    ) -> Result<MTax, CascError> {
        let mut mtax = MTax {
            label: label.to_string(),
            semiring,
            states: Vec::new(),
        };
        // The feature structure applied to deeper-indented paths, with
        // the indentation of the line that set it.
        let mut pending_fs: Option<FeatStruct> = None;
        let mut pending_indent = 0usize;
        let mut continued = String::new();
        let mut continued_from = 0usize;

        for (lineno, raw) in text.lines().enumerate() {
            let line = raw.split('#').next().unwrap_or("").trim_end();
            if line.trim().is_empty() {
                continue;
            }
            if line.ends_with(';') {
                if continued.is_empty() {
                    continued_from = lineno;
                }
                continued.push_str(line);
                continue;
            }
            let (line, lineno) = if continued.is_empty() {
                (line.to_string(), lineno)
            } else {
                (std::mem::take(&mut continued) + line, continued_from)
            };

            let bad = || CascError::BadLine {
                label: label.to_string(),
                line: lineno + 1,
                text: line.clone(),
            };
            let trimmed = line.trim_start();
            let indent = line.chars().count() - trimmed.chars().count();

            // $ label
            if let Some(rest) = trimmed.strip_prefix('$') {
                let state_label = rest.trim();
                if state_label.is_empty() || state_label.contains(char::is_whitespace) {
                    return Err(bad());
                }
                mtax.states.push(MtaxState {
                    label: state_label.to_string(),
                    paths: Vec::new(),
                    shortcuts: Vec::new(),
                });
                pending_fs = None;
                pending_indent = 0;
                continue;
            }

            let state = mtax.states.last_mut().ok_or_else(bad)?;

            // -> state [FSS]  /  -> state +lex+
            if let Some(rest) = trimmed.strip_prefix("->") {
                let rest = rest.trim();
                let (target, spec) = rest.split_once(char::is_whitespace).ok_or_else(bad)?;
                let spec = spec.trim();
                let shortcut = match strip_lex(spec) {
                    Some(lex) => Shortcut::Lexicon {
                        target: target.to_string(),
                        lexicon: lex.to_string(),
                    },
                    None => Shortcut::Weighted {
                        target: target.to_string(),
                        weight: semiring.parse_with(spec, hierarchy)?,
                    },
                };
                state.shortcuts.push(shortcut);
                continue;
            }

            // A bare [...] sets the feature structure for subsequent
            // more-indented paths.
            if trimmed.starts_with('[') && trimmed.ends_with(']') && !trimmed.contains(';') {
                pending_fs = Some(FeatStruct::parse_with(trimmed, hierarchy)?);
                pending_indent = indent;
                continue;
            }

            // input [FSS]  /  bare input  /  +lex+ [FSS]
            let (input, weight_text) = match trimmed.split_once(char::is_whitespace) {
                Some((input, rest)) => (input, rest.trim()),
                None => (trimmed, ""),
            };
            let pending = pending_fs
                .as_ref()
                .filter(|_| indent > pending_indent);
            let weight = if weight_text.is_empty() {
                match pending {
                    Some(fs) => Weight::Fs(FsSet::new([fs.clone()])),
                    None => semiring.one(),
                }
            } else {
                let parsed = semiring.parse_with(weight_text, hierarchy)?;
                match (pending, &parsed) {
                    (Some(fs), Weight::Fs(set)) => Weight::Fs(set.update(fs)),
                    _ => parsed,
                }
            };
            let input = match strip_lex(input) {
                Some(lex) => PathInput::Lexicon(lex.to_string()),
                None if input == NO_INPUT => PathInput::Empty,
                None => PathInput::Literal(input.to_string()),
            };
            state.paths.push((input, weight));
        }
        Ok(mtax)
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn num_states(&self) -> usize {
        self.states.len()
    }

    /// Compile into an FST: states chain linearly, an implicit `fin`
    /// final state closes the chain, lexicon paths splice their
    /// compiled tries between adjacent states.
    pub fn compile(
        &self,
        resources: &dyn Resources,
        seg_units: &SegmentationUnits,
        hierarchy: &TypeHierarchy,
    ) -> Result<Fst, CascError> {
        let mut fst = Fst::new(&self.label, self.semiring);
        for state in &self.states {
            fst.state(&state.label);
        }
        let fin = fst.state(FINAL_STATE);
        fst.set_final(fin);

        for (index, state) in self.states.iter().enumerate() {
            let src = match fst.state_id(&state.label) {
                Some(id) => id,
                None => continue,
            };
            let dst = match self.states.get(index + 1) {
                Some(next) => fst.state_id(&next.label).unwrap_or(fin),
                None => fin,
            };
            for (input, weight) in &state.paths {
                match input {
                    PathInput::Literal(s) => {
                        fst.add_string_path(s, src, dst, weight.clone(), seg_units);
                    }
                    PathInput::Empty => {
                        fst.add_arc(src, dst, Label::Epsilon, Label::Epsilon, weight.clone());
                    }
                    PathInput::Lexicon(label) => {
                        let lex = self.lexicon(label, resources, seg_units, hierarchy)?;
                        fst.insert(&lex, src, dst, weight.clone())?;
                    }
                }
            }
            for shortcut in &state.shortcuts {
                match shortcut {
                    Shortcut::Weighted { target, weight } => {
                        let dst = fst.state_id(target).ok_or_else(|| {
                            CascError::UnknownTarget {
                                label: self.label.clone(),
                                target: target.clone(),
                            }
                        })?;
                        fst.add_arc(src, dst, Label::Epsilon, Label::Epsilon, weight.clone());
                    }
                    Shortcut::Lexicon { target, lexicon } => {
                        let dst = fst.state_id(target).ok_or_else(|| {
                            CascError::UnknownTarget {
                                label: self.label.clone(),
                                target: target.clone(),
                            }
                        })?;
                        let lex = self.lexicon(lexicon, resources, seg_units, hierarchy)?;
                        fst.insert(&lex, src, dst, self.semiring.one())?;
                    }
                }
            }
        }
        Ok(fst)
    }

    fn lexicon(
        &self,
        label: &str,
        resources: &dyn Resources,
        seg_units: &SegmentationUnits,
        hierarchy: &TypeHierarchy,
    ) -> Result<Fst, CascError> {
        let name = format!("{label}.lex");
        let text = resources
            .read(&name)
            .ok_or_else(|| CascError::MissingResource(name.clone()))?;
        Ok(compile_lexicon(
            label,
            &text,
            self.semiring,
            seg_units,
            hierarchy,
        )?)
    }
}

/// `+label+` -> label.
fn strip_lex(s: &str) -> Option<&str> {
    let inner = s.strip_prefix('+')?.strip_suffix('+')?;
    if inner.is_empty() || inner.contains(char::is_whitespace) {
        None
    } else {
        Some(inner)
    }
}
