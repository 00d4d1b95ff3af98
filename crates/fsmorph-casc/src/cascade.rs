// Cascades: ordered sequences of weighted FSTs described by a small
// line-oriented language, loaded lazily and composed on demand.
//
//   weighting = UNIFICATION
//   V = {a, e, i, o, u}
//   cascade short = {0, 2}
//   >phon<
//   +stems+
//
// `>label<` loads a compiled transducer (label.fst, or label.mtax
// compiled on the fly); `+label+` compiles a word list (label.lex) into
// a trie. With a subcascade selected, components outside it stay as
// placeholders.

use std::path::{Path, PathBuf};

use hashbrown::HashMap;

use crate::mtax::MTax;
use crate::CascError;
use fsmorph_core::{Semiring, TypeHierarchy, Weight};
use fsmorph_fst::lexicon::compile_lexicon;
use fsmorph_fst::text::parse_fst;
use fsmorph_fst::{compose, Fst, SegmentationUnits, StringSet, StringSetDict, Transduction};

/// Source of cascade component files, keyed by bare file name.
pub trait Resources {
    fn read(&self, name: &str) -> Option<String>;
}

/// Files in one directory.
pub struct DirResources {
    dir: PathBuf,
}

impl DirResources {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        DirResources {
            dir: dir.as_ref().to_path_buf(),
        }
    }
}

impl Resources for DirResources {
    fn read(&self, name: &str) -> Option<String> {
        let path = self.dir.join(name);
        match std::fs::read_to_string(&path) {
            Ok(text) => Some(text),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => None,
            Err(err) => {
                log::warn!("cannot read {}: {err}", path.display());
                None
            }
        }
    }
}

/// In-memory files, for tests and embedded descriptions.
#[derive(Default)]
pub struct MemResources {
    files: HashMap<String, String>,
}

impl MemResources {
    pub fn new() -> Self {
        MemResources::default()
    }

    pub fn add(&mut self, name: impl Into<String>, text: impl Into<String>) {
        self.files.insert(name.into(), text.into());
    }
}

impl Resources for MemResources {
    fn read(&self, name: &str) -> Option<String> {
        self.files.get(name).cloned()
    }
}

/// One slot in the component sequence. Skipped or missing components
/// stay as placeholders until something needs them.
#[derive(Clone, Debug)]
pub enum Component {
    Fst(Fst),
    Placeholder(String),
}

impl Component {
    pub fn label(&self) -> &str {
        match self {
            Component::Fst(fst) => fst.label(),
            Component::Placeholder(label) => label,
        }
    }

    pub fn fst(&self) -> Option<&Fst> {
        match self {
            Component::Fst(fst) => Some(fst),
            Component::Placeholder(_) => None,
        }
    }
}

/// An ordered sequence of FSTs sharing one semiring, with the
/// stringsets and subcascade index lists declared alongside them.
#[derive(Debug)]
pub struct Cascade {
    label: String,
    semiring: Semiring,
    components: Vec<Component>,
    stringsets: StringSetDict,
    subcascades: HashMap<String, Vec<usize>>,
    seg_units: SegmentationUnits,
    hierarchy: TypeHierarchy,
    init_weight: Option<Weight>,
    composition: Option<Fst>,
}

impl Cascade {
    /// Parse a cascade description, loading components through
    /// `resources`. With `subcasc` given, only the components at that
    /// subcascade's indices are materialized.
    pub fn parse(
        label: &str,
        text: &str,
        resources: &dyn Resources,
        seg_units: SegmentationUnits,
        hierarchy: TypeHierarchy,
        subcasc: Option<&str>,
    ) -> Result<Cascade, CascError> {
        let mut cascade = Cascade {
            label: label.to_string(),
            semiring: Semiring::Unification,
            components: Vec::new(),
            stringsets: StringSetDict::new(),
            subcascades: HashMap::new(),
            seg_units,
            hierarchy,
            init_weight: None,
            composition: None,
        };
        let mut selected: Option<Vec<usize>> = None;

        for (lineno, raw) in text.lines().enumerate() {
            let line = raw.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }
            let bad = || CascError::BadLine {
                label: label.to_string(),
                line: lineno + 1,
                text: raw.to_string(),
            };

            if let Some(name) = line
                .strip_prefix("weighting")
                .and_then(|rest| rest.trim_start().strip_prefix('='))
            {
                cascade.semiring = Semiring::from_name(name.trim()).ok_or_else(bad)?;
                continue;
            }

            if let Some(rest) = line.strip_prefix("cascade ") {
                let (sub_label, indices) = parse_braced(rest).ok_or_else(bad)?;
                let indices = indices
                    .iter()
                    .map(|i| i.parse::<usize>().map_err(|_| bad()))
                    .collect::<Result<Vec<usize>, CascError>>()?;
                if Some(sub_label.as_str()) == subcasc {
                    selected = Some(indices.clone());
                }
                cascade.subcascades.insert(sub_label, indices);
                continue;
            }

            if let Some(fst_label) = strip_delimited(line, '>', '<') {
                let wanted = selected
                    .as_ref()
                    .map_or(true, |sel| sel.contains(&cascade.components.len()));
                let component = if wanted {
                    cascade.load_fst(fst_label, resources)?
                } else {
                    Component::Placeholder(fst_label.to_string())
                };
                cascade.components.push(component);
                continue;
            }

            if let Some(lex_label) = strip_delimited(line, '+', '+') {
                let wanted = selected
                    .as_ref()
                    .map_or(true, |sel| sel.contains(&cascade.components.len()));
                let component = if wanted {
                    cascade.load_lexicon(lex_label, resources)?
                } else {
                    Component::Placeholder(lex_label.to_string())
                };
                cascade.components.push(component);
                continue;
            }

            if let Some((ss_label, members)) = parse_braced(line) {
                cascade
                    .stringsets
                    .add(ss_label, StringSet::new(members));
                continue;
            }

            return Err(bad());
        }
        Ok(cascade)
    }

    /// Load from `<label>.casc` in a directory, with components
    /// resolved next to it.
    pub fn load(
        path: impl AsRef<Path>,
        seg_units: SegmentationUnits,
        hierarchy: TypeHierarchy,
        subcasc: Option<&str>,
    ) -> Result<Cascade, CascError> {
        let path = path.as_ref();
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let label = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let resources = DirResources::new(dir);
        let name = path
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let text = resources
            .read(&name)
            .ok_or_else(|| CascError::MissingResource(name.clone()))?;
        Cascade::parse(&label, &text, &resources, seg_units, hierarchy, subcasc)
    }

    /// A compiled transducer: `<label>.fst`, or `<label>.mtax` compiled
    /// on the fly. Missing files leave a placeholder.
    fn load_fst(&self, label: &str, resources: &dyn Resources) -> Result<Component, CascError> {
        if let Some(text) = resources.read(&format!("{label}.fst")) {
            let fst = parse_fst(label, &text, self.semiring, &self.stringsets, &self.hierarchy)?;
            return Ok(Component::Fst(fst));
        }
        if let Some(text) = resources.read(&format!("{label}.mtax")) {
            let mtax = MTax::parse(label, &text, self.semiring, &self.hierarchy)?;
            return match mtax.compile(resources, &self.seg_units, &self.hierarchy) {
                Ok(fst) => Ok(Component::Fst(fst)),
                Err(CascError::MissingResource(name)) => {
                    log::warn!(
                        "{}: {label} needs missing {name}, leaving a placeholder",
                        self.label
                    );
                    Ok(Component::Placeholder(label.to_string()))
                }
                Err(err) => Err(err),
            };
        }
        log::warn!("{}: no source for FST {label}, leaving a placeholder", self.label);
        Ok(Component::Placeholder(label.to_string()))
    }

    /// A lexicon trie from `<label>.lex`. Missing files leave a
    /// placeholder.
    fn load_lexicon(&self, label: &str, resources: &dyn Resources) -> Result<Component, CascError> {
        match resources.read(&format!("{label}.lex")) {
            Some(text) => {
                let fst = compile_lexicon(
                    label,
                    &text,
                    self.semiring,
                    &self.seg_units,
                    &self.hierarchy,
                )?;
                Ok(Component::Fst(fst))
            }
            None => {
                log::warn!(
                    "{}: no source for lexicon {label}, leaving a placeholder",
                    self.label
                );
                Ok(Component::Placeholder(label.to_string()))
            }
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn semiring(&self) -> Semiring {
        self.semiring
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }

    pub fn stringsets(&self) -> &StringSetDict {
        &self.stringsets
    }

    pub fn seg_units(&self) -> &SegmentationUnits {
        &self.seg_units
    }

    pub fn set_init_weight(&mut self, weight: Weight) {
        self.init_weight = Some(weight);
    }

    pub fn init_weight(&self) -> Option<&Weight> {
        self.init_weight.as_ref()
    }

    /// The loaded FST with the given label.
    pub fn get(&self, label: &str) -> Option<&Fst> {
        self.components
            .iter()
            .find(|c| c.label() == label)
            .and_then(Component::fst)
    }

    fn loaded(&self, index: usize) -> Result<&Fst, CascError> {
        let component = &self.components[index];
        component
            .fst()
            .ok_or_else(|| CascError::NotLoaded(component.label().to_string()))
    }

    /// Compose a slice of the sequence, optionally bracketed by
    /// explicit first/last transducers.
    pub fn compose_range(
        &self,
        begin: usize,
        end: usize,
        first: Option<&Fst>,
        last: Option<&Fst>,
    ) -> Result<Fst, CascError> {
        let mut fsts: Vec<&Fst> = Vec::new();
        if let Some(fst) = first {
            fsts.push(fst);
        }
        for i in begin..end {
            fsts.push(self.loaded(i)?);
        }
        if let Some(fst) = last {
            fsts.push(fst);
        }
        let label = format!("{}@", self.label);
        Ok(compose(&fsts, &label)?)
    }

    /// Compose the whole sequence left to right.
    pub fn compose_all(&self) -> Result<Fst, CascError> {
        self.compose_range(0, self.components.len(), None, None)
    }

    /// Compose the components of a named subcascade, in index order.
    pub fn compose_subcasc(&self, label: &str) -> Result<Fst, CascError> {
        let indices = self
            .subcascades
            .get(label)
            .ok_or_else(|| CascError::UnknownSubcascade(label.to_string()))?;
        let mut fsts: Vec<&Fst> = Vec::with_capacity(indices.len());
        for &i in indices {
            fsts.push(self.loaded(i)?);
        }
        Ok(compose(&fsts, &format!("{}@{label}", self.label))?)
    }

    /// The full composition, cached after the first call.
    pub fn composition(&mut self) -> Result<&Fst, CascError> {
        let composed = match self.composition.take() {
            Some(fst) => fst,
            None => self.compose_all()?,
        };
        Ok(self.composition.insert(composed))
    }

    /// Compose in two halves around `split`: the suffix first, then the
    /// prefix with that result appended.
    pub fn rev_compose(&self, split: usize) -> Result<Fst, CascError> {
        let suffix = self.compose_range(split, self.components.len(), None, None)?;
        self.compose_range(0, split, None, Some(&suffix))
    }

    /// Compose right to left: the last two components first, then each
    /// earlier component against the accumulated result.
    pub fn compose_backwards(&self) -> Result<Fst, CascError> {
        let n = self.components.len();
        if n == 0 {
            return Err(CascError::Fst(fsmorph_fst::FstError::EmptyComposition));
        }
        let mut acc = self.loaded(n - 1)?.clone();
        for i in (0..n - 1).rev() {
            let label = format!("{}@", self.label);
            acc = compose(&[self.loaded(i)?, &acc], &label)?;
        }
        Ok(acc)
    }

    /// The cascade with every loaded component inverted, for
    /// generation instead of analysis. Placeholders stay placeholders.
    pub fn inverted(&self) -> Cascade {
        let components = self
            .components
            .iter()
            .map(|c| match c {
                Component::Fst(fst) => Component::Fst(fst.invert()),
                Component::Placeholder(label) => Component::Placeholder(label.clone()),
            })
            .collect();
        Cascade {
            label: format!("{}_inv", self.label),
            semiring: self.semiring,
            components,
            stringsets: self.stringsets.clone(),
            subcascades: self.subcascades.clone(),
            seg_units: self.seg_units.clone(),
            hierarchy: self.hierarchy.clone(),
            init_weight: self.init_weight.clone(),
            composition: None,
        }
    }

    /// Run a string through the component sequence without composing:
    /// each component's outputs fan out into the next component's
    /// inputs, weights carried along. Empty at any stage means reject.
    pub fn transduce(&self, input: &str) -> Result<Vec<Transduction>, CascError> {
        let start = match &self.init_weight {
            Some(w) => w.clone(),
            None => self.semiring.one(),
        };
        let mut live = vec![Transduction {
            output: input.to_string(),
            weight: start,
        }];
        for i in 0..self.components.len() {
            let fst = self.loaded(i)?;
            let mut next = Vec::new();
            for t in &live {
                next.extend(fst.transduce(&t.output, Some(&t.weight), &self.seg_units));
            }
            if next.is_empty() {
                return Ok(Vec::new());
            }
            live = next;
        }
        Ok(live)
    }
}

/// `label = {a, b, c}` -> (label, members).
fn parse_braced(line: &str) -> Option<(String, Vec<String>)> {
    let (label, rest) = line.split_once('=')?;
    let label = label.trim();
    if label.is_empty() || label.contains(char::is_whitespace) {
        return None;
    }
    let rest = rest.trim();
    let inner = rest.strip_prefix('{')?.strip_suffix('}')?;
    let members = inner
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    Some((label.to_string(), members))
}

/// `>label<` / `+label+` -> label.
fn strip_delimited(line: &str, open: char, close: char) -> Option<&str> {
    let inner = line.strip_prefix(open)?.strip_suffix(close)?;
    if inner.is_empty() || inner.contains(char::is_whitespace) {
        None
    } else {
        Some(inner)
    }
}
