// Labeled string sets and the small algebra over them used by cascade
// files: stored sets, `A-B` difference and `A&B` intersection, with
// label simplification so a derived set gets one canonical label.

use std::collections::BTreeSet;
use std::fmt;

use hashbrown::HashMap;

/// An ordered set of strings. Ordering keeps expansion into identity
/// arcs deterministic.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StringSet {
    members: BTreeSet<String>,
}

impl StringSet {
    pub fn new<I, S>(members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        StringSet {
            members: members.into_iter().map(Into::into).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, s: &str) -> bool {
        self.members.contains(s)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.members.iter().map(String::as_str)
    }

    /// The sole member, if there is exactly one.
    pub fn singleton(&self) -> Option<&str> {
        if self.members.len() == 1 {
            self.members.iter().next().map(String::as_str)
        } else {
            None
        }
    }

    pub fn difference(&self, other: &StringSet) -> StringSet {
        StringSet {
            members: self.members.difference(&other.members).cloned().collect(),
        }
    }

    pub fn intersection(&self, other: &StringSet) -> StringSet {
        StringSet {
            members: self.members.intersection(&other.members).cloned().collect(),
        }
    }
}

impl fmt::Display for StringSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, m) in self.members.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{m}")?;
        }
        write!(f, "}}")
    }
}

impl<'a> IntoIterator for &'a StringSet {
    type Item = &'a String;
    type IntoIter = std::collections::btree_set::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.members.iter()
    }
}

/// The stringsets in scope for one cascade, keyed by label.
#[derive(Clone, Debug, Default)]
pub struct StringSetDict {
    sets: HashMap<String, StringSet>,
}

impl StringSetDict {
    pub fn new() -> Self {
        StringSetDict::default()
    }

    pub fn add(&mut self, label: impl Into<String>, set: StringSet) {
        self.sets.insert(label.into(), set);
    }

    pub fn get(&self, label: &str) -> Option<&StringSet> {
        self.sets.get(label)
    }

    pub fn contains(&self, label: &str) -> bool {
        self.sets.contains_key(label)
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// The stored label of `set`, if some stored set equals it.
    pub fn label_of(&self, set: &StringSet) -> Option<&str> {
        self.sets
            .iter()
            .find(|(_, s)| *s == set)
            .map(|(l, _)| l.as_str())
    }

    /// Resolve a label expression to a set. A plain label looks up the
    /// store; `A-B` subtracts (B may be a stored label or an inline
    /// `a,b,c` list, and so may A); `&`-joined expressions intersect.
    pub fn generate(&self, label: &str) -> Option<StringSet> {
        if let Some(ss) = self.sets.get(label) {
            return Some(ss.clone());
        }
        if !label.contains('-') && !label.contains('&') {
            return None;
        }
        let mut result: Option<StringSet> = None;
        for part in label.split('&') {
            let part_set = self.resolve_difference(part);
            result = Some(match result {
                Some(acc) => acc.intersection(&part_set),
                None => part_set,
            });
        }
        result
    }

    /// A stored label, or a single `A-B` difference expression.
    fn resolve_difference(&self, label: &str) -> StringSet {
        if let Some(ss) = self.sets.get(label) {
            return ss.clone();
        }
        match label.split_once('-') {
            Some((left, right)) => {
                let ss1 = self.resolve_inline(left);
                let ss2 = self.resolve_inline(right);
                ss1.difference(&ss2)
            }
            None => self.resolve_inline(label),
        }
    }

    /// A stored label, or an inline comma-separated element list.
    fn resolve_inline(&self, label: &str) -> StringSet {
        if let Some(ss) = self.sets.get(label) {
            return ss.clone();
        }
        StringSet::new(label.split(','))
    }

    /// The canonical label for the intersection of two labeled sets.
    /// A singleton intersection comes back as the bare element; a set
    /// already in the dict keeps its stored label; otherwise the two
    /// labels are merged into a simplified derived label. An empty
    /// intersection is `None`.
    pub fn intersection_label(&mut self, label1: &str, label2: &str) -> Option<String> {
        let ss1 = self.generate(label1)?;
        let ss2 = self.generate(label2)?;
        let intersect = ss1.intersection(&ss2);
        if intersect.is_empty() {
            return None;
        }
        if let Some(elem) = intersect.singleton() {
            return Some(elem.to_string());
        }
        if let Some(stored) = self.label_of(&intersect) {
            return Some(stored.to_string());
        }
        let label = simplify_intersection_label(label1, label2);
        self.add(label.clone(), intersect);
        Some(label)
    }
}

/// Merge two labels into one intersection label, dropping duplicate
/// conjuncts.
pub fn simplify_intersection_label(label1: &str, label2: &str) -> String {
    if !label1.contains('&') && !label2.contains('&') {
        return simplify_difference_intersection_labels(label1, label2);
    }
    let mut conjuncts: Vec<&str> = label1.split('&').chain(label2.split('&')).collect();
    conjuncts.sort_unstable();
    conjuncts.dedup();
    conjuncts.join("&")
}

/// When both labels subtract from the same base (`X-a,b` and `X-c`),
/// the intersection subtracts the union: `X-a,b,c`.
pub fn simplify_difference_intersection_labels(label1: &str, label2: &str) -> String {
    let (base1, sub1) = split_difference(label1);
    let (base2, sub2) = split_difference(label2);
    if base1 != base2 {
        return format!("{label1}&{label2}");
    }
    let mut subtracted: Vec<&str> = sub1
        .iter()
        .flat_map(|s| s.split(','))
        .chain(sub2.iter().flat_map(|s| s.split(',')))
        .collect();
    subtracted.sort_unstable();
    subtracted.dedup();
    format!("{}-{}", base1, subtracted.join(","))
}

fn split_difference(label: &str) -> (&str, Option<&str>) {
    match label.split_once('-') {
        Some((base, rest)) => (base, Some(rest)),
        None => (label, None),
    }
}
