// Sets of frozen feature structures.
//
// An FsSet is the carrier of the unification semiring: its members are
// alternative bindings for one analysis (disjunctive ambiguity). All
// members are frozen; the set itself is immutable once constructed.

use std::fmt;

use hashbrown::HashSet;

use crate::featstruct::FeatStruct;
use crate::hierarchy::TypeHierarchy;
use crate::unify::{Unification, unify};
use crate::FsError;

/// An immutable set of frozen feature structures.
///
/// `{TOP}` (the set holding only the empty structure) is the semiring's
/// multiplicative identity; the empty set is its zero.
#[derive(Clone, Default)]
pub struct FsSet {
    members: HashSet<FeatStruct>,
}

impl FsSet {
    /// Build a set from structures, freezing each member.
    pub fn new(items: impl IntoIterator<Item = FeatStruct>) -> Self {
        let mut members = HashSet::new();
        for fs in items {
            fs.freeze();
            members.insert(fs);
        }
        FsSet { members }
    }

    /// The singleton `{TOP}`.
    pub fn top() -> Self {
        FsSet::new([FeatStruct::top()])
    }

    /// The empty set (unification zero: no surviving alternative).
    pub fn empty() -> Self {
        FsSet::default()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// True when the set carries no information beyond `{TOP}`.
    pub fn is_top(&self) -> bool {
        self.members.len() == 1 && self.members.iter().all(FeatStruct::is_top)
    }

    pub fn contains(&self, fs: &FeatStruct) -> bool {
        self.members.contains(fs)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FeatStruct> {
        self.members.iter()
    }

    /// Set union (the unification semiring's `add`).
    pub fn union(&self, other: &FsSet) -> FsSet {
        let mut members = self.members.clone();
        for fs in &other.members {
            members.insert(fs.clone());
        }
        FsSet { members }
    }

    /// Cross-product unification (the unification semiring's
    /// `multiply`): unify every pair of members, discard failures. If
    /// every surviving pair reduces to `TOP`, the whole result
    /// collapses to `{TOP}` -- no informative constraint survived, so
    /// there is no point keeping the blown-up product.
    pub fn unify_sets(&self, other: &FsSet) -> FsSet {
        let mut members = HashSet::new();
        let mut all_top = true;
        for a in &self.members {
            for b in &other.members {
                match unify(a, b) {
                    Unification::Unified(fs) => {
                        fs.freeze();
                        if !fs.is_top() {
                            all_top = false;
                        }
                        members.insert(fs);
                    }
                    Unification::Failed => {}
                }
            }
        }
        if all_top && !members.is_empty() {
            return FsSet::top();
        }
        FsSet { members }
    }

    /// Apply each member's type inheritance, returning a new set.
    pub fn inherit(&self) -> FsSet {
        FsSet::new(self.members.iter().map(FeatStruct::inherit_all))
    }

    /// Lay every member over a defaults template: the member's values
    /// win, the template fills in the rest. Used by the morphotactic
    /// compiler's pending-feature-structure mechanism.
    pub fn update(&self, defaults: &FeatStruct) -> FsSet {
        FsSet::new(self.members.iter().map(|fs| fs.inherit(defaults)))
    }

    /// Parse an FSSet literal: structures separated by `;`, each
    /// possibly containing `|` or `+-` disjunctions that expand into
    /// separate members. `[]` parses to `{TOP}`.
    pub fn parse(text: &str) -> Result<FsSet, FsError> {
        FsSet::parse_with(text, &TypeHierarchy::new())
    }

    /// Like [`parse`](Self::parse), resolving `%type` annotations.
    pub fn parse_with(text: &str, hier: &TypeHierarchy) -> Result<FsSet, FsError> {
        let text = text.trim();
        if text == "[]" {
            return Ok(FsSet::top());
        }
        let mut members = Vec::new();
        for part in text.split(';') {
            members.extend(crate::parse::parse_literal(part.trim(), hier)?);
        }
        Ok(FsSet::new(members))
    }
}

impl PartialEq for FsSet {
    fn eq(&self, other: &Self) -> bool {
        self.members == other.members
    }
}

impl Eq for FsSet {}

impl FromIterator<FeatStruct> for FsSet {
    fn from_iter<I: IntoIterator<Item = FeatStruct>>(iter: I) -> Self {
        FsSet::new(iter)
    }
}

impl fmt::Display for FsSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut reprs: Vec<String> = self.members.iter().map(|fs| fs.to_string()).collect();
        reprs.sort();
        write!(f, "{}", reprs.join(";"))
    }
}

impl fmt::Debug for FsSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::featstruct::Value;

    #[test]
    fn members_are_frozen() {
        let set = FsSet::parse("[+neg]").unwrap();
        assert!(set.iter().all(FeatStruct::is_frozen));
    }

    #[test]
    fn empty_literal_is_top() {
        let set = FsSet::parse("[]").unwrap();
        assert!(set.is_top());
    }

    #[test]
    fn disjunction_expands_to_members() {
        let set = FsSet::parse("[+neg, tm=prf|imf]").unwrap();
        assert_eq!(set.len(), 2);
        let prf = FeatStruct::parse("[+neg, tm=prf]").unwrap();
        let imf = FeatStruct::parse("[+neg, tm=imf]").unwrap();
        prf.freeze();
        imf.freeze();
        assert!(set.contains(&prf));
        assert!(set.contains(&imf));
    }

    #[test]
    fn semicolon_separates_members() {
        let set = FsSet::parse("[+neg]; [tm=prf]").unwrap();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn duplicate_members_collapse() {
        let set = FsSet::parse("[+neg]; [+neg]").unwrap();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn union_is_set_union() {
        let a = FsSet::parse("[+neg]").unwrap();
        let b = FsSet::parse("[+neg]; [tm=prf]").unwrap();
        assert_eq!(a.union(&b).len(), 2);
    }

    #[test]
    fn unify_sets_crosses_and_prunes() {
        let a = FsSet::parse("[tm=prf|imf]").unwrap();
        let b = FsSet::parse("[tm=prf, +neg]").unwrap();
        // prf x prf unifies; imf x prf fails and is pruned.
        let r = a.unify_sets(&b);
        assert_eq!(r.len(), 1);
        let survivor = r.iter().next().unwrap();
        assert_eq!(survivor.feature("tm"), Some(Value::sym("prf")));
        assert_eq!(survivor.feature("neg"), Some(Value::Bool(true)));
    }

    #[test]
    fn unify_sets_total_failure_is_empty() {
        let a = FsSet::parse("[tm=prf]").unwrap();
        let b = FsSet::parse("[tm=imf]").unwrap();
        assert!(a.unify_sets(&b).is_empty());
    }

    #[test]
    fn all_top_collapses() {
        let a = FsSet::top();
        let b = FsSet::top();
        let r = a.unify_sets(&b);
        assert!(r.is_top());
        assert_eq!(r.len(), 1);
    }

    #[test]
    fn failure_is_absorbing() {
        let a = FsSet::parse("[tm=prf]").unwrap();
        let b = FsSet::parse("[tm=imf]").unwrap();
        let failed = a.unify_sets(&b);
        let c = FsSet::parse("[+neg]").unwrap();
        assert!(failed.unify_sets(&c).is_empty());
    }

    #[test]
    fn update_lays_members_over_defaults() {
        let set = FsSet::parse("[tm=prf]; [tm=imf, +neg]").unwrap();
        let defaults = FeatStruct::parse("[-neg, per=3]").unwrap();
        let updated = set.update(&defaults);
        assert_eq!(updated.len(), 2);
        for fs in updated.iter() {
            assert_eq!(fs.feature("per"), Some(Value::Int(3)));
        }
        let kept = FeatStruct::parse("[tm=imf, +neg, per=3]").unwrap();
        kept.freeze();
        assert!(updated.contains(&kept));
    }
}
