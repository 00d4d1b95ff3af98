// Semiring weight algebras.
//
// A cascade fixes exactly one semiring for all of its component FSTs.
// The unification semiring carries sets of feature structures; the
// probability and tropical semirings carry plain numbers. All three
// share one `Weight` carrier so that transducers need not be generic
// over the algebra chosen at load time.

use std::fmt;

use crate::fsset::FsSet;
use crate::hierarchy::TypeHierarchy;
use crate::FsError;

/// A weight attached to an FST arc or a transduction result.
#[derive(Clone, Debug, PartialEq)]
pub enum Weight {
    /// Unification-semiring weight: a set of frozen feature structures.
    Fs(FsSet),
    /// Probability or tropical weight.
    Num(f64),
}

impl Weight {
    pub fn as_fs(&self) -> Option<&FsSet> {
        match self {
            Weight::Fs(set) => Some(set),
            Weight::Num(_) => None,
        }
    }

    pub fn as_num(&self) -> Option<f64> {
        match self {
            Weight::Num(n) => Some(*n),
            Weight::Fs(_) => None,
        }
    }
}

impl fmt::Display for Weight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Weight::Fs(set) => write!(f, "{set}"),
            Weight::Num(n) => write!(f, "{n}"),
        }
    }
}

/// The three weighting algebras.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Semiring {
    /// add = set union, multiply = cross-product unification.
    Unification,
    /// add = sum, multiply = product; weights are floats >= 0.
    Probability,
    /// add = min, multiply = sum; used for shortest-path ranking.
    Tropical,
}

impl Semiring {
    /// Match a cascade weighting declaration such as `UNIFICATION`,
    /// `probability` or `trop` by substring, the way cascade files
    /// spell it.
    pub fn from_name(name: &str) -> Option<Semiring> {
        let name = name.to_lowercase();
        if name.contains("uni") {
            Some(Semiring::Unification)
        } else if name.contains("prob") {
            Some(Semiring::Probability)
        } else if name.contains("trop") {
            Some(Semiring::Tropical)
        } else {
            None
        }
    }

    /// The additive identity (an impossible path).
    pub fn zero(self) -> Weight {
        match self {
            Semiring::Unification => Weight::Fs(FsSet::empty()),
            Semiring::Probability => Weight::Num(0.0),
            Semiring::Tropical => Weight::Num(f64::INFINITY),
        }
    }

    /// The multiplicative identity (a free transition).
    pub fn one(self) -> Weight {
        match self {
            Semiring::Unification => Weight::Fs(FsSet::top()),
            Semiring::Probability => Weight::Num(1.0),
            Semiring::Tropical => Weight::Num(0.0),
        }
    }

    /// Combine the weights of alternative paths.
    pub fn add(self, x: &Weight, y: &Weight) -> Weight {
        match (self, x, y) {
            (Semiring::Unification, Weight::Fs(a), Weight::Fs(b)) => Weight::Fs(a.union(b)),
            (Semiring::Probability, Weight::Num(a), Weight::Num(b)) => Weight::Num(a + b),
            (Semiring::Tropical, Weight::Num(a), Weight::Num(b)) => Weight::Num(a.min(*b)),
            _ => panic!("weight does not belong to the {self:?} semiring"),
        }
    }

    /// Combine the weights along one path.
    pub fn mul(self, x: &Weight, y: &Weight) -> Weight {
        match (self, x, y) {
            (Semiring::Unification, Weight::Fs(a), Weight::Fs(b)) => Weight::Fs(a.unify_sets(b)),
            (Semiring::Probability, Weight::Num(a), Weight::Num(b)) => Weight::Num(a * b),
            (Semiring::Tropical, Weight::Num(a), Weight::Num(b)) => Weight::Num(a + b),
            _ => panic!("weight does not belong to the {self:?} semiring"),
        }
    }

    /// Membership predicate for the semiring's carrier set.
    pub fn contains(self, w: &Weight) -> bool {
        match (self, w) {
            (Semiring::Unification, Weight::Fs(_)) => true,
            (Semiring::Probability, Weight::Num(n)) => n.is_finite() && *n >= 0.0,
            (Semiring::Tropical, Weight::Num(_)) => true,
            _ => false,
        }
    }

    /// True for weights equal to `zero` -- a dead path that can be
    /// pruned during transduction.
    pub fn is_zero(self, w: &Weight) -> bool {
        match (self, w) {
            (Semiring::Unification, Weight::Fs(set)) => set.is_empty(),
            (Semiring::Probability, Weight::Num(n)) => *n == 0.0,
            (Semiring::Tropical, Weight::Num(n)) => n.is_infinite() && *n > 0.0,
            _ => false,
        }
    }

    /// Parse a weight literal. The empty string defaults to `one`; the
    /// unification semiring parses an FSSet literal, the numeric
    /// semirings a bare float.
    pub fn parse(self, text: &str) -> Result<Weight, FsError> {
        self.parse_with(text, &TypeHierarchy::new())
    }

    /// Like [`parse`](Self::parse), resolving `%type` annotations.
    pub fn parse_with(self, text: &str, hier: &TypeHierarchy) -> Result<Weight, FsError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(self.one());
        }
        match self {
            Semiring::Unification => Ok(Weight::Fs(FsSet::parse_with(text, hier)?)),
            Semiring::Probability | Semiring::Tropical => text
                .parse::<f64>()
                .map(Weight::Num)
                .map_err(|_| FsError::InvalidWeight(text.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_match_by_substring() {
        assert_eq!(Semiring::from_name("UNIFICATION"), Some(Semiring::Unification));
        assert_eq!(Semiring::from_name("probability"), Some(Semiring::Probability));
        assert_eq!(Semiring::from_name("tropical"), Some(Semiring::Tropical));
        assert_eq!(Semiring::from_name("fuzzy"), None);
    }

    #[test]
    fn unification_identities() {
        let sr = Semiring::Unification;
        let w = sr.parse("[+neg]").unwrap();
        assert_eq!(sr.mul(&w, &sr.one()), w);
        assert!(sr.is_zero(&sr.zero()));
        assert!(!sr.is_zero(&w));
    }

    #[test]
    fn unification_mul_prunes_failures() {
        let sr = Semiring::Unification;
        let a = sr.parse("[tm=prf]").unwrap();
        let b = sr.parse("[tm=imf]").unwrap();
        assert!(sr.is_zero(&sr.mul(&a, &b)));
    }

    #[test]
    fn probability_arithmetic() {
        let sr = Semiring::Probability;
        assert_eq!(sr.add(&Weight::Num(0.25), &Weight::Num(0.5)), Weight::Num(0.75));
        assert_eq!(sr.mul(&Weight::Num(0.25), &Weight::Num(0.5)), Weight::Num(0.125));
        assert!(sr.contains(&Weight::Num(0.5)));
        assert!(!sr.contains(&Weight::Num(-1.0)));
    }

    #[test]
    fn tropical_arithmetic() {
        let sr = Semiring::Tropical;
        assert_eq!(sr.add(&Weight::Num(3.0), &Weight::Num(2.0)), Weight::Num(2.0));
        assert_eq!(sr.mul(&Weight::Num(3.0), &Weight::Num(2.0)), Weight::Num(5.0));
        assert!(sr.is_zero(&sr.zero()));
        assert_eq!(sr.one(), Weight::Num(0.0));
    }

    #[test]
    fn empty_literal_is_one() {
        assert_eq!(Semiring::Tropical.parse("").unwrap(), Weight::Num(0.0));
        assert!(Semiring::Unification.parse("").unwrap().as_fs().unwrap().is_top());
    }

    #[test]
    fn numeric_parse_rejects_garbage() {
        assert!(Semiring::Tropical.parse("abc").is_err());
    }

    #[test]
    #[should_panic(expected = "semiring")]
    fn mixed_carriers_panic() {
        Semiring::Probability.add(&Weight::Num(1.0), &Weight::Fs(FsSet::top()));
    }
}
