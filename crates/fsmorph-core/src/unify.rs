// Unification of feature structures.
//
// Failure is an ordinary, prunable value here, not an error condition:
// the unification semiring cross-combines many alternatives and simply
// discards the pairs that fail. A two-case result keeps failure from
// ever being confused with a legitimate value.

use crate::featstruct::{FeatStruct, Value};

/// Outcome of a unification.
#[derive(Clone, Debug, PartialEq)]
pub enum Unification {
    Unified(FeatStruct),
    Failed,
}

impl Unification {
    pub fn is_failed(&self) -> bool {
        matches!(self, Unification::Failed)
    }

    pub fn unified(self) -> Option<FeatStruct> {
        match self {
            Unification::Unified(fs) => Some(fs),
            Unification::Failed => None,
        }
    }
}

/// Unify two feature structures.
///
/// For every feature present in either operand: if both define it the
/// values are unified recursively (atomic values succeed only on
/// equality); if only one defines it, that value is carried over. A
/// failure at any nested feature aborts the entire unification. No
/// backtracking is attempted. Type parents of both operands are merged
/// onto the result.
///
/// The result is a fresh unfrozen structure; the operands are not
/// modified. Unification is idempotent (`unify(a, a)` equals `a`),
/// commutative up to variable choice, and failure is absorbing.
pub fn unify(a: &FeatStruct, b: &FeatStruct) -> Unification {
    match unify_structs(a, b) {
        Some(fs) => Unification::Unified(fs),
        None => Unification::Failed,
    }
}

fn unify_structs(a: &FeatStruct, b: &FeatStruct) -> Option<FeatStruct> {
    let result = FeatStruct::new();
    for (name, va) in a.features() {
        match b.feature(&name) {
            Some(vb) => result.set_feature(name, unify_values(&va, &vb)?),
            None => result.set_feature(name, va),
        }
    }
    for (name, vb) in b.features() {
        if !result.has_feature(&name) {
            result.set_feature(name, vb);
        }
    }
    for tp in a.types().into_iter().chain(b.types()) {
        if !result.types().iter().any(|t| t.equal_values(&tp)) {
            result.add_type(tp);
        }
    }
    Some(result)
}

fn unify_values(x: &Value, y: &Value) -> Option<Value> {
    match (x, y) {
        (Value::Struct(a), Value::Struct(b)) => unify_structs(a, b).map(Value::Struct),
        // A variable unifies with anything, yielding the bound value;
        // two variables collapse onto the left one.
        (Value::Var(_), Value::Var(_)) => Some(x.clone()),
        (Value::Var(_), other) => Some(other.clone()),
        (other, Value::Var(_)) => Some(other.clone()),
        _ if x == y => Some(x.clone()),
        _ => None,
    }
}
