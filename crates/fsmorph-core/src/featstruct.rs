// Feature structures: typed attribute-value records.
//
// A feature structure maps feature names to values, carries a list of
// type parents (other structures acting as prototypes) and a frozen
// flag. Structures are shared node handles, so reentrant and even
// cyclic graphs are legal; every traversal (equality, hashing,
// freezing, copying) guards against cycles with visited-pointer sets.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use hashbrown::{HashMap, HashSet};

use crate::{FsError, TypeHierarchy};

/// Reserved feature name for the slash feature (`[...]/val` in the
/// literal syntax).
pub const SLASH_FEATURE: &str = "/";

/// A value inside a feature structure.
#[derive(Clone, Debug)]
pub enum Value {
    Bool(bool),
    Int(i64),
    /// A bare symbol, e.g. `prf` in `tm=prf`.
    Sym(String),
    /// An unbound variable, written `?x`.
    Var(String),
    /// A nested feature structure.
    Struct(FeatStruct),
    /// An ordered sequence of values, written `(v1 v2 ...)`.
    Seq(Vec<Value>),
}

impl Value {
    /// Shorthand for a symbol value.
    pub fn sym(s: impl Into<String>) -> Self {
        Value::Sym(s.into())
    }

    pub fn as_struct(&self) -> Option<&FeatStruct> {
        match self {
            Value::Struct(fs) => Some(fs),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        let mut visited = HashSet::new();
        eq_values(self, other, &mut visited)
    }
}

impl Eq for Value {}

struct Node {
    features: RefCell<BTreeMap<String, Value>>,
    types: RefCell<Vec<FeatStruct>>,
    label: RefCell<String>,
    frozen: Cell<bool>,
    hash: Cell<Option<u32>>,
}

/// A typed attribute-value record.
///
/// `FeatStruct` is a cheap handle (`Rc` clone); [`deep_copy`] and
/// [`unfreeze`] produce independent copies. Once [`freeze`]n a
/// structure is structurally immutable, hashable and safe to share;
/// mutating a frozen structure is a programming error and panics.
///
/// [`deep_copy`]: FeatStruct::deep_copy
/// [`unfreeze`]: FeatStruct::unfreeze
/// [`freeze`]: FeatStruct::freeze
#[derive(Clone)]
pub struct FeatStruct {
    node: Rc<Node>,
}

impl FeatStruct {
    /// Create a new empty, mutable feature structure.
    pub fn new() -> Self {
        FeatStruct {
            node: Rc::new(Node {
                features: RefCell::new(BTreeMap::new()),
                types: RefCell::new(Vec::new()),
                label: RefCell::new(String::new()),
                frozen: Cell::new(false),
                hash: Cell::new(None),
            }),
        }
    }

    /// The empty frozen structure, `[]` -- it unifies with anything and
    /// carries no information.
    pub fn top() -> Self {
        let fs = FeatStruct::new();
        fs.freeze();
        fs
    }

    /// True for the empty structure with no type parents.
    pub fn is_top(&self) -> bool {
        self.node.features.borrow().is_empty() && self.node.types.borrow().is_empty()
    }

    /// Parse a feature-structure literal such as
    /// `[tense=past, subj=[num=sg]]`. The literal must denote exactly
    /// one structure (no `|` or `+-` disjunction).
    pub fn parse(text: &str) -> Result<Self, FsError> {
        Self::parse_with(text, &TypeHierarchy::new())
    }

    /// Like [`parse`](Self::parse), resolving `%type` annotations
    /// against the given hierarchy.
    pub fn parse_with(text: &str, hier: &TypeHierarchy) -> Result<Self, FsError> {
        let structs = crate::parse::parse_literal(text, hier)?;
        match structs.len() {
            1 => Ok(structs.into_iter().next().unwrap_or_default()),
            n => Err(FsError::NotSingleton(text.to_string(), n)),
        }
    }

    fn ptr(&self) -> *const () {
        Rc::as_ptr(&self.node).cast()
    }

    fn assert_mutable(&self) {
        if self.node.frozen.get() {
            panic!("frozen feature structures may not be modified: {self}");
        }
    }

    // ------------------------------------------------------------------
    // Feature access
    // ------------------------------------------------------------------

    pub fn len(&self) -> usize {
        self.node.features.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.node.features.borrow().is_empty()
    }

    pub fn has_feature(&self, name: &str) -> bool {
        self.node.features.borrow().contains_key(name)
    }

    /// Value of a single feature, if present.
    pub fn feature(&self, name: &str) -> Option<Value> {
        self.node.features.borrow().get(name).cloned()
    }

    /// Sorted snapshot of the feature map.
    pub fn features(&self) -> Vec<(String, Value)> {
        self.node
            .features
            .borrow()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Feature names, sorted.
    pub fn names(&self) -> Vec<String> {
        self.node.features.borrow().keys().cloned().collect()
    }

    /// Set a single feature. Panics if the structure is frozen.
    pub fn set_feature(&self, name: impl Into<String>, value: Value) {
        self.assert_mutable();
        self.node.features.borrow_mut().insert(name.into(), value);
    }

    /// Remove a single feature. Panics if the structure is frozen.
    pub fn remove_feature(&self, name: &str) -> Option<Value> {
        self.assert_mutable();
        self.node.features.borrow_mut().remove(name)
    }

    /// Value at a feature path. An absent feature anywhere on the path
    /// yields `Ok(None)`; a non-terminal segment whose value is not a
    /// nested structure is a [`FsError::MissingPath`] error.
    pub fn get(&self, path: &[&str]) -> Result<Option<Value>, FsError> {
        let Some((last, parents)) = path.split_last() else {
            return Ok(None);
        };
        match self.path_parent(parents, path)? {
            Some(parent) => Ok(parent.feature(last)),
            None => Ok(None),
        }
    }

    /// Set the value at a feature path. All non-terminal segments must
    /// already name nested structures. Panics if the enclosing
    /// structure is frozen.
    pub fn set(&self, path: &[&str], value: Value) -> Result<(), FsError> {
        let Some((last, parents)) = path.split_last() else {
            return Ok(());
        };
        match self.path_parent(parents, path)? {
            Some(parent) => {
                parent.set_feature(*last, value);
                Ok(())
            }
            None => Err(FsError::MissingPath {
                path: path.join("."),
                segment: last.to_string(),
            }),
        }
    }

    /// Remove the value at a feature path, returning it.
    pub fn remove(&self, path: &[&str]) -> Result<Option<Value>, FsError> {
        let Some((last, parents)) = path.split_last() else {
            return Ok(None);
        };
        match self.path_parent(parents, path)? {
            Some(parent) => Ok(parent.remove_feature(last)),
            None => Ok(None),
        }
    }

    /// Walk down to the structure holding the last path segment.
    fn path_parent(&self, parents: &[&str], full: &[&str]) -> Result<Option<FeatStruct>, FsError> {
        let mut current = self.clone();
        for segment in parents {
            match current.feature(segment) {
                Some(Value::Struct(fs)) => current = fs,
                Some(_) => {
                    return Err(FsError::MissingPath {
                        path: full.join("."),
                        segment: segment.to_string(),
                    });
                }
                None => return Ok(None),
            }
        }
        Ok(Some(current))
    }

    // ------------------------------------------------------------------
    // Types
    // ------------------------------------------------------------------

    /// Add a type parent. Panics if the structure is frozen.
    pub fn add_type(&self, tp: FeatStruct) {
        self.assert_mutable();
        self.node.types.borrow_mut().push(tp);
    }

    pub fn types(&self) -> Vec<FeatStruct> {
        self.node.types.borrow().clone()
    }

    pub fn has_types(&self) -> bool {
        !self.node.types.borrow().is_empty()
    }

    /// Display label (set for named types in a hierarchy).
    pub fn label(&self) -> String {
        self.node.label.borrow().clone()
    }

    pub fn set_label(&self, label: impl Into<String>) {
        *self.node.label.borrow_mut() = label.into();
    }

    // ------------------------------------------------------------------
    // Freezing
    // ------------------------------------------------------------------

    pub fn is_frozen(&self) -> bool {
        self.node.frozen.get()
    }

    /// Recursively mark this structure and every nested structure
    /// immutable, and compute the stable hash. Idempotent.
    pub fn freeze(&self) {
        if self.is_frozen() {
            return;
        }
        let mut visited = HashSet::new();
        self.freeze_inner(&mut visited);
        self.hash_value();
    }

    fn freeze_inner(&self, visited: &mut HashSet<*const ()>) {
        if !visited.insert(self.ptr()) {
            return;
        }
        self.node.frozen.set(true);
        for (_, value) in self.node.features.borrow().iter() {
            freeze_value(value, visited);
        }
    }

    /// A deep, mutable copy of this structure; the inverse of
    /// [`freeze`](Self::freeze) in the sense that
    /// `x.freeze(); x.unfreeze()` is `equal_values`-equal to `x`.
    pub fn unfreeze(&self) -> FeatStruct {
        self.deep_copy()
    }

    /// Deep copy, preserving internal sharing and cycles. The copy is
    /// unfrozen; type parents are shared, not copied.
    pub fn deep_copy(&self) -> FeatStruct {
        let mut memo = HashMap::new();
        self.deep_copy_inner(&mut memo)
    }

    fn deep_copy_inner(&self, memo: &mut HashMap<*const (), FeatStruct>) -> FeatStruct {
        if let Some(copy) = memo.get(&self.ptr()) {
            return copy.clone();
        }
        let copy = FeatStruct::new();
        copy.set_label(self.label());
        memo.insert(self.ptr(), copy.clone());
        for tp in self.node.types.borrow().iter() {
            copy.node.types.borrow_mut().push(tp.clone());
        }
        for (name, value) in self.node.features.borrow().iter() {
            copy.node
                .features
                .borrow_mut()
                .insert(name.clone(), copy_value(value, memo));
        }
        copy
    }

    // ------------------------------------------------------------------
    // Equality and hashing
    // ------------------------------------------------------------------

    /// Structural equality: same features with equal values and
    /// matching type parents. Cycle-safe: a pair of nodes already under
    /// comparison is assumed consistent.
    pub fn equal_values(&self, other: &FeatStruct) -> bool {
        let mut visited = HashSet::new();
        self.eq_inner(other, &mut visited)
    }

    fn eq_inner(&self, other: &FeatStruct, visited: &mut HashSet<(*const (), *const ())>) -> bool {
        if Rc::ptr_eq(&self.node, &other.node) {
            return true;
        }
        if !visited.insert((self.ptr(), other.ptr())) {
            // Already comparing this pair further up the stack.
            return true;
        }
        if !types_equal(&self.types(), &other.types()) {
            return false;
        }
        let a = self.node.features.borrow();
        let b = other.node.features.borrow();
        if a.len() != b.len() {
            return false;
        }
        for (name, va) in a.iter() {
            let Some(vb) = b.get(name) else {
                return false;
            };
            if !eq_values(va, vb, visited) {
                return false;
            }
        }
        true
    }

    /// The stable 31-bit structural hash. Cached once computed; frozen
    /// structures always return the value computed at freeze time.
    pub fn hash_value(&self) -> u32 {
        if let Some(h) = self.node.hash.get() {
            return h;
        }
        let mut visited = HashSet::new();
        let h = self.hash_inner(&mut visited);
        if self.is_frozen() {
            self.node.hash.set(Some(h));
        }
        h
    }

    fn hash_inner(&self, visited: &mut HashSet<*const ()>) -> u32 {
        if !visited.insert(self.ptr()) {
            return 1;
        }
        let mut hashval: u32 = 0;
        for (name, value) in self.node.features.borrow().iter() {
            hashval = hashval.wrapping_add(str_hash(name));
            hashval = hashval.wrapping_add(hash_value_of(value, visited));
        }
        hashval & 0x7fff_ffff
    }
}

impl Default for FeatStruct {
    fn default() -> Self {
        FeatStruct::new()
    }
}

impl PartialEq for FeatStruct {
    fn eq(&self, other: &Self) -> bool {
        self.equal_values(other)
    }
}

impl Eq for FeatStruct {}

impl Hash for FeatStruct {
    /// Panics unless the structure is frozen: only frozen structures
    /// may be used as hash-map keys.
    fn hash<H: Hasher>(&self, state: &mut H) {
        if !self.is_frozen() {
            panic!("feature structures must be frozen before they can be hashed");
        }
        state.write_u32(self.hash_value());
    }
}

// ---------------------------------------------------------------------------
// Inheritance
// ---------------------------------------------------------------------------

impl FeatStruct {
    /// Unify with `ancestor`, resolving every conflict in `self`'s
    /// favor. Never fails. After merging `ancestor`'s own features, the
    /// ancestor's type parents are inherited recursively. The receiver
    /// is not modified; the result is a fresh unfrozen structure.
    ///
    /// Used to lay POS-level default templates under a concrete
    /// analysis before presenting it to a caller.
    pub fn inherit(&self, ancestor: &FeatStruct) -> FeatStruct {
        let result = self.deep_copy();
        inherit_into(&result, ancestor);
        result
    }

    /// Fold [`inherit`](Self::inherit) over this structure's own type
    /// parents. A structure without types is returned as-is.
    pub fn inherit_all(&self) -> FeatStruct {
        let mut result = self.clone();
        for tp in self.types() {
            result = result.inherit(&tp);
        }
        result
    }
}

fn inherit_into(child: &FeatStruct, ancestor: &FeatStruct) {
    for (name, aval) in ancestor.features() {
        match child.feature(&name) {
            None => child.set_feature(name, inherited_value(&aval)),
            Some(cval) => {
                let merged = inherit_values(&cval, &aval);
                child.set_feature(name, merged);
            }
        }
    }
    for tp in ancestor.types() {
        inherit_into(child, &tp);
    }
}

fn inherit_values(cval: &Value, aval: &Value) -> Value {
    match (cval, aval) {
        (Value::Struct(c), Value::Struct(a)) => {
            let merged = c.deep_copy();
            inherit_into(&merged, a);
            Value::Struct(merged)
        }
        // An unbound variable in the child takes the ancestor's value.
        (Value::Var(_), a) if !matches!(a, Value::Var(_)) => a.clone(),
        // Everything else: child wins.
        _ => cval.clone(),
    }
}

fn inherited_value(v: &Value) -> Value {
    match v {
        Value::Struct(fs) if fs.has_types() => Value::Struct(fs.inherit_all()),
        _ => v.clone(),
    }
}

// ---------------------------------------------------------------------------
// Traversal helpers
// ---------------------------------------------------------------------------

fn freeze_value(value: &Value, visited: &mut HashSet<*const ()>) {
    match value {
        Value::Struct(fs) => fs.freeze_inner(visited),
        Value::Seq(items) => {
            for item in items {
                freeze_value(item, visited);
            }
        }
        _ => {}
    }
}

fn copy_value(value: &Value, memo: &mut HashMap<*const (), FeatStruct>) -> Value {
    match value {
        Value::Struct(fs) => Value::Struct(fs.deep_copy_inner(memo)),
        Value::Seq(items) => Value::Seq(items.iter().map(|v| copy_value(v, memo)).collect()),
        other => other.clone(),
    }
}

pub(crate) fn eq_values(
    a: &Value,
    b: &Value,
    visited: &mut HashSet<(*const (), *const ())>,
) -> bool {
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Int(x), Value::Int(y)) => x == y,
        (Value::Sym(x), Value::Sym(y)) => x == y,
        (Value::Var(x), Value::Var(y)) => x == y,
        (Value::Struct(x), Value::Struct(y)) => x.eq_inner(y, visited),
        (Value::Seq(x), Value::Seq(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(u, v)| eq_values(u, v, visited))
        }
        _ => false,
    }
}

fn types_equal(a: &[FeatStruct], b: &[FeatStruct]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().all(|ta| b.iter().any(|tb| ta.equal_values(tb)))
        && b.iter().all(|tb| a.iter().any(|ta| ta.equal_values(tb)))
}

fn str_hash(s: &str) -> u32 {
    let mut hasher = DefaultHasher::new();
    s.hash(&mut hasher);
    hasher.finish() as u32
}

fn hash_value_of(value: &Value, visited: &mut HashSet<*const ()>) -> u32 {
    match value {
        Value::Bool(b) => {
            if *b {
                3
            } else {
                5
            }
        }
        Value::Int(i) => (*i as u32) ^ 0x9e37_79b9,
        Value::Sym(s) => str_hash(s),
        Value::Var(v) => str_hash(v).wrapping_add(7),
        Value::Struct(fs) => fs.hash_inner(visited),
        Value::Seq(items) => items
            .iter()
            .fold(11u32, |acc, v| acc.wrapping_add(hash_value_of(v, visited))),
    }
}

// ---------------------------------------------------------------------------
// Display
// ---------------------------------------------------------------------------

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(true) => write!(f, "True"),
            Value::Bool(false) => write!(f, "False"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Sym(s) => write!(f, "{s}"),
            Value::Var(v) => write!(f, "?{v}"),
            Value::Struct(fs) => write!(f, "{fs}"),
            Value::Seq(items) => {
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, ")")
            }
        }
    }
}

impl fmt::Display for FeatStruct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let types = self.node.types.borrow();
        match types.len() {
            0 => {}
            1 => write!(f, "%{}", display_label(&types[0]))?,
            _ => {
                write!(f, "{{")?;
                for (i, tp) in types.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "%{}", display_label(tp))?;
                }
                write!(f, "}}")?;
            }
        }
        write!(f, "[")?;
        let features = self.node.features.borrow();
        let mut first = true;
        for (name, value) in features.iter() {
            if name == SLASH_FEATURE {
                continue;
            }
            if !first {
                write!(f, ", ")?;
            }
            first = false;
            match value {
                Value::Bool(true) => write!(f, "+{name}")?,
                Value::Bool(false) => write!(f, "-{name}")?,
                other => write!(f, "{name}={other}")?,
            }
        }
        write!(f, "]")?;
        if let Some(slash) = features.get(SLASH_FEATURE) {
            write!(f, "/{slash}")?;
        }
        Ok(())
    }
}

fn display_label(tp: &FeatStruct) -> String {
    let label = tp.label();
    if label.is_empty() { "?".to_string() } else { label }
}

impl fmt::Debug for FeatStruct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}
