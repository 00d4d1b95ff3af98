// Named feature-structure types.
//
// Types form a registry consulted during literal parsing when a `%type`
// annotation appears. The registry is an explicitly constructed value
// passed to the parser, never ambient state.

use hashbrown::HashMap;

use crate::featstruct::FeatStruct;
use crate::FsError;

/// A registry mapping type labels to frozen prototype structures.
///
/// Definitions are ordered: a later type's literal may carry a `%label`
/// annotation naming any earlier type as a parent.
#[derive(Clone, Debug, Default)]
pub struct TypeHierarchy {
    types: HashMap<String, FeatStruct>,
}

impl TypeHierarchy {
    pub fn new() -> Self {
        TypeHierarchy::default()
    }

    /// Parse `literal` against the hierarchy built so far and register
    /// it under `label`. The structure is labeled and frozen.
    pub fn define(&mut self, label: &str, literal: &str) -> Result<(), FsError> {
        let fs = FeatStruct::parse_with(literal, self)?;
        fs.set_label(label);
        fs.freeze();
        self.types.insert(label.to_string(), fs);
        Ok(())
    }

    /// Register an already-built structure under `label`.
    pub fn add(&mut self, label: &str, fs: FeatStruct) {
        fs.set_label(label);
        fs.freeze();
        self.types.insert(label.to_string(), fs);
    }

    pub fn get(&self, label: &str) -> Option<FeatStruct> {
        self.types.get(label).cloned()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::featstruct::Value;

    #[test]
    fn define_and_get() {
        let mut hier = TypeHierarchy::new();
        hier.define("vb", "[pos=v]").unwrap();
        let vb = hier.get("vb").unwrap();
        assert!(vb.is_frozen());
        assert_eq!(vb.label(), "vb");
        assert_eq!(vb.feature("pos"), Some(Value::sym("v")));
    }

    #[test]
    fn later_types_reference_earlier_ones() {
        let mut hier = TypeHierarchy::new();
        hier.define("vb", "[pos=v]").unwrap();
        hier.define("fin", "%vb[+fin]").unwrap();
        let fin = hier.get("fin").unwrap();
        let full = fin.inherit_all();
        assert_eq!(full.feature("pos"), Some(Value::sym("v")));
        assert_eq!(full.feature("fin"), Some(Value::Bool(true)));
    }

    #[test]
    fn unknown_label_is_none() {
        assert!(TypeHierarchy::new().get("nope").is_none());
    }
}
