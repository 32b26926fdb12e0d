//! The predefined typing environment.
//!
//! [`TypeTable`] resolves the type names that may appear in declarations;
//! [`root_scope`] binds the typed builtins every unit starts with.

use std::collections::HashMap;

use crate::ty::Type;
use plc_types::Scope;

/// Registry mapping predefined type names → types.
#[derive(Debug, Clone)]
pub struct TypeTable {
    types: HashMap<&'static str, Type>,
}

impl TypeTable {
    /// Create the table of all predefined types.
    pub fn new() -> Self {
        let types = [
            Type::Any,
            Type::Nil,
            Type::Boolean,
            Type::Integer,
            Type::Decimal,
            Type::String,
            Type::Comparable,
            Type::Equatable,
            Type::Iterable,
        ]
        .into_iter()
        .filter_map(|ty| ty.name().map(|name| (name, ty)))
        .collect();
        Self { types }
    }

    /// Look up a type by its declared name.
    pub fn lookup(&self, name: &str) -> Option<Type> {
        self.types.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }
}

impl Default for TypeTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Signatures of the builtins shared with the runtime environment.
///
/// `list` is variadic and has no `Function` type, so it is only callable
/// at run time.
pub fn builtins() -> Vec<(&'static str, Type)> {
    vec![
        ("print", Type::function(vec![Type::Any], Type::Nil)),
        ("log", Type::function(vec![Type::Any], Type::Any)),
        (
            "range",
            Type::function(vec![Type::Integer, Type::Integer], Type::Iterable),
        ),
    ]
}

/// A fresh root scope with every builtin bound.
pub fn root_scope() -> Scope<Type> {
    let scope = Scope::root();
    for (name, ty) in builtins() {
        let defined = scope.define(name, ty);
        debug_assert!(defined.is_ok(), "duplicate builtin `{name}`");
    }
    scope
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_has_every_predefined_type() {
        let table = TypeTable::new();
        for name in [
            "Any",
            "Nil",
            "Boolean",
            "Integer",
            "Decimal",
            "String",
            "Comparable",
            "Equatable",
            "Iterable",
        ] {
            let ty = table.lookup(name).unwrap();
            assert_eq!(ty.name(), Some(name));
        }
        assert!(!table.contains("Object"));
        assert!(table.lookup("integer").is_none());
    }

    #[test]
    fn test_root_scope_builtins() {
        let scope = root_scope();
        assert_eq!(
            scope.get("range", true),
            Some(Type::function(
                vec![Type::Integer, Type::Integer],
                Type::Iterable
            ))
        );
        assert!(scope.get("print", true).is_some());
        assert!(scope.get("list", false).is_none());
        assert!(format!("{scope:?}").contains("has_parent: false"));
    }

    #[test]
    fn test_root_scopes_are_independent() {
        let a = root_scope();
        let b = root_scope();
        a.define("x", Type::Integer).unwrap();
        assert!(b.get("x", false).is_none());
    }
}
