//! Semantic types and the subtype lattice.
//!
//! The lattice is fixed: `Any` on top, the abstract `Comparable`,
//! `Equatable` and `Iterable` types in the middle, and the concrete types
//! below. Function types compare structurally; object types compare by
//! the identity of their member scope.

use crate::error::{AnalysisError, AnalysisResult};
use plc_types::Scope;
use serde::ser::{SerializeMap, SerializeStruct};
use serde::{Serialize, Serializer};
use std::fmt;

// ══════════════════════════════════════════════════════════════════════════════
// Type
// ══════════════════════════════════════════════════════════════════════════════

/// A semantic type in PLC.
#[derive(Debug, Clone)]
pub enum Type {
    // ── Top ──
    Any,

    // ── Concrete ──
    Nil,
    Boolean,
    /// Arbitrary precision integer.
    Integer,
    /// Arbitrary precision base-10 decimal.
    Decimal,
    String,

    // ── Abstract ──
    Comparable,
    Equatable,
    Iterable,

    // ── Composites ──
    /// `(params) -> returns`
    Function(Vec<Type>, Box<Type>),
    /// An object type; its identity is the member scope instance.
    Object(Scope<Type>),
}

impl PartialEq for Type {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Type::Function(a_params, a_ret), Type::Function(b_params, b_ret)) => {
                a_params == b_params && a_ret == b_ret
            }
            (Type::Object(a), Type::Object(b)) => Scope::ptr_eq(a, b),
            (Type::Function(..), _) | (Type::Object(_), _) => false,
            _ => std::mem::discriminant(self) == std::mem::discriminant(other),
        }
    }
}

impl Type {
    pub fn function(params: Vec<Type>, returns: Type) -> Self {
        Type::Function(params, Box::new(returns))
    }

    /// The predefined name of a non-composite type.
    pub fn name(&self) -> Option<&'static str> {
        Some(match self {
            Type::Any => "Any",
            Type::Nil => "Nil",
            Type::Boolean => "Boolean",
            Type::Integer => "Integer",
            Type::Decimal => "Decimal",
            Type::String => "String",
            Type::Comparable => "Comparable",
            Type::Equatable => "Equatable",
            Type::Iterable => "Iterable",
            Type::Function(..) | Type::Object(_) => return None,
        })
    }

    /// `self <: target`.
    ///
    /// Rules:
    /// - Every type is a subtype of itself and of `Any`
    /// - `Boolean`, `Integer`, `Decimal` and `String` are `Comparable`
    /// - `Nil`, every `Comparable` type and `Iterable` are `Equatable`
    ///
    /// `Comparable <: Equatable` holds, `Equatable <: Comparable` does not.
    pub fn is_subtype_of(&self, target: &Type) -> bool {
        if self == target {
            return true;
        }
        match target {
            Type::Any => true,
            Type::Comparable => self.is_comparable(),
            Type::Equatable => self.is_equatable(),
            _ => false,
        }
    }

    /// `self <: Comparable`.
    pub fn is_comparable(&self) -> bool {
        matches!(
            self,
            Type::Comparable | Type::Boolean | Type::Integer | Type::Decimal | Type::String
        )
    }

    /// `self <: Equatable`.
    pub fn is_equatable(&self) -> bool {
        matches!(self, Type::Equatable | Type::Nil | Type::Iterable) || self.is_comparable()
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Type::Integer | Type::Decimal)
    }
}

/// Fail with [`AnalysisError::TypeMismatch`] unless `found <: expected`.
pub fn require_subtype(found: &Type, expected: &Type) -> AnalysisResult<()> {
    if found.is_subtype_of(expected) {
        Ok(())
    } else {
        Err(AnalysisError::TypeMismatch {
            expected: expected.clone(),
            found: found.clone(),
        })
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Display & Serialize
// ══════════════════════════════════════════════════════════════════════════════

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Function(params, returns) => {
                write!(f, "Function(")?;
                for (i, param) in params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{param}")?;
                }
                write!(f, ") -> {returns}")
            }
            Type::Object(members) => {
                let entries = members.entries();
                if entries.is_empty() {
                    return write!(f, "Object {{}}");
                }
                write!(f, "Object {{ ")?;
                for (i, (name, ty)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{name}: {ty}")?;
                }
                write!(f, " }}")
            }
            other => f.write_str(other.name().unwrap_or("?")),
        }
    }
}

struct Members(Vec<(String, Type)>);

impl Serialize for Members {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, ty) in &self.0 {
            map.serialize_entry(name, ty)?;
        }
        map.end()
    }
}

impl Serialize for Type {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Type::Function(params, returns) => {
                let mut st = serializer.serialize_struct("Function", 2)?;
                st.serialize_field("params", params)?;
                st.serialize_field("returns", returns)?;
                st.end()
            }
            Type::Object(members) => {
                let mut st = serializer.serialize_struct("Object", 1)?;
                st.serialize_field("members", &Members(members.entries()))?;
                st.end()
            }
            other => serializer.serialize_str(other.name().unwrap_or("?")),
        }
    }
}
