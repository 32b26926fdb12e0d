//! The type-annotated tree produced by the analyzer.
//!
//! Every node mirrors one [`plc_types::ast`] node. Expressions carry their
//! resolved [`Type`]; `Let`, `For` and parameters carry the bound type.
//! The tree is handed to an external code generator and never mutated.

use crate::ty::Type;
use plc_types::ast::{BinaryOp, Literal};
use serde::Serialize;

// ══════════════════════════════════════════════════════════════════════════════
// Top Level
// ══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Source {
    pub statements: Vec<Stmt>,
}

impl Source {
    /// Render the tree as JSON for the generator.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Statements
// ══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Stmt {
    Let(Let),
    Def(Def),
    If(If),
    For(For),
    Return(Return),
    Expression(Expr),
    Assignment(Assignment),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Let {
    pub name: String,
    pub ty: Type,
    pub value: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Def {
    pub name: String,
    pub parameters: Vec<Parameter>,
    pub returns: Type,
    pub body: Vec<Stmt>,
}

impl Def {
    /// The `Function` type this definition binds.
    pub fn function_type(&self) -> Type {
        Type::function(
            self.parameters.iter().map(|p| p.ty.clone()).collect(),
            self.returns.clone(),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Parameter {
    pub name: String,
    pub ty: Type,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct If {
    pub condition: Expr,
    pub then_body: Vec<Stmt>,
    pub else_body: Vec<Stmt>,
}

/// The loop variable is always `Integer`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct For {
    pub name: String,
    pub ty: Type,
    pub expression: Expr,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Return {
    pub value: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Assignment {
    Variable { target: Variable, value: Expr },
    Property { target: Property, value: Expr },
}

// ══════════════════════════════════════════════════════════════════════════════
// Expressions
// ══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Expr {
    Literal {
        value: Literal,
        ty: Type,
    },
    Group(Box<Expr>),
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
        ty: Type,
    },
    Variable(Variable),
    Property(Property),
    Function {
        name: String,
        arguments: Vec<Expr>,
        ty: Type,
    },
    Method {
        receiver: Box<Expr>,
        name: String,
        arguments: Vec<Expr>,
        ty: Type,
    },
    Object(ObjectExpr),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Variable {
    pub name: String,
    pub ty: Type,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Property {
    pub receiver: Box<Expr>,
    pub name: String,
    pub ty: Type,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectExpr {
    pub name: Option<String>,
    pub fields: Vec<Let>,
    pub methods: Vec<Def>,
    /// Always `Type::Object` over the finished member scope.
    pub ty: Type,
}

impl Expr {
    /// The resolved type of this expression.
    pub fn ty(&self) -> &Type {
        match self {
            Expr::Group(inner) => inner.ty(),
            Expr::Literal { ty, .. }
            | Expr::Binary { ty, .. }
            | Expr::Function { ty, .. }
            | Expr::Method { ty, .. } => ty,
            Expr::Variable(variable) => &variable.ty,
            Expr::Property(property) => &property.ty,
            Expr::Object(object) => &object.ty,
        }
    }
}
