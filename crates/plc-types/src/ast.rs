//! AST node types for PLC.
//!
//! The tree is produced by an external parser and is never mutated by the
//! analyzer or the evaluator. Source order is preserved everywhere.
//! Large recursive types are boxed to keep enum sizes reasonable.

use bigdecimal::BigDecimal;
use num_bigint::BigInt;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ══════════════════════════════════════════════════════════════════════════════
// Top Level
// ══════════════════════════════════════════════════════════════════════════════

/// A complete PLC program: a sequence of top-level statements.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Source {
    pub statements: Vec<Stmt>,
}

impl Source {
    pub fn new(statements: Vec<Stmt>) -> Self {
        Self { statements }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Statements
// ══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Stmt {
    Let(Let),
    Def(Def),
    If(If),
    For(For),
    Return(Return),
    Expression(Expr),
    Assignment(Assignment),
}

/// `LET name[: Type] [= value];`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Let {
    pub name: String,
    pub type_name: Option<String>,
    pub value: Option<Expr>,
}

impl Let {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: None,
            value: None,
        }
    }

    /// Attach a declared type name.
    pub fn typed(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = Some(type_name.into());
        self
    }

    /// Attach an initializer.
    pub fn value(mut self, value: Expr) -> Self {
        self.value = Some(value);
        self
    }
}

/// `DEF name(params)[: Type] DO body END`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Def {
    pub name: String,
    pub parameters: Vec<Parameter>,
    pub return_type: Option<String>,
    pub body: Vec<Stmt>,
}

impl Def {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parameters: Vec::new(),
            return_type: None,
            body: Vec::new(),
        }
    }

    /// Append an untyped parameter.
    pub fn param(mut self, name: impl Into<String>) -> Self {
        self.parameters.push(Parameter {
            name: name.into(),
            type_name: None,
        });
        self
    }

    /// Append a parameter with a declared type name.
    pub fn typed_param(mut self, name: impl Into<String>, type_name: impl Into<String>) -> Self {
        self.parameters.push(Parameter {
            name: name.into(),
            type_name: Some(type_name.into()),
        });
        self
    }

    pub fn returns(mut self, type_name: impl Into<String>) -> Self {
        self.return_type = Some(type_name.into());
        self
    }

    pub fn body(mut self, body: Vec<Stmt>) -> Self {
        self.body = body;
        self
    }
}

/// A function or method parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub type_name: Option<String>,
}

/// `IF condition DO then_body [ELSE else_body] END`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct If {
    pub condition: Expr,
    pub then_body: Vec<Stmt>,
    pub else_body: Vec<Stmt>,
}

/// `FOR name IN expression DO body END`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct For {
    pub name: String,
    pub expression: Expr,
    pub body: Vec<Stmt>,
}

/// `RETURN [value];`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Return {
    pub value: Option<Expr>,
}

/// `target = value;`
///
/// The parser accepts any expression on the left; only `Variable` and
/// `Property` targets are assignable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub target: Expr,
    pub value: Expr,
}

impl Stmt {
    pub fn expression(expr: Expr) -> Self {
        Stmt::Expression(expr)
    }

    pub fn ret(value: Option<Expr>) -> Self {
        Stmt::Return(Return { value })
    }

    pub fn assign(target: Expr, value: Expr) -> Self {
        Stmt::Assignment(Assignment { target, value })
    }

    pub fn if_else(condition: Expr, then_body: Vec<Stmt>, else_body: Vec<Stmt>) -> Self {
        Stmt::If(If {
            condition,
            then_body,
            else_body,
        })
    }

    pub fn for_each(name: impl Into<String>, expression: Expr, body: Vec<Stmt>) -> Self {
        Stmt::For(For {
            name: name.into(),
            expression,
            body,
        })
    }
}

impl From<Let> for Stmt {
    fn from(stmt: Let) -> Self {
        Stmt::Let(stmt)
    }
}

impl From<Def> for Stmt {
    fn from(stmt: Def) -> Self {
        Stmt::Def(stmt)
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Expressions
// ══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    Literal(Literal),
    /// `(expr)`
    Group(Box<Expr>),
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Variable {
        name: String,
    },
    /// `receiver.name`
    Property {
        receiver: Box<Expr>,
        name: String,
    },
    /// `name(arguments)`
    Function {
        name: String,
        arguments: Vec<Expr>,
    },
    /// `receiver.name(arguments)`
    Method {
        receiver: Box<Expr>,
        name: String,
        arguments: Vec<Expr>,
    },
    Object(ObjectExpr),
}

/// `OBJECT [Name] DO fields methods END`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ObjectExpr {
    pub name: Option<String>,
    pub fields: Vec<Let>,
    pub methods: Vec<Def>,
}

impl ObjectExpr {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn field(mut self, field: Let) -> Self {
        self.fields.push(field);
        self
    }

    pub fn method(mut self, method: Def) -> Self {
        self.methods.push(method);
        self
    }
}

impl Expr {
    pub fn nil() -> Self {
        Expr::Literal(Literal::Nil)
    }

    pub fn boolean(value: bool) -> Self {
        Expr::Literal(Literal::Boolean(value))
    }

    pub fn integer(value: impl Into<BigInt>) -> Self {
        Expr::Literal(Literal::Integer(value.into()))
    }

    pub fn decimal(value: BigDecimal) -> Self {
        Expr::Literal(Literal::Decimal(value))
    }

    pub fn string(value: impl Into<String>) -> Self {
        Expr::Literal(Literal::String(value.into()))
    }

    pub fn group(inner: Expr) -> Self {
        Expr::Group(Box::new(inner))
    }

    pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Self {
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn variable(name: impl Into<String>) -> Self {
        Expr::Variable { name: name.into() }
    }

    pub fn property(receiver: Expr, name: impl Into<String>) -> Self {
        Expr::Property {
            receiver: Box::new(receiver),
            name: name.into(),
        }
    }

    pub fn call(name: impl Into<String>, arguments: Vec<Expr>) -> Self {
        Expr::Function {
            name: name.into(),
            arguments,
        }
    }

    pub fn method(receiver: Expr, name: impl Into<String>, arguments: Vec<Expr>) -> Self {
        Expr::Method {
            receiver: Box::new(receiver),
            name: name.into(),
            arguments,
        }
    }

    pub fn object(object: ObjectExpr) -> Self {
        Expr::Object(object)
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Literals & Operators
// ══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    Nil,
    Boolean(bool),
    Integer(BigInt),
    Decimal(BigDecimal),
    String(String),
}

/// Binary operators, serialized by their source spelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    #[serde(rename = "+")]
    Add,
    #[serde(rename = "-")]
    Sub,
    #[serde(rename = "*")]
    Mul,
    #[serde(rename = "/")]
    Div,
    #[serde(rename = "<")]
    Less,
    #[serde(rename = "<=")]
    LessEq,
    #[serde(rename = ">")]
    Greater,
    #[serde(rename = ">=")]
    GreaterEq,
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    NotEq,
    #[serde(rename = "AND")]
    And,
    #[serde(rename = "OR")]
    Or,
}

impl BinaryOp {
    pub const ALL: [BinaryOp; 12] = [
        BinaryOp::Add,
        BinaryOp::Sub,
        BinaryOp::Mul,
        BinaryOp::Div,
        BinaryOp::Less,
        BinaryOp::LessEq,
        BinaryOp::Greater,
        BinaryOp::GreaterEq,
        BinaryOp::Eq,
        BinaryOp::NotEq,
        BinaryOp::And,
        BinaryOp::Or,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Less => "<",
            BinaryOp::LessEq => "<=",
            BinaryOp::Greater => ">",
            BinaryOp::GreaterEq => ">=",
            BinaryOp::Eq => "==",
            BinaryOp::NotEq => "!=",
            BinaryOp::And => "AND",
            BinaryOp::Or => "OR",
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An operator spelling the parser produced but this language does not define.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown binary operator `{0}`")]
pub struct UnknownOperator(pub String);

impl FromStr for BinaryOp {
    type Err = UnknownOperator;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BinaryOp::ALL
            .into_iter()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| UnknownOperator(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binary_op_spelling() {
        for op in BinaryOp::ALL {
            assert_eq!(op.as_str().parse::<BinaryOp>(), Ok(op));
        }
        assert_eq!(
            "%".parse::<BinaryOp>(),
            Err(UnknownOperator("%".to_string()))
        );
    }

    #[test]
    fn test_let_builder() {
        let stmt = Let::new("x").typed("Integer").value(Expr::integer(1));
        assert_eq!(stmt.name, "x");
        assert_eq!(stmt.type_name.as_deref(), Some("Integer"));
        assert_eq!(stmt.value, Some(Expr::integer(1)));
    }

    #[test]
    fn test_def_builder_preserves_parameter_order() {
        let def = Def::new("f").param("a").typed_param("b", "String").returns("Nil");
        let names: Vec<_> = def.parameters.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["a", "b"]);
        assert_eq!(def.parameters[1].type_name.as_deref(), Some("String"));
        assert_eq!(def.return_type.as_deref(), Some("Nil"));
    }
}
