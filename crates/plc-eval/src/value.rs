//! Runtime values produced by the evaluator.
//!
//! Every value has a textual form (see [`RuntimeValue::print`]); string
//! concatenation and the `print` builtin both rely on it.

use std::fmt;
use std::rc::Rc;

use bigdecimal::BigDecimal;
use num_bigint::{BigInt, Sign};
use plc_types::Scope;

use crate::error::EvalResult;

// ══════════════════════════════════════════════════════════════════════════════
// RuntimeValue
// ══════════════════════════════════════════════════════════════════════════════

#[derive(Clone)]
pub enum RuntimeValue {
    Primitive(Primitive),
    Function(Function),
    Object(ObjectValue),
}

/// Host values wrapped by [`RuntimeValue::Primitive`].
#[derive(Debug, Clone)]
pub enum Primitive {
    Nil,
    Boolean(bool),
    Integer(BigInt),
    Decimal(BigDecimal),
    String(String),
    /// The host sequence iterated by `FOR`.
    List(Vec<RuntimeValue>),
}

/// The callable behind a [`Function`].
pub type Invoke = dyn Fn(Vec<RuntimeValue>) -> EvalResult<RuntimeValue>;

/// A named callable. Equality is identity.
#[derive(Clone)]
pub struct Function {
    pub name: String,
    invoke: Rc<Invoke>,
}

impl Function {
    pub fn new(
        name: impl Into<String>,
        invoke: impl Fn(Vec<RuntimeValue>) -> EvalResult<RuntimeValue> + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            invoke: Rc::new(invoke),
        }
    }

    pub fn invoke(&self, arguments: Vec<RuntimeValue>) -> EvalResult<RuntimeValue> {
        (self.invoke)(arguments)
    }
}

/// An object instance over its member frame. Equality is frame identity.
#[derive(Clone)]
pub struct ObjectValue {
    pub name: Option<String>,
    pub members: Scope<RuntimeValue>,
}

impl RuntimeValue {
    pub const NIL: RuntimeValue = RuntimeValue::Primitive(Primitive::Nil);

    pub fn boolean(value: bool) -> Self {
        RuntimeValue::Primitive(Primitive::Boolean(value))
    }

    pub fn integer(value: impl Into<BigInt>) -> Self {
        RuntimeValue::Primitive(Primitive::Integer(value.into()))
    }

    pub fn decimal(value: BigDecimal) -> Self {
        RuntimeValue::Primitive(Primitive::Decimal(value))
    }

    pub fn string(value: impl Into<String>) -> Self {
        RuntimeValue::Primitive(Primitive::String(value.into()))
    }

    pub fn list(values: Vec<RuntimeValue>) -> Self {
        RuntimeValue::Primitive(Primitive::List(values))
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, RuntimeValue::Primitive(Primitive::Nil))
    }

    /// Short kind name used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            RuntimeValue::Primitive(primitive) => primitive.type_name(),
            RuntimeValue::Function(_) => "Function",
            RuntimeValue::Object(_) => "Object",
        }
    }

    /// The textual form of this value.
    pub fn print(&self) -> String {
        self.print_nested(&mut Vec::new())
    }

    /// `open` holds the member frames of objects currently being printed;
    /// re-entering one prints a placeholder instead of recursing.
    fn print_nested(&self, open: &mut Vec<Scope<RuntimeValue>>) -> String {
        match self {
            RuntimeValue::Primitive(primitive) => primitive.print_nested(open),
            RuntimeValue::Function(function) => format!("DEF {}(?) DO ? END", function.name),
            RuntimeValue::Object(object) => object.print_nested(open),
        }
    }
}

impl Primitive {
    pub fn type_name(&self) -> &'static str {
        match self {
            Primitive::Nil => "Nil",
            Primitive::Boolean(_) => "Boolean",
            Primitive::Integer(_) => "Integer",
            Primitive::Decimal(_) => "Decimal",
            Primitive::String(_) => "String",
            Primitive::List(_) => "List",
        }
    }

    pub fn print(&self) -> String {
        self.print_nested(&mut Vec::new())
    }

    fn print_nested(&self, open: &mut Vec<Scope<RuntimeValue>>) -> String {
        match self {
            Primitive::Nil => "NIL".to_string(),
            Primitive::Boolean(true) => "TRUE".to_string(),
            Primitive::Boolean(false) => "FALSE".to_string(),
            Primitive::Integer(value) => value.to_string(),
            Primitive::Decimal(value) => decimal_to_string(value),
            Primitive::String(value) => value.clone(),
            Primitive::List(values) => {
                let items: Vec<_> = values.iter().map(|value| value.print_nested(open)).collect();
                format!("[{}]", items.join(", "))
            }
        }
    }
}

impl ObjectValue {
    fn print_nested(&self, open: &mut Vec<Scope<RuntimeValue>>) -> String {
        let head = match &self.name {
            Some(name) => format!("Object({name})"),
            None => "Object".to_string(),
        };
        if open.iter().any(|frame| Scope::ptr_eq(frame, &self.members)) {
            return format!("{head} {{ ... }}");
        }
        open.push(self.members.clone());
        let members: Vec<_> = self
            .members
            .entries()
            .into_iter()
            .map(|(name, value)| format!("{name} = `{}`", value.print_nested(open)))
            .collect();
        open.pop();
        if members.is_empty() {
            format!("{head} {{}}")
        } else {
            format!("{head} {{ {} }}", members.join(", "))
        }
    }
}

/// Render a decimal the way the reference decimal library does: plain
/// notation unless the scale is negative or the adjusted exponent is
/// below -6, scientific (`1.0E+4`) otherwise.
pub fn decimal_to_string(value: &BigDecimal) -> String {
    let (unscaled, scale) = value.as_bigint_and_exponent();
    let digits = unscaled.magnitude().to_string();
    let adjusted = -scale + (digits.len() as i64 - 1);

    let mut out = String::new();
    if unscaled.sign() == Sign::Minus {
        out.push('-');
    }
    if scale >= 0 && adjusted >= -6 {
        let scale = scale as usize;
        if scale == 0 {
            out.push_str(&digits);
        } else if digits.len() > scale {
            let (whole, fraction) = digits.split_at(digits.len() - scale);
            out.push_str(whole);
            out.push('.');
            out.push_str(fraction);
        } else {
            out.push_str("0.");
            out.push_str(&"0".repeat(scale - digits.len()));
            out.push_str(&digits);
        }
    } else {
        let (first, rest) = digits.split_at(1);
        out.push_str(first);
        if !rest.is_empty() {
            out.push('.');
            out.push_str(rest);
        }
        out.push('E');
        if adjusted >= 0 {
            out.push('+');
        }
        out.push_str(&adjusted.to_string());
    }
    out
}

// ══════════════════════════════════════════════════════════════════════════════
// Equality & Formatting
// ══════════════════════════════════════════════════════════════════════════════

impl PartialEq for RuntimeValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (RuntimeValue::Primitive(a), RuntimeValue::Primitive(b)) => a == b,
            (RuntimeValue::Function(a), RuntimeValue::Function(b)) => Rc::ptr_eq(&a.invoke, &b.invoke),
            (RuntimeValue::Object(a), RuntimeValue::Object(b)) => Scope::ptr_eq(&a.members, &b.members),
            _ => false,
        }
    }
}

impl fmt::Debug for RuntimeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeValue::Primitive(primitive) => write!(f, "Primitive({primitive:?})"),
            RuntimeValue::Function(function) => write!(f, "Function({})", function.name),
            RuntimeValue::Object(object) => f
                .debug_struct("Object")
                .field("name", &object.name)
                .field("members", &object.members)
                .finish(),
        }
    }
}

impl fmt::Display for RuntimeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.print())
    }
}

/// Content equality. Decimals compare digits and scale, so `1.0 != 1.00`;
/// ordering (`<` and friends) stays numeric.
impl PartialEq for Primitive {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Primitive::Nil, Primitive::Nil) => true,
            (Primitive::Boolean(a), Primitive::Boolean(b)) => a == b,
            (Primitive::Integer(a), Primitive::Integer(b)) => a == b,
            (Primitive::Decimal(a), Primitive::Decimal(b)) => {
                a.as_bigint_and_exponent() == b.as_bigint_and_exponent()
            }
            (Primitive::String(a), Primitive::String(b)) => a == b,
            (Primitive::List(a), Primitive::List(b)) => a == b,
            _ => false,
        }
    }
}
