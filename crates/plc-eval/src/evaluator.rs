//! Core statement and expression evaluator.
//!
//! The evaluator walks the syntax tree directly; programs need not be
//! analyzed first. `RETURN` travels as [`Flow::Return`] up to the nearest
//! function call, so the error channel carries only real failures.

use std::cell::Cell;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::rc::Rc;

use bigdecimal::BigDecimal;
use num_bigint::{BigInt, Sign};
use num_traits::Zero;
use plc_types::ast::{self, BinaryOp, Literal};
use plc_types::Scope;

use crate::error::{EvalError, EvalResult};
use crate::value::{Function, ObjectValue, Primitive, RuntimeValue};

/// The receiver binding inside method bodies.
pub const THIS: &str = "this";

// ══════════════════════════════════════════════════════════════════════════════
// Configuration & metering
// ══════════════════════════════════════════════════════════════════════════════

/// Resource limits for one evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvalConfig {
    /// Maximum number of statements and expressions evaluated.
    pub gas_limit: u64,
    /// Maximum number of nested function and method calls.
    pub max_call_depth: usize,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            gas_limit: 10_000_000,
            max_call_depth: 256,
        }
    }
}

/// Gas and call depth, shared by every evaluator spawned for a call.
#[derive(Debug)]
struct Meter {
    config: EvalConfig,
    gas: Cell<u64>,
    depth: Cell<usize>,
}

impl Meter {
    /// Consume one unit of gas. Returns error if exhausted.
    fn tick(&self) -> EvalResult<()> {
        let gas = self.gas.get() + 1;
        self.gas.set(gas);
        if gas > self.config.gas_limit {
            Err(EvalError::GasExhausted(self.config.gas_limit))
        } else {
            Ok(())
        }
    }

    fn enter_call(self: &Rc<Self>) -> EvalResult<CallGuard> {
        let depth = self.depth.get() + 1;
        if depth > self.config.max_call_depth {
            return Err(EvalError::CallDepthExceeded(self.config.max_call_depth));
        }
        self.depth.set(depth);
        Ok(CallGuard(Rc::clone(self)))
    }
}

/// Releases one level of call depth on drop.
struct CallGuard(Rc<Meter>);

impl Drop for CallGuard {
    fn drop(&mut self) {
        let meter = &self.0;
        meter.depth.set(meter.depth.get().saturating_sub(1));
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Evaluator
// ══════════════════════════════════════════════════════════════════════════════

/// How a statement completed.
#[derive(Debug, Clone, PartialEq)]
pub enum Flow {
    /// Fell through, producing the statement's value.
    Normal(RuntimeValue),
    /// A `RETURN` is unwinding to the nearest call boundary.
    Return(RuntimeValue),
}

/// The core evaluator: walks AST nodes and produces runtime values.
pub struct Evaluator {
    /// The frame new names are defined in. Swapped by [`Evaluator::scoped`].
    pub(crate) scope: Scope<RuntimeValue>,
    meter: Rc<Meter>,
}

impl Evaluator {
    /// Create an evaluator rooted at `scope` with default limits.
    pub fn new(scope: Scope<RuntimeValue>) -> Self {
        Self::with_config(scope, EvalConfig::default())
    }

    pub fn with_config(scope: Scope<RuntimeValue>, config: EvalConfig) -> Self {
        Self {
            scope,
            meter: Rc::new(Meter {
                config,
                gas: Cell::new(0),
                depth: Cell::new(0),
            }),
        }
    }

    /// The current frame.
    pub fn scope(&self) -> &Scope<RuntimeValue> {
        &self.scope
    }

    /// Gas consumed so far, including inside function calls.
    pub fn gas_used(&self) -> u64 {
        self.meter.gas.get()
    }

    /// Evaluate a complete unit in the current frame.
    ///
    /// The result is the value of the last statement, or `NIL`.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn evaluate_source(&mut self, source: &ast::Source) -> EvalResult<RuntimeValue> {
        let mut last = RuntimeValue::NIL;
        for stmt in &source.statements {
            match self.eval_stmt(stmt)? {
                Flow::Normal(value) => last = value,
                Flow::Return(_) => return Err(EvalError::ReturnOutsideFunction),
            }
        }
        tracing::debug!(gas = self.gas_used(), "evaluation complete");
        Ok(last)
    }

    // ══════════════════════════════════════════════════════════════════════
    // Block & Statement execution
    // ══════════════════════════════════════════════════════════════════════

    /// Execute statements in the current frame, stopping at a `RETURN`.
    /// Returns the value of the last statement, or `NIL`.
    pub fn eval_block(&mut self, stmts: &[ast::Stmt]) -> EvalResult<Flow> {
        let mut last = RuntimeValue::NIL;
        for stmt in stmts {
            match self.eval_stmt(stmt)? {
                Flow::Normal(value) => last = value,
                flow @ Flow::Return(_) => return Ok(flow),
            }
        }
        Ok(Flow::Normal(last))
    }

    /// Execute a single statement.
    pub fn eval_stmt(&mut self, stmt: &ast::Stmt) -> EvalResult<Flow> {
        self.meter.tick()?;
        match stmt {
            ast::Stmt::Let(stmt) => self.eval_let(stmt).map(Flow::Normal),
            ast::Stmt::Def(def) => self.eval_def(def).map(Flow::Normal),
            ast::Stmt::If(stmt) => self.eval_if(stmt),
            ast::Stmt::For(stmt) => self.eval_for(stmt),
            ast::Stmt::Return(stmt) => {
                let value = match &stmt.value {
                    Some(expr) => self.eval_expr(expr)?,
                    None => RuntimeValue::NIL,
                };
                Ok(Flow::Return(value))
            }
            ast::Stmt::Expression(expr) => self.eval_expr(expr).map(Flow::Normal),
            ast::Stmt::Assignment(stmt) => self.eval_assignment(stmt).map(Flow::Normal),
        }
    }

    fn eval_let(&mut self, stmt: &ast::Let) -> EvalResult<RuntimeValue> {
        if self.scope.get(&stmt.name, true).is_some() {
            return Err(EvalError::AlreadyDefined(stmt.name.clone()));
        }
        let value = match &stmt.value {
            Some(expr) => self.eval_expr(expr)?,
            None => RuntimeValue::NIL,
        };
        self.scope.define(stmt.name.clone(), value.clone())?;
        Ok(value)
    }

    fn eval_def(&mut self, def: &ast::Def) -> EvalResult<RuntimeValue> {
        if self.scope.get(&def.name, true).is_some() {
            return Err(EvalError::AlreadyDefined(def.name.clone()));
        }
        let function = RuntimeValue::Function(self.make_function(def, self.scope.clone(), false)?);
        self.scope.define(def.name.clone(), function.clone())?;
        tracing::debug!(name = %def.name, "defined function");
        Ok(function)
    }

    /// Build the closure for a function or method.
    ///
    /// Each call opens one frame whose parent is `captured` (the defining
    /// scope, never the caller's). Methods take their receiver as an
    /// explicit first argument and bind it to `this`.
    fn make_function(
        &self,
        def: &ast::Def,
        captured: Scope<RuntimeValue>,
        method: bool,
    ) -> EvalResult<Function> {
        let mut seen = HashSet::new();
        for param in &def.parameters {
            if !seen.insert(param.name.as_str()) {
                return Err(EvalError::DuplicateParameter(param.name.clone()));
            }
        }

        let name = def.name.clone();
        let parameters: Vec<String> = def.parameters.iter().map(|p| p.name.clone()).collect();
        let body: Rc<[ast::Stmt]> = def.body.clone().into();
        let meter = Rc::clone(&self.meter);

        Ok(Function::new(def.name.clone(), move |arguments| {
            let expected = parameters.len() + usize::from(method);
            if arguments.len() != expected {
                return Err(EvalError::WrongArgCount {
                    name: name.clone(),
                    expected,
                    found: arguments.len(),
                });
            }
            let _call = meter.enter_call()?;
            tracing::trace!(function = %name, "invoking");

            let frame = captured.child();
            let mut arguments = arguments.into_iter();
            if method {
                if let Some(receiver) = arguments.next() {
                    frame.define(THIS, receiver)?;
                }
            }
            for (param, argument) in parameters.iter().zip(arguments) {
                frame.define(param.clone(), argument)?;
            }

            // The caller's evaluator is untouched; the body runs on its own.
            let mut evaluator = Evaluator {
                scope: frame,
                meter: Rc::clone(&meter),
            };
            match evaluator.eval_block(&body)? {
                Flow::Return(value) => Ok(value),
                Flow::Normal(_) => Ok(RuntimeValue::NIL),
            }
        }))
    }

    fn eval_if(&mut self, stmt: &ast::If) -> EvalResult<Flow> {
        let condition = self.eval_expr(&stmt.condition)?;
        let body = match condition {
            RuntimeValue::Primitive(Primitive::Boolean(true)) => &stmt.then_body,
            RuntimeValue::Primitive(Primitive::Boolean(false)) => &stmt.else_body,
            other => {
                return Err(EvalError::TypeMismatch {
                    expected: "Boolean",
                    found: other.type_name(),
                })
            }
        };
        let frame = self.scope.child();
        self.scoped(frame).eval_block(body)
    }

    fn eval_for(&mut self, stmt: &ast::For) -> EvalResult<Flow> {
        let items = match self.eval_expr(&stmt.expression)? {
            RuntimeValue::Primitive(Primitive::List(items)) => items,
            other => {
                return Err(EvalError::TypeMismatch {
                    expected: "List",
                    found: other.type_name(),
                })
            }
        };
        for item in items {
            // A fresh frame per iteration: body declarations never leak.
            let frame = self.scope.child();
            frame.define(stmt.name.clone(), item)?;
            if let flow @ Flow::Return(_) = self.scoped(frame).eval_block(&stmt.body)? {
                return Ok(flow);
            }
        }
        Ok(Flow::Normal(RuntimeValue::NIL))
    }

    fn eval_assignment(&mut self, stmt: &ast::Assignment) -> EvalResult<RuntimeValue> {
        match &stmt.target {
            ast::Expr::Variable { name } => {
                if self.scope.get(name, false).is_none() {
                    return Err(EvalError::UndefinedName(name.clone()));
                }
                let value = self.eval_expr(&stmt.value)?;
                self.scope.set(name, value.clone());
                Ok(value)
            }
            ast::Expr::Property { receiver, name } => {
                let object = self.eval_object_receiver(receiver)?;
                if object.members.get(name, true).is_none() {
                    return Err(EvalError::UndefinedMember(name.clone()));
                }
                let value = self.eval_expr(&stmt.value)?;
                object.members.set_current(name, value.clone());
                Ok(value)
            }
            _ => Err(EvalError::InvalidAssignmentTarget),
        }
    }

    // ══════════════════════════════════════════════════════════════════════
    // Expression evaluation
    // ══════════════════════════════════════════════════════════════════════

    /// Evaluate an expression to a value.
    pub fn eval_expr(&mut self, expr: &ast::Expr) -> EvalResult<RuntimeValue> {
        self.meter.tick()?;
        match expr {
            ast::Expr::Literal(literal) => Ok(literal_value(literal)),
            ast::Expr::Group(inner) => self.eval_expr(inner),
            ast::Expr::Binary { op, left, right } => self.eval_binary(*op, left, right),
            ast::Expr::Variable { name } => self
                .scope
                .get(name, false)
                .ok_or_else(|| EvalError::UndefinedName(name.clone())),
            ast::Expr::Property { receiver, name } => {
                let object = self.eval_object_receiver(receiver)?;
                object
                    .members
                    .get(name, true)
                    .ok_or_else(|| EvalError::UndefinedMember(name.clone()))
            }
            ast::Expr::Function { name, arguments } => self.eval_call(name, arguments),
            ast::Expr::Method {
                receiver,
                name,
                arguments,
            } => self.eval_method(receiver, name, arguments),
            ast::Expr::Object(object) => self.eval_object(object),
        }
    }

    // ── Calls ────────────────────────────────────────────────────────────

    fn eval_arguments(&mut self, arguments: &[ast::Expr]) -> EvalResult<Vec<RuntimeValue>> {
        arguments.iter().map(|arg| self.eval_expr(arg)).collect()
    }

    fn eval_call(&mut self, name: &str, arguments: &[ast::Expr]) -> EvalResult<RuntimeValue> {
        let function = match self.scope.get(name, false) {
            Some(RuntimeValue::Function(function)) => function,
            Some(other) => {
                return Err(EvalError::NotCallable {
                    name: name.to_string(),
                    found: other.type_name(),
                })
            }
            None => return Err(EvalError::UndefinedName(name.to_string())),
        };
        let arguments = self.eval_arguments(arguments)?;
        function.invoke(arguments)
    }

    fn eval_object_receiver(&mut self, receiver: &ast::Expr) -> EvalResult<ObjectValue> {
        match self.eval_expr(receiver)? {
            RuntimeValue::Object(object) => Ok(object),
            other => Err(EvalError::NotAnObject(other.type_name())),
        }
    }

    fn eval_method(
        &mut self,
        receiver: &ast::Expr,
        name: &str,
        arguments: &[ast::Expr],
    ) -> EvalResult<RuntimeValue> {
        let object = self.eval_object_receiver(receiver)?;
        let method = match object.members.get(name, true) {
            Some(RuntimeValue::Function(function)) => function,
            Some(other) => {
                return Err(EvalError::NotCallable {
                    name: name.to_string(),
                    found: other.type_name(),
                })
            }
            None => return Err(EvalError::UndefinedMember(name.to_string())),
        };
        let mut all_arguments = Vec::with_capacity(arguments.len() + 1);
        all_arguments.push(RuntimeValue::Object(object));
        all_arguments.extend(self.eval_arguments(arguments)?);
        method.invoke(all_arguments)
    }

    // ── Objects ──────────────────────────────────────────────────────────

    fn eval_object(&mut self, object: &ast::ObjectExpr) -> EvalResult<RuntimeValue> {
        let members = self.scope.child();
        {
            let mut scoped = self.scoped(members.clone());
            for field in &object.fields {
                scoped.eval_let(field)?;
            }
        }
        for method in &object.methods {
            if members.get(&method.name, true).is_some() {
                return Err(EvalError::AlreadyDefined(method.name.clone()));
            }
            // Methods close over the enclosing scope, not the member frame.
            let function = self.make_function(method, self.scope.clone(), true)?;
            members.define(method.name.clone(), RuntimeValue::Function(function))?;
        }
        Ok(RuntimeValue::Object(ObjectValue {
            name: object.name.clone(),
            members,
        }))
    }

    // ── Operators ────────────────────────────────────────────────────────

    fn eval_binary(
        &mut self,
        op: BinaryOp,
        left: &ast::Expr,
        right: &ast::Expr,
    ) -> EvalResult<RuntimeValue> {
        // Short-circuit for logical operators
        if matches!(op, BinaryOp::And | BinaryOp::Or) {
            let lv = expect_boolean(self.eval_expr(left)?)?;
            if (op == BinaryOp::And && !lv) || (op == BinaryOp::Or && lv) {
                return Ok(RuntimeValue::boolean(lv));
            }
            let rv = expect_boolean(self.eval_expr(right)?)?;
            return Ok(RuntimeValue::boolean(rv));
        }

        let lv = self.eval_expr(left)?;
        let rv = self.eval_expr(right)?;

        match op {
            BinaryOp::Add => eval_add(lv, rv),
            BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div => eval_arith(op, lv, rv),
            BinaryOp::Eq => Ok(RuntimeValue::boolean(lv == rv)),
            BinaryOp::NotEq => Ok(RuntimeValue::boolean(lv != rv)),
            BinaryOp::Less => eval_comparison(op, &lv, &rv, Ordering::is_lt),
            BinaryOp::LessEq => eval_comparison(op, &lv, &rv, Ordering::is_le),
            BinaryOp::Greater => eval_comparison(op, &lv, &rv, Ordering::is_gt),
            BinaryOp::GreaterEq => eval_comparison(op, &lv, &rv, Ordering::is_ge),
            BinaryOp::And | BinaryOp::Or => unreachable!("handled above"),
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Operator semantics
// ══════════════════════════════════════════════════════════════════════════════

fn literal_value(literal: &Literal) -> RuntimeValue {
    RuntimeValue::Primitive(match literal {
        Literal::Nil => Primitive::Nil,
        Literal::Boolean(value) => Primitive::Boolean(*value),
        Literal::Integer(value) => Primitive::Integer(value.clone()),
        Literal::Decimal(value) => Primitive::Decimal(value.clone()),
        Literal::String(value) => Primitive::String(value.clone()),
    })
}

fn expect_boolean(value: RuntimeValue) -> EvalResult<bool> {
    match value {
        RuntimeValue::Primitive(Primitive::Boolean(value)) => Ok(value),
        other => Err(EvalError::TypeMismatch {
            expected: "Boolean",
            found: other.type_name(),
        }),
    }
}

fn eval_add(lv: RuntimeValue, rv: RuntimeValue) -> EvalResult<RuntimeValue> {
    let is_string = |value: &RuntimeValue| {
        matches!(value, RuntimeValue::Primitive(Primitive::String(_)))
    };
    if is_string(&lv) || is_string(&rv) {
        return Ok(RuntimeValue::string(format!("{}{}", lv.print(), rv.print())));
    }
    eval_arith(BinaryOp::Add, lv, rv)
}

/// `+ - * /` over two numbers of the same kind.
fn eval_arith(op: BinaryOp, lv: RuntimeValue, rv: RuntimeValue) -> EvalResult<RuntimeValue> {
    match (lv, rv) {
        (
            RuntimeValue::Primitive(Primitive::Integer(a)),
            RuntimeValue::Primitive(Primitive::Integer(b)),
        ) => {
            let result = match op {
                BinaryOp::Add => a + b,
                BinaryOp::Sub => a - b,
                BinaryOp::Mul => a * b,
                _ => {
                    if b.is_zero() {
                        return Err(EvalError::DivisionByZero);
                    }
                    // Truncates toward zero.
                    a / b
                }
            };
            Ok(RuntimeValue::integer(result))
        }
        (
            RuntimeValue::Primitive(Primitive::Decimal(a)),
            RuntimeValue::Primitive(Primitive::Decimal(b)),
        ) => {
            let result = match op {
                BinaryOp::Add => a + b,
                BinaryOp::Sub => a - b,
                BinaryOp::Mul => a * b,
                _ => {
                    if b.is_zero() {
                        return Err(EvalError::DivisionByZero);
                    }
                    divide_decimal(&a, &b)
                }
            };
            Ok(RuntimeValue::decimal(result))
        }
        (lv, rv) => Err(EvalError::InvalidOperands {
            op,
            left: lv.type_name(),
            right: rv.type_name(),
        }),
    }
}

/// `a / b` rounded half-to-even at the scale of `a`.
pub fn divide_decimal(a: &BigDecimal, b: &BigDecimal) -> BigDecimal {
    let (a_digits, a_scale) = a.as_bigint_and_exponent();
    let (b_digits, b_scale) = b.as_bigint_and_exponent();
    // a / b = (a_digits / b_digits) * 10^(b_scale - a_scale); at scale
    // a_scale the unscaled quotient is a_digits * 10^b_scale / b_digits.
    let (numerator, denominator) = if b_scale >= 0 {
        (a_digits * pow10(b_scale.unsigned_abs()), b_digits)
    } else {
        (a_digits, b_digits * pow10(b_scale.unsigned_abs()))
    };
    BigDecimal::new(div_half_even(&numerator, &denominator), a_scale)
}

fn pow10(exponent: u64) -> BigInt {
    num_traits::pow(BigInt::from(10), exponent as usize)
}

fn div_half_even(numerator: &BigInt, denominator: &BigInt) -> BigInt {
    let quotient = numerator / denominator;
    let remainder = numerator % denominator;
    if remainder.is_zero() {
        return quotient;
    }
    let twice_remainder = remainder.magnitude() * 2u32;
    let away = match twice_remainder.cmp(denominator.magnitude()) {
        Ordering::Greater => true,
        Ordering::Less => false,
        Ordering::Equal => !(&quotient % 2u32).is_zero(),
    };
    if !away {
        quotient
    } else if (numerator.sign() == Sign::Minus) != (denominator.sign() == Sign::Minus) {
        quotient - 1
    } else {
        quotient + 1
    }
}

/// Order two primitives of the same comparable kind.
fn eval_comparison(
    op: BinaryOp,
    lv: &RuntimeValue,
    rv: &RuntimeValue,
    test: fn(Ordering) -> bool,
) -> EvalResult<RuntimeValue> {
    let ordering = match (lv, rv) {
        (RuntimeValue::Primitive(a), RuntimeValue::Primitive(b)) => match (a, b) {
            (Primitive::Boolean(a), Primitive::Boolean(b)) => Some(a.cmp(b)),
            (Primitive::Integer(a), Primitive::Integer(b)) => Some(a.cmp(b)),
            (Primitive::Decimal(a), Primitive::Decimal(b)) => Some(a.cmp(b)),
            (Primitive::String(a), Primitive::String(b)) => Some(a.cmp(b)),
            _ => None,
        },
        _ => None,
    };
    match ordering {
        Some(ordering) => Ok(RuntimeValue::boolean(test(ordering))),
        None => Err(EvalError::InvalidOperands {
            op,
            left: lv.type_name(),
            right: rv.type_name(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decimal(text: &str) -> BigDecimal {
        text.parse().unwrap()
    }

    #[test]
    fn test_divide_decimal_half_even() {
        assert_eq!(divide_decimal(&decimal("2.3"), &decimal("2.0")), decimal("1.2"));
        assert_eq!(divide_decimal(&decimal("2.5"), &decimal("2.0")), decimal("1.2"));
        assert_eq!(divide_decimal(&decimal("5"), &decimal("2")), decimal("2"));
        assert_eq!(divide_decimal(&decimal("7"), &decimal("2")), decimal("4"));
        assert_eq!(divide_decimal(&decimal("-2.3"), &decimal("2.0")), decimal("-1.2"));
        assert_eq!(divide_decimal(&decimal("-2.5"), &decimal("2.0")), decimal("-1.2"));
        assert_eq!(divide_decimal(&decimal("-3.5"), &decimal("2.0")), decimal("-1.8"));
        assert_eq!(divide_decimal(&decimal("1.00"), &decimal("3")), decimal("0.33"));
    }

    #[test]
    fn test_divide_decimal_keeps_dividend_scale() {
        let (_, scale) = divide_decimal(&decimal("10.000"), &decimal("4")).as_bigint_and_exponent();
        assert_eq!(scale, 3);
        let (_, scale) = divide_decimal(&decimal("1"), &decimal("0.3")).as_bigint_and_exponent();
        assert_eq!(scale, 0);
    }

    #[test]
    fn test_integer_division_truncates() {
        let div = |a: i64, b: i64| {
            eval_arith(BinaryOp::Div, RuntimeValue::integer(a), RuntimeValue::integer(b)).unwrap()
        };
        assert_eq!(div(7, 2), RuntimeValue::integer(3));
        assert_eq!(div(-7, 2), RuntimeValue::integer(-3));
    }

    #[test]
    fn test_gas_limit() {
        let meter = Meter {
            config: EvalConfig {
                gas_limit: 2,
                max_call_depth: 1,
            },
            gas: Cell::new(0),
            depth: Cell::new(0),
        };
        assert!(meter.tick().is_ok());
        assert!(meter.tick().is_ok());
        assert!(matches!(meter.tick(), Err(EvalError::GasExhausted(2))));
    }

    #[test]
    fn test_call_depth_released_on_drop() {
        let meter = Rc::new(Meter {
            config: EvalConfig {
                gas_limit: 10,
                max_call_depth: 1,
            },
            gas: Cell::new(0),
            depth: Cell::new(0),
        });
        {
            let _outer = meter.enter_call().unwrap();
            assert!(matches!(meter.enter_call(), Err(EvalError::CallDepthExceeded(1))));
        }
        assert!(meter.enter_call().is_ok());
    }
}
