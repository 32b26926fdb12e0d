//! The predefined runtime environment.
//!
//! [`Environment`] owns a root scope with the builtin callables bound and
//! the buffers their side effects are recorded in. Hosts clone
//! [`Environment::scope`] into an evaluator and read the side effects back
//! afterwards.

use std::cell::RefCell;
use std::rc::Rc;

use num_bigint::BigInt;
use plc_types::Scope;

use crate::error::{EvalError, EvalResult};
use crate::value::{Function, Primitive, RuntimeValue};

/// Root scope plus recorded side effects.
#[derive(Clone)]
pub struct Environment {
    scope: Scope<RuntimeValue>,
    logged: Rc<RefCell<Vec<RuntimeValue>>>,
    printed: Rc<RefCell<Vec<String>>>,
}

impl Environment {
    /// An environment whose `print` writes to stdout.
    pub fn new() -> Self {
        Self::build(false)
    }

    /// An environment whose `print` records text instead of writing it.
    pub fn captured() -> Self {
        Self::build(true)
    }

    fn build(capture_print: bool) -> Self {
        let env = Self {
            scope: Scope::root(),
            logged: Rc::default(),
            printed: Rc::default(),
        };

        let logged = Rc::clone(&env.logged);
        env.register(Function::new("log", move |arguments| {
            let [value] = expect_arguments::<1>("log", arguments)?;
            logged.borrow_mut().push(value.clone());
            Ok(value)
        }));

        let printed = Rc::clone(&env.printed);
        env.register(Function::new("print", move |arguments| {
            let [value] = expect_arguments::<1>("print", arguments)?;
            let text = value.print();
            if capture_print {
                printed.borrow_mut().push(text);
            } else {
                println!("{text}");
            }
            Ok(RuntimeValue::NIL)
        }));

        env.register(Function::new("list", |arguments| Ok(RuntimeValue::list(arguments))));
        env.register(Function::new("range", range));
        env
    }

    fn register(&self, function: Function) {
        let name = function.name.clone();
        let defined = self.scope.define(name, RuntimeValue::Function(function));
        debug_assert!(defined.is_ok(), "duplicate builtin");
    }

    /// The root scope. Handles share bindings with this environment.
    pub fn scope(&self) -> Scope<RuntimeValue> {
        self.scope.clone()
    }

    /// Values passed to `log`, in call order.
    pub fn logged(&self) -> Vec<RuntimeValue> {
        self.logged.borrow().clone()
    }

    /// Text recorded by `print` in a captured environment.
    pub fn printed(&self) -> Vec<String> {
        self.printed.borrow().clone()
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

/// Check the argument count of a builtin and destructure its arguments.
pub fn expect_arguments<const N: usize>(
    name: &str,
    arguments: Vec<RuntimeValue>,
) -> EvalResult<[RuntimeValue; N]> {
    let found = arguments.len();
    arguments.try_into().map_err(|_| EvalError::WrongArgCount {
        name: name.to_string(),
        expected: N,
        found,
    })
}

/// `range(start, end)`: the integers from `start` through `end`.
fn range(arguments: Vec<RuntimeValue>) -> EvalResult<RuntimeValue> {
    let [start, end] = expect_arguments::<2>("range", arguments)?;
    let (start, end) = match (start, end) {
        (
            RuntimeValue::Primitive(Primitive::Integer(start)),
            RuntimeValue::Primitive(Primitive::Integer(end)),
        ) => (start, end),
        (start, end) => {
            return Err(EvalError::builtin(
                "range",
                format!(
                    "expected Integer bounds, found {} and {}",
                    start.type_name(),
                    end.type_name()
                ),
            ))
        }
    };
    let mut values = Vec::new();
    let mut current = start;
    while current <= end {
        values.push(RuntimeValue::integer(current.clone()));
        current += BigInt::from(1);
    }
    Ok(RuntimeValue::list(values))
}
