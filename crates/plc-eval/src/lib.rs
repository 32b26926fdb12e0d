//! PLC tree-walking evaluator.
//!
//! Executes programs directly from the syntax tree. Static analysis is
//! optional: every check the analyzer makes is repeated here at runtime.
//!
//! ```text
//! Source → Evaluator (in an Environment's scope) → RuntimeValue + side effects
//! ```

pub mod env;
pub mod error;
pub mod evaluator;
mod guard;
pub mod value;

pub use env::Environment;
pub use error::{EvalError, EvalResult};
pub use evaluator::{EvalConfig, Evaluator, Flow};
pub use guard::ScopedEvaluator;
pub use value::{Function, ObjectValue, Primitive, RuntimeValue};

use plc_types::ast;
use plc_types::Scope;

/// Evaluate `source` in `scope` with default limits.
///
/// Names defined at the top level of `source` are added to `scope`.
pub fn evaluate(source: &ast::Source, scope: &Scope<RuntimeValue>) -> EvalResult<RuntimeValue> {
    Evaluator::new(scope.clone()).evaluate_source(source)
}
