//! PLC analyzer: static type checking of a syntax tree.
//!
//! ```text
//! Source (from parser) → Analyzer → typed IR (to generator)
//! ```
//!
//! The analyzer is independent of the evaluator; programs may be run
//! without being analyzed first.

pub mod analyzer;
pub mod error;
pub mod ir;
pub mod stdlib;
pub mod ty;

pub use analyzer::Analyzer;
pub use error::{AnalysisError, AnalysisResult};
pub use stdlib::{root_scope, TypeTable};
pub use ty::{require_subtype, Type};

use plc_types::ast;
use plc_types::Scope;

/// Analyze `source` in `scope` using the predefined type table.
///
/// Names defined at the top level of `source` are added to `scope`.
pub fn analyze(source: &ast::Source, scope: &Scope<Type>) -> AnalysisResult<ir::Source> {
    let types = TypeTable::new();
    Analyzer::new(&types, scope.clone()).analyze_source(source)
}
