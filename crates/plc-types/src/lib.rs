//! Shared types for PLC.
//!
//! This crate defines the syntax tree handed over by the external parser,
//! the generic scope chain used by both the analyzer and the evaluator,
//! and the error code vocabulary shared by their diagnostics.

mod error;
pub mod ast;
pub mod scope;

pub use error::{Diagnostic, ErrorCategory, ErrorCode};
pub use scope::{Redefinition, Scope};
