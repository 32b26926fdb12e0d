//! Runtime error types for the PLC evaluator.

use plc_types::ast::BinaryOp;
use plc_types::{Diagnostic, ErrorCode, Redefinition};

/// Evaluation error: the first runtime failure aborts the whole unit.
///
/// `RETURN` is not an error; it travels as [`crate::Flow::Return`].
#[derive(Debug, Clone, thiserror::Error)]
pub enum EvalError {
    #[error("`{0}` is already defined in this scope")]
    AlreadyDefined(String),
    #[error("undefined name `{0}`")]
    UndefinedName(String),
    #[error("object has no member `{0}`")]
    UndefinedMember(String),
    #[error("duplicate parameter `{0}`")]
    DuplicateParameter(String),
    #[error("`{name}` expects {expected} argument(s), found {found}")]
    WrongArgCount {
        name: String,
        expected: usize,
        found: usize,
    },
    #[error("`{name}` is not a function, found {found}")]
    NotCallable { name: String, found: &'static str },
    #[error("expected an object, found {0}")]
    NotAnObject(&'static str),
    #[error("expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },
    #[error("`{op}` cannot be applied to {left} and {right}")]
    InvalidOperands {
        op: BinaryOp,
        left: &'static str,
        right: &'static str,
    },
    #[error("division by zero")]
    DivisionByZero,
    #[error("only variables and properties can be assigned")]
    InvalidAssignmentTarget,
    #[error("RETURN outside of a function")]
    ReturnOutsideFunction,
    #[error("gas exhausted after {0} steps")]
    GasExhausted(u64),
    #[error("call depth exceeded {0}")]
    CallDepthExceeded(usize),
    /// Failure reported by a host-provided builtin.
    #[error("{name}: {message}")]
    Builtin { name: String, message: String },
}

impl EvalError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::AlreadyDefined(_) => ErrorCode::ALREADY_DEFINED,
            Self::UndefinedName(_) => ErrorCode::UNDEFINED_NAME,
            Self::UndefinedMember(_) => ErrorCode::UNDEFINED_MEMBER,
            Self::DuplicateParameter(_) => ErrorCode::DUPLICATE_PARAMETER,
            Self::WrongArgCount { .. } => ErrorCode::WRONG_ARG_COUNT,
            Self::NotCallable { .. } => ErrorCode::NOT_CALLABLE,
            Self::NotAnObject(_) => ErrorCode::NOT_AN_OBJECT,
            Self::TypeMismatch { .. } | Self::InvalidOperands { .. } => ErrorCode::TYPE_MISMATCH,
            Self::DivisionByZero => ErrorCode::DIVISION_BY_ZERO,
            Self::InvalidAssignmentTarget => ErrorCode::INVALID_ASSIGNMENT_TARGET,
            Self::ReturnOutsideFunction => ErrorCode::RETURN_OUTSIDE_FUNCTION,
            Self::GasExhausted(_) => ErrorCode::GAS_EXHAUSTED,
            Self::CallDepthExceeded(_) => ErrorCode::CALL_DEPTH_EXCEEDED,
            Self::Builtin { .. } => ErrorCode::BUILTIN_FAILURE,
        }
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        Diagnostic::new(self.code(), self.to_string())
    }

    /// Convenience constructor for builtin failures.
    pub fn builtin(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Builtin {
            name: name.into(),
            message: message.into(),
        }
    }
}

impl From<Redefinition> for EvalError {
    fn from(err: Redefinition) -> Self {
        Self::AlreadyDefined(err.0)
    }
}

/// Result alias for evaluator operations.
pub type EvalResult<T> = Result<T, EvalError>;
