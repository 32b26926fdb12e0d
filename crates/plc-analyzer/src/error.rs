//! Static analysis errors.

use crate::ty::Type;
use plc_types::ast::BinaryOp;
use plc_types::{Diagnostic, ErrorCode, Redefinition};

/// The first static violation found in a unit. Analysis stops at it.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AnalysisError {
    #[error("`{0}` is already defined in this scope")]
    AlreadyDefined(String),
    #[error("undefined type `{0}`")]
    UndefinedType(String),
    #[error("undefined name `{0}`")]
    UndefinedName(String),
    #[error("object has no member `{0}`")]
    UndefinedMember(String),
    #[error("duplicate parameter `{0}`")]
    DuplicateParameter(String),
    #[error("expected `{expected}`, found `{found}`")]
    TypeMismatch { expected: Type, found: Type },
    #[error("`{op}` cannot be applied to `{left}` and `{right}`")]
    InvalidOperands { op: BinaryOp, left: Type, right: Type },
    #[error("`{name}` expects {expected} argument(s), found {found}")]
    WrongArgCount {
        name: String,
        expected: usize,
        found: usize,
    },
    #[error("`{name}` is not callable, found `{found}`")]
    NotCallable { name: String, found: Type },
    #[error("expected an object, found `{0}`")]
    NotAnObject(Type),
    #[error("object name `{0}` is a predefined type")]
    ReservedTypeName(String),
    #[error("only variables and properties can be assigned")]
    InvalidAssignmentTarget,
    #[error("RETURN outside of a function")]
    ReturnOutsideFunction,
}

impl AnalysisError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::AlreadyDefined(_) => ErrorCode::ALREADY_DEFINED,
            Self::UndefinedType(_) => ErrorCode::UNKNOWN_TYPE,
            Self::UndefinedName(_) => ErrorCode::UNDEFINED_NAME,
            Self::UndefinedMember(_) => ErrorCode::UNDEFINED_MEMBER,
            Self::DuplicateParameter(_) => ErrorCode::DUPLICATE_PARAMETER,
            Self::TypeMismatch { .. } | Self::InvalidOperands { .. } => ErrorCode::TYPE_MISMATCH,
            Self::WrongArgCount { .. } => ErrorCode::WRONG_ARG_COUNT,
            Self::NotCallable { .. } => ErrorCode::NOT_CALLABLE,
            Self::NotAnObject(_) => ErrorCode::NOT_AN_OBJECT,
            Self::ReservedTypeName(_) => ErrorCode::RESERVED_TYPE_NAME,
            Self::InvalidAssignmentTarget => ErrorCode::INVALID_ASSIGNMENT_TARGET,
            Self::ReturnOutsideFunction => ErrorCode::RETURN_OUTSIDE_FUNCTION,
        }
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        Diagnostic::new(self.code(), self.to_string())
    }
}

impl From<Redefinition> for AnalysisError {
    fn from(err: Redefinition) -> Self {
        Self::AlreadyDefined(err.0)
    }
}

/// Result alias for analyzer operations.
pub type AnalysisResult<T> = Result<T, AnalysisError>;
