use serde::{Deserialize, Serialize};
use std::fmt;

/// Error category, determined by error code range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    Type,
    Scope,
    Structure,
    Runtime,
}

/// Numeric error code (E200–E799).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ErrorCode(pub u16);

impl ErrorCode {
    // ── Type errors (E200–E299) ──
    pub const UNKNOWN_TYPE: Self = Self(200);
    pub const TYPE_MISMATCH: Self = Self(201);
    pub const WRONG_ARG_COUNT: Self = Self(202);
    pub const NOT_CALLABLE: Self = Self(203);
    pub const NOT_AN_OBJECT: Self = Self(204);
    pub const RESERVED_TYPE_NAME: Self = Self(205);

    // ── Scope errors (E500–E599) ──
    pub const ALREADY_DEFINED: Self = Self(500);
    pub const UNDEFINED_NAME: Self = Self(501);
    pub const UNDEFINED_MEMBER: Self = Self(502);
    pub const DUPLICATE_PARAMETER: Self = Self(503);
    pub const RETURN_OUTSIDE_FUNCTION: Self = Self(504);

    // ── Structure errors (E600–E699) ──
    pub const INVALID_ASSIGNMENT_TARGET: Self = Self(600);

    // ── Runtime errors (E700–E799) ──
    pub const DIVISION_BY_ZERO: Self = Self(700);
    pub const GAS_EXHAUSTED: Self = Self(701);
    pub const CALL_DEPTH_EXCEEDED: Self = Self(702);
    pub const BUILTIN_FAILURE: Self = Self(703);

    /// Get the category for this error code.
    pub fn category(self) -> ErrorCategory {
        match self.0 {
            200..=299 => ErrorCategory::Type,
            500..=599 => ErrorCategory::Scope,
            600..=699 => ErrorCategory::Structure,
            _ => ErrorCategory::Runtime,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{}", self.0)
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Type => write!(f, "type"),
            Self::Scope => write!(f, "scope"),
            Self::Structure => write!(f, "structure"),
            Self::Runtime => write!(f, "runtime"),
        }
    }
}

/// A structured, host-facing rendering of an analysis or evaluation error.
///
/// Hosts render these; they must not parse free-form error strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Error code (e.g., E201).
    pub code: ErrorCode,
    /// Error category (derived from code).
    pub category: ErrorCategory,
    /// Human-readable error message.
    pub message: String,
}

impl Diagnostic {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            category: code.category(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}] {}", self.code, self.category, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_category() {
        assert_eq!(ErrorCode::TYPE_MISMATCH.category(), ErrorCategory::Type);
        assert_eq!(ErrorCode::UNDEFINED_NAME.category(), ErrorCategory::Scope);
        assert_eq!(
            ErrorCode::INVALID_ASSIGNMENT_TARGET.category(),
            ErrorCategory::Structure
        );
        assert_eq!(ErrorCode::DIVISION_BY_ZERO.category(), ErrorCategory::Runtime);
    }

    #[test]
    fn test_error_code_display() {
        assert_eq!(ErrorCode::TYPE_MISMATCH.to_string(), "E201");
        assert_eq!(ErrorCode::GAS_EXHAUSTED.to_string(), "E701");
    }

    #[test]
    fn test_diagnostic_display() {
        let diagnostic = Diagnostic::new(ErrorCode::UNDEFINED_NAME, "undefined name `x`");
        assert_eq!(diagnostic.category, ErrorCategory::Scope);
        assert_eq!(diagnostic.to_string(), "E501 [scope] undefined name `x`");
    }
}
