//! Error types produced by schema-directed coercion.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Stable, machine-readable error codes.
///
/// These codes form a **stable API contract** — once published, variant names
/// and their serialized `snake_case` strings must never change across versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum ErrorCode {
    /// Target required a value but the input produced `Null`.
    UnexpectedNull,
    /// The value's shape is structurally incompatible with the target schema.
    UnexpectedType,
    /// One or more required object fields had no matching input and no default.
    MissingRequiredField,
    /// The string matcher found more than one equally good candidate.
    AmbiguousMatch,
    /// Both `true` and `false` were found as substrings of the input.
    AmbiguousBoolean,
    /// Every arm of a union failed to coerce.
    NoUnionMatch,
    /// The recursion guard fired for a self-referential schema/value pair.
    CircularReference,
    /// The pipeline or coercer recursed past its configured depth limit.
    DepthLimitExceeded,
    /// An invariant of the parser was violated; indicates a bug.
    Internal,
}

/// A scope path, dotted for human reading (`"user.addresses[0].zip"`).
pub type ScopePath = String;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("{scope}: expected a value, found null")]
    UnexpectedNull { scope: ScopePath },

    #[error("{scope}: {reason}")]
    UnexpectedType { scope: ScopePath, reason: String },

    #[error("{scope}: missing required field(s): {}", .names.join(", "))]
    MissingRequiredField { scope: ScopePath, names: Vec<String> },

    #[error("{scope}: ambiguous match between candidates: {}", .candidates.join(", "))]
    AmbiguousMatch {
        scope: ScopePath,
        candidates: Vec<String>,
    },

    #[error("{scope}: ambiguous boolean — both `true` and `false` appear in the input")]
    AmbiguousBoolean { scope: ScopePath },

    #[error("{scope}: no union arm matched")]
    NoUnionMatch {
        scope: ScopePath,
        causes: Vec<ParseError>,
    },

    #[error("{scope}: circular reference detected")]
    CircularReference { scope: ScopePath },

    #[error("{scope}: depth limit exceeded (max: {max_depth})")]
    DepthLimitExceeded { scope: ScopePath, max_depth: usize },

    #[error("internal error: {0}")]
    Internal(String),
}

impl ParseError {
    /// Returns the stable error code for this error variant.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            ParseError::UnexpectedNull { .. } => ErrorCode::UnexpectedNull,
            ParseError::UnexpectedType { .. } => ErrorCode::UnexpectedType,
            ParseError::MissingRequiredField { .. } => ErrorCode::MissingRequiredField,
            ParseError::AmbiguousMatch { .. } => ErrorCode::AmbiguousMatch,
            ParseError::AmbiguousBoolean { .. } => ErrorCode::AmbiguousBoolean,
            ParseError::NoUnionMatch { .. } => ErrorCode::NoUnionMatch,
            ParseError::CircularReference { .. } => ErrorCode::CircularReference,
            ParseError::DepthLimitExceeded { .. } => ErrorCode::DepthLimitExceeded,
            ParseError::Internal(_) => ErrorCode::Internal,
        }
    }

    /// Returns the scope path this error occurred at, if any.
    pub fn scope(&self) -> Option<&str> {
        match self {
            ParseError::UnexpectedNull { scope } => Some(scope),
            ParseError::UnexpectedType { scope, .. } => Some(scope),
            ParseError::MissingRequiredField { scope, .. } => Some(scope),
            ParseError::AmbiguousMatch { scope, .. } => Some(scope),
            ParseError::AmbiguousBoolean { scope } => Some(scope),
            ParseError::NoUnionMatch { scope, .. } => Some(scope),
            ParseError::CircularReference { scope } => Some(scope),
            ParseError::DepthLimitExceeded { scope, .. } => Some(scope),
            ParseError::Internal(_) => None,
        }
    }

    /// Sub-errors for union and multi-field failures, empty otherwise.
    pub fn causes(&self) -> &[ParseError] {
        match self {
            ParseError::NoUnionMatch { causes, .. } => causes,
            _ => &[],
        }
    }

    /// Produces a structured JSON error for diagnostics or FFI consumers.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "code": self.error_code(),
            "message": self.to_string(),
            "scope": self.scope(),
        })
    }
}
