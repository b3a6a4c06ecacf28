//! Generation error contracts.

use std::fmt;

/// Stable generation-error categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerateErrorKind {
    /// The named definition does not exist in the module.
    UnknownDefinition,
    /// The target definition kept no IR snapshot to walk.
    UnreachableIr,
    /// Rejection sampling over a segment kept drawing excluded codepoints.
    RetriesExhausted,
    /// Recursive named-combinator calls nested past the guard.
    DepthExceeded,
}

impl fmt::Display for GenerateErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownDefinition => write!(f, "unknown definition"),
            Self::UnreachableIr => write!(f, "unreachable IR"),
            Self::RetriesExhausted => write!(f, "retries exhausted"),
            Self::DepthExceeded => write!(f, "depth exceeded"),
        }
    }
}

/// Generation error payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateError {
    /// Error category.
    pub kind: GenerateErrorKind,
    /// Human-readable error message.
    pub message: String,
}

impl GenerateError {
    /// Creates a generation error.
    pub fn new(kind: GenerateErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Creates an `UnknownDefinition` error.
    pub fn unknown_definition(name: &str) -> Self {
        Self::new(
            GenerateErrorKind::UnknownDefinition,
            format!("definition '{name}' is not declared in this module"),
        )
    }

    /// Creates an `UnreachableIr` error.
    pub fn unreachable_ir(name: &str) -> Self {
        Self::new(
            GenerateErrorKind::UnreachableIr,
            format!("definition '{name}' was compiled without metadata export"),
        )
    }

    /// Creates a `RetriesExhausted` error.
    pub fn retries_exhausted(limit: usize) -> Self {
        Self::new(
            GenerateErrorKind::RetriesExhausted,
            format!("segment sampling rejected {limit} consecutive draws"),
        )
    }

    /// Creates a `DepthExceeded` error.
    pub fn depth_exceeded(limit: usize) -> Self {
        Self::new(
            GenerateErrorKind::DepthExceeded,
            format!("generation recursed past {limit} nested calls"),
        )
    }
}

impl fmt::Display for GenerateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for GenerateError {}
