//! Build-time error contracts.

use std::fmt;

/// Stable build-error categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildErrorKind {
    /// A wrapper combinator was given an empty body.
    EmptyBody,
    /// A codepoint range is malformed or outside the modifier's domain.
    InvalidRange,
    /// A repetition or width count is out of its accepted domain.
    InvalidCount,
    /// A weight list is mismatched or contains non-positive entries.
    InvalidWeights,
    /// A choice was given fewer than two alternatives.
    TooFewAlternatives,
    /// An end-of-input assertion is not at the logical end of its program.
    MisplacedEos,
    /// A call names a definition or module that cannot be resolved.
    UnknownTarget,
    /// A remote call targets a definition compiled without combinator export.
    TargetNotExported,
    /// A definition name was declared more than once.
    DuplicateDefinition,
}

impl fmt::Display for BuildErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyBody => write!(f, "empty body"),
            Self::InvalidRange => write!(f, "invalid range"),
            Self::InvalidCount => write!(f, "invalid count"),
            Self::InvalidWeights => write!(f, "invalid weights"),
            Self::TooFewAlternatives => write!(f, "too few alternatives"),
            Self::MisplacedEos => write!(f, "misplaced end-of-input assertion"),
            Self::UnknownTarget => write!(f, "unknown call target"),
            Self::TargetNotExported => write!(f, "call target not exported"),
            Self::DuplicateDefinition => write!(f, "duplicate definition"),
        }
    }
}

/// Build error payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildError {
    /// Error category.
    pub kind: BuildErrorKind,
    /// Human-readable error summary.
    pub message: String,
    /// Optional additional detail.
    pub detail: Option<String>,
}

impl BuildError {
    /// Creates a build error.
    pub fn new(kind: BuildErrorKind, message: impl Into<String>, detail: Option<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            detail,
        }
    }

    /// Creates an `EmptyBody` error for the named operation.
    pub fn empty_body(operation: &str) -> Self {
        Self::new(
            BuildErrorKind::EmptyBody,
            format!("{operation} requires a non-empty body"),
            None,
        )
    }

    /// Creates an `InvalidRange` error.
    pub fn invalid_range(message: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(BuildErrorKind::InvalidRange, message, Some(detail.into()))
    }

    /// Creates an `InvalidCount` error.
    pub fn invalid_count(message: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(BuildErrorKind::InvalidCount, message, Some(detail.into()))
    }

    /// Creates an `InvalidWeights` error.
    pub fn invalid_weights(message: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(BuildErrorKind::InvalidWeights, message, Some(detail.into()))
    }

    /// Creates a `TooFewAlternatives` error.
    pub fn too_few_alternatives(count: usize) -> Self {
        Self::new(
            BuildErrorKind::TooFewAlternatives,
            "choice requires at least two alternatives",
            Some(format!("received {count} alternative(s)")),
        )
    }

    /// Creates a `MisplacedEos` error.
    pub fn misplaced_eos(position: usize, length: usize) -> Self {
        Self::new(
            BuildErrorKind::MisplacedEos,
            "end-of-input assertion must be the last node of its program",
            Some(format!("found at node {position} of {length}")),
        )
    }

    /// Creates an `UnknownTarget` error.
    pub fn unknown_target(message: impl Into<String>) -> Self {
        Self::new(BuildErrorKind::UnknownTarget, message, None)
    }

    /// Creates a `TargetNotExported` error.
    pub fn target_not_exported(module: &str, name: &str) -> Self {
        Self::new(
            BuildErrorKind::TargetNotExported,
            format!("definition '{name}' in module '{module}' is not exported for remote calls"),
            None,
        )
    }

    /// Creates a `DuplicateDefinition` error.
    pub fn duplicate_definition(name: &str) -> Self {
        Self::new(
            BuildErrorKind::DuplicateDefinition,
            format!("definition '{name}' is declared more than once"),
            None,
        )
    }
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.detail {
            Some(detail) => write!(f, "{} ({detail})", self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for BuildError {}
