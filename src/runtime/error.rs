//! Parse-time failure contracts.

use std::fmt;

use crate::combinator::ir::Context;
use crate::runtime::position::Position;

/// Stable parse-failure categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// A fused bound pattern did not match the input head.
    Mismatch,
    /// A negative lookahead observed its body.
    Lookahead,
    /// A traverse hook rejected the accumulated tokens.
    Traverse,
    /// An eventually search exhausted the input.
    Eventually,
    /// The call-depth guard tripped; never retried.
    DepthExceeded,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mismatch => write!(f, "mismatch"),
            Self::Lookahead => write!(f, "lookahead"),
            Self::Traverse => write!(f, "traverse"),
            Self::Eventually => write!(f, "eventually"),
            Self::DepthExceeded => write!(f, "depth exceeded"),
        }
    }
}

/// Parse failure payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError<'i> {
    /// Failure category.
    pub kind: FailureKind,
    /// Human-readable failure reason.
    pub reason: String,
    /// Unconsumed input at the failure.
    pub rest: &'i [u8],
    /// Context at the failure.
    pub context: Context,
    /// Position at the failure.
    pub position: Position,
    /// Bytes consumed before the failure.
    pub consumed: usize,
}

impl fmt::Display for ParseError<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} at line {}, column {}",
            self.reason,
            self.position.line,
            self.position.column()
        )
    }
}
