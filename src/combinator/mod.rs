//! Combinator IR and builder API.

pub mod builder;
pub mod error;
pub mod ir;

pub use builder::{Count, RepeatOptions, empty};
pub use error::{BuildError, BuildErrorKind};
pub use ir::{
    CallTarget, ClassRange, CodeRange, Context, GenTimes, Node, NodeSpec, Program,
    SegmentModifier, Token, TraverseHook, TraverseOp, TraversePhase, WhileHook, WhileVerdict,
};
