//! Combinator-program compiler.

pub(crate) mod fuse;
pub(crate) mod inline;
pub(crate) mod lower;
pub mod module;
pub mod stage;

pub use module::{DefineOptions, ModuleBuilder, ParserModule};
pub use stage::{Recognizer, StageId};
