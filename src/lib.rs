//! Byte-level parser combinators compiled to fused-pattern recognizers.
//!
//! A grammar is assembled by chaining builder operations into a
//! [`combinator::Program`], compiled into recognizer stages through a
//! [`compiler::ModuleBuilder`], and driven over in-memory input by the
//! [`runtime`]. Definitions compiled with metadata export can also be
//! walked backwards by the [`generator`] to produce inputs the compiled
//! recognizer accepts.

pub mod combinator;
pub mod compiler;
pub mod generator;
pub mod runtime;
