//! Parser runtime: entry points, state, and failure contracts.

pub mod error;
mod machine;
pub mod position;
mod state;

pub use error::{FailureKind, ParseError};
pub use position::Position;

use crate::combinator::ir::{Context, Token};
use crate::compiler::module::ParserModule;
use crate::runtime::machine::Machine;

/// Default recursion guard for named-combinator calls.
const DEFAULT_MAX_CALL_DEPTH: usize = 1024;

/// Options accepted by [`Parser::parse`].
#[derive(Debug, Clone)]
pub struct ParseOpts {
    /// Initial byte offset reported in positions.
    pub byte_offset: usize,
    /// Initial line number.
    pub line: u32,
    /// Initial context.
    pub context: Context,
    /// Maximum nesting of named-combinator calls.
    pub max_call_depth: usize,
}

impl Default for ParseOpts {
    fn default() -> Self {
        Self {
            byte_offset: 0,
            line: 1,
            context: Context::new(),
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
        }
    }
}

/// Successful parse payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOutcome<'i> {
    /// Emitted tokens in production order.
    pub tokens: Vec<Token>,
    /// Unconsumed input suffix.
    pub rest: &'i [u8],
    /// Context after the parse.
    pub context: Context,
    /// Position after the parse.
    pub position: Position,
    /// Total bytes consumed.
    pub consumed: usize,
}

/// Parse handle for one public entry point.
#[derive(Debug, Clone, Copy)]
pub struct Parser<'m> {
    module: &'m ParserModule,
    definition: usize,
}

impl<'m> Parser<'m> {
    pub(crate) fn new(module: &'m ParserModule, definition: usize) -> Self {
        Self { module, definition }
    }

    /// Returns the definition name this handle parses.
    pub fn name(&self) -> &str {
        &self.module.definition(self.definition).name
    }

    /// Runs the compiled recognizer over the input.
    pub fn parse<'i>(
        &self,
        input: &'i [u8],
        opts: ParseOpts,
    ) -> Result<ParseOutcome<'i>, ParseError<'i>> {
        let recognizer = &self.module.definition(self.definition).recognizer;
        let position = Position::start(opts.byte_offset, opts.line);
        let machine = Machine::new(
            self.module,
            recognizer,
            input,
            opts.context,
            position,
            opts.max_call_depth,
        );
        machine.run(recognizer.entry())
    }
}
