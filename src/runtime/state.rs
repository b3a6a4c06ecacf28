//! Mutable parse state threaded through recognizer stages.

use crate::combinator::ir::{Context, Token};
use crate::runtime::position::Position;

/// Restorable snapshot of the parse state.
///
/// Taken at choice, loop, lookahead, and eventually boundaries so a failed
/// attempt can be rolled back without touching the input.
#[derive(Debug, Clone)]
pub(crate) struct Checkpoint {
    pub(crate) cursor: usize,
    pub(crate) acc_len: usize,
    pub(crate) context: Context,
    pub(crate) position: Position,
}

/// In-flight parse state.
///
/// The accumulator holds tokens in production order; `Vec` push-back is
/// the O(1) append, and the returned token list is the accumulator itself.
#[derive(Debug)]
pub(crate) struct ParseState<'i> {
    pub(crate) input: &'i [u8],
    pub(crate) cursor: usize,
    pub(crate) acc: Vec<Token>,
    pub(crate) context: Context,
    pub(crate) position: Position,
}

impl<'i> ParseState<'i> {
    /// Creates state over the given input.
    pub(crate) fn new(input: &'i [u8], context: Context, position: Position) -> Self {
        Self {
            input,
            cursor: 0,
            acc: Vec::new(),
            context,
            position,
        }
    }

    /// Returns the unconsumed input suffix.
    pub(crate) fn rest(&self) -> &'i [u8] {
        &self.input[self.cursor..]
    }

    /// Returns `true` when every input byte is consumed.
    pub(crate) fn at_end(&self) -> bool {
        self.cursor == self.input.len()
    }

    /// Consumes `width` bytes, updating the position.
    pub(crate) fn advance(&mut self, width: usize) {
        let consumed = &self.input[self.cursor..self.cursor + width];
        self.position.advance(consumed);
        self.cursor += width;
    }

    /// Takes a restorable snapshot.
    pub(crate) fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            cursor: self.cursor,
            acc_len: self.acc.len(),
            context: self.context.clone(),
            position: self.position,
        }
    }

    /// Rolls back to a snapshot.
    pub(crate) fn restore(&mut self, checkpoint: &Checkpoint) {
        self.cursor = checkpoint.cursor;
        self.acc.truncate(checkpoint.acc_len);
        self.context = checkpoint.context.clone();
        self.position = checkpoint.position;
    }
}
