//! Combinator IR contracts walked by the compiler and the generator.
//!
//! A [`Program`] is an ordered sequence of [`Node`]s in logical order; the
//! builder appends at the tail. The plain-data [`NodeSpec`] mirror is the
//! documented introspection format published for definitions compiled with
//! metadata export.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::runtime::Position;

/// Accumulator element emitted by recognizer stages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Codepoint or folded numeric value.
    Integer(i64),
    /// Literal or folded textual value.
    String(String),
    /// Raw byte run.
    Bytes(Vec<u8>),
    /// Wrapped subtree of tokens.
    List(Vec<Token>),
    /// Tagged payload.
    Tagged(String, Box<Token>),
    /// Tokens paired with the line they were observed on.
    AtLine(u32, Vec<Token>),
    /// Tokens paired with the byte offset they were observed at.
    AtOffset(usize, Vec<Token>),
}

impl Token {
    /// Convenience constructor for a string token.
    pub fn string(value: impl Into<String>) -> Self {
        Self::String(value.into())
    }
}

/// Caller-owned state threaded through a parse.
///
/// Traverse and repeat-while callbacks may rewrite it freely; every other
/// construct threads it through unchanged.
pub type Context = BTreeMap<String, Token>;

/// Verdict returned by a repeat-while callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WhileVerdict {
    /// Keep iterating with the given context.
    Continue(Context),
    /// Stop iterating with the given context.
    Halt(Context),
}

type TraverseFn =
    dyn Fn(&[u8], Vec<Token>, Context, Position) -> Result<(Vec<Token>, Context), String>
        + Send
        + Sync;

/// Named accumulator/context rewrite hook.
///
/// The callback receives the unconsumed input, the tokens produced by the
/// traversed body in production order, the context, and the observed
/// position. It returns the replacement tokens and context, or an error
/// string that becomes a parse failure at the traverse's position. The
/// input slice is read-only; a hook cannot move the cursor.
#[derive(Clone)]
pub struct TraverseHook {
    name: Arc<str>,
    call: Arc<TraverseFn>,
}

impl TraverseHook {
    /// Creates a named traverse hook.
    pub fn new(
        name: impl Into<String>,
        call: impl Fn(&[u8], Vec<Token>, Context, Position) -> Result<(Vec<Token>, Context), String>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        Self {
            name: name.into().into(),
            call: Arc::new(call),
        }
    }

    /// Returns the hook's display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Applies the hook.
    pub fn apply(
        &self,
        rest: &[u8],
        acc: Vec<Token>,
        context: Context,
        position: Position,
    ) -> Result<(Vec<Token>, Context), String> {
        (self.call)(rest, acc, context, position)
    }
}

impl fmt::Debug for TraverseHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TraverseHook").field(&self.name).finish()
    }
}

type WhileFn = dyn Fn(&[u8], Context, Position) -> WhileVerdict + Send + Sync;

/// Named loop-continuation hook consulted after each repeat iteration.
#[derive(Clone)]
pub struct WhileHook {
    name: Arc<str>,
    call: Arc<WhileFn>,
}

impl WhileHook {
    /// Creates a named repeat-while hook.
    pub fn new(
        name: impl Into<String>,
        call: impl Fn(&[u8], Context, Position) -> WhileVerdict + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into().into(),
            call: Arc::new(call),
        }
    }

    /// Returns the hook's display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Consults the hook.
    pub fn consult(&self, rest: &[u8], context: Context, position: Position) -> WhileVerdict {
        (self.call)(rest, context, position)
    }
}

impl fmt::Debug for WhileHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("WhileHook").field(&self.name).finish()
    }
}

/// One inclusive codepoint span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodeRange {
    /// Lowest codepoint, inclusive.
    pub lo: u32,
    /// Highest codepoint, inclusive.
    pub hi: u32,
}

impl CodeRange {
    /// Creates a span, normalizing bound order.
    pub fn new(lo: u32, hi: u32) -> Self {
        if lo <= hi {
            Self { lo, hi }
        } else {
            Self { lo: hi, hi: lo }
        }
    }

    /// Returns `true` when the span contains the codepoint.
    pub fn contains(self, codepoint: u32) -> bool {
        self.lo <= codepoint && codepoint <= self.hi
    }
}

/// Codepoint range accepted or rejected by a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassRange {
    /// Accept codepoints in this span.
    Inclusive(u32, u32),
    /// Reject codepoints in this span.
    Exclusive(u32, u32),
}

impl ClassRange {
    /// Creates an inclusive span from characters.
    pub fn inclusive(lo: char, hi: char) -> Self {
        Self::Inclusive(lo as u32, hi as u32)
    }

    /// Creates an exclusive span from characters.
    pub fn exclusive(lo: char, hi: char) -> Self {
        Self::Exclusive(lo as u32, hi as u32)
    }

    /// Creates a single-character inclusive span.
    pub fn single(ch: char) -> Self {
        Self::Inclusive(ch as u32, ch as u32)
    }

    /// Creates a single-character exclusive span.
    pub fn not(ch: char) -> Self {
        Self::Exclusive(ch as u32, ch as u32)
    }
}

impl From<std::ops::RangeInclusive<char>> for ClassRange {
    fn from(range: std::ops::RangeInclusive<char>) -> Self {
        Self::inclusive(*range.start(), *range.end())
    }
}

impl From<char> for ClassRange {
    fn from(ch: char) -> Self {
        Self::single(ch)
    }
}

/// Input encoding consumed by one segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentModifier {
    /// One raw byte, value 0 through 255.
    Integer,
    /// One UTF-8 scalar, 1 through 4 bytes.
    Utf8,
    /// One UTF-16BE code unit or surrogate pair, 2 or 4 bytes.
    Utf16,
    /// One UTF-32BE scalar, 4 bytes.
    Utf32,
}

impl SegmentModifier {
    /// Highest codepoint the modifier can represent.
    pub(crate) fn domain_max(self) -> u32 {
        match self {
            Self::Integer => 0xFF,
            Self::Utf8 | Self::Utf16 | Self::Utf32 => 0x0010_FFFF,
        }
    }

    /// Short name used in failure reasons and debug listings.
    pub(crate) fn describe(self) -> &'static str {
        match self {
            Self::Integer => "ASCII character",
            Self::Utf8 => "utf8 codepoint",
            Self::Utf16 => "utf16 codepoint",
            Self::Utf32 => "utf32 codepoint",
        }
    }
}

/// Traverse scheduling phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraversePhase {
    /// Runs after the body, observing the position from before it.
    Pre,
    /// Runs after the body, observing the position from after it.
    Post,
    /// Ignores the body's tokens and substitutes a fixed list.
    Constant,
}

/// One traverse operation.
#[derive(Debug, Clone)]
pub enum TraverseOp {
    /// Apply a user hook.
    Call(TraverseHook),
    /// Substitute a fixed token list.
    Constant(Vec<Token>),
}

impl TraverseOp {
    /// Display name used in introspection and debug listings.
    pub fn name(&self) -> String {
        match self {
            Self::Call(hook) => hook.name().to_owned(),
            Self::Constant(tokens) => format!("constant({} tokens)", tokens.len()),
        }
    }
}

/// Repetition-count draw used by the generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenTimes {
    /// Always this many repetitions.
    Exactly(usize),
    /// Uniform draw over an inclusive span.
    Range(usize, usize),
}

/// Target of a call to another named combinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallTarget {
    /// Definition in the same module.
    Local(String),
    /// Definition in an imported module.
    Remote {
        /// Imported module name.
        module: String,
        /// Definition name within that module.
        name: String,
    },
}

/// One combinator node.
#[derive(Debug, Clone)]
pub enum Node {
    /// One codepoint constrained by inclusive and exclusive ranges.
    Segment {
        /// Accepted spans; empty accepts the whole modifier domain.
        inclusive: Vec<CodeRange>,
        /// Rejected spans, subtracted from the accepted set.
        exclusive: Vec<CodeRange>,
        /// Input encoding.
        modifier: SegmentModifier,
    },
    /// Literal byte sequence.
    Literal(String),
    /// Any fixed number of bytes.
    AnyBytes(usize),
    /// End-of-input assertion; emits no token.
    Eos,
    /// Failure-reason replacement wrapper.
    Label {
        /// Wrapped subprogram.
        body: Program,
        /// Replacement text, reported as `expected <text>`.
        text: String,
    },
    /// Accumulator/context rewrite wrapper.
    Traverse {
        /// Wrapped subprogram.
        body: Program,
        /// Scheduling phase.
        phase: TraversePhase,
        /// Operations applied in order.
        ops: Vec<TraverseOp>,
    },
    /// First-match-wins alternatives.
    Choice {
        /// Alternative subprograms, tried in order.
        alternatives: Vec<Program>,
        /// Optional generator weights, one per alternative.
        weights: Option<Vec<u32>>,
    },
    /// Zero-or-more loop.
    Repeat {
        /// Loop body.
        body: Program,
        /// Optional continuation hook consulted after each iteration.
        while_hook: Option<WhileHook>,
        /// Optional generator repetition draw.
        gen_times: Option<GenTimes>,
    },
    /// Up to `max` optional repetitions.
    Times {
        /// Loop body.
        body: Program,
        /// Iteration cap.
        max: usize,
    },
    /// Zero-width assertion.
    Lookahead {
        /// Asserted subprogram.
        body: Program,
        /// `true` asserts presence, `false` asserts absence.
        positive: bool,
    },
    /// Discard bytes until the body matches.
    Eventually {
        /// Subprogram searched for.
        body: Program,
    },
    /// Call to another named combinator.
    Call(CallTarget),
}

/// Ordered combinator program in logical order.
#[derive(Debug, Clone, Default)]
pub struct Program {
    nodes: Vec<Node>,
}

impl Program {
    /// Returns the nodes in logical order.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Returns `true` when the program has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns the node count.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Appends one node.
    pub(crate) fn push(&mut self, node: Node) {
        self.nodes.push(node);
    }

    /// Appends every node of another program.
    pub(crate) fn extend(&mut self, other: Program) {
        self.nodes.extend(other.nodes);
    }

    /// Returns the plain-data introspection form, in logical order.
    pub fn spec(&self) -> Vec<NodeSpec> {
        self.nodes.iter().map(NodeSpec::from_node).collect()
    }
}

/// Plain-data introspection mirror of one [`Node`].
///
/// Hooks are reduced to their display names; everything else round-trips
/// structurally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeSpec {
    /// Mirror of [`Node::Segment`].
    Segment {
        /// Accepted spans.
        inclusive: Vec<CodeRange>,
        /// Rejected spans.
        exclusive: Vec<CodeRange>,
        /// Input encoding.
        modifier: SegmentModifier,
    },
    /// Mirror of [`Node::Literal`].
    String(String),
    /// Mirror of [`Node::AnyBytes`].
    Bytes(usize),
    /// Mirror of [`Node::Eos`].
    Eos,
    /// Mirror of [`Node::Label`].
    Label {
        /// Wrapped subprogram.
        body: Vec<NodeSpec>,
        /// Replacement text.
        text: String,
    },
    /// Mirror of [`Node::Traverse`].
    Traverse {
        /// Wrapped subprogram.
        body: Vec<NodeSpec>,
        /// Scheduling phase.
        phase: TraversePhase,
        /// Operation display names.
        ops: Vec<String>,
        /// Substituted list when the phase is constant.
        constant: Option<Vec<Token>>,
    },
    /// Mirror of [`Node::Choice`].
    Choice {
        /// Alternative subprograms.
        alternatives: Vec<Vec<NodeSpec>>,
        /// Optional generator weights.
        weights: Option<Vec<u32>>,
    },
    /// Mirror of [`Node::Repeat`].
    Repeat {
        /// Loop body.
        body: Vec<NodeSpec>,
        /// Optional generator repetition draw.
        gen_times: Option<GenTimes>,
        /// `true` when a while-hook is attached.
        conditional: bool,
    },
    /// Mirror of [`Node::Times`].
    Times {
        /// Loop body.
        body: Vec<NodeSpec>,
        /// Iteration cap.
        max: usize,
    },
    /// Mirror of [`Node::Lookahead`].
    Lookahead {
        /// Asserted subprogram.
        body: Vec<NodeSpec>,
        /// Assertion sense.
        positive: bool,
    },
    /// Mirror of [`Node::Eventually`].
    Eventually {
        /// Subprogram searched for.
        body: Vec<NodeSpec>,
    },
    /// Mirror of [`Node::Call`].
    Call {
        /// Imported module name for remote calls.
        module: Option<String>,
        /// Definition name.
        name: String,
    },
}

impl NodeSpec {
    fn from_node(node: &Node) -> Self {
        match node {
            Node::Segment {
                inclusive,
                exclusive,
                modifier,
            } => Self::Segment {
                inclusive: inclusive.clone(),
                exclusive: exclusive.clone(),
                modifier: *modifier,
            },
            Node::Literal(text) => Self::String(text.clone()),
            Node::AnyBytes(count) => Self::Bytes(*count),
            Node::Eos => Self::Eos,
            Node::Label { body, text } => Self::Label {
                body: body.spec(),
                text: text.clone(),
            },
            Node::Traverse { body, phase, ops } => {
                let constant = match phase {
                    TraversePhase::Constant => ops.iter().rev().find_map(|op| match op {
                        TraverseOp::Constant(tokens) => Some(tokens.clone()),
                        TraverseOp::Call(_) => None,
                    }),
                    _ => None,
                };
                Self::Traverse {
                    body: body.spec(),
                    phase: *phase,
                    ops: ops.iter().map(TraverseOp::name).collect(),
                    constant,
                }
            }
            Node::Choice {
                alternatives,
                weights,
            } => Self::Choice {
                alternatives: alternatives.iter().map(Program::spec).collect(),
                weights: weights.clone(),
            },
            Node::Repeat {
                body,
                while_hook,
                gen_times,
            } => Self::Repeat {
                body: body.spec(),
                gen_times: *gen_times,
                conditional: while_hook.is_some(),
            },
            Node::Times { body, max } => Self::Times {
                body: body.spec(),
                max: *max,
            },
            Node::Lookahead { body, positive } => Self::Lookahead {
                body: body.spec(),
                positive: *positive,
            },
            Node::Eventually { body } => Self::Eventually { body: body.spec() },
            Node::Call(CallTarget::Local(name)) => Self::Call {
                module: None,
                name: name.clone(),
            },
            Node::Call(CallTarget::Remote { module, name }) => Self::Call {
                module: Some(module.clone()),
                name: name.clone(),
            },
        }
    }
}
