//! Bound-prefix fusion.
//!
//! A maximal run of bound nodes compiles into one [`BoundPattern`]: a tree
//! of fixed-width match elements with an emission plan for fused traverses
//! and a failure reason precomputed from the run's descriptions. Matching
//! is all-or-nothing; a mismatch anywhere in the run fails at the run's
//! entry offset with the combined reason.

use crate::combinator::ir::{
    CodeRange, Context, Node, Program, SegmentModifier, Token, TraverseOp, TraversePhase,
};
use crate::runtime::Position;

/// One fixed-width match element.
#[derive(Debug, Clone)]
pub(crate) enum PatternElem {
    /// Exact byte sequence.
    Literal(String),
    /// One codepoint constrained by ranges.
    Class {
        modifier: SegmentModifier,
        inclusive: Vec<CodeRange>,
        exclusive: Vec<CodeRange>,
    },
    /// Any fixed number of bytes.
    Any(usize),
    /// End-of-input assertion.
    Eos,
}

impl PatternElem {
    /// Returns the consumed width when the element matches at `at`.
    fn width_at(&self, input: &[u8], at: usize) -> Option<usize> {
        match self {
            Self::Literal(text) => {
                let bytes = text.as_bytes();
                input[at.min(input.len())..]
                    .starts_with(bytes)
                    .then_some(bytes.len())
            }
            Self::Class {
                modifier,
                inclusive,
                exclusive,
            } => {
                let (codepoint, width) = decode_scalar(*modifier, input, at)?;
                class_accepts(inclusive, exclusive, codepoint).then_some(width)
            }
            Self::Any(count) => (at + count <= input.len()).then_some(*count),
            Self::Eos => (at == input.len()).then_some(0),
        }
    }

    /// Returns the consumed width and emitted token when the element
    /// matches at `at`.
    fn apply(&self, input: &[u8], at: usize) -> Option<(usize, Option<Token>)> {
        match self {
            Self::Literal(text) => {
                let width = self.width_at(input, at)?;
                Some((width, Some(Token::String(text.clone()))))
            }
            Self::Class {
                modifier,
                inclusive,
                exclusive,
            } => {
                let (codepoint, width) = decode_scalar(*modifier, input, at)?;
                class_accepts(inclusive, exclusive, codepoint)
                    .then_some((width, Some(Token::Integer(i64::from(codepoint)))))
            }
            Self::Any(count) => {
                let width = self.width_at(input, at)?;
                Some((width, Some(Token::Bytes(input[at..at + count].to_vec()))))
            }
            Self::Eos => {
                let width = self.width_at(input, at)?;
                Some((width, None))
            }
        }
    }
}

/// One node of the fused match tree.
#[derive(Debug, Clone)]
pub(crate) enum BoundNode {
    /// Single match element.
    Elem(PatternElem),
    /// Sequential group.
    Group(Vec<BoundNode>),
    /// Group whose emitted tokens are rewritten in place.
    Traversed {
        body: Box<BoundNode>,
        phase: TraversePhase,
        ops: Vec<TraverseOp>,
    },
}

/// Hook failure raised while emitting a fused match.
#[derive(Debug, Clone)]
pub(crate) struct EmitError {
    /// Reason returned by the hook.
    pub(crate) reason: String,
    /// Cursor at the failure.
    pub(crate) cursor: usize,
    /// Position observed by the failing op.
    pub(crate) position: Position,
}

/// Fused pattern for one maximal bound run.
#[derive(Debug, Clone)]
pub struct BoundPattern {
    root: Vec<BoundNode>,
    reason: String,
}

impl BoundPattern {
    /// Returns the precomputed failure reason.
    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// Returns `true` when the whole run matches at `at`.
    pub(crate) fn matches(&self, input: &[u8], at: usize) -> bool {
        let mut cursor = at;
        for node in &self.root {
            match measure_node(node, input, cursor) {
                Some(next) => cursor = next,
                None => return false,
            }
        }
        true
    }

    /// Emits the run's tokens, applying fused traverses.
    ///
    /// Must only be called after [`BoundPattern::matches`] accepted the
    /// same position; element mismatches are unreachable here.
    pub(crate) fn emit(
        &self,
        input: &[u8],
        cursor: usize,
        position: Position,
        context: &mut Context,
        out: &mut Vec<Token>,
    ) -> Result<(usize, Position), EmitError> {
        let mut cursor = cursor;
        let mut position = position;
        for node in &self.root {
            emit_node(node, input, &mut cursor, &mut position, context, out)?;
        }
        Ok((cursor, position))
    }
}

fn measure_node(node: &BoundNode, input: &[u8], at: usize) -> Option<usize> {
    match node {
        BoundNode::Elem(elem) => elem.width_at(input, at).map(|width| at + width),
        BoundNode::Group(children) => {
            let mut cursor = at;
            for child in children {
                cursor = measure_node(child, input, cursor)?;
            }
            Some(cursor)
        }
        BoundNode::Traversed { body, .. } => measure_node(body, input, at),
    }
}

fn emit_node(
    node: &BoundNode,
    input: &[u8],
    cursor: &mut usize,
    position: &mut Position,
    context: &mut Context,
    out: &mut Vec<Token>,
) -> Result<(), EmitError> {
    match node {
        BoundNode::Elem(elem) => {
            let Some((width, token)) = elem.apply(input, *cursor) else {
                // Unreachable after a successful measure pass.
                return Err(EmitError {
                    reason: "fused match diverged from its measure pass".to_owned(),
                    cursor: *cursor,
                    position: *position,
                });
            };
            position.advance(&input[*cursor..*cursor + width]);
            *cursor += width;
            if let Some(token) = token {
                out.push(token);
            }
            Ok(())
        }
        BoundNode::Group(children) => {
            for child in children {
                emit_node(child, input, cursor, position, context, out)?;
            }
            Ok(())
        }
        BoundNode::Traversed { body, phase, ops } => {
            let entry_position = *position;
            let mark = out.len();
            emit_node(body, input, cursor, position, context, out)?;

            let observed = match phase {
                TraversePhase::Pre => entry_position,
                TraversePhase::Post | TraversePhase::Constant => *position,
            };
            let mut tokens = out.split_off(mark);
            for op in ops {
                match op {
                    TraverseOp::Constant(fixed) => tokens = fixed.clone(),
                    TraverseOp::Call(hook) => {
                        let rest = &input[*cursor..];
                        match hook.apply(rest, tokens, context.clone(), observed) {
                            Ok((next_tokens, next_context)) => {
                                tokens = next_tokens;
                                *context = next_context;
                            }
                            Err(reason) => {
                                return Err(EmitError {
                                    reason,
                                    cursor: *cursor,
                                    position: observed,
                                });
                            }
                        }
                    }
                }
            }
            out.extend(tokens);
            Ok(())
        }
    }
}

// ---------------------------------------------------------------------------
// Fusion
// ---------------------------------------------------------------------------

/// Returns `true` when the node consumes a statically known width.
pub(crate) fn is_bound(node: &Node) -> bool {
    match node {
        Node::Segment { .. } | Node::Literal(_) | Node::AnyBytes(_) | Node::Eos => true,
        Node::Label { body, .. } | Node::Traverse { body, .. } => is_bound_program(body),
        _ => false,
    }
}

/// Returns `true` when every node of the program is bound.
pub(crate) fn is_bound_program(program: &Program) -> bool {
    program.nodes().iter().all(is_bound)
}

/// Fuses a contiguous run of bound nodes into one pattern.
pub(crate) fn fuse_run(nodes: &[Node]) -> BoundPattern {
    let (root, descriptions) = bound_seq(nodes);
    BoundPattern {
        root,
        reason: format!("expected {}", descriptions.join(", followed by ")),
    }
}

fn bound_seq(nodes: &[Node]) -> (Vec<BoundNode>, Vec<String>) {
    let mut children = Vec::with_capacity(nodes.len());
    let mut descriptions = Vec::new();
    for node in nodes {
        let (child, mut described) = bound_node(node);
        children.push(child);
        descriptions.append(&mut described);
    }
    (children, descriptions)
}

fn bound_node(node: &Node) -> (BoundNode, Vec<String>) {
    match node {
        Node::Literal(text) => (
            BoundNode::Elem(PatternElem::Literal(text.clone())),
            vec![format!("string {text:?}")],
        ),
        Node::Segment {
            inclusive,
            exclusive,
            modifier,
        } => (
            BoundNode::Elem(PatternElem::Class {
                modifier: *modifier,
                inclusive: inclusive.clone(),
                exclusive: exclusive.clone(),
            }),
            vec![describe_class(*modifier, inclusive, exclusive)],
        ),
        Node::AnyBytes(count) => (
            BoundNode::Elem(PatternElem::Any(*count)),
            vec![format!("{count} bytes")],
        ),
        Node::Eos => (
            BoundNode::Elem(PatternElem::Eos),
            vec!["end of string".to_owned()],
        ),
        Node::Label { body, text } => {
            let (children, _) = bound_seq(body.nodes());
            (BoundNode::Group(children), vec![text.clone()])
        }
        Node::Traverse { body, phase, ops } => {
            let (children, descriptions) = bound_seq(body.nodes());
            (
                BoundNode::Traversed {
                    body: Box::new(BoundNode::Group(children)),
                    phase: *phase,
                    ops: ops.clone(),
                },
                descriptions,
            )
        }
        _ => unreachable!("unbound node in a fused run"),
    }
}

// ---------------------------------------------------------------------------
// Descriptions
// ---------------------------------------------------------------------------

/// Describes the leading shape of a program for assertion reasons.
pub(crate) fn describe_program(program: &Program) -> String {
    let mut descriptions = Vec::new();
    for node in program.nodes() {
        if is_bound(node) {
            descriptions.append(&mut bound_node(node).1);
        } else {
            descriptions.push(describe_unbound(node));
            break;
        }
    }
    if descriptions.is_empty() {
        return "input".to_owned();
    }
    descriptions.join(", followed by ")
}

fn describe_unbound(node: &Node) -> String {
    match node {
        Node::Choice { .. } => "one of the alternatives".to_owned(),
        Node::Repeat { .. } | Node::Times { .. } => "a repeated pattern".to_owned(),
        Node::Lookahead { .. } => "a lookahead".to_owned(),
        Node::Eventually { body } => describe_program(body),
        Node::Call(target) => match target {
            crate::combinator::ir::CallTarget::Local(name) => format!("a call to {name}"),
            crate::combinator::ir::CallTarget::Remote { module, name } => {
                format!("a call to {module}.{name}")
            }
        },
        _ => "input".to_owned(),
    }
}

fn describe_class(
    modifier: SegmentModifier,
    inclusive: &[CodeRange],
    exclusive: &[CodeRange],
) -> String {
    let mut text = modifier.describe().to_owned();
    let spans: Vec<String> = inclusive.iter().map(|span| describe_span(*span)).collect();
    if !spans.is_empty() {
        text.push(' ');
        text.push_str(&spans.join(" or "));
    }
    let rejected: Vec<String> = exclusive.iter().map(|span| describe_span(*span)).collect();
    if !rejected.is_empty() {
        text.push_str(", and not ");
        text.push_str(&rejected.join(" or "));
    }
    text
}

fn describe_span(span: CodeRange) -> String {
    if span.lo == span.hi {
        format!("equal to {}", describe_codepoint(span.lo))
    } else {
        format!(
            "in the range {} to {}",
            describe_codepoint(span.lo),
            describe_codepoint(span.hi)
        )
    }
}

fn describe_codepoint(codepoint: u32) -> String {
    match char::from_u32(codepoint) {
        Some(scalar) if !scalar.is_control() => format!("'{scalar}'"),
        _ => format!("{codepoint:#06x}"),
    }
}

// ---------------------------------------------------------------------------
// Scalar decoding
// ---------------------------------------------------------------------------

fn class_accepts(inclusive: &[CodeRange], exclusive: &[CodeRange], codepoint: u32) -> bool {
    let accepted = inclusive.is_empty() || inclusive.iter().any(|span| span.contains(codepoint));
    accepted && !exclusive.iter().any(|span| span.contains(codepoint))
}

fn decode_scalar(modifier: SegmentModifier, input: &[u8], at: usize) -> Option<(u32, usize)> {
    match modifier {
        SegmentModifier::Integer => input.get(at).map(|byte| (u32::from(*byte), 1)),
        SegmentModifier::Utf8 => decode_utf8(input, at),
        SegmentModifier::Utf16 => decode_utf16be(input, at),
        SegmentModifier::Utf32 => decode_utf32be(input, at),
    }
}

fn continuation(input: &[u8], at: usize) -> Option<u32> {
    let byte = *input.get(at)?;
    (0x80..=0xBF).contains(&byte).then_some(u32::from(byte) & 0x3F)
}

fn decode_utf8(input: &[u8], at: usize) -> Option<(u32, usize)> {
    let lead = *input.get(at)?;
    match lead {
        0x00..=0x7F => Some((u32::from(lead), 1)),
        0xC2..=0xDF => {
            let c1 = continuation(input, at + 1)?;
            Some(((u32::from(lead) & 0x1F) << 6 | c1, 2))
        }
        0xE0..=0xEF => {
            let b1 = *input.get(at + 1)?;
            let valid = match lead {
                0xE0 => (0xA0..=0xBF).contains(&b1),
                0xED => (0x80..=0x9F).contains(&b1),
                _ => (0x80..=0xBF).contains(&b1),
            };
            if !valid {
                return None;
            }
            let c1 = u32::from(b1) & 0x3F;
            let c2 = continuation(input, at + 2)?;
            Some(((u32::from(lead) & 0x0F) << 12 | c1 << 6 | c2, 3))
        }
        0xF0..=0xF4 => {
            let b1 = *input.get(at + 1)?;
            let valid = match lead {
                0xF0 => (0x90..=0xBF).contains(&b1),
                0xF4 => (0x80..=0x8F).contains(&b1),
                _ => (0x80..=0xBF).contains(&b1),
            };
            if !valid {
                return None;
            }
            let c1 = u32::from(b1) & 0x3F;
            let c2 = continuation(input, at + 2)?;
            let c3 = continuation(input, at + 3)?;
            Some(((u32::from(lead) & 0x07) << 18 | c1 << 12 | c2 << 6 | c3, 4))
        }
        _ => None,
    }
}

fn decode_utf16be(input: &[u8], at: usize) -> Option<(u32, usize)> {
    let hi = u32::from(u16::from_be_bytes([*input.get(at)?, *input.get(at + 1)?]));
    match hi {
        0xD800..=0xDBFF => {
            let lo = u32::from(u16::from_be_bytes([*input.get(at + 2)?, *input.get(at + 3)?]));
            if !(0xDC00..=0xDFFF).contains(&lo) {
                return None;
            }
            Some((0x10000 + ((hi - 0xD800) << 10 | (lo - 0xDC00)), 4))
        }
        0xDC00..=0xDFFF => None,
        _ => Some((hi, 2)),
    }
}

fn decode_utf32be(input: &[u8], at: usize) -> Option<(u32, usize)> {
    let bytes = [
        *input.get(at)?,
        *input.get(at + 1)?,
        *input.get(at + 2)?,
        *input.get(at + 3)?,
    ];
    let codepoint = u32::from_be_bytes(bytes);
    if codepoint > 0x0010_FFFF || (0xD800..=0xDFFF).contains(&codepoint) {
        return None;
    }
    Some((codepoint, 4))
}
