//! Builder operations over [`Program`] with build-time shape validation.
//!
//! Every operation appends to the receiving program and returns it, so
//! grammars read as chains. Operations whose arguments can be malformed
//! return `Result` and never defer a violation to parse time.

use crate::combinator::error::BuildError;
use crate::combinator::ir::{
    CallTarget, ClassRange, CodeRange, GenTimes, Node, Program, SegmentModifier, Token,
    TraverseHook, TraverseOp, TraversePhase, WhileHook,
};

/// Creates an empty program.
pub fn empty() -> Program {
    Program::default()
}

/// Repetition count accepted by the folding builders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Count {
    /// Exactly this many occurrences.
    Exact(usize),
    /// At least `min`, at most `max` occurrences.
    Between(usize, usize),
}

impl From<usize> for Count {
    fn from(count: usize) -> Self {
        Self::Exact(count)
    }
}

impl From<std::ops::RangeInclusive<usize>> for Count {
    fn from(range: std::ops::RangeInclusive<usize>) -> Self {
        Self::Between(*range.start(), *range.end())
    }
}

impl Count {
    fn validate(self, operation: &str) -> Result<(), BuildError> {
        match self {
            Self::Exact(count) if count >= 1 => Ok(()),
            Self::Exact(count) => Err(BuildError::invalid_count(
                format!("{operation} requires a positive count"),
                format!("received {count}"),
            )),
            Self::Between(min, max) if min >= 1 && min < max => Ok(()),
            Self::Between(min, max) => Err(BuildError::invalid_count(
                format!("{operation} requires 1 <= min < max"),
                format!("received min={min}, max={max}"),
            )),
        }
    }
}

/// Options accepted by [`Program::repeat_with`].
#[derive(Debug, Clone, Default)]
pub struct RepeatOptions {
    /// Continuation hook consulted after each successful iteration.
    pub while_hook: Option<WhileHook>,
    /// Repetition draw used by the generator.
    pub gen_times: Option<GenTimes>,
}

impl Program {
    // -- Primitive operations --

    /// Matches a literal string and emits it as one token.
    pub fn string(mut self, literal: impl Into<String>) -> Program {
        self.push(Node::Literal(literal.into()));
        self
    }

    /// Matches one byte constrained by the given ranges.
    pub fn ascii_char(self, ranges: Vec<ClassRange>) -> Result<Program, BuildError> {
        self.segment(SegmentModifier::Integer, ranges)
    }

    /// Matches one UTF-8 scalar constrained by the given ranges.
    pub fn utf8_char(self, ranges: Vec<ClassRange>) -> Result<Program, BuildError> {
        self.segment(SegmentModifier::Utf8, ranges)
    }

    /// Matches one UTF-16BE codepoint constrained by the given ranges.
    pub fn utf16_char(self, ranges: Vec<ClassRange>) -> Result<Program, BuildError> {
        self.segment(SegmentModifier::Utf16, ranges)
    }

    /// Matches one UTF-32BE scalar constrained by the given ranges.
    pub fn utf32_char(self, ranges: Vec<ClassRange>) -> Result<Program, BuildError> {
        self.segment(SegmentModifier::Utf32, ranges)
    }

    fn segment(
        mut self,
        modifier: SegmentModifier,
        ranges: Vec<ClassRange>,
    ) -> Result<Program, BuildError> {
        let mut inclusive = Vec::new();
        let mut exclusive = Vec::new();

        for range in ranges {
            let (span, target) = match range {
                ClassRange::Inclusive(lo, hi) => (CodeRange::new(lo, hi), &mut inclusive),
                ClassRange::Exclusive(lo, hi) => (CodeRange::new(lo, hi), &mut exclusive),
            };
            if span.hi > modifier.domain_max() {
                return Err(BuildError::invalid_range(
                    "range exceeds the segment's codepoint domain",
                    format!(
                        "range {:#x}..={:#x} exceeds domain maximum {:#x}",
                        span.lo,
                        span.hi,
                        modifier.domain_max()
                    ),
                ));
            }
            target.push(span);
        }

        self.push(Node::Segment {
            inclusive,
            exclusive,
            modifier,
        });
        Ok(self)
    }

    /// Matches any `count` bytes and emits them as one token.
    pub fn bytes(mut self, count: usize) -> Result<Program, BuildError> {
        if count == 0 {
            return Err(BuildError::invalid_count(
                "bytes requires a positive count",
                "received 0",
            ));
        }
        self.push(Node::AnyBytes(count));
        Ok(self)
    }

    /// Asserts end of input; emits no token.
    pub fn eos(mut self) -> Program {
        self.push(Node::Eos);
        self
    }

    /// Appends every node of another program.
    pub fn concat(mut self, other: Program) -> Program {
        self.extend(other);
        self
    }

    /// Replaces failure reasons produced at the body's entry with
    /// `expected <text>`.
    pub fn label(mut self, body: Program, text: impl Into<String>) -> Result<Program, BuildError> {
        if body.is_empty() {
            return Err(BuildError::empty_body("label"));
        }
        self.push(Node::Label {
            body,
            text: text.into(),
        });
        Ok(self)
    }

    /// Rewrites the body's tokens and context, observing the position from
    /// before the body.
    pub fn pre_traverse(mut self, body: Program, hook: TraverseHook) -> Program {
        self.push(Node::Traverse {
            body,
            phase: TraversePhase::Pre,
            ops: vec![TraverseOp::Call(hook)],
        });
        self
    }

    /// Rewrites the body's tokens and context, observing the position from
    /// after the body.
    pub fn post_traverse(mut self, body: Program, hook: TraverseHook) -> Program {
        self.push(Node::Traverse {
            body,
            phase: TraversePhase::Post,
            ops: vec![TraverseOp::Call(hook)],
        });
        self
    }

    fn constant_traverse(mut self, body: Program, tokens: Vec<Token>) -> Program {
        self.push(Node::Traverse {
            body,
            phase: TraversePhase::Constant,
            ops: vec![TraverseOp::Constant(tokens)],
        });
        self
    }

    /// Tries each alternative in order; first match wins.
    pub fn choice(self, alternatives: Vec<Program>) -> Result<Program, BuildError> {
        self.choice_inner(alternatives, None)
    }

    /// Like [`Program::choice`], with generator weights per alternative.
    pub fn choice_weighted(
        self,
        alternatives: Vec<Program>,
        weights: Vec<u32>,
    ) -> Result<Program, BuildError> {
        if weights.len() != alternatives.len() {
            return Err(BuildError::invalid_weights(
                "weight list length must equal the alternative count",
                format!(
                    "received {} weights for {} alternatives",
                    weights.len(),
                    alternatives.len()
                ),
            ));
        }
        if let Some(weight) = weights.iter().find(|weight| **weight == 0) {
            return Err(BuildError::invalid_weights(
                "weights must be positive",
                format!("received weight {weight}"),
            ));
        }
        self.choice_inner(alternatives, Some(weights))
    }

    fn choice_inner(
        mut self,
        alternatives: Vec<Program>,
        weights: Option<Vec<u32>>,
    ) -> Result<Program, BuildError> {
        if alternatives.len() < 2 {
            return Err(BuildError::too_few_alternatives(alternatives.len()));
        }
        self.push(Node::Choice {
            alternatives,
            weights,
        });
        Ok(self)
    }

    /// Matches the body zero or more times.
    pub fn repeat(self, body: Program) -> Result<Program, BuildError> {
        self.repeat_with(body, RepeatOptions::default())
    }

    /// Matches the body zero or more times while the hook keeps continuing.
    pub fn repeat_while(self, body: Program, hook: WhileHook) -> Result<Program, BuildError> {
        self.repeat_with(
            body,
            RepeatOptions {
                while_hook: Some(hook),
                gen_times: None,
            },
        )
    }

    /// Matches the body zero or more times with explicit repeat options.
    pub fn repeat_with(
        mut self,
        body: Program,
        options: RepeatOptions,
    ) -> Result<Program, BuildError> {
        if body.is_empty() {
            return Err(BuildError::empty_body("repeat"));
        }
        if let Some(GenTimes::Range(lo, hi)) = options.gen_times
            && lo > hi
        {
            return Err(BuildError::invalid_count(
                "gen_times range must be ordered",
                format!("received {lo}..={hi}"),
            ));
        }
        self.push(Node::Repeat {
            body,
            while_hook: options.while_hook,
            gen_times: options.gen_times,
        });
        Ok(self)
    }

    /// Matches the body up to `max` times, exiting early on failure.
    pub fn times(mut self, body: Program, max: usize) -> Result<Program, BuildError> {
        if body.is_empty() {
            return Err(BuildError::empty_body("times"));
        }
        if max == 0 {
            return Err(BuildError::invalid_count(
                "times requires a positive maximum",
                "received 0",
            ));
        }
        self.push(Node::Times { body, max });
        Ok(self)
    }

    /// Asserts that the body matches ahead, consuming nothing.
    pub fn lookahead(self, body: Program) -> Result<Program, BuildError> {
        self.lookahead_inner(body, true)
    }

    /// Asserts that the body does not match ahead, consuming nothing.
    pub fn lookahead_not(self, body: Program) -> Result<Program, BuildError> {
        self.lookahead_inner(body, false)
    }

    fn lookahead_inner(mut self, body: Program, positive: bool) -> Result<Program, BuildError> {
        if body.is_empty() {
            return Err(BuildError::empty_body("lookahead"));
        }
        self.push(Node::Lookahead { body, positive });
        Ok(self)
    }

    /// Discards bytes one at a time until the body matches.
    pub fn eventually(mut self, body: Program) -> Result<Program, BuildError> {
        if body.is_empty() {
            return Err(BuildError::empty_body("eventually"));
        }
        self.push(Node::Eventually { body });
        Ok(self)
    }

    /// Calls another definition in the same module.
    pub fn parsec(mut self, name: impl Into<String>) -> Program {
        self.push(Node::Call(CallTarget::Local(name.into())));
        self
    }

    /// Calls an exported definition in an imported module.
    pub fn parsec_remote(
        mut self,
        module: impl Into<String>,
        name: impl Into<String>,
    ) -> Program {
        self.push(Node::Call(CallTarget::Remote {
            module: module.into(),
            name: name.into(),
        }));
        self
    }

    // -- Derived operations --

    /// Matches the body or nothing, emitting and consuming nothing on the
    /// empty branch.
    pub fn optional(mut self, body: Program) -> Program {
        self.push(Node::Choice {
            alternatives: vec![body, Program::default()],
            weights: None,
        });
        self
    }

    /// Appends the body `amount` times in sequence.
    pub fn duplicate(mut self, body: Program, amount: usize) -> Program {
        for _ in 0..amount {
            self.extend(body.clone());
        }
        self
    }

    /// Discards every token the body emits.
    pub fn ignore(self, body: Program) -> Program {
        self.constant_traverse(body, Vec::new())
    }

    /// Replaces the body's tokens with one fixed token.
    pub fn replace(self, body: Program, value: Token) -> Program {
        self.constant_traverse(body, vec![value])
    }

    /// Collects the body's tokens into one list token.
    pub fn wrap(self, body: Program) -> Program {
        let hook = TraverseHook::new("wrap", |_rest, acc, context, _position| {
            Ok((vec![Token::List(acc)], context))
        });
        self.post_traverse(body, hook)
    }

    /// Collects the body's tokens into one tagged list token.
    pub fn tag(self, body: Program, tag: impl Into<String>) -> Program {
        let tag = tag.into();
        let hook = TraverseHook::new("tag", move |_rest, acc, context, _position| {
            Ok((
                vec![Token::Tagged(tag.clone(), Box::new(Token::List(acc)))],
                context,
            ))
        });
        self.post_traverse(body, hook)
    }

    /// Tags the body's single token, failing the parse when the body
    /// emitted any other number of tokens.
    pub fn unwrap_and_tag(self, body: Program, tag: impl Into<String>) -> Program {
        let tag = tag.into();
        let hook = TraverseHook::new("unwrap_and_tag", move |_rest, acc, context, _position| {
            let mut acc = acc;
            let Some(token) = acc.pop() else {
                return Err("unwrap_and_tag requires exactly one token, got none".to_owned());
            };
            if !acc.is_empty() {
                return Err(format!(
                    "unwrap_and_tag requires exactly one token, got {}",
                    acc.len() + 1
                ));
            }
            Ok((
                vec![Token::Tagged(tag.clone(), Box::new(token))],
                context,
            ))
        });
        self.post_traverse(body, hook)
    }

    /// Pairs the body's tokens with the byte offset observed after it.
    pub fn byte_offset(self, body: Program) -> Program {
        let hook = TraverseHook::new("byte_offset", |_rest, acc, context, position| {
            Ok((vec![Token::AtOffset(position.offset, acc)], context))
        });
        self.post_traverse(body, hook)
    }

    /// Pairs the body's tokens with the line observed after it.
    pub fn line(self, body: Program) -> Program {
        let hook = TraverseHook::new("line", |_rest, acc, context, position| {
            Ok((vec![Token::AtLine(position.line, acc)], context))
        });
        self.post_traverse(body, hook)
    }

    /// Matches decimal digits and folds them into one integer token.
    pub fn integer(self, count: impl Into<Count>) -> Result<Program, BuildError> {
        let count = count.into();
        count.validate("integer")?;
        let digit = empty().ascii_char(vec![ClassRange::inclusive('0', '9')])?;
        let body = counted_body(digit, count)?;
        Ok(self.post_traverse(body, integer_fold()))
    }

    /// Matches constrained bytes and folds them into one string token.
    pub fn ascii_string(
        self,
        ranges: Vec<ClassRange>,
        count: impl Into<Count>,
    ) -> Result<Program, BuildError> {
        let count = count.into();
        count.validate("ascii_string")?;
        let unit = empty().ascii_char(ranges)?;
        let body = counted_body(unit, count)?;
        Ok(self.post_traverse(body, string_fold()))
    }

    /// Matches constrained UTF-8 scalars and folds them into one string
    /// token.
    pub fn utf8_string(
        self,
        ranges: Vec<ClassRange>,
        count: impl Into<Count>,
    ) -> Result<Program, BuildError> {
        let count = count.into();
        count.validate("utf8_string")?;
        let unit = empty().utf8_char(ranges)?;
        let body = counted_body(unit, count)?;
        Ok(self.post_traverse(body, string_fold()))
    }
}

/// Builds the mandatory-plus-optional unit sequence for a counted fold.
fn counted_body(unit: Program, count: Count) -> Result<Program, BuildError> {
    match count {
        Count::Exact(amount) => Ok(empty().duplicate(unit, amount)),
        Count::Between(min, max) => empty().duplicate(unit.clone(), min).times(unit, max - min),
    }
}

/// Folds digit codepoints into their decimal value.
fn integer_fold() -> TraverseHook {
    TraverseHook::new("integer_fold", |_rest, acc, context, _position| {
        let mut value: i64 = 0;
        for token in &acc {
            let Token::Integer(digit) = token else {
                return Err(format!("integer fold expected a digit token, got {token:?}"));
            };
            value = value * 10 + (*digit - i64::from(b'0'));
        }
        Ok((vec![Token::Integer(value)], context))
    })
}

/// Folds codepoint tokens into one string.
fn string_fold() -> TraverseHook {
    TraverseHook::new("string_fold", |_rest, acc, context, _position| {
        let mut text = String::with_capacity(acc.len());
        for token in &acc {
            let Token::Integer(codepoint) = token else {
                return Err(format!(
                    "string fold expected a codepoint token, got {token:?}"
                ));
            };
            let scalar = u32::try_from(*codepoint).ok().and_then(char::from_u32);
            let Some(scalar) = scalar else {
                return Err(format!("codepoint {codepoint} is not a valid character"));
            };
            text.push(scalar);
        }
        Ok((vec![Token::String(text)], context))
    })
}
