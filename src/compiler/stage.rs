//! Compiled recognizer stages.
//!
//! One [`Recognizer`] is a flat table of stages plus an entry id. Each
//! stage is one clause of the recognizer: it observes the machine state,
//! transfers to another stage by table jump, or returns to the frame that
//! entered the current subchain. Host-stack recursion never drives stage
//! transfer.

use std::fmt;
use std::sync::Arc;

use crate::combinator::ir::{TraverseOp, TraversePhase, WhileHook};
use crate::compiler::fuse::BoundPattern;
use crate::compiler::module::ParserModule;

/// Stable stage identifier within one recognizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct StageId(u32);

impl StageId {
    /// Creates an identifier from a raw value.
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Returns the raw identifier value.
    pub const fn value(self) -> u32 {
        self.0
    }

    /// Converts the identifier to a table index.
    pub(crate) const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s{}", self.0)
    }
}

/// Call target resolved at compile or link time.
#[derive(Clone)]
pub enum ResolvedCall {
    /// Definition index in the owning module.
    Local(usize),
    /// Definition index in an imported module.
    Remote {
        /// Linked module.
        module: Arc<ParserModule>,
        /// Definition index within the linked module.
        definition: usize,
    },
}

impl fmt::Debug for ResolvedCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local(definition) => write!(f, "Local({definition})"),
            Self::Remote { module, definition } => {
                write!(f, "Remote({}, {definition})", module.name())
            }
        }
    }
}

/// One recognizer clause.
#[derive(Debug, Clone)]
pub enum StageOp {
    /// Fused bound-prefix match; all-or-nothing against the input head.
    Match {
        /// Fused pattern with emission plan and precomputed reason.
        pattern: BoundPattern,
        /// Stage entered on success.
        next: StageId,
    },
    /// First-match-wins dispatch over alternative subchains.
    Choice {
        /// Alternative entry stages, tried in order.
        alternatives: Vec<StageId>,
        /// Join stage entered when an alternative succeeds.
        next: StageId,
    },
    /// Zero-or-more loop over a body subchain.
    Repeat {
        /// Body entry stage.
        body: StageId,
        /// Continuation hook consulted after each iteration.
        hook: Option<WhileHook>,
        /// Join stage entered when the loop exits.
        next: StageId,
    },
    /// Bounded loop over a body subchain.
    Times {
        /// Body entry stage.
        body: StageId,
        /// Iteration cap.
        max: usize,
        /// Join stage entered when the loop exits.
        next: StageId,
    },
    /// Zero-width assertion over a body subchain.
    Lookahead {
        /// Body entry stage.
        body: StageId,
        /// Assertion sense.
        positive: bool,
        /// Failure reason reported when a negative assertion matches.
        reason: String,
        /// Join stage entered when the assertion holds.
        next: StageId,
    },
    /// Byte-skipping search for a body subchain.
    Eventually {
        /// Body entry stage.
        body: StageId,
        /// Failure reason reported at end of input.
        reason: String,
        /// Join stage entered when the body matches.
        next: StageId,
    },
    /// Accumulator/context rewrite after a body subchain.
    Traverse {
        /// Body entry stage.
        body: StageId,
        /// Scheduling phase.
        phase: TraversePhase,
        /// Operations applied in order.
        ops: Vec<TraverseOp>,
        /// Join stage.
        next: StageId,
    },
    /// Failure-reason replacement around a body subchain.
    Label {
        /// Body entry stage.
        body: StageId,
        /// Replacement text.
        text: String,
        /// Join stage.
        next: StageId,
    },
    /// Call into another definition's recognizer.
    Call {
        /// Resolved target.
        target: ResolvedCall,
        /// Join stage entered when the callee returns.
        next: StageId,
    },
    /// Pure redirect; removable by the inlining pass.
    Jump {
        /// Redirect target.
        next: StageId,
    },
    /// End of the current subchain.
    Return,
}

/// Compiled recognizer for one definition.
#[derive(Debug, Clone)]
pub struct Recognizer {
    pub(crate) stages: Vec<StageOp>,
    pub(crate) entry: StageId,
}

impl Recognizer {
    /// Returns the entry stage id.
    pub fn entry(&self) -> StageId {
        self.entry
    }

    /// Returns the stage count.
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }
}

impl fmt::Display for Recognizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "entry {}", self.entry)?;
        for (index, op) in self.stages.iter().enumerate() {
            write!(f, "s{index}: ")?;
            match op {
                StageOp::Match { pattern, next } => {
                    writeln!(f, "match <<{}>> -> {next}", pattern.reason())
                }
                StageOp::Choice { alternatives, next } => {
                    let alternatives: Vec<String> =
                        alternatives.iter().map(StageId::to_string).collect();
                    writeln!(f, "choice [{}] -> {next}", alternatives.join(", "))
                }
                StageOp::Repeat { body, hook, next } => match hook {
                    Some(hook) => writeln!(f, "repeat {body} while {} -> {next}", hook.name()),
                    None => writeln!(f, "repeat {body} -> {next}"),
                },
                StageOp::Times { body, max, next } => {
                    writeln!(f, "times {body} max {max} -> {next}")
                }
                StageOp::Lookahead {
                    body,
                    positive,
                    next,
                    ..
                } => {
                    let sense = if *positive { "ahead" } else { "ahead-not" };
                    writeln!(f, "{sense} {body} -> {next}")
                }
                StageOp::Eventually { body, next, .. } => {
                    writeln!(f, "eventually {body} -> {next}")
                }
                StageOp::Traverse {
                    body,
                    phase,
                    ops,
                    next,
                } => {
                    let ops: Vec<String> = ops.iter().map(TraverseOp::name).collect();
                    writeln!(f, "traverse({phase:?}) {body} [{}] -> {next}", ops.join(", "))
                }
                StageOp::Label { body, text, next } => {
                    writeln!(f, "label {body} {text:?} -> {next}")
                }
                StageOp::Call { target, next } => writeln!(f, "call {target:?} -> {next}"),
                StageOp::Jump { next } => writeln!(f, "jump {next}"),
                StageOp::Return => writeln!(f, "return"),
            }?;
        }
        Ok(())
    }
}

/// Append-only builder for one recognizer stage table.
#[derive(Debug, Default)]
pub(crate) struct RecognizerBuilder {
    stages: Vec<StageOp>,
}

impl RecognizerBuilder {
    /// Creates an empty builder.
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Appends one stage and returns its id.
    pub(crate) fn push(&mut self, op: StageOp) -> StageId {
        let id = StageId::new(self.stages.len() as u32);
        self.stages.push(op);
        id
    }

    /// Finalizes the table with the given entry stage.
    pub(crate) fn finish(self, entry: StageId) -> Recognizer {
        Recognizer {
            stages: self.stages,
            entry,
        }
    }
}
