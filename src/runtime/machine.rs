//! Recognizer dispatch loop.
//!
//! Stages transfer control by returning the next stage id to a single
//! trampoline loop; compound constructs push a frame describing how to
//! continue when the entered subchain returns or fails. Success pops the
//! top frame, failure unwinds frames to the nearest handler.

use crate::combinator::ir::{Context, TraverseOp, TraversePhase, WhileHook, WhileVerdict};
use crate::compiler::fuse::BoundPattern;
use crate::compiler::module::ParserModule;
use crate::compiler::stage::{Recognizer, ResolvedCall, StageId, StageOp};
use crate::runtime::ParseOutcome;
use crate::runtime::error::{FailureKind, ParseError};
use crate::runtime::position::Position;
use crate::runtime::state::{Checkpoint, ParseState};

/// In-flight failure, unwound through the frame stack.
#[derive(Debug)]
struct Failure {
    kind: FailureKind,
    reason: String,
    cursor: usize,
    position: Position,
}

enum Frame<'m> {
    Choice {
        alternatives: &'m [StageId],
        next_alt: usize,
        checkpoint: Checkpoint,
        next: StageId,
    },
    Repeat {
        body: StageId,
        hook: Option<&'m WhileHook>,
        checkpoint: Checkpoint,
        next: StageId,
    },
    Times {
        body: StageId,
        remaining: usize,
        checkpoint: Checkpoint,
        next: StageId,
    },
    Lookahead {
        positive: bool,
        reason: &'m str,
        checkpoint: Checkpoint,
        next: StageId,
    },
    Eventually {
        body: StageId,
        reason: &'m str,
        checkpoint: Checkpoint,
        next: StageId,
    },
    Traverse {
        phase: TraversePhase,
        ops: &'m [TraverseOp],
        mark: usize,
        entry_position: Position,
        next: StageId,
    },
    Label {
        text: &'m str,
        entry_cursor: usize,
        next: StageId,
    },
    Call {
        module: &'m ParserModule,
        recognizer: &'m Recognizer,
        next: StageId,
    },
}

pub(crate) struct Machine<'m, 'i> {
    module: &'m ParserModule,
    recognizer: &'m Recognizer,
    state: ParseState<'i>,
    frames: Vec<Frame<'m>>,
    max_call_depth: usize,
    call_depth: usize,
}

impl<'m, 'i> Machine<'m, 'i> {
    pub(crate) fn new(
        module: &'m ParserModule,
        recognizer: &'m Recognizer,
        input: &'i [u8],
        context: Context,
        position: Position,
        max_call_depth: usize,
    ) -> Self {
        Self {
            module,
            recognizer,
            state: ParseState::new(input, context, position),
            frames: Vec::new(),
            max_call_depth,
            call_depth: 0,
        }
    }

    /// Drives the recognizer from `entry` to completion.
    pub(crate) fn run(mut self, entry: StageId) -> Result<ParseOutcome<'i>, ParseError<'i>> {
        let mut stage = entry;
        loop {
            let recognizer = self.recognizer;
            let op = &recognizer.stages[stage.index()];

            let step = match op {
                StageOp::Jump { next } => Ok(*next),
                StageOp::Return => match self.frames.pop() {
                    None => return Ok(self.finish()),
                    Some(frame) => self.on_success(frame),
                },
                StageOp::Match { pattern, next } => self.run_match(pattern).map(|()| *next),
                StageOp::Choice { alternatives, next } => {
                    self.frames.push(Frame::Choice {
                        alternatives,
                        next_alt: 1,
                        checkpoint: self.state.checkpoint(),
                        next: *next,
                    });
                    Ok(alternatives[0])
                }
                StageOp::Repeat { body, hook, next } => {
                    self.frames.push(Frame::Repeat {
                        body: *body,
                        hook: hook.as_ref(),
                        checkpoint: self.state.checkpoint(),
                        next: *next,
                    });
                    Ok(*body)
                }
                StageOp::Times { body, max, next } => {
                    self.frames.push(Frame::Times {
                        body: *body,
                        remaining: *max,
                        checkpoint: self.state.checkpoint(),
                        next: *next,
                    });
                    Ok(*body)
                }
                StageOp::Lookahead {
                    body,
                    positive,
                    reason,
                    next,
                } => {
                    self.frames.push(Frame::Lookahead {
                        positive: *positive,
                        reason,
                        checkpoint: self.state.checkpoint(),
                        next: *next,
                    });
                    Ok(*body)
                }
                StageOp::Eventually { body, reason, next } => {
                    self.frames.push(Frame::Eventually {
                        body: *body,
                        reason,
                        checkpoint: self.state.checkpoint(),
                        next: *next,
                    });
                    Ok(*body)
                }
                StageOp::Traverse {
                    body,
                    phase,
                    ops,
                    next,
                } => {
                    self.frames.push(Frame::Traverse {
                        phase: *phase,
                        ops,
                        mark: self.state.acc.len(),
                        entry_position: self.state.position,
                        next: *next,
                    });
                    Ok(*body)
                }
                StageOp::Label { body, text, next } => {
                    self.frames.push(Frame::Label {
                        text,
                        entry_cursor: self.state.cursor,
                        next: *next,
                    });
                    Ok(*body)
                }
                StageOp::Call { target, next } => self.enter_call(target, *next),
            };

            stage = match step {
                Ok(next_stage) => next_stage,
                Err(failure) => self.unwind(failure)?,
            };
        }
    }

    fn finish(self) -> ParseOutcome<'i> {
        let ParseState {
            input,
            cursor,
            acc,
            context,
            position,
        } = self.state;
        ParseOutcome {
            tokens: acc,
            rest: &input[cursor..],
            context,
            position,
            consumed: cursor,
        }
    }

    fn run_match(&mut self, pattern: &BoundPattern) -> Result<(), Failure> {
        if !pattern.matches(self.state.input, self.state.cursor) {
            return Err(Failure {
                kind: FailureKind::Mismatch,
                reason: pattern.reason().to_owned(),
                cursor: self.state.cursor,
                position: self.state.position,
            });
        }

        let mut tokens = Vec::new();
        let (cursor, position) = pattern
            .emit(
                self.state.input,
                self.state.cursor,
                self.state.position,
                &mut self.state.context,
                &mut tokens,
            )
            .map_err(|error| Failure {
                kind: FailureKind::Traverse,
                reason: error.reason,
                cursor: error.cursor,
                position: error.position,
            })?;

        self.state.cursor = cursor;
        self.state.position = position;
        self.state.acc.append(&mut tokens);
        Ok(())
    }

    fn enter_call(&mut self, target: &'m ResolvedCall, next: StageId) -> Result<StageId, Failure> {
        if self.call_depth >= self.max_call_depth {
            return Err(Failure {
                kind: FailureKind::DepthExceeded,
                reason: format!("recursion limit of {} calls exceeded", self.max_call_depth),
                cursor: self.state.cursor,
                position: self.state.position,
            });
        }

        let (module, recognizer) = match target {
            ResolvedCall::Local(definition) => {
                let module = self.module;
                (module, &module.definition(*definition).recognizer)
            }
            ResolvedCall::Remote { module, definition } => {
                let module: &'m ParserModule = module;
                (module, &module.definition(*definition).recognizer)
            }
        };

        self.frames.push(Frame::Call {
            module: self.module,
            recognizer: self.recognizer,
            next,
        });
        self.module = module;
        self.recognizer = recognizer;
        self.call_depth += 1;
        Ok(recognizer.entry())
    }

    /// Continues after the entered subchain returned successfully.
    fn on_success(&mut self, frame: Frame<'m>) -> Result<StageId, Failure> {
        match frame {
            Frame::Choice { next, .. } => Ok(next),
            Frame::Repeat {
                body,
                hook,
                checkpoint,
                next,
            } => {
                // An iteration that consumed nothing would loop forever.
                if self.state.cursor == checkpoint.cursor {
                    return Ok(next);
                }
                match hook {
                    None => {
                        self.frames.push(Frame::Repeat {
                            body,
                            hook,
                            checkpoint: self.state.checkpoint(),
                            next,
                        });
                        Ok(body)
                    }
                    Some(hook) => {
                        let verdict = hook.consult(
                            self.state.rest(),
                            self.state.context.clone(),
                            self.state.position,
                        );
                        match verdict {
                            WhileVerdict::Continue(context) => {
                                self.state.context = context;
                                self.frames.push(Frame::Repeat {
                                    body,
                                    hook: Some(hook),
                                    checkpoint: self.state.checkpoint(),
                                    next,
                                });
                                Ok(body)
                            }
                            WhileVerdict::Halt(context) => {
                                self.state.context = context;
                                Ok(next)
                            }
                        }
                    }
                }
            }
            Frame::Times {
                body,
                remaining,
                checkpoint,
                next,
            } => {
                if self.state.cursor == checkpoint.cursor || remaining == 1 {
                    return Ok(next);
                }
                self.frames.push(Frame::Times {
                    body,
                    remaining: remaining - 1,
                    checkpoint: self.state.checkpoint(),
                    next,
                });
                Ok(body)
            }
            Frame::Lookahead {
                positive,
                reason,
                checkpoint,
                next,
            } => {
                self.state.restore(&checkpoint);
                if positive {
                    Ok(next)
                } else {
                    Err(Failure {
                        kind: FailureKind::Lookahead,
                        reason: reason.to_owned(),
                        cursor: checkpoint.cursor,
                        position: checkpoint.position,
                    })
                }
            }
            Frame::Eventually { next, .. } => Ok(next),
            Frame::Traverse {
                phase,
                ops,
                mark,
                entry_position,
                next,
            } => {
                self.apply_traverse(phase, ops, mark, entry_position)?;
                Ok(next)
            }
            Frame::Label { next, .. } => Ok(next),
            Frame::Call {
                module,
                recognizer,
                next,
            } => {
                self.module = module;
                self.recognizer = recognizer;
                self.call_depth -= 1;
                Ok(next)
            }
        }
    }

    fn apply_traverse(
        &mut self,
        phase: TraversePhase,
        ops: &[TraverseOp],
        mark: usize,
        entry_position: Position,
    ) -> Result<(), Failure> {
        let observed = match phase {
            TraversePhase::Pre => entry_position,
            TraversePhase::Post | TraversePhase::Constant => self.state.position,
        };

        let mut tokens = self.state.acc.split_off(mark);
        for op in ops {
            match op {
                TraverseOp::Constant(fixed) => tokens = fixed.clone(),
                TraverseOp::Call(hook) => {
                    let taken = std::mem::take(&mut tokens);
                    match hook.apply(
                        self.state.rest(),
                        taken,
                        self.state.context.clone(),
                        observed,
                    ) {
                        Ok((next_tokens, next_context)) => {
                            tokens = next_tokens;
                            self.state.context = next_context;
                        }
                        Err(reason) => {
                            return Err(Failure {
                                kind: FailureKind::Traverse,
                                reason,
                                cursor: self.state.cursor,
                                position: observed,
                            });
                        }
                    }
                }
            }
        }
        self.state.acc.append(&mut tokens);
        Ok(())
    }

    /// Unwinds a failure to the nearest handling frame.
    fn unwind(&mut self, mut failure: Failure) -> Result<StageId, ParseError<'i>> {
        let fatal = matches!(failure.kind, FailureKind::DepthExceeded);

        while let Some(frame) = self.frames.pop() {
            match frame {
                Frame::Choice {
                    alternatives,
                    next_alt,
                    checkpoint,
                    next,
                } => {
                    // Retry only while nothing was consumed past the entry.
                    if !fatal
                        && failure.cursor == checkpoint.cursor
                        && next_alt < alternatives.len()
                    {
                        self.state.restore(&checkpoint);
                        let alternative = alternatives[next_alt];
                        self.frames.push(Frame::Choice {
                            alternatives,
                            next_alt: next_alt + 1,
                            checkpoint,
                            next,
                        });
                        return Ok(alternative);
                    }
                }
                Frame::Repeat {
                    checkpoint, next, ..
                }
                | Frame::Times {
                    checkpoint, next, ..
                } => {
                    // Zero matches succeed; exit with the pre-iteration state.
                    if !fatal {
                        self.state.restore(&checkpoint);
                        return Ok(next);
                    }
                }
                Frame::Lookahead {
                    positive,
                    checkpoint,
                    next,
                    ..
                } => {
                    if !fatal && !positive {
                        self.state.restore(&checkpoint);
                        return Ok(next);
                    }
                }
                Frame::Eventually {
                    body,
                    reason,
                    checkpoint,
                    next,
                } => {
                    if !fatal {
                        self.state.restore(&checkpoint);
                        if self.state.at_end() {
                            failure = Failure {
                                kind: FailureKind::Eventually,
                                reason: reason.to_owned(),
                                cursor: self.state.cursor,
                                position: self.state.position,
                            };
                        } else {
                            self.state.advance(1);
                            self.frames.push(Frame::Eventually {
                                body,
                                reason,
                                checkpoint: self.state.checkpoint(),
                                next,
                            });
                            return Ok(body);
                        }
                    }
                }
                Frame::Traverse { .. } => {}
                Frame::Label {
                    text, entry_cursor, ..
                } => {
                    if failure.cursor == entry_cursor {
                        failure.reason = format!("expected {text}");
                    }
                }
                Frame::Call {
                    module, recognizer, ..
                } => {
                    self.module = module;
                    self.recognizer = recognizer;
                    self.call_depth -= 1;
                }
            }
        }

        Err(ParseError {
            kind: failure.kind,
            reason: failure.reason,
            rest: &self.state.input[failure.cursor..],
            context: std::mem::take(&mut self.state.context),
            position: failure.position,
            consumed: failure.cursor,
        })
    }
}
