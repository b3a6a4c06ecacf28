//! Program lowering to recognizer stages.
//!
//! Each program compiles to a chain of stages threaded through explicit
//! continuation ids: sequences are lowered back to front so every stage is
//! created with its successor already known. Subprograms (choice
//! alternatives, loop and wrapper bodies) become subchains ending at the
//! shared return stage, and every chain gets a redirect header so the
//! inlining pass has real work to do.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::combinator::error::BuildError;
use crate::combinator::ir::{CallTarget, Node, Program, TraversePhase};
use crate::compiler::fuse::{describe_program, fuse_run, is_bound};
use crate::compiler::module::ParserModule;
use crate::compiler::stage::{Recognizer, RecognizerBuilder, ResolvedCall, StageId, StageOp};

/// Name-resolution context for one definition.
pub(crate) struct LinkContext<'a> {
    /// Definition indices of the module under compilation.
    pub(crate) local: &'a BTreeMap<String, usize>,
    /// Imported modules, keyed by module name.
    pub(crate) imports: &'a BTreeMap<String, Arc<ParserModule>>,
}

struct LowerContext<'a> {
    link: &'a LinkContext<'a>,
    done: StageId,
}

/// Lowers one program into a recognizer.
pub(crate) fn lower_program(
    program: &Program,
    link: &LinkContext<'_>,
) -> Result<Recognizer, BuildError> {
    validate_eos(program)?;

    let mut builder = RecognizerBuilder::new();
    let done = builder.push(StageOp::Return);
    let ctx = LowerContext { link, done };
    let entry = lower_chain(&mut builder, &ctx, program, done)?;
    Ok(builder.finish(entry))
}

/// Checks that end-of-input assertions sit at the end of their programs.
fn validate_eos(program: &Program) -> Result<(), BuildError> {
    let nodes = program.nodes();
    for (index, node) in nodes.iter().enumerate() {
        if matches!(node, Node::Eos) && index + 1 != nodes.len() {
            return Err(BuildError::misplaced_eos(index, nodes.len()));
        }
        match node {
            Node::Label { body, .. }
            | Node::Traverse { body, .. }
            | Node::Repeat { body, .. }
            | Node::Times { body, .. }
            | Node::Lookahead { body, .. }
            | Node::Eventually { body } => validate_eos(body)?,
            Node::Choice { alternatives, .. } => {
                for alternative in alternatives {
                    validate_eos(alternative)?;
                }
            }
            _ => {}
        }
    }
    Ok(())
}

/// Lowers a program into a redirect-headed stage chain.
fn lower_chain(
    builder: &mut RecognizerBuilder,
    ctx: &LowerContext<'_>,
    program: &Program,
    next: StageId,
) -> Result<StageId, BuildError> {
    let first = lower_seq(builder, ctx, program.nodes(), next)?;
    Ok(builder.push(StageOp::Jump { next: first }))
}

enum Item {
    Run(std::ops::Range<usize>),
    One(usize),
}

/// Lowers a node sequence, fusing maximal bound runs.
fn lower_seq(
    builder: &mut RecognizerBuilder,
    ctx: &LowerContext<'_>,
    nodes: &[Node],
    next: StageId,
) -> Result<StageId, BuildError> {
    let mut items = Vec::new();
    let mut run_start = None;
    for (index, node) in nodes.iter().enumerate() {
        if is_bound(node) {
            run_start.get_or_insert(index);
        } else {
            if let Some(start) = run_start.take() {
                items.push(Item::Run(start..index));
            }
            items.push(Item::One(index));
        }
    }
    if let Some(start) = run_start.take() {
        items.push(Item::Run(start..nodes.len()));
    }

    let mut current = next;
    for item in items.iter().rev() {
        current = match item {
            Item::Run(range) => builder.push(StageOp::Match {
                pattern: fuse_run(&nodes[range.clone()]),
                next: current,
            }),
            Item::One(index) => lower_node(builder, ctx, &nodes[*index], current)?,
        };
    }
    Ok(current)
}

fn lower_node(
    builder: &mut RecognizerBuilder,
    ctx: &LowerContext<'_>,
    node: &Node,
    next: StageId,
) -> Result<StageId, BuildError> {
    match node {
        Node::Choice { alternatives, .. } => {
            let mut entries = Vec::with_capacity(alternatives.len());
            for alternative in alternatives {
                entries.push(lower_chain(builder, ctx, alternative, ctx.done)?);
            }
            Ok(builder.push(StageOp::Choice {
                alternatives: entries,
                next,
            }))
        }
        Node::Repeat {
            body, while_hook, ..
        } => {
            let body = lower_chain(builder, ctx, body, ctx.done)?;
            Ok(builder.push(StageOp::Repeat {
                body,
                hook: while_hook.clone(),
                next,
            }))
        }
        Node::Times { body, max } => {
            let body = lower_chain(builder, ctx, body, ctx.done)?;
            Ok(builder.push(StageOp::Times {
                body,
                max: *max,
                next,
            }))
        }
        Node::Lookahead { body, positive } => {
            let reason = format!("unexpected {}", describe_program(body));
            let body = lower_chain(builder, ctx, body, ctx.done)?;
            Ok(builder.push(StageOp::Lookahead {
                body,
                positive: *positive,
                reason,
                next,
            }))
        }
        Node::Eventually { body } => {
            let reason = format!("expected {} eventually", describe_program(body));
            let body = lower_chain(builder, ctx, body, ctx.done)?;
            Ok(builder.push(StageOp::Eventually { body, reason, next }))
        }
        Node::Traverse { body, phase, ops } => {
            let body = match phase {
                TraversePhase::Constant => coalesce_constant(body),
                _ => body,
            };
            let body = lower_chain(builder, ctx, body, ctx.done)?;
            Ok(builder.push(StageOp::Traverse {
                body,
                phase: *phase,
                ops: ops.clone(),
                next,
            }))
        }
        Node::Label { body, text } => {
            let body = lower_chain(builder, ctx, body, ctx.done)?;
            Ok(builder.push(StageOp::Label {
                body,
                text: text.clone(),
                next,
            }))
        }
        Node::Call(target) => {
            let target = resolve_call(target, ctx.link)?;
            Ok(builder.push(StageOp::Call { target, next }))
        }
        Node::Segment { .. } | Node::Literal(_) | Node::AnyBytes(_) | Node::Eos => {
            unreachable!("bound node outside a fused run")
        }
    }
}

/// Chains of constant traverses coalesce; the outermost substitution wins.
fn coalesce_constant(body: &Program) -> &Program {
    let mut current = body;
    loop {
        match current.nodes() {
            [
                Node::Traverse {
                    body: inner,
                    phase: TraversePhase::Constant,
                    ..
                },
            ] => current = inner,
            _ => return current,
        }
    }
}

fn resolve_call(
    target: &CallTarget,
    link: &LinkContext<'_>,
) -> Result<ResolvedCall, BuildError> {
    match target {
        CallTarget::Local(name) => link
            .local
            .get(name)
            .copied()
            .map(ResolvedCall::Local)
            .ok_or_else(|| {
                BuildError::unknown_target(format!(
                    "definition '{name}' is not declared in this module"
                ))
            }),
        CallTarget::Remote { module, name } => {
            let Some(imported) = link.imports.get(module) else {
                return Err(BuildError::unknown_target(format!(
                    "module '{module}' is not imported"
                )));
            };
            let Some(definition) = imported.lookup(name) else {
                return Err(BuildError::unknown_target(format!(
                    "definition '{name}' is not declared in module '{module}'"
                )));
            };
            if !imported.definition_exports_combinator(definition) {
                return Err(BuildError::target_not_exported(module, name));
            }
            Ok(ResolvedCall::Remote {
                module: Arc::clone(imported),
                definition,
            })
        }
    }
}
