//! Redirect elimination over compiled recognizers.
//!
//! Removes stages that only forward to another stage, rewrites every
//! reference to point at the forwarding target, then drops stages no
//! longer reachable from the entry. Semantics are unchanged; only the
//! table shrinks.

use crate::compiler::stage::{Recognizer, StageId, StageOp};

/// Inlines pure redirects and sweeps unreachable stages.
pub(crate) fn inline_recognizer(recognizer: Recognizer) -> Recognizer {
    let resolved: Vec<StageId> = (0..recognizer.stages.len())
        .map(|index| resolve(&recognizer.stages, StageId::new(index as u32)))
        .collect();

    let rewrite = |id: StageId| resolved[id.index()];
    let entry = rewrite(recognizer.entry);

    // Reachability over rewritten references.
    let mut reachable = vec![false; recognizer.stages.len()];
    let mut queue = vec![entry];
    while let Some(id) = queue.pop() {
        if std::mem::replace(&mut reachable[id.index()], true) {
            continue;
        }
        for target in references(&recognizer.stages[id.index()]) {
            queue.push(rewrite(target));
        }
    }

    // Compact the table, remapping ids.
    let mut remap = vec![StageId::default(); recognizer.stages.len()];
    let mut stages = Vec::new();
    for (index, op) in recognizer.stages.iter().enumerate() {
        if reachable[index] {
            remap[index] = StageId::new(stages.len() as u32);
            stages.push(op.clone());
        }
    }
    let remap_ref = |id: StageId| remap[rewrite(id).index()];
    for op in &mut stages {
        rewrite_op(op, &remap_ref);
    }

    Recognizer {
        stages,
        entry: remap_ref(recognizer.entry),
    }
}

/// Follows redirect chains to their first non-redirect stage.
fn resolve(stages: &[StageOp], id: StageId) -> StageId {
    let mut current = id;
    let mut steps = 0;
    while let StageOp::Jump { next } = stages[current.index()] {
        current = next;
        steps += 1;
        if steps > stages.len() {
            return current;
        }
    }
    current
}

fn references(op: &StageOp) -> Vec<StageId> {
    match op {
        StageOp::Match { next, .. }
        | StageOp::Jump { next }
        | StageOp::Call { next, .. } => vec![*next],
        StageOp::Choice { alternatives, next } => {
            let mut ids = alternatives.clone();
            ids.push(*next);
            ids
        }
        StageOp::Repeat { body, next, .. }
        | StageOp::Times { body, next, .. }
        | StageOp::Lookahead { body, next, .. }
        | StageOp::Eventually { body, next, .. }
        | StageOp::Traverse { body, next, .. }
        | StageOp::Label { body, next, .. } => vec![*body, *next],
        StageOp::Return => Vec::new(),
    }
}

fn rewrite_op(op: &mut StageOp, remap: &impl Fn(StageId) -> StageId) {
    match op {
        StageOp::Match { next, .. }
        | StageOp::Jump { next }
        | StageOp::Call { next, .. } => *next = remap(*next),
        StageOp::Choice { alternatives, next } => {
            for alternative in alternatives {
                *alternative = remap(*alternative);
            }
            *next = remap(*next);
        }
        StageOp::Repeat { body, next, .. }
        | StageOp::Times { body, next, .. }
        | StageOp::Lookahead { body, next, .. }
        | StageOp::Eventually { body, next, .. }
        | StageOp::Traverse { body, next, .. }
        | StageOp::Label { body, next, .. } => {
            *body = remap(*body);
            *next = remap(*next);
        }
        StageOp::Return => {}
    }
}
