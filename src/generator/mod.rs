//! Random input generation over exported combinator IR.
//!
//! The walker mirrors the recognizer rule for rule, with two intentional
//! asymmetries: lookaheads are skipped outright, and `eventually` emits
//! its body with no random preamble, which is narrower than the language
//! the recognizer accepts. No output guarantee holds when user traverses
//! validate tokens or when choice alternatives overlap.

pub mod error;

pub use error::{GenerateError, GenerateErrorKind};

use rand::{Rng, RngCore};

use crate::combinator::ir::{
    CallTarget, CodeRange, GenTimes, Node, Program, SegmentModifier,
};
use crate::compiler::module::ParserModule;

/// Rejection-sampling cap for one segment draw.
const MAX_SAMPLE_RETRIES: usize = 1024;

/// Nesting cap for named-combinator calls.
const MAX_GENERATE_DEPTH: usize = 128;

/// Generates one input accepted by the named definition.
pub(crate) fn generate<R: Rng + ?Sized>(
    module: &ParserModule,
    name: &str,
    rng: &mut R,
) -> Result<Vec<u8>, GenerateError> {
    let Some(index) = module.lookup(name) else {
        return Err(GenerateError::unknown_definition(name));
    };
    let Some(program) = module.definition(index).program.as_ref() else {
        return Err(GenerateError::unreachable_ir(name));
    };

    let mut out = Vec::new();
    walk(module, program, rng, &mut out, 0)?;
    Ok(out)
}

fn walk<R: Rng + ?Sized>(
    module: &ParserModule,
    program: &Program,
    rng: &mut R,
    out: &mut Vec<u8>,
    depth: usize,
) -> Result<(), GenerateError> {
    if depth > MAX_GENERATE_DEPTH {
        return Err(GenerateError::depth_exceeded(MAX_GENERATE_DEPTH));
    }

    for node in program.nodes() {
        match node {
            Node::Literal(text) => out.extend_from_slice(text.as_bytes()),
            Node::Segment {
                inclusive,
                exclusive,
                modifier,
            } => sample_segment(inclusive, exclusive, *modifier, rng, out)?,
            Node::AnyBytes(count) => {
                let mut buffer = vec![0u8; *count];
                rng.fill_bytes(&mut buffer);
                out.append(&mut buffer);
            }
            Node::Eos => {}
            Node::Label { body, .. } | Node::Traverse { body, .. } => {
                walk(module, body, rng, out, depth)?;
            }
            Node::Choice {
                alternatives,
                weights,
            } => {
                let index = pick_alternative(alternatives.len(), weights.as_deref(), rng);
                walk(module, &alternatives[index], rng, out, depth)?;
            }
            Node::Repeat {
                body, gen_times, ..
            } => {
                let count = draw_times(*gen_times, rng);
                for _ in 0..count {
                    walk(module, body, rng, out, depth)?;
                }
            }
            Node::Times { body, max } => {
                let count = rng.gen_range(0..=*max);
                for _ in 0..count {
                    walk(module, body, rng, out, depth)?;
                }
            }
            Node::Lookahead { .. } => {}
            Node::Eventually { body } => walk(module, body, rng, out, depth)?,
            Node::Call(target) => {
                let (owner, name) = match target {
                    CallTarget::Local(name) => (module, name.as_str()),
                    CallTarget::Remote {
                        module: imported,
                        name,
                    } => {
                        let Some(owner) = module.import(imported) else {
                            return Err(GenerateError::unknown_definition(name));
                        };
                        (owner.as_ref(), name.as_str())
                    }
                };
                let Some(index) = owner.lookup(name) else {
                    return Err(GenerateError::unknown_definition(name));
                };
                let Some(target_program) = owner.definition(index).program.as_ref() else {
                    return Err(GenerateError::unreachable_ir(name));
                };
                walk(owner, target_program, rng, out, depth + 1)?;
            }
        }
    }
    Ok(())
}

fn pick_alternative<R: Rng + ?Sized>(
    count: usize,
    weights: Option<&[u32]>,
    rng: &mut R,
) -> usize {
    let Some(weights) = weights else {
        return rng.gen_range(0..count);
    };
    let total: u64 = weights.iter().map(|weight| u64::from(*weight)).sum();
    let mut draw = rng.gen_range(0..total);
    for (index, weight) in weights.iter().enumerate() {
        let weight = u64::from(*weight);
        if draw < weight {
            return index;
        }
        draw -= weight;
    }
    count - 1
}

fn draw_times<R: Rng + ?Sized>(gen_times: Option<GenTimes>, rng: &mut R) -> usize {
    match gen_times {
        Some(GenTimes::Exactly(count)) => count,
        Some(GenTimes::Range(lo, hi)) => rng.gen_range(lo..=hi),
        None => rng.gen_range(0..=3),
    }
}

fn sample_segment<R: Rng + ?Sized>(
    inclusive: &[CodeRange],
    exclusive: &[CodeRange],
    modifier: SegmentModifier,
    rng: &mut R,
    out: &mut Vec<u8>,
) -> Result<(), GenerateError> {
    let whole_domain = [CodeRange::new(0, modifier.domain_max())];
    let spans: &[CodeRange] = if inclusive.is_empty() {
        &whole_domain
    } else {
        inclusive
    };
    let total: u64 = spans
        .iter()
        .map(|span| u64::from(span.hi - span.lo + 1))
        .sum();

    for _ in 0..MAX_SAMPLE_RETRIES {
        let mut draw = rng.gen_range(0..total);
        let mut chosen = None;
        for span in spans {
            let size = u64::from(span.hi - span.lo + 1);
            if draw < size {
                chosen = Some(span.lo + draw as u32);
                break;
            }
            draw -= size;
        }
        let Some(codepoint) = chosen else { continue };
        if exclusive.iter().any(|span| span.contains(codepoint)) {
            continue;
        }
        if encode(modifier, codepoint, out) {
            return Ok(());
        }
    }
    Err(GenerateError::retries_exhausted(MAX_SAMPLE_RETRIES))
}

/// Encodes one codepoint; `false` rejects unencodable draws such as
/// surrogates.
fn encode(modifier: SegmentModifier, codepoint: u32, out: &mut Vec<u8>) -> bool {
    match modifier {
        SegmentModifier::Integer => {
            out.push(codepoint as u8);
            true
        }
        SegmentModifier::Utf8 => {
            let Some(scalar) = char::from_u32(codepoint) else {
                return false;
            };
            let mut buffer = [0u8; 4];
            out.extend_from_slice(scalar.encode_utf8(&mut buffer).as_bytes());
            true
        }
        SegmentModifier::Utf16 => {
            let Some(scalar) = char::from_u32(codepoint) else {
                return false;
            };
            let mut buffer = [0u16; 2];
            for unit in scalar.encode_utf16(&mut buffer) {
                out.extend_from_slice(&unit.to_be_bytes());
            }
            true
        }
        SegmentModifier::Utf32 => {
            if char::from_u32(codepoint).is_none() {
                return false;
            }
            out.extend_from_slice(&codepoint.to_be_bytes());
            true
        }
    }
}
