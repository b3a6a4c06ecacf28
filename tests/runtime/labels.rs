//! Label injection and choice commit semantics.

use gnaw::combinator::{Program, Token, empty};
use gnaw::compiler::{DefineOptions, ModuleBuilder, ParserModule};
use gnaw::runtime::ParseOpts;

fn compile_single(program: Program) -> ParserModule {
    let mut builder = ModuleBuilder::new("labels");
    builder
        .define("main", program, DefineOptions::default())
        .expect("definition should register");
    builder.compile().expect("module should compile")
}

#[test]
fn label_over_an_unbound_body_relabels_entry_failures() {
    let body = empty()
        .choice(vec![empty().string("cat"), empty().string("dog")])
        .expect("choice");
    let program = empty().label(body, "an animal").expect("label");
    let module = compile_single(program);
    let parser = module.parser("main").expect("entry point");

    let error = parser.parse(b"emu", ParseOpts::default()).expect_err("mismatch");
    assert_eq!(error.reason, "expected an animal");
    assert_eq!(error.consumed, 0);
}

#[test]
fn label_keeps_the_inner_reason_after_a_commit() {
    // The body consumes "ab" before failing, so the failure is past the
    // label's entry and keeps its own reason.
    let body = empty()
        .string("ab")
        .optional(empty().string("!"))
        .string("cd");
    let program = empty().label(body, "a framed pair").expect("label");
    let module = compile_single(program);
    let parser = module.parser("main").expect("entry point");

    let error = parser.parse(b"abzz", ParseOpts::default()).expect_err("mismatch");
    assert_eq!(error.reason, "expected string \"cd\"");
    assert_eq!(error.consumed, 2);
    assert_eq!(error.rest, b"zz");
}

#[test]
fn committed_alternatives_do_not_backtrack() {
    let first = empty()
        .string("ab")
        .optional(empty().string("!"))
        .string("cd");
    let program = empty()
        .choice(vec![first, empty().string("abzz")])
        .expect("choice");
    let module = compile_single(program);
    let parser = module.parser("main").expect("entry point");

    // The first alternative consumed "ab" before failing, so the second
    // is never tried even though it would match.
    let error = parser.parse(b"abzz", ParseOpts::default()).expect_err("committed");
    assert_eq!(error.reason, "expected string \"cd\"");
    assert_eq!(error.consumed, 2);
}

#[test]
fn restartable_alternatives_retry_in_order() {
    let program = empty()
        .choice(vec![empty().string("ax"), empty().string("ab")])
        .expect("choice");
    let module = compile_single(program);
    let parser = module.parser("main").expect("entry point");

    let outcome = parser.parse(b"ab", ParseOpts::default()).expect("parse");
    assert_eq!(outcome.tokens, vec![Token::String("ab".to_owned())]);

    // Exhaustion reports the last alternative's failure.
    let error = parser.parse(b"zz", ParseOpts::default()).expect_err("exhausted");
    assert_eq!(error.reason, "expected string \"ab\"");
    assert_eq!(error.consumed, 0);
}

#[test]
fn exhausted_choice_can_still_be_relabeled() {
    let body = empty()
        .choice(vec![empty().string("ax"), empty().string("ay")])
        .expect("choice");
    let program = empty().label(body, "an a-pair").expect("label");
    let module = compile_single(program);
    let parser = module.parser("main").expect("entry point");

    let error = parser.parse(b"zz", ParseOpts::default()).expect_err("mismatch");
    assert_eq!(error.reason, "expected an a-pair");
}
