//! Line, column, and byte-offset tracking.

use gnaw::combinator::{Program, Token, empty};
use gnaw::compiler::{DefineOptions, ModuleBuilder, ParserModule};
use gnaw::runtime::ParseOpts;

fn compile_single(program: Program) -> ParserModule {
    let mut builder = ModuleBuilder::new("positions");
    builder
        .define("main", program, DefineOptions::default())
        .expect("definition should register");
    builder.compile().expect("module should compile")
}

#[test]
fn newlines_advance_the_line_counter() {
    let program = empty()
        .repeat(empty().utf8_char(Vec::new()).expect("any scalar"))
        .expect("repeat");
    let module = compile_single(program);
    let parser = module.parser("main").expect("entry point");

    let outcome = parser.parse(b"a\nbc", ParseOpts::default()).expect("parse");
    assert_eq!(outcome.position.line, 2);
    assert_eq!(outcome.position.line_start, 2);
    assert_eq!(outcome.position.offset, 4);
    assert_eq!(outcome.position.column(), 2);
}

#[test]
fn eventually_counts_newlines_in_discarded_bytes() {
    let program = empty().eventually(empty().string("ab")).expect("eventually");
    let module = compile_single(program);
    let parser = module.parser("main").expect("entry point");

    let outcome = parser.parse(b"x\nab", ParseOpts::default()).expect("parse");
    assert_eq!(outcome.tokens, vec![Token::String("ab".to_owned())]);
    assert_eq!(outcome.position.line, 2);
    assert_eq!(outcome.consumed, 4);
}

#[test]
fn eventually_fails_at_end_of_input() {
    let program = empty().eventually(empty().string("ab")).expect("eventually");
    let module = compile_single(program);
    let parser = module.parser("main").expect("entry point");

    let error = parser.parse(b"xyz", ParseOpts::default()).expect_err("exhausted");
    assert_eq!(error.reason, "expected string \"ab\" eventually");
    assert_eq!(error.rest, b"");
    assert_eq!(error.consumed, 3);
}

#[test]
fn line_builder_pairs_tokens_with_the_observed_line() {
    let program = empty()
        .ignore(empty().string("a\n"))
        .line(empty().string("b"));
    let module = compile_single(program);
    let parser = module.parser("main").expect("entry point");

    let outcome = parser.parse(b"a\nb", ParseOpts::default()).expect("parse");
    assert_eq!(
        outcome.tokens,
        vec![Token::AtLine(2, vec![Token::String("b".to_owned())])]
    );
}

#[test]
fn byte_offset_builder_pairs_tokens_with_the_observed_offset() {
    let program = empty()
        .ignore(empty().string("--"))
        .byte_offset(empty().string("b"));
    let module = compile_single(program);
    let parser = module.parser("main").expect("entry point");

    let outcome = parser.parse(b"--b", ParseOpts::default()).expect("parse");
    assert_eq!(
        outcome.tokens,
        vec![Token::AtOffset(3, vec![Token::String("b".to_owned())])]
    );
}
