//! Universal invariants of the parse contract.

use gnaw::combinator::{ClassRange, Program, Token, empty};
use gnaw::compiler::{DefineOptions, ModuleBuilder, ParserModule};
use gnaw::runtime::ParseOpts;

fn compile_single(program: Program) -> ParserModule {
    let mut builder = ModuleBuilder::new("contracts");
    builder
        .define("main", program, DefineOptions::default())
        .expect("definition should register");
    builder.compile().expect("module should compile")
}

fn sample_program() -> Program {
    empty()
        .string("v=")
        .integer(1_usize..=4)
        .expect("integer")
        .optional(empty().string(";"))
}

#[test]
fn consumed_matches_rest_and_offset_on_success() {
    let module = compile_single(sample_program());
    let parser = module.parser("main").expect("entry point");

    for input in [&b"v=7"[..], b"v=1234;", b"v=55;tail"] {
        let opts = ParseOpts {
            byte_offset: 3,
            ..ParseOpts::default()
        };
        let outcome = parser.parse(input, opts).expect("parse");
        assert_eq!(outcome.consumed, input.len() - outcome.rest.len());
        assert_eq!(outcome.consumed, outcome.position.offset - 3);
    }
}

#[test]
fn consumed_matches_rest_and_offset_on_failure() {
    let module = compile_single(sample_program());
    let parser = module.parser("main").expect("entry point");

    for input in [&b"x"[..], b"v=x", b""] {
        let error = parser.parse(input, ParseOpts::default()).expect_err("mismatch");
        assert_eq!(error.consumed, input.len() - error.rest.len());
        assert_eq!(error.consumed, error.position.offset);
    }
}

#[test]
fn wrap_emits_exactly_what_the_body_alone_emits() {
    let body = || {
        empty()
            .string("a")
            .ascii_char(vec![ClassRange::inclusive('0', '9')])
            .expect("digit")
    };
    let plain = compile_single(body());
    let wrapped = compile_single(empty().wrap(body()));

    let input = b"a7";
    let plain_tokens = plain
        .parser("main")
        .expect("entry point")
        .parse(input, ParseOpts::default())
        .expect("parse")
        .tokens;
    let wrapped_tokens = wrapped
        .parser("main")
        .expect("entry point")
        .parse(input, ParseOpts::default())
        .expect("parse")
        .tokens;

    assert_eq!(wrapped_tokens, vec![Token::List(plain_tokens)]);
}

#[test]
fn ignore_emits_no_tokens_when_the_body_succeeds() {
    let module = compile_single(empty().ignore(sample_program()));
    let parser = module.parser("main").expect("entry point");

    let outcome = parser.parse(b"v=12;", ParseOpts::default()).expect("parse");
    assert_eq!(outcome.tokens, Vec::new());
    assert_eq!(outcome.consumed, 5);
}

#[test]
fn failed_optional_consumes_and_emits_nothing() {
    let module = compile_single(empty().optional(empty().string("ab")));
    let parser = module.parser("main").expect("entry point");

    let outcome = parser.parse(b"zz", ParseOpts::default()).expect("parse");
    assert_eq!(outcome.tokens, Vec::new());
    assert_eq!(outcome.consumed, 0);
    assert_eq!(outcome.rest, b"zz");
}

#[test]
fn duplicate_equals_explicit_repetition() {
    let unit = || {
        empty()
            .ascii_char(vec![ClassRange::inclusive('a', 'z')])
            .expect("class")
    };
    let duplicated = compile_single(empty().duplicate(unit(), 3));
    let explicit = compile_single(unit().concat(unit()).concat(unit()));

    for input in [&b"abc"[..], b"abz", b"ab1"] {
        let lhs = duplicated
            .parser("main")
            .expect("entry point")
            .parse(input, ParseOpts::default());
        let rhs = explicit
            .parser("main")
            .expect("entry point")
            .parse(input, ParseOpts::default());
        match (lhs, rhs) {
            (Ok(lhs), Ok(rhs)) => {
                assert_eq!(lhs.tokens, rhs.tokens);
                assert_eq!(lhs.consumed, rhs.consumed);
            }
            (Err(lhs), Err(rhs)) => assert_eq!(lhs.consumed, rhs.consumed),
            (lhs, rhs) => panic!("divergent outcomes: {lhs:?} vs {rhs:?}"),
        }
    }
}

#[test]
fn generator_weights_do_not_affect_parsing() {
    let weighted = compile_single(
        empty()
            .choice_weighted(
                vec![empty().string("aa"), empty().string("bb")],
                vec![3, 1],
            )
            .expect("choice"),
    );
    let unweighted = compile_single(
        empty()
            .choice(vec![empty().string("aa"), empty().string("bb")])
            .expect("choice"),
    );

    for input in [&b"aa"[..], b"bb", b"cc"] {
        let lhs = weighted
            .parser("main")
            .expect("entry point")
            .parse(input, ParseOpts::default());
        let rhs = unweighted
            .parser("main")
            .expect("entry point")
            .parse(input, ParseOpts::default());
        assert_eq!(lhs.is_ok(), rhs.is_ok());
        if let (Ok(lhs), Ok(rhs)) = (lhs, rhs) {
            assert_eq!(lhs.tokens, rhs.tokens);
        }
    }
}
