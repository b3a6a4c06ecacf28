//! Traverse phases, rewrite hooks, and derived wrappers.

use gnaw::combinator::{ClassRange, Program, Token, TraverseHook, empty};
use gnaw::compiler::{DefineOptions, ModuleBuilder, ParserModule};
use gnaw::runtime::{FailureKind, ParseOpts};

fn compile_single(program: Program) -> ParserModule {
    let mut builder = ModuleBuilder::new("traverse");
    builder
        .define("main", program, DefineOptions::default())
        .expect("definition should register");
    builder.compile().expect("module should compile")
}

fn offset_probe() -> TraverseHook {
    TraverseHook::new("offset_probe", |_rest, _acc, context, position| {
        Ok((vec![Token::Integer(position.offset as i64)], context))
    })
}

#[test]
fn pre_traverse_observes_the_entry_position() {
    let module = compile_single(empty().pre_traverse(empty().string("ab"), offset_probe()));
    let parser = module.parser("main").expect("entry point");

    let outcome = parser.parse(b"ab", ParseOpts::default()).expect("parse");
    assert_eq!(outcome.tokens, vec![Token::Integer(0)]);
}

#[test]
fn post_traverse_observes_the_exit_position() {
    let module = compile_single(empty().post_traverse(empty().string("ab"), offset_probe()));
    let parser = module.parser("main").expect("entry point");

    let outcome = parser.parse(b"ab", ParseOpts::default()).expect("parse");
    assert_eq!(outcome.tokens, vec![Token::Integer(2)]);
}

#[test]
fn traverse_only_sees_its_own_body_tokens() {
    let wrapped = empty().wrap(empty().string("b"));
    let program = empty().string("a").concat(wrapped).string("c");
    let module = compile_single(program);
    let parser = module.parser("main").expect("entry point");

    let outcome = parser.parse(b"abc", ParseOpts::default()).expect("parse");
    assert_eq!(
        outcome.tokens,
        vec![
            Token::String("a".to_owned()),
            Token::List(vec![Token::String("b".to_owned())]),
            Token::String("c".to_owned()),
        ]
    );
}

#[test]
fn hook_errors_become_traverse_failures() {
    let hook = TraverseHook::new("reject", |_rest, _acc, _context, _position| {
        Err("rejected by policy".to_owned())
    });
    let module = compile_single(empty().post_traverse(empty().string("ab"), hook));
    let parser = module.parser("main").expect("entry point");

    let error = parser.parse(b"ab", ParseOpts::default()).expect_err("hook error");
    assert_eq!(error.kind, FailureKind::Traverse);
    assert_eq!(error.reason, "rejected by policy");
    assert_eq!(error.position.offset, 2);
}

#[test]
fn ignore_discards_only_the_body_tokens() {
    let program = empty()
        .string("a")
        .ignore(empty().string("b"))
        .string("c");
    let module = compile_single(program);
    let parser = module.parser("main").expect("entry point");

    let outcome = parser.parse(b"abc", ParseOpts::default()).expect("parse");
    assert_eq!(
        outcome.tokens,
        vec![
            Token::String("a".to_owned()),
            Token::String("c".to_owned()),
        ]
    );
    assert_eq!(outcome.consumed, 3);
}

#[test]
fn replace_substitutes_one_token() {
    let module = compile_single(empty().replace(empty().string("ab"), Token::Integer(7)));
    let parser = module.parser("main").expect("entry point");

    let outcome = parser.parse(b"ab", ParseOpts::default()).expect("parse");
    assert_eq!(outcome.tokens, vec![Token::Integer(7)]);
}

#[test]
fn nested_constant_traverses_coalesce_to_the_outermost() {
    let inner = empty().replace(empty().string("x"), Token::Integer(1));
    let program = empty().replace(inner, Token::Integer(2));
    let module = compile_single(program);
    let parser = module.parser("main").expect("entry point");

    let outcome = parser.parse(b"x", ParseOpts::default()).expect("parse");
    assert_eq!(outcome.tokens, vec![Token::Integer(2)]);
}

#[test]
fn tag_wraps_the_body_token_list() {
    let digits = empty()
        .ascii_char(vec![ClassRange::inclusive('0', '9')])
        .expect("digit")
        .ascii_char(vec![ClassRange::inclusive('0', '9')])
        .expect("digit");
    let module = compile_single(empty().tag(digits, "digits"));
    let parser = module.parser("main").expect("entry point");

    let outcome = parser.parse(b"42", ParseOpts::default()).expect("parse");
    assert_eq!(
        outcome.tokens,
        vec![Token::Tagged(
            "digits".to_owned(),
            Box::new(Token::List(vec![Token::Integer(52), Token::Integer(50)])),
        )]
    );
}

#[test]
fn unwrap_and_tag_requires_exactly_one_token() {
    let single = empty().integer(2_usize).expect("integer");
    let module = compile_single(empty().unwrap_and_tag(single, "value"));
    let parser = module.parser("main").expect("entry point");

    let outcome = parser.parse(b"42", ParseOpts::default()).expect("parse");
    assert_eq!(
        outcome.tokens,
        vec![Token::Tagged("value".to_owned(), Box::new(Token::Integer(42)))]
    );

    let pair = empty().string("a").string("b");
    let module = compile_single(empty().unwrap_and_tag(pair, "value"));
    let parser = module.parser("main").expect("entry point");

    let error = parser.parse(b"ab", ParseOpts::default()).expect_err("arity");
    assert_eq!(error.kind, FailureKind::Traverse);
    assert!(error.reason.contains("exactly one token"));
}

#[test]
fn context_writes_from_hooks_survive_the_parse() {
    let hook = TraverseHook::new("count", |_rest, acc, mut context, _position| {
        context.insert("tokens".to_owned(), Token::Integer(acc.len() as i64));
        Ok((acc, context))
    });
    let body = empty().string("a").string("b");
    let module = compile_single(empty().post_traverse(body, hook));
    let parser = module.parser("main").expect("entry point");

    let outcome = parser.parse(b"ab", ParseOpts::default()).expect("parse");
    assert_eq!(outcome.context.get("tokens"), Some(&Token::Integer(2)));
    assert_eq!(outcome.tokens.len(), 2);
}
