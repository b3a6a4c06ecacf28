//! Plain-data IR introspection.

use gnaw::combinator::{
    ClassRange, CodeRange, NodeSpec, SegmentModifier, Token, TraversePhase, empty,
};
use gnaw::compiler::{DefineOptions, ModuleBuilder};

#[test]
fn program_spec_mirrors_the_node_sequence() {
    let program = empty()
        .string("if")
        .ascii_char(vec![ClassRange::inclusive('a', 'z'), ClassRange::not('q')])
        .expect("class")
        .eos();

    let spec = program.spec();
    assert_eq!(
        spec,
        vec![
            NodeSpec::String("if".to_owned()),
            NodeSpec::Segment {
                inclusive: vec![CodeRange::new('a' as u32, 'z' as u32)],
                exclusive: vec![CodeRange::new('q' as u32, 'q' as u32)],
                modifier: SegmentModifier::Integer,
            },
            NodeSpec::Eos,
        ]
    );
}

#[test]
fn traverse_specs_expose_phase_op_names_and_constants() {
    let program = empty().replace(empty().string("x"), Token::Integer(3));
    let spec = program.spec();
    let NodeSpec::Traverse {
        phase,
        ops,
        constant,
        body,
    } = &spec[0]
    else {
        panic!("expected a traverse spec");
    };
    assert_eq!(*phase, TraversePhase::Constant);
    assert_eq!(ops.len(), 1);
    assert_eq!(constant.as_deref(), Some(&[Token::Integer(3)][..]));
    assert_eq!(body, &vec![NodeSpec::String("x".to_owned())]);

    let program = empty().wrap(empty().string("x"));
    let spec = program.spec();
    let NodeSpec::Traverse {
        phase,
        ops,
        constant,
        ..
    } = &spec[0]
    else {
        panic!("expected a traverse spec");
    };
    assert_eq!(*phase, TraversePhase::Post);
    assert_eq!(ops, &vec!["wrap".to_owned()]);
    assert_eq!(*constant, None);
}

#[test]
fn call_specs_distinguish_local_and_remote_targets() {
    let program = empty().parsec("word").parsec_remote("lexical", "token");
    let spec = program.spec();
    assert_eq!(
        spec,
        vec![
            NodeSpec::Call {
                module: None,
                name: "word".to_owned(),
            },
            NodeSpec::Call {
                module: Some("lexical".to_owned()),
                name: "token".to_owned(),
            },
        ]
    );
}

#[test]
fn metadata_is_published_only_when_exported() {
    let mut builder = ModuleBuilder::new("introspection");
    builder
        .define(
            "exported",
            empty().string("x"),
            DefineOptions::default().with_metadata(),
        )
        .expect("definition should register");
    builder
        .define("plain", empty().string("y"), DefineOptions::default())
        .expect("definition should register");
    let module = builder.compile().expect("module should compile");

    assert_eq!(
        module.metadata("exported"),
        Some(&[NodeSpec::String("x".to_owned())][..])
    );
    assert_eq!(module.metadata("plain"), None);
    assert_eq!(module.metadata("absent"), None);
}
