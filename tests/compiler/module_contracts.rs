//! Module builder validation and link-time resolution.

use std::sync::Arc;

use gnaw::combinator::{BuildErrorKind, empty};
use gnaw::compiler::{DefineOptions, ModuleBuilder};

#[test]
fn duplicate_definitions_are_rejected_at_declaration() {
    let mut builder = ModuleBuilder::new("contracts");
    builder
        .define("main", empty().string("x"), DefineOptions::default())
        .expect("definition should register");
    let error = builder
        .define("main", empty().string("y"), DefineOptions::default())
        .expect_err("duplicate");
    assert_eq!(error.kind, BuildErrorKind::DuplicateDefinition);
}

#[test]
fn unknown_local_targets_fail_at_compile_time() {
    let mut builder = ModuleBuilder::new("contracts");
    builder
        .define("main", empty().parsec("ghost"), DefineOptions::default())
        .expect("definition should register");
    let error = builder.compile().expect_err("unresolved call");
    assert_eq!(error.kind, BuildErrorKind::UnknownTarget);
}

#[test]
fn unknown_modules_and_names_fail_remote_resolution() {
    let mut builder = ModuleBuilder::new("contracts");
    builder
        .define(
            "main",
            empty().parsec_remote("missing", "word"),
            DefineOptions::default(),
        )
        .expect("definition should register");
    let error = builder.compile().expect_err("unimported module");
    assert_eq!(error.kind, BuildErrorKind::UnknownTarget);

    let mut exporter = ModuleBuilder::new("exporter");
    exporter
        .define(
            "word",
            empty().string("w"),
            DefineOptions::internal().with_export(),
        )
        .expect("definition should register");
    let exporter = Arc::new(exporter.compile().expect("module should compile"));

    let mut builder = ModuleBuilder::new("contracts");
    builder.import(Arc::clone(&exporter));
    builder
        .define(
            "main",
            empty().parsec_remote("exporter", "ghost"),
            DefineOptions::default(),
        )
        .expect("definition should register");
    let error = builder.compile().expect_err("unknown remote name");
    assert_eq!(error.kind, BuildErrorKind::UnknownTarget);
}

#[test]
fn remote_targets_must_export_their_combinator() {
    let mut exporter = ModuleBuilder::new("exporter");
    exporter
        .define("word", empty().string("w"), DefineOptions::internal())
        .expect("definition should register");
    let exporter = Arc::new(exporter.compile().expect("module should compile"));

    let mut builder = ModuleBuilder::new("contracts");
    builder.import(exporter);
    builder
        .define(
            "main",
            empty().parsec_remote("exporter", "word"),
            DefineOptions::default(),
        )
        .expect("definition should register");
    let error = builder.compile().expect_err("unexported target");
    assert_eq!(error.kind, BuildErrorKind::TargetNotExported);
}

#[test]
fn misplaced_end_of_input_assertions_fail_compilation() {
    let mut builder = ModuleBuilder::new("contracts");
    builder
        .define(
            "main",
            empty().eos().string("tail"),
            DefineOptions::default(),
        )
        .expect("definition should register");
    let error = builder.compile().expect_err("eos before tail");
    assert_eq!(error.kind, BuildErrorKind::MisplacedEos);
}

#[test]
fn alternatives_may_end_with_their_own_assertions() {
    let program = empty()
        .choice(vec![
            empty().string("a").eos(),
            empty().string("b").eos(),
        ])
        .expect("choice");
    let mut builder = ModuleBuilder::new("contracts");
    builder
        .define("main", program, DefineOptions::default())
        .expect("definition should register");
    builder.compile().expect("assertion at alternative ends");
}

#[test]
fn nested_misplaced_assertions_are_found() {
    let body = empty().eos().string("x");
    let program = empty().optional(body);
    let mut builder = ModuleBuilder::new("contracts");
    builder
        .define("main", program, DefineOptions::default())
        .expect("definition should register");
    let error = builder.compile().expect_err("nested misplacement");
    assert_eq!(error.kind, BuildErrorKind::MisplacedEos);
}
