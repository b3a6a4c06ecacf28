//! Builder shapes for well-formed programs.

use gnaw::combinator::{ClassRange, Count, GenTimes, Node, RepeatOptions, Token, empty};

#[test]
fn chained_builders_append_in_logical_order() {
    let program = empty()
        .string("a")
        .ascii_char(vec![ClassRange::inclusive('0', '9')])
        .expect("class")
        .eos();
    assert_eq!(program.len(), 3);
    assert!(matches!(program.nodes()[0], Node::Literal(_)));
    assert!(matches!(program.nodes()[1], Node::Segment { .. }));
    assert!(matches!(program.nodes()[2], Node::Eos));
}

#[test]
fn class_ranges_split_into_inclusive_and_exclusive() {
    let program = empty()
        .ascii_char(vec![
            ClassRange::inclusive('a', 'z'),
            ClassRange::not('q'),
            ClassRange::inclusive('0', '9'),
        ])
        .expect("class");
    let Node::Segment {
        inclusive,
        exclusive,
        ..
    } = &program.nodes()[0]
    else {
        panic!("expected a segment node");
    };
    assert_eq!(inclusive.len(), 2);
    assert_eq!(exclusive.len(), 1);
}

#[test]
fn descending_range_bounds_normalize() {
    let program = empty()
        .ascii_char(vec![ClassRange::inclusive('z', 'a')])
        .expect("class");
    let Node::Segment { inclusive, .. } = &program.nodes()[0] else {
        panic!("expected a segment node");
    };
    assert_eq!(inclusive[0].lo, 'a' as u32);
    assert_eq!(inclusive[0].hi, 'z' as u32);
}

#[test]
fn duplicate_unrolls_the_body() {
    let unit = empty().string("x").string("y");
    let program = empty().duplicate(unit, 3);
    assert_eq!(program.len(), 6);
}

#[test]
fn count_conversions_cover_exact_and_ranged_forms() {
    assert_eq!(Count::from(4_usize), Count::Exact(4));
    assert_eq!(Count::from(1_usize..=9), Count::Between(1, 9));
}

#[test]
fn derived_folds_wrap_their_units_in_one_traverse() {
    let program = empty().integer(3_usize).expect("integer");
    assert_eq!(program.len(), 1);
    let Node::Traverse { body, .. } = &program.nodes()[0] else {
        panic!("expected a traverse node");
    };
    assert_eq!(body.len(), 3);

    let program = empty().integer(1_usize..=3).expect("integer");
    let Node::Traverse { body, .. } = &program.nodes()[0] else {
        panic!("expected a traverse node");
    };
    assert_eq!(body.len(), 2);
    assert!(matches!(body.nodes()[1], Node::Times { max: 2, .. }));
}

#[test]
fn optional_is_a_choice_with_an_empty_branch() {
    let program = empty().optional(empty().string("x"));
    let Node::Choice { alternatives, .. } = &program.nodes()[0] else {
        panic!("expected a choice node");
    };
    assert_eq!(alternatives.len(), 2);
    assert!(alternatives[1].is_empty());
}

#[test]
fn replace_records_a_constant_substitution() {
    let program = empty().replace(empty().string("x"), Token::Integer(9));
    let Node::Traverse { ops, .. } = &program.nodes()[0] else {
        panic!("expected a traverse node");
    };
    assert_eq!(ops.len(), 1);
}

#[test]
fn repeat_options_carry_generation_hints() {
    let options = RepeatOptions {
        while_hook: None,
        gen_times: Some(GenTimes::Range(2, 5)),
    };
    let program = empty()
        .repeat_with(empty().string("x"), options)
        .expect("repeat");
    let Node::Repeat { gen_times, .. } = &program.nodes()[0] else {
        panic!("expected a repeat node");
    };
    assert_eq!(*gen_times, Some(GenTimes::Range(2, 5)));
}
