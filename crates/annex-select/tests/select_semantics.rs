//! Integration tests: selection semantics over a populated view.
//!
//! The fixture graph has one sentence layer and one token layer in the
//! initial view, so every positioning operator has in-range and
//! out-of-range material to work against.

use annex_model::{Cas, FsId, INITIAL_VIEW, TypeId, TypeSystem};
use annex_select::{SelectError, select};
use std::sync::Arc;

struct Fixture {
    cas: Cas,
    token: TypeId,
    sentence: TypeId,
    s1: FsId,
    s2: FsId,
    t1: FsId,
    t2: FsId,
    edge: FsId,
    t3: FsId,
    t4: FsId,
    t5: FsId,
    t6: FsId,
}

fn fixture() -> Fixture {
    let mut ts = TypeSystem::new();
    let b = ts.builtins();
    let token = ts.register_type("Token", Some(b.annotation)).unwrap();
    let sentence = ts.register_type("Sentence", Some(b.annotation)).unwrap();
    ts.commit();
    let mut cas = Cas::new(Arc::new(ts)).unwrap();
    let v = INITIAL_VIEW;
    let s1 = cas.create_annotation(v, sentence, 0, 20).unwrap();
    let s2 = cas.create_annotation(v, sentence, 20, 40).unwrap();
    let t1 = cas.create_annotation(v, token, 0, 4).unwrap();
    let t2 = cas.create_annotation(v, token, 5, 9).unwrap();
    let edge = cas.create_annotation(v, token, 9, 10).unwrap();
    let t3 = cas.create_annotation(v, token, 10, 14).unwrap();
    let t4 = cas.create_annotation(v, token, 15, 20).unwrap();
    let t5 = cas.create_annotation(v, token, 21, 25).unwrap();
    let t6 = cas.create_annotation(v, token, 26, 30).unwrap();
    Fixture {
        cas,
        token,
        sentence,
        s1,
        s2,
        t1,
        t2,
        edge,
        t3,
        t4,
        t5,
        t6,
    }
}

#[test]
fn plain_iteration_is_span_ordered() {
    let f = fixture();
    let all = select(&f.cas, INITIAL_VIEW).as_list().unwrap();
    // begin ascending, wider-first at equal begin.
    assert_eq!(
        all,
        vec![f.s1, f.t1, f.t2, f.edge, f.t3, f.t4, f.s2, f.t5, f.t6]
    );
}

#[test]
fn backwards_reverses_and_does_not_compose() {
    let f = fixture();
    let forward = select(&f.cas, INITIAL_VIEW).as_list().unwrap();
    let back = select(&f.cas, INITIAL_VIEW).backwards().as_list().unwrap();
    let mut expected = forward.clone();
    expected.reverse();
    assert_eq!(back, expected);
    let back_twice = select(&f.cas, INITIAL_VIEW)
        .backwards()
        .backwards()
        .as_list()
        .unwrap();
    assert_eq!(back_twice, expected, "backwards is a flag, not a toggle");
}

#[test]
fn type_restriction_covers_subtypes() {
    let f = fixture();
    let tokens = select(&f.cas, INITIAL_VIEW)
        .of_type(f.token)
        .as_list()
        .unwrap();
    assert_eq!(tokens, vec![f.t1, f.t2, f.edge, f.t3, f.t4, f.t5, f.t6]);
    let annotation = f.cas.type_system().builtins().annotation;
    let all = select(&f.cas, INITIAL_VIEW)
        .of_type(annotation)
        .as_list()
        .unwrap();
    assert_eq!(all.len(), 9, "base type selects the whole layer");
}

#[test]
fn covered_by_span() {
    let f = fixture();
    let inside = select(&f.cas, INITIAL_VIEW)
        .of_type(f.token)
        .covered_by(0, 20)
        .as_list()
        .unwrap();
    assert_eq!(inside, vec![f.t1, f.t2, f.edge, f.t3, f.t4]);
}

#[test]
fn covered_by_fs_skips_the_bound_itself() {
    let f = fixture();
    let inside = select(&f.cas, INITIAL_VIEW)
        .covered_by_fs(f.s1)
        .as_list()
        .unwrap();
    assert!(!inside.contains(&f.s1));
    assert_eq!(inside, vec![f.t1, f.t2, f.edge, f.t3, f.t4]);
}

#[test]
fn covered_by_end_beyond_bounds() {
    let f = fixture();
    // t4 spans [15, 20): inside [10, 18) only when overhang is allowed.
    let strict = select(&f.cas, INITIAL_VIEW)
        .of_type(f.token)
        .covered_by(10, 18)
        .as_list()
        .unwrap();
    assert_eq!(strict, vec![f.t3]);
    let with_overhang = select(&f.cas, INITIAL_VIEW)
        .of_type(f.token)
        .covered_by(10, 18)
        .include_annotations_with_end_beyond_bounds()
        .as_list()
        .unwrap();
    assert_eq!(with_overhang, vec![f.t3, f.t4]);
}

#[test]
fn covered_by_annotation_equals_skips_by_value() {
    let mut f = fixture();
    // A second sentence with exactly s1's span but its own identity.
    let twin = f.cas.create_annotation(INITIAL_VIEW, f.sentence, 0, 20).unwrap();
    let by_identity = select(&f.cas, INITIAL_VIEW)
        .of_type(f.sentence)
        .covered_by_fs(f.s1)
        .as_list()
        .unwrap();
    assert_eq!(by_identity, vec![twin], "identity skip keeps the twin");
    let by_value = select(&f.cas, INITIAL_VIEW)
        .of_type(f.sentence)
        .covered_by_fs(f.s1)
        .use_annotation_equals()
        .as_list()
        .unwrap();
    assert!(by_value.is_empty(), "value skip drops the twin too");
}

#[test]
fn covering_finds_enclosing_annotations() {
    let f = fixture();
    let over = select(&f.cas, INITIAL_VIEW)
        .covering_fs(f.t2)
        .as_list()
        .unwrap();
    assert_eq!(over, vec![f.s1]);
    let nothing = select(&f.cas, INITIAL_VIEW)
        .of_type(f.token)
        .covering(0, 40)
        .as_list()
        .unwrap();
    assert!(nothing.is_empty());
}

#[test]
fn at_matches_exact_spans_only() {
    let f = fixture();
    let hit = select(&f.cas, INITIAL_VIEW).at(0, 4).as_list().unwrap();
    assert_eq!(hit, vec![f.t1]);
    let miss = select(&f.cas, INITIAL_VIEW).at(0, 5).as_list().unwrap();
    assert!(miss.is_empty());
}

#[test]
fn position_uses_type_requires_type_equality() {
    let mut f = fixture();
    let twin_token = f.cas.create_annotation(INITIAL_VIEW, f.token, 50, 60).unwrap();
    let twin_sentence = f
        .cas
        .create_annotation(INITIAL_VIEW, f.sentence, 50, 60)
        .unwrap();
    // Without the flag, at() takes every span-equal annotation.
    let both = select(&f.cas, INITIAL_VIEW).at(50, 60).as_list().unwrap();
    assert_eq!(both, vec![twin_token, twin_sentence]);
    // With it, positioning by the sentence stops only on the sentence.
    let only = select(&f.cas, INITIAL_VIEW)
        .at_fs(twin_sentence)
        .position_uses_type()
        .as_list()
        .unwrap();
    assert_eq!(only, vec![twin_sentence]);
}

#[test]
fn start_at_and_shift() {
    let f = fixture();
    let from_t3 = select(&f.cas, INITIAL_VIEW).start_at(10, 14).as_list().unwrap();
    assert_eq!(from_t3, vec![f.t3, f.t4, f.s2, f.t5, f.t6]);
    let shifted = select(&f.cas, INITIAL_VIEW)
        .start_at(10, 14)
        .shifted(2)
        .as_list()
        .unwrap();
    assert_eq!(shifted, vec![f.s2, f.t5, f.t6]);
    let backed_up = select(&f.cas, INITIAL_VIEW)
        .start_at(10, 14)
        .shifted(-1)
        .as_list()
        .unwrap();
    assert_eq!(backed_up, vec![f.edge, f.t3, f.t4, f.s2, f.t5, f.t6]);
}

#[test]
fn between_spans_the_gap() {
    let f = fixture();
    let gap = select(&f.cas, INITIAL_VIEW)
        .between(f.t2, f.t5)
        .as_list()
        .unwrap();
    // Gap is [9, 21): t2 ends at 9, t5 begins at 21.
    assert_eq!(gap, vec![f.edge, f.t3, f.t4]);
}

#[test]
fn between_swapped_bounds_reverse_the_output() {
    let f = fixture();
    let gap = select(&f.cas, INITIAL_VIEW)
        .between(f.t5, f.t2)
        .as_list()
        .unwrap();
    assert_eq!(gap, vec![f.t4, f.t3, f.edge]);
}

#[test]
fn following_is_strictly_after_the_reference_end() {
    let f = fixture();
    let after = select(&f.cas, INITIAL_VIEW)
        .of_type(f.token)
        .following_fs(f.t2)
        .as_list()
        .unwrap();
    // t2 ends at 9; edge begins exactly at 9 and is not strictly after.
    assert_eq!(after, vec![f.t3, f.t4, f.t5, f.t6]);
}

#[test]
fn preceding_runs_forward_and_shifts_from_the_reference() {
    let f = fixture();
    let before = select(&f.cas, INITIAL_VIEW)
        .of_type(f.token)
        .preceding_fs(f.t3)
        .as_list()
        .unwrap();
    // Everything ending at or before t3's begin (10), forward order.
    assert_eq!(before, vec![f.t1, f.t2, f.edge]);
    let offset = select(&f.cas, INITIAL_VIEW)
        .of_type(f.token)
        .preceding_fs(f.t3)
        .shifted(1)
        .as_list()
        .unwrap();
    assert_eq!(offset, vec![f.t1, f.t2], "offset drops the nearest");
}

#[test]
fn non_overlapping_suppresses_overlaps() {
    let f = fixture();
    let unambiguous = select(&f.cas, INITIAL_VIEW)
        .non_overlapping()
        .as_list()
        .unwrap();
    // s1 swallows every token under it; s2 swallows t5 and t6.
    assert_eq!(unambiguous, vec![f.s1, f.s2]);
}

#[test]
fn single_result_accessors() {
    let f = fixture();
    let empty = select(&f.cas, INITIAL_VIEW).covered_by(1000, 2000);
    assert_eq!(empty.clone().get(), Err(SelectError::EmptyOrNull));
    assert_eq!(empty.clone().null_ok().get(), Ok(None));
    assert_eq!(empty.clone().single_or_null(), Ok(None));
    assert_eq!(empty.single(), Err(SelectError::EmptyOrNull));

    let one = select(&f.cas, INITIAL_VIEW).at(0, 4);
    assert_eq!(one.clone().get(), Ok(Some(f.t1)));
    assert_eq!(one.clone().single(), Ok(f.t1));
    assert_eq!(one.single_or_null(), Ok(Some(f.t1)));

    let many = select(&f.cas, INITIAL_VIEW).of_type(f.token);
    assert_eq!(many.clone().get(), Ok(Some(f.t1)));
    assert_eq!(many.clone().single(), Err(SelectError::TooManyResults(7)));
    assert_eq!(
        many.single_or_null(),
        Err(SelectError::TooManyResults(7))
    );
}

#[test]
fn get_positioning_overloads() {
    let f = fixture();
    assert_eq!(
        select(&f.cas, INITIAL_VIEW).get_fs(f.t3),
        Ok(Some(f.t3))
    );
    assert_eq!(
        select(&f.cas, INITIAL_VIEW).get_span(10, 14),
        Ok(Some(f.t3))
    );
    assert_eq!(
        select(&f.cas, INITIAL_VIEW).get_span_offset(10, 14, 1),
        Ok(Some(f.t4))
    );
}

#[test]
fn all_views_extends_the_selection() {
    let mut f = fixture();
    f.cas.create_view("gold").unwrap();
    let extra = f.cas.create_annotation("gold", f.token, 2, 6).unwrap();
    let one_view = select(&f.cas, INITIAL_VIEW)
        .of_type(f.token)
        .as_list()
        .unwrap();
    assert!(!one_view.contains(&extra));
    let everywhere = select(&f.cas, INITIAL_VIEW)
        .of_type(f.token)
        .all_views()
        .as_list()
        .unwrap();
    assert_eq!(everywhere.len(), one_view.len() + 1);
    assert!(everywhere.contains(&extra));
}

#[test]
fn all_views_results_are_globally_span_ordered() {
    let mut f = fixture();
    f.cas.create_view("gold").unwrap();
    // Spans between t1 and t2, but lives in a later-named view.
    let extra = f.cas.create_annotation("gold", f.token, 2, 6).unwrap();
    let everywhere = select(&f.cas, INITIAL_VIEW)
        .of_type(f.token)
        .all_views()
        .as_list()
        .unwrap();
    assert_eq!(
        everywhere,
        vec![f.t1, extra, f.t2, f.edge, f.t3, f.t4, f.t5, f.t6]
    );
    // Positioning arithmetic walks the merged order, not per-view runs.
    let from_extra = select(&f.cas, INITIAL_VIEW)
        .of_type(f.token)
        .all_views()
        .start_at(2, 6)
        .as_list()
        .unwrap();
    assert_eq!(
        from_extra,
        vec![extra, f.t2, f.edge, f.t3, f.t4, f.t5, f.t6]
    );
}

#[test]
fn order_not_needed_uses_indexing_order() {
    let mut ts = TypeSystem::new();
    let b = ts.builtins();
    let token = ts.register_type("Token", Some(b.annotation)).unwrap();
    ts.commit();
    let mut cas = Cas::new(Arc::new(ts)).unwrap();
    let late = cas.create_annotation(INITIAL_VIEW, token, 30, 31).unwrap();
    let early = cas.create_annotation(INITIAL_VIEW, token, 0, 1).unwrap();
    let unordered = select(&cas, INITIAL_VIEW)
        .order_not_needed()
        .as_list()
        .unwrap();
    assert_eq!(unordered, vec![late, early]);
    let ordered = select(&cas, INITIAL_VIEW).as_list().unwrap();
    assert_eq!(ordered, vec![early, late]);
}

#[test]
fn unknown_view_is_an_input_error() {
    let f = fixture();
    assert!(matches!(
        select(&f.cas, "nope").as_list(),
        Err(SelectError::Model(_))
    ));
}
