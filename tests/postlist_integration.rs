//! Posting list behaviour over a real collection

use std::sync::Arc;

use cuttle::postlist::{
    advance_handling_prune, check_handling_prune, skip_to_handling_prune, AndPostList,
    EmptyPostList, OrPostList, PostList, ValueRangePostList,
};
use cuttle::testing::{advance_script, check_postlist, trace_postlist, Op};
use cuttle::{Collection, DocId, Document, InMemoryCollection, MatcherConfig, Query};

const DOCS: DocId = 20;

/// Twenty documents: every one has "all", then "even", "three" and "five"
/// by divisibility. Slot 0 holds the zero-padded docid.
fn fixture() -> Arc<InMemoryCollection> {
    let coll = Arc::new(InMemoryCollection::new());
    for did in 1..=DOCS {
        let mut doc = Document::new();
        doc.add_term("all", 1).unwrap();
        if did % 2 == 0 {
            doc.add_term("even", 1 + did % 3).unwrap();
        }
        if did % 3 == 0 {
            doc.add_term("three", 1 + did % 4).unwrap();
        }
        if did % 5 == 0 {
            doc.add_term("five", 2).unwrap();
        }
        doc.add_value(0, format!("{:02}", did)).unwrap();
        doc.set_data(format!("document {}", did));
        assert_eq!(coll.add_document(&doc).unwrap(), did);
    }
    coll
}

fn dyn_coll(coll: &Arc<InMemoryCollection>) -> Arc<dyn Collection> {
    coll.clone()
}

fn build(coll: &Arc<InMemoryCollection>, query: &Query) -> Box<dyn PostList> {
    query
        .build(&dyn_coll(coll), &MatcherConfig::default())
        .unwrap()
}

fn drain(mut pl: Box<dyn PostList>) -> Vec<DocId> {
    let mut out = Vec::new();
    loop {
        advance_handling_prune(&mut pl, 0.0).unwrap();
        if pl.at_end() {
            return out;
        }
        out.push(pl.docid());
    }
}

fn docs_where(pred: impl Fn(DocId) -> bool) -> Vec<DocId> {
    (1..=DOCS).filter(|&d| pred(d)).collect()
}

fn sample_queries() -> Vec<Query> {
    vec![
        Query::term("even"),
        Query::term("missing"),
        Query::value_range(0, "05", "14"),
        Query::And(vec![Query::term("even"), Query::term("three")]),
        Query::And(vec![Query::value_range(0, "03", "17"), Query::term("five")]),
        Query::Or(vec![Query::term("three"), Query::term("five")]),
        Query::Or(vec![
            Query::term("even"),
            Query::term("three"),
            Query::term("five"),
        ]),
        Query::and_maybe(Query::term("three"), Query::term("even")),
        Query::and_not(Query::term("all"), Query::term("even")),
        Query::and_not(
            Query::Or(vec![Query::term("three"), Query::term("five")]),
            Query::value_range(0, "10", "19"),
        ),
        Query::MatchNothing,
    ]
}

#[test]
fn test_cursor_and_bounds_hold_for_every_list() {
    let coll = fixture();
    let mixed = [
        Op::Advance(0.0),
        Op::SkipTo(4, 0.0),
        Op::Check(6, 0.0),
        Op::Advance(0.0),
        Op::SkipTo(3, 0.0),
        Op::Check(11, 0.0),
        Op::Advance(0.0),
        Op::SkipTo(15, 0.0),
        Op::Advance(0.0),
        Op::Advance(0.0),
        Op::SkipTo(30, 0.0),
        Op::Advance(0.0),
        Op::Check(40, 0.0),
    ];

    for query in sample_queries() {
        for script in [advance_script(DOCS as usize + 3), mixed.to_vec()] {
            let violations = check_postlist(build(&coll, &query), &script).unwrap();
            assert!(
                violations.is_empty(),
                "{}: {}",
                query,
                violations
                    .iter()
                    .map(|v| v.to_string())
                    .collect::<Vec<_>>()
                    .join("\n")
            );
        }
    }
}

#[test]
fn test_invariants_hold_under_weight_pruning() {
    let coll = fixture();
    let query = Query::Or(vec![
        Query::term("even"),
        Query::term("three"),
        Query::term("five"),
    ]);
    let mut script = vec![Op::Advance(0.0), Op::Advance(0.0)];
    script.extend(std::iter::repeat(Op::Advance(1.0)).take(4));
    script.extend(std::iter::repeat(Op::Advance(2.5)).take(20));

    let violations = check_postlist(build(&coll, &query), &script).unwrap();
    assert!(violations.is_empty(), "{:?}", violations);
}

#[test]
fn test_absent_term_is_neutral() {
    let coll = fixture();
    assert!(!coll.term_exists("missing"));

    let mut pl = coll.open_posting_list("missing").unwrap();
    assert_eq!(pl.termfreq_max(), 0);
    assert!(pl.at_end());
    advance_handling_prune(&mut pl, 0.0).unwrap();
    assert!(pl.at_end());
}

#[test]
fn test_empty_lists_never_yield() {
    let coll = fixture();
    assert!(drain(Box::new(EmptyPostList::new())).is_empty());
    assert!(drain(coll.open_posting_list("missing").unwrap()).is_empty());
    assert!(drain(build(&coll, &Query::MatchNothing)).is_empty());

    let trace = trace_postlist(
        Box::new(EmptyPostList::new()),
        &[Op::Advance(0.0), Op::SkipTo(5, 0.0), Op::Check(9, 0.0)],
    )
    .unwrap();
    assert!(trace.docids().is_empty());
    assert!(trace.steps.iter().all(|s| s.at_end));
}

#[test]
fn test_value_range_filters_and_skips_deleted() {
    let coll = Arc::new(InMemoryCollection::new());
    for value in ["10", "20", "30", "40", "50"] {
        let mut doc = Document::new();
        doc.add_value(0, value).unwrap();
        coll.add_document(&doc).unwrap();
    }

    let pl = ValueRangePostList::new(dyn_coll(&coll), 0, "15", "35");
    assert_eq!(drain(Box::new(pl)), vec![2, 3]);

    coll.delete_document(3).unwrap();
    let pl = ValueRangePostList::new(dyn_coll(&coll), 0, "15", "35");
    assert_eq!(drain(Box::new(pl)), vec![2]);
}

#[test]
fn test_value_range_matches_scan() {
    let coll = fixture();
    coll.delete_document(7).unwrap();
    coll.delete_document(12).unwrap();

    for (low, high) in [("05", "14"), ("00", "99"), ("2", "3"), ("15", "15"), ("9", "1")] {
        let expected: Vec<DocId> = docs_where(|d| {
            let value = format!("{:02}", d);
            d != 7 && d != 12 && value.as_str() >= low && value.as_str() <= high
        });
        let pl = ValueRangePostList::new(dyn_coll(&coll), 0, low, high);
        assert_eq!(drain(Box::new(pl)), expected, "range [{}, {}]", low, high);
    }
}

#[test]
fn test_check_agrees_with_skip_to() {
    let coll = fixture();
    coll.delete_document(9).unwrap();

    let queries = [
        Query::value_range(0, "04", "16"),
        Query::And(vec![Query::value_range(0, "04", "16"), Query::term("three")]),
        Query::term("five"),
    ];

    for query in &queries {
        for target in 1..=DOCS + 1 {
            let mut checked = build(&coll, query);
            let mut skipped = build(&coll, query);

            let valid = check_handling_prune(&mut checked, target, 0.0).unwrap();
            skip_to_handling_prune(&mut skipped, target, 0.0).unwrap();

            let landed = !skipped.at_end() && skipped.docid() == target;
            if valid {
                assert_eq!(checked.at_end(), skipped.at_end(), "{} at {}", query, target);
                if !checked.at_end() {
                    assert_eq!(checked.docid(), skipped.docid(), "{} at {}", query, target);
                }
            } else {
                assert!(!landed, "{} rejected {} but skip_to matched it", query, target);
            }
        }
    }
}

#[test]
fn test_combinators_follow_set_algebra() {
    let coll = fixture();
    let cases: Vec<(Query, Vec<DocId>)> = vec![
        (
            Query::And(vec![Query::term("even"), Query::term("three")]),
            docs_where(|d| d % 6 == 0),
        ),
        (
            Query::Or(vec![Query::term("three"), Query::term("five")]),
            docs_where(|d| d % 3 == 0 || d % 5 == 0),
        ),
        (
            Query::and_maybe(Query::term("five"), Query::term("even")),
            docs_where(|d| d % 5 == 0),
        ),
        (
            Query::and_not(Query::term("even"), Query::term("three")),
            docs_where(|d| d % 2 == 0 && d % 3 != 0),
        ),
        (
            Query::And(vec![
                Query::value_range(0, "06", "18"),
                Query::Or(vec![Query::term("three"), Query::term("five")]),
            ]),
            docs_where(|d| (6..=18).contains(&d) && (d % 3 == 0 || d % 5 == 0)),
        ),
        (
            Query::And(vec![Query::term("even"), Query::term("missing")]),
            Vec::new(),
        ),
        (
            Query::Or(vec![Query::term("missing"), Query::term("five")]),
            docs_where(|d| d % 5 == 0),
        ),
    ];

    for (query, expected) in cases {
        assert_eq!(drain(build(&coll, &query)), expected, "{}", query);
    }
}

#[test]
fn test_combinator_bounds_bracket_the_true_count() {
    let coll = fixture();
    for query in sample_queries() {
        let pl = build(&coll, &query);
        let (min, est, max) = (pl.termfreq_min(), pl.termfreq_est(), pl.termfreq_max());
        let actual = drain(build(&coll, &query)).len() as u32;
        assert!(min <= est && est <= max, "{}: {} {} {}", query, min, est, max);
        assert!(min <= actual && actual <= max, "{}: {} not in [{}, {}]", query, actual, min, max);
    }
}

#[test]
fn test_or_rewrite_continues_from_position() {
    let coll = fixture();
    let three = coll.open_posting_list("three").unwrap();
    let five = coll.open_posting_list("five").unwrap();
    let threshold = three.max_weight().max(five.max_weight()) + 1e-6;
    let mut pl: Box<dyn PostList> = Box::new(OrPostList::new(three, five, coll.doc_count()));

    advance_handling_prune(&mut pl, 0.0).unwrap();
    advance_handling_prune(&mut pl, 0.0).unwrap();
    let before = pl.docid();
    assert_eq!(before, 5);

    let replaced = advance_handling_prune(&mut pl, threshold).unwrap();
    assert!(replaced);
    assert!(pl.description().contains(" AND "), "{}", pl.description());

    let mut rest = Vec::new();
    while !pl.at_end() {
        rest.push(pl.docid());
        advance_handling_prune(&mut pl, threshold).unwrap();
    }
    assert_eq!(rest, vec![15]);
}

#[test]
fn test_and_built_from_positioned_children() {
    let coll = fixture();
    let mut even = coll.open_posting_list("even").unwrap();
    skip_to_handling_prune(&mut even, 7, 0.0).unwrap();
    assert_eq!(even.docid(), 8);

    let three = coll.open_posting_list("three").unwrap();
    let pl = AndPostList::new(vec![even, three], coll.doc_count());
    assert_eq!(drain(Box::new(pl)), vec![12, 18]);
}
