use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use cuttle::postlist::{advance_handling_prune, PostList, ValueRangePostList};
use cuttle::{Collection, Document, InMemoryCollection, MatcherConfig, Matcher, Query};

fn build_collection(doc_count: u32) -> Arc<InMemoryCollection> {
    let coll = Arc::new(InMemoryCollection::new());
    for did in 1..=doc_count {
        let mut doc = Document::new();
        doc.add_term("common", 1 + did % 3).unwrap();
        if did % 4 == 0 {
            doc.add_term("rare", 1 + did % 5).unwrap();
        }
        if did % 7 == 0 {
            doc.add_term("rarer", 2).unwrap();
        }
        doc.add_value(0, format!("{:08}", did)).unwrap();
        coll.add_document(&doc).unwrap();
    }
    coll
}

fn count(mut pl: Box<dyn PostList>) -> usize {
    let mut n = 0;
    loop {
        advance_handling_prune(&mut pl, 0.0).unwrap();
        if pl.at_end() {
            return n;
        }
        n += 1;
    }
}

fn bench_value_range_scan(c: &mut Criterion) {
    let counts = [1_000u32, 10_000];
    let mut group = c.benchmark_group("value_range_scan");
    for &doc_count in &counts {
        let coll: Arc<dyn Collection> = build_collection(doc_count);
        let high = format!("{:08}", doc_count / 2);
        group.bench_with_input(BenchmarkId::from_parameter(doc_count), &coll, |b, coll| {
            b.iter(|| {
                let pl = ValueRangePostList::new(Arc::clone(coll), 0, "00000000", high.as_str());
                black_box(count(Box::new(pl)));
            });
        });
    }
    group.finish();
}

fn bench_and_matching(c: &mut Criterion) {
    let counts = [1_000u32, 10_000];
    let query = Query::And(vec![
        Query::term("rare"),
        Query::term("rarer"),
        Query::value_range(0, "00000100", "99999999"),
    ]);
    let config = MatcherConfig::default().with_paranoid_checks(false);

    let mut group = c.benchmark_group("and_matching");
    for &doc_count in &counts {
        let coll: Arc<dyn Collection> = build_collection(doc_count);
        group.bench_with_input(BenchmarkId::from_parameter(doc_count), &coll, |b, coll| {
            b.iter(|| {
                black_box(count(query.build(coll, &config).unwrap()));
            });
        });
    }
    group.finish();
}

fn bench_top_k(c: &mut Criterion) {
    let counts = [1_000u32, 10_000];
    let query = Query::Or(vec![
        Query::term("common"),
        Query::term("rare"),
        Query::term("rarer"),
    ]);

    let mut group = c.benchmark_group("top_k");
    for &doc_count in &counts {
        let coll: Arc<dyn Collection> = build_collection(doc_count);
        let matcher = Matcher::new(coll, MatcherConfig::default().with_paranoid_checks(false));
        group.bench_with_input(BenchmarkId::from_parameter(doc_count), &matcher, |b, matcher| {
            b.iter(|| {
                black_box(matcher.get_mset(&query, 0, 10).unwrap());
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_value_range_scan, bench_and_matching, bench_top_k);
criterion_main!(benches);
