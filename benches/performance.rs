//! Performance benchmarks for paging.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use pageable::{
    merge_page, Cursor, MemoryCollection, Pageable, PagerConfig, Paginator, RangeQuery, Record,
};
use serde_json::json;
use std::sync::Arc;

const PATH: &str = "/bench";

#[derive(Clone)]
struct Row(f64);

impl Pageable for Row {
    fn order_key(&self) -> f64 {
        self.0
    }
}

fn to_row(record: &Record) -> Row {
    Row(record.value["t"].as_f64().unwrap_or_default())
}

fn seeded(count: usize) -> Arc<MemoryCollection> {
    let collection = Arc::new(MemoryCollection::new());
    for i in 0..count {
        collection.push(PATH, json!({ "t": i }));
    }
    collection
}

/// Benchmark merging every page of a static child set
fn bench_merge_pages(c: &mut Criterion) {
    let mut group = c.benchmark_group("merge_pages");
    let children = seeded(5_000).children(PATH);

    for page in [10usize, 50, 200] {
        group.bench_with_input(BenchmarkId::new("page_size", page), &page, |b, &page| {
            let batches: Vec<Vec<Record>> = {
                let mut batches = Vec::new();
                let mut end = None;
                loop {
                    let mut query = RangeQuery::new(PATH, "t").limit_to_last(Some(page + 1));
                    if let Some(boundary) = end.take() {
                        query = query.end_at(boundary);
                    }
                    let batch = query.apply(&children);
                    let mut scratch = Vec::new();
                    let outcome = merge_page(&mut scratch, &batch, 0, Some(page), &to_row);
                    batches.push(batch);
                    match outcome.cursor {
                        Cursor::Known(boundary) => end = Some(boundary),
                        _ => break,
                    }
                }
                batches
            };

            b.iter(|| {
                let mut items = Vec::with_capacity(children.len());
                for batch in &batches {
                    let at = items.len();
                    merge_page(&mut items, batch, at, Some(page), &to_row);
                }
                black_box(items.len())
            });
        });
    }

    group.finish();
}

/// Benchmark a paginator scrolling through a collection end to end
fn bench_scroll_to_end(c: &mut Criterion) {
    let mut group = c.benchmark_group("scroll_to_end");
    group.sample_size(20);

    for count in [1_000usize, 5_000] {
        let collection = seeded(count);
        group.bench_with_input(BenchmarkId::new("children", count), &count, |b, _| {
            b.iter(|| {
                let pager = Paginator::spawn(
                    Arc::clone(&collection),
                    PagerConfig::new(PATH, "t", 50),
                    to_row,
                    (),
                )
                .unwrap();
                pager.sync().unwrap();
                while !pager.state().unwrap().is_last_page() {
                    let len = pager.len();
                    pager.on_scrolled(len, len - 1).unwrap();
                    pager.sync().unwrap();
                }
                black_box(pager.len())
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_merge_pages, bench_scroll_to_end);
criterion_main!(benches);
