//! Inkwell benchmark suite
//!
//! Targets on a laptop-class machine:
//!   merge_200_findings ............ < 100μs
//!   merge_dense_overlap_100 ....... < 50μs
//!   segment_20k_chars ............. < 1ms
//!   tail_context_20k_chars ........ < 50μs

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use inkwell_core::segment::segment;
use inkwell_core::span::tail_chars;
use inkwell_core::{Category, GrammarError, Origin, TextSpan, merge};

const SENTENCE: &str = "오늘은 날씨가 정말 좋아서 공원에 산책을 나갔다. ";

fn make_document(sentences: usize) -> String {
    SENTENCE.repeat(sentences)
}

fn make_finding(start: usize, len: usize, origin: Origin, i: usize) -> Option<GrammarError> {
    let span = TextSpan::new(start, start + len)?;
    Some(GrammarError::new(
        span,
        format!("src{i}"),
        format!("fix{i}"),
        if i % 3 == 0 { Category::Spacing } else { Category::Spelling },
        origin,
        (i % 10) as f32 / 10.0,
    ))
}

/// Benchmark: 100 basic + 100 AI findings spread across a document.
fn bench_merge_spread(c: &mut Criterion) {
    let basic: Vec<_> = (0..100)
        .filter_map(|i| make_finding(i * 20, 3, Origin::Basic, i))
        .collect();
    let ai: Vec<_> = (0..100)
        .filter_map(|i| make_finding(i * 20 + 2, 5, Origin::Ai, i))
        .collect();

    c.bench_function("merge_200_findings", |b| {
        b.iter(|| {
            let composites = merge(black_box(&basic), black_box(&ai));
            black_box(composites);
        });
    });
}

/// Benchmark: one long chain of overlapping findings.
fn bench_merge_dense(c: &mut Criterion) {
    let basic: Vec<_> = (0..50)
        .filter_map(|i| make_finding(i * 2, 4, Origin::Basic, i))
        .collect();
    let ai: Vec<_> = (0..50)
        .filter_map(|i| make_finding(i * 2 + 1, 4, Origin::Ai, i))
        .collect();

    c.bench_function("merge_dense_overlap_100", |b| {
        b.iter(|| {
            let composites = merge(black_box(&basic), black_box(&ai));
            black_box(composites);
        });
    });
}

/// Benchmark: splitting a long document into service-sized chunks.
fn bench_segment(c: &mut Criterion) {
    let text = make_document(700);

    c.bench_function("segment_20k_chars", |b| {
        b.iter(|| {
            let chunks = segment(black_box(&text), black_box(500));
            black_box(chunks);
        });
    });
}

/// Benchmark: trailing context for the suggestion prompt.
fn bench_tail_context(c: &mut Criterion) {
    let text = make_document(700);

    c.bench_function("tail_context_20k_chars", |b| {
        b.iter(|| {
            let tail = tail_chars(black_box(&text), black_box(1000));
            black_box(tail);
        });
    });
}

criterion_group!(
    benches,
    bench_merge_spread,
    bench_merge_dense,
    bench_segment,
    bench_tail_context,
);
criterion_main!(benches);
