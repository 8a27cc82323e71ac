//! Text Processing Benchmarks
//!
//! Hot paths of the text layer and search endpoints:
//! - word-box parsing and line merging for one dense page
//! - case-insensitive scanning of a whole-document text dump
//!
//! Run with: `cargo bench --bench text_processing`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::time::Duration;

use docserve::document::{merge_lines, parse_word_boxes, search_text, Word};

/// Synthetic page: `lines` rows of `per_line` words with slight baseline jitter
fn create_page_words(lines: usize, per_line: usize) -> Vec<Word> {
    let mut words = Vec::with_capacity(lines * per_line);
    for line in 0..lines {
        for col in (0..per_line).rev() {
            words.push(Word {
                x: 72.0 + col as f64 * 40.0,
                y: 72.0 + line as f64 * 14.0 + (col % 3) as f64 * 0.5,
                width: 36.0,
                height: 12.0,
                text: format!("w{}x{}", line, col),
            });
        }
    }
    words
}

fn create_bbox_markup(words: &[Word]) -> String {
    let mut markup = String::from("<doc>\n<page width=\"612.000000\" height=\"792.000000\">\n");
    for word in words {
        markup.push_str(&format!(
            "<word xMin=\"{:.6}\" yMin=\"{:.6}\" xMax=\"{:.6}\" yMax=\"{:.6}\">{}</word>\n",
            word.x,
            word.y,
            word.x + word.width,
            word.y + word.height,
            word.text
        ));
    }
    markup.push_str("</page>\n</doc>\n");
    markup
}

/// Whole-document dump with `pages` form-feed separated pages
fn create_document_text(pages: usize) -> String {
    let mut text = String::new();
    for page in 0..pages {
        for para in 0..20 {
            text.push_str(&format!(
                "Page {} paragraph {}: the quick brown fox jumps over the lazy dog.\n",
                page + 1,
                para
            ));
        }
        if page % 7 == 0 {
            text.push_str("A rare Keyword appears here.\n");
        }
        text.push('\u{0C}');
    }
    text
}

fn bench_text_layer(c: &mut Criterion) {
    let mut group = c.benchmark_group("text_layer");
    group.measurement_time(Duration::from_secs(10));

    for lines in [20, 60] {
        let words = create_page_words(lines, 12);
        let markup = create_bbox_markup(&words);

        group.bench_with_input(BenchmarkId::new("parse_word_boxes", lines), &markup, |b, markup| {
            b.iter(|| black_box(parse_word_boxes(black_box(markup))))
        });

        group.bench_with_input(BenchmarkId::new("merge_lines", lines), &words, |b, words| {
            b.iter(|| black_box(merge_lines(black_box(words.clone()))))
        });
    }

    group.finish();
}

fn bench_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("search");
    group.measurement_time(Duration::from_secs(10));
    group.sample_size(50);

    let text = create_document_text(100);

    group.bench_function("rare_term_100_pages", |b| {
        b.iter(|| black_box(search_text(black_box(&text), black_box("keyword"))))
    });

    // Matches everywhere; exercises the per-page cap
    group.bench_function("common_term_100_pages", |b| {
        b.iter(|| black_box(search_text(black_box(&text), black_box("the"))))
    });

    group.finish();
}

criterion_group!(benches, bench_text_layer, bench_search);
criterion_main!(benches);
