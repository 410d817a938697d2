//! Benchmarks for head parsing and summary extraction

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use page_summary::PageSummary;

const SAMPLE_HTML: &str = include_str!("../test_data/sample.html");
const BASE_URL: &str = "https://engineering.example.com/streaming-head-parser";

fn bench_sample(c: &mut Criterion) {
    let mut group = c.benchmark_group("head_parsing");
    group.throughput(Throughput::Bytes(SAMPLE_HTML.len() as u64));

    group.bench_function("sample", |b| {
        b.iter(|| PageSummary::from_html(black_box(SAMPLE_HTML), BASE_URL))
    });

    group.finish();
}

fn bench_image_counts(c: &mut Criterion) {
    let mut group = c.benchmark_group("og_images");

    for count in [1, 10, 50, 100] {
        let html = generate_head_with_images(count);
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("images", count), &html, |b, html| {
            b.iter(|| PageSummary::from_html(black_box(html), BASE_URL))
        });
    }

    group.finish();
}

fn bench_long_body(c: &mut Criterion) {
    let mut group = c.benchmark_group("long_body");

    // Parsing stops at </head>, so body size should not matter.
    for paragraphs in [10, 1_000, 10_000] {
        let html = generate_long_body(paragraphs);
        group.bench_with_input(
            BenchmarkId::new("paragraphs", paragraphs),
            &html,
            |b, html| b.iter(|| PageSummary::from_html(black_box(html), BASE_URL)),
        );
    }

    group.finish();
}

fn generate_head_with_images(count: usize) -> String {
    let images: String = (0..count)
        .map(|i| {
            format!(
                r#"<meta property="og:image" content="/images/{i}.jpg">
                <meta property="og:image:width" content="{w}">
                <meta property="og:image:height" content="{h}">
                <meta property="og:image:alt" content="Image number {i}">"#,
                w = 100 + i,
                h = 50 + i,
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"<!DOCTYPE html>
        <html>
        <head>
            <title>Gallery</title>
            {images}
        </head>
        <body></body>
        </html>"#
    )
}

fn generate_long_body(paragraphs: usize) -> String {
    let text: String = (0..paragraphs)
        .map(|i| format!("<p>Paragraph {i} with <a href=\"/link/{i}\">a link</a>.</p>"))
        .collect::<Vec<_>>()
        .join("\n");

    SAMPLE_HTML.replace("</article>", &format!("{text}</article>"))
}

criterion_group!(benches, bench_sample, bench_image_counts, bench_long_body);

criterion_main!(benches);
