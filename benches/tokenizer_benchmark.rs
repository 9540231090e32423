//! Tokenizer benchmark: Measure how fast raw output becomes tokens.

use cellterm::token::incomplete_tail;
use cellterm::Tokenizer;
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

fn log_lines() -> Vec<u8> {
    let mut out = Vec::new();
    for i in 0..200 {
        out.extend_from_slice(format!("[{i:04}] compiling crate number {i} of 200\n").as_bytes());
    }
    out
}

fn styled_lines() -> Vec<u8> {
    let mut out = Vec::new();
    for i in 0..200 {
        out.extend_from_slice(
            format!("\x1b[1;32m   Compiling\x1b[0m dep-{i} v0.{i}.0 \x1b[2m(registry)\x1b[0m\r\n").as_bytes(),
        );
    }
    out
}

fn tokenize_plain(c: &mut Criterion) {
    let input = log_lines();
    let tokenizer = Tokenizer::new(true);
    let mut group = c.benchmark_group("tokenize");
    group.throughput(Throughput::Bytes(input.len() as u64));
    group.bench_function("plain_ascii", |b| {
        b.iter(|| tokenizer.tokenize(black_box(&input)));
    });

    let styled = styled_lines();
    group.throughput(Throughput::Bytes(styled.len() as u64));
    group.bench_function("sgr_heavy", |b| {
        b.iter(|| tokenizer.tokenize(black_box(&styled)));
    });
    group.finish();
}

fn tokenize_unicode(c: &mut Criterion) {
    let input = "日本語のテキストと絵文字 🦀 が混ざった行\n".repeat(100).into_bytes();
    let utf8 = Tokenizer::new(true);
    let bytes = Tokenizer::new(false);

    c.bench_function("tokenize_utf8", |b| {
        b.iter(|| utf8.tokenize(black_box(&input)));
    });

    c.bench_function("tokenize_hex_fallback", |b| {
        b.iter(|| bytes.tokenize(black_box(&input)));
    });
}

fn stream_tail(c: &mut Criterion) {
    let mut chunk = styled_lines();
    chunk.extend_from_slice(b"\x1b[1;3");

    c.bench_function("incomplete_tail", |b| {
        b.iter(|| incomplete_tail(black_box(&chunk), true));
    });
}

criterion_group!(benches, tokenize_plain, tokenize_unicode, stream_tail);
criterion_main!(benches);
