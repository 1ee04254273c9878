// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for markup staging in the printdesk-print crate.

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use printdesk_print::render::{escape_markup, wrap_markup};

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

/// A log-like text body of roughly 64 KiB with a fair share of reserved
/// characters, the common case for `.log` and `.csv` prints.
fn sample_text() -> String {
    let line = "2026-03-01T12:00:00Z <worker-3> job \"invoice-42\" & 'retry' => ok\n";
    line.repeat(64 * 1024 / line.len())
}

fn bench_escape(c: &mut Criterion) {
    let text = sample_text();
    c.bench_function("escape_markup (64 KiB)", |b| {
        b.iter(|| black_box(escape_markup(black_box(&text))));
    });
}

fn bench_wrap(c: &mut Criterion) {
    let text = sample_text();
    c.bench_function("wrap_markup (64 KiB)", |b| {
        b.iter(|| black_box(wrap_markup(black_box("server.log"), black_box(&text))));
    });
}

criterion_group!(benches, bench_escape, bench_wrap);
criterion_main!(benches);
