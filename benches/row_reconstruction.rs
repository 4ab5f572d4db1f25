//! Row Reconstruction Benchmarks
//!
//! Grouping positioned fragments into reading-order rows for pages of
//! increasing density.
//!
//! Run with: `cargo bench --bench row_reconstruction`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::time::Duration;

use ocr_worker::geometry::{reconstruct_text, BoundingBox, RecognitionFragment, ROW_THRESHOLD};

/// Synthetic table page: `rows` lines of `columns` cells, slightly jittered
/// vertically and emitted in column-major order
fn table_page(rows: i32, columns: i32) -> Vec<RecognitionFragment> {
    let mut fragments = Vec::with_capacity((rows * columns) as usize);
    for column in 0..columns {
        for row in 0..rows {
            let jitter = (row * 7 + column * 3) % 11;
            let x = 40 + column * 220;
            let y = 60 + row * 64 + jitter;
            fragments.push(RecognitionFragment::new(
                format!("r{}c{}", row, column),
                0.9,
                BoundingBox::new(x, y, x + 180, y + 28),
            ));
        }
    }
    fragments
}

fn bench_reconstruct(c: &mut Criterion) {
    let mut group = c.benchmark_group("row_reconstruction");
    group.measurement_time(Duration::from_secs(5));

    for (rows, columns) in [(20, 3), (60, 5), (200, 8)] {
        let page = table_page(rows, columns);
        group.throughput(Throughput::Elements(page.len() as u64));
        group.bench_with_input(
            BenchmarkId::new("table", format!("{}x{}", rows, columns)),
            &page,
            |b, page| {
                b.iter(|| black_box(reconstruct_text(black_box(page.clone()), ROW_THRESHOLD)))
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_reconstruct);
criterion_main!(benches);
