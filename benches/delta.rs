//! Benchmarks for delta diffing and application.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use ropey::Rope;
use sharedit::delta::diff;

fn bench_diff_append(c: &mut Criterion) {
    let old = include_str!("../tests/fixtures/sample.md");
    let new = format!("{old}\n- [ ] One more item\n");
    c.bench_function("diff_append", |b| {
        b.iter(|| diff(black_box(old), black_box(&new)))
    });
}

fn bench_apply_middle_edit(c: &mut Criterion) {
    let old = include_str!("../tests/fixtures/sample.md");
    let new = old.replace("Faster startup", "Much faster startup");
    let delta = diff(old, &new);
    c.bench_function("apply_middle_edit", |b| {
        b.iter(|| {
            let mut rope = Rope::from_str(old);
            delta.apply_to(black_box(&mut rope)).unwrap();
            rope
        })
    });
}

criterion_group!(benches, bench_diff_append, bench_apply_middle_edit);
criterion_main!(benches);
