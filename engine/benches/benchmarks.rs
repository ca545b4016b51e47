//! Performance benchmarks for streaks-engine

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use streaks_engine::{diff, patch, BackwardScan, Collection, EntryId, RawEntry, Record, Version};

fn create_collection(records: usize, days: usize) -> Collection {
    Collection::with_records((0..records).map(|i| {
        let mut record = Record::new(format!("streak_{}", i)).with_description("daily");
        for d in 0..days {
            record.counters.set(format!("2024-01-{:02}", d % 28 + 1), (d % 5) as i64 + 1);
        }
        record
    }))
}

fn bench_diff_patch(c: &mut Criterion) {
    let mut group = c.benchmark_group("diff_patch");

    for size in [10usize, 100, 1000] {
        let base = create_collection(size, 28);
        let mut target = base.clone();
        for record in target.records.iter_mut().step_by(3) {
            record.counters.add("2024-01-01", 1);
        }
        target.records.push(Record::new("added").with_counter("2024-01-01", 1));

        group.bench_with_input(BenchmarkId::new("diff", size), &size, |b, _| {
            b.iter(|| diff(black_box(&base), black_box(&target)))
        });

        let descriptor = diff(&base, &target);
        group.bench_with_input(BenchmarkId::new("patch", size), &size, |b, _| {
            b.iter(|| {
                let mut replica = base.clone();
                patch(&mut replica, black_box(&descriptor));
                replica
            })
        });
    }

    group.finish();
}

fn bench_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("backward_scan");

    let pages: Vec<Vec<RawEntry>> = (0..50u64)
        .map(|p| {
            (1..=10u64)
                .map(|i| RawEntry::new(p * 10 + i, r#"{"streak_1":{"data":{"2024-01-01":"+1"}}}"#))
                .collect()
        })
        .collect();

    group.bench_function("scan_from_start", |b| {
        b.iter(|| {
            let mut scan = BackwardScan::new(black_box(&Version::Initial), pages.len() as u32);
            while let Some(page) = scan.next_page() {
                scan.feed(pages[page as usize - 1].clone());
            }
            scan.finish()
        })
    });

    group.bench_function("scan_recent", |b| {
        let known = Version::At(EntryId::from(490));
        b.iter(|| {
            let mut scan = BackwardScan::new(black_box(&known), pages.len() as u32);
            while let Some(page) = scan.next_page() {
                scan.feed(pages[page as usize - 1].clone());
            }
            scan.finish()
        })
    });

    group.finish();
}

criterion_group!(benches, bench_diff_patch, bench_scan);
criterion_main!(benches);
