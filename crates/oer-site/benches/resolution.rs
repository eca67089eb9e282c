//! Benchmarks for resolution passes.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use oer_manifest::{ContentRecord, ParentRef};
use oer_site::{NodeId, ResolutionPass, ResolveOptions};

/// Build records for a tree with specified depth and breadth.
fn create_records(depth: usize, breadth: usize) -> Vec<ContentRecord> {
    fn create_level(
        records: &mut Vec<ContentRecord>,
        dir: &str,
        parent: Option<&str>,
        current_depth: usize,
        max_depth: usize,
        breadth: usize,
    ) {
        for i in 0..breadth {
            let child_dir = format!("{dir}section-{i}/");
            let source = if current_depth < max_depth {
                format!("{child_dir}_index.md")
            } else {
                format!("{dir}page-{i}.md")
            };
            let mut record =
                ContentRecord::new(records.len(), format!("Section {current_depth}.{i}"))
                    .with_source(source.clone())
                    .with_menu("main");
            if let Some(parent) = parent {
                record = record.with_parent(ParentRef::Path(parent.to_owned()));
            }
            records.push(record);
            if current_depth < max_depth {
                create_level(
                    records,
                    &child_dir,
                    Some(&source),
                    current_depth + 1,
                    max_depth,
                    breadth,
                );
            }
        }
    }

    let mut records = vec![
        ContentRecord::new(0, "Home")
            .with_source("index.md")
            .with_slug("main")
            .with_menu("main")
            .as_root(),
    ];
    create_level(&mut records, "", None, 0, depth, breadth);
    records
}

fn bench_run(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolution_pass");
    let pass = ResolutionPass::new(ResolveOptions::default());

    for (depth, breadth) in [(2, 5), (3, 5), (4, 4)] {
        let records = create_records(depth, breadth);
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}_nodes", records.len())),
            &records,
            |b, records| b.iter(|| pass.run(black_box(records), Vec::new())),
        );
    }

    group.finish();
}

fn bench_navigation(c: &mut Criterion) {
    let records = create_records(4, 4);
    let resolution = ResolutionPass::new(ResolveOptions::default())
        .run(&records, Vec::new())
        .unwrap();

    let mut group = c.benchmark_group("navigation");
    group.bench_function("unbounded", |b| {
        b.iter(|| resolution.navigation(black_box("main"), None));
    });
    group.bench_function("depth_1", |b| {
        b.iter(|| resolution.navigation(black_box("main"), Some(1)));
    });
    group.finish();
}

fn bench_rewrite_all(c: &mut Criterion) {
    let records = create_records(3, 5);
    let resolution = ResolutionPass::new(ResolveOptions::default())
        .run(&records, Vec::new())
        .unwrap();

    let bodies: Vec<(NodeId, String)> = (1..records.len())
        .map(|i| {
            let body = "# Page\n\nSee [home](/index.md), [sibling](page-0.md) and \
                        [web](https://example.com).\n"
                .repeat(20);
            (NodeId::new(i), body)
        })
        .collect();

    c.bench_function("rewrite_all", |b| {
        b.iter(|| resolution.rewrite_all(black_box(&bodies)));
    });
}

criterion_group!(benches, bench_run, bench_navigation, bench_rewrite_all);
criterion_main!(benches);
