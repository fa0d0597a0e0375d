//! Benchmarks for the daemon-free parts of the pipeline: archive packing
//! and result decoding. The container-driving stages (create/exec/collect)
//! need a live Docker daemon and are exercised by `tests/integration_tests.rs`
//! `#[ignore]`d cases instead.
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use judge_sandbox_rs::sandbox::codec::decode;
use judge_sandbox_rs::sandbox::packer::{
    extract_result, pack_config_only, pack_stage, pack_user_only,
};
use judge_sandbox_rs::verdict::Timings;

const SMALL_C_PROGRAM: &str = "int solve(int *a, int *b) { *a = *a * 2; *b = *b * 2 + 1; return 0; }";

fn sample_config() -> serde_json::Value {
    serde_json::json!({
        "solve_params": [{"name": "a", "value": 3}, {"name": "b", "value": 4}],
        "expected": {"a": 6, "b": 9},
        "function_type": "int",
    })
}

fn result_archive(status: &str) -> Vec<u8> {
    use std::io::Cursor;
    use tar::Builder;

    let config = sample_config();
    let body = serde_json::to_vec(&serde_json::json!({
        "status": status,
        "match": true,
        "actual": config["expected"],
        "expected": config["expected"],
    }))
    .unwrap();

    let mut builder = Builder::new(Vec::new());
    let mut header = tar::Header::new_gnu();
    header.set_path("result.json").unwrap();
    header.set_size(body.len() as u64);
    header.set_cksum();
    builder.append(&header, Cursor::new(&body)).unwrap();
    builder.into_inner().unwrap()
}

/// Benchmark staging an initial archive (user code + config) for a single submission.
fn bench_pack_stage(c: &mut Criterion) {
    let config = sample_config();

    c.bench_function("pack_stage_c", |b| {
        b.iter(|| black_box(pack_stage(SMALL_C_PROGRAM, "user.c", &config).unwrap()));
    });
}

/// Benchmark the batch-optimized path's two-archive split: code staged once,
/// then each test's config staged separately.
fn bench_pack_batch_optimized(c: &mut Criterion) {
    let config = sample_config();

    let mut group = c.benchmark_group("pack_batch_optimized");
    group.bench_function("user_only", |b| {
        b.iter(|| black_box(pack_user_only(SMALL_C_PROGRAM, "user.c").unwrap()));
    });
    group.bench_function("config_only", |b| {
        b.iter(|| black_box(pack_config_only(&config).unwrap()));
    });
    group.finish();
}

/// Benchmark extracting `result.json` out of a runner's returned archive,
/// scaling the number of unrelated entries the walk has to skip past.
fn bench_extract_result(c: &mut Criterion) {
    use std::io::Cursor;
    use tar::Builder;

    let mut group = c.benchmark_group("extract_result");

    for noise_entries in [0usize, 5, 20].iter() {
        group.throughput(Throughput::Elements(1));
        group.bench_with_input(
            BenchmarkId::new("entries_before_result", noise_entries),
            noise_entries,
            |b, &noise_entries| {
                let mut builder = Builder::new(Vec::new());
                for i in 0..noise_entries {
                    let mut header = tar::Header::new_gnu();
                    let name = format!("noise_{i}.txt");
                    header.set_path(&name).unwrap();
                    header.set_size(4);
                    header.set_cksum();
                    builder.append(&header, Cursor::new(b"noop")).unwrap();
                }
                let mut header = tar::Header::new_gnu();
                header.set_path("result.json").unwrap();
                let body = br#"{"status":"success","match":true}"#;
                header.set_size(body.len() as u64);
                header.set_cksum();
                builder.append(&header, Cursor::new(body)).unwrap();
                let archive = builder.into_inner().unwrap();

                b.iter(|| black_box(extract_result(&archive).unwrap()));
            },
        );
    }

    group.finish();
}

/// Benchmark decoding `result.json` payloads into typed verdicts across
/// every recognized status.
fn bench_decode(c: &mut Criterion) {
    let timings = Timings {
        total: std::time::Duration::from_millis(50),
        compile: Some(std::time::Duration::from_millis(20)),
        test: Some(std::time::Duration::from_millis(30)),
    };

    let mut group = c.benchmark_group("decode");
    for status in ["success", "compile_error", "runtime_timeout", "runtime_error"] {
        let archive = result_archive(status);
        let raw = extract_result(&archive).unwrap();
        group.bench_function(status, |b| {
            b.iter(|| black_box(decode(&raw, timings).unwrap()));
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_pack_stage,
    bench_pack_batch_optimized,
    bench_extract_result,
    bench_decode,
);

criterion_main!(benches);
