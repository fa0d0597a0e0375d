//! Example of running many submissions concurrently through the shared
//! worker pool, and of the batch-optimized mode that compiles once and
//! reuses one sandbox across many test configs.
//!
//! Run with: cargo run --example concurrent_execution
//!
//! Note: requires a reachable Docker daemon and the `tsukisama9292/judger-runner:c` image.

use std::sync::Arc;
use std::time::Instant;

use judge_sandbox_rs::prelude::*;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let shared = SharedRuntime::connect()?;
    let driver: Arc<dyn ContainerRuntime> = Arc::new(BollardRuntime::new(shared));
    let config = EngineConfig::builder().worker_pool(4).build();
    let facade = Facade::new(driver, config);

    println!("=== Batch (independent sandboxes, concurrent) ===\n");
    let code = "int solve(int *a, int *b) { *a = *a * 2; *b = *b * 2 + 1; return 0; }";
    let inputs = [(3, 4), (5, 10), (1, 2), (7, 7)];
    let submissions = inputs
        .iter()
        .map(|(a, b)| {
            Submission::new(
                Language::C,
                code,
                serde_json::json!({
                    "solve_params": [{"name": "a", "value": a}, {"name": "b", "value": b}],
                    "expected": {"a": a * 2, "b": b * 2 + 1},
                    "function_type": "int",
                }),
            )
        })
        .collect();

    let start = Instant::now();
    let batch = facade.batch(submissions).await;
    println!(
        "{}/{} accepted in {:?} (avg {:?} per test)\n",
        batch.stats.success_count, batch.stats.total_tests, start.elapsed(), batch.stats.avg_time
    );

    println!("=== Batch-optimized (one sandbox, compiled once) ===\n");
    let configs = inputs
        .iter()
        .map(|(a, b)| {
            serde_json::json!({
                "solve_params": [{"name": "a", "value": a}, {"name": "b", "value": b}],
                "expected": {"a": a * 2, "b": b * 2 + 1},
                "function_type": "int",
            })
        })
        .collect();

    let start = Instant::now();
    let batch = facade
        .batch_optimized(Language::C, code.to_string(), configs, Limits::default())
        .await?;
    println!(
        "{}/{} accepted in {:?} (compile_wall shared across all: {:?})",
        batch.stats.success_count,
        batch.stats.total_tests,
        start.elapsed(),
        batch.verdicts.first().and_then(|v| v.timings().compile),
    );

    Ok(())
}
