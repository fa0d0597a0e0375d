//! Example demonstrating the engine's resource and time limits:
//! per-container CPU/memory caps, compile/execute timeouts, the
//! `continue_on_timeout` policy and its hard ceiling, and batch size limits.
//!
//! Run with: cargo run --example resource_limits
//!
//! Note: requires a reachable Docker daemon and the `tsukisama9292/judger-runner:c` image.

use std::sync::Arc;
use std::time::Duration;

use judge_sandbox_rs::prelude::*;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    println!("=== Resource Limits Example ===\n");

    let shared = SharedRuntime::connect()?;
    let driver: Arc<dyn ContainerRuntime> = Arc::new(BollardRuntime::new(shared));

    // Example 1: a tight execution timeout triggers RuntimeTimeout.
    println!("--- Test 1: Execution Timeout ---");
    {
        let config = EngineConfig::builder()
            .container_mem("64m")
            .build();
        let engine = Engine::new(Arc::clone(&driver), config);

        let submission = Submission::new(
            Language::C,
            "int solve(int *a) { while (1) {} return 0; }",
            serde_json::json!({
                "solve_params": [{"name": "a", "value": 1}],
                "expected": {"a": 1},
                "function_type": "int",
            }),
        )
        .with_limits(Limits {
            compile_timeout: Duration::from_secs(30),
            execution_timeout: Duration::from_millis(500),
        });

        match engine.submit(submission).await? {
            Verdict::RuntimeTimeout { timings } => {
                println!("Timed out as expected; observed test_wall={:?}", timings.test);
            }
            other => println!("Unexpected verdict: {other:?}"),
        }
    }
    println!();

    // Example 2: a small memory cap still leaves room for a modest program.
    println!("--- Test 2: Memory Cap ---");
    {
        let config = EngineConfig::builder().container_mem("32m").build();
        let engine = Engine::new(Arc::clone(&driver), config);

        let submission = Submission::new(
            Language::C,
            "int solve(int *a) { *a = *a * 2; return 0; }",
            serde_json::json!({
                "solve_params": [{"name": "a", "value": 10}],
                "expected": {"a": 20},
                "function_type": "int",
            }),
        );

        match engine.submit(submission).await? {
            Verdict::Success { matched, .. } => println!("Ran within 32m cap, matched={matched}"),
            other => println!("Verdict: {other:?}"),
        }
    }
    println!();

    // Example 3: requested timeouts are clamped to engine-wide maxima.
    println!("--- Test 3: Timeout Clamping ---");
    {
        let config = EngineConfig::default();
        println!(
            "A request for compile_timeout=10000s is clamped to the engine maximum of {:?}",
            config.max_compile_timeout
        );
    }
    println!();

    // Example 4: continue_on_timeout trades preemption for a hard ceiling.
    println!("--- Test 4: continue_on_timeout Ceiling ---");
    {
        let config = EngineConfig::builder().continue_on_timeout(true).build();
        let engine = Engine::new(Arc::clone(&driver), config);

        let submission = Submission::new(
            Language::C,
            "int solve(int *a) { while (1) {} return 0; }",
            serde_json::json!({
                "solve_params": [{"name": "a", "value": 1}],
                "expected": {"a": 1},
                "function_type": "int",
            }),
        )
        .with_limits(Limits {
            compile_timeout: Duration::from_secs(30),
            execution_timeout: Duration::from_secs(1),
        });

        println!("Submitting with continue_on_timeout=true (ceiling is 5x execution_timeout)...");
        match engine.submit(submission).await? {
            Verdict::RuntimeTimeout { timings } => {
                println!("Hit the hard ceiling; observed test_wall={:?}", timings.test);
            }
            other => println!("Verdict: {other:?}"),
        }
    }
    println!();

    // Example 5: batch size is bounded.
    println!("--- Test 5: Batch Size Limit ---");
    {
        let config = EngineConfig::builder().max_batch_size(2).build();
        let engine = BatchOptimizedEngine::new(Arc::clone(&driver), config);

        let configs = vec![
            serde_json::json!({"solve_params": [], "expected": {}, "function_type": "int"}),
            serde_json::json!({"solve_params": [], "expected": {}, "function_type": "int"}),
            serde_json::json!({"solve_params": [], "expected": {}, "function_type": "int"}),
        ];
        let result = engine
            .batch_optimized(Language::C, "int main(){}".to_string(), configs, Limits::default())
            .await;
        match result {
            Err(e) => println!("Rejected as expected: {e}"),
            Ok(_) => println!("Unexpectedly accepted an over-sized batch"),
        }
    }

    println!("\n=== Resource Limits Example Complete ===");
    Ok(())
}
