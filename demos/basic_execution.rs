//! Basic example of submitting a single C solution to the sandbox.
//!
//! Run with: cargo run --example basic_execution
//!
//! Note: requires a reachable Docker daemon and the `tsukisama9292/judger-runner:c` image.

use std::sync::Arc;

use judge_sandbox_rs::prelude::*;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    println!("Connecting to the container runtime...");
    let shared = match SharedRuntime::connect() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Failed to connect to the container runtime: {}", e);
            eprintln!("Make sure a Docker daemon is reachable at the platform default socket.");
            return Err(e.into());
        }
    };

    let driver: Arc<dyn ContainerRuntime> = Arc::new(BollardRuntime::new(shared));
    let engine = Engine::new(driver, EngineConfig::default());

    // Example 1: a matching solution.
    println!("\n=== Test 1: matching solution ===");
    let code = "int solve(int *a, int *b) { *a = *a * 2; *b = *b * 2 + 1; return 0; }";
    let config = serde_json::json!({
        "solve_params": [{"name": "a", "value": 3}, {"name": "b", "value": 4}],
        "expected": {"a": 6, "b": 9},
        "function_type": "int",
    });
    let submission = Submission::new(Language::C, code, config);
    print_verdict(engine.submit(submission).await?);

    // Example 2: a mismatched solution (compiles and runs, but the wrong answer).
    println!("\n=== Test 2: mismatched solution ===");
    let wrong_code = "int solve(int *a, int *b) { *a = *a + 1; *b = *b + 1; return 0; }";
    let config = serde_json::json!({
        "solve_params": [{"name": "a", "value": 3}, {"name": "b", "value": 4}],
        "expected": {"a": 6, "b": 9},
        "function_type": "int",
    });
    let submission = Submission::new(Language::C, wrong_code, config);
    print_verdict(engine.submit(submission).await?);

    // Example 3: a compile error (missing semicolon).
    println!("\n=== Test 3: compile error ===");
    let broken_code = "int solve(int *a, int *b) { *a = *a * 2 *b = *b * 2 + 1; return 0; }";
    let config = serde_json::json!({
        "solve_params": [{"name": "a", "value": 3}, {"name": "b", "value": 4}],
        "expected": {"a": 6, "b": 9},
        "function_type": "int",
    });
    let submission = Submission::new(Language::C, broken_code, config);
    print_verdict(engine.submit(submission).await?);

    Ok(())
}

fn print_verdict(verdict: Verdict) {
    match verdict {
        Verdict::Success { matched, actual, expected, timings, .. } => {
            println!("match={matched} actual={actual} expected={expected}");
            println!("timings: {:?}", timings);
        }
        Verdict::CompileError { compile_output, .. } => {
            println!("compile error:\n{compile_output}");
        }
        other => println!("verdict: {other:?}"),
    }
}
