//! Example demonstrating how the engine classifies outcomes.
//!
//! This example shows how to distinguish:
//! - A pre-flight `InvalidRequest` (code never reaches a sandbox)
//! - A compile error
//! - A runtime timeout
//! - A mismatched-but-successful run
//! - An engine-internal failure
//!
//! Run with: cargo run --example error_handling
//!
//! Note: requires a reachable Docker daemon and the `tsukisama9292/judger-runner:c` image.

use std::sync::Arc;
use std::time::Duration;

use judge_sandbox_rs::prelude::*;

async fn classify(engine: &Engine, submission: Submission) -> String {
    match engine.submit(submission).await {
        Err(e) => format!("InvalidRequest: {e}"),
        Ok(Verdict::Success { matched: true, .. }) => "Success (match)".to_string(),
        Ok(Verdict::Success { matched: false, .. }) => "Success (mismatch)".to_string(),
        Ok(Verdict::CompileError { .. }) => "CompileError".to_string(),
        Ok(Verdict::CompileTimeout { .. }) => "CompileTimeout".to_string(),
        Ok(Verdict::RuntimeTimeout { .. }) => "RuntimeTimeout".to_string(),
        Ok(Verdict::RuntimeError { exit_code, .. }) => format!("RuntimeError(exit={exit_code:?})"),
        Ok(Verdict::InternalError { reason, .. }) => format!("InternalError: {reason}"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    println!("=== Error Classification Example ===\n");

    let shared = SharedRuntime::connect()?;
    let driver: Arc<dyn ContainerRuntime> = Arc::new(BollardRuntime::new(shared));
    let engine = Engine::new(driver, EngineConfig::default());

    let base_config = serde_json::json!({
        "solve_params": [{"name": "a", "value": 3}],
        "expected": {"a": 6},
        "function_type": "int",
    });

    let cases: Vec<(&str, Submission)> = vec![
        (
            "empty code",
            Submission::new(Language::C, "", base_config.clone()),
        ),
        (
            "denylisted code",
            Submission::new(
                Language::C,
                "int main(){ system(\"rm -rf /\"); return 0; }",
                base_config.clone(),
            ),
        ),
        (
            "missing semicolon",
            Submission::new(
                Language::C,
                "int solve(int *a) { *a = *a * 2 return 0; }",
                base_config.clone(),
            ),
        ),
        (
            "infinite loop at runtime",
            Submission::new(
                Language::C,
                "int solve(int *a) { while (1) {} return 0; }",
                base_config.clone(),
            )
            .with_limits(Limits {
                compile_timeout: Duration::from_secs(30),
                execution_timeout: Duration::from_secs(1),
            }),
        ),
        (
            "matching solution",
            Submission::new(
                Language::C,
                "int solve(int *a) { *a = *a * 2; return 0; }",
                base_config.clone(),
            ),
        ),
        (
            "wrong answer",
            Submission::new(
                Language::C,
                "int solve(int *a) { *a = *a + 1; return 0; }",
                base_config,
            ),
        ),
    ];

    for (label, submission) in cases {
        let classification = classify(&engine, submission).await;
        println!("{label}: {classification}");
    }

    println!("\n=== Error Classification Complete ===");
    Ok(())
}
