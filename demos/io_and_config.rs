//! Example demonstrating engine configuration: environment loading, custom
//! timeouts, a stricter denylist, and pinning a specific Python runner image.
//!
//! Run with: cargo run --example io_and_config
//!
//! Note: requires a reachable Docker daemon. Only the final section
//! actually submits code; the rest inspects configuration in isolation.

use std::sync::Arc;
use std::time::Duration;

use judge_sandbox_rs::prelude::*;

fn main() -> anyhow::Result<()> {
    println!("=== Configuration Example ===\n");

    // Example 1: defaults.
    println!("--- Defaults ---");
    let config = EngineConfig::default();
    println!(
        "cpu={} mem={} compile_timeout={:?} execution_timeout={:?} worker_pool={}",
        config.container_cpu, config.container_mem, config.compile_timeout, config.container_timeout, config.worker_pool
    );
    println!();

    // Example 2: loading from the environment (CONTAINER_CPU, CONTAINER_MEM,
    // CONTAINER_TIMEOUT, COMPILE_TIMEOUT, CONTINUE_ON_TIMEOUT, WORKER_POOL).
    println!("--- From environment ---");
    std::env::set_var("WORKER_POOL", "8");
    std::env::set_var("CONTINUE_ON_TIMEOUT", "true");
    let config = EngineConfig::from_env();
    println!("worker_pool={} continue_on_timeout={}", config.worker_pool, config.continue_on_timeout);
    std::env::remove_var("WORKER_POOL");
    std::env::remove_var("CONTINUE_ON_TIMEOUT");
    println!();

    // Example 3: a stricter denylist on top of the built-in one.
    println!("--- Custom denylist ---");
    let mut denylist = judge_sandbox_rs::sandbox::validator::default_denylist();
    denylist.push("fork(".to_string());
    denylist.push("ptrace(".to_string());
    let config = EngineConfig::builder().denylist(denylist).build();
    println!("denylist entries: {}", config.denylist.len());
    println!();

    // Example 4: pinning a specific Python runner image by version tag.
    println!("--- Pinned Python versions ---");
    let images = LanguageImages::default()
        .with_python_version("3.9", "tsukisama9292/judger-runner:python-3.9")
        .with_python_version("3.11", "tsukisama9292/judger-runner:python-3.11");
    println!(
        "python (default) -> {}",
        images.for_language(&Language::Python(None))
    );
    println!(
        "python-3.11      -> {}",
        images.for_language(&Language::Python(Some("3.11".to_string())))
    );
    println!(
        "python-3.5        -> {} (unpinned, falls back to default)",
        images.for_language(&Language::Python(Some("3.5".to_string())))
    );
    println!();

    // Example 5: a submission built with these settings.
    println!("--- Submitting with custom timeouts ---");
    let engine_config = EngineConfig::builder()
        .compile_timeout(Duration::from_secs(10))
        .container_timeout(Duration::from_secs(5))
        .images(images)
        .build();

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        let shared = match SharedRuntime::connect() {
            Ok(s) => s,
            Err(e) => {
                println!("(skipping live submission: {e})");
                return;
            }
        };
        let driver: Arc<dyn ContainerRuntime> = Arc::new(BollardRuntime::new(shared));
        let engine = Engine::new(driver, engine_config);

        let submission = Submission::new(
            Language::C,
            "int solve(int *a) { *a = *a * 2; return 0; }",
            serde_json::json!({
                "solve_params": [{"name": "a", "value": 21}],
                "expected": {"a": 42},
                "function_type": "int",
            }),
        );
        match engine.submit(submission).await {
            Ok(verdict) => println!("verdict: {verdict:?}"),
            Err(e) => println!("rejected: {e}"),
        }
    });

    println!("\n=== Configuration Example Complete ===");
    Ok(())
}
