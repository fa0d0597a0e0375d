//! # Judge Sandbox
//!
//! A container-sandboxed compile-and-execute engine for an online judge.
//!
//! This crate drives the compile→execute→collect pipeline for a single
//! submission, or a compile-once batch of them, inside a disposable,
//! resource-constrained Docker container. It never interprets user code
//! itself, isolation comes entirely from the container boundary (no
//! network, no privileges, capped CPU/memory), and the engine's job is to
//! stage the submission in, drive a fixed `make build`/`make test` harness,
//! collect its `result.json`, and guarantee the container is torn down on
//! every exit path, including faults injected mid-pipeline.
//!
//! - **Isolation**: the container runtime (`bollard`), not this crate's
//!   process, is the security boundary. `network_mode: none`,
//!   `cap_drop: ALL`, `no-new-privileges`, and a cpu/memory cap are applied
//!   to every sandbox at creation (see [`sandbox::driver`]).
//! - **Timeout discrimination**: compile and runtime timeouts are never
//!   conflated, enforced both by the in-container `timeout` utility and the
//!   engine's own wall-clock observation (see [`sandbox::executor`]).
//! - **Teardown guarantee**: every sandbox created by [`Engine`] or
//!   [`BatchOptimizedEngine`] is torn down before control returns to the
//!   caller, via an RAII guard that backstops the explicit teardown call
//!   even on an early `?` return or a panic.
//!
//! ## Example
//!
//! ```rust,ignore
//! use judge_sandbox_rs::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let runtime = SharedRuntime::connect()?;
//!     let driver: Arc<dyn ContainerRuntime> = Arc::new(BollardRuntime::new(runtime));
//!     let facade = Facade::from_env(driver);
//!
//!     let submission = Submission::new(
//!         Language::C,
//!         "int solve(int *a, int *b) { *a = *a * 2; *b = *b * 2 + 1; return 0; }",
//!         serde_json::json!({
//!             "solve_params": [{"name": "a", "value": 3}, {"name": "b", "value": 4}],
//!             "expected": {"a": 6, "b": 9},
//!             "function_type": "int",
//!         }),
//!     );
//!
//!     let verdict = facade.submit(submission).await?;
//!     assert!(verdict.is_accepted());
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod facade;
pub mod languages;
pub mod prelude;
pub mod sandbox;
pub mod submission;
pub mod verdict;

// Re-export main types at crate root for convenience.
pub use error::{EngineError, Result, ValidationError};
pub use facade::Facade;
pub use languages::Language;
pub use sandbox::config::{EngineConfig, EngineConfigBuilder, LanguageImages};
pub use sandbox::driver::{BollardRuntime, ContainerRuntime};
pub use sandbox::executor::{BatchOptimizedEngine, Engine};
pub use sandbox::runtime::SharedRuntime;
pub use submission::{Limits, Submission};
pub use verdict::{BatchStats, BatchVerdict, Timings, Verdict};
