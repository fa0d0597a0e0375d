//! The engine's single public entry point.
//!
//! A [`Facade`] is built once, during process bootstrap, from a
//! [`ContainerRuntime`] and an [`EngineConfig`], and handed to callers as
//! `Arc<Facade>`; nothing else in the crate reaches for global state.

use std::sync::Arc;

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::error::ValidationError;
use crate::languages::Language;
use crate::sandbox::config::EngineConfig;
use crate::sandbox::driver::ContainerRuntime;
use crate::sandbox::executor::{BatchOptimizedEngine, Engine};
use crate::submission::{Limits, Submission};
use crate::verdict::{BatchVerdict, Verdict};

/// The process-wide entry point for submitting code to the sandbox.
///
/// Dispatches `submit`/`batch`/`batch_optimized` to the single and
/// batch-optimized engines, applying the configured defaults and
/// concurrency policy. Holds no mutable state of its own beyond the two
/// engines it wraps, both of which share the same `Arc<dyn ContainerRuntime>`,
/// the only cross-submission shared resource.
pub struct Facade {
    single: Engine,
    batch_optimized: BatchOptimizedEngine,
}

impl Facade {
    /// Build the facade over a container runtime and configuration. Intended
    /// to be called exactly once, during process bootstrap, and shared from
    /// there on as `Arc<Facade>`.
    pub fn new(runtime: Arc<dyn ContainerRuntime>, config: EngineConfig) -> Self {
        Self {
            single: Engine::new(Arc::clone(&runtime), config.clone()),
            batch_optimized: BatchOptimizedEngine::new(runtime, config),
        }
    }

    /// Build the facade with configuration loaded from the environment.
    pub fn from_env(runtime: Arc<dyn ContainerRuntime>) -> Self {
        Self::new(runtime, EngineConfig::from_env())
    }

    /// Run one submission to completion.
    ///
    /// Returns `Err` only for a pre-flight validation failure (never
    /// surfaced as a [`Verdict`]); every other outcome is a `Verdict`.
    #[cfg_attr(feature = "tracing", instrument(skip(self, submission), fields(language = %submission.language)))]
    pub async fn submit(&self, submission: Submission) -> Result<Verdict, ValidationError> {
        self.single.submit(submission).await
    }

    /// Run many independent submissions concurrently, through the bounded
    /// worker pool, preserving input order in the result.
    pub async fn batch(&self, submissions: Vec<Submission>) -> BatchVerdict {
        self.single.batch(submissions).await
    }

    /// Compile `user_code` once and run it against every config in
    /// `configs`, reusing one sandbox for the whole batch.
    pub async fn batch_optimized(
        &self,
        language: Language,
        user_code: String,
        configs: Vec<serde_json::Value>,
        limits: Limits,
    ) -> Result<BatchVerdict, ValidationError> {
        self.batch_optimized
            .batch_optimized(language, user_code, configs, limits)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sandbox::driver::{ExecOutcome, ResourceLimits, SandboxId};
    use async_trait::async_trait;
    use std::time::Duration;

    struct FakeRuntime;

    #[async_trait]
    impl ContainerRuntime for FakeRuntime {
        async fn create(
            &self,
            _language: &Language,
            _image: &str,
            _limits: &ResourceLimits,
        ) -> crate::error::Result<SandboxId> {
            Ok(SandboxId::new())
        }

        async fn put_archive(&self, _id: &SandboxId, _path: &str, _tar_bytes: Vec<u8>) -> crate::error::Result<()> {
            Ok(())
        }

        async fn exec(
            &self,
            _id: &SandboxId,
            argv: &[&str],
            _workdir: &str,
            _deadline: Duration,
        ) -> crate::error::Result<ExecOutcome> {
            let _ = argv;
            Ok(ExecOutcome {
                exit_code: Some(0),
                stdout: String::new(),
                stderr: String::new(),
                wall: Duration::from_millis(5),
                timed_out: false,
            })
        }

        async fn get_archive(&self, _id: &SandboxId, _path: &str) -> crate::error::Result<Vec<u8>> {
            let mut builder = tar::Builder::new(Vec::new());
            let body = br#"{"status":"success","match":true,"actual":1,"expected":1}"#;
            let mut header = tar::Header::new_gnu();
            header.set_path("result.json").unwrap();
            header.set_size(body.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append(&header, &body[..]).unwrap();
            Ok(builder.into_inner().unwrap())
        }

        async fn teardown(&self, _id: &SandboxId, _grace: Duration) {}
    }

    fn valid_config() -> serde_json::Value {
        serde_json::json!({
            "solve_params": [{"name": "a", "value": 1}],
            "expected": 1,
            "function_type": "int",
        })
    }

    #[tokio::test]
    async fn facade_dispatches_submit() {
        let facade = Facade::new(Arc::new(FakeRuntime), EngineConfig::default());
        let submission = Submission::new(Language::C, "int main(){}", valid_config());
        let verdict = facade.submit(submission).await.unwrap();
        assert!(verdict.is_accepted());
    }

    #[tokio::test]
    async fn facade_dispatches_batch_optimized() {
        let facade = Facade::new(Arc::new(FakeRuntime), EngineConfig::default());
        let configs = vec![valid_config(), valid_config()];
        let batch = facade
            .batch_optimized(Language::C, "int main(){}".to_string(), configs, Limits::default())
            .await
            .unwrap();
        assert_eq!(batch.verdicts.len(), 2);
        assert!(batch.verdicts.iter().all(|v| v.is_accepted()));
    }
}
