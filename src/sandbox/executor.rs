//! The compile→execute→collect pipelines: the single-submission
//! [`Engine`] and the compile-once [`BatchOptimizedEngine`].

use std::sync::Arc;
use std::time::{Duration, Instant};

#[cfg(feature = "tracing")]
use tracing::instrument;

use futures::future::join_all;
use tokio::sync::Semaphore;

use crate::error::{EngineError, ValidationError};
use crate::languages::Language;
use crate::sandbox::codec;
use crate::sandbox::config::{EngineConfig, CONTINUE_ON_TIMEOUT_CEILING_MULTIPLIER};
use crate::sandbox::driver::{ContainerRuntime, ExecOutcome, ResourceLimits, SandboxId};
use crate::sandbox::packer;
use crate::sandbox::validator;
use crate::submission::{Limits, Submission};
use crate::verdict::{BatchVerdict, Timings, Verdict};

/// A per-sandbox RAII guard that guarantees teardown even when the pipeline
/// exits early via `?` or panics.
///
/// The success path calls `teardown` explicitly and promptly; `Drop` is only
/// a backstop for paths the explicit call can't reach.
struct SandboxGuard {
    runtime: Arc<dyn ContainerRuntime>,
    id: SandboxId,
    grace: Duration,
    torn_down: bool,
}

impl SandboxGuard {
    fn new(runtime: Arc<dyn ContainerRuntime>, id: SandboxId, grace: Duration) -> Self {
        Self {
            runtime,
            id,
            grace,
            torn_down: false,
        }
    }

    async fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;
        self.runtime.teardown(&self.id, self.grace).await;
    }
}

impl Drop for SandboxGuard {
    fn drop(&mut self) {
        if self.torn_down {
            return;
        }
        let runtime = Arc::clone(&self.runtime);
        let id = self.id.clone();
        let grace = self.grace;
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                runtime.teardown(&id, grace).await;
            });
        }
    }
}

/// The single-submission execution engine: one [`crate::sandbox::driver::Sandbox`]
/// per submission, created and torn down around exactly one pipeline run.
pub struct Engine {
    runtime: Arc<dyn ContainerRuntime>,
    config: EngineConfig,
}

impl Engine {
    /// Build an engine over the given container runtime and configuration.
    pub fn new(runtime: Arc<dyn ContainerRuntime>, config: EngineConfig) -> Self {
        Self { runtime, config }
    }

    /// Run one submission through create→stage→compile→execute→collect→teardown.
    ///
    /// Returns `Err` only for pre-flight validation failures; every other
    /// failure mode is folded into a [`Verdict`] variant.
    #[cfg_attr(feature = "tracing", instrument(skip(self, submission), fields(language = %submission.language)))]
    pub async fn submit(&self, submission: Submission) -> Result<Verdict, ValidationError> {
        validator::validate_submission(&submission, &self.config)?;
        Ok(self.run_pipeline(submission).await)
    }

    /// Run many submissions concurrently through a bounded worker pool,
    /// preserving input order in the returned [`BatchVerdict`].
    pub async fn batch(&self, submissions: Vec<Submission>) -> BatchVerdict {
        let semaphore = Arc::new(Semaphore::new(self.config.worker_pool.max(1)));

        let futures = submissions.into_iter().map(|submission| {
            let semaphore = Arc::clone(&semaphore);
            async move {
                let _permit = semaphore.acquire().await.expect("semaphore not closed");
                match validator::validate_submission(&submission, &self.config) {
                    Ok(()) => self.run_pipeline(submission).await,
                    Err(e) => Verdict::internal_error(e.to_string(), Timings::default()),
                }
            }
        });

        let verdicts = join_all(futures).await;
        BatchVerdict::from_verdicts(verdicts)
    }

    async fn run_pipeline(&self, submission: Submission) -> Verdict {
        let start = Instant::now();
        let image = self.config.images.for_language(&submission.language).to_string();
        let limits = ResourceLimits {
            cpu: self.config.container_cpu,
            memory: self.config.container_mem.clone(),
        };

        let id = match self.runtime.create(&submission.language, &image, &limits).await {
            Ok(id) => id,
            Err(e) => return Verdict::internal_error(e.to_reason(), total_timings(start)),
        };

        let mut guard = SandboxGuard::new(Arc::clone(&self.runtime), id.clone(), Duration::from_secs(1));

        let verdict = self.drive_pipeline(&id, &submission, start).await;

        guard.teardown().await;
        verdict
    }

    async fn drive_pipeline(&self, id: &SandboxId, submission: &Submission, start: Instant) -> Verdict {
        let filename = submission.language.source_filename();
        let archive = match packer::pack_stage(&submission.user_code, filename, &submission.config) {
            Ok(bytes) => bytes,
            Err(e) => return Verdict::internal_error(e.to_reason(), total_timings(start)),
        };

        if let Err(e) = self.runtime.put_archive(id, "/app", archive).await {
            return Verdict::internal_error(e.to_reason(), total_timings(start));
        }

        let mut compile_wall = None;
        if submission.language.is_compiled() {
            let compile_timeout = clamp(submission.limits.compile_timeout, self.config.max_compile_timeout);
            let outcome = match self.exec_compile(id, compile_timeout).await {
                Ok(outcome) => outcome,
                Err(e) => return Verdict::internal_error(e.to_reason(), total_timings(start)),
            };
            compile_wall = Some(outcome.wall);

            if is_timeout(&outcome) || outcome.wall > compile_timeout {
                return Verdict::CompileTimeout {
                    timings: timings_with(start, compile_wall, None),
                };
            }
            if outcome.exit_code != Some(0) {
                return Verdict::CompileError {
                    compile_output: format!("{}{}", outcome.stdout, outcome.stderr),
                    timings: timings_with(start, compile_wall, None),
                };
            }
        }

        let execution_timeout = clamp(submission.limits.execution_timeout, self.config.max_execution_timeout);
        let outcome = match self.exec_test(id, execution_timeout).await {
            Ok(outcome) => outcome,
            Err(e) => return Verdict::internal_error(e.to_reason(), timings_with(start, compile_wall, None)),
        };

        if is_timeout(&outcome) || outcome.wall > execution_timeout {
            return Verdict::RuntimeTimeout {
                timings: timings_with(start, compile_wall, Some(outcome.wall)),
            };
        }

        let timings = timings_with(start, compile_wall, Some(outcome.wall));

        match self.collect(id).await {
            Ok(verdict_from_result) => verdict_from_result,
            Err(_) if outcome.exit_code == Some(0) => Verdict::internal_error("result.json missing after clean exit", timings),
            Err(_) => Verdict::RuntimeError {
                exit_code: outcome.exit_code,
                stderr: Some(outcome.stderr),
                timings,
            },
        }
        .with_timings(timings)
    }

    async fn exec_compile(&self, id: &SandboxId, compile_timeout: Duration) -> Result<ExecOutcome, EngineError> {
        exec_compile(self.runtime.as_ref(), id, compile_timeout).await
    }

    async fn exec_test(&self, id: &SandboxId, execution_timeout: Duration) -> Result<ExecOutcome, EngineError> {
        exec_test(self.runtime.as_ref(), id, execution_timeout, self.config.continue_on_timeout).await
    }

    async fn collect(&self, id: &SandboxId) -> Result<Verdict, EngineError> {
        collect(self.runtime.as_ref(), id).await
    }
}

/// The batch-optimized execution engine: one sandbox, one compile, many
/// tests against config variations staged in sequence.
pub struct BatchOptimizedEngine {
    runtime: Arc<dyn ContainerRuntime>,
    config: EngineConfig,
}

impl BatchOptimizedEngine {
    /// Build a batch-optimized engine over the given container runtime and configuration.
    pub fn new(runtime: Arc<dyn ContainerRuntime>, config: EngineConfig) -> Self {
        Self { runtime, config }
    }

    /// Compile `user_code` once and run it against every config in `configs`,
    /// in order, reusing the same sandbox throughout.
    #[cfg_attr(feature = "tracing", instrument(skip(self, user_code, configs), fields(language = %language, tests = configs.len())))]
    pub async fn batch_optimized(
        &self,
        language: Language,
        user_code: String,
        configs: Vec<serde_json::Value>,
        limits: Limits,
    ) -> Result<BatchVerdict, ValidationError> {
        validator::validate_batch(&language, &user_code, &configs, &self.config)?;

        let start = Instant::now();
        let image = self.config.images.for_language(&language).to_string();
        let resource_limits = ResourceLimits {
            cpu: self.config.container_cpu,
            memory: self.config.container_mem.clone(),
        };

        let id = match self.runtime.create(&language, &image, &resource_limits).await {
            Ok(id) => id,
            Err(e) => {
                let verdict = Verdict::internal_error(e.to_reason(), total_timings(start));
                return Ok(BatchVerdict::from_verdicts(vec![verdict; configs.len().max(1)]));
            }
        };

        let mut guard = SandboxGuard::new(Arc::clone(&self.runtime), id.clone(), Duration::from_secs(1));

        let verdicts = self.drive_batch(&id, &language, &user_code, &configs, &limits, start).await;

        guard.teardown().await;
        Ok(BatchVerdict::from_verdicts(verdicts))
    }

    async fn drive_batch(
        &self,
        id: &SandboxId,
        language: &Language,
        user_code: &str,
        configs: &[serde_json::Value],
        limits: &Limits,
        start: Instant,
    ) -> Vec<Verdict> {
        let filename = language.source_filename();
        let archive = match packer::pack_user_only(user_code, filename) {
            Ok(bytes) => bytes,
            Err(e) => {
                let verdict = Verdict::internal_error(e.to_reason(), total_timings(start));
                return vec![verdict; configs.len()];
            }
        };

        if let Err(e) = self.runtime.put_archive(id, "/app", archive).await {
            let verdict = Verdict::internal_error(e.to_reason(), total_timings(start));
            return vec![verdict; configs.len()];
        }

        let mut compile_wall = None;
        if language.is_compiled() {
            let compile_timeout = clamp(limits.compile_timeout, self.config.max_compile_timeout);
            let outcome = match self.exec_compile(id, compile_timeout).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    let verdict = Verdict::internal_error(e.to_reason(), total_timings(start));
                    return vec![verdict; configs.len()];
                }
            };
            compile_wall = Some(outcome.wall);

            if is_timeout(&outcome) || outcome.wall > compile_timeout {
                let verdict = Verdict::CompileTimeout {
                    timings: timings_with(start, compile_wall, None),
                };
                return vec![verdict; configs.len()];
            }
            if outcome.exit_code != Some(0) {
                let verdict = Verdict::CompileError {
                    compile_output: format!("{}{}", outcome.stdout, outcome.stderr),
                    timings: timings_with(start, compile_wall, None),
                };
                return vec![verdict; configs.len()];
            }
        }

        let mut verdicts = Vec::with_capacity(configs.len());
        for config in configs {
            let verdict = self.run_one_test(id, config, limits, compile_wall, start).await;
            verdicts.push(verdict);
        }
        verdicts
    }

    async fn run_one_test(
        &self,
        id: &SandboxId,
        config: &serde_json::Value,
        limits: &Limits,
        compile_wall: Option<Duration>,
        start: Instant,
    ) -> Verdict {
        let archive = match packer::pack_config_only(config) {
            Ok(bytes) => bytes,
            Err(e) => return Verdict::internal_error(e.to_reason(), timings_with(start, compile_wall, None)),
        };

        if let Err(e) = self.runtime.put_archive(id, "/app", archive).await {
            return Verdict::internal_error(e.to_reason(), timings_with(start, compile_wall, None));
        }

        let execution_timeout = clamp(limits.execution_timeout, self.config.max_execution_timeout);
        let outcome = match self.exec_test(id, execution_timeout).await {
            Ok(outcome) => outcome,
            Err(e) => return Verdict::internal_error(e.to_reason(), timings_with(start, compile_wall, None)),
        };

        if is_timeout(&outcome) || outcome.wall > execution_timeout {
            return Verdict::RuntimeTimeout {
                timings: timings_with(start, compile_wall, Some(outcome.wall)),
            };
        }

        let timings = timings_with(start, compile_wall, Some(outcome.wall));

        match self.collect(id).await {
            Ok(verdict_from_result) => verdict_from_result.with_timings(timings),
            Err(_) if outcome.exit_code == Some(0) => {
                Verdict::internal_error("result.json missing after clean exit", timings)
            }
            Err(_) => Verdict::RuntimeError {
                exit_code: outcome.exit_code,
                stderr: Some(outcome.stderr),
                timings,
            },
        }
    }

    async fn exec_compile(&self, id: &SandboxId, compile_timeout: Duration) -> Result<ExecOutcome, EngineError> {
        exec_compile(self.runtime.as_ref(), id, compile_timeout).await
    }

    async fn exec_test(&self, id: &SandboxId, execution_timeout: Duration) -> Result<ExecOutcome, EngineError> {
        exec_test(self.runtime.as_ref(), id, execution_timeout, self.config.continue_on_timeout).await
    }

    async fn collect(&self, id: &SandboxId) -> Result<Verdict, EngineError> {
        collect(self.runtime.as_ref(), id).await
    }
}

async fn exec_compile(
    runtime: &dyn ContainerRuntime,
    id: &SandboxId,
    compile_timeout: Duration,
) -> Result<ExecOutcome, EngineError> {
    let secs = compile_timeout.as_secs().max(1);
    let script = format!("timeout {secs} bash -c 'make clean && make build'");
    let driver_deadline = compile_timeout + Duration::from_secs(2);
    runtime.exec(id, &["bash", "-c", script.as_str()], "/app", driver_deadline).await
}

async fn exec_test(
    runtime: &dyn ContainerRuntime,
    id: &SandboxId,
    execution_timeout: Duration,
    continue_on_timeout: bool,
) -> Result<ExecOutcome, EngineError> {
    if continue_on_timeout {
        let ceiling = execution_timeout * CONTINUE_ON_TIMEOUT_CEILING_MULTIPLIER;
        runtime.exec(id, &["bash", "-c", "make test"], "/app", ceiling).await
    } else {
        let secs = execution_timeout.as_secs().max(1);
        let script = format!("timeout {secs} bash -c 'make test'");
        let driver_deadline = execution_timeout + Duration::from_secs(2);
        runtime.exec(id, &["bash", "-c", script.as_str()], "/app", driver_deadline).await
    }
}

async fn collect(runtime: &dyn ContainerRuntime, id: &SandboxId) -> Result<Verdict, EngineError> {
    let archive = runtime.get_archive(id, "/app/result.json").await?;
    let raw = packer::extract_result(&archive)?;
    codec::decode(&raw, Timings::default()).map_err(EngineError::Codec)
}

fn is_timeout(outcome: &ExecOutcome) -> bool {
    outcome.timed_out || outcome.exit_code == Some(124)
}

fn clamp(requested: Duration, maximum: Duration) -> Duration {
    requested.min(maximum)
}

fn total_timings(start: Instant) -> Timings {
    Timings {
        total: start.elapsed(),
        compile: None,
        test: None,
    }
}

fn timings_with(start: Instant, compile: Option<Duration>, test: Option<Duration>) -> Timings {
    Timings {
        total: start.elapsed(),
        compile,
        test,
    }
}

impl Verdict {
    fn with_timings(self, timings: Timings) -> Verdict {
        match self {
            Verdict::Success { matched, actual, expected, stdout, stderr, .. } => Verdict::Success {
                matched,
                actual,
                expected,
                stdout,
                stderr,
                timings,
            },
            Verdict::CompileError { compile_output, .. } => Verdict::CompileError { compile_output, timings },
            Verdict::CompileTimeout { .. } => Verdict::CompileTimeout { timings },
            Verdict::RuntimeTimeout { .. } => Verdict::RuntimeTimeout { timings },
            Verdict::RuntimeError { exit_code, stderr, .. } => Verdict::RuntimeError { exit_code, stderr, timings },
            Verdict::InternalError { reason, .. } => Verdict::InternalError { reason, timings },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// A fault-injectable fake [`ContainerRuntime`] for exercising the
    /// pipelines without a Docker daemon.
    struct FakeRuntime {
        result_json: Mutex<Vec<u8>>,
        compile_exit: i64,
        test_exit: i64,
        test_timed_out: bool,
        teardown_calls: AtomicUsize,
        create_fails: bool,
    }

    impl FakeRuntime {
        fn success(result_json: &str) -> Self {
            Self {
                result_json: Mutex::new(result_json.as_bytes().to_vec()),
                compile_exit: 0,
                test_exit: 0,
                test_timed_out: false,
                teardown_calls: AtomicUsize::new(0),
                create_fails: false,
            }
        }
    }

    #[async_trait]
    impl ContainerRuntime for FakeRuntime {
        async fn create(&self, _language: &Language, _image: &str, _limits: &ResourceLimits) -> Result<SandboxId, EngineError> {
            if self.create_fails {
                return Err(EngineError::RuntimeUnavailable(anyhow::anyhow!("no daemon")));
            }
            Ok(SandboxId::new())
        }

        async fn put_archive(&self, _id: &SandboxId, _path: &str, _tar_bytes: Vec<u8>) -> Result<(), EngineError> {
            Ok(())
        }

        async fn exec(&self, _id: &SandboxId, argv: &[&str], _workdir: &str, _deadline: Duration) -> Result<ExecOutcome, EngineError> {
            let is_compile = argv.iter().any(|a| a.contains("make build"));
            if is_compile {
                Ok(ExecOutcome {
                    exit_code: Some(self.compile_exit),
                    stdout: String::new(),
                    stderr: if self.compile_exit != 0 { "compile error".into() } else { String::new() },
                    wall: Duration::from_millis(10),
                    timed_out: false,
                })
            } else {
                Ok(ExecOutcome {
                    exit_code: if self.test_timed_out { None } else { Some(self.test_exit) },
                    stdout: String::new(),
                    stderr: String::new(),
                    wall: Duration::from_millis(10),
                    timed_out: self.test_timed_out,
                })
            }
        }

        async fn get_archive(&self, _id: &SandboxId, _path: &str) -> Result<Vec<u8>, EngineError> {
            let json = self.result_json.lock().unwrap().clone();
            let mut builder = tar::Builder::new(Vec::new());
            let mut header = tar::Header::new_gnu();
            header.set_path("result.json").unwrap();
            header.set_size(json.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append(&header, json.as_slice()).unwrap();
            Ok(builder.into_inner().unwrap())
        }

        async fn teardown(&self, _id: &SandboxId, _grace: Duration) {
            self.teardown_calls.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn valid_config() -> serde_json::Value {
        serde_json::json!({
            "solve_params": [{"name": "a", "value": 3}],
            "expected": {"a": 6},
            "function_type": "int",
        })
    }

    #[tokio::test]
    async fn submit_success_tears_down_sandbox() {
        let runtime = Arc::new(FakeRuntime::success(r#"{"status":"success","match":true,"actual":{"a":6},"expected":{"a":6}}"#));
        let engine = Engine::new(runtime.clone(), EngineConfig::default());

        let submission = Submission::new(Language::C, "int main(){}", valid_config());
        let verdict = engine.submit(submission).await.unwrap();

        assert!(verdict.is_accepted());
        assert_eq!(runtime.teardown_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn submit_rejects_invalid_submission_before_creating_sandbox() {
        let runtime = Arc::new(FakeRuntime::success(r#"{"status":"success"}"#));
        let engine = Engine::new(runtime.clone(), EngineConfig::default());

        let submission = Submission::new(Language::C, "", valid_config());
        let result = engine.submit(submission).await;

        assert!(matches!(result, Err(ValidationError::EmptyCode)));
        assert_eq!(runtime.teardown_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn compile_failure_yields_compile_error() {
        let mut runtime = FakeRuntime::success(r#"{"status":"success"}"#);
        runtime.compile_exit = 1;
        let runtime = Arc::new(runtime);
        let engine = Engine::new(runtime.clone(), EngineConfig::default());

        let submission = Submission::new(Language::C, "int main(", valid_config());
        let verdict = engine.submit(submission).await.unwrap();

        assert!(matches!(verdict, Verdict::CompileError { .. }));
        assert_eq!(runtime.teardown_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn runtime_timeout_is_classified_correctly() {
        let mut runtime = FakeRuntime::success(r#"{"status":"success"}"#);
        runtime.test_timed_out = true;
        let runtime = Arc::new(runtime);
        let engine = Engine::new(runtime, EngineConfig::default());

        let submission = Submission::new(Language::C, "while(1){}", valid_config());
        let verdict = engine.submit(submission).await.unwrap();

        assert!(verdict.is_timeout());
        assert!(matches!(verdict, Verdict::RuntimeTimeout { .. }));
    }

    #[tokio::test]
    async fn batch_preserves_order() {
        let runtime = Arc::new(FakeRuntime::success(r#"{"status":"success","match":true}"#));
        let engine = Engine::new(runtime, EngineConfig::default());

        let submissions = vec![
            Submission::new(Language::C, "int main(){}", valid_config()),
            Submission::new(Language::C, "", valid_config()),
            Submission::new(Language::C, "int main(){}", valid_config()),
        ];

        let batch = engine.batch(submissions).await;
        assert_eq!(batch.verdicts.len(), 3);
        assert!(batch.verdicts[0].is_accepted());
        assert!(matches!(batch.verdicts[1], Verdict::InternalError { .. }));
        assert!(batch.verdicts[2].is_accepted());
    }

    #[tokio::test]
    async fn batch_optimized_fans_out_compile_failure_to_every_test() {
        let mut runtime = FakeRuntime::success(r#"{"status":"success"}"#);
        runtime.compile_exit = 1;
        let runtime = Arc::new(runtime);
        let engine = BatchOptimizedEngine::new(runtime, EngineConfig::default());

        let configs = vec![valid_config(), valid_config(), valid_config()];
        let batch = engine
            .batch_optimized(Language::C, "int main(".to_string(), configs, Limits::default())
            .await
            .unwrap();

        assert_eq!(batch.verdicts.len(), 3);
        assert!(batch
            .verdicts
            .iter()
            .all(|v| matches!(v, Verdict::CompileError { .. })));
    }

    #[tokio::test]
    async fn batch_optimized_runs_every_config_in_order() {
        let runtime = Arc::new(FakeRuntime::success(r#"{"status":"success","match":true}"#));
        let engine = BatchOptimizedEngine::new(runtime, EngineConfig::default());

        let configs = vec![valid_config(), valid_config()];
        let batch = engine
            .batch_optimized(Language::C, "int main(){}".to_string(), configs, Limits::default())
            .await
            .unwrap();

        assert_eq!(batch.verdicts.len(), 2);
        assert!(batch.verdicts.iter().all(|v| v.is_accepted()));
    }

    #[tokio::test]
    async fn batch_optimized_rejects_oversized_batch_before_creating_sandbox() {
        let runtime = Arc::new(FakeRuntime::success(r#"{"status":"success"}"#));
        let config = EngineConfig::builder().max_batch_size(1).build();
        let engine = BatchOptimizedEngine::new(runtime.clone(), config);

        let configs = vec![valid_config(), valid_config()];
        let result = engine
            .batch_optimized(Language::C, "int main(){}".to_string(), configs, Limits::default())
            .await;

        assert!(matches!(result, Err(ValidationError::BatchTooLarge { .. })));
        assert_eq!(runtime.teardown_calls.load(Ordering::SeqCst), 0);
    }
}
