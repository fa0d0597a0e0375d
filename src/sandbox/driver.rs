//! Thin, typed facade over the container runtime.
//!
//! [`ContainerRuntime`] is the seam the execution engines build on; the
//! production implementation ([`BollardRuntime`]) wraps a [`bollard::Docker`]
//! client, but tests exercise the engines against a fake implementation with
//! no daemon required.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use bollard::container::{
    Config as ContainerConfig, CreateContainerOptions, RemoveContainerOptions,
    StartContainerOptions, StopContainerOptions,
};
use bollard::errors::Error as BollardError;
use bollard::exec::{CreateExecOptions, StartExecOptions, StartExecResults};
use bollard::models::HostConfig;
use bollard::Docker;
use tokio_stream::StreamExt;
use uuid::Uuid;

#[cfg(feature = "tracing")]
use tracing::{debug, instrument, warn};

use crate::error::{EngineError, Result};
use crate::languages::Language;
use crate::sandbox::runtime::SharedRuntime;

/// Opaque identity of a running sandbox container.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SandboxId(String);

impl SandboxId {
    /// Generate a fresh, process-unique sandbox identity.
    pub fn new() -> Self {
        Self(format!("judge-sandbox-{}", Uuid::new_v4()))
    }

    /// The container name this id resolves to.
    pub fn container_name(&self) -> &str {
        &self.0
    }
}

impl Default for SandboxId {
    fn default() -> Self {
        Self::new()
    }
}

/// Resource caps applied when creating a sandbox container.
#[derive(Debug, Clone)]
pub struct ResourceLimits {
    /// Fractional CPU share (1.0 == one core).
    pub cpu: f64,
    /// Docker-style memory cap string, e.g. `"128m"`.
    pub memory: String,
}

/// The outcome of one `exec` call inside a sandbox.
#[derive(Debug, Clone)]
pub struct ExecOutcome {
    /// Process exit code, when the exec completed before its deadline.
    pub exit_code: Option<i64>,
    /// Captured stdout.
    pub stdout: String,
    /// Captured stderr.
    pub stderr: String,
    /// Wall-clock time the engine observed this exec taking.
    pub wall: Duration,
    /// Whether the engine's own deadline expired before the exec finished.
    pub timed_out: bool,
}

/// Async seam over the container runtime, implemented by [`BollardRuntime`]
/// in production and by a fault-injectable fake in tests, so teardown
/// guarantees can be exercised against a create/exec failure without a
/// container daemon.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Create and start a sandbox running `image` under the given limits.
    async fn create(&self, language: &Language, image: &str, limits: &ResourceLimits) -> Result<SandboxId>;

    /// Upload an in-memory tar archive to `path` inside the sandbox.
    async fn put_archive(&self, id: &SandboxId, path: &str, tar_bytes: Vec<u8>) -> Result<()>;

    /// Run `argv` inside the sandbox with a working directory, bounded by
    /// `deadline`. Both an in-container `timeout` wrapper (if present in
    /// `argv`) and this engine-observed deadline independently bound the call.
    async fn exec(&self, id: &SandboxId, argv: &[&str], workdir: &str, deadline: Duration) -> Result<ExecOutcome>;

    /// Download the tar archive containing `path` from the sandbox.
    async fn get_archive(&self, id: &SandboxId, path: &str) -> Result<Vec<u8>>;

    /// Stop and remove the sandbox. Idempotent: removing an already-gone
    /// container is not an error.
    async fn teardown(&self, id: &SandboxId, grace: Duration);
}

/// Production [`ContainerRuntime`] backed by `bollard`.
#[derive(Clone)]
pub struct BollardRuntime {
    runtime: SharedRuntime,
}

impl BollardRuntime {
    /// Wrap a [`SharedRuntime`] handle as a [`ContainerRuntime`].
    pub fn new(runtime: SharedRuntime) -> Self {
        Self { runtime }
    }

    fn docker(&self) -> &Docker {
        self.runtime.docker()
    }
}

#[async_trait]
impl ContainerRuntime for BollardRuntime {
    #[cfg_attr(feature = "tracing", instrument(skip(self, limits), fields(image)))]
    async fn create(&self, _language: &Language, image: &str, limits: &ResourceLimits) -> Result<SandboxId> {
        let id = SandboxId::new();

        let host_config = HostConfig {
            memory: Some(parse_memory_limit(&limits.memory)),
            cpu_period: Some(100_000),
            cpu_quota: Some((limits.cpu * 100_000.0) as i64),
            network_mode: Some("none".to_string()),
            readonly_rootfs: Some(false),
            cap_drop: Some(vec!["ALL".to_string()]),
            security_opt: Some(vec!["no-new-privileges:true".to_string()]),
            pids_limit: Some(256),
            ..Default::default()
        };

        let container_config = ContainerConfig {
            image: Some(image.to_string()),
            cmd: Some(vec!["sleep".to_string(), "infinity".to_string()]),
            working_dir: Some("/app".to_string()),
            host_config: Some(host_config),
            ..Default::default()
        };

        let options = Some(CreateContainerOptions {
            name: id.container_name().to_string(),
            platform: None,
        });

        self.docker()
            .create_container(options, container_config)
            .await
            .map_err(|e| map_create_error(e, image))?;

        self.docker()
            .start_container(id.container_name(), None::<StartContainerOptions<String>>)
            .await
            .map_err(|e| EngineError::RuntimeUnavailable(anyhow::anyhow!("{e}")))?;

        #[cfg(feature = "tracing")]
        debug!(sandbox = id.container_name(), "sandbox created and started");

        Ok(id)
    }

    async fn put_archive(&self, id: &SandboxId, path: &str, tar_bytes: Vec<u8>) -> Result<()> {
        let options = bollard::container::UploadToContainerOptions {
            path: path.to_string(),
            no_overwrite_dir_non_dir: String::new(),
        };

        self.docker()
            .upload_to_container(id.container_name(), Some(options), tar_bytes.into())
            .await
            .map_err(|e| EngineError::ArchiveIo(std::io::Error::other(e.to_string())))
    }

    #[cfg_attr(feature = "tracing", instrument(skip(self, argv)))]
    async fn exec(&self, id: &SandboxId, argv: &[&str], workdir: &str, deadline: Duration) -> Result<ExecOutcome> {
        let create_exec = CreateExecOptions {
            attach_stdout: Some(true),
            attach_stderr: Some(true),
            cmd: Some(argv.iter().map(|s| s.to_string()).collect()),
            working_dir: Some(workdir.to_string()),
            ..Default::default()
        };

        let created = self
            .docker()
            .create_exec(id.container_name(), create_exec)
            .await
            .map_err(|e| EngineError::RuntimeUnavailable(anyhow::anyhow!("{e}")))?;

        let start = Instant::now();
        let collect = self.collect_exec_output(&created.id);

        match tokio::time::timeout(deadline, collect).await {
            Ok(Ok((stdout, stderr))) => {
                let inspect = self
                    .docker()
                    .inspect_exec(&created.id)
                    .await
                    .map_err(|e| EngineError::RuntimeUnavailable(anyhow::anyhow!("{e}")))?;

                Ok(ExecOutcome {
                    exit_code: inspect.exit_code,
                    stdout,
                    stderr,
                    wall: start.elapsed(),
                    timed_out: false,
                })
            }
            Ok(Err(e)) => Err(e),
            Err(_) => {
                #[cfg(feature = "tracing")]
                warn!(sandbox = id.container_name(), ?deadline, "exec exceeded engine deadline");
                Ok(ExecOutcome {
                    exit_code: None,
                    stdout: String::new(),
                    stderr: String::new(),
                    wall: start.elapsed(),
                    timed_out: true,
                })
            }
        }
    }

    async fn get_archive(&self, id: &SandboxId, path: &str) -> Result<Vec<u8>> {
        let options = bollard::container::DownloadFromContainerOptions {
            path: path.to_string(),
        };

        let mut stream = self.docker().download_from_container(id.container_name(), Some(options));
        let mut bytes = Vec::new();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| EngineError::ArchiveIo(std::io::Error::other(e.to_string())))?;
            bytes.extend_from_slice(&chunk);
        }
        Ok(bytes)
    }

    async fn teardown(&self, id: &SandboxId, grace: Duration) {
        let stop_opts = StopContainerOptions {
            t: grace.as_secs() as i64,
        };
        let _ = self.docker().stop_container(id.container_name(), Some(stop_opts)).await;

        let remove_opts = RemoveContainerOptions {
            force: true,
            ..Default::default()
        };
        let _ = self.docker().remove_container(id.container_name(), Some(remove_opts)).await;
    }
}

impl BollardRuntime {
    async fn collect_exec_output(&self, exec_id: &str) -> Result<(String, String)> {
        let started = self
            .docker()
            .start_exec(
                exec_id,
                Some(StartExecOptions {
                    detach: false,
                    tty: false,
                    output_capacity: None,
                }),
            )
            .await
            .map_err(|e| EngineError::RuntimeUnavailable(anyhow::anyhow!("{e}")))?;

        let mut stdout = String::new();
        let mut stderr = String::new();

        if let StartExecResults::Attached { mut output, .. } = started {
            while let Some(chunk) = output.next().await {
                let log = chunk.map_err(|e| EngineError::RuntimeUnavailable(anyhow::anyhow!("{e}")))?;
                match log {
                    bollard::container::LogOutput::StdOut { message } => {
                        stdout.push_str(&String::from_utf8_lossy(&message));
                    }
                    bollard::container::LogOutput::StdErr { message } => {
                        stderr.push_str(&String::from_utf8_lossy(&message));
                    }
                    bollard::container::LogOutput::Console { message } => {
                        stdout.push_str(&String::from_utf8_lossy(&message));
                    }
                    _ => {}
                }
            }
        }

        Ok((stdout, stderr))
    }
}

fn map_create_error(e: BollardError, image: &str) -> EngineError {
    match e {
        BollardError::DockerResponseServerError { status_code: 404, .. } => {
            EngineError::ImageMissing(image.to_string())
        }
        other => EngineError::RuntimeUnavailable(anyhow::anyhow!("{other}")),
    }
}

/// Parse a docker-style memory size string (e.g. `"128m"`, `"1g"`) into bytes.
fn parse_memory_limit(spec: &str) -> i64 {
    let spec = spec.trim();
    let (digits, multiplier): (&str, i64) = match spec.chars().last() {
        Some('k') | Some('K') => (&spec[..spec.len() - 1], 1024),
        Some('m') | Some('M') => (&spec[..spec.len() - 1], 1024 * 1024),
        Some('g') | Some('G') => (&spec[..spec.len() - 1], 1024 * 1024 * 1024),
        _ => (spec, 1),
    };
    digits.trim().parse::<i64>().unwrap_or(128).saturating_mul(multiplier)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sandbox_id_is_unique() {
        let a = SandboxId::new();
        let b = SandboxId::new();
        assert_ne!(a.container_name(), b.container_name());
    }

    #[test]
    fn parse_memory_limit_handles_suffixes() {
        assert_eq!(parse_memory_limit("128m"), 128 * 1024 * 1024);
        assert_eq!(parse_memory_limit("1g"), 1024 * 1024 * 1024);
        assert_eq!(parse_memory_limit("512k"), 512 * 1024);
        assert_eq!(parse_memory_limit("1000"), 1000);
    }
}
