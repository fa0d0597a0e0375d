//! Engine configuration with builder pattern and environment loading.

use std::collections::HashMap;
use std::time::Duration;

#[cfg(feature = "tracing")]
use tracing::warn;

use crate::languages::Language;

/// Per-language runner image overrides.
#[derive(Debug, Clone)]
pub struct LanguageImages {
    /// Image for C submissions.
    pub c: String,
    /// Image for C++ submissions.
    pub cpp: String,
    /// Image for version-unpinned Python submissions, and the fallback for
    /// any `python-<version>` tag without a matching entry in `python_versions`.
    pub python: String,
    /// Image overrides keyed by Python version tag (e.g. `"3.11"`), for
    /// deployments that pin several Python runner images side by side.
    pub python_versions: HashMap<String, String>,
}

impl Default for LanguageImages {
    fn default() -> Self {
        Self {
            c: Language::C.default_image().to_string(),
            cpp: Language::Cpp.default_image().to_string(),
            python: Language::Python(None).default_image().to_string(),
            python_versions: HashMap::new(),
        }
    }
}

impl LanguageImages {
    /// Resolve the image for a given language.
    pub fn for_language(&self, language: &Language) -> &str {
        match language {
            Language::C => &self.c,
            Language::Cpp => &self.cpp,
            Language::Python(None) => &self.python,
            Language::Python(Some(version)) => {
                self.python_versions.get(version).unwrap_or(&self.python)
            }
        }
    }

    /// Pin a specific Python version tag to a runner image.
    pub fn with_python_version(mut self, version: impl Into<String>, image: impl Into<String>) -> Self {
        self.python_versions.insert(version.into(), image.into());
        self
    }
}

/// Engine-wide configuration: resource caps, timeout policy, worker pool
/// size, and the submission validator's bounds.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Per-container CPU share (fraction of one core).
    pub container_cpu: f64,
    /// Per-container memory cap (docker-style size string, e.g. `"128m"`).
    pub container_mem: String,
    /// Default execution timeout applied when a submission doesn't specify one.
    pub container_timeout: Duration,
    /// Default compile timeout applied when a submission doesn't specify one.
    pub compile_timeout: Duration,
    /// When true, a hanging exec is allowed to run past `execution_timeout`
    /// up to a hard ceiling (see [`CONTINUE_ON_TIMEOUT_CEILING_MULTIPLIER`])
    /// rather than being preempted at `execution_timeout` exactly.
    pub continue_on_timeout: bool,
    /// Size of the bounded worker pool used by `batch`.
    pub worker_pool: usize,
    /// Engine-wide maximum compile timeout a submission may request.
    pub max_compile_timeout: Duration,
    /// Engine-wide maximum execution timeout a submission may request.
    pub max_execution_timeout: Duration,
    /// Engine-wide maximum CPU share a submission may request.
    pub max_cpu: f64,
    /// Engine-wide maximum memory cap a submission may request.
    pub max_mem: String,
    /// Maximum accepted user code length, in UTF-8 bytes.
    pub max_code_length: usize,
    /// Maximum number of configs accepted in one batch request.
    pub max_batch_size: usize,
    /// Substrings that, if found in submitted code, cause a pre-flight reject.
    pub denylist: Vec<String>,
    /// Per-language runner images.
    pub images: LanguageImages,
}

/// Hard ceiling on a `continue_on_timeout` exec, as a multiple of the
/// submission's `execution_timeout`. Past this point the exec is always
/// treated as a [`crate::verdict::Verdict::RuntimeTimeout`], regardless of
/// policy.
pub const CONTINUE_ON_TIMEOUT_CEILING_MULTIPLIER: u32 = 5;

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            container_cpu: 1.0,
            container_mem: "128m".to_string(),
            container_timeout: Duration::from_secs(10),
            compile_timeout: Duration::from_secs(30),
            continue_on_timeout: false,
            worker_pool: 4,
            max_compile_timeout: Duration::from_secs(300),
            max_execution_timeout: Duration::from_secs(60),
            max_cpu: 4.0,
            max_mem: "1g".to_string(),
            max_code_length: 50_000,
            max_batch_size: 100,
            denylist: crate::sandbox::validator::default_denylist(),
            images: LanguageImages::default(),
        }
    }
}

impl EngineConfig {
    /// Create a new builder for [`EngineConfig`].
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }

    /// Load configuration from the environment, falling back to defaults
    /// for any variable that's absent, empty, or fails to parse.
    ///
    /// Never panics: a malformed value is logged (when the `tracing`
    /// feature is enabled) and the built-in default is used instead.
    pub fn from_env() -> Self {
        let default = Self::default();
        let mut builder = Self::builder();

        if let Some(cpu) = parse_env("CONTAINER_CPU") {
            builder = builder.container_cpu(cpu);
        }
        if let Ok(mem) = std::env::var("CONTAINER_MEM") {
            if !mem.is_empty() {
                builder = builder.container_mem(mem);
            }
        }
        if let Some(secs) = parse_env::<u64>("CONTAINER_TIMEOUT") {
            builder = builder.container_timeout(Duration::from_secs(secs));
        }
        if let Some(secs) = parse_env::<u64>("COMPILE_TIMEOUT") {
            builder = builder.compile_timeout(Duration::from_secs(secs));
        }
        if let Some(flag) = parse_env::<bool>("CONTINUE_ON_TIMEOUT") {
            builder = builder.continue_on_timeout(flag);
        }
        if let Some(pool) = parse_env::<usize>("WORKER_POOL") {
            builder = builder.worker_pool(pool);
        }

        let mut config = builder.build();
        config.clamp_to(&default);
        config
    }

    /// Clamp this config's user-overridable limits to the engine-wide
    /// maxima carried by `maxima` (used by `from_env` to keep a malformed
    /// or oversized env var from exceeding engine policy).
    fn clamp_to(&mut self, maxima: &EngineConfig) {
        if self.compile_timeout > maxima.max_compile_timeout {
            self.compile_timeout = maxima.max_compile_timeout;
        }
        if self.container_timeout > maxima.max_execution_timeout {
            self.container_timeout = maxima.max_execution_timeout;
        }
        if self.container_cpu > maxima.max_cpu {
            self.container_cpu = maxima.max_cpu;
        }
    }
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Option<T> {
    match std::env::var(key) {
        Ok(raw) => match raw.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                #[cfg(feature = "tracing")]
                warn!(key, raw, "ignoring unparseable environment variable, using default");
                None
            }
        },
        Err(_) => None,
    }
}

/// Builder for [`EngineConfig`].
#[derive(Debug, Clone, Default)]
pub struct EngineConfigBuilder {
    container_cpu: Option<f64>,
    container_mem: Option<String>,
    container_timeout: Option<Duration>,
    compile_timeout: Option<Duration>,
    continue_on_timeout: Option<bool>,
    worker_pool: Option<usize>,
    max_code_length: Option<usize>,
    max_batch_size: Option<usize>,
    denylist: Option<Vec<String>>,
    images: Option<LanguageImages>,
}

impl EngineConfigBuilder {
    /// Set the per-container CPU share.
    pub fn container_cpu(mut self, cpu: f64) -> Self {
        self.container_cpu = Some(cpu);
        self
    }

    /// Set the per-container memory cap (docker-style size string).
    pub fn container_mem(mut self, mem: impl Into<String>) -> Self {
        self.container_mem = Some(mem.into());
        self
    }

    /// Set the default execution timeout.
    pub fn container_timeout(mut self, timeout: Duration) -> Self {
        self.container_timeout = Some(timeout);
        self
    }

    /// Set the default compile timeout.
    pub fn compile_timeout(mut self, timeout: Duration) -> Self {
        self.compile_timeout = Some(timeout);
        self
    }

    /// Set the `continue_on_timeout` policy.
    pub fn continue_on_timeout(mut self, value: bool) -> Self {
        self.continue_on_timeout = Some(value);
        self
    }

    /// Set the worker pool size used by `batch`.
    pub fn worker_pool(mut self, size: usize) -> Self {
        self.worker_pool = Some(size);
        self
    }

    /// Set the maximum accepted user code length.
    pub fn max_code_length(mut self, max: usize) -> Self {
        self.max_code_length = Some(max);
        self
    }

    /// Set the maximum accepted batch size.
    pub fn max_batch_size(mut self, max: usize) -> Self {
        self.max_batch_size = Some(max);
        self
    }

    /// Override the denylist entirely.
    pub fn denylist(mut self, patterns: Vec<String>) -> Self {
        self.denylist = Some(patterns);
        self
    }

    /// Override the per-language runner images.
    pub fn images(mut self, images: LanguageImages) -> Self {
        self.images = Some(images);
        self
    }

    /// Build the [`EngineConfig`], filling in defaults for unset fields.
    pub fn build(self) -> EngineConfig {
        let default = EngineConfig::default();
        EngineConfig {
            container_cpu: self.container_cpu.unwrap_or(default.container_cpu),
            container_mem: self.container_mem.unwrap_or(default.container_mem),
            container_timeout: self.container_timeout.unwrap_or(default.container_timeout),
            compile_timeout: self.compile_timeout.unwrap_or(default.compile_timeout),
            continue_on_timeout: self
                .continue_on_timeout
                .unwrap_or(default.continue_on_timeout),
            worker_pool: self.worker_pool.unwrap_or(default.worker_pool),
            max_compile_timeout: default.max_compile_timeout,
            max_execution_timeout: default.max_execution_timeout,
            max_cpu: default.max_cpu,
            max_mem: default.max_mem,
            max_code_length: self.max_code_length.unwrap_or(default.max_code_length),
            max_batch_size: self.max_batch_size.unwrap_or(default.max_batch_size),
            denylist: self.denylist.unwrap_or(default.denylist),
            images: self.images.unwrap_or(default.images),
        }
    }
}
