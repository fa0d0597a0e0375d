//! Error types for the judge sandbox engine.

use thiserror::Error;

/// Errors rejected before a [`crate::sandbox::driver::Sandbox`] is ever created.
///
/// These never become a [`crate::verdict::Verdict`]; they are pre-flight
/// rejects surfaced directly to the caller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The submitted language is not one this engine has an image for.
    #[error("unsupported language: {0}")]
    UnsupportedLanguage(String),

    /// The submitted language standard is not advertised for the language.
    #[error("unsupported {language} standard: {standard}")]
    UnsupportedStandard {
        /// The language the standard was requested for.
        language: String,
        /// The unrecognized standard string.
        standard: String,
    },

    /// User code was empty.
    #[error("user code must not be empty")]
    EmptyCode,

    /// User code exceeded the configured maximum length.
    #[error("user code length {actual} exceeds maximum {max}")]
    CodeTooLong {
        /// The length of the submitted code, in bytes.
        actual: usize,
        /// The configured maximum.
        max: usize,
    },

    /// A batch request exceeded the configured maximum size.
    #[error("batch size {actual} exceeds maximum {max}")]
    BatchTooLarge {
        /// The number of configs submitted.
        actual: usize,
        /// The configured maximum.
        max: usize,
    },

    /// User code matched a denylisted pattern.
    #[error("user code matches a denylisted pattern: {0}")]
    Denylisted(String),

    /// The config object is missing a required top-level key.
    #[error("config is missing required field: {0}")]
    MalformedConfig(String),
}

/// Errors internal to the engine's own machinery (driver, packer, codec).
///
/// These never reach the caller of `submit`/`batch` directly; the execution
/// engine catches them and folds them into
/// [`crate::verdict::Verdict::InternalError`].
#[derive(Error, Debug)]
pub enum EngineError {
    /// The container runtime could not be reached at all.
    #[error("container runtime unavailable: {0}")]
    RuntimeUnavailable(#[source] anyhow::Error),

    /// The requested runner image does not exist.
    #[error("runner image not found: {0}")]
    ImageMissing(String),

    /// A driver call exceeded its deadline.
    #[error("operation exceeded its deadline after {0:?}")]
    Deadline(std::time::Duration),

    /// Reading or writing an in-memory tar archive failed.
    #[error("archive I/O error: {0}")]
    ArchiveIo(#[source] std::io::Error),

    /// An exec inside the sandbox returned an unexpected nonzero exit code.
    #[error("exec failed with exit code {0}")]
    ExecFailure(i64),

    /// The runner's `result.json` could not be parsed.
    #[error("failed to decode result.json: {0}")]
    Codec(#[source] serde_json::Error),

    /// The runner did not produce a `result.json` at all.
    #[error("result.json missing from sandbox")]
    ResultMissing,

    /// I/O error unrelated to archive handling.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// Check if this error represents a deadline expiry.
    pub fn is_deadline(&self) -> bool {
        matches!(self, EngineError::Deadline(_))
    }

    /// Check if this error represents an unreachable runtime.
    pub fn is_runtime_unavailable(&self) -> bool {
        matches!(self, EngineError::RuntimeUnavailable(_))
    }

    /// Render this error as the `reason` string carried by
    /// [`crate::verdict::Verdict::InternalError`].
    pub fn to_reason(&self) -> String {
        self.to_string()
    }
}

/// Result type alias for container-driver and engine-internal operations.
pub type Result<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_display() {
        let err = ValidationError::CodeTooLong {
            actual: 100,
            max: 50,
        };
        assert_eq!(
            err.to_string(),
            "user code length 100 exceeds maximum 50"
        );
    }

    #[test]
    fn engine_error_helpers() {
        let deadline = EngineError::Deadline(std::time::Duration::from_secs(5));
        assert!(deadline.is_deadline());
        assert!(!deadline.is_runtime_unavailable());

        let unavailable = EngineError::RuntimeUnavailable(anyhow::anyhow!("socket refused"));
        assert!(unavailable.is_runtime_unavailable());
        assert!(unavailable.to_reason().contains("socket refused"));
    }

    #[test]
    fn exec_failure_reason_mentions_exit_code() {
        let err = EngineError::ExecFailure(124);
        assert!(err.to_reason().contains("124"));
    }
}
