//! The request types accepted by the engine facade.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::languages::Language;

/// Per-submission time limits.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Limits {
    /// Maximum time allowed for the compile stage.
    #[serde(with = "duration_secs")]
    pub compile_timeout: Duration,
    /// Maximum time allowed for the execute stage.
    #[serde(with = "duration_secs")]
    pub execution_timeout: Duration,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            compile_timeout: Duration::from_secs(30),
            execution_timeout: Duration::from_secs(10),
        }
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = u64::deserialize(d)?;
        Ok(Duration::from_secs(secs))
    }
}

/// One runnable submission: source code, language, runner config, and limits.
#[derive(Debug, Clone)]
pub struct Submission {
    /// The language the code is written in.
    pub language: Language,
    /// The user's source code (or script, for interpreted languages).
    pub user_code: String,
    /// Runner-contract configuration, passed through to the container
    /// untouched except for structural validation.
    pub config: serde_json::Value,
    /// Compile/execute time limits for this submission.
    pub limits: Limits,
    /// Whether to emit verbose diagnostic logging for this submission.
    ///
    /// Never affects the verdict; purely a `tracing` span-field toggle.
    pub show_logs: bool,
}

impl Submission {
    /// Create a submission with default limits and logging disabled.
    pub fn new(language: Language, user_code: impl Into<String>, config: serde_json::Value) -> Self {
        Self {
            language,
            user_code: user_code.into(),
            config,
            limits: Limits::default(),
            show_logs: false,
        }
    }

    /// Construct a submission from a wire-level language tag (e.g. `"c"`,
    /// `"python-3.11"`), hard-rejecting anything [`Language::parse`] doesn't
    /// recognize.
    pub fn from_tag(
        language_tag: &str,
        user_code: impl Into<String>,
        config: serde_json::Value,
    ) -> Result<Self, ValidationError> {
        let language = Language::parse(language_tag)
            .ok_or_else(|| ValidationError::UnsupportedLanguage(language_tag.to_string()))?;
        Ok(Self::new(language, user_code, config))
    }

    /// Override the time limits for this submission.
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Enable verbose diagnostic logging for this submission.
    pub fn with_logs(mut self) -> Self {
        self.show_logs = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_limits_match_runner_contract_defaults() {
        let limits = Limits::default();
        assert_eq!(limits.compile_timeout, Duration::from_secs(30));
        assert_eq!(limits.execution_timeout, Duration::from_secs(10));
    }

    #[test]
    fn from_tag_rejects_unknown_language() {
        let result = Submission::from_tag("rust", "fn main(){}", serde_json::json!({}));
        assert!(matches!(result, Err(ValidationError::UnsupportedLanguage(tag)) if tag == "rust"));
    }

    #[test]
    fn from_tag_accepts_known_language() {
        let sub = Submission::from_tag("python-3.11", "print(1)", serde_json::json!({})).unwrap();
        assert_eq!(sub.language, Language::Python(Some("3.11".to_string())));
    }

    #[test]
    fn submission_builder() {
        let sub = Submission::new(Language::C, "int main(){}", serde_json::json!({}))
            .with_logs();
        assert!(sub.show_logs);
        assert_eq!(sub.limits.execution_timeout, Duration::from_secs(10));
    }
}
