//! Pre-flight validation of submissions, run before any sandbox exists.

use crate::error::ValidationError;
use crate::languages::Language;
use crate::sandbox::config::EngineConfig;
use crate::submission::Submission;

/// A conservative built-in set of substrings that cause a submission to be
/// rejected outright. This is defense-in-depth, not the primary isolation
/// mechanism, that's the sandbox itself. Deployments are expected to
/// extend this list via [`EngineConfig::denylist`].
pub fn default_denylist() -> Vec<String> {
    vec![
        "rm -rf /".to_string(),
        "/dev/sda".to_string(),
        "/dev/nvme".to_string(),
        "mkfs.".to_string(),
        ":(){ :|:& };:".to_string(),
        "/proc/sysrq-trigger".to_string(),
    ]
}

/// Validate a single submission against the engine's configured bounds.
///
/// Checks structure only, it never interprets `config`'s values beyond
/// confirming the required top-level keys are present.
pub fn validate_submission(
    submission: &Submission,
    config: &EngineConfig,
) -> Result<(), ValidationError> {
    validate_code(&submission.user_code, config)?;
    validate_config_shape(&submission.config)?;
    validate_standard(&submission.language, &submission.config)?;
    Ok(())
}

/// Validate a batch-optimized request's shared code plus per-test configs.
pub fn validate_batch(
    language: &Language,
    user_code: &str,
    configs: &[serde_json::Value],
    config: &EngineConfig,
) -> Result<(), ValidationError> {
    validate_code(user_code, config)?;

    if configs.len() > config.max_batch_size {
        return Err(ValidationError::BatchTooLarge {
            actual: configs.len(),
            max: config.max_batch_size,
        });
    }

    for test_config in configs {
        validate_config_shape(test_config)?;
        validate_standard(language, test_config)?;
    }

    Ok(())
}

fn validate_code(user_code: &str, config: &EngineConfig) -> Result<(), ValidationError> {
    if user_code.is_empty() {
        return Err(ValidationError::EmptyCode);
    }

    if user_code.len() > config.max_code_length {
        return Err(ValidationError::CodeTooLong {
            actual: user_code.len(),
            max: config.max_code_length,
        });
    }

    for pattern in &config.denylist {
        if user_code.contains(pattern.as_str()) {
            return Err(ValidationError::Denylisted(pattern.clone()));
        }
    }

    Ok(())
}

const REQUIRED_CONFIG_KEYS: &[&str] = &["solve_params", "expected", "function_type"];

fn validate_config_shape(config: &serde_json::Value) -> Result<(), ValidationError> {
    let object = config
        .as_object()
        .ok_or_else(|| ValidationError::MalformedConfig("config must be a JSON object".into()))?;

    for key in REQUIRED_CONFIG_KEYS {
        if !object.contains_key(*key) {
            return Err(ValidationError::MalformedConfig((*key).to_string()));
        }
    }

    Ok(())
}

fn validate_standard(language: &Language, config: &serde_json::Value) -> Result<(), ValidationError> {
    let key = match language {
        Language::C => "c_standard",
        Language::Cpp => "cpp_standard",
        Language::Python(_) => return Ok(()),
    };

    if let Some(standard) = config.get(key).and_then(|v| v.as_str()) {
        if !language.supports_standard(standard) {
            return Err(ValidationError::UnsupportedStandard {
                language: language.to_string(),
                standard: standard.to_string(),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> serde_json::Value {
        serde_json::json!({
            "solve_params": [{"name": "a", "type": "int", "value": 3}],
            "expected": {"a": 6},
            "function_type": "int",
        })
    }

    #[test]
    fn rejects_empty_code() {
        let config = EngineConfig::default();
        let sub = Submission::new(Language::C, "", valid_config());
        assert_eq!(
            validate_submission(&sub, &config),
            Err(ValidationError::EmptyCode)
        );
    }

    #[test]
    fn rejects_oversized_code() {
        let config = EngineConfig::builder().max_code_length(10).build();
        let sub = Submission::new(Language::C, "x".repeat(20), valid_config());
        assert!(matches!(
            validate_submission(&sub, &config),
            Err(ValidationError::CodeTooLong { .. })
        ));
    }

    #[test]
    fn rejects_denylisted_code() {
        let config = EngineConfig::default();
        let sub = Submission::new(
            Language::C,
            "int main(){ system(\"rm -rf /\"); }",
            valid_config(),
        );
        assert!(matches!(
            validate_submission(&sub, &config),
            Err(ValidationError::Denylisted(_))
        ));
    }

    #[test]
    fn rejects_malformed_config() {
        let config = EngineConfig::default();
        let sub = Submission::new(Language::C, "int main(){}", serde_json::json!({}));
        assert!(matches!(
            validate_submission(&sub, &config),
            Err(ValidationError::MalformedConfig(_))
        ));
    }

    #[test]
    fn rejects_unsupported_standard() {
        let config = EngineConfig::default();
        let mut bad_config = valid_config();
        bad_config["c_standard"] = serde_json::json!("c55");
        let sub = Submission::new(Language::C, "int main(){}", bad_config);
        assert!(matches!(
            validate_submission(&sub, &config),
            Err(ValidationError::UnsupportedStandard { .. })
        ));
    }

    #[test]
    fn accepts_valid_submission() {
        let config = EngineConfig::default();
        let sub = Submission::new(Language::C, "int main(){}", valid_config());
        assert!(validate_submission(&sub, &config).is_ok());
    }

    #[test]
    fn rejects_oversized_batch() {
        let config = EngineConfig::builder().max_batch_size(2).build();
        let configs = vec![valid_config(), valid_config(), valid_config()];
        assert_eq!(
            validate_batch(&Language::C, "int main(){}", &configs, &config),
            Err(ValidationError::BatchTooLarge { actual: 3, max: 2 })
        );
    }
}
