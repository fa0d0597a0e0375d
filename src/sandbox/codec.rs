//! Decodes the runner's `result.json` into a typed [`Verdict`].

use serde_json::Value;

use crate::verdict::{Timings, Verdict};

/// Decode a runner-emitted `result.json` payload into a [`Verdict`],
/// merging in the engine-observed timings (which always take precedence
/// over any timing fields the runner itself reported).
pub fn decode(raw: &[u8], timings: Timings) -> Result<Verdict, serde_json::Error> {
    let value: Value = serde_json::from_slice(raw)?;
    Ok(decode_value(&value, timings))
}

fn decode_value(value: &Value, timings: Timings) -> Verdict {
    let status = value
        .get("status")
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_ascii_lowercase();

    match status.as_str() {
        "success" | "ok" | "accepted" => Verdict::Success {
            matched: value.get("match").and_then(Value::as_bool).unwrap_or(false),
            actual: value.get("actual").cloned().unwrap_or(Value::Null),
            expected: value.get("expected").cloned().unwrap_or(Value::Null),
            stdout: string_field(value, "stdout"),
            stderr: string_field(value, "stderr"),
            timings,
        },
        "compile_error" | "compile_failed" => Verdict::CompileError {
            compile_output: string_field(value, "compile_output")
                .or_else(|| string_field(value, "logs"))
                .unwrap_or_default(),
            timings,
        },
        "compile_timeout" => Verdict::CompileTimeout { timings },
        "runtime_timeout" | "timeout" => Verdict::RuntimeTimeout { timings },
        "runtime_error" | "error" => Verdict::RuntimeError {
            exit_code: value.get("exit_code").and_then(Value::as_i64),
            stderr: string_field(value, "stderr").or_else(|| string_field(value, "message")),
            timings,
        },
        _ => Verdict::InternalError {
            reason: format!("unrecognized result status: {:?}", status),
            timings,
        },
    }
}

fn string_field(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(str::to_string)
}
