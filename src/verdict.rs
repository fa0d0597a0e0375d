//! The single typed outcome of a submission, and batch aggregation.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Wall-clock timings observed by the engine around a submission's pipeline.
///
/// These are engine-observed, not runner-reported. They override whatever
/// timing information the runner's `result.json` may have included.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Timings {
    /// Total time from sandbox creation through result collection.
    pub total: Duration,
    /// Time spent in the compile stage, if the language is compiled.
    pub compile: Option<Duration>,
    /// Time spent in the execute stage.
    pub test: Option<Duration>,
}

/// The single typed outcome of one submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Verdict {
    /// The program compiled (if applicable) and ran to completion.
    Success {
        /// Whether the produced output matched the expected output.
        #[serde(rename = "match")]
        matched: bool,
        /// The actual output produced, as reported by the runner.
        actual: serde_json::Value,
        /// The expected output, echoed back from the submission's config.
        expected: serde_json::Value,
        /// Captured stdout, if the runner reported it.
        stdout: Option<String>,
        /// Captured stderr, if the runner reported it.
        stderr: Option<String>,
        /// Timings for this submission.
        timings: Timings,
    },
    /// Compilation failed with a nonzero exit and no timeout.
    CompileError {
        /// Captured compiler output (stdout+stderr of `make build`).
        compile_output: String,
        /// Timings for this submission.
        timings: Timings,
    },
    /// Compilation did not finish within `compile_timeout`.
    CompileTimeout {
        /// Timings for this submission.
        timings: Timings,
    },
    /// Execution did not finish within `execution_timeout`.
    RuntimeTimeout {
        /// Timings for this submission.
        timings: Timings,
    },
    /// Execution exited nonzero and no `result.json` could be recovered.
    RuntimeError {
        /// The process exit code, if known.
        exit_code: Option<i64>,
        /// Captured stderr, if any.
        stderr: Option<String>,
        /// Timings for this submission.
        timings: Timings,
    },
    /// An engine-side failure occurred (driver, archive, or codec error).
    InternalError {
        /// A human-readable description of the failure.
        reason: String,
        /// Timings for this submission (best-effort; may be partial).
        timings: Timings,
    },
}

impl Verdict {
    /// The timings carried by this verdict, regardless of variant.
    pub fn timings(&self) -> Timings {
        match self {
            Verdict::Success { timings, .. }
            | Verdict::CompileError { timings, .. }
            | Verdict::CompileTimeout { timings }
            | Verdict::RuntimeTimeout { timings }
            | Verdict::RuntimeError { timings, .. }
            | Verdict::InternalError { timings, .. } => *timings,
        }
    }

    /// Whether this verdict represents a successful, matching run.
    pub fn is_accepted(&self) -> bool {
        matches!(self, Verdict::Success { matched: true, .. })
    }

    /// Whether this verdict represents any kind of timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Verdict::CompileTimeout { .. } | Verdict::RuntimeTimeout { .. })
    }

    /// Build an [`Verdict::InternalError`] from an engine-internal error.
    pub fn internal_error(reason: impl Into<String>, timings: Timings) -> Self {
        Verdict::InternalError {
            reason: reason.into(),
            timings,
        }
    }
}

/// A batch of verdicts, positionally aligned with the input configs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchVerdict {
    /// One verdict per input config, in input order.
    pub verdicts: Vec<Verdict>,
    /// Aggregate statistics over `verdicts`.
    pub stats: BatchStats,
}

/// Aggregate statistics over a batch of verdicts.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct BatchStats {
    /// Number of verdicts in the batch.
    pub total_tests: usize,
    /// Number of verdicts with [`Verdict::Success`] status, matched or not.
    pub success_count: usize,
    /// Number of verdicts that were not a [`Verdict::Success`].
    pub error_count: usize,
    /// `success_count / total_tests`, or `0.0` for an empty batch.
    pub success_rate: f64,
    /// Sum of every verdict's total wall time.
    pub total_wall_time: Duration,
    /// `total_wall_time / total_tests`, or zero for an empty batch.
    pub avg_time: Duration,
}

impl BatchVerdict {
    /// Build a [`BatchVerdict`] from an ordered sequence of verdicts,
    /// computing aggregate stats.
    pub fn from_verdicts(verdicts: Vec<Verdict>) -> Self {
        let total_tests = verdicts.len();
        let success_count = verdicts
            .iter()
            .filter(|v| matches!(v, Verdict::Success { .. }))
            .count();
        let error_count = total_tests - success_count;
        let total_wall_time: Duration = verdicts.iter().map(|v| v.timings().total).sum();
        let success_rate = if total_tests == 0 {
            0.0
        } else {
            success_count as f64 / total_tests as f64
        };
        let avg_time = if total_tests == 0 {
            Duration::ZERO
        } else {
            total_wall_time / total_tests as u32
        };

        Self {
            verdicts,
            stats: BatchStats {
                total_tests,
                success_count,
                error_count,
                success_rate,
                total_wall_time,
                avg_time,
            },
        }
    }
}
