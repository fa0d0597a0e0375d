//! Prelude module for convenient imports.

pub use crate::error::{EngineError, Result, ValidationError};
pub use crate::facade::Facade;
pub use crate::languages::Language;
pub use crate::sandbox::{
    config::{EngineConfig, EngineConfigBuilder, LanguageImages},
    driver::{BollardRuntime, ContainerRuntime, ExecOutcome, ResourceLimits, SandboxId},
    executor::{BatchOptimizedEngine, Engine},
    runtime::SharedRuntime,
};
pub use crate::submission::{Limits, Submission};
pub use crate::verdict::{BatchStats, BatchVerdict, Timings, Verdict};
