//! Process-wide container runtime handle.
//!
//! A cheaply cloneable wrapper around the one connection every sandbox in
//! this process talks through.

use std::sync::Arc;

use bollard::Docker;

use crate::error::{EngineError, Result};

/// A shared handle to the container runtime, reused across every sandbox
/// created in this process.
#[derive(Clone)]
pub struct SharedRuntime {
    docker: Arc<Docker>,
}

impl std::fmt::Debug for SharedRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedRuntime")
            .field("docker", &"<bollard::Docker>")
            .finish()
    }
}

impl SharedRuntime {
    /// Connect to the local container runtime using its platform defaults
    /// (Unix socket on Linux/macOS, named pipe on Windows).
    pub fn connect() -> Result<Self> {
        let docker = Docker::connect_with_local_defaults()
            .map_err(|e| EngineError::RuntimeUnavailable(anyhow::anyhow!("{e}")))?;
        Ok(Self {
            docker: Arc::new(docker),
        })
    }

    /// Wrap an already-connected client.
    pub fn from_client(docker: Docker) -> Self {
        Self {
            docker: Arc::new(docker),
        }
    }

    /// Wrap an existing `Arc<Docker>` for sharing.
    pub fn from_arc(docker: Arc<Docker>) -> Self {
        Self { docker }
    }

    /// Borrow the underlying client.
    pub fn docker(&self) -> &Docker {
        &self.docker
    }

    /// Get the `Arc<Docker>` for sharing across sandboxes.
    pub fn arc(&self) -> Arc<Docker> {
        Arc::clone(&self.docker)
    }

    /// Check whether the runtime is reachable.
    pub async fn ping(&self) -> bool {
        self.docker.ping().await.is_ok()
    }
}

impl std::ops::Deref for SharedRuntime {
    type Target = Docker;

    fn deref(&self) -> &Self::Target {
        &self.docker
    }
}
