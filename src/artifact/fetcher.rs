//! Retrieval of remote artifacts into the local store

use std::sync::Arc;

#[cfg(test)]
use mockall::automock;
use tokio::process::Command;
use tracing::{debug, info};

use crate::artifact::catalog::{DockerCatalog, LocalCatalog};
use crate::artifact::error::FetchError;
use crate::artifact::types::ArtifactDescriptor;

/// Trait for pulling artifacts the engine decided to fetch
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
    /// Retrieve the artifact behind a reference into local storage
    async fn pull(&self, reference: &str) -> Result<(), FetchError>;

    /// Describe a local artifact after a pull
    async fn inspect(&self, reference: &str) -> Result<Option<ArtifactDescriptor>, FetchError>;
}

/// Fetcher shelling out to `docker pull`
pub struct DockerFetcher {
    binary: String,
    catalog: Arc<DockerCatalog>,
}

impl DockerFetcher {
    pub fn new(binary: impl Into<String>) -> Self {
        let binary = binary.into();
        Self {
            catalog: Arc::new(DockerCatalog::new(binary.clone())),
            binary,
        }
    }
}

impl Default for DockerFetcher {
    fn default() -> Self {
        Self::new("docker")
    }
}

#[async_trait::async_trait]
impl Fetcher for DockerFetcher {
    async fn pull(&self, reference: &str) -> Result<(), FetchError> {
        info!("Pulling {}", reference);

        let output = Command::new(&self.binary)
            .args(["pull", "--", reference])
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| FetchError::Spawn {
                command: format!("{} pull", self.binary),
                source,
            })?;

        if !output.status.success() {
            return Err(FetchError::PullFailed {
                reference: reference.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        debug!("Pulled {}", reference);
        Ok(())
    }

    async fn inspect(&self, reference: &str) -> Result<Option<ArtifactDescriptor>, FetchError> {
        let catalog = Arc::clone(&self.catalog);
        let reference = reference.to_string();
        Ok(tokio::task::spawn_blocking(move || catalog.inspect(&reference)).await??)
    }
}
