//! In-memory catalog and fetcher

use std::sync::{Arc, Mutex};

use artifact_sync::artifact::catalog::{LocalCatalog, matches_family};
use artifact_sync::artifact::error::{CatalogError, FetchError};
use artifact_sync::artifact::fetcher::Fetcher;
use artifact_sync::artifact::types::ArtifactDescriptor;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub fn artifact(name: &str, reference: &str, tags: &[&str], created_at: i64) -> ArtifactDescriptor {
    ArtifactDescriptor::new(
        name,
        tags.iter().map(|t| t.to_string()).collect(),
        DateTime::<Utc>::from_timestamp(created_at, 0).unwrap(),
        reference,
    )
}

/// Catalog holding a shared, mutable list of local artifacts
#[derive(Clone, Default)]
pub struct MemoryCatalog {
    artifacts: Arc<Mutex<Vec<ArtifactDescriptor>>>,
}

impl MemoryCatalog {
    pub fn new(artifacts: Vec<ArtifactDescriptor>) -> Self {
        Self {
            artifacts: Arc::new(Mutex::new(artifacts)),
        }
    }

    pub fn insert(&self, artifact: ArtifactDescriptor) {
        self.artifacts.lock().unwrap().push(artifact);
    }
}

impl LocalCatalog for MemoryCatalog {
    fn list_artifacts(&self, family: &str) -> Result<Vec<ArtifactDescriptor>, CatalogError> {
        Ok(self
            .artifacts
            .lock()
            .unwrap()
            .iter()
            .filter(|a| matches_family(&a.name, family))
            .cloned()
            .collect())
    }

    fn inspect(&self, reference: &str) -> Result<Option<ArtifactDescriptor>, CatalogError> {
        Ok(self
            .artifacts
            .lock()
            .unwrap()
            .iter()
            .find(|a| a.reference == reference)
            .cloned())
    }
}

/// Fetcher that "pulls" by copying a remote descriptor into a MemoryCatalog
pub struct RecordingFetcher {
    catalog: MemoryCatalog,
    available: Vec<ArtifactDescriptor>,
    pulled: Mutex<Vec<String>>,
}

impl RecordingFetcher {
    pub fn new(catalog: MemoryCatalog, available: Vec<ArtifactDescriptor>) -> Self {
        Self {
            catalog,
            available,
            pulled: Mutex::new(Vec::new()),
        }
    }

    pub fn pulled(&self) -> Vec<String> {
        self.pulled.lock().unwrap().clone()
    }
}

#[async_trait]
impl Fetcher for RecordingFetcher {
    async fn pull(&self, reference: &str) -> Result<(), FetchError> {
        self.pulled.lock().unwrap().push(reference.to_string());
        let artifact = self
            .available
            .iter()
            .find(|a| a.reference == reference)
            .cloned()
            .ok_or_else(|| FetchError::PullFailed {
                reference: reference.to_string(),
                stderr: "manifest unknown".to_string(),
            })?;
        self.catalog.insert(artifact);
        Ok(())
    }

    async fn inspect(&self, reference: &str) -> Result<Option<ArtifactDescriptor>, FetchError> {
        Ok(self.catalog.inspect(reference)?)
    }
}
