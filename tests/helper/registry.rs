//! Registry test utilities

use std::collections::HashMap;

use artifact_sync::artifact::error::RegistryError;
use artifact_sync::artifact::registry::ImageRegistry;
use artifact_sync::artifact::types::ArtifactDescriptor;
use async_trait::async_trait;

/// Mock image registry for testing
#[derive(Default)]
pub struct MockImageRegistry {
    latest: HashMap<String, Option<ArtifactDescriptor>>,
}

impl MockImageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_latest(mut self, family: &str, latest: Option<ArtifactDescriptor>) -> Self {
        self.latest.insert(family.to_string(), latest);
        self
    }
}

#[async_trait]
impl ImageRegistry for MockImageRegistry {
    async fn resolve_latest_image(
        &self,
        family: &str,
    ) -> Result<Option<ArtifactDescriptor>, RegistryError> {
        match self.latest.get(family) {
            Some(latest) => Ok(latest.clone()),
            None => Err(RegistryError::NotFound(family.to_string())),
        }
    }
}
