//! Registry traits for querying remote artifact metadata and content

use bytes::Bytes;
use futures::stream::BoxStream;
#[cfg(test)]
use mockall::automock;

use crate::artifact::error::RegistryError;
use crate::artifact::types::ArtifactDescriptor;

/// Stream of content chunks for a downloaded artifact
pub type ByteStream = BoxStream<'static, Result<Bytes, RegistryError>>;

/// Registry serving step packages by exact version
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait PackageRegistry: Send + Sync {
    /// Looks up one exact `owner/name@version`
    ///
    /// # Returns
    /// * `Ok(ArtifactDescriptor)` - tarball URL in `reference`, summary in `description`
    /// * `Err(RegistryError::NotFound)` - registry answered with a non-success status
    /// * `Err(RegistryError::MalformedResponse)` - body could not be decoded
    async fn resolve_version(
        &self,
        owner: &str,
        name: &str,
        version: &str,
    ) -> Result<ArtifactDescriptor, RegistryError>;

    /// Downloads the content behind a resolved reference
    async fn fetch_content(&self, reference: &str) -> Result<ByteStream, RegistryError>;
}

/// Registry publishing runner images
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait ImageRegistry: Send + Sync {
    /// Fetches the single authoritative latest instance of an image family
    ///
    /// Returns `Ok(None)` when nothing has been published for the family.
    async fn resolve_latest_image(
        &self,
        family: &str,
    ) -> Result<Option<ArtifactDescriptor>, RegistryError>;
}
