//! Step package retrieval
//!
//! Packages are always requested by exact version, so they bypass candidate
//! selection and reconciliation entirely.

use std::path::{Path, PathBuf};

use futures::TryStreamExt;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

use crate::artifact::error::ResolveError;
use crate::artifact::registry::{ByteStream, PackageRegistry};
use crate::artifact::types::ArtifactDescriptor;

/// Characters that would change the meaning of a registry URL path
const RESERVED: &[char] = &['/', '?', '#', '%'];

/// Parse `owner/name@version`
pub fn parse_step_id(id: &str) -> Option<(&str, &str, &str)> {
    let (path, version) = id.rsplit_once('@')?;
    let (owner, name) = path.split_once('/')?;
    let valid = |part: &str| !part.is_empty() && !part.contains(RESERVED);
    if !(valid(owner) && valid(name) && valid(version)) {
        return None;
    }
    Some((owner, name, version))
}

/// Sibling path the content is streamed into before it is moved to `dest`
fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}

async fn write_stream(mut stream: ByteStream, path: &Path) -> Result<u64, ResolveError> {
    let mut file = tokio::fs::File::create(path).await?;

    let mut written = 0u64;
    while let Some(chunk) = stream.try_next().await? {
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;

    Ok(written)
}

/// Stream a resolved package's content into `dest`, returning the number of bytes written
///
/// `dest` only appears once the whole body has been written.
pub async fn download(
    registry: &dyn PackageRegistry,
    descriptor: &ArtifactDescriptor,
    dest: &Path,
) -> Result<u64, ResolveError> {
    let stream = registry.fetch_content(&descriptor.reference).await?;
    let partial = partial_path(dest);

    let written = match write_stream(stream, &partial).await {
        Ok(written) => written,
        Err(e) => {
            if let Err(remove_err) = tokio::fs::remove_file(&partial).await {
                warn!("Failed to remove {:?}: {}", partial, remove_err);
            }
            return Err(e);
        }
    };
    tokio::fs::rename(&partial, dest).await?;

    info!(
        "Downloaded {} ({} bytes) to {:?}",
        descriptor.name, written, dest
    );
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::error::RegistryError;
    use crate::artifact::registry::MockPackageRegistry;
    use bytes::Bytes;
    use chrono::{DateTime, Utc};
    use futures::StreamExt;
    use mockall::predicate::eq;
    use rstest::rstest;
    use tempfile::TempDir;

    #[rstest]
    #[case("acme/npm-install@1.2.0", Some(("acme", "npm-install", "1.2.0")))]
    #[case("acme/npm-install", None)]
    #[case("npm-install@1.2.0", None)]
    #[case("acme/@1.2.0", None)]
    #[case("acme/a/b@1.2.0", None)]
    #[case("acme/npm-install@", None)]
    #[case("acme/npm-install@1.2.0/../../admin", None)]
    #[case("acme/npm-install@1.2.0?raw=1", None)]
    #[case("acme/npm%2Finstall@1.2.0", None)]
    fn parse_step_id_returns_expected(
        #[case] id: &str,
        #[case] expected: Option<(&str, &str, &str)>,
    ) {
        assert_eq!(parse_step_id(id), expected);
    }

    fn descriptor() -> ArtifactDescriptor {
        ArtifactDescriptor::new(
            "acme/step",
            vec!["1.0.0".to_string()],
            DateTime::<Utc>::UNIX_EPOCH,
            "https://cdn.example.com/step.tar.gz",
        )
    }

    #[tokio::test]
    async fn download_writes_every_chunk() {
        let mut registry = MockPackageRegistry::new();
        registry
            .expect_fetch_content()
            .with(eq("https://cdn.example.com/step.tar.gz"))
            .returning(|_| {
                Ok(futures::stream::iter(vec![
                    Ok(Bytes::from_static(b"abc")),
                    Ok(Bytes::from_static(b"def")),
                ])
                .boxed())
            });
        let temp_dir = TempDir::new().unwrap();
        let dest = temp_dir.path().join("step.tar.gz");

        let written = download(&registry, &descriptor(), &dest).await.unwrap();

        assert_eq!(written, 6);
        assert_eq!(std::fs::read(&dest).unwrap(), b"abcdef".to_vec());
    }

    #[tokio::test]
    async fn download_propagates_registry_errors() {
        let mut registry = MockPackageRegistry::new();
        registry
            .expect_fetch_content()
            .returning(|reference| Err(RegistryError::NotFound(reference.to_string())));
        let temp_dir = TempDir::new().unwrap();
        let dest = temp_dir.path().join("step.tar.gz");

        let result = download(&registry, &descriptor(), &dest).await;

        assert!(matches!(
            result,
            Err(ResolveError::Registry(RegistryError::NotFound(_)))
        ));
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn download_leaves_nothing_behind_when_stream_fails_midway() {
        let mut registry = MockPackageRegistry::new();
        registry.expect_fetch_content().returning(|_| {
            Ok(futures::stream::iter(vec![
                Ok(Bytes::from_static(b"abc")),
                Err(RegistryError::MalformedResponse("connection reset".to_string())),
            ])
            .boxed())
        });
        let temp_dir = TempDir::new().unwrap();
        let dest = temp_dir.path().join("step.tar.gz");

        let result = download(&registry, &descriptor(), &dest).await;

        assert!(result.is_err());
        assert!(!dest.exists());
        assert!(!partial_path(&dest).exists());
    }

    #[tokio::test]
    async fn download_replaces_existing_file_only_on_success() {
        let mut registry = MockPackageRegistry::new();
        registry
            .expect_fetch_content()
            .returning(|_| Ok(futures::stream::iter(vec![Ok(Bytes::from_static(b"new"))]).boxed()));
        let temp_dir = TempDir::new().unwrap();
        let dest = temp_dir.path().join("step.tar.gz");
        std::fs::write(&dest, b"old").unwrap();

        download(&registry, &descriptor(), &dest).await.unwrap();

        assert_eq!(std::fs::read(&dest).unwrap(), b"new".to_vec());
        assert!(!partial_path(&dest).exists());
    }
}
