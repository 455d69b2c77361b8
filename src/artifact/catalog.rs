//! Local artifact catalog backed by the container runtime's image store

use std::process::Command;

use chrono::{DateTime, Utc};
#[cfg(test)]
use mockall::automock;
use serde::Deserialize;
use tracing::debug;

use crate::artifact::error::CatalogError;
use crate::artifact::types::ArtifactDescriptor;

/// Trait for enumerating locally cached artifacts
///
/// Every call returns a fresh snapshot; implementations never mutate the store.
#[cfg_attr(test, automock)]
pub trait LocalCatalog: Send + Sync {
    /// List every local instance whose name belongs to the family
    fn list_artifacts(&self, family: &str) -> Result<Vec<ArtifactDescriptor>, CatalogError>;

    /// Describe one local instance by its exact reference
    fn inspect(&self, reference: &str) -> Result<Option<ArtifactDescriptor>, CatalogError>;
}

/// One line of `docker image ls --format '{{json .}}'`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ImageListEntry {
    repository: String,
    tag: String,
    created_at: String,
}

/// Output of `docker image inspect --format '{{json .}}'`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ImageInspectEntry {
    #[serde(default)]
    repo_tags: Vec<String>,
    created: DateTime<Utc>,
}

/// Catalog reading images through the docker CLI
pub struct DockerCatalog {
    binary: String,
}

impl DockerCatalog {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    fn run(&self, args: &[&str]) -> Result<std::process::Output, CatalogError> {
        let command = format!("{} {}", self.binary, args.join(" "));
        debug!("Running {}", command);
        Command::new(&self.binary)
            .args(args)
            .output()
            .map_err(|source| CatalogError::Spawn { command, source })
    }
}

impl Default for DockerCatalog {
    fn default() -> Self {
        Self::new("docker")
    }
}

impl LocalCatalog for DockerCatalog {
    fn list_artifacts(&self, family: &str) -> Result<Vec<ArtifactDescriptor>, CatalogError> {
        let output = self.run(&[
            "image",
            "ls",
            "--all",
            "--no-trunc",
            "--filter",
            "dangling=false",
            "--format",
            "{{json .}}",
        ])?;

        if !output.status.success() {
            return Err(CatalogError::CommandFailed {
                command: format!("{} image ls", self.binary),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let artifacts = parse_image_list(&String::from_utf8_lossy(&output.stdout), family)?;
        debug!("Found {} local images for {}", artifacts.len(), family);
        Ok(artifacts)
    }

    fn inspect(&self, reference: &str) -> Result<Option<ArtifactDescriptor>, CatalogError> {
        let output = self.run(&["image", "inspect", "--format", "{{json .}}", "--", reference])?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if stderr.contains("No such image") || stderr.contains("No such object") {
                return Ok(None);
            }
            return Err(CatalogError::CommandFailed {
                command: format!("{} image inspect", self.binary),
                stderr: stderr.trim().to_string(),
            });
        }

        parse_inspect(&String::from_utf8_lossy(&output.stdout), reference).map(Some)
    }
}

/// Check whether a repository belongs to the family, with or without a registry prefix
pub fn matches_family(repository: &str, family: &str) -> bool {
    repository == family
        || repository
            .strip_suffix(family)
            .is_some_and(|prefix| prefix.ends_with('/'))
}

/// Split `host:port/repo:tag` into repository and optional tag
pub fn split_reference(reference: &str) -> (&str, Option<&str>) {
    match reference.rsplit_once(':') {
        Some((repository, tag)) if !tag.contains('/') => (repository, Some(tag)),
        _ => (reference, None),
    }
}

/// Parse `CreatedAt` as printed by the docker CLI, e.g. `2024-03-01 10:00:00 +0000 UTC`
fn parse_created_at(value: &str) -> Result<DateTime<Utc>, CatalogError> {
    let without_zone_name = value.split_whitespace().take(3).collect::<Vec<_>>().join(" ");
    DateTime::parse_from_str(&without_zone_name, "%Y-%m-%d %H:%M:%S %z")
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| CatalogError::InvalidEntry(format!("created at {:?}: {}", value, e)))
}

fn parse_image_list(output: &str, family: &str) -> Result<Vec<ArtifactDescriptor>, CatalogError> {
    output
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            serde_json::from_str::<ImageListEntry>(line)
                .map_err(|e| CatalogError::InvalidEntry(e.to_string()))
        })
        .filter(|entry| match entry {
            Ok(entry) => entry.tag != "<none>" && matches_family(&entry.repository, family),
            Err(_) => true,
        })
        .map(|entry| -> Result<ArtifactDescriptor, CatalogError> {
            let entry = entry?;
            let created_at = parse_created_at(&entry.created_at)?;
            let reference = format!("{}:{}", entry.repository, entry.tag);
            Ok(ArtifactDescriptor::new(
                entry.repository,
                vec![entry.tag],
                created_at,
                reference,
            ))
        })
        .collect()
}

fn parse_inspect(output: &str, reference: &str) -> Result<ArtifactDescriptor, CatalogError> {
    let entry: ImageInspectEntry = serde_json::from_str(output.trim())
        .map_err(|e| CatalogError::InvalidEntry(e.to_string()))?;

    let (repository, _) = split_reference(reference);
    let tags = entry
        .repo_tags
        .iter()
        .filter_map(|repo_tag| match split_reference(repo_tag) {
            (repo, Some(tag)) if repo == repository => Some(tag.to_string()),
            _ => None,
        })
        .collect();

    Ok(ArtifactDescriptor::new(
        repository,
        tags,
        entry.created,
        reference,
    ))
}
