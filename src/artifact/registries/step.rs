//! Step package registry implementation

use chrono::{DateTime, Utc};
use futures::StreamExt;
use reqwest::{IntoUrl, Url};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::artifact::error::RegistryError;
use crate::artifact::registries::build_client;
use crate::artifact::registry::{ByteStream, PackageRegistry};
use crate::artifact::types::ArtifactDescriptor;
use crate::config::DEFAULT_STEP_REGISTRY_URL;

/// Response from the step version endpoint
#[derive(Debug, Deserialize)]
struct StepVersionResponse {
    step: StepBody,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StepBody {
    summary: String,
    tarball_url: String,
    version: StepVersionNumber,
}

#[derive(Debug, Deserialize)]
struct StepVersionNumber {
    number: String,
}

/// Registry implementation for the step package API
pub struct StepRegistry {
    client: reqwest::Client,
    base_url: String,
    auth_token: Option<String>,
}

impl StepRegistry {
    /// Creates a new StepRegistry with a custom base URL
    pub fn new(base_url: &str, auth_token: Option<String>) -> Self {
        Self {
            client: build_client(),
            base_url: base_url.trim_end_matches('/').to_string(),
            auth_token,
        }
    }

    /// Build `{base}/api/steps/{owner}/{name}/{version}` with each part encoded as one segment
    fn step_url(&self, owner: &str, name: &str, version: &str) -> Result<Url, RegistryError> {
        let mut url =
            Url::parse(&self.base_url).map_err(|e| RegistryError::InvalidUrl(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| RegistryError::InvalidUrl(self.base_url.clone()))?
            .pop_if_empty()
            .extend(["api", "steps", owner, name, version]);
        Ok(url)
    }

    fn get(&self, url: impl IntoUrl) -> reqwest::RequestBuilder {
        let request = self.client.get(url);
        match &self.auth_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

impl Default for StepRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_STEP_REGISTRY_URL, None)
    }
}

#[async_trait::async_trait]
impl PackageRegistry for StepRegistry {
    async fn resolve_version(
        &self,
        owner: &str,
        name: &str,
        version: &str,
    ) -> Result<ArtifactDescriptor, RegistryError> {
        let url = self.step_url(owner, name, version)?;
        debug!("Resolving step {}/{}@{}", owner, name, version);

        let response = self.get(url.clone()).send().await?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            warn!("Step registry returned status {}: {}", status, url);
            return Err(RegistryError::NotFound(format!(
                "{}/{}@{} ({})",
                owner, name, version, status
            )));
        }

        let body = response.bytes().await?;
        let parsed: StepVersionResponse = serde_json::from_slice(&body).map_err(|e| {
            warn!("Failed to parse step registry response: {}", e);
            RegistryError::MalformedResponse(e.to_string())
        })?;

        let step = parsed.step;
        Ok(ArtifactDescriptor::new(
            format!("{}/{}", owner, name),
            vec![step.version.number],
            DateTime::<Utc>::UNIX_EPOCH,
            step.tarball_url,
        )
        .with_description(step.summary))
    }

    async fn fetch_content(&self, reference: &str) -> Result<ByteStream, RegistryError> {
        let response = self.get(reference).send().await?;

        let status = response.status();
        if !status.is_success() {
            warn!("Tarball download returned status {}: {}", status, reference);
            return Err(RegistryError::NotFound(format!("{} ({})", reference, status)));
        }

        Ok(response
            .bytes_stream()
            .map(|chunk| chunk.map_err(RegistryError::from))
            .boxed())
    }
}
