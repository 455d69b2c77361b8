//! Container image registry implementation

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::artifact::error::RegistryError;
use crate::artifact::registries::build_client;
use crate::artifact::registry::ImageRegistry;
use crate::artifact::types::ArtifactDescriptor;
use crate::config::{DEFAULT_IMAGE_HOST, DEFAULT_IMAGE_REGISTRY_URL};

/// Response from the image listing endpoint
#[derive(Debug, Deserialize)]
struct ImageListResponse {
    #[serde(default)]
    items: Vec<ImageSummary>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImageSummary {
    repository_name: String,
    version: String,
    time_created: DateTime<Utc>,
}

/// Registry implementation for the runner image repository
pub struct ImageRegistryClient {
    client: reqwest::Client,
    base_url: String,
    image_host: String,
    auth_token: Option<String>,
}

impl ImageRegistryClient {
    /// Creates a new client
    ///
    /// `image_host` prefixes every returned reference, e.g. `registry.example.com/namespace`.
    pub fn new(base_url: &str, image_host: &str, auth_token: Option<String>) -> Self {
        Self {
            client: build_client(),
            base_url: base_url.trim_end_matches('/').to_string(),
            image_host: image_host.trim_end_matches('/').to_string(),
            auth_token,
        }
    }
}

impl Default for ImageRegistryClient {
    fn default() -> Self {
        Self::new(DEFAULT_IMAGE_REGISTRY_URL, DEFAULT_IMAGE_HOST, None)
    }
}

#[async_trait::async_trait]
impl ImageRegistry for ImageRegistryClient {
    async fn resolve_latest_image(
        &self,
        family: &str,
    ) -> Result<Option<ArtifactDescriptor>, RegistryError> {
        let url = reqwest::Url::parse_with_params(
            &format!("{}/20180419/container/images", self.base_url),
            &[
                ("repositoryName", family),
                ("sortBy", "TIMECREATED"),
                ("sortOrder", "DESC"),
                ("limit", "1"),
            ],
        )
        .map_err(|e| RegistryError::InvalidUrl(e.to_string()))?;
        debug!("Querying latest image for {}", family);

        let mut request = self.client.get(url.clone());
        if let Some(token) = &self.auth_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;

        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(RegistryError::NotFound(family.to_string()));
        }

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok());
            return Err(RegistryError::RateLimited {
                retry_after_secs: retry_after,
            });
        }

        if !status.is_success() {
            warn!("Image registry returned status {}: {}", status, url);
            return Err(RegistryError::Status(status));
        }

        let body = response.bytes().await?;
        let listing: ImageListResponse = serde_json::from_slice(&body).map_err(|e| {
            warn!("Failed to parse image registry response: {}", e);
            RegistryError::MalformedResponse(e.to_string())
        })?;

        let Some(image) = listing.items.into_iter().next() else {
            debug!("No published image for {}", family);
            return Ok(None);
        };

        let reference = format!(
            "{}/{}:{}",
            self.image_host, image.repository_name, image.version
        );

        Ok(Some(ArtifactDescriptor::new(
            image.repository_name,
            vec![image.version],
            image.time_created,
            reference,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use mockito::{Matcher, Server};

    fn listing_query() -> Matcher {
        Matcher::AllOf(vec![
            Matcher::UrlEncoded("repositoryName".into(), "runner".into()),
            Matcher::UrlEncoded("sortOrder".into(), "DESC".into()),
            Matcher::UrlEncoded("limit".into(), "1".into()),
        ])
    }

    #[tokio::test]
    async fn resolve_latest_image_returns_first_item() {
        let mut server = Server::new_async().await;

        let mock = server
            .mock("GET", "/20180419/container/images")
            .match_query(listing_query())
            .match_header("authorization", "Bearer token")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{
                    "items": [
                        {"repositoryName": "runner", "version": "2024.03.01", "timeCreated": "2024-03-01T10:00:00Z"}
                    ]
                }"#,
            )
            .create_async()
            .await;

        let registry =
            ImageRegistryClient::new(&server.url(), "registry.example.com/ns", Some("token".into()));
        let result = registry.resolve_latest_image("runner").await.unwrap();

        mock.assert_async().await;
        assert_eq!(
            result,
            Some(ArtifactDescriptor::new(
                "runner",
                vec!["2024.03.01".to_string()],
                Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap(),
                "registry.example.com/ns/runner:2024.03.01",
            ))
        );
    }

    #[tokio::test]
    async fn resolve_latest_image_returns_none_when_nothing_published() {
        let mut server = Server::new_async().await;

        let mock = server
            .mock("GET", "/20180419/container/images")
            .match_query(listing_query())
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"items": []}"#)
            .create_async()
            .await;

        let registry = ImageRegistryClient::new(&server.url(), "registry.example.com/ns", None);
        let result = registry.resolve_latest_image("runner").await.unwrap();

        mock.assert_async().await;
        assert_eq!(result, None);
    }

    #[tokio::test]
    async fn resolve_latest_image_returns_not_found_for_unknown_repository() {
        let mut server = Server::new_async().await;

        let mock = server
            .mock("GET", "/20180419/container/images")
            .match_query(listing_query())
            .with_status(404)
            .create_async()
            .await;

        let registry = ImageRegistryClient::new(&server.url(), "registry.example.com/ns", None);
        let result = registry.resolve_latest_image("runner").await;

        mock.assert_async().await;
        assert!(matches!(result, Err(RegistryError::NotFound(_))));
    }

    #[tokio::test]
    async fn resolve_latest_image_returns_rate_limited_for_429() {
        let mut server = Server::new_async().await;

        let mock = server
            .mock("GET", "/20180419/container/images")
            .match_query(listing_query())
            .with_status(429)
            .with_header("retry-after", "30")
            .create_async()
            .await;

        let registry = ImageRegistryClient::new(&server.url(), "registry.example.com/ns", None);
        let result = registry.resolve_latest_image("runner").await;

        mock.assert_async().await;
        assert!(matches!(
            result,
            Err(RegistryError::RateLimited {
                retry_after_secs: Some(30)
            })
        ));
    }

    #[tokio::test]
    async fn resolve_latest_image_reports_status_for_rejected_token() {
        let mut server = Server::new_async().await;

        let mock = server
            .mock("GET", "/20180419/container/images")
            .match_query(listing_query())
            .with_status(401)
            .with_body(r#"{"code": "NotAuthenticated"}"#)
            .create_async()
            .await;

        let registry =
            ImageRegistryClient::new(&server.url(), "registry.example.com/ns", Some("expired".into()));
        let result = registry.resolve_latest_image("runner").await;

        mock.assert_async().await;
        assert!(matches!(
            result,
            Err(RegistryError::Status(reqwest::StatusCode::UNAUTHORIZED))
        ));
    }

    #[tokio::test]
    async fn resolve_latest_image_reports_status_for_server_error() {
        let mut server = Server::new_async().await;

        let mock = server
            .mock("GET", "/20180419/container/images")
            .match_query(listing_query())
            .with_status(503)
            .create_async()
            .await;

        let registry = ImageRegistryClient::new(&server.url(), "registry.example.com/ns", None);
        let result = registry.resolve_latest_image("runner").await;

        mock.assert_async().await;
        assert!(matches!(
            result,
            Err(RegistryError::Status(reqwest::StatusCode::SERVICE_UNAVAILABLE))
        ));
    }

    #[tokio::test]
    async fn resolve_latest_image_returns_malformed_response_for_bad_timestamp() {
        let mut server = Server::new_async().await;

        let mock = server
            .mock("GET", "/20180419/container/images")
            .match_query(listing_query())
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"items": [{"repositoryName": "runner", "version": "x", "timeCreated": "yesterday"}]}"#,
            )
            .create_async()
            .await;

        let registry = ImageRegistryClient::new(&server.url(), "registry.example.com/ns", None);
        let result = registry.resolve_latest_image("runner").await;

        mock.assert_async().await;
        assert!(matches!(result, Err(RegistryError::MalformedResponse(_))));
    }
}
