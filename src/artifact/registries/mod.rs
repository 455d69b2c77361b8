//! Registry implementations for step packages and runner images

pub mod image;
pub mod step;

pub use image::ImageRegistryClient;
pub use step::StepRegistry;

use std::time::Duration;

use crate::config::{HTTP_TIMEOUT_SECS, USER_AGENT};

/// Builds the HTTP client shared by every registry implementation
fn build_client() -> reqwest::Client {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
        .build()
        .expect("Failed to create HTTP client")
}
