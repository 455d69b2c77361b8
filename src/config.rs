use serde::Deserialize;
use std::path::{Path, PathBuf};

// =============================================================================
// Registry defaults
// =============================================================================

/// Default base URL for the step package registry
pub const DEFAULT_STEP_REGISTRY_URL: &str = "https://app.wercker.com";

/// Default base URL for the runner image registry API
pub const DEFAULT_IMAGE_REGISTRY_URL: &str = "https://artifacts.us-ashburn-1.oci.oraclecloud.com";

/// Default prefix of pullable image references
pub const DEFAULT_IMAGE_HOST: &str = "iad.ocir.io/odx-pipelines";

/// Default runner image family
pub const DEFAULT_IMAGE_FAMILY: &str = "wercker/wercker-runner";

/// Default container runtime CLI
pub const DEFAULT_DOCKER_BINARY: &str = "docker";

// =============================================================================
// Transport
// =============================================================================

pub const USER_AGENT: &str = concat!("artifact-sync/", env!("CARGO_PKG_VERSION"));

/// Timeout for a single registry request in seconds
pub const HTTP_TIMEOUT_SECS: u64 = 30;

/// Environment variable holding the log filter
pub const LOG_ENV_VAR: &str = "ARTIFACT_SYNC_LOG";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Top-level configuration
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct SyncConfig {
    pub auth_token: Option<String>,
    pub registries: RegistriesConfig,
    pub docker: DockerConfig,
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct RegistriesConfig {
    pub steps: StepRegistryConfig,
    pub images: ImageRegistryConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct StepRegistryConfig {
    pub url: String,
}

impl Default for StepRegistryConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_STEP_REGISTRY_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ImageRegistryConfig {
    pub url: String,
    /// Prefix of pullable references, e.g. `registry.example.com/namespace`
    pub host: String,
    pub family: String,
}

impl Default for ImageRegistryConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_IMAGE_REGISTRY_URL.to_string(),
            host: DEFAULT_IMAGE_HOST.to_string(),
            family: DEFAULT_IMAGE_FAMILY.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct DockerConfig {
    pub binary: String,
}

impl Default for DockerConfig {
    fn default() -> Self {
        Self {
            binary: DEFAULT_DOCKER_BINARY.to_string(),
        }
    }
}

impl SyncConfig {
    /// Load from a JSON file, or defaults when no path is given
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Returns the path to the data directory for artifact-sync.
/// Uses $XDG_DATA_HOME/artifact-sync if XDG_DATA_HOME is set,
/// otherwise falls back to ~/.local/share/artifact-sync,
/// or ./artifact-sync if neither is available.
pub fn data_dir() -> PathBuf {
    data_dir_with_env(std::env::var("XDG_DATA_HOME").ok(), dirs::home_dir())
}

/// Returns the directory holding log files.
pub fn log_dir() -> PathBuf {
    data_dir().join("logs")
}

fn data_dir_with_env(xdg_data_home: Option<String>, home_dir: Option<PathBuf>) -> PathBuf {
    let data_dir = xdg_data_home
        .map(PathBuf::from)
        .or_else(|| home_dir.map(|home| home.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."));

    data_dir.join("artifact-sync")
}
