//! Common types for artifact resolution

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// One local or remote instance of an artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactDescriptor {
    /// Family name (image repository or `owner/name` for step packages)
    pub name: String,
    /// Labels attached to this instance, possibly none
    pub tags: Vec<String>,
    /// Creation or publication time, only ever compared against other descriptors
    pub created_at: DateTime<Utc>,
    /// Locator that maps to exactly one fetch (image reference or download URL)
    pub reference: String,
    /// Registry summary, only set for step packages
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ArtifactDescriptor {
    pub fn new(
        name: impl Into<String>,
        tags: Vec<String>,
        created_at: DateTime<Utc>,
        reference: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            tags,
            created_at,
            reference: reference.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Check whether this instance carries the given tag
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// Deployment mode deciding which local tags are trusted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Only `latest`, then `master` tagged images are eligible
    Production,
    /// Newest image wins regardless of tag
    #[default]
    Development,
}

/// Operator policy for a single resolution pass
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResolutionPolicy {
    pub mode: Mode,
    /// Operator-supplied reference, honored only outside production mode
    pub explicit_override: Option<String>,
    /// Whether a newer remote may be fetched without asking
    pub auto_fetch: bool,
}

impl ResolutionPolicy {
    /// Returns the override to use, if the mode allows one and it is non-empty
    pub fn effective_override(&self) -> Option<&str> {
        match self.mode {
            Mode::Production => None,
            Mode::Development => self
                .explicit_override
                .as_deref()
                .filter(|reference| !reference.is_empty()),
        }
    }
}

/// Why neither side could supply an artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnresolvableReason {
    /// No local artifact and nothing published remotely
    NoLocalNoRemote,
    /// Remote has an artifact but fetching was not authorized
    NoLocalFetchRequired,
}

impl fmt::Display for UnresolvableReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnresolvableReason::NoLocalNoRemote => write!(f, "no local, no remote"),
            UnresolvableReason::NoLocalFetchRequired => {
                write!(f, "no local artifact; fetch required")
            }
        }
    }
}

/// Outcome of reconciling a local candidate against the remote
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Nothing to do
    UpToDate,
    /// Remote is newer but fetching was not authorized
    Advise(ArtifactDescriptor),
    /// Remote should be retrieved
    Fetch(ArtifactDescriptor),
    /// Terminal: no usable artifact on either side
    Unresolvable(UnresolvableReason),
}
