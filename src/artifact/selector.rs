//! Local candidate selection
//!
//! Picks the one local instance that represents a family under a policy:
//! - An explicit override wins outside production mode
//! - Production: the `latest`-tagged instance, else the newest `master`-tagged one
//! - Development: the newest instance regardless of tag
//!
//! Equal creation times are broken by encounter order: the first instance seen
//! at the maximum timestamp is kept.

use tracing::debug;

use crate::artifact::types::{ArtifactDescriptor, Mode, ResolutionPolicy};

pub const LATEST_TAG: &str = "latest";
pub const MASTER_TAG: &str = "master";

/// Result of candidate selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Operator-supplied reference, not yet looked up locally
    Override(String),
    /// Instance chosen from the catalog snapshot
    Candidate(ArtifactDescriptor),
    /// No acceptable local instance under the policy
    NoCandidate,
}

impl Selection {
    /// Reference to use for subsequent lookups
    pub fn reference(&self) -> Option<&str> {
        match self {
            Selection::Override(reference) => Some(reference),
            Selection::Candidate(descriptor) => Some(&descriptor.reference),
            Selection::NoCandidate => None,
        }
    }
}

#[derive(Default)]
struct Scan<'a> {
    tagged_latest: Option<&'a ArtifactDescriptor>,
    newest: Option<&'a ArtifactDescriptor>,
}

/// Keep `best` unless `candidate` is strictly newer
fn newer_of<'a>(
    best: Option<&'a ArtifactDescriptor>,
    candidate: &'a ArtifactDescriptor,
) -> Option<&'a ArtifactDescriptor> {
    match best {
        Some(best) if best.created_at >= candidate.created_at => Some(best),
        _ => Some(candidate),
    }
}

fn scan(artifacts: &[ArtifactDescriptor]) -> Scan<'_> {
    artifacts.iter().fold(Scan::default(), |scan, descriptor| Scan {
        // last one wins
        tagged_latest: if descriptor.has_tag(LATEST_TAG) {
            Some(descriptor)
        } else {
            scan.tagged_latest
        },
        newest: newer_of(scan.newest, descriptor),
    })
}

fn newest_with_tag<'a>(
    artifacts: &'a [ArtifactDescriptor],
    tag: &str,
) -> Option<&'a ArtifactDescriptor> {
    artifacts
        .iter()
        .filter(|descriptor| descriptor.has_tag(tag))
        .fold(None, newer_of)
}

/// Choose the authoritative local candidate from a catalog snapshot
pub fn select_candidate(artifacts: &[ArtifactDescriptor], policy: &ResolutionPolicy) -> Selection {
    if let Some(reference) = policy.effective_override() {
        debug!("Using override image {}", reference);
        return Selection::Override(reference.to_string());
    }

    let scan = scan(artifacts);

    let selected = match policy.mode {
        Mode::Production => scan
            .tagged_latest
            .or_else(|| newest_with_tag(artifacts, MASTER_TAG)),
        Mode::Development => scan.newest,
    };

    match selected {
        Some(descriptor) => Selection::Candidate(descriptor.clone()),
        None => Selection::NoCandidate,
    }
}
