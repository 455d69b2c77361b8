//! Resolution coordinator for one artifact family
//!
//! Groups the local catalog and the image registry that together feed the
//! reconciliation engine, and applies the resulting decision.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::artifact::catalog::LocalCatalog;
use crate::artifact::engine::reconcile;
use crate::artifact::error::ResolveError;
use crate::artifact::fetcher::Fetcher;
use crate::artifact::registry::ImageRegistry;
use crate::artifact::selector::{Selection, select_candidate};
use crate::artifact::types::{ArtifactDescriptor, Decision, Mode, ResolutionPolicy};

/// Everything a resolution pass found, plus the engine's verdict
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub selection: Selection,
    pub local: Option<ArtifactDescriptor>,
    pub remote: Option<ArtifactDescriptor>,
    pub decision: Decision,
}

pub struct ArtifactResolver {
    catalog: Arc<dyn LocalCatalog>,
    registry: Arc<dyn ImageRegistry>,
}

impl ArtifactResolver {
    pub fn new(catalog: Arc<dyn LocalCatalog>, registry: Arc<dyn ImageRegistry>) -> Self {
        Self { catalog, registry }
    }

    /// Select the local candidate, query the remote and reconcile them
    ///
    /// Registry and catalog failures propagate unchanged; an `Unresolvable`
    /// outcome is returned as a decision for the caller to act on.
    pub async fn resolve(
        &self,
        family: &str,
        policy: &ResolutionPolicy,
    ) -> Result<Resolution, ResolveError> {
        if policy.mode == Mode::Production && policy.explicit_override.is_some() {
            warn!("Ignoring image override in production mode");
        }

        let artifacts = match policy.effective_override() {
            Some(_) => Vec::new(),
            None => self.list_local(family).await?,
        };
        let selection = select_candidate(&artifacts, policy);

        let local = match &selection {
            Selection::Override(reference) => {
                let found = self.inspect_local(reference).await?;
                if found.is_none() {
                    warn!("Override image {} is not present locally", reference);
                }
                found
            }
            Selection::Candidate(descriptor) => Some(descriptor.clone()),
            Selection::NoCandidate => {
                debug!("No acceptable local artifact for {}", family);
                None
            }
        };

        let remote = self.registry.resolve_latest_image(family).await?;
        let decision = reconcile(local.as_ref(), remote.as_ref(), policy);
        debug!("Resolved {} to {:?}", family, decision);

        Ok(Resolution {
            selection,
            local,
            remote,
            decision,
        })
    }

    /// Catalog calls may block on the container runtime, so they run off the async workers
    async fn list_local(&self, family: &str) -> Result<Vec<ArtifactDescriptor>, ResolveError> {
        let catalog = Arc::clone(&self.catalog);
        let family = family.to_string();
        Ok(tokio::task::spawn_blocking(move || catalog.list_artifacts(&family)).await??)
    }

    async fn inspect_local(
        &self,
        reference: &str,
    ) -> Result<Option<ArtifactDescriptor>, ResolveError> {
        let catalog = Arc::clone(&self.catalog);
        let reference = reference.to_string();
        Ok(tokio::task::spawn_blocking(move || catalog.inspect(&reference)).await??)
    }

    /// Act on a resolution
    ///
    /// Returns the local artifact to use afterwards. `Fetch` pulls the remote
    /// and re-inspects it; `Unresolvable` becomes an error.
    pub async fn apply(
        &self,
        resolution: Resolution,
        fetcher: &dyn Fetcher,
    ) -> Result<Option<ArtifactDescriptor>, ResolveError> {
        match resolution.decision {
            Decision::Fetch(remote) => {
                fetcher.pull(&remote.reference).await?;
                let refreshed = fetcher.inspect(&remote.reference).await?;
                info!("Local artifact is now {}", remote.reference);
                Ok(refreshed)
            }
            Decision::Unresolvable(reason) => Err(ResolveError::Unresolvable(reason)),
            Decision::UpToDate | Decision::Advise(_) => Ok(resolution.local),
        }
    }
}
