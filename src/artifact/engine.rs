//! Reconciliation of a local candidate against the remote registry

use crate::artifact::types::{ArtifactDescriptor, Decision, ResolutionPolicy, UnresolvableReason};

/// Command the operator runs to retrieve a newer remote artifact
pub const PULL_REMEDIATION: &str = "artifact-sync resolve --pull";

/// Decide what to do given the selected local artifact and the remote one
///
/// Pure function of its inputs: identical arguments always produce the same decision.
pub fn reconcile(
    local: Option<&ArtifactDescriptor>,
    remote: Option<&ArtifactDescriptor>,
    policy: &ResolutionPolicy,
) -> Decision {
    match (local, remote) {
        (Some(_), None) => Decision::UpToDate,
        (None, None) => Decision::Unresolvable(UnresolvableReason::NoLocalNoRemote),
        (None, Some(remote)) if policy.auto_fetch => Decision::Fetch(remote.clone()),
        (None, Some(_)) => Decision::Unresolvable(UnresolvableReason::NoLocalFetchRequired),
        (Some(local), Some(remote)) => {
            // A newer timestamp on the same reference is not a different artifact
            let newer = remote.created_at > local.created_at && remote.reference != local.reference;
            match (newer, policy.auto_fetch) {
                (true, true) => Decision::Fetch(remote.clone()),
                (true, false) => Decision::Advise(remote.clone()),
                (false, _) => Decision::UpToDate,
            }
        }
    }
}

/// Operator-facing description of a decision
pub fn summarize(decision: &Decision, local: Option<&ArtifactDescriptor>) -> String {
    match decision {
        Decision::UpToDate => match local {
            Some(local) => format!(
                "Local artifact is up-to-date. Image: {}, created: {}",
                local.reference, local.created_at
            ),
            None => "Local artifact is up-to-date.".to_string(),
        },
        Decision::Advise(remote) => format!(
            "There is a newer artifact available. Image: {}, created: {}. Execute \"{}\" to update your system.",
            remote.reference, remote.created_at, PULL_REMEDIATION
        ),
        Decision::Fetch(remote) => format!(
            "Fetching {}, created: {}",
            remote.reference, remote.created_at
        ),
        Decision::Unresolvable(reason @ UnresolvableReason::NoLocalFetchRequired) => format!(
            "Unresolvable: {} (missing: local). Execute \"{}\" to pull the required artifact.",
            reason, PULL_REMEDIATION
        ),
        Decision::Unresolvable(reason @ UnresolvableReason::NoLocalNoRemote) => format!(
            "Unresolvable: {} (missing: local and remote).",
            reason
        ),
    }
}
