//! Candidate classification rules.

use crate::liveness::LivenessSet;
use crate::types::{Candidate, CandidateDetail, RefKind, SYSTEM_NAMESPACE};

use super::{KeepReason, PruneDecision};

/// Secret types the platform creates and rotates itself.
pub const MANAGED_SECRET_TYPES: &[&str] = &[
    "kubernetes.io/service-account-token",
    "kubernetes.io/dockercfg",
    "kubernetes.io/dockerconfigjson",
];

/// Returns `true` when `namespace` must not be pruned.
///
/// `ignore` is the raw comma-joined `--ignore-namespaces` value and the
/// test is substring containment, not list membership: `ignore = "prod-eu"`
/// also excludes `prod` and `eu`, and the empty namespace of a
/// cluster-scoped object is always contained.
pub fn namespace_excluded(namespace: &str, ignore: &str) -> bool {
    namespace == SYSTEM_NAMESPACE || ignore.contains(namespace)
}

/// Returns `true` for Secret types the platform manages.
pub fn is_managed_secret_type(secret_type: Option<&str>) -> bool {
    secret_type.is_some_and(|t| MANAGED_SECRET_TYPES.contains(&t))
}

/// Classify a candidate.
///
/// Rules apply in order: namespace exclusion, kind-specific exclusion,
/// liveness. Returns `None` for kinds this tool does not prune.
pub fn classify(candidate: &Candidate, liveness: &LivenessSet, ignore: &str) -> Option<PruneDecision> {
    if namespace_excluded(&candidate.namespace, ignore) {
        return Some(PruneDecision::Keep(KeepReason::NamespaceExcluded));
    }

    let kind = match &candidate.detail {
        CandidateDetail::ConfigMap => RefKind::ConfigMap,
        CandidateDetail::Secret { secret_type } => {
            if is_managed_secret_type(secret_type.as_deref()) {
                return Some(PruneDecision::Keep(KeepReason::SystemManaged));
            }
            RefKind::Secret
        }
        CandidateDetail::Other => return None,
    };

    if liveness.contains(kind, &candidate.key()) {
        Some(PruneDecision::Keep(KeepReason::Referenced))
    } else {
        Some(PruneDecision::Delete)
    }
}
