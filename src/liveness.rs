//! Liveness collection: which ConfigMaps, Secrets, and ServiceAccounts are
//! referenced by at least one pod in scope.
//!
//! The [`LivenessBuilder`] folds pods in one at a time and is consumed by
//! [`LivenessBuilder::freeze`]; the resulting [`LivenessSet`] has no
//! mutating API. Absence from the set means no evidence of use was found,
//! not proof of non-use.

use std::collections::BTreeSet;

use futures::TryStreamExt;
use tracing::{debug, info};

use crate::query::ListScope;
use crate::store::{ObjectStore, StoreError};
use crate::types::{EnvFromRef, ObjectKey, RefKind, VolumeSource, WorkloadSpec};

/// Frozen set of object keys referenced by scanned workloads, one set per kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LivenessSet {
    config_maps: BTreeSet<ObjectKey>,
    secrets: BTreeSet<ObjectKey>,
    service_accounts: BTreeSet<ObjectKey>,
}

impl LivenessSet {
    /// Returns `true` if some workload references `key` as `kind`.
    pub fn contains(&self, kind: RefKind, key: &ObjectKey) -> bool {
        self.keys(kind).contains(key)
    }

    /// Number of distinct referenced objects of `kind`.
    pub fn len(&self, kind: RefKind) -> usize {
        self.keys(kind).len()
    }

    /// Returns `true` when no reference of any kind was recorded.
    pub fn is_empty(&self) -> bool {
        self.config_maps.is_empty() && self.secrets.is_empty() && self.service_accounts.is_empty()
    }

    /// Referenced keys of `kind` in sorted order.
    pub fn iter(&self, kind: RefKind) -> impl Iterator<Item = &ObjectKey> {
        self.keys(kind).iter()
    }

    fn keys(&self, kind: RefKind) -> &BTreeSet<ObjectKey> {
        match kind {
            RefKind::ConfigMap => &self.config_maps,
            RefKind::Secret => &self.secrets,
            RefKind::ServiceAccount => &self.service_accounts,
        }
    }
}

/// Accumulates references while workloads are scanned.
#[derive(Debug, Default)]
pub struct LivenessBuilder {
    set: LivenessSet,
    workloads: usize,
}

impl LivenessBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record every reference `workload` makes.
    pub fn observe(&mut self, workload: &WorkloadSpec) {
        let ns = workload.namespace.as_str();

        for container in &workload.containers {
            for source in &container.env_from {
                match source {
                    EnvFromRef::ConfigMap { name } => self.mark(RefKind::ConfigMap, ns, name),
                    EnvFromRef::Secret { name } => self.mark(RefKind::Secret, ns, name),
                }
            }
            // Whole-object granularity: any referenced key keeps the ConfigMap.
            for var in &container.env {
                if let Some(key_ref) = &var.value_from {
                    self.mark(RefKind::ConfigMap, ns, &key_ref.name);
                }
            }
        }

        for volume in &workload.volumes {
            match &volume.source {
                Some(VolumeSource::ConfigMap { name }) => self.mark(RefKind::ConfigMap, ns, name),
                Some(VolumeSource::Secret { secret_name }) => {
                    self.mark(RefKind::Secret, ns, secret_name)
                }
                None => {}
            }
        }

        self.mark(
            RefKind::ServiceAccount,
            ns,
            workload.effective_service_account(),
        );
        self.workloads = self.workloads.saturating_add(1);
    }

    fn mark(&mut self, kind: RefKind, namespace: &str, name: &str) {
        let key = ObjectKey::new(namespace, name);
        let keys = match kind {
            RefKind::ConfigMap => &mut self.set.config_maps,
            RefKind::Secret => &mut self.set.secrets,
            RefKind::ServiceAccount => &mut self.set.service_accounts,
        };
        keys.insert(key);
    }

    /// Number of workloads observed so far.
    pub fn workloads(&self) -> usize {
        self.workloads
    }

    /// Finish collection and return the immutable set.
    pub fn freeze(self) -> LivenessSet {
        self.set
    }
}

/// Build the liveness set from every workload in `scope`.
///
/// # Errors
///
/// Returns the first store error, including a workload that fails to
/// decode. No partial set is ever returned.
pub async fn collect<S>(store: &S, scope: &ListScope) -> Result<LivenessSet, StoreError>
where
    S: ObjectStore + ?Sized,
{
    let builder = store
        .list_workloads(scope)
        .try_fold(LivenessBuilder::new(), |mut builder, workload| async move {
            debug!(namespace = %workload.namespace, pod = %workload.name, "scanning workload");
            builder.observe(&workload);
            Ok(builder)
        })
        .await?;

    let workloads = builder.workloads();
    let set = builder.freeze();
    info!(
        workloads,
        config_maps = set.len(RefKind::ConfigMap),
        secrets = set.len(RefKind::Secret),
        service_accounts = set.len(RefKind::ServiceAccount),
        "liveness collected"
    );
    Ok(set)
}
