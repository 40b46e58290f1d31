//! Core types shared by the liveness collector and the prune engine.
//!
//! Pods are reduced to [`WorkloadSpec`], keeping only the reference shapes
//! that count as evidence of use. Objects
//! returned by a prune query become [`Candidate`]s.

use std::fmt;

use k8s_openapi::api::core::v1::{Container, Pod, Volume};

/// Namespace whose objects are never pruned.
pub const SYSTEM_NAMESPACE: &str = "kube-system";

/// Service account a pod runs as when its spec names none.
pub const DEFAULT_SERVICE_ACCOUNT: &str = "default";

// ---------------------------------------------------------------------------
// Identities
// ---------------------------------------------------------------------------

/// Kind of object a workload can reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RefKind {
    /// `v1/ConfigMap`.
    ConfigMap,
    /// `v1/Secret`.
    Secret,
    /// `v1/ServiceAccount`.
    ServiceAccount,
}

impl fmt::Display for RefKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            Self::ConfigMap => "ConfigMap",
            Self::Secret => "Secret",
            Self::ServiceAccount => "ServiceAccount",
        };
        f.write_str(kind)
    }
}

/// Namespace-qualified object name, displayed as `<namespace>/<name>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectKey {
    /// Namespace; empty for cluster-scoped objects.
    pub namespace: String,
    /// Object name.
    pub name: String,
}

impl ObjectKey {
    /// Build a key from a namespace and a name.
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Group/version/kind of a listed resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceKind {
    /// API group; empty for the core group.
    pub group: String,
    /// API version within the group.
    pub version: String,
    /// Kind, e.g. `ConfigMap`.
    pub kind: String,
}

impl ResourceKind {
    /// Core-group (`v1`) resource of the given kind.
    pub fn core(kind: &str) -> Self {
        Self {
            group: String::new(),
            version: "v1".to_owned(),
            kind: kind.to_owned(),
        }
    }

    /// Lowercase kind qualified by its group, as kubectl prints it
    /// (`configmap`, `deployment.apps`).
    pub fn qualified_name(&self) -> String {
        let kind = self.kind.to_lowercase();
        if self.group.is_empty() {
            kind
        } else {
            format!("{kind}.{}", self.group)
        }
    }

    /// Returns `true` for a core-group resource of `kind`.
    pub fn is_core(&self, kind: &str) -> bool {
        self.group.is_empty() && self.kind == kind
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.group.is_empty() {
            write!(f, "{}/{}", self.version, self.kind)
        } else {
            write!(f, "{}/{}/{}", self.group, self.version, self.kind)
        }
    }
}

// ---------------------------------------------------------------------------
// Workloads
// ---------------------------------------------------------------------------

/// Pod specification reduced to the fields that reference other objects.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkloadSpec {
    /// Pod namespace.
    pub namespace: String,
    /// Pod name.
    pub name: String,
    /// Regular containers in declaration order.
    pub containers: Vec<ContainerSpec>,
    /// Pod volumes.
    pub volumes: Vec<VolumeSpec>,
    /// Service account name; empty means [`DEFAULT_SERVICE_ACCOUNT`].
    pub service_account_name: String,
}

/// References made by a single container.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerSpec {
    /// Container name.
    pub name: String,
    /// Whole-object environment imports.
    pub env_from: Vec<EnvFromRef>,
    /// Individual environment variables.
    pub env: Vec<EnvVar>,
}

/// Object imported wholesale through `envFrom`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvFromRef {
    /// `envFrom[].configMapRef`.
    ConfigMap {
        /// Referenced ConfigMap.
        name: String,
    },
    /// `envFrom[].secretRef`.
    Secret {
        /// Referenced Secret.
        name: String,
    },
}

/// Environment variable, possibly sourced from a ConfigMap key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvVar {
    /// Variable name.
    pub name: String,
    /// ConfigMap key the value comes from, if any.
    pub value_from: Option<ConfigMapKeyRef>,
}

/// `valueFrom.configMapKeyRef` of an environment variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigMapKeyRef {
    /// Referenced ConfigMap.
    pub name: String,
    /// Key within the ConfigMap.
    pub key: String,
}

/// A pod volume.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeSpec {
    /// Volume name.
    pub name: String,
    /// Object backing the volume, when it is a ConfigMap or Secret.
    pub source: Option<VolumeSource>,
}

/// Object-backed volume source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VolumeSource {
    /// `volumes[].configMap`.
    ConfigMap {
        /// Referenced ConfigMap.
        name: String,
    },
    /// `volumes[].secret`.
    Secret {
        /// Referenced Secret.
        secret_name: String,
    },
}

impl WorkloadSpec {
    /// Reduce a pod to its references.
    ///
    /// A pod without a spec references nothing but the default service account.
    pub fn from_pod(pod: &Pod) -> Self {
        let spec = pod.spec.as_ref();
        Self {
            namespace: pod.metadata.namespace.clone().unwrap_or_default(),
            name: pod.metadata.name.clone().unwrap_or_default(),
            containers: spec
                .map(|s| s.containers.iter().map(ContainerSpec::from_container).collect())
                .unwrap_or_default(),
            volumes: spec
                .and_then(|s| s.volumes.as_ref())
                .map(|volumes| volumes.iter().map(VolumeSpec::from_volume).collect())
                .unwrap_or_default(),
            service_account_name: spec
                .and_then(|s| s.service_account_name.clone())
                .unwrap_or_default(),
        }
    }

    /// Service account the pod runs as, with the empty name resolved to
    /// [`DEFAULT_SERVICE_ACCOUNT`].
    pub fn effective_service_account(&self) -> &str {
        if self.service_account_name.is_empty() {
            DEFAULT_SERVICE_ACCOUNT
        } else {
            &self.service_account_name
        }
    }
}

impl ContainerSpec {
    fn from_container(container: &Container) -> Self {
        let mut env_from = Vec::new();
        for source in container.env_from.iter().flatten() {
            if let Some(cm) = &source.config_map_ref {
                env_from.push(EnvFromRef::ConfigMap {
                    name: cm.name.clone(),
                });
            }
            if let Some(secret) = &source.secret_ref {
                env_from.push(EnvFromRef::Secret {
                    name: secret.name.clone(),
                });
            }
        }

        let env = container
            .env
            .iter()
            .flatten()
            .map(|var| EnvVar {
                name: var.name.clone(),
                value_from: var
                    .value_from
                    .as_ref()
                    .and_then(|v| v.config_map_key_ref.as_ref())
                    .map(|r| ConfigMapKeyRef {
                        name: r.name.clone(),
                        key: r.key.clone(),
                    }),
            })
            .collect();

        Self {
            name: container.name.clone(),
            env_from,
            env,
        }
    }
}

impl VolumeSpec {
    fn from_volume(volume: &Volume) -> Self {
        let source = match (&volume.config_map, &volume.secret) {
            (Some(cm), _) => Some(VolumeSource::ConfigMap {
                name: cm.name.clone(),
            }),
            (None, Some(secret)) => Some(VolumeSource::Secret {
                secret_name: secret.secret_name.clone().unwrap_or_default(),
            }),
            (None, None) => None,
        };
        Self {
            name: volume.name.clone(),
            source,
        }
    }
}

// ---------------------------------------------------------------------------
// Candidates
// ---------------------------------------------------------------------------

/// Kind-specific data decoded from a candidate object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CandidateDetail {
    /// A core ConfigMap.
    ConfigMap,
    /// A core Secret and its `type` field.
    Secret {
        /// Secret type, e.g. `Opaque`; `None` when unset.
        secret_type: Option<String>,
    },
    /// Any other resource; not prunable.
    Other,
}

/// An object returned by the prune query, awaiting classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Resource the object belongs to.
    pub resource: ResourceKind,
    /// Object namespace; empty when cluster-scoped.
    pub namespace: String,
    /// Object name.
    pub name: String,
    /// Kind-specific metadata.
    pub detail: CandidateDetail,
    /// Query argument that produced this object, used in error context.
    pub source: String,
}

impl Candidate {
    /// Namespace-qualified key used for liveness lookups.
    pub fn key(&self) -> ObjectKey {
        ObjectKey::new(self.namespace.clone(), self.name.clone())
    }
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}/{}", self.namespace, self.resource.kind, self.name)
    }
}
