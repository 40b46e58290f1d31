//! Kubernetes-backed [`ObjectStore`] using `kube` dynamic APIs.
//!
//! Resource arguments are resolved once against API discovery, so any
//! listable type can be queried; only ConfigMaps and Secrets get a
//! kind-specific decode.

use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use k8s_openapi::api::core::v1::{Pod, Secret};
use kube::api::{Api, DeleteParams, DynamicObject, ListParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::core::GroupVersionKind;
use kube::discovery::{verbs, ApiCapabilities, ApiResource, Discovery, Scope};
use kube::{Client, Config};
use tracing::{debug, info};

use crate::config::ClusterOptions;
use crate::query::{expand_short_name, CandidateQuery, ListScope, ResourceRequest};
use crate::types::{Candidate, CandidateDetail, ResourceKind, WorkloadSpec};

use super::{DeleteOptions, ObjectStore, StoreError};

/// Page size for list requests, matching kubectl's default chunk size.
const LIST_CHUNK_SIZE: u32 = 500;

/// Object store talking to a live API server.
#[derive(Clone)]
pub struct KubeStore {
    client: Client,
    discovery: Arc<Discovery>,
    default_namespace: String,
}

impl KubeStore {
    /// Resolve cluster access, connect, and run API discovery.
    ///
    /// # Errors
    ///
    /// Returns an error when no kubeconfig or in-cluster config can be
    /// loaded, or when discovery fails.
    pub async fn connect(options: &ClusterOptions) -> anyhow::Result<Self> {
        let config = load_config(options).await?;
        let default_namespace = config.default_namespace.clone();
        let client = Client::try_from(config).context("failed to build Kubernetes client")?;

        let discovery = Discovery::new(client.clone())
            .run()
            .await
            .context("failed to run API discovery")?;
        info!(
            groups = discovery.groups().count(),
            namespace = %default_namespace,
            "connected to cluster"
        );

        Ok(Self {
            client,
            discovery: Arc::new(discovery),
            default_namespace,
        })
    }

    /// Namespace of the active kubeconfig context.
    pub fn default_namespace(&self) -> &str {
        &self.default_namespace
    }

    /// Find the discovered resource matching a command-line type.
    fn resolve(&self, resource: &str) -> Result<(ApiResource, ApiCapabilities), StoreError> {
        let expanded = expand_short_name(resource);
        let (name, group) = match expanded.split_once('.') {
            Some((name, group)) => (name, Some(group)),
            None => (expanded, None),
        };

        for api_group in self.discovery.groups_alphabetical() {
            if group.is_some_and(|g| g != api_group.name()) {
                continue;
            }
            for (ar, caps) in api_group.recommended_resources() {
                if ar.plural == name || ar.kind.to_lowercase() == name {
                    return Ok((ar, caps));
                }
            }
        }
        Err(StoreError::UnknownResource(resource.to_owned()))
    }

    fn resolve_kind(
        &self,
        resource: &ResourceKind,
    ) -> Result<(ApiResource, ApiCapabilities), StoreError> {
        let gvk = GroupVersionKind::gvk(&resource.group, &resource.version, &resource.kind);
        self.discovery
            .resolve_gvk(&gvk)
            .ok_or_else(|| StoreError::UnknownResource(resource.to_string()))
    }

    fn dynamic_api(
        &self,
        ar: &ApiResource,
        caps: &ApiCapabilities,
        namespace: Option<&str>,
    ) -> Api<DynamicObject> {
        match namespace {
            Some(ns) if caps.scope == Scope::Namespaced && !ns.is_empty() => {
                Api::namespaced_with(self.client.clone(), ns, ar)
            }
            _ => Api::all_with(self.client.clone(), ar),
        }
    }

    async fn workloads(
        &self,
        scope: &ListScope,
    ) -> Result<Vec<Result<WorkloadSpec, StoreError>>, StoreError> {
        let ar = ApiResource::erase::<Pod>(&());
        let api = match scope.namespace.as_deref() {
            Some(ns) => Api::namespaced_with(self.client.clone(), ns, &ar),
            None => Api::all_with(self.client.clone(), &ar),
        };
        let pods = list_all(&api, scope, &ar.plural).await?;
        debug!(count = pods.len(), "listed pods");

        Ok(pods.into_iter().map(workload_from_object).collect())
    }

    async fn candidates(
        &self,
        request: &ResourceRequest,
        scope: &ListScope,
    ) -> Result<Vec<Result<Candidate, StoreError>>, StoreError> {
        let (ar, caps) = self.resolve(&request.resource)?;
        let api = self.dynamic_api(&ar, &caps, scope.namespace.as_deref());

        if request.names.is_empty() {
            let objects = list_all(&api, scope, &ar.plural).await?;
            debug!(resource = %ar.plural, count = objects.len(), "listed candidates");
            return Ok(objects
                .into_iter()
                .map(|obj| candidate_from_object(&ar, obj, &request.source))
                .collect());
        }

        let mut found = Vec::with_capacity(request.names.len());
        for name in &request.names {
            let fetched = api
                .get(name)
                .await
                .map_err(|source| StoreError::Api {
                    operation: "getting",
                    object: format!("{}/{name}", ar.plural),
                    source,
                })
                .and_then(|obj| candidate_from_object(&ar, obj, &request.source));
            found.push(fetched);
        }
        Ok(found)
    }
}

#[async_trait]
impl ObjectStore for KubeStore {
    fn list_workloads<'a>(
        &'a self,
        scope: &'a ListScope,
    ) -> BoxStream<'a, Result<WorkloadSpec, StoreError>> {
        stream::once(self.workloads(scope))
            .flat_map(|listed| stream::iter(listed.unwrap_or_else(|e| vec![Err(e)])))
            .boxed()
    }

    fn list_candidates<'a>(
        &'a self,
        query: &'a CandidateQuery,
    ) -> BoxStream<'a, Result<Candidate, StoreError>> {
        stream::iter(query.requests.iter())
            .then(move |request| self.candidates(request, &query.scope))
            .flat_map(|listed| stream::iter(listed.unwrap_or_else(|e| vec![Err(e)])))
            .boxed()
    }

    async fn delete(&self, target: &Candidate, options: DeleteOptions) -> Result<(), StoreError> {
        let (ar, caps) = self.resolve_kind(&target.resource)?;
        let api = self.dynamic_api(&ar, &caps, Some(&target.namespace));
        let params = DeleteParams {
            dry_run: options.dry_run,
            grace_period_seconds: options.grace_period_seconds,
            ..DeleteParams::default()
        };
        api.delete(&target.name, &params)
            .await
            .map(|_| ())
            .map_err(|source| StoreError::Api {
                operation: "deleting",
                object: target.key().to_string(),
                source,
            })
    }

    async fn verify_dry_run_support(&self, resource: &ResourceKind) -> Result<(), StoreError> {
        let (_, caps) = self.resolve_kind(resource)?;
        if caps.supports_operation(verbs::DELETE) {
            Ok(())
        } else {
            Err(StoreError::DryRunUnsupported {
                kind: resource.qualified_name(),
            })
        }
    }
}

async fn load_config(options: &ClusterOptions) -> anyhow::Result<Config> {
    let kube_options = KubeConfigOptions {
        context: options.context.clone(),
        ..KubeConfigOptions::default()
    };

    match (&options.kubeconfig, &options.context) {
        (Some(path), _) => {
            let kubeconfig = Kubeconfig::read_from(path)
                .with_context(|| format!("failed to read kubeconfig {}", path.display()))?;
            Config::from_custom_kubeconfig(kubeconfig, &kube_options)
                .await
                .with_context(|| format!("failed to load kubeconfig {}", path.display()))
        }
        (None, Some(context)) => Config::from_kubeconfig(&kube_options)
            .await
            .with_context(|| format!("failed to load kubeconfig context {context}")),
        (None, None) => Config::infer()
            .await
            .context("failed to infer cluster configuration"),
    }
}

async fn list_all(
    api: &Api<DynamicObject>,
    scope: &ListScope,
    what: &str,
) -> Result<Vec<DynamicObject>, StoreError> {
    let mut params = ListParams::default().limit(LIST_CHUNK_SIZE);
    if let Some(labels) = scope.label_selector.as_deref() {
        params = params.labels(labels);
    }
    if let Some(fields) = scope.field_selector.as_deref() {
        params = params.fields(fields);
    }

    let mut items = Vec::new();
    loop {
        let page = api.list(&params).await.map_err(|source| StoreError::Api {
            operation: "listing",
            object: what.to_owned(),
            source,
        })?;
        items.extend(page.items);
        match page.metadata.continue_ {
            Some(token) if !token.is_empty() => params = params.continue_token(&token),
            _ => break,
        }
    }
    Ok(items)
}

/// Decode a listed pod into a [`WorkloadSpec`].
///
/// # Errors
///
/// Returns [`StoreError::Decode`] when the object does not parse as a `Pod`.
pub fn workload_from_object(obj: DynamicObject) -> Result<WorkloadSpec, StoreError> {
    let object = object_ref(&obj);
    let pod = obj
        .try_parse::<Pod>()
        .map_err(|source| StoreError::Decode {
            kind: "pods".to_owned(),
            object,
            source,
        })?;
    Ok(WorkloadSpec::from_pod(&pod))
}

/// Convert a listed object into a [`Candidate`], decoding kind-specific fields.
///
/// # Errors
///
/// Returns [`StoreError::Decode`] when a Secret does not parse as a `Secret`.
pub fn candidate_from_object(
    ar: &ApiResource,
    obj: DynamicObject,
    source: &str,
) -> Result<Candidate, StoreError> {
    let resource = ResourceKind {
        group: ar.group.clone(),
        version: ar.version.clone(),
        kind: ar.kind.clone(),
    };
    let namespace = obj.metadata.namespace.clone().unwrap_or_default();
    let name = obj.metadata.name.clone().unwrap_or_default();

    let detail = if resource.is_core("ConfigMap") {
        CandidateDetail::ConfigMap
    } else if resource.is_core("Secret") {
        let object = object_ref(&obj);
        let secret = obj
            .try_parse::<Secret>()
            .map_err(|source| StoreError::Decode {
                kind: ar.plural.clone(),
                object,
                source,
            })?;
        CandidateDetail::Secret {
            secret_type: secret.type_,
        }
    } else {
        CandidateDetail::Other
    };

    Ok(Candidate {
        resource,
        namespace,
        name,
        detail,
        source: source.to_owned(),
    })
}

fn object_ref(obj: &DynamicObject) -> String {
    format!(
        "{}/{}",
        obj.metadata.namespace.as_deref().unwrap_or_default(),
        obj.metadata.name.as_deref().unwrap_or_default()
    )
}
