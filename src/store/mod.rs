//! Object store abstraction the collector and engine run against.
//!
//! [`ObjectStore`] is the only way the core touches the cluster. The
//! production implementation is [`cluster::KubeStore`]; tests substitute an
//! in-memory fake.

use async_trait::async_trait;
use futures::stream::BoxStream;
use kube::core::dynamic::ParseDynamicObjectError;

use crate::query::{CandidateQuery, ListScope};
use crate::types::{Candidate, ResourceKind, WorkloadSpec};

pub mod cluster;

/// Options for a single delete call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeleteOptions {
    /// Grace period to send; `None` leaves the server default.
    pub grace_period_seconds: Option<u32>,
    /// Ask the server to simulate the deletion.
    pub dry_run: bool,
}

/// Errors produced by object store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// An object could not be interpreted as the expected shape.
    #[error("unsupported object: {kind}: {object}: {source}")]
    Decode {
        /// Resource the object was listed as.
        kind: String,
        /// `<namespace>/<name>` of the object.
        object: String,
        /// Underlying decode failure.
        #[source]
        source: ParseDynamicObjectError,
    },
    /// No discovered resource matches the requested type.
    #[error("the server doesn't have a resource type \"{0}\"")]
    UnknownResource(String),
    /// The resource cannot be deleted in server-side dry-run mode.
    #[error("{kind} doesn't support dry-run deletion")]
    DryRunUnsupported {
        /// Resource that failed verification.
        kind: String,
    },
    /// An API request failed.
    #[error("{operation} {object}: {source}")]
    Api {
        /// Operation being performed (`listing`, `getting`, `deleting`).
        operation: &'static str,
        /// Object or resource the request targeted.
        object: String,
        /// Underlying client error.
        #[source]
        source: kube::Error,
    },
}

/// Access to workloads and candidate objects in the cluster.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Every pod matching the scope, in listing order.
    ///
    /// A pod that fails to decode is yielded as [`StoreError::Decode`]
    /// rather than dropped.
    fn list_workloads<'a>(
        &'a self,
        scope: &'a ListScope,
    ) -> BoxStream<'a, Result<WorkloadSpec, StoreError>>;

    /// Every object matching the query, in request order then listing order.
    fn list_candidates<'a>(
        &'a self,
        query: &'a CandidateQuery,
    ) -> BoxStream<'a, Result<Candidate, StoreError>>;

    /// Delete a candidate object.
    async fn delete(&self, target: &Candidate, options: DeleteOptions) -> Result<(), StoreError>;

    /// Check that `resource` accepts server-side dry-run deletion.
    async fn verify_dry_run_support(&self, resource: &ResourceKind) -> Result<(), StoreError>;
}
