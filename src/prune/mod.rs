//! Prune engine: classify candidates against the liveness set and run the
//! deletion policy for the unreferenced ones.

use std::fmt;

use crate::store::StoreError;
use crate::types::Candidate;

pub mod classify;
pub mod confirm;
pub mod engine;
pub mod grace;
pub mod report;

pub use engine::{PruneEngine, PruneSettings};

// ---------------------------------------------------------------------------
// Decisions and outcomes
// ---------------------------------------------------------------------------

/// Why a candidate is kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeepReason {
    /// A workload references the object.
    Referenced,
    /// The Secret type is lifecycle-managed by the platform.
    SystemManaged,
    /// The namespace is reserved or ignored by the operator.
    NamespaceExcluded,
}

/// Why a deletable candidate was left untouched.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SkipReason {
    /// The operator answered no at the prompt.
    Declined,
    /// A precondition check rejected the deletion.
    PreconditionFailed(String),
}

/// Decision reached for a candidate.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PruneDecision {
    /// Leave the object alone.
    Keep(KeepReason),
    /// The object is unreferenced and was confirmed for deletion.
    Delete,
    /// The object is unreferenced but was not deleted.
    Skip(SkipReason),
}

/// Terminal state of a confirmed deletion.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DeletionState {
    /// Dry run (client or server side); nothing was deleted.
    DryRunReported,
    /// The object was deleted.
    Deleted,
    /// The delete call failed with the given message.
    DeletionFailed(String),
}

/// Identity of a processed candidate, detached from its metadata.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Target {
    /// Namespace.
    pub namespace: String,
    /// Kind, e.g. `Secret`.
    pub kind: String,
    /// Object name.
    pub name: String,
}

impl From<&Candidate> for Target {
    fn from(candidate: &Candidate) -> Self {
        Self {
            namespace: candidate.namespace.clone(),
            kind: candidate.resource.kind.clone(),
            name: candidate.name.clone(),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}/{}", self.namespace, self.kind, self.name)
    }
}

/// Everything that happened to one candidate.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CandidateOutcome {
    /// The candidate.
    pub target: Target,
    /// Final decision.
    pub decision: PruneDecision,
    /// Terminal deletion state; set only when `decision` is `Delete`.
    pub deletion: Option<DeletionState>,
}

/// Per-run record of every candidate, in processing order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PruneReport {
    /// Classified candidates.
    pub outcomes: Vec<CandidateOutcome>,
    /// Candidates of kinds this tool does not prune.
    pub unsupported: Vec<Target>,
}

impl PruneReport {
    /// Decisions in processing order.
    pub fn decisions(&self) -> Vec<(Target, PruneDecision)> {
        self.outcomes
            .iter()
            .map(|o| (o.target.clone(), o.decision.clone()))
            .collect()
    }

    /// Outcome for the candidate named `name`, if any.
    pub fn outcome(&self, name: &str) -> Option<&CandidateOutcome> {
        self.outcomes.iter().find(|o| o.target.name == name)
    }

    /// Candidates whose deletion went through (including dry runs).
    pub fn deleted(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| {
                matches!(
                    o.deletion,
                    Some(DeletionState::Deleted | DeletionState::DryRunReported)
                )
            })
            .count()
    }

    /// Candidates kept for any reason.
    pub fn kept(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.decision, PruneDecision::Keep(_)))
            .count()
    }

    /// Candidates left untouched after being found deletable.
    pub fn skipped(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.decision, PruneDecision::Skip(_)))
            .count()
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Fatal errors that stop a prune run.
#[derive(Debug, thiserror::Error)]
pub enum PruneError {
    /// Listing or decoding a candidate failed.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// Server-side dry-run verification failed for a candidate's kind.
    #[error("cannot dry-run delete {target}: {source}")]
    Capability {
        /// Candidate being processed.
        target: Target,
        /// Verification failure.
        #[source]
        source: StoreError,
    },
    /// The store rejected a delete call.
    #[error("error when deleting \"{context}\": {source}")]
    Deletion {
        /// Candidate being deleted.
        target: Target,
        /// Query argument the candidate came from.
        context: String,
        /// Underlying store error.
        #[source]
        source: StoreError,
    },
    /// The confirmation prompt could not be answered.
    #[error("confirmation prompt failed: {0}")]
    Prompt(#[source] std::io::Error),
}
