//! Sequential prune loop and deletion state machine.
//!
//! Candidates are pulled from the store one at a time. Each one is
//! classified, and a deletable one then goes through
//! `PendingConfirm -> {Confirmed, Declined}` and
//! `Confirmed -> {DryRunReported, Deleted, DeletionFailed}`. The first
//! fatal error stops the loop; everything processed before it stays in
//! the report.

use std::io::Write;

use futures::TryStreamExt;
use tracing::{debug, info, warn};

use crate::config::{DryRunStrategy, PruneConfig};
use crate::liveness::LivenessSet;
use crate::query::CandidateQuery;
use crate::store::{DeleteOptions, ObjectStore};
use crate::types::Candidate;

use super::classify::classify;
use super::confirm::Confirmation;
use super::grace::{grace_period_seconds, resolve_grace_period};
use super::report::OutcomePrinter;
use super::{
    CandidateOutcome, DeletionState, PruneDecision, PruneError, PruneReport, SkipReason, Target,
};

/// Resolved deletion policy for a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PruneSettings {
    /// Raw `--ignore-namespaces` value.
    pub ignore_namespaces: String,
    /// Effective grace period after resolution; negative means unset.
    pub grace_period: i64,
    /// Dry-run mode.
    pub dry_run: DryRunStrategy,
    /// Suppress outcome lines.
    pub quiet: bool,
}

impl PruneSettings {
    /// Resolve settings from the run configuration.
    pub fn from_config(config: &PruneConfig) -> Self {
        Self {
            ignore_namespaces: config.ignore_namespaces().to_owned(),
            grace_period: resolve_grace_period(config.requested_grace_period(), config.force),
            dry_run: config.dry_run,
            quiet: config.quiet,
        }
    }

    /// Options for each delete call.
    pub fn delete_options(&self) -> DeleteOptions {
        DeleteOptions {
            grace_period_seconds: grace_period_seconds(self.grace_period),
            dry_run: self.dry_run == DryRunStrategy::Server,
        }
    }

    /// Returns `true` when deletions bypass the grace period.
    pub fn forced(&self) -> bool {
        self.grace_period == 0
    }
}

/// Runs the prune loop against a store and a frozen liveness set.
pub struct PruneEngine<'a, S: ?Sized, W> {
    store: &'a S,
    liveness: &'a LivenessSet,
    settings: PruneSettings,
    confirmation: Confirmation,
    printer: OutcomePrinter<W>,
    report: PruneReport,
}

impl<'a, S, W> PruneEngine<'a, S, W>
where
    S: ObjectStore + ?Sized,
    W: Write,
{
    /// Create an engine writing outcome lines to `out`.
    pub fn new(
        store: &'a S,
        liveness: &'a LivenessSet,
        settings: PruneSettings,
        confirmation: Confirmation,
        out: W,
    ) -> Self {
        let printer = OutcomePrinter::new(out, settings.quiet, settings.forced(), settings.dry_run);
        Self {
            store,
            liveness,
            settings,
            confirmation,
            printer,
            report: PruneReport::default(),
        }
    }

    /// Process every candidate the query yields, in order.
    ///
    /// # Errors
    ///
    /// Stops at the first candidate that fails to list or decode, fails
    /// dry-run verification, fails to delete, or cannot be confirmed.
    pub async fn run(&mut self, query: &CandidateQuery) -> Result<(), PruneError> {
        let store = self.store;
        let mut candidates = store.list_candidates(query);
        while let Some(candidate) = candidates.try_next().await? {
            self.process(&candidate).await?;
        }
        Ok(())
    }

    /// Outcomes recorded so far.
    pub fn report(&self) -> &PruneReport {
        &self.report
    }

    /// Consume the engine, returning the report and the output writer.
    pub fn into_parts(self) -> (PruneReport, W) {
        (self.report, self.printer.into_inner())
    }

    async fn process(&mut self, candidate: &Candidate) -> Result<(), PruneError> {
        let target = Target::from(candidate);

        let Some(decision) = classify(candidate, self.liveness, &self.settings.ignore_namespaces)
        else {
            warn!(resource = %candidate.resource, object = %candidate.key(), "unsupported prune object");
            self.report.unsupported.push(target);
            return Ok(());
        };

        if decision != PruneDecision::Delete {
            debug!(%target, ?decision, "keeping");
            self.record(target, decision, None);
            return Ok(());
        }

        if !self.confirmation.confirm(&target)? {
            info!(%target, "deletion declined");
            self.record(target, PruneDecision::Skip(SkipReason::Declined), None);
            return Ok(());
        }

        match self.settings.dry_run {
            DryRunStrategy::Client => {
                self.print_deleted(candidate);
                self.record(target, PruneDecision::Delete, Some(DeletionState::DryRunReported));
                return Ok(());
            }
            DryRunStrategy::Server => {
                if let Err(source) = self.store.verify_dry_run_support(&candidate.resource).await {
                    self.record(
                        target.clone(),
                        PruneDecision::Skip(SkipReason::PreconditionFailed(source.to_string())),
                        None,
                    );
                    return Err(PruneError::Capability { target, source });
                }
            }
            DryRunStrategy::None => {}
        }

        match self
            .store
            .delete(candidate, self.settings.delete_options())
            .await
        {
            Ok(()) => {
                self.print_deleted(candidate);
                let state = if self.settings.dry_run.is_dry_run() {
                    DeletionState::DryRunReported
                } else {
                    DeletionState::Deleted
                };
                self.record(target, PruneDecision::Delete, Some(state));
                Ok(())
            }
            Err(source) => {
                let message = source.to_string();
                if let Err(e) = self.printer.failed(candidate, &message) {
                    warn!(error = %e, "failed to write outcome");
                }
                self.record(
                    target.clone(),
                    PruneDecision::Delete,
                    Some(DeletionState::DeletionFailed(message)),
                );
                Err(PruneError::Deletion {
                    target,
                    context: candidate.source.clone(),
                    source,
                })
            }
        }
    }

    fn print_deleted(&mut self, candidate: &Candidate) {
        if let Err(e) = self.printer.deleted(candidate) {
            warn!(error = %e, "failed to write outcome");
        }
    }

    fn record(&mut self, target: Target, decision: PruneDecision, deletion: Option<DeletionState>) {
        self.report.outcomes.push(CandidateOutcome {
            target,
            decision,
            deletion,
        });
    }
}
