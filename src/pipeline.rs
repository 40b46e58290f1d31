//! Two-pass prune pipeline: collect liveness, then run the prune engine.

use std::io::Write;

use tracing::info;

use crate::config::PruneConfig;
use crate::liveness;
use crate::prune::confirm::Confirmation;
use crate::prune::{PruneEngine, PruneError, PruneReport, PruneSettings};
use crate::store::ObjectStore;

/// Errors that abort a pipeline run.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The run configuration is invalid.
    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),
    /// Liveness collection failed; nothing was classified.
    #[error("failed to collect workload references: {0}")]
    Liveness(#[source] crate::store::StoreError),
    /// The prune pass stopped early.
    #[error(transparent)]
    Prune(#[from] PruneError),
}

/// Run a full prune against `store`.
///
/// `default_namespace` is the kubeconfig context namespace, used when the
/// configuration names none. Outcome lines go to `out`.
///
/// # Errors
///
/// Returns [`PipelineError`] for invalid configuration, a failed liveness
/// collection, or the first fatal prune error.
pub async fn run<S, W>(
    store: &S,
    config: &PruneConfig,
    default_namespace: &str,
    confirmation: Confirmation,
    out: W,
) -> Result<PruneReport, PipelineError>
where
    S: ObjectStore + ?Sized,
    W: Write,
{
    config.validate()?;
    let query = config.candidate_query(default_namespace)?;

    let liveness = liveness::collect(store, &query.scope)
        .await
        .map_err(PipelineError::Liveness)?;

    let settings = PruneSettings::from_config(config);
    info!(
        grace_period = settings.grace_period,
        dry_run = %settings.dry_run,
        interactive = confirmation.is_interactive(),
        "pruning"
    );

    let mut engine = PruneEngine::new(store, &liveness, settings, confirmation, out);
    engine.run(&query).await?;

    let report = engine.into_parts().0;
    info!(
        deleted = report.deleted(),
        kept = report.kept(),
        skipped = report.skipped(),
        unsupported = report.unsupported.len(),
        "prune finished"
    );
    Ok(report)
}
