//! kubectl-prune CLI entry point.
//!
//! Deletes ConfigMaps and Secrets that no pod in scope references. Invoked
//! as a kubectl plugin (`kubectl prune configmap,secret`) or directly.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::path::PathBuf;

use anyhow::Context;
use clap::{ArgAction, Parser};
use tracing::debug;

use kubeprune::config::{ClusterOptions, DryRunStrategy, PruneConfig};
use kubeprune::prune::confirm::{Confirmation, Prompter, TerminalPrompter};
use kubeprune::store::cluster::KubeStore;
use kubeprune::{logging, pipeline};

/// Delete ConfigMaps and Secrets not used by any pod.
#[derive(Parser)]
#[command(name = "kubectl-prune", version, about)]
struct Cli {
    /// Resources to prune: `configmap,secret`, `secret NAME...` or `cm/NAME`.
    #[arg(required = true)]
    resources: Vec<String>,

    /// Namespace scope; defaults to the kubeconfig context namespace.
    #[arg(short, long)]
    namespace: Option<String>,

    /// Prune across all namespaces.
    #[arg(
        short = 'A',
        long,
        action = ArgAction::Set,
        num_args = 0..=1,
        require_equals = true,
        default_value_t = false,
        default_missing_value = "true"
    )]
    all_namespaces: bool,

    /// Label selector applied to pods and candidates.
    #[arg(short = 'l', long = "selector")]
    selector: Option<String>,

    /// Field selector applied to pods and candidates.
    #[arg(long)]
    field_selector: Option<String>,

    /// Comma-separated namespaces to leave untouched.
    #[arg(long)]
    ignore_namespaces: Option<String>,

    /// Delete without asking for confirmation.
    #[arg(
        short,
        long,
        action = ArgAction::Set,
        num_args = 0..=1,
        require_equals = true,
        default_value_t = false,
        default_missing_value = "true"
    )]
    yes: bool,

    /// Seconds given to each object to terminate; negative uses the server default.
    #[arg(long, allow_negative_numbers = true)]
    grace_period: Option<i64>,

    /// Delete immediately, bypassing graceful deletion.
    #[arg(
        long,
        action = ArgAction::Set,
        num_args = 0..=1,
        require_equals = true,
        default_value_t = false,
        default_missing_value = "true"
    )]
    force: bool,

    /// Do not print per-object outcomes.
    #[arg(
        short,
        long,
        action = ArgAction::Set,
        num_args = 0..=1,
        require_equals = true,
        default_value_t = false,
        default_missing_value = "true"
    )]
    quiet: bool,

    /// `none`, `client` or `server`.
    #[arg(
        long,
        num_args = 0..=1,
        require_equals = true,
        default_value = "none",
        default_missing_value = "client"
    )]
    dry_run: DryRunStrategy,

    /// Path to the kubeconfig file.
    #[arg(long)]
    kubeconfig: Option<PathBuf>,

    /// Kubeconfig context to use.
    #[arg(long)]
    context: Option<String>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn into_config(self) -> PruneConfig {
        PruneConfig {
            resources: self.resources,
            namespace: self.namespace,
            all_namespaces: self.all_namespaces,
            label_selector: self.selector,
            field_selector: self.field_selector,
            ignore_namespaces: self.ignore_namespaces,
            yes: self.yes,
            grace_period: self.grace_period,
            force: self.force,
            quiet: self.quiet,
            dry_run: self.dry_run,
            cluster: ClusterOptions {
                kubeconfig: self.kubeconfig,
                context: self.context,
            },
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init_cli(cli.verbose);

    let mut config = cli.into_config();
    config.apply_overrides(|key| std::env::var(key).ok());
    debug!(?config, "resolved configuration");

    let store = KubeStore::connect(&config.cluster)
        .await
        .context("failed to connect to the cluster")?;

    let confirmation = Confirmation::for_run(config.yes, config.dry_run, || {
        Box::new(TerminalPrompter::stdio()) as Box<dyn Prompter>
    });

    let stdout = std::io::stdout();
    pipeline::run(
        &store,
        &config,
        store.default_namespace(),
        confirmation,
        stdout.lock(),
    )
    .await?;

    Ok(())
}
