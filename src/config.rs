//! Run configuration.
//!
//! [`PruneConfig`] carries every option of a single invocation. It is
//! built from command-line flags, then environment overrides fill any
//! option the flags left unset, then [`PruneConfig::validate`] rejects
//! inconsistent combinations.
//!
//! Precedence: flags > env vars > defaults. There is no config file;
//! cluster access comes from kubeconfig.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::query::{parse_resource_args, CandidateQuery, ListScope, QueryError};

/// Env var supplying `--ignore-namespaces` when the flag is absent.
pub const IGNORE_NAMESPACES_ENV: &str = "KUBECTL_PRUNE_IGNORE_NAMESPACES";

/// Grace period value meaning "not set".
pub const GRACE_PERIOD_UNSET: i64 = -1;

/// Dry-run mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DryRunStrategy {
    /// Delete for real.
    #[default]
    None,
    /// Report what would be deleted without calling the server.
    Client,
    /// Ask the server to simulate each deletion.
    Server,
}

impl DryRunStrategy {
    /// Returns `true` for either dry-run mode.
    pub fn is_dry_run(self) -> bool {
        !matches!(self, Self::None)
    }
}

impl FromStr for DryRunStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" | "false" => Ok(Self::None),
            "client" | "true" => Ok(Self::Client),
            "server" => Ok(Self::Server),
            other => Err(format!(
                "invalid dry-run value ({other}). Must be \"none\", \"server\", or \"client\"."
            )),
        }
    }
}

impl fmt::Display for DryRunStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            Self::None => "none",
            Self::Client => "client",
            Self::Server => "server",
        };
        f.write_str(value)
    }
}

/// Cluster access options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClusterOptions {
    /// Explicit kubeconfig path; `None` uses the standard resolution.
    pub kubeconfig: Option<PathBuf>,
    /// Kubeconfig context to use instead of the current one.
    pub context: Option<String>,
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Resource arguments could not be parsed.
    #[error(transparent)]
    Query(#[from] QueryError),
    /// Named objects were requested across all namespaces.
    #[error("a resource cannot be retrieved by name across all namespaces")]
    NamesAcrossNamespaces,
    /// `--grace-period` exceeds what a delete request can carry.
    #[error("grace period {0} is out of range (maximum {max})", max = u32::MAX)]
    GracePeriodOutOfRange(i64),
    /// `--kubeconfig` points at a file that does not exist.
    #[error("kubeconfig {} does not exist", .0.display())]
    MissingKubeconfig(PathBuf),
}

/// Every option of one prune run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PruneConfig {
    /// Positional resource arguments (`configmap,secret`, `cm/name`, ...).
    pub resources: Vec<String>,
    /// Namespace override; `None` uses the kubeconfig context namespace.
    pub namespace: Option<String>,
    /// List across all namespaces.
    pub all_namespaces: bool,
    /// Label selector applied to pods and candidates.
    pub label_selector: Option<String>,
    /// Field selector applied to pods and candidates.
    pub field_selector: Option<String>,
    /// Raw comma-joined namespaces to leave alone.
    pub ignore_namespaces: Option<String>,
    /// Answer yes to every confirmation prompt.
    pub yes: bool,
    /// Requested grace period in seconds; `None` when not given.
    pub grace_period: Option<i64>,
    /// Bypass graceful deletion.
    pub force: bool,
    /// Suppress per-object output.
    pub quiet: bool,
    /// Dry-run mode.
    pub dry_run: DryRunStrategy,
    /// Cluster access options.
    pub cluster: ClusterOptions,
}

impl PruneConfig {
    /// Apply environment overrides (flags > env > defaults).
    ///
    /// Takes a resolver function for testability (avoids unsafe `set_var` in tests).
    pub fn apply_overrides(&mut self, env: impl Fn(&str) -> Option<String>) {
        if self.ignore_namespaces.is_none() {
            if let Some(v) = env(IGNORE_NAMESPACES_ENV) {
                tracing::info!(var = IGNORE_NAMESPACES_ENV, value = %v, "using env override");
                self.ignore_namespaces = Some(v);
            }
        }
    }

    /// Reject inconsistent option combinations.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for unparseable resource arguments, names
    /// combined with `--all-namespaces`, a grace period too large to send,
    /// or a missing kubeconfig file.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let requests = parse_resource_args(&self.resources)?;
        if self.all_namespaces && requests.iter().any(|r| !r.names.is_empty()) {
            return Err(ConfigError::NamesAcrossNamespaces);
        }
        if let Some(seconds) = self.grace_period {
            if seconds > i64::from(u32::MAX) {
                return Err(ConfigError::GracePeriodOutOfRange(seconds));
            }
        }
        if let Some(path) = &self.cluster.kubeconfig {
            if !path.exists() {
                return Err(ConfigError::MissingKubeconfig(path.clone()));
            }
        }
        Ok(())
    }

    /// Requested grace period, or [`GRACE_PERIOD_UNSET`].
    pub fn requested_grace_period(&self) -> i64 {
        self.grace_period.unwrap_or(GRACE_PERIOD_UNSET)
    }

    /// Raw ignore-namespaces string, empty when unset.
    pub fn ignore_namespaces(&self) -> &str {
        self.ignore_namespaces.as_deref().unwrap_or_default()
    }

    /// Scope shared by the pod and candidate listings.
    ///
    /// `default_namespace` is used unless a namespace was given or all
    /// namespaces were requested.
    pub fn list_scope(&self, default_namespace: &str) -> ListScope {
        let namespace = if self.all_namespaces {
            None
        } else {
            Some(
                self.namespace
                    .clone()
                    .unwrap_or_else(|| default_namespace.to_owned()),
            )
        };
        ListScope {
            namespace,
            label_selector: self.label_selector.clone().filter(|s| !s.is_empty()),
            field_selector: self.field_selector.clone().filter(|s| !s.is_empty()),
        }
    }

    /// Build the candidate query.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Query`] when the resource arguments are invalid.
    pub fn candidate_query(&self, default_namespace: &str) -> Result<CandidateQuery, ConfigError> {
        Ok(CandidateQuery {
            requests: parse_resource_args(&self.resources)?,
            scope: self.list_scope(default_namespace),
        })
    }
}
