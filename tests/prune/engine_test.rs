//! Tests for the prune engine and the two-pass pipeline.

use kubeprune::config::{DryRunStrategy, PruneConfig};
use kubeprune::liveness;
use kubeprune::pipeline::{self, PipelineError};
use kubeprune::prune::confirm::{Confirmation, Prompter};
use kubeprune::prune::{
    DeletionState, KeepReason, PruneDecision, PruneEngine, PruneError, PruneReport,
    PruneSettings, SkipReason,
};
use kubeprune::store::{DeleteOptions, StoreError};

use crate::support::{
    broken_pod, config_map, pod_with_configmap_volume, secret, service_account, FakeStore,
    ScriptedPrompter,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const SA_TOKEN: &str = "kubernetes.io/service-account-token";

/// `ns1` with one pod mounting `cm-used`, an orphan ConfigMap and an
/// unreferenced service-account token.
fn scenario_store() -> FakeStore {
    FakeStore::new(
        vec![pod_with_configmap_volume("ns1", "web", "cm-used")],
        vec![
            config_map("ns1", "cm-used"),
            config_map("ns1", "cm-orphan"),
            secret("ns1", "sa-token-xyz", SA_TOKEN),
        ],
    )
}

fn scenario_config() -> PruneConfig {
    PruneConfig {
        resources: vec!["configmap,secret".to_owned()],
        namespace: Some("ns1".to_owned()),
        yes: true,
        ..PruneConfig::default()
    }
}

fn no_prompt() -> Box<dyn Prompter> {
    panic!("no prompt expected")
}

async fn run_pipeline(
    store: &FakeStore,
    config: &PruneConfig,
) -> (Result<PruneReport, PipelineError>, String) {
    let confirmation = Confirmation::for_run(config.yes, config.dry_run, no_prompt);
    let mut out = Vec::new();
    let result = pipeline::run(store, config, "default", confirmation, &mut out).await;
    (result, String::from_utf8(out).expect("utf8"))
}

/// Drive the engine directly so the partial report survives a fatal error.
async fn run_engine(
    store: &FakeStore,
    config: &PruneConfig,
    confirmation: Confirmation,
) -> (Result<(), PruneError>, PruneReport, String) {
    let query = config.candidate_query("default").expect("query");
    let live = liveness::collect(store, &query.scope)
        .await
        .expect("collect");
    let settings = PruneSettings::from_config(config);
    let mut engine = PruneEngine::new(store, &live, settings, confirmation, Vec::new());
    let result = engine.run(&query).await;
    let (report, out) = engine.into_parts();
    (result, report, String::from_utf8(out).expect("utf8"))
}

fn orphans_store(names: &[&str]) -> FakeStore {
    FakeStore::new(
        vec![],
        names.iter().map(|n| config_map("ns1", n)).collect(),
    )
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

#[tokio::test]
async fn prunes_only_the_orphan_config_map() {
    let store = scenario_store();

    let (result, out) = run_pipeline(&store, &scenario_config()).await;
    let report = result.expect("run");

    assert_eq!(
        report.outcome("cm-used").map(|o| &o.decision),
        Some(&PruneDecision::Keep(KeepReason::Referenced))
    );
    assert_eq!(
        report.outcome("cm-orphan").map(|o| &o.decision),
        Some(&PruneDecision::Delete)
    );
    assert_eq!(
        report.outcome("cm-orphan").and_then(|o| o.deletion.clone()),
        Some(DeletionState::Deleted)
    );
    assert_eq!(
        report.outcome("sa-token-xyz").map(|o| &o.decision),
        Some(&PruneDecision::Keep(KeepReason::SystemManaged))
    );
    assert_eq!(store.deleted_names(), vec!["cm-orphan".to_owned()]);
    assert_eq!(out, "configmap \"cm-orphan\" deleted\n");
    assert_eq!((report.deleted(), report.kept(), report.skipped()), (1, 2, 0));
}

#[tokio::test]
async fn managed_secrets_survive_force_and_yes() {
    let store = FakeStore::new(
        vec![],
        vec![
            secret("ns1", "token", SA_TOKEN),
            secret("ns1", "pull", "kubernetes.io/dockerconfigjson"),
            secret("ns1", "opaque", "Opaque"),
        ],
    );
    let config = PruneConfig {
        resources: vec!["secret".to_owned()],
        force: true,
        ..scenario_config()
    };

    let (result, out) = run_pipeline(&store, &config).await;
    result.expect("run");

    assert_eq!(store.deleted_names(), vec!["opaque".to_owned()]);
    assert_eq!(
        store.deletes()[0].options,
        DeleteOptions {
            grace_period_seconds: Some(0),
            dry_run: false,
        }
    );
    assert_eq!(out, "secret \"opaque\" force deleted\n");
}

#[tokio::test]
async fn client_dry_run_never_calls_delete() {
    let store = scenario_store();
    for yes in [false, true] {
        let config = PruneConfig {
            yes,
            dry_run: DryRunStrategy::Client,
            ..scenario_config()
        };

        let (result, out) = run_pipeline(&store, &config).await;
        let report = result.expect("run");

        assert_eq!(
            report.outcome("cm-orphan").and_then(|o| o.deletion.clone()),
            Some(DeletionState::DryRunReported)
        );
        assert_eq!(out, "configmap \"cm-orphan\" deleted (dry run)\n");
    }
    assert!(store.deletes().is_empty());
}

#[tokio::test]
async fn server_dry_run_asks_the_server() {
    let store = scenario_store();
    let config = PruneConfig {
        yes: false,
        dry_run: DryRunStrategy::Server,
        ..scenario_config()
    };

    let (result, out) = run_pipeline(&store, &config).await;
    let report = result.expect("run");

    let deletes = store.deletes();
    assert_eq!(deletes.len(), 1);
    assert_eq!(deletes[0].name, "cm-orphan");
    assert!(deletes[0].options.dry_run);
    assert_eq!(
        report.outcome("cm-orphan").and_then(|o| o.deletion.clone()),
        Some(DeletionState::DryRunReported)
    );
    assert_eq!(out, "configmap \"cm-orphan\" deleted (server dry run)\n");
}

#[tokio::test]
async fn reruns_reach_identical_decisions() {
    let store = scenario_store();

    let (first, _) = run_pipeline(&store, &scenario_config()).await;
    let (second, _) = run_pipeline(&store, &scenario_config()).await;

    assert_eq!(
        first.expect("first").decisions(),
        second.expect("second").decisions()
    );
}

#[tokio::test]
async fn pods_and_candidates_share_one_scope() {
    let store = scenario_store();
    let config = PruneConfig {
        label_selector: Some("app=web".to_owned()),
        ..scenario_config()
    };

    run_pipeline(&store, &config).await.0.expect("run");

    let scopes = store.scopes();
    assert_eq!(scopes.len(), 2);
    assert_eq!(scopes[0], scopes[1]);
    assert_eq!(scopes[0].namespace.as_deref(), Some("ns1"));
    assert_eq!(scopes[0].label_selector.as_deref(), Some("app=web"));
}

#[tokio::test]
async fn context_namespace_is_used_by_default() {
    let store = FakeStore::new(
        vec![],
        vec![config_map("default", "a"), config_map("ns1", "b")],
    );
    let config = PruneConfig {
        namespace: None,
        ..scenario_config()
    };

    run_pipeline(&store, &config).await.0.expect("run");

    assert_eq!(store.deleted_names(), vec!["a".to_owned()]);
}

#[tokio::test]
async fn liveness_failure_aborts_before_any_deletion() {
    let mut store = scenario_store();
    store.pods.push(broken_pod("ns1", "bad"));

    let (result, out) = run_pipeline(&store, &scenario_config()).await;

    assert!(matches!(result, Err(PipelineError::Liveness(StoreError::Decode { .. }))));
    assert!(store.deletes().is_empty());
    assert!(out.is_empty());
}

#[tokio::test]
async fn names_across_all_namespaces_are_rejected() {
    let store = scenario_store();
    let config = PruneConfig {
        resources: vec!["configmap".to_owned(), "cm-orphan".to_owned()],
        all_namespaces: true,
        ..scenario_config()
    };

    let (result, _) = run_pipeline(&store, &config).await;

    assert!(matches!(result, Err(PipelineError::Config(_))));
    assert!(store.scopes().is_empty());
}

#[tokio::test]
async fn oversized_grace_period_is_rejected_before_listing() {
    let store = scenario_store();
    let config = PruneConfig {
        grace_period: Some(i64::from(u32::MAX) + 1),
        ..scenario_config()
    };

    let (result, _) = run_pipeline(&store, &config).await;

    assert!(matches!(result, Err(PipelineError::Config(_))));
    assert!(store.scopes().is_empty());
    assert!(store.deletes().is_empty());
}

#[tokio::test]
async fn named_candidates_only() {
    let store = orphans_store(&["a", "b", "c"]);
    let config = PruneConfig {
        resources: vec!["cm/b".to_owned()],
        ..scenario_config()
    };

    run_pipeline(&store, &config).await.0.expect("run");

    assert_eq!(store.deleted_names(), vec!["b".to_owned()]);
}

#[tokio::test]
async fn quiet_suppresses_outcome_lines() {
    let store = scenario_store();
    let config = PruneConfig {
        quiet: true,
        ..scenario_config()
    };

    let (result, out) = run_pipeline(&store, &config).await;

    result.expect("run");
    assert_eq!(store.deleted_names(), vec!["cm-orphan".to_owned()]);
    assert!(out.is_empty());
}

#[tokio::test]
async fn ignored_namespaces_are_left_alone() {
    let store = FakeStore::new(
        vec![],
        vec![config_map("team-a", "x"), config_map("kube-system", "y")],
    );
    let config = PruneConfig {
        namespace: None,
        all_namespaces: true,
        ignore_namespaces: Some("team-a,team-b".to_owned()),
        ..scenario_config()
    };

    let (result, _) = run_pipeline(&store, &config).await;
    let report = result.expect("run");

    assert!(store.deletes().is_empty());
    assert_eq!(report.kept(), 2);
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

#[tokio::test]
async fn declined_candidates_are_skipped() {
    let store = orphans_store(&["first", "second"]);
    let config = PruneConfig {
        yes: false,
        ..scenario_config()
    };
    let prompter = ScriptedPrompter::new(&[false, true]);
    let questions = prompter.questions.clone();

    let (result, report, _) =
        run_engine(&store, &config, Confirmation::Interactive(Box::new(prompter))).await;

    result.expect("run");
    assert_eq!(
        report.outcome("first").map(|o| &o.decision),
        Some(&PruneDecision::Skip(SkipReason::Declined))
    );
    assert_eq!(
        report.outcome("second").and_then(|o| o.deletion.clone()),
        Some(DeletionState::Deleted)
    );
    assert_eq!(store.deleted_names(), vec!["second".to_owned()]);
    assert_eq!(questions.lock().expect("lock poisoned").len(), 2);
}

#[tokio::test]
async fn kept_candidates_are_never_prompted() {
    let store = FakeStore::new(
        vec![pod_with_configmap_volume("ns1", "web", "cm-used")],
        vec![config_map("ns1", "cm-used")],
    );
    let config = PruneConfig {
        yes: false,
        ..scenario_config()
    };
    let prompter = ScriptedPrompter::new(&[]);
    let questions = prompter.questions.clone();

    let (result, _, _) =
        run_engine(&store, &config, Confirmation::Interactive(Box::new(prompter))).await;

    result.expect("run");
    assert!(questions.lock().expect("lock poisoned").is_empty());
}

#[tokio::test]
async fn closed_prompt_stops_the_run() {
    let store = orphans_store(&["a"]);
    let prompter = ScriptedPrompter::new(&[]);

    let (result, _, _) = run_engine(
        &store,
        &scenario_config(),
        Confirmation::Interactive(Box::new(prompter)),
    )
    .await;

    assert!(matches!(result, Err(PruneError::Prompt(_))));
    assert!(store.deletes().is_empty());
}

#[tokio::test]
async fn capability_failure_halts_remaining_candidates() {
    let mut store = orphans_store(&["a", "b"]);
    store.dry_run_unsupported.push("ConfigMap".to_owned());
    let config = PruneConfig {
        dry_run: DryRunStrategy::Server,
        ..scenario_config()
    };

    let (result, report, out) = run_engine(&store, &config, Confirmation::NeverPrompt).await;

    match result {
        Err(PruneError::Capability { target, .. }) => assert_eq!(target.name, "a"),
        other => panic!("expected capability error, got {other:?}"),
    }
    assert!(store.deletes().is_empty());
    assert_eq!(report.outcomes.len(), 1);
    assert!(matches!(
        report.outcomes[0].decision,
        PruneDecision::Skip(SkipReason::PreconditionFailed(_))
    ));
    assert!(out.is_empty());
}

#[tokio::test]
async fn deletion_failure_is_reported_and_stops_the_run() {
    let mut store = orphans_store(&["a", "b"]);
    store.failing_deletes.push("a".to_owned());

    let (result, report, out) =
        run_engine(&store, &scenario_config(), Confirmation::AlwaysYes).await;

    let err = result.expect_err("deletion should fail");
    assert!(matches!(err, PruneError::Deletion { .. }));
    assert!(err
        .to_string()
        .starts_with("error when deleting \"configmap,secret\": "));
    assert_eq!(store.deleted_names(), vec!["a".to_owned()]);
    assert!(matches!(
        report.outcome("a").and_then(|o| o.deletion.clone()),
        Some(DeletionState::DeletionFailed(_))
    ));
    assert!(report.outcome("b").is_none());
    assert!(out.starts_with("configmap \"a\" deletion failed: "));
}

#[tokio::test]
async fn unsupported_kinds_are_recorded_not_deleted() {
    let store = FakeStore::new(vec![], vec![service_account("ns1", "builder")]);
    let config = PruneConfig {
        resources: vec!["sa".to_owned()],
        ..scenario_config()
    };

    let (result, report, _) = run_engine(&store, &config, Confirmation::AlwaysYes).await;

    result.expect("run");
    assert!(report.outcomes.is_empty());
    assert_eq!(report.unsupported.len(), 1);
    assert_eq!(report.unsupported[0].name, "builder");
    assert!(store.deletes().is_empty());
}

#[tokio::test]
async fn unknown_resource_type_is_fatal() {
    let store = orphans_store(&["a"]);
    let config = PruneConfig {
        resources: vec!["widgets".to_owned()],
        ..scenario_config()
    };

    let (result, report, _) = run_engine(&store, &config, Confirmation::AlwaysYes).await;

    assert!(matches!(
        result,
        Err(PruneError::Store(StoreError::UnknownResource(_)))
    ));
    assert!(report.outcomes.is_empty());
}
