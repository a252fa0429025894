//! Deployment record persistence against embedded `PostgreSQL`.

use super::helpers::{CleanupGuard, bot, test_runtime};
use botyard::registry::{
    domain::{BotId, DeploymentId, DeploymentStatus},
    ports::{BotRegistry, BotRegistryError},
};
use chrono::Utc;
use mockable::DefaultClock;
use pg_embedded_setup_unpriv::{TestCluster, test_support::shared_test_cluster};
use rstest::rstest;

#[rstest]
fn deployment_ids_increase_and_list_newest_first(shared_test_cluster: &'static TestCluster) {
    let guard = CleanupGuard::create(shared_test_cluster, "deploy_ids").expect("database");
    let registry = guard.registry().expect("registry");
    let rt = test_runtime();
    let alpha = bot("alpha");
    let beta = bot("beta");
    rt.block_on(registry.create_bot(&alpha)).expect("create alpha");
    rt.block_on(registry.create_bot(&beta)).expect("create beta");

    let first = rt
        .block_on(registry.create_deployment(alpha.id(), Utc::now()))
        .expect("first record");
    let other = rt
        .block_on(registry.create_deployment(beta.id(), Utc::now()))
        .expect("other record");
    let last = rt
        .block_on(registry.create_deployment(alpha.id(), Utc::now()))
        .expect("last record");

    assert!(other.id() > first.id());
    assert!(last.id() > other.id());
    assert_eq!(first.status(), DeploymentStatus::Pending);
    assert!(first.transcript().is_empty());

    let all = rt
        .block_on(registry.list_deployments(alpha.id(), None))
        .expect("list");
    let latest = rt
        .block_on(registry.list_deployments(alpha.id(), Some(1)))
        .expect("list limited");
    let ids: Vec<DeploymentId> = all.iter().map(|record| record.id()).collect();
    assert_eq!(ids, [last.id(), first.id()]);
    assert_eq!(
        latest.iter().map(|record| record.id()).collect::<Vec<_>>(),
        [last.id()]
    );
}

#[rstest]
fn appends_accumulate_until_finalization(shared_test_cluster: &'static TestCluster) {
    let guard = CleanupGuard::create(shared_test_cluster, "finalize").expect("database");
    let registry = guard.registry().expect("registry");
    let rt = test_runtime();
    let alpha = bot("alpha");
    rt.block_on(registry.create_bot(&alpha)).expect("create alpha");
    let mut record = rt
        .block_on(registry.create_deployment(alpha.id(), Utc::now()))
        .expect("record");

    rt.block_on(registry.append_deployment_log(record.id(), "[FETCH] ok"))
        .expect("first append");
    rt.block_on(registry.append_deployment_log(record.id(), "[BUILD] ok"))
        .expect("second append");
    let pending = rt
        .block_on(registry.find_deployment(record.id()))
        .expect("lookup")
        .expect("record exists");
    assert_eq!(pending.transcript(), ["[FETCH] ok", "[BUILD] ok"]);
    assert_eq!(pending.status(), DeploymentStatus::Pending);

    record
        .finalize(
            DeploymentStatus::Success,
            vec!["[FETCH] ok".to_owned(), "[BUILD] ok".to_owned()],
            &DefaultClock,
        )
        .expect("domain finalize");
    rt.block_on(registry.finalize_deployment(&record))
        .expect("first finalize");

    let late_append = rt.block_on(registry.append_deployment_log(record.id(), "late"));
    let second_finalize = rt.block_on(registry.finalize_deployment(&record));
    assert!(matches!(
        late_append,
        Err(BotRegistryError::DeploymentAlreadyFinalized(_))
    ));
    assert!(matches!(
        second_finalize,
        Err(BotRegistryError::DeploymentAlreadyFinalized(_))
    ));

    let stored = rt
        .block_on(registry.find_deployment(record.id()))
        .expect("lookup")
        .expect("record exists");
    assert_eq!(stored.status(), DeploymentStatus::Success);
    assert_eq!(stored.transcript_text(), "[FETCH] ok\n[BUILD] ok");
    assert!(stored.finalized_at().is_some());
}

#[rstest]
fn pending_records_and_missing_rows_are_rejected(shared_test_cluster: &'static TestCluster) {
    let guard = CleanupGuard::create(shared_test_cluster, "rejections").expect("database");
    let registry = guard.registry().expect("registry");
    let rt = test_runtime();
    let alpha = bot("alpha");
    rt.block_on(registry.create_bot(&alpha)).expect("create alpha");
    let record = rt
        .block_on(registry.create_deployment(alpha.id(), Utc::now()))
        .expect("record");

    let not_terminal = rt.block_on(registry.finalize_deployment(&record));
    let orphan = rt.block_on(registry.create_deployment(BotId::new(), Utc::now()));
    let missing_append =
        rt.block_on(registry.append_deployment_log(DeploymentId::new(9_999), "chunk"));
    let missing_lookup = rt
        .block_on(registry.find_deployment(DeploymentId::new(9_999)))
        .expect("lookup");

    assert!(matches!(
        not_terminal,
        Err(BotRegistryError::DeploymentNotTerminal(_))
    ));
    assert!(matches!(orphan, Err(BotRegistryError::BotNotFound(_))));
    assert!(matches!(
        missing_append,
        Err(BotRegistryError::DeploymentNotFound(_))
    ));
    assert!(missing_lookup.is_none());
}
