//! Bot and environment persistence against embedded `PostgreSQL`.

use super::helpers::{CleanupGuard, bot, test_runtime};
use botyard::registry::{
    domain::{BotId, BotRuntime, BotSettings, EnvironmentSet, RemoteUrl, StartCommand},
    ports::{BotRegistry, BotRegistryError},
};
use chrono::Utc;
use mockable::DefaultClock;
use pg_embedded_setup_unpriv::{TestCluster, test_support::shared_test_cluster};
use rstest::rstest;

#[rstest]
fn duplicate_names_map_to_the_unique_constraint(shared_test_cluster: &'static TestCluster) {
    let guard = CleanupGuard::create(shared_test_cluster, "dup_name").expect("database");
    let registry = guard.registry().expect("registry");
    let rt = test_runtime();

    rt.block_on(registry.create_bot(&bot("alpha")))
        .expect("first create");
    let result = rt.block_on(registry.create_bot(&bot("alpha")));

    assert!(
        matches!(result, Err(BotRegistryError::DuplicateBotName(name)) if name.as_str() == "alpha")
    );
}

#[rstest]
fn bots_survive_a_round_trip_through_rows(shared_test_cluster: &'static TestCluster) {
    let guard = CleanupGuard::create(shared_test_cluster, "bot_rows").expect("database");
    let registry = guard.registry().expect("registry");
    let rt = test_runtime();
    let mut alpha = bot("alpha");
    rt.block_on(registry.create_bot(&alpha)).expect("create");

    let settings = BotSettings::new(BotRuntime::Node)
        .with_repo_url(RemoteUrl::new("https://example.com/alpha.git").expect("valid url"))
        .with_start_command(StartCommand::new("node index.js"));
    alpha.update_settings(settings, &DefaultClock);
    rt.block_on(registry.update_bot(&alpha)).expect("update");

    let by_name = rt
        .block_on(registry.find_bot_by_name(alpha.name()))
        .expect("lookup")
        .expect("bot exists");
    assert_eq!(by_name.id(), alpha.id());
    assert_eq!(by_name.runtime(), BotRuntime::Node);
    assert_eq!(
        by_name.repo_url().map(RemoteUrl::as_str),
        Some("https://example.com/alpha.git")
    );
    assert_eq!(by_name.start_command().as_str(), "node index.js");
    assert_eq!(by_name.code_path(), alpha.code_path());
}

#[rstest]
fn updating_or_deleting_an_unknown_bot_is_reported(shared_test_cluster: &'static TestCluster) {
    let guard = CleanupGuard::create(shared_test_cluster, "unknown_bot").expect("database");
    let registry = guard.registry().expect("registry");
    let rt = test_runtime();
    let ghost = bot("ghost");

    let update = rt.block_on(registry.update_bot(&ghost));
    let delete = rt.block_on(registry.delete_bot(ghost.id()));
    let environment = rt.block_on(registry.load_environment(BotId::new()));

    assert!(matches!(update, Err(BotRegistryError::BotNotFound(_))));
    assert!(matches!(delete, Err(BotRegistryError::BotNotFound(_))));
    assert!(matches!(environment, Err(BotRegistryError::BotNotFound(_))));
}

#[rstest]
fn environment_replacement_keeps_insertion_order(shared_test_cluster: &'static TestCluster) {
    let guard = CleanupGuard::create(shared_test_cluster, "env_order").expect("database");
    let registry = guard.registry().expect("registry");
    let rt = test_runtime();
    let alpha = bot("alpha");
    rt.block_on(registry.create_bot(&alpha)).expect("create");

    let first = EnvironmentSet::from_pairs([("TOKEN", "abc"), ("MODE", "prod")])
        .expect("valid pairs");
    rt.block_on(registry.replace_environment(alpha.id(), &first))
        .expect("first replace");
    let second = EnvironmentSet::from_pairs([("ZETA", "1"), ("ALPHA", "2")]).expect("valid pairs");
    rt.block_on(registry.replace_environment(alpha.id(), &second))
        .expect("second replace");

    let stored = rt
        .block_on(registry.load_environment(alpha.id()))
        .expect("load");
    let keys: Vec<&str> = stored.variables().iter().map(|var| var.key()).collect();
    assert_eq!(keys, ["ZETA", "ALPHA"]);
    assert_eq!(stored.get("TOKEN"), None);
    assert_eq!(stored.get("ALPHA"), Some("2"));
}

#[rstest]
fn deleting_a_bot_cascades_to_rows(shared_test_cluster: &'static TestCluster) {
    let guard = CleanupGuard::create(shared_test_cluster, "cascade").expect("database");
    let registry = guard.registry().expect("registry");
    let rt = test_runtime();
    let alpha = bot("alpha");
    let beta = bot("beta");
    rt.block_on(registry.create_bot(&alpha)).expect("create alpha");
    rt.block_on(registry.create_bot(&beta)).expect("create beta");
    let environment = EnvironmentSet::from_pairs([("TOKEN", "abc")]).expect("valid pairs");
    rt.block_on(registry.replace_environment(alpha.id(), &environment))
        .expect("replace env");
    rt.block_on(registry.create_deployment(alpha.id(), Utc::now()))
        .expect("alpha record");
    rt.block_on(registry.create_deployment(beta.id(), Utc::now()))
        .expect("beta record");

    rt.block_on(registry.delete_bot(alpha.id()))
        .expect("delete alpha");

    let bots = rt.block_on(registry.list_bots()).expect("list bots");
    let names: Vec<&str> = bots.iter().map(|found| found.name().as_str()).collect();
    assert_eq!(names, ["beta"]);
    assert!(
        rt.block_on(registry.list_deployments(alpha.id(), None))
            .expect("list")
            .is_empty()
    );
    assert_eq!(
        rt.block_on(registry.list_deployments(beta.id(), None))
            .expect("list")
            .len(),
        1
    );
    assert!(matches!(
        rt.block_on(registry.load_environment(alpha.id())),
        Err(BotRegistryError::BotNotFound(_))
    ));
}
