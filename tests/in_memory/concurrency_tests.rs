//! Per-bot exclusion and parallel deployments.

use std::sync::Arc;

use super::helpers::{ALPHA_REMOTE, Platform, platform};
use async_trait::async_trait;
use botyard::deployment::services::DeploymentError;
use botyard::registry::domain::{DeploymentStatus, RemoteUrl};
use botyard::source::{
    adapters::InMemorySourceFetcher,
    domain::{FetchError, FetchKind, FetchLog},
    ports::{SourceFetcher, SourceFetcherResult},
};
use camino::Utf8Path;
use rstest::rstest;
use tokio::sync::Notify;

/// Fetcher that parks inside `fetch` until released.
#[derive(Default)]
struct GatedFetcher {
    entered: Notify,
    release: Notify,
}

#[async_trait]
impl SourceFetcher for GatedFetcher {
    async fn fetch(
        &self,
        _remote: &RemoteUrl,
        local_path: &Utf8Path,
    ) -> SourceFetcherResult<FetchLog> {
        tokio::fs::create_dir_all(local_path)
            .await
            .map_err(|err| FetchError::Io(err.to_string()))?;
        self.entered.notify_one();
        self.release.notified().await;
        Ok(FetchLog {
            kind: FetchKind::Clone,
            output: String::new(),
        })
    }
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn concurrent_triggers_for_one_bot_conflict() {
    let platform = Platform::with_fetcher(GatedFetcher::default());
    let alpha = platform.bot_with_remote("alpha", ALPHA_REMOTE).await;

    let orchestrator = Arc::clone(&platform.orchestrator);
    let bot_id = alpha.id();
    let first = tokio::spawn(async move { orchestrator.trigger_deploy(bot_id).await });
    platform.fetcher.entered.notified().await;

    for _ in 0..3 {
        let result = platform.orchestrator.trigger_deploy(bot_id).await;
        assert!(matches!(result, Err(DeploymentError::Conflict(id)) if id == bot_id));
    }
    assert!(matches!(
        platform.orchestrator.restart_bot(bot_id).await,
        Err(DeploymentError::Conflict(_))
    ));
    assert!(platform.orchestrator.is_in_flight(bot_id));

    platform.fetcher.release.notify_one();
    let record = first.await.expect("task joins").expect("deploy runs");

    assert_eq!(record.status(), DeploymentStatus::Success);
    assert!(!platform.orchestrator.is_in_flight(bot_id));
    let history = platform
        .orchestrator
        .list_deployments(bot_id, None)
        .await
        .expect("history");
    assert_eq!(history.len(), 1);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn different_bots_deploy_in_parallel(platform: Platform<InMemorySourceFetcher>) {
    let alpha = platform.bot_with_remote("alpha", ALPHA_REMOTE).await;
    let gamma = platform
        .bot_with_remote("gamma", "https://example.com/gamma.git")
        .await;

    let (alpha_record, gamma_record) = tokio::join!(
        platform.orchestrator.trigger_deploy(alpha.id()),
        platform.orchestrator.trigger_deploy(gamma.id()),
    );

    assert_eq!(
        alpha_record.expect("alpha deploys").status(),
        DeploymentStatus::Success
    );
    assert_eq!(
        gamma_record.expect("gamma deploys").status(),
        DeploymentStatus::Success
    );
    assert!(platform.runtime.container(alpha.id()).is_some());
    assert!(platform.runtime.container(gamma.id()).is_some());
}
