//! End-to-end deployment flows over in-memory adapters.

use super::helpers::{ALPHA_REMOTE, Platform, platform, step_labels, zip_archive};
use botyard::registry::{
    domain::{DeploymentStatus, RemoteUrl},
    ports::BotRegistry,
};
use botyard::runtime::{
    domain::{RuntimeStatus, container_name},
    ports::ContainerRuntime,
};
use botyard::source::{adapters::InMemorySourceFetcher, domain::FetchKind};
use rstest::rstest;

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn alpha_first_deploy_reports_clone_build_start(platform: Platform<InMemorySourceFetcher>) {
    let alpha = platform.bot_with_remote("alpha", ALPHA_REMOTE).await;

    let record = platform
        .orchestrator
        .trigger_deploy(alpha.id())
        .await
        .expect("deploy runs");

    assert_eq!(record.status(), DeploymentStatus::Success);
    assert_eq!(step_labels(record.transcript()), ["FETCH", "BUILD", "RELAUNCH"]);
    let text = record.transcript_text();
    let clone_at = text.find("Successfully cloned repository").expect("clone line");
    let build_at = text.find("Image built successfully").expect("build line");
    let start_at = text
        .find(&format!("Container {} started successfully", container_name(alpha.id())))
        .expect("start line");
    assert!(clone_at < build_at && build_at < start_at);

    assert_eq!(platform.fetcher.calls()[0].kind, FetchKind::Clone);
    assert_eq!(platform.fetcher.calls()[0].local_path, platform.code_root.join("alpha"));
    assert!(platform.code_root.join("alpha/Dockerfile").is_file());
    assert_eq!(platform.runtime.status(alpha.id()).await, RuntimeStatus::Running);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn malformed_descriptor_redeploy_keeps_alpha_running(
    platform: Platform<InMemorySourceFetcher>,
) {
    let alpha = platform.bot_with_remote("alpha", ALPHA_REMOTE).await;
    platform
        .orchestrator
        .trigger_deploy(alpha.id())
        .await
        .expect("first deploy");
    let generation = platform.runtime.image_generation(alpha.id());
    let remote = RemoteUrl::new(ALPHA_REMOTE).expect("valid remote");
    platform.fetcher.set_repository(
        &remote,
        [("bot.py", "print('alpha')\n"), ("Dockerfile", "# no base image\nCOPY . .\n")],
    );

    let record = platform
        .orchestrator
        .trigger_deploy(alpha.id())
        .await
        .expect("redeploy runs");

    assert_eq!(record.status(), DeploymentStatus::Failed);
    assert_eq!(step_labels(record.transcript()), ["FETCH", "BUILD"]);
    assert!(record.transcript_text().contains("Build failed"));
    assert_eq!(platform.runtime.image_generation(alpha.id()), generation);
    assert_eq!(
        platform.orchestrator.query_status(alpha.id()).await.expect("status"),
        RuntimeStatus::Running
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn beta_upload_deploy_has_no_fetch_step(platform: Platform<InMemorySourceFetcher>) {
    let beta = platform.upload_bot("beta").await;
    let archive = zip_archive(&[("bot.py", "print('beta')\n")]);

    let record = platform
        .orchestrator
        .trigger_upload_deploy(beta.id(), archive)
        .await
        .expect("upload deploy runs");

    assert_eq!(record.status(), DeploymentStatus::Success);
    assert_eq!(step_labels(record.transcript()), ["UPLOAD", "BUILD", "RELAUNCH"]);
    assert!(platform.fetcher.calls().is_empty());
    assert!(platform.code_root.join("beta/bot.py").is_file());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn remoteless_redeploy_rebuilds_uploaded_sources(platform: Platform<InMemorySourceFetcher>) {
    let beta = platform.upload_bot("beta").await;
    platform
        .orchestrator
        .trigger_upload_deploy(beta.id(), zip_archive(&[("bot.py", "print('beta')\n")]))
        .await
        .expect("upload deploy runs");

    let record = platform
        .orchestrator
        .trigger_deploy(beta.id())
        .await
        .expect("redeploy runs");

    assert_eq!(record.status(), DeploymentStatus::Success);
    assert_eq!(step_labels(record.transcript()), ["BUILD", "RELAUNCH"]);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn stopping_a_never_started_bot_twice_succeeds(platform: Platform<InMemorySourceFetcher>) {
    let beta = platform.upload_bot("beta").await;

    platform.orchestrator.stop_bot(beta.id()).await.expect("first stop");
    platform.orchestrator.stop_bot(beta.id()).await.expect("second stop");

    assert_eq!(
        platform.orchestrator.query_status(beta.id()).await.expect("status"),
        RuntimeStatus::Stopped { reason: None }
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn deleting_a_bot_drops_its_history(platform: Platform<InMemorySourceFetcher>) {
    let alpha = platform.bot_with_remote("alpha", ALPHA_REMOTE).await;
    let record = platform
        .orchestrator
        .trigger_deploy(alpha.id())
        .await
        .expect("deploy runs");

    platform.catalog.delete_bot(alpha.id()).await.expect("delete");

    assert_eq!(
        platform
            .registry
            .find_deployment(record.id())
            .await
            .expect("lookup"),
        None
    );
    assert!(platform.orchestrator.trigger_deploy(alpha.id()).await.is_err());
}
