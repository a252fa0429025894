//! Then steps for deployment lifecycle BDD scenarios.

use super::world::{DeploymentWorld, run_async};
use botyard::deployment::services::DeploymentError;
use botyard::registry::domain::DeploymentStatus;
use botyard::runtime::domain::RuntimeStatus;
use eyre::WrapErr;
use rstest_bdd_macros::then;

#[then(r#"the latest deployment of "{name}" is "{status}""#)]
fn latest_deployment_status(
    world: &DeploymentWorld,
    name: String,
    status: String,
) -> Result<(), eyre::Report> {
    let expected = DeploymentStatus::try_from(status.as_str())
        .map_err(|err| eyre::eyre!("invalid expected status in scenario: {err}"))?;
    let bot_id = world.bot(&name)?.id();
    let history = run_async(world.orchestrator.list_deployments(bot_id, Some(1)))
        .wrap_err("load deployment history")?;
    let latest = history
        .first()
        .ok_or_else(|| eyre::eyre!("bot '{name}' has no deployments"))?;

    eyre::ensure!(
        latest.status() == expected,
        "expected status {expected}, found {}; transcript:\n{}",
        latest.status(),
        latest.transcript_text()
    );
    Ok(())
}

#[then(r#"the transcript of "{name}" lists the steps "{steps}""#)]
fn transcript_lists_steps(
    world: &DeploymentWorld,
    name: String,
    steps: String,
) -> Result<(), eyre::Report> {
    let bot_id = world.bot(&name)?.id();
    let history = run_async(world.orchestrator.list_deployments(bot_id, Some(1)))
        .wrap_err("load deployment history")?;
    let latest = history
        .first()
        .ok_or_else(|| eyre::eyre!("bot '{name}' has no deployments"))?;

    let labels: Vec<&str> = latest
        .transcript()
        .iter()
        .filter_map(|chunk| {
            chunk
                .strip_prefix('[')
                .and_then(|rest| rest.split_once(']'))
                .map(|(label, _)| label)
        })
        .collect();
    let expected: Vec<&str> = steps.split(',').map(str::trim).collect();

    eyre::ensure!(
        labels == expected,
        "expected steps {expected:?}, found {labels:?}"
    );
    Ok(())
}

#[then(r#"the bot "{name}" is running"#)]
fn bot_is_running(world: &DeploymentWorld, name: String) -> Result<(), eyre::Report> {
    let bot_id = world.bot(&name)?.id();
    let status = run_async(world.orchestrator.query_status(bot_id)).wrap_err("query status")?;
    eyre::ensure!(
        status == RuntimeStatus::Running,
        "expected running, found {status}"
    );
    Ok(())
}

#[then(r#"the bot "{name}" is stopped"#)]
fn bot_is_stopped(world: &DeploymentWorld, name: String) -> Result<(), eyre::Report> {
    let bot_id = world.bot(&name)?.id();
    let status = run_async(world.orchestrator.query_status(bot_id)).wrap_err("query status")?;
    eyre::ensure!(
        matches!(status, RuntimeStatus::Stopped { .. }),
        "expected stopped, found {status}"
    );
    Ok(())
}

#[then("the deployment is refused as runtime unavailable")]
fn deployment_refused(world: &DeploymentWorld) -> Result<(), eyre::Report> {
    let result = world
        .last_deploy
        .as_ref()
        .ok_or_else(|| eyre::eyre!("missing deployment result"))?;
    eyre::ensure!(
        matches!(result, Err(DeploymentError::RuntimeUnavailable(_))),
        "expected RuntimeUnavailable, got {result:?}"
    );
    Ok(())
}

#[then(r#"the bot "{name}" has no deployments"#)]
fn bot_has_no_deployments(world: &DeploymentWorld, name: String) -> Result<(), eyre::Report> {
    let bot_id = world.bot(&name)?.id();
    let history = run_async(world.orchestrator.list_deployments(bot_id, None))
        .wrap_err("load deployment history")?;
    eyre::ensure!(history.is_empty(), "expected no deployments, found {}", history.len());
    Ok(())
}
