//! Given steps for deployment lifecycle BDD scenarios.

use super::world::{DeploymentWorld, run_async};
use botyard::registry::{domain::RemoteUrl, services::CreateBotRequest};
use eyre::WrapErr;
use rstest_bdd_macros::given;

#[given(r#"a bot "{name}" with remote "{remote}""#)]
fn bot_with_remote(
    world: &mut DeploymentWorld,
    name: String,
    remote: String,
) -> Result<(), eyre::Report> {
    let remote_url = RemoteUrl::new(remote.as_str()).wrap_err("parse scenario remote")?;
    world
        .fetcher
        .set_repository(&remote_url, [("bot.py", "print('hello')\n")]);
    let bot = run_async(world.catalog.create_bot(
        CreateBotRequest::new(name.as_str())
            .with_repo_url(remote)
            .with_start_command("python bot.py"),
    ))
    .wrap_err("register bot with remote")?;
    world.bots.insert(name, bot);
    Ok(())
}

#[given(r#"a bot "{name}" without a remote"#)]
fn bot_without_remote(world: &mut DeploymentWorld, name: String) -> Result<(), eyre::Report> {
    let bot = run_async(world.catalog.create_bot(CreateBotRequest::new(name.as_str())))
        .wrap_err("register upload-only bot")?;
    world.bots.insert(name, bot);
    Ok(())
}

#[given(r#"the bot "{name}" has been deployed"#)]
fn bot_has_been_deployed(world: &mut DeploymentWorld, name: String) -> Result<(), eyre::Report> {
    let bot_id = world.bot(&name)?.id();
    let record = run_async(world.orchestrator.trigger_deploy(bot_id))
        .wrap_err("deploy bot in scenario setup")?;
    eyre::ensure!(
        record.status().is_terminal(),
        "setup deployment did not finish"
    );
    Ok(())
}

#[given(r#"the remote "{remote}" serves a malformed Dockerfile"#)]
fn remote_serves_malformed_descriptor(
    world: &mut DeploymentWorld,
    remote: String,
) -> Result<(), eyre::Report> {
    let remote_url = RemoteUrl::new(remote).wrap_err("parse scenario remote")?;
    world.fetcher.set_repository(
        &remote_url,
        [("bot.py", "print('hello')\n"), ("Dockerfile", "RUN exit 1\n")],
    );
    Ok(())
}

#[given("the container runtime is unavailable")]
fn runtime_is_unavailable(world: &mut DeploymentWorld) {
    world.runtime.set_unavailable("cannot connect to the Docker daemon");
}
