//! When steps for deployment lifecycle BDD scenarios.

use super::world::{DeploymentWorld, run_async};
use eyre::WrapErr;
use rstest_bdd_macros::when;
use std::io::Write;
use zip::{ZipWriter, write::SimpleFileOptions};

#[when(r#"the bot "{name}" is deployed"#)]
fn bot_is_deployed(world: &mut DeploymentWorld, name: String) -> Result<(), eyre::Report> {
    let bot_id = world.bot(&name)?.id();
    world.last_deploy = Some(run_async(world.orchestrator.trigger_deploy(bot_id)));
    Ok(())
}

#[when(r#"an archive containing "{file}" is uploaded for "{name}""#)]
fn archive_is_uploaded(
    world: &mut DeploymentWorld,
    file: String,
    name: String,
) -> Result<(), eyre::Report> {
    let bot_id = world.bot(&name)?.id();
    let mut writer = ZipWriter::new(std::io::Cursor::new(Vec::new()));
    writer
        .start_file(file.as_str(), SimpleFileOptions::default())
        .wrap_err("start archive entry")?;
    writer
        .write_all(b"print('uploaded')\n")
        .wrap_err("write archive entry")?;
    let archive = writer.finish().wrap_err("finish archive")?.into_inner();

    world.last_deploy = Some(run_async(
        world.orchestrator.trigger_upload_deploy(bot_id, archive),
    ));
    Ok(())
}

#[when(r#"the bot "{name}" is stopped twice"#)]
fn bot_is_stopped_twice(world: &mut DeploymentWorld, name: String) -> Result<(), eyre::Report> {
    let bot_id = world.bot(&name)?.id();
    run_async(world.orchestrator.stop_bot(bot_id)).wrap_err("first stop")?;
    run_async(world.orchestrator.stop_bot(bot_id)).wrap_err("second stop")?;
    Ok(())
}
