//! Descriptor preparation shared by runtime adapters.

use crate::registry::domain::BotRuntime;
use crate::runtime::{
    domain::{
        DESCRIPTOR_FILE_NAME, dependency_manifest, render_default_descriptor, validate_descriptor,
    },
    ports::BuildError,
};
use camino::Utf8Path;
use cap_std::ambient_authority;
use cap_std::fs_utf8::Dir;
use std::io::ErrorKind;

/// Makes sure `source_path` holds a usable descriptor.
///
/// An existing descriptor is validated and left untouched; otherwise the
/// default descriptor for `runtime` is written. Returns whether a
/// descriptor was synthesized.
///
/// # Errors
///
/// Returns [`BuildError::BuildStepFailed`] when the directory is missing or
/// unwritable and [`BuildError::DescriptorInvalid`] for malformed
/// descriptors.
pub fn ensure_descriptor(source_path: &Utf8Path, runtime: BotRuntime) -> Result<bool, BuildError> {
    let dir = Dir::open_ambient_dir(source_path, ambient_authority()).map_err(|err| {
        BuildError::BuildStepFailed(format!("cannot open source directory {source_path}: {err}"))
    })?;

    match dir.read_to_string(DESCRIPTOR_FILE_NAME) {
        Ok(contents) => {
            validate_descriptor(&contents)?;
            return Ok(false);
        }
        Err(err) if err.kind() == ErrorKind::NotFound => {}
        Err(err) => {
            return Err(BuildError::BuildStepFailed(format!(
                "cannot read {DESCRIPTOR_FILE_NAME}: {err}"
            )));
        }
    }

    let (manifest, _) = dependency_manifest(runtime);
    let has_manifest = dir.is_file(manifest);
    let rendered = render_default_descriptor(runtime, has_manifest)?;
    dir.write(DESCRIPTOR_FILE_NAME, rendered).map_err(|err| {
        BuildError::BuildStepFailed(format!("cannot write {DESCRIPTOR_FILE_NAME}: {err}"))
    })?;
    Ok(true)
}
