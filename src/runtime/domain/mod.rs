//! Domain model for container naming, status, and build inputs.

mod build;
mod descriptor;
mod naming;
mod status;

pub use build::{BuildContext, BuildLog, RunInfo};
pub use descriptor::{
    DESCRIPTOR_FILE_NAME, DescriptorError, dependency_manifest, render_default_descriptor,
    validate_descriptor,
};
pub use naming::{
    ContainerHandle, candidate_image_name, container_name, image_name, image_repository,
};
pub use status::RuntimeStatus;
