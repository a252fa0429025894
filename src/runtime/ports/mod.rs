//! Port contracts for the container runtime.

mod runtime;

pub use runtime::{
    BuildError, ContainerRuntime, LogError, RunError, RuntimeError, RuntimeResult, StopError,
};
