//! Adapter implementations for the container runtime port.

mod connection;
mod descriptor;
pub mod docker;
pub mod memory;

pub use connection::RuntimeConnection;
pub use descriptor::ensure_descriptor;
pub use docker::{DockerContainerRuntime, DockerRuntimeOptions};
pub use memory::{InMemoryContainerRuntime, SimulatedContainer};
