//! Botyard: build, deploy, and supervise containerized bots.
//!
//! Each bot owns a source directory, an image, and at most one container,
//! all addressed by names derived from the bot identifier. A deployment
//! fetches source (or expands an uploaded archive), builds the image, and
//! relaunches the container, leaving an auditable record behind.
//!
//! # Architecture
//!
//! Botyard follows hexagonal architecture principles:
//!
//! - **Domain**: Pure business logic with no infrastructure dependencies
//! - **Ports**: Abstract trait interfaces for external interactions
//! - **Adapters**: Concrete implementations of ports (database, Docker, git)
//!
//! # Modules
//!
//! - [`registry`]: Bot definitions, environments, and deployment history
//! - [`runtime`]: Container engine control and naming
//! - [`source`]: Git fetches and archive uploads
//! - [`deployment`]: The deployment orchestrator
//! - [`config`]: Platform configuration
//! - [`telemetry`]: Tracing setup

pub mod config;
pub mod deployment;
pub mod registry;
pub mod runtime;
pub mod source;
pub mod telemetry;
