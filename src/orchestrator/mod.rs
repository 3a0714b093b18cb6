// src/orchestrator/mod.rs

//! Client-side protocol for driving an NFV orchestrator.
//!
//! - [`commands`] builds the CLI command lines and names the recorded actions.
//! - [`lifecycle`] composes runner, status parsing and polling into the
//!   account / descriptor / instance primitives.
//! - [`gatekeeper`] is the REST variant used by the gatekeeper scenario.

pub mod commands;
pub mod gatekeeper;
pub mod lifecycle;

pub use commands::{OsmCommands, action};
pub use gatekeeper::GatekeeperClient;
pub use lifecycle::LifecycleOrchestrator;
