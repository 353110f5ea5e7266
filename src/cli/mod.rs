//! CLI module
//!
//! Command handlers for the workbench command-line interface.

pub mod commands;

pub use commands::{cmd_artifact_id, cmd_inspect, cmd_serve, CliResult};
