//! CLI module for the compliance checker.
//!
//! Provides command-line interface parsing and command dispatch.

pub mod args;
pub mod commands;

pub use args::{Cli, Commands, PipelineOverrides, RulesAction};
