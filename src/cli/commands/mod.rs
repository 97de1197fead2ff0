//! Command implementations for the CLI.
//!
//! Each command is implemented in its own module.

pub mod chat;
pub mod check;
pub mod init;
pub mod rules;
