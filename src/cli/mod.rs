//! Command-line interface definitions and helpers.
//!
//! This module contains all CLI argument parsing and subcommand handlers.

mod args;
mod commands;

pub use args::{Args, Command, ConfigAction};
pub use commands::{build_dispatcher, exec, handle_config_action, run_server};
