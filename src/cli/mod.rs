//! Command-line interface for cover-minder.
//!
//! This module provides CLI commands for resolving artwork, warming the
//! cache from a list of albums, and inspecting or clearing the cache.

mod commands;

pub use commands::{Cli, Commands, run_command};
