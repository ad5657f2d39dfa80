//! Tooling
//!
//! Command-line front end for running a bot and inspecting its command table
//! and modules.

pub mod cli;

pub use cli::{Cli, CliContext, Commands};
