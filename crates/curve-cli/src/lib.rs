//! Focus time tracker CLI library.
//!
//! This crate provides the CLI interface and the host event loop for the
//! focus time tracker.

mod cli;
pub mod commands;
mod config;

pub use cli::{Cli, Commands};
pub use config::Config;
