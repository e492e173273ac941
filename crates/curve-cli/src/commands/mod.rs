//! CLI subcommand implementations.

pub mod export;
pub mod show;
pub mod status;
pub mod track;
