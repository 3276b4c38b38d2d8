//! CLI layer for docquest.
//!
//! Provides the command-line interface using clap, with commands for
//! answering questions about documents and managing the snapshot cache.

pub mod commands;
pub mod output;
pub mod parser;

pub use commands::execute;
pub use output::OutputFormat;
pub use parser::{CacheCommands, Cli, Commands};
