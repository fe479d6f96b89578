//! cli
//!
//! Command-line interface layer for odma.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and global flags
//! - Load configuration and bootstrap the metamodel
//! - Delegate to command handlers
//!
//! The CLI is read-only: it inspects a metamodel, it never changes one.

pub mod args;
pub mod commands;

pub use args::Cli;

use anyhow::Result;

use crate::ui::output::Verbosity;

/// Run the CLI application with parsed arguments.
///
/// This is the main entry point called from `main.rs`.
pub fn run(cli: Cli) -> Result<()> {
    let ctx = commands::Context {
        config: cli.config.clone(),
        verbosity: Verbosity::from_flags(cli.quiet, cli.debug),
        json: cli.json,
    };

    commands::dispatch(cli.command, &ctx)
}
