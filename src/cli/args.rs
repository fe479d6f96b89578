//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--config <path>`: Load this config file instead of searching
//! - `--debug`: Enable debug logging
//! - `--quiet` / `-q`: Minimal output
//! - `--json`: Machine-readable output

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// odma - inspect and check an OpenDMA-style metamodel
#[derive(Parser, Debug)]
#[command(name = "odma")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file to load instead of the standard locations
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Minimal output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Emit JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show the class tree and root aspects
    Classes {
        /// Include hidden classes
        #[arg(long)]
        all: bool,
    },

    /// Describe one class or aspect
    #[command(after_help = "\
EXAMPLES:
    odma describe opendma:Document
    odma describe acme:Invoice --json")]
    Describe {
        /// Qualified name, e.g. opendma:Folder
        #[arg(value_name = "NAMESPACE:NAME")]
        class: String,
    },

    /// List property descriptors
    Properties {
        /// Only properties of this class (effective)
        #[arg(long, value_name = "NAMESPACE:NAME")]
        class: Option<String>,
    },

    /// Bootstrap the metamodel and run full verification
    Check,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::parse_from(["odma", "describe", "opendma:Folder", "--json", "-q"]);
        assert!(cli.json);
        assert!(cli.quiet);
        assert!(matches!(cli.command, Command::Describe { ref class } if class == "opendma:Folder"));
    }
}
