//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! # Architecture
//!
//! Each command handler:
//! 1. Loads configuration and bootstraps the registry
//! 2. Queries the registry
//! 3. Formats and displays output, as text or JSON
//!
//! Handlers never mutate the metamodel.

mod check;
mod classes;
mod describe;
mod properties;

pub use check::check;
pub use classes::classes;
pub use describe::describe;
pub use properties::properties;

use std::path::PathBuf;

use anyhow::{bail, Context as _, Result};
use serde::Serialize;

use super::args::Command;
use crate::core::config::Config;
use crate::core::registry::MetamodelRegistry;
use crate::core::schema::PropertyDescriptor;
use crate::core::types::QualifiedName;
use crate::core::verify::verify_registry;
use crate::ui::output::{self, Verbosity};

/// Settings shared by every command.
#[derive(Debug, Clone)]
pub struct Context {
    /// Explicit config path
    pub config: Option<PathBuf>,
    pub verbosity: Verbosity,
    /// Emit JSON
    pub json: bool,
}

/// Dispatch a command to its handler.
pub fn dispatch(command: Command, ctx: &Context) -> Result<()> {
    match command {
        Command::Classes { all } => classes::classes(ctx, all),
        Command::Describe { class } => describe::describe(ctx, &class),
        Command::Properties { class } => properties::properties(ctx, class.as_deref()),
        Command::Check => check::check(ctx),
    }
}

/// Load configuration from the context.
fn load_config(ctx: &Context) -> Result<Config> {
    let config = Config::load(ctx.config.as_deref()).context("failed to load configuration")?;
    match config.loaded_from() {
        Some(path) => output::debug(format!("config: {}", path.display()), ctx.verbosity),
        None => output::debug("config: defaults", ctx.verbosity),
    }
    Ok(config)
}

/// Load configuration and bootstrap the registry.
///
/// Runs verification unless the config turns it off.
fn load_registry(ctx: &Context) -> Result<MetamodelRegistry> {
    let config = load_config(ctx)?;
    let registry = config
        .build_registry()
        .context("failed to bootstrap metamodel")?;

    if config.verify() {
        let result = verify_registry(&registry);
        if !result.ok {
            for err in &result.errors {
                output::warn(err, ctx.verbosity);
            }
            bail!(
                "metamodel verification failed with {} error(s)",
                result.errors.len()
            );
        }
    }
    Ok(registry)
}

fn parse_name(raw: &str) -> Result<QualifiedName> {
    raw.parse()
        .with_context(|| format!("invalid qualified name '{raw}'"))
}

/// Serializable summary of a property descriptor.
#[derive(Debug, Serialize)]
struct PropertyView {
    name: String,
    display_name: String,
    data_type: String,
    multi_value: bool,
    required: bool,
    read_only: bool,
    hidden: bool,
    system: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    reference_class: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    choices: Vec<String>,
}

impl From<&PropertyDescriptor> for PropertyView {
    fn from(p: &PropertyDescriptor) -> Self {
        Self {
            name: p.name().to_string(),
            display_name: p.display_name().to_string(),
            data_type: p.data_type().to_string(),
            multi_value: p.is_multi_value(),
            required: p.is_required(),
            read_only: p.is_read_only(),
            hidden: p.is_hidden(),
            system: p.is_system(),
            reference_class: p.reference_class_name().map(ToString::to_string),
            choices: p.choices().iter().map(ToString::to_string).collect(),
        }
    }
}

impl std::fmt::Display for PropertyView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} : {}", self.name, self.data_type)?;
        if self.multi_value {
            f.write_str("[]")?;
        }
        if let Some(target) = &self.reference_class {
            write!(f, " -> {target}")?;
        }

        let flags: Vec<&str> = [
            (self.required, "required"),
            (self.read_only, "read-only"),
            (self.hidden, "hidden"),
            (self.system, "system"),
        ]
        .into_iter()
        .filter_map(|(set, label)| set.then_some(label))
        .collect();
        if !flags.is_empty() {
            write!(f, " ({})", flags.join(", "))?;
        }
        if !self.choices.is_empty() {
            write!(f, " {{{}}}", self.choices.join(", "))?;
        }
        Ok(())
    }
}
