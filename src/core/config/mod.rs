//! core::config
//!
//! Configuration schema and loading.
//!
//! # Locations
//!
//! Searched in order, first hit wins:
//! 1. An explicit path (the CLI's `--config`)
//! 2. `$ODMA_CONFIG` if set
//! 3. `$XDG_CONFIG_HOME/odma/config.toml`
//! 4. `~/.odma/config.toml`
//!
//! No file found means defaults: repository `"default"`, verification on,
//! built-in vocabulary only.
//!
//! # Example
//!
//! ```no_run
//! use odma::core::config::Config;
//!
//! let config = Config::load(None).unwrap();
//! let registry = config.build_registry().unwrap();
//! println!("{} classes in {}", registry.class_count(), config.repository_id());
//! ```

pub mod schema;

pub use schema::{BootstrapConfig, ClassConfig, ConfigFile, PropertyConfig, RepositoryConfig};

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use super::error::DmaError;
use super::registry::MetamodelRegistry;
use super::types::DmaId;

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("invalid config value: {0}")]
    InvalidValue(String),

    #[error("schema extension rejected: {0}")]
    Schema(#[from] DmaError),
}

/// Loaded configuration.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Parsed file contents (defaults if no file was found)
    pub file: ConfigFile,
    /// Path the file was loaded from
    path: Option<PathBuf>,
}

impl Config {
    /// Default repository id.
    pub const DEFAULT_REPOSITORY_ID: &'static str = "default";

    /// Load configuration from `explicit` or the standard locations.
    ///
    /// # Errors
    ///
    /// Returns an error if `explicit` does not exist, or a file exists but
    /// cannot be parsed or validated. Missing standard files are not an
    /// error.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => Self::locate(),
        };

        let Some(path) = path else {
            debug!("no config file found, using defaults");
            return Ok(Self::default());
        };

        let file = Self::read(&path)?;
        file.validate()?;
        debug!(path = %path.display(), "loaded config");
        Ok(Self {
            file,
            path: Some(path),
        })
    }

    /// Parse and validate configuration from a TOML string.
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = toml::from_str(contents).map_err(|e| ConfigError::ParseError {
            path: PathBuf::from("<string>"),
            message: e.to_string(),
        })?;
        file.validate()?;
        Ok(Self { file, path: None })
    }

    fn locate() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("ODMA_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        if let Ok(xdg_home) = std::env::var("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_home).join("odma/config.toml");
            if path.exists() {
                return Some(path);
            }
        }

        dirs::home_dir()
            .map(|home| home.join(".odma/config.toml"))
            .filter(|path| path.exists())
    }

    fn read(path: &Path) -> Result<ConfigFile, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Bootstrap the built-in vocabulary plus the configured extensions.
    ///
    /// # Errors
    ///
    /// `ConfigError::Schema` with the bootstrap error if the extensions
    /// break the metamodel.
    pub fn build_registry(&self) -> Result<MetamodelRegistry, ConfigError> {
        let repository_id = DmaId::new(self.repository_id())?;

        let properties = self
            .file
            .properties
            .iter()
            .map(PropertyConfig::to_definition)
            .collect::<Result<Vec<_>, _>>()?;
        let classes = self
            .file
            .classes
            .iter()
            .map(ClassConfig::to_definition)
            .collect::<Result<Vec<_>, _>>()?;

        let registry = MetamodelRegistry::builder(repository_id)
            .with_builtin()
            .properties(properties)
            .classes(classes)
            .build()?;
        Ok(registry)
    }

    // =========================================================================
    // Accessor methods with defaults
    // =========================================================================

    /// Get the repository id.
    ///
    /// Defaults to "default" if not configured.
    pub fn repository_id(&self) -> &str {
        self.file
            .repository
            .as_ref()
            .and_then(|r| r.id.as_deref())
            .unwrap_or(Self::DEFAULT_REPOSITORY_ID)
    }

    /// Get the repository display name, if configured.
    pub fn repository_name(&self) -> Option<&str> {
        self.file.repository.as_ref().and_then(|r| r.name.as_deref())
    }

    /// Check if bootstrap should be followed by full verification.
    ///
    /// Defaults to `true` if not configured.
    pub fn verify(&self) -> bool {
        self.file
            .bootstrap
            .as_ref()
            .and_then(|b| b.verify)
            .unwrap_or(true)
    }

    /// Get the path to the loaded config file.
    pub fn loaded_from(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::registry::builtin::qname;
    use crate::core::types::QualifiedName;
    use tempfile::TempDir;

    #[test]
    fn defaults_without_file() {
        let config = Config::default();
        assert_eq!(config.repository_id(), "default");
        assert!(config.verify());
        assert!(config.repository_name().is_none());
        assert!(config.loaded_from().is_none());
    }

    #[test]
    fn load_explicit_path() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("odma.toml");
        fs::write(
            &path,
            r#"
            [repository]
            id = "sample"
            name = "Sample"

            [bootstrap]
            verify = false
            "#,
        )
        .unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.repository_id(), "sample");
        assert_eq!(config.repository_name(), Some("Sample"));
        assert!(!config.verify());
        assert_eq!(config.loaded_from(), Some(path.as_path()));
    }

    #[test]
    fn missing_explicit_path_is_an_error() {
        let temp = TempDir::new().unwrap();
        let result = Config::load(Some(&temp.path().join("absent.toml")));
        assert!(matches!(result, Err(ConfigError::ReadError { .. })));
    }

    #[test]
    fn parse_errors_name_the_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("broken.toml");
        fs::write(&path, "[repository\nid = 1").unwrap();

        let err = Config::load(Some(&path)).unwrap_err();
        assert!(err.to_string().contains("broken.toml"));
    }

    #[test]
    fn extensions_reach_the_registry() {
        let config = Config::from_toml(
            r#"
            [repository]
            id = "acme"

            [[class]]
            name = "acme:Invoice"
            super_class = "opendma:Document"
            aspects = ["acme:Billable"]
            properties = ["acme:Amount"]

            [[class]]
            name = "acme:Billable"
            aspect = true
            properties = ["acme:Currency"]

            [[property]]
            name = "acme:Amount"
            data_type = "Double"

            [[property]]
            name = "acme:Currency"
            data_type = "String"
            choices = ["EUR", "USD"]
            "#,
        )
        .unwrap();

        let registry = config.build_registry().unwrap();
        let invoice = registry
            .class(&QualifiedName::new("acme", "Invoice").unwrap())
            .unwrap();
        assert!(invoice.property(&qname("Title")).is_some());
        assert!(invoice
            .property(&QualifiedName::new("acme", "Currency").unwrap())
            .is_some());
        assert_eq!(registry.repository_id().as_str(), "acme");
    }

    #[test]
    fn broken_extension_is_a_schema_error() {
        let config = Config::from_toml(
            r#"
            [[class]]
            name = "acme:Memo"
            super_class = "opendma:Document"
            properties = ["opendma:Title"]
            "#,
        )
        .unwrap();

        assert!(matches!(
            config.build_registry(),
            Err(ConfigError::Schema(DmaError::DuplicatePropertyDeclaration { .. }))
        ));
    }
}
