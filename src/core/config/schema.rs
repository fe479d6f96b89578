//! core::config::schema
//!
//! Configuration schema types.
//!
//! # Layout
//!
//! ```toml
//! [repository]
//! id = "sample"
//! name = "Sample repository"
//!
//! [bootstrap]
//! verify = true
//!
//! [[class]]
//! name = "acme:Invoice"
//! super_class = "opendma:Document"
//! aspects = ["opendma:AuditStamped"]
//! properties = ["acme:Amount"]
//!
//! [[property]]
//! name = "acme:Amount"
//! data_type = "Double"
//! required = true
//! ```
//!
//! # Validation
//!
//! Values are validated after parsing: names must parse as qualified
//! names, data types must be known, and choices must fit their data type.

use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::core::schema::{ClassDefinition, PropertyDefinition};
use crate::core::types::{DataType, DmaId, QualifiedName};
use crate::core::value::PropertyValue;

/// The whole configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    /// Repository identity
    pub repository: Option<RepositoryConfig>,

    /// Bootstrap behavior
    pub bootstrap: Option<BootstrapConfig>,

    /// Schema extension classes and aspects
    #[serde(rename = "class")]
    pub classes: Vec<ClassConfig>,

    /// Schema extension properties
    #[serde(rename = "property")]
    pub properties: Vec<PropertyConfig>,
}

impl ConfigFile {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` or `ConfigError::Schema` for the
    /// first invalid value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(repository) = &self.repository {
            repository.validate()?;
        }
        for class in &self.classes {
            class.to_definition()?;
        }
        for property in &self.properties {
            property.to_definition()?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct RepositoryConfig {
    /// Repository id, part of every descriptor guid
    pub id: Option<String>,

    /// Human-readable name
    pub name: Option<String>,
}

impl RepositoryConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(id) = &self.id {
            DmaId::new(id.as_str())
                .map_err(|e| ConfigError::InvalidValue(format!("invalid repository id: {e}")))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct BootstrapConfig {
    /// Run full verification after bootstrap
    pub verify: Option<bool>,
}

/// A class or aspect definition.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ClassConfig {
    pub name: String,
    pub display_name: Option<String>,
    pub super_class: Option<String>,
    pub aspects: Vec<String>,
    pub properties: Vec<String>,
    /// Define an aspect instead of a class
    pub aspect: bool,
    /// Defaults to `true` for classes
    pub instantiable: Option<bool>,
    pub hidden: bool,
    pub system: bool,
}

impl ClassConfig {
    /// Convert into a schema definition.
    pub fn to_definition(&self) -> Result<ClassDefinition, ConfigError> {
        let name = parse_name(&self.name)?;
        let mut def = if self.aspect {
            ClassDefinition::aspect(name)
        } else {
            ClassDefinition::class(name)
        };

        if let Some(display_name) = &self.display_name {
            def = def.display_name(display_name.as_str());
        }
        if let Some(super_class) = &self.super_class {
            def = def.extends(parse_name(super_class)?);
        }
        for aspect in &self.aspects {
            def = def.with_aspect(parse_name(aspect)?);
        }
        for property in &self.properties {
            def = def.declares(parse_name(property)?);
        }
        if let Some(instantiable) = self.instantiable {
            def.instantiable = instantiable;
        }
        if self.hidden {
            def = def.hidden();
        }
        if self.system {
            def = def.system();
        }
        Ok(def)
    }
}

/// A property definition.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct PropertyConfig {
    pub name: String,
    pub display_name: Option<String>,
    /// Data type name, e.g. "String" or "Reference"
    pub data_type: String,
    /// Target class, required for references
    pub reference_class: Option<String>,
    pub multi_value: bool,
    pub required: bool,
    pub read_only: bool,
    pub hidden: bool,
    pub system: bool,
    /// Allowed values
    pub choices: Vec<toml::Value>,
}

impl PropertyConfig {
    /// Convert into a schema definition.
    pub fn to_definition(&self) -> Result<PropertyDefinition, ConfigError> {
        let name = parse_name(&self.name)?;
        let data_type: DataType = self.data_type.parse().map_err(|_| {
            ConfigError::InvalidValue(format!(
                "property {name}: unknown data type '{}'",
                self.data_type
            ))
        })?;

        let mut def = PropertyDefinition::new(name, data_type);
        def.reference_class = self
            .reference_class
            .as_deref()
            .map(parse_name)
            .transpose()?;
        def.display_name = self.display_name.clone();
        def.multi_value = self.multi_value;
        def.required = self.required;
        def.read_only = self.read_only;
        def.hidden = self.hidden;
        if self.system {
            def = def.system();
        }
        def.choices = self
            .choices
            .iter()
            .map(|v| choice_value(&def.name, data_type, v))
            .collect::<Result<_, _>>()?;
        Ok(def)
    }
}

fn parse_name(raw: &str) -> Result<QualifiedName, ConfigError> {
    raw.parse()
        .map_err(|e| ConfigError::InvalidValue(format!("invalid name '{raw}': {e}")))
}

fn choice_value(
    property: &QualifiedName,
    data_type: DataType,
    raw: &toml::Value,
) -> Result<PropertyValue, ConfigError> {
    let invalid = || {
        ConfigError::InvalidValue(format!(
            "property {property}: choice {raw} is not a valid {data_type}"
        ))
    };

    let value = match (data_type, raw) {
        (DataType::String, toml::Value::String(s)) => PropertyValue::String(s.clone()),
        (DataType::Integer, toml::Value::Integer(i)) => {
            PropertyValue::Integer(i32::try_from(*i).map_err(|_| invalid())?)
        }
        (DataType::Short, toml::Value::Integer(i)) => {
            PropertyValue::Short(i16::try_from(*i).map_err(|_| invalid())?)
        }
        (DataType::Long, toml::Value::Integer(i)) => PropertyValue::Long(*i),
        (DataType::Float, toml::Value::Float(f)) => PropertyValue::Float(*f as f32),
        (DataType::Double, toml::Value::Float(f)) => PropertyValue::Double(*f),
        (DataType::Boolean, toml::Value::Boolean(b)) => PropertyValue::Boolean(*b),
        _ => return Err(invalid()),
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> ConfigFile {
        toml::from_str(s).unwrap()
    }

    #[test]
    fn empty_is_default() {
        assert_eq!(parse(""), ConfigFile::default());
    }

    #[test]
    fn class_and_property_tables() {
        let file = parse(
            r#"
            [[class]]
            name = "acme:Invoice"
            super_class = "opendma:Document"
            properties = ["acme:Amount"]

            [[property]]
            name = "acme:Amount"
            data_type = "double"
            required = true
            "#,
        );
        file.validate().unwrap();

        let class = file.classes[0].to_definition().unwrap();
        assert_eq!(class.super_class.unwrap().to_string(), "opendma:Document");
        assert!(class.instantiable);

        let property = file.properties[0].to_definition().unwrap();
        assert_eq!(property.data_type, DataType::Double);
        assert!(property.required);
    }

    #[test]
    fn aspects_default_to_not_instantiable() {
        let file = parse(
            r#"
            [[class]]
            name = "acme:Taggable"
            aspect = true
            "#,
        );
        let def = file.classes[0].to_definition().unwrap();
        assert!(def.is_aspect);
        assert!(!def.instantiable);
    }

    #[test]
    fn choices_follow_data_type() {
        let file = parse(
            r#"
            [[property]]
            name = "acme:Priority"
            data_type = "Short"
            choices = [1, 2, 3]
            "#,
        );
        let def = file.properties[0].to_definition().unwrap();
        assert_eq!(def.choices[0], PropertyValue::Short(1));

        let file = parse(
            r#"
            [[property]]
            name = "acme:Priority"
            data_type = "Short"
            choices = ["high"]
            "#,
        );
        assert!(file.validate().is_err());
    }

    #[test]
    fn bad_names_rejected() {
        let file = parse(
            r#"
            [[class]]
            name = "no-namespace"
            "#,
        );
        assert!(matches!(
            file.validate(),
            Err(ConfigError::InvalidValue(_))
        ));
    }

    #[test]
    fn unknown_fields_rejected() {
        let result: Result<ConfigFile, _> = toml::from_str(
            r#"
            [repository]
            id = "x"
            owner = "nobody"
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn blank_repository_id_rejected() {
        let file = parse(
            r#"
            [repository]
            id = "  "
            "#,
        );
        assert!(file.validate().is_err());
    }
}
