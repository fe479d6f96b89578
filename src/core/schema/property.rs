//! core::schema::property
//!
//! Property descriptors.
//!
//! # Invariants
//!
//! - A descriptor has a reference target iff its data type is `Reference`
//! - Choice values are single values of the descriptor's data type
//! - The reference target and identity are each bound at most once

use std::sync::{Arc, OnceLock, Weak};

use super::class::ClassDescriptor;
use super::Identity;
use crate::core::error::DmaError;
use crate::core::types::{DataType, DescriptorKind, DmaId, QualifiedName};
use crate::core::value::PropertyValue;

/// Everything needed to construct a [`PropertyDescriptor`].
///
/// # Example
///
/// ```
/// use odma::core::schema::{PropertyDefinition, PropertyDescriptor};
/// use odma::core::types::DataType;
///
/// let def = PropertyDefinition::new("acme:Amount".parse().unwrap(), DataType::Double)
///     .required();
/// let descriptor = PropertyDescriptor::new(def).unwrap();
/// assert!(descriptor.is_required());
/// assert!(!descriptor.is_multi_value());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyDefinition {
    pub name: QualifiedName,
    pub display_name: Option<String>,
    pub data_type: DataType,
    pub multi_value: bool,
    pub required: bool,
    pub read_only: bool,
    pub hidden: bool,
    pub system: bool,
    pub reference_class: Option<QualifiedName>,
    pub choices: Vec<PropertyValue>,
}

impl PropertyDefinition {
    pub fn new(name: QualifiedName, data_type: DataType) -> Self {
        Self {
            name,
            display_name: None,
            data_type,
            multi_value: false,
            required: false,
            read_only: false,
            hidden: false,
            system: false,
            reference_class: None,
            choices: Vec::new(),
        }
    }

    /// A `Reference` property pointing at `target`.
    pub fn reference(name: QualifiedName, target: QualifiedName) -> Self {
        let mut def = Self::new(name, DataType::Reference);
        def.reference_class = Some(target);
        def
    }

    pub fn display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    pub fn multi_value(mut self) -> Self {
        self.multi_value = true;
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    /// Read-only and system-maintained.
    pub fn system(mut self) -> Self {
        self.system = true;
        self.read_only = true;
        self
    }

    pub fn choices(mut self, choices: Vec<PropertyValue>) -> Self {
        self.choices = choices;
        self
    }
}

/// Schema-level metadata for one property.
#[derive(Debug)]
pub struct PropertyDescriptor {
    name: QualifiedName,
    display_name: String,
    data_type: DataType,
    multi_value: bool,
    required: bool,
    read_only: bool,
    hidden: bool,
    system: bool,
    reference_class_name: Option<QualifiedName>,
    reference_class: OnceLock<Weak<ClassDescriptor>>,
    choices: Vec<PropertyValue>,
    identity: OnceLock<Identity>,
}

impl PropertyDescriptor {
    /// Construct a descriptor from its definition.
    ///
    /// The reference target is recorded by name only; the registry binds
    /// it once every class exists.
    ///
    /// # Errors
    ///
    /// Returns `DmaError::InvalidArgument` if a reference target is given
    /// for a non-reference type (or missing for a reference type), or if a
    /// choice value is not a single value of the declared data type.
    pub fn new(def: PropertyDefinition) -> Result<Self, DmaError> {
        match (def.data_type, &def.reference_class) {
            (DataType::Reference, None) => {
                return Err(DmaError::InvalidArgument(format!(
                    "reference property {} needs a reference class",
                    def.name
                )));
            }
            (dt, Some(target)) if dt != DataType::Reference => {
                return Err(DmaError::InvalidArgument(format!(
                    "{dt} property {} cannot reference class {target}",
                    def.name
                )));
            }
            _ => {}
        }

        if let Some(bad) = def
            .choices
            .iter()
            .find(|choice| !choice.matches(def.data_type, false))
        {
            return Err(DmaError::InvalidArgument(format!(
                "choice {bad} of property {} is not a single {}",
                def.name, def.data_type
            )));
        }

        let display_name = def
            .display_name
            .unwrap_or_else(|| def.name.name().to_string());

        Ok(Self {
            name: def.name,
            display_name,
            data_type: def.data_type,
            multi_value: def.multi_value,
            required: def.required,
            read_only: def.read_only,
            hidden: def.hidden,
            system: def.system,
            reference_class_name: def.reference_class,
            reference_class: OnceLock::new(),
            choices: def.choices,
            identity: OnceLock::new(),
        })
    }

    pub fn name(&self) -> &QualifiedName {
        &self.name
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn is_multi_value(&self) -> bool {
        self.multi_value
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    pub fn is_system(&self) -> bool {
        self.system
    }

    /// Allowed values. Empty means unconstrained.
    pub fn choices(&self) -> &[PropertyValue] {
        &self.choices
    }

    /// Name of the class a reference property points at.
    pub fn reference_class_name(&self) -> Option<&QualifiedName> {
        self.reference_class_name.as_ref()
    }

    /// The bound reference target.
    ///
    /// `None` for non-reference properties, before binding, or once the
    /// owning registry has been dropped.
    pub fn reference_class(&self) -> Option<Arc<ClassDescriptor>> {
        self.reference_class.get().and_then(Weak::upgrade)
    }

    /// Whether the reference target has been bound.
    pub fn is_reference_bound(&self) -> bool {
        self.reference_class.get().is_some()
    }

    pub(crate) fn bind_reference_class(&self, class: &Arc<ClassDescriptor>) -> bool {
        self.reference_class.set(Arc::downgrade(class)).is_ok()
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.get()
    }

    pub fn id(&self) -> Option<&DmaId> {
        self.identity.get().map(|i| &i.id)
    }

    pub(crate) fn assign_identity(&self, repository_id: &DmaId) -> bool {
        self.identity
            .set(Identity::derive(
                DescriptorKind::Property,
                &self.name,
                repository_id,
            ))
            .is_ok()
    }

    /// Whether a value satisfies the choice constraint.
    ///
    /// Multi-values must have every element among the choices.
    pub fn allows(&self, value: &PropertyValue) -> bool {
        if self.choices.is_empty() {
            return true;
        }
        match Self::as_singles(value) {
            Some(items) => items.iter().all(|item| self.choices.contains(item)),
            None => self.choices.contains(value),
        }
    }

    /// Split a multi-value into single values for choice checks.
    fn as_singles(value: &PropertyValue) -> Option<Vec<PropertyValue>> {
        use PropertyValue as V;
        let items = match value {
            V::StringList(v) => v.iter().cloned().map(V::String).collect(),
            V::IntegerList(v) => v.iter().copied().map(V::Integer).collect(),
            V::ShortList(v) => v.iter().copied().map(V::Short).collect(),
            V::LongList(v) => v.iter().copied().map(V::Long).collect(),
            V::FloatList(v) => v.iter().copied().map(V::Float).collect(),
            V::DoubleList(v) => v.iter().copied().map(V::Double).collect(),
            V::BooleanList(v) => v.iter().copied().map(V::Boolean).collect(),
            V::DateTimeList(v) => v.iter().copied().map(V::DateTime).collect(),
            V::IdList(v) => v.iter().cloned().map(V::Id).collect(),
            V::GuidList(v) => v.iter().cloned().map(V::Guid).collect(),
            _ => return None,
        };
        Some(items)
    }
}
