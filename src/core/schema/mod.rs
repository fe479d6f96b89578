//! core::schema
//!
//! Schema layer: descriptors for classes, aspects and properties.
//!
//! # Modules
//!
//! - [`property`] - Property descriptors and their definitions
//! - [`class`] - Class/aspect descriptors, effective property merging,
//!   hierarchy walks
//!
//! Descriptors describe the shape of data independent of any instance.
//! Their content is immutable once constructed. The only late-bound parts
//! are the identity (assigned once by the registry) and a property's
//! reference target (bound once all classes exist).

pub mod class;
pub mod property;

pub use class::{ClassDefinition, ClassDescriptor};
pub use property::{PropertyDefinition, PropertyDescriptor};

use serde::Serialize;

use super::types::{DescriptorKind, DmaId, Guid, QualifiedName};

/// The identifiers assigned to a descriptor during bootstrap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub id: DmaId,
    pub guid: Guid,
}

impl Identity {
    /// Derive the identity of a descriptor within a repository.
    pub fn derive(kind: DescriptorKind, qname: &QualifiedName, repository_id: &DmaId) -> Self {
        let id = DmaId::derive(kind, qname);
        let guid = Guid::new(id.clone(), repository_id.clone());
        Self { id, guid }
    }
}
