//! core::adaptor
//!
//! The seam between the metamodel core and a backing repository.
//!
//! # Design
//!
//! The core never talks to storage. Objects ask their [`Adaptor`] for raw
//! property values on demand, for the target of a reference known only by
//! id, and to persist pending changes. Everything behind the trait
//! (transport, sessions, query execution) is the adaptor's business.
//!
//! # Modules
//!
//! - [`memory`] - Deterministic in-memory adaptor

pub mod memory;

pub use memory::{AdaptorOperation, MemoryAdaptor};

use super::error::DmaError;
use super::object::{DmaObject, ObjectRef};
use super::types::{DmaId, QualifiedName};
use super::value::PropertyValue;

/// One pending property change handed to [`Adaptor::save`].
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyChange {
    pub name: QualifiedName,
    pub value: Option<PropertyValue>,
}

/// A backing repository as seen by the core.
///
/// Implementations must be shareable across threads; objects hold them
/// as `Arc<dyn Adaptor>`.
pub trait Adaptor: Send + Sync {
    /// Id of the repository this adaptor serves.
    fn repository_id(&self) -> &DmaId;

    /// Raw values of `names` for `object`.
    ///
    /// Single-valued references may come back as
    /// [`PropertyValue::ReferenceId`]; the core resolves them lazily.
    /// Names missing from the result stay unresolved.
    fn fetch_properties(
        &self,
        object: &DmaObject,
        names: &[QualifiedName],
    ) -> Result<Vec<(QualifiedName, Option<PropertyValue>)>, DmaError>;

    /// Materialize the object with the given id.
    ///
    /// # Errors
    ///
    /// `DmaError::ObjectNotFound` if no such object exists.
    fn resolve_reference(&self, id: &DmaId) -> Result<ObjectRef, DmaError>;

    /// Persist the dirty properties of `object`.
    fn save(&self, object: &DmaObject, changes: &[PropertyChange]) -> Result<(), DmaError>;
}
