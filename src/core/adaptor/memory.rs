//! core::adaptor::memory
//!
//! In-memory adaptor for deterministic testing and demos.
//!
//! # Design
//!
//! Objects are stored as raw value maps keyed by id. Single-valued
//! references are stored by target id and handed back as
//! [`PropertyValue::ReferenceId`], so reads exercise lazy resolution the
//! way a remote adaptor would. Every call is recorded for verification.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use odma::core::adaptor::MemoryAdaptor;
//! use odma::core::registry::{builtin, MetamodelRegistry};
//! use odma::core::types::DmaId;
//!
//! let registry = MetamodelRegistry::bootstrap(DmaId::new("demo").unwrap()).unwrap();
//! let adaptor = MemoryAdaptor::new(Arc::new(registry));
//!
//! let doc = adaptor.create_object(&builtin::qname("Document")).unwrap();
//! doc.set_property(&builtin::qname("Title"), Some("Report".into())).unwrap();
//! doc.save().unwrap();
//!
//! let again = adaptor.get_object(doc.id()).unwrap();
//! let title = again.get_property(&builtin::qname("Title")).unwrap();
//! assert_eq!(title.string().unwrap().as_deref(), Some("Report"));
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tracing::debug;

use super::{Adaptor, PropertyChange};
use crate::core::error::DmaError;
use crate::core::object::{DmaObject, ObjectRef};
use crate::core::registry::MetamodelRegistry;
use crate::core::types::{DmaId, QualifiedName};
use crate::core::value::PropertyValue;

/// Recorded adaptor call for test verification.
#[derive(Debug, Clone, PartialEq)]
pub enum AdaptorOperation {
    Create {
        id: DmaId,
        class: QualifiedName,
    },
    Fetch {
        id: DmaId,
        names: Vec<QualifiedName>,
    },
    Resolve {
        id: DmaId,
    },
    Save {
        id: DmaId,
        names: Vec<QualifiedName>,
    },
}

#[derive(Debug, Clone)]
enum Stored {
    Value(Option<PropertyValue>),
    References(Vec<DmaId>),
}

#[derive(Debug)]
struct Record {
    class: QualifiedName,
    values: HashMap<QualifiedName, Stored>,
}

#[derive(Debug, Default)]
struct Inner {
    records: HashMap<DmaId, Record>,
    operations: Vec<AdaptorOperation>,
}

/// Adaptor over an in-process object store.
pub struct MemoryAdaptor {
    this: Weak<MemoryAdaptor>,
    registry: Arc<MetamodelRegistry>,
    inner: Mutex<Inner>,
}

impl MemoryAdaptor {
    /// Create an empty store serving `registry`'s repository.
    pub fn new(registry: Arc<MetamodelRegistry>) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            this: this.clone(),
            registry,
            inner: Mutex::new(Inner::default()),
        })
    }

    pub fn registry(&self) -> &Arc<MetamodelRegistry> {
        &self.registry
    }

    /// Create and store a new empty object of `class`.
    ///
    /// # Errors
    ///
    /// - `DmaError::ObjectNotFound` if the class is unknown
    /// - `DmaError::InvalidArgument` if the class is not instantiable
    pub fn create_object(&self, class: &QualifiedName) -> Result<ObjectRef, DmaError> {
        let descriptor = self.registry.class(class)?;
        if !descriptor.is_instantiable() {
            return Err(DmaError::InvalidArgument(format!(
                "class {class} is not instantiable"
            )));
        }

        let id = DmaId::generate();
        self.lock().records.insert(
            id.clone(),
            Record {
                class: class.clone(),
                values: HashMap::new(),
            },
        );
        self.record(AdaptorOperation::Create {
            id: id.clone(),
            class: class.clone(),
        });
        debug!(%id, %class, "created object");

        let object = DmaObject::with_adaptor(id, Arc::clone(descriptor), self.handle()?)?;
        Ok(Arc::new(object))
    }

    /// Materialize a stored object. Same as [`Adaptor::resolve_reference`].
    pub fn get_object(&self, id: &DmaId) -> Result<ObjectRef, DmaError> {
        self.resolve_reference(id)
    }

    pub fn object_count(&self) -> usize {
        self.lock().records.len()
    }

    /// Get all recorded operations.
    pub fn operations(&self) -> Vec<AdaptorOperation> {
        self.lock().operations.clone()
    }

    pub fn clear_operations(&self) {
        self.lock().operations.clear();
    }

    fn record(&self, op: AdaptorOperation) {
        self.lock().operations.push(op);
    }

    fn handle(&self) -> Result<Arc<dyn Adaptor>, DmaError> {
        let this: Arc<dyn Adaptor> = self
            .this
            .upgrade()
            .ok_or_else(|| DmaError::InvalidArgument("memory adaptor was dropped".into()))?;
        Ok(this)
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Adaptor for MemoryAdaptor {
    fn repository_id(&self) -> &DmaId {
        self.registry.repository_id()
    }

    fn fetch_properties(
        &self,
        object: &DmaObject,
        names: &[QualifiedName],
    ) -> Result<Vec<(QualifiedName, Option<PropertyValue>)>, DmaError> {
        self.record(AdaptorOperation::Fetch {
            id: object.id().clone(),
            names: names.to_vec(),
        });

        let stored: Vec<(QualifiedName, Option<Stored>)> = {
            let inner = self.lock();
            let record = inner.records.get(object.id()).ok_or_else(|| {
                DmaError::ObjectNotFound(format!("no stored object {}", object.id()))
            })?;
            names
                .iter()
                .map(|name| (name.clone(), record.values.get(name).cloned()))
                .collect()
        };

        // Resolving reference lists re-enters the store; the lock is released.
        let mut result = Vec::with_capacity(stored.len());
        for (name, value) in stored {
            let value = match value {
                Some(Stored::Value(v)) => v,
                Some(Stored::References(ids)) => {
                    let objects = ids
                        .iter()
                        .map(|id| self.resolve_reference(id))
                        .collect::<Result<Vec<_>, _>>()?;
                    Some(PropertyValue::ReferenceList(objects))
                }
                None => object
                    .class()
                    .property(&name)
                    .filter(|p| p.is_multi_value())
                    .map(|p| PropertyValue::empty_list(p.data_type())),
            };
            result.push((name, value));
        }
        Ok(result)
    }

    fn resolve_reference(&self, id: &DmaId) -> Result<ObjectRef, DmaError> {
        self.record(AdaptorOperation::Resolve { id: id.clone() });

        let class = {
            let inner = self.lock();
            let record = inner
                .records
                .get(id)
                .ok_or_else(|| DmaError::ObjectNotFound(format!("no stored object {id}")))?;
            record.class.clone()
        };
        let descriptor = self.registry.class(&class)?;

        let object = DmaObject::with_adaptor(id.clone(), Arc::clone(descriptor), self.handle()?)?;
        Ok(Arc::new(object))
    }

    fn save(&self, object: &DmaObject, changes: &[PropertyChange]) -> Result<(), DmaError> {
        self.record(AdaptorOperation::Save {
            id: object.id().clone(),
            names: changes.iter().map(|c| c.name.clone()).collect(),
        });

        let mut inner = self.lock();
        let record = inner
            .records
            .get_mut(object.id())
            .ok_or_else(|| DmaError::ObjectNotFound(format!("no stored object {}", object.id())))?;

        for change in changes {
            let stored = match &change.value {
                Some(PropertyValue::Reference(target)) => {
                    Stored::Value(Some(PropertyValue::ReferenceId(target.id().clone())))
                }
                Some(PropertyValue::ReferenceList(targets)) => {
                    Stored::References(targets.iter().map(|t| t.id().clone()).collect())
                }
                other => Stored::Value(other.clone()),
            };
            record.values.insert(change.name.clone(), stored);
        }
        Ok(())
    }
}

impl std::fmt::Debug for MemoryAdaptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryAdaptor")
            .field("repository_id", self.registry.repository_id())
            .field("objects", &self.object_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::instance::ResolutionState;
    use crate::core::registry::builtin::qname;

    fn adaptor() -> Arc<MemoryAdaptor> {
        let registry = MetamodelRegistry::bootstrap(DmaId::new("mem").unwrap()).unwrap();
        MemoryAdaptor::new(Arc::new(registry))
    }

    #[test]
    fn create_records_operation() {
        let adaptor = adaptor();
        let doc = adaptor.create_object(&qname("Document")).unwrap();

        assert_eq!(adaptor.object_count(), 1);
        assert_eq!(
            adaptor.operations(),
            vec![AdaptorOperation::Create {
                id: doc.id().clone(),
                class: qname("Document"),
            }]
        );
        assert_eq!(doc.repository_id().as_str(), "mem");
    }

    #[test]
    fn aspects_and_abstract_classes_are_rejected() {
        let adaptor = adaptor();
        assert!(matches!(
            adaptor.create_object(&qname("AuditStamped")),
            Err(DmaError::InvalidArgument(_))
        ));
        assert!(matches!(
            adaptor.create_object(&QualifiedName::new("acme", "Missing").unwrap()),
            Err(DmaError::ObjectNotFound(_))
        ));
    }

    #[test]
    fn references_come_back_id_resolved() {
        let adaptor = adaptor();
        let parent = adaptor.create_object(&qname("Folder")).unwrap();
        let child = adaptor.create_object(&qname("Folder")).unwrap();

        child
            .set_property(&qname("Parent"), Some(Arc::clone(&parent).into()))
            .unwrap();
        child.save().unwrap();

        let reloaded = adaptor.get_object(child.id()).unwrap();
        let parent_prop = reloaded.get_property(&qname("Parent")).unwrap();
        assert_eq!(parent_prop.resolution_state(), ResolutionState::IdResolved);
        assert_eq!(parent_prop.reference_id().unwrap().as_ref(), Some(parent.id()));

        let resolved = parent_prop.reference().unwrap().unwrap();
        assert_eq!(resolved.id(), parent.id());
        assert_eq!(parent_prop.resolution_state(), ResolutionState::Resolved);
        assert!(!parent_prop.is_dirty());
    }

    #[test]
    fn reference_lists_round_trip() {
        let adaptor = adaptor();
        let parent = adaptor.create_object(&qname("Folder")).unwrap();
        let a = adaptor.create_object(&qname("Folder")).unwrap();
        let b = adaptor.create_object(&qname("Folder")).unwrap();

        parent
            .set_property(
                &qname("SubFolders"),
                Some(PropertyValue::ReferenceList(vec![Arc::clone(&a), Arc::clone(&b)])),
            )
            .unwrap();
        parent.save().unwrap();

        let reloaded = adaptor.get_object(parent.id()).unwrap();
        let subs = reloaded
            .get_property(&qname("SubFolders"))
            .unwrap()
            .reference_list()
            .unwrap();
        let ids: Vec<&DmaId> = subs.iter().map(|o| o.id()).collect();
        assert_eq!(ids, vec![a.id(), b.id()]);
    }

    #[test]
    fn save_sends_only_dirty_properties() {
        let adaptor = adaptor();
        let doc = adaptor.create_object(&qname("Document")).unwrap();
        doc.set_property(&qname("Title"), Some("t".into())).unwrap();
        adaptor.clear_operations();

        doc.save().unwrap();
        assert_eq!(
            adaptor.operations(),
            vec![AdaptorOperation::Save {
                id: doc.id().clone(),
                names: vec![qname("Title")],
            }]
        );

        doc.save().unwrap();
        assert_eq!(adaptor.operations().len(), 1);
    }

    #[test]
    fn unknown_reference_is_not_found() {
        let adaptor = adaptor();
        assert!(matches!(
            adaptor.resolve_reference(&DmaId::new("ghost").unwrap()),
            Err(DmaError::ObjectNotFound(_))
        ));
    }
}
