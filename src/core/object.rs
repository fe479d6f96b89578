//! core::object
//!
//! Domain objects: a class plus a bag of property instances.
//!
//! # Design
//!
//! A [`DmaObject`] holds at most one [`PropertyInstance`] per effective
//! property of its class. Instances are created on first access and
//! populated from the adaptor; later refreshes rebind the same instance.
//! `Id` and `Guid` are bound eagerly from the object's own identity and
//! are never fetched; a refresh rebinds them from that identity.
//!
//! Without an adaptor, every property starts as null (or the empty list)
//! and `save()` only clears dirty flags.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, info};

use super::adaptor::{Adaptor, PropertyChange};
use super::error::DmaError;
use super::instance::{PropertyInstance, Revision};
use super::registry::builtin;
use super::schema::{ClassDescriptor, PropertyDescriptor};
use super::types::{DmaId, Guid, QualifiedName};
use super::value::PropertyValue;

/// Shared handle to a domain object.
pub type ObjectRef = Arc<DmaObject>;

/// An object of some class in some repository.
pub struct DmaObject {
    id: DmaId,
    repository_id: DmaId,
    class: Arc<ClassDescriptor>,
    properties: RwLock<HashMap<QualifiedName, Arc<PropertyInstance>>>,
    adaptor: Option<Arc<dyn Adaptor>>,
}

impl DmaObject {
    /// Create a detached object.
    ///
    /// # Errors
    ///
    /// `DmaError::InvalidArgument` if `class` is an aspect.
    pub fn new(id: DmaId, repository_id: DmaId, class: Arc<ClassDescriptor>) -> Result<Self, DmaError> {
        Self::build(id, repository_id, class, None)
    }

    /// Create an object backed by `adaptor`.
    pub fn with_adaptor(
        id: DmaId,
        class: Arc<ClassDescriptor>,
        adaptor: Arc<dyn Adaptor>,
    ) -> Result<Self, DmaError> {
        let repository_id = adaptor.repository_id().clone();
        Self::build(id, repository_id, class, Some(adaptor))
    }

    fn build(
        id: DmaId,
        repository_id: DmaId,
        class: Arc<ClassDescriptor>,
        adaptor: Option<Arc<dyn Adaptor>>,
    ) -> Result<Self, DmaError> {
        if class.is_aspect() {
            return Err(DmaError::InvalidArgument(format!(
                "aspect {} cannot be instantiated",
                class.name()
            )));
        }

        let object = Self {
            id,
            repository_id,
            class,
            properties: RwLock::new(HashMap::new()),
            adaptor,
        };

        for (name, value) in object.identity() {
            if let Some(descriptor) = object.class.property(&name) {
                let instance = object.instance_for(descriptor);
                instance.bind(Some(value))?;
                object.bag_mut().insert(name, instance);
            }
        }

        Ok(object)
    }

    fn identity(&self) -> [(QualifiedName, PropertyValue); 2] {
        [
            (builtin::qname("Id"), PropertyValue::Id(self.id.clone())),
            (builtin::qname("Guid"), PropertyValue::Guid(self.guid())),
        ]
    }

    pub fn id(&self) -> &DmaId {
        &self.id
    }

    pub fn repository_id(&self) -> &DmaId {
        &self.repository_id
    }

    pub fn guid(&self) -> Guid {
        Guid::new(self.id.clone(), self.repository_id.clone())
    }

    pub fn class(&self) -> &Arc<ClassDescriptor> {
        &self.class
    }

    /// Whether this object's class is, extends or includes `target`.
    pub fn instance_of(&self, target: &QualifiedName) -> Result<bool, DmaError> {
        self.class.is_or_includes_aspect(target)
    }

    /// The property instance for `name`, populating it on first access.
    ///
    /// # Errors
    ///
    /// `DmaError::ObjectNotFound` if the class has no such effective
    /// property, or whatever the adaptor fails with while fetching.
    pub fn get_property(&self, name: &QualifiedName) -> Result<Arc<PropertyInstance>, DmaError> {
        self.descriptor(name)?;
        if let Some(instance) = self.bag().get(name) {
            return Ok(Arc::clone(instance));
        }

        self.prepare_properties(Some(std::slice::from_ref(name)), false)?;
        self.bag().get(name).cloned().ok_or_else(|| {
            DmaError::ObjectNotFound(format!("property {name} of {} was not populated", self.id))
        })
    }

    /// Set a property through its instance. See [`PropertyInstance::set_value`].
    pub fn set_property(
        &self,
        name: &QualifiedName,
        value: Option<PropertyValue>,
    ) -> Result<(), DmaError> {
        self.get_property(name)?.set_value(value)
    }

    /// Populate property instances ahead of access.
    ///
    /// `None` means every effective property. Already populated instances
    /// are skipped unless `refresh` is set, in which case they are rebound
    /// in place and their pending changes are discarded.
    ///
    /// # Errors
    ///
    /// `DmaError::ObjectNotFound` for a name the class does not have.
    pub fn prepare_properties(
        &self,
        names: Option<&[QualifiedName]>,
        refresh: bool,
    ) -> Result<(), DmaError> {
        let requested: Vec<QualifiedName> = match names {
            Some(names) => {
                for name in names {
                    self.descriptor(name)?;
                }
                names.to_vec()
            }
            None => self
                .class
                .effective_properties()
                .iter()
                .map(|p| p.name().clone())
                .collect(),
        };

        let pending: Vec<QualifiedName> = {
            let bag = self.bag();
            requested
                .into_iter()
                .filter(|name| refresh || !bag.contains_key(name))
                .collect()
        };
        if pending.is_empty() {
            return Ok(());
        }

        let identity: HashMap<QualifiedName, PropertyValue> = self.identity().into_iter().collect();
        let to_fetch: Vec<QualifiedName> = pending
            .iter()
            .filter(|name| !identity.contains_key(*name))
            .cloned()
            .collect();

        let fetched: HashMap<QualifiedName, Option<PropertyValue>> = match &self.adaptor {
            Some(adaptor) if !to_fetch.is_empty() => {
                debug!(object = %self.id, count = to_fetch.len(), "fetching properties");
                adaptor.fetch_properties(self, &to_fetch)?.into_iter().collect()
            }
            _ => HashMap::new(),
        };

        for name in pending {
            let descriptor = Arc::clone(self.descriptor(&name)?);
            let instance = {
                let mut bag = self.bag_mut();
                Arc::clone(
                    bag.entry(name.clone())
                        .or_insert_with(|| self.instance_for(&descriptor)),
                )
            };

            if let Some(value) = identity.get(&name) {
                instance.bind(Some(value.clone()))?;
                continue;
            }
            match fetched.get(&name) {
                Some(value) => instance.bind(value.clone())?,
                None if self.adaptor.is_none() => instance.bind(empty_value(&descriptor))?,
                None => {}
            }
        }

        Ok(())
    }

    /// Whether any populated property has an unsaved change.
    pub fn is_dirty(&self) -> bool {
        self.bag().values().any(|p| p.is_dirty())
    }

    /// The pending changes, in effective property order.
    pub fn changes(&self) -> Vec<PropertyChange> {
        self.pending().into_iter().map(|(_, change, _)| change).collect()
    }

    /// Persist pending changes and clear dirty flags.
    ///
    /// Dirty flags survive a failed save. A property written again while
    /// the save was in flight stays dirty with its newer value.
    pub fn save(&self) -> Result<(), DmaError> {
        let pending = self.pending();
        if pending.is_empty() {
            debug!(object = %self.id, "nothing to save");
            return Ok(());
        }

        let changes: Vec<PropertyChange> =
            pending.iter().map(|(_, change, _)| change.clone()).collect();
        if let Some(adaptor) = &self.adaptor {
            adaptor.save(self, &changes)?;
        }
        info!(object = %self.id, changed = changes.len(), "saved object");

        for (instance, change, revision) in &pending {
            if !instance.mark_clean(*revision) {
                debug!(object = %self.id, property = %change.name, "written during save, still dirty");
            }
        }
        Ok(())
    }

    fn pending(&self) -> Vec<(Arc<PropertyInstance>, PropertyChange, Revision)> {
        let bag = self.bag();
        self.class
            .effective_properties()
            .iter()
            .filter_map(|p| bag.get(p.name()))
            .filter_map(|instance| {
                let (value, revision) = instance.pending_change()?;
                let change = PropertyChange {
                    name: instance.name().clone(),
                    value,
                };
                Some((Arc::clone(instance), change, revision))
            })
            .collect()
    }

    fn descriptor(&self, name: &QualifiedName) -> Result<&Arc<PropertyDescriptor>, DmaError> {
        self.class.property(name).ok_or_else(|| {
            DmaError::ObjectNotFound(format!(
                "class {} has no property {name}",
                self.class.name()
            ))
        })
    }

    fn instance_for(&self, descriptor: &Arc<PropertyDescriptor>) -> Arc<PropertyInstance> {
        let instance = PropertyInstance::unresolved(Arc::clone(descriptor));
        Arc::new(match &self.adaptor {
            Some(adaptor) => instance.with_adaptor(Arc::clone(adaptor)),
            None => instance,
        })
    }

    fn bag(&self) -> std::sync::RwLockReadGuard<'_, HashMap<QualifiedName, Arc<PropertyInstance>>> {
        self.properties.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn bag_mut(
        &self,
    ) -> std::sync::RwLockWriteGuard<'_, HashMap<QualifiedName, Arc<PropertyInstance>>> {
        self.properties.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn empty_value(descriptor: &PropertyDescriptor) -> Option<PropertyValue> {
    descriptor
        .is_multi_value()
        .then(|| PropertyValue::empty_list(descriptor.data_type()))
}

impl PartialEq for DmaObject {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.repository_id == other.repository_id
            && self.class.name() == other.class.name()
    }
}

impl std::fmt::Debug for DmaObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DmaObject")
            .field("id", &self.id)
            .field("repository_id", &self.repository_id)
            .field("class", &self.class.name().to_string())
            .field("populated", &self.bag().len())
            .finish()
    }
}
