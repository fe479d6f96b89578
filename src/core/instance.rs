//! core::instance
//!
//! Bound, typed property values.
//!
//! # Design
//!
//! A [`PropertyInstance`] owns one value for one property of one object.
//! It is shared as `Arc<PropertyInstance>`; all mutation goes through
//! `&self`, so an instance rebound after a lazy fetch is the same instance
//! every earlier holder sees.
//!
//! # Resolution
//!
//! Single-valued reference properties move through three states:
//! - `Unresolved` - nothing retrieved yet
//! - `IdResolved` - the target id is known, the object is not in memory
//! - `Resolved` - the value (possibly null) is fully in hand
//!
//! `reference()` on an `IdResolved` instance fetches the target through
//! the adaptor the instance was bound with.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::adaptor::Adaptor;
use super::error::DmaError;
use super::object::ObjectRef;
use super::schema::PropertyDescriptor;
use super::types::{DataType, DmaId, Guid, QualifiedName};
use super::value::{Content, PropertyValue};

/// How much of a reference value is in memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResolutionState {
    Unresolved,
    IdResolved,
    Resolved,
}

/// Marks one write to an instance.
///
/// Taken together with a pending value so that a save only clears the
/// dirty flag when nothing was written after the value was read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Revision(u64);

#[derive(Debug)]
struct Slot {
    value: Option<PropertyValue>,
    dirty: bool,
    resolution: ResolutionState,
    revision: Revision,
}

impl Slot {
    fn replace(&mut self, value: Option<PropertyValue>, dirty: bool) {
        self.resolution = resolution_of(value.as_ref());
        self.value = value;
        self.dirty = dirty;
        self.revision = Revision(self.revision.0 + 1);
    }
}

/// A typed value holder attached to one object.
pub struct PropertyInstance {
    descriptor: Arc<PropertyDescriptor>,
    slot: RwLock<Slot>,
    adaptor: Option<Arc<dyn Adaptor>>,
}

macro_rules! single_accessor {
    ($(#[$doc:meta])* $name:ident, $variant:ident, $data_type:expr, $ty:ty) => {
        $(#[$doc])*
        pub fn $name(&self) -> Result<Option<$ty>, DmaError> {
            self.require_type($data_type, false)?;
            match &self.read().value {
                None => Ok(None),
                Some(PropertyValue::$variant(v)) => Ok(Some(v.clone())),
                Some(other) => Err(self.holds(other)),
            }
        }
    };
}

macro_rules! list_accessor {
    ($(#[$doc:meta])* $name:ident, $variant:ident, $data_type:expr, $ty:ty) => {
        $(#[$doc])*
        pub fn $name(&self) -> Result<Vec<$ty>, DmaError> {
            self.require_type($data_type, true)?;
            match &self.read().value {
                None => Ok(Vec::new()),
                Some(PropertyValue::$variant(v)) => Ok(v.clone()),
                Some(other) => Err(self.holds(other)),
            }
        }
    };
}

impl PropertyInstance {
    /// An instance with nothing retrieved yet.
    ///
    /// Multi-valued instances start as the empty list.
    pub fn unresolved(descriptor: Arc<PropertyDescriptor>) -> Self {
        let value = descriptor
            .is_multi_value()
            .then(|| PropertyValue::empty_list(descriptor.data_type()));
        Self {
            descriptor,
            slot: RwLock::new(Slot {
                value,
                dirty: false,
                resolution: ResolutionState::Unresolved,
                revision: Revision(0),
            }),
            adaptor: None,
        }
    }

    /// A clean instance holding `value`.
    ///
    /// # Errors
    ///
    /// Fails like [`bind`](Self::bind) when the value does not fit.
    pub fn new(
        descriptor: Arc<PropertyDescriptor>,
        value: Option<PropertyValue>,
    ) -> Result<Self, DmaError> {
        let instance = Self::unresolved(descriptor);
        instance.bind(value)?;
        Ok(instance)
    }

    /// Attach the adaptor used to resolve reference ids on demand.
    pub fn with_adaptor(mut self, adaptor: Arc<dyn Adaptor>) -> Self {
        self.adaptor = Some(adaptor);
        self
    }

    pub fn descriptor(&self) -> &Arc<PropertyDescriptor> {
        &self.descriptor
    }

    pub fn name(&self) -> &QualifiedName {
        self.descriptor.name()
    }

    pub fn data_type(&self) -> DataType {
        self.descriptor.data_type()
    }

    pub fn is_read_only(&self) -> bool {
        self.descriptor.is_read_only()
    }

    pub fn is_multi_value(&self) -> bool {
        self.descriptor.is_multi_value()
    }

    /// Whether a change is pending that the owning object has not saved.
    pub fn is_dirty(&self) -> bool {
        self.read().dirty
    }

    pub fn resolution_state(&self) -> ResolutionState {
        self.read().resolution
    }

    /// The current value. `None` means null.
    pub fn value(&self) -> Option<PropertyValue> {
        self.read().value.clone()
    }

    /// Replace the value as an application write.
    ///
    /// Marks the instance dirty. The resolution state becomes `Resolved`,
    /// or `IdResolved` when a bare reference id is set.
    ///
    /// # Errors
    ///
    /// - `AccessDenied` if the property is read-only
    /// - `InvalidDataType` if the value kind or cardinality does not match
    ///   exactly, or a referenced object is not of the reference class
    /// - `InvalidArgument` if the value is outside the choice set
    pub fn set_value(&self, value: Option<PropertyValue>) -> Result<(), DmaError> {
        if self.descriptor.is_read_only() {
            return Err(DmaError::AccessDenied(format!(
                "property {} is read-only",
                self.name()
            )));
        }
        self.check(value.as_ref())?;
        self.write().replace(value, true);
        Ok(())
    }

    /// Load a value retrieved by the adaptor.
    ///
    /// Skips the read-only check and leaves the instance clean.
    ///
    /// # Errors
    ///
    /// Same type and choice checks as [`set_value`](Self::set_value).
    pub fn bind(&self, value: Option<PropertyValue>) -> Result<(), DmaError> {
        self.check(value.as_ref())?;
        self.write().replace(value, false);
        Ok(())
    }

    /// The unsaved value and the write it came from, read under one lock.
    pub fn pending_change(&self) -> Option<(Option<PropertyValue>, Revision)> {
        let slot = self.read();
        slot.dirty.then(|| (slot.value.clone(), slot.revision))
    }

    /// Clear the dirty flag after `saved` was persisted.
    ///
    /// Returns `false` and stays dirty when the instance was written again
    /// since `saved` was taken.
    pub fn mark_clean(&self, saved: Revision) -> bool {
        let mut slot = self.write();
        if slot.revision != saved {
            return false;
        }
        slot.dirty = false;
        true
    }

    fn check(&self, value: Option<&PropertyValue>) -> Result<(), DmaError> {
        let d = &self.descriptor;
        let Some(value) = value else {
            if d.is_multi_value() {
                return Err(DmaError::InvalidDataType(format!(
                    "multi-valued property {} cannot be null",
                    d.name()
                )));
            }
            return Ok(());
        };

        let fits = match value {
            PropertyValue::ReferenceId(_) => {
                d.data_type() == DataType::Reference && !d.is_multi_value()
            }
            other => other.matches(d.data_type(), d.is_multi_value()),
        };
        if !fits {
            return Err(DmaError::InvalidDataType(format!(
                "cannot put {} value into {} property {}",
                value.kind(),
                self.expected_kind(),
                d.name()
            )));
        }

        if !d.allows(value) {
            return Err(DmaError::InvalidArgument(format!(
                "value {value} is not among the choices of {}",
                d.name()
            )));
        }

        if let Some(target) = d.reference_class() {
            let objects: &[ObjectRef] = match value {
                PropertyValue::Reference(obj) => std::slice::from_ref(obj),
                PropertyValue::ReferenceList(objs) => objs,
                _ => &[],
            };
            for obj in objects {
                if !obj.class().is_or_includes_aspect(target.name())? {
                    return Err(DmaError::InvalidDataType(format!(
                        "{} of class {} is not a {}",
                        obj.id(),
                        obj.class().name(),
                        target.name()
                    )));
                }
            }
        }

        Ok(())
    }

    fn expected_kind(&self) -> String {
        if self.descriptor.is_multi_value() {
            format!("{}[]", self.descriptor.data_type())
        } else {
            self.descriptor.data_type().to_string()
        }
    }

    fn require_type(&self, data_type: DataType, multi_value: bool) -> Result<(), DmaError> {
        if self.descriptor.data_type() == data_type && self.descriptor.is_multi_value() == multi_value
        {
            return Ok(());
        }
        let asked = if multi_value {
            format!("{data_type}[]")
        } else {
            data_type.to_string()
        };
        Err(DmaError::InvalidDataType(format!(
            "property {} is {}, not {asked}",
            self.name(),
            self.expected_kind()
        )))
    }

    fn holds(&self, value: &PropertyValue) -> DmaError {
        DmaError::InvalidDataType(format!(
            "property {} holds a {} value",
            self.name(),
            value.kind()
        ))
    }

    fn read(&self) -> RwLockReadGuard<'_, Slot> {
        self.slot.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Slot> {
        self.slot.write().unwrap_or_else(PoisonError::into_inner)
    }

    single_accessor!(string, String, DataType::String, String);
    single_accessor!(integer, Integer, DataType::Integer, i32);
    single_accessor!(short, Short, DataType::Short, i16);
    single_accessor!(long, Long, DataType::Long, i64);
    single_accessor!(float, Float, DataType::Float, f32);
    single_accessor!(double, Double, DataType::Double, f64);
    single_accessor!(boolean, Boolean, DataType::Boolean, bool);
    single_accessor!(datetime, DateTime, DataType::DateTime, DateTime<Utc>);
    single_accessor!(binary, Binary, DataType::Binary, Vec<u8>);
    single_accessor!(content, Content, DataType::Content, Content);
    single_accessor!(id, Id, DataType::Id, DmaId);
    single_accessor!(guid, Guid, DataType::Guid, Guid);

    list_accessor!(string_list, StringList, DataType::String, String);
    list_accessor!(integer_list, IntegerList, DataType::Integer, i32);
    list_accessor!(short_list, ShortList, DataType::Short, i16);
    list_accessor!(long_list, LongList, DataType::Long, i64);
    list_accessor!(float_list, FloatList, DataType::Float, f32);
    list_accessor!(double_list, DoubleList, DataType::Double, f64);
    list_accessor!(boolean_list, BooleanList, DataType::Boolean, bool);
    list_accessor!(datetime_list, DateTimeList, DataType::DateTime, DateTime<Utc>);
    list_accessor!(binary_list, BinaryList, DataType::Binary, Vec<u8>);
    list_accessor!(
        /// Multi-valued references are always held as objects.
        reference_list,
        ReferenceList,
        DataType::Reference,
        ObjectRef
    );
    list_accessor!(content_list, ContentList, DataType::Content, Content);
    list_accessor!(id_list, IdList, DataType::Id, DmaId);
    list_accessor!(guid_list, GuidList, DataType::Guid, Guid);

    /// The id of the referenced object, without fetching it.
    ///
    /// # Errors
    ///
    /// - `InvalidDataType` unless this is a single-valued reference
    /// - `ObjectNotFound` if nothing has been retrieved yet
    pub fn reference_id(&self) -> Result<Option<DmaId>, DmaError> {
        self.require_type(DataType::Reference, false)?;
        let slot = self.read();
        match (&slot.value, slot.resolution) {
            (Some(PropertyValue::Reference(obj)), _) => Ok(Some(obj.id().clone())),
            (Some(PropertyValue::ReferenceId(id)), _) => Ok(Some(id.clone())),
            (_, ResolutionState::Unresolved) => Err(self.not_retrieved()),
            (None, _) => Ok(None),
            (Some(other), _) => Err(self.holds(other)),
        }
    }

    /// The referenced object, fetching it through the adaptor if only its
    /// id is known.
    ///
    /// A successful fetch rebinds this instance in place to `Resolved`
    /// without touching the dirty flag.
    ///
    /// # Errors
    ///
    /// - `InvalidDataType` unless this is a single-valued reference
    /// - `ObjectNotFound` if nothing is bound, or only an id is bound and
    ///   no adaptor can fetch it
    pub fn reference(&self) -> Result<Option<ObjectRef>, DmaError> {
        self.require_type(DataType::Reference, false)?;

        let pending = {
            let slot = self.read();
            match (&slot.value, slot.resolution) {
                (Some(PropertyValue::Reference(obj)), _) => return Ok(Some(Arc::clone(obj))),
                (Some(PropertyValue::ReferenceId(id)), _) => id.clone(),
                (_, ResolutionState::Unresolved) => return Err(self.not_retrieved()),
                (None, _) => return Ok(None),
                (Some(other), _) => return Err(self.holds(other)),
            }
        };

        let Some(adaptor) = &self.adaptor else {
            return Err(DmaError::ObjectNotFound(format!(
                "reference {} -> {pending} has no backing object bound",
                self.name()
            )));
        };

        debug!(property = %self.name(), target = %pending, "resolving reference");
        let object = adaptor.resolve_reference(&pending)?;

        let mut slot = self.write();
        // A concurrent write may have replaced the id while we fetched.
        if matches!(&slot.value, Some(PropertyValue::ReferenceId(id)) if *id == pending) {
            slot.value = Some(PropertyValue::Reference(Arc::clone(&object)));
            slot.resolution = ResolutionState::Resolved;
        }
        Ok(Some(object))
    }

    fn not_retrieved(&self) -> DmaError {
        DmaError::ObjectNotFound(format!("property {} has not been retrieved", self.name()))
    }
}

fn resolution_of(value: Option<&PropertyValue>) -> ResolutionState {
    match value {
        Some(PropertyValue::ReferenceId(_)) => ResolutionState::IdResolved,
        _ => ResolutionState::Resolved,
    }
}

impl std::fmt::Debug for PropertyInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let slot = self.read();
        f.debug_struct("PropertyInstance")
            .field("name", &self.name().to_string())
            .field("value", &slot.value.as_ref().map(ToString::to_string))
            .field("dirty", &slot.dirty)
            .field("resolution", &slot.resolution)
            .finish()
    }
}
