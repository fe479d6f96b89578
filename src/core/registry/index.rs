//! core::registry::index
//!
//! Append-only back-reference sets.
//!
//! # Design
//!
//! Sub-class and aspect-usage relations point from a class to classes
//! built after it, so they cannot live in the immutable descriptors.
//! They are kept here instead, one [`BackRefIndex`] per target name.
//!
//! - Sets only grow; inserting an existing member is a no-op
//! - Each set has its own lock
//! - The map of sets creates entries lazily with double-checked locking

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::core::types::QualifiedName;

/// An insertion-ordered, append-only set of class names.
#[derive(Debug, Default)]
pub struct BackRefIndex {
    members: RwLock<Vec<QualifiedName>>,
}

impl BackRefIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a member. Returns `false` if it was already present.
    pub fn insert(&self, name: QualifiedName) -> bool {
        let mut members = self.members.write().unwrap_or_else(PoisonError::into_inner);
        if members.contains(&name) {
            return false;
        }
        members.push(name);
        true
    }

    pub fn contains(&self, name: &QualifiedName) -> bool {
        self.members
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(name)
    }

    /// The members in insertion order.
    pub fn snapshot(&self) -> Vec<QualifiedName> {
        self.members
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.members
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Lazily created [`BackRefIndex`]es keyed by target name.
#[derive(Debug, Default)]
pub(crate) struct BackRefIndices {
    indices: RwLock<HashMap<QualifiedName, Arc<BackRefIndex>>>,
}

impl BackRefIndices {
    /// The index for `key`, created empty on first use.
    pub(crate) fn get_or_create(&self, key: &QualifiedName) -> Arc<BackRefIndex> {
        if let Some(index) = self
            .indices
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
        {
            return Arc::clone(index);
        }

        let mut indices = self.indices.write().unwrap_or_else(PoisonError::into_inner);
        // Another writer may have won between the two locks.
        Arc::clone(indices.entry(key.clone()).or_default())
    }

    pub(crate) fn get(&self, key: &QualifiedName) -> Option<Arc<BackRefIndex>> {
        self.indices
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }
}
