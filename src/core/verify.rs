//! core::verify
//!
//! Post-bootstrap metamodel verification.
//!
//! # Checks
//!
//! - Class graph is acyclic over super-class and aspect edges
//! - Aspects are leaves: no super-class, no aspects
//! - Effective property names are unique per class
//! - Effective properties contain everything declared, inherited and
//!   mixed in
//! - Every reference property is bound to a live class
//! - Sub-class and aspect-usage indices agree with the descriptors
//! - Every descriptor has an identity
//!
//! # Invariants
//!
//! - Never mutates the registry
//! - Must be deterministic: errors come out in definition order

use std::collections::HashSet;

use serde::Serialize;
use thiserror::Error;

use super::graph::ClassGraph;
use super::registry::MetamodelRegistry;
use super::schema::ClassDescriptor;

/// Errors from verification.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VerifyError {
    #[error("cycle detected in class graph at {class}")]
    CycleDetected { class: String },

    #[error("aspect {class} is not a leaf: {reason}")]
    AspectNotLeaf { class: String, reason: String },

    #[error("class {class} has property {property} more than once")]
    DuplicateEffectiveProperty { class: String, property: String },

    #[error("class {class} is missing inherited property {property}")]
    MissingInheritedProperty { class: String, property: String },

    #[error("reference property {property} is not bound to a class")]
    UnboundReference { property: String },

    #[error("{class} is missing from the {relation} index of {target}")]
    MissingBackReference {
        class: String,
        target: String,
        relation: String,
    },

    #[error("descriptor {name} has no identity")]
    MissingIdentity { name: String },
}

/// Result of verification.
#[derive(Debug, Clone, Serialize)]
pub struct VerifyResult {
    /// Whether verification passed
    pub ok: bool,
    /// Errors found during verification
    pub errors: Vec<VerifyError>,
}

impl VerifyResult {
    /// Create a successful result.
    pub fn success() -> Self {
        Self {
            ok: true,
            errors: vec![],
        }
    }

    /// Create a failed result with errors.
    pub fn failure(errors: Vec<VerifyError>) -> Self {
        Self { ok: false, errors }
    }

    fn from_errors(errors: Vec<VerifyError>) -> Self {
        if errors.is_empty() {
            Self::success()
        } else {
            Self::failure(errors)
        }
    }
}

/// Check a class graph for cycles.
pub fn verify_graph(graph: &ClassGraph) -> VerifyResult {
    let errors = graph
        .find_cycle()
        .map(|class| VerifyError::CycleDetected {
            class: class.to_string(),
        })
        .into_iter()
        .collect();
    VerifyResult::from_errors(errors)
}

/// Run every check against a bootstrapped registry.
pub fn verify_registry(registry: &MetamodelRegistry) -> VerifyResult {
    let mut graph = ClassGraph::new();
    for class in registry.classes() {
        graph.add_class(class.name().clone());
        if let Some(parent) = class.super_class() {
            graph.add_super(class.name().clone(), parent.name().clone());
        }
        for aspect in class.aspects() {
            graph.add_aspect(class.name().clone(), aspect.name().clone());
        }
    }

    let mut errors = verify_graph(&graph).errors;
    for class in registry.classes() {
        check_class(registry, class, &mut errors);
    }
    for property in registry.properties() {
        if property.reference_class_name().is_some() && property.reference_class().is_none() {
            errors.push(VerifyError::UnboundReference {
                property: property.name().to_string(),
            });
        }
        if property.identity().is_none() {
            errors.push(VerifyError::MissingIdentity {
                name: property.name().to_string(),
            });
        }
    }

    VerifyResult::from_errors(errors)
}

fn check_class(registry: &MetamodelRegistry, class: &ClassDescriptor, errors: &mut Vec<VerifyError>) {
    let name = class.name().to_string();

    if class.is_aspect() {
        if let Some(parent) = class.super_class() {
            errors.push(VerifyError::AspectNotLeaf {
                class: name.clone(),
                reason: format!("extends {}", parent.name()),
            });
        }
        if !class.aspects().is_empty() {
            errors.push(VerifyError::AspectNotLeaf {
                class: name.clone(),
                reason: "includes aspects".into(),
            });
        }
    }

    let mut seen = HashSet::new();
    for property in class.effective_properties() {
        if !seen.insert(property.name()) {
            errors.push(VerifyError::DuplicateEffectiveProperty {
                class: name.clone(),
                property: property.name().to_string(),
            });
        }
    }

    let expected = class
        .super_class()
        .into_iter()
        .chain(class.aspects())
        .flat_map(|c| c.effective_properties())
        .chain(class.declared_properties());
    for property in expected {
        if class.property(property.name()).is_none() {
            errors.push(VerifyError::MissingInheritedProperty {
                class: name.clone(),
                property: property.name().to_string(),
            });
        }
    }

    let missing = |target: &ClassDescriptor, relation: &str| VerifyError::MissingBackReference {
        class: name.clone(),
        target: target.name().to_string(),
        relation: relation.to_string(),
    };
    if let Some(parent) = class.super_class() {
        if !registry.has_sub_class(parent.name(), class.name()).unwrap_or(false) {
            errors.push(missing(parent.as_ref(), "sub-class"));
        }
    }
    for aspect in class.aspects() {
        if !registry.uses_aspect(aspect.name(), class.name()).unwrap_or(false) {
            errors.push(missing(aspect.as_ref(), "aspect-usage"));
        }
    }

    if class.identity().is_none() {
        errors.push(VerifyError::MissingIdentity { name });
    }
}
