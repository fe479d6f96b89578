//! core::registry::builtin
//!
//! The built-in `opendma` vocabulary.
//!
//! Every repository starts from these classes, aspects and properties.
//! `Object` is the root class. Repository schema extensions build on top.

use crate::core::schema::{ClassDefinition, PropertyDefinition};
use crate::core::types::{DataType, QualifiedName};
use crate::core::value::PropertyValue;

/// Namespace of the built-in vocabulary.
pub const NAMESPACE: &str = "opendma";

/// Name of the root class.
pub const ROOT_CLASS: &str = "Object";

/// A name in the built-in namespace.
pub fn qname(name: &'static str) -> QualifiedName {
    QualifiedName::from_static(NAMESPACE, name)
}

fn prop(name: &'static str, data_type: DataType) -> PropertyDefinition {
    PropertyDefinition::new(qname(name), data_type)
}

fn reference(name: &'static str, target: &'static str) -> PropertyDefinition {
    PropertyDefinition::reference(qname(name), qname(target))
}

fn class(name: &'static str, super_class: &'static str, properties: &[&'static str]) -> ClassDefinition {
    properties.iter().fold(
        ClassDefinition::class(qname(name)).extends(qname(super_class)),
        |def, &p| def.declares(qname(p)),
    )
}

fn aspect(name: &'static str, properties: &[&'static str]) -> ClassDefinition {
    properties
        .iter()
        .fold(ClassDefinition::aspect(qname(name)), |def, &p| {
            def.declares(qname(p))
        })
}

/// Built-in property definitions.
pub fn properties() -> Vec<PropertyDefinition> {
    use DataType as D;

    let data_type_codes = DataType::ALL
        .iter()
        .map(|dt| PropertyValue::Integer(dt.code()))
        .collect();

    vec![
        // Object
        reference("Class", "Class").system().read_only(),
        prop("Id", D::Id).system().required().read_only(),
        prop("Guid", D::Guid).system().required().read_only(),
        reference("Repository", "Repository").system().read_only(),
        // Shared descriptive properties
        prop("Name", D::String).required(),
        prop("Namespace", D::String),
        prop("DisplayName", D::String),
        prop("Hidden", D::Boolean),
        prop("System", D::Boolean),
        // Class
        reference("SuperClass", "Class").read_only(),
        reference("Aspects", "Class").multi_value().read_only(),
        reference("DeclaredProperties", "PropertyInfo")
            .multi_value()
            .read_only(),
        reference("Properties", "PropertyInfo")
            .multi_value()
            .read_only(),
        prop("Aspect", D::Boolean).read_only(),
        prop("Instantiable", D::Boolean),
        prop("Retrievable", D::Boolean),
        prop("Searchable", D::Boolean),
        reference("SubClasses", "Class").multi_value().read_only(),
        // PropertyInfo
        prop("DataType", D::Integer).required().choices(data_type_codes),
        reference("ReferenceClass", "Class"),
        prop("MultiValue", D::Boolean),
        prop("Required", D::Boolean),
        prop("ReadOnly", D::Boolean),
        // Repository
        reference("RootClass", "Class").read_only(),
        reference("RootAspects", "Class").multi_value().read_only(),
        reference("RootFolder", "Folder"),
        // AuditStamped
        prop("CreatedAt", D::DateTime).read_only(),
        prop("CreatedBy", D::String).read_only(),
        prop("LastModifiedAt", D::DateTime).read_only(),
        prop("LastModifiedBy", D::String).read_only(),
        // Containable
        reference("ContainedIn", "Container").multi_value().read_only(),
        reference("ContainedInAssociations", "Association")
            .multi_value()
            .read_only(),
        // Document
        prop("Title", D::String),
        prop("Version", D::String),
        prop("VersionIndependentId", D::Id).read_only(),
        prop("VersionIndependentGuid", D::Guid).read_only(),
        prop("CombinedContentType", D::String),
        prop("PrimaryContent", D::Content),
        prop("CheckedOut", D::Boolean).read_only(),
        prop("CheckedOutAt", D::DateTime).read_only(),
        prop("CheckedOutBy", D::String).read_only(),
        // Container
        reference("Containees", "Containable").multi_value(),
        reference("Associations", "Association").multi_value(),
        // Folder
        reference("Parent", "Folder"),
        reference("SubFolders", "Folder").multi_value(),
        // Association
        reference("Container", "Container").required(),
        reference("Containee", "Object").required(),
    ]
}

/// Built-in class and aspect definitions, root first.
pub fn classes() -> Vec<ClassDefinition> {
    vec![
        ClassDefinition::class(qname(ROOT_CLASS))
            .declares(qname("Class"))
            .declares(qname("Id"))
            .declares(qname("Guid"))
            .declares(qname("Repository"))
            .abstract_class()
            .system(),
        class(
            "Class",
            ROOT_CLASS,
            &[
                "Name",
                "Namespace",
                "DisplayName",
                "SuperClass",
                "Aspects",
                "DeclaredProperties",
                "Properties",
                "Aspect",
                "Instantiable",
                "Hidden",
                "System",
                "Retrievable",
                "Searchable",
                "SubClasses",
            ],
        )
        .system(),
        class(
            "PropertyInfo",
            ROOT_CLASS,
            &[
                "Name",
                "Namespace",
                "DisplayName",
                "DataType",
                "ReferenceClass",
                "MultiValue",
                "Required",
                "ReadOnly",
                "Hidden",
                "System",
            ],
        )
        .system(),
        class(
            "Repository",
            ROOT_CLASS,
            &["Name", "DisplayName", "RootClass", "RootAspects", "RootFolder"],
        )
        .system(),
        aspect(
            "AuditStamped",
            &["CreatedAt", "CreatedBy", "LastModifiedAt", "LastModifiedBy"],
        ),
        aspect("Containable", &["ContainedIn", "ContainedInAssociations"]),
        class(
            "Document",
            ROOT_CLASS,
            &[
                "Title",
                "Version",
                "VersionIndependentId",
                "VersionIndependentGuid",
                "CombinedContentType",
                "PrimaryContent",
                "CheckedOut",
                "CheckedOutAt",
                "CheckedOutBy",
            ],
        )
        .with_aspect(qname("AuditStamped"))
        .with_aspect(qname("Containable")),
        class("Container", ROOT_CLASS, &["Title", "Containees", "Associations"])
            .with_aspect(qname("AuditStamped")),
        class("Folder", "Container", &["Parent", "SubFolders"]).with_aspect(qname("Containable")),
        class("Association", ROOT_CLASS, &["Name", "Container", "Containee"])
            .with_aspect(qname("AuditStamped")),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn every_declared_property_is_defined() {
        let defined: HashSet<QualifiedName> = properties().into_iter().map(|p| p.name).collect();
        for class in classes() {
            for p in &class.properties {
                assert!(defined.contains(p), "{} declares undefined {p}", class.name);
            }
        }
    }

    #[test]
    fn reference_targets_are_builtin_classes() {
        let classes: HashSet<QualifiedName> = classes().into_iter().map(|c| c.name).collect();
        for p in properties() {
            if let Some(target) = &p.reference_class {
                assert!(classes.contains(target), "{} -> {target}", p.name);
            }
        }
    }

    #[test]
    fn names_live_in_builtin_namespace() {
        assert_eq!(qname("Document").to_string(), "opendma:Document");
    }
}
