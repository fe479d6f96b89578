//! Integration tests for a configured repository.
//!
//! These tests bootstrap a metamodel from a config file, store objects in
//! the in-memory adaptor and exercise the full object lifecycle:
//! create → set → save → reload → resolve references.

use std::sync::Arc;
use std::thread;

use tempfile::TempDir;

use odma::core::adaptor::{AdaptorOperation, MemoryAdaptor};
use odma::core::config::Config;
use odma::core::error::DmaError;
use odma::core::instance::ResolutionState;
use odma::core::registry::{builtin, MetamodelRegistry};
use odma::core::types::{DataType, QualifiedName};
use odma::core::value::{Content, PropertyValue};
use odma::core::verify::verify_registry;

// =============================================================================
// Test Fixtures
// =============================================================================

const ACME: &str = r#"
[repository]
id = "acme"
name = "Acme archive"

[[class]]
name = "acme:Invoice"
display_name = "Invoice"
super_class = "opendma:Document"
aspects = ["acme:Billable"]
properties = ["acme:Amount", "acme:Customer"]

[[class]]
name = "acme:Billable"
aspect = true
properties = ["acme:Currency", "acme:Tags"]

[[class]]
name = "acme:Customer"
super_class = "opendma:Object"
properties = ["acme:CustomerName"]

[[property]]
name = "acme:Amount"
data_type = "Double"
required = true

[[property]]
name = "acme:Currency"
data_type = "String"
choices = ["EUR", "USD"]

[[property]]
name = "acme:Tags"
data_type = "String"
multi_value = true

[[property]]
name = "acme:Customer"
data_type = "Reference"
reference_class = "acme:Customer"

[[property]]
name = "acme:CustomerName"
data_type = "String"
"#;

fn acme(name: &str) -> QualifiedName {
    QualifiedName::new("acme", name).unwrap()
}

/// Write the fixture config to a temp dir and bootstrap from it.
fn registry() -> (TempDir, Arc<MetamodelRegistry>) {
    let dir = TempDir::new().expect("failed to create temp dir");
    let path = dir.path().join("config.toml");
    std::fs::write(&path, ACME).expect("failed to write config");

    let config = Config::load(Some(&path)).expect("config loads");
    assert_eq!(config.repository_name(), Some("Acme archive"));
    let registry = config.build_registry().expect("schema bootstraps");
    (dir, Arc::new(registry))
}

// =============================================================================
// Schema
// =============================================================================

#[test]
fn extension_classes_join_the_builtin_hierarchy() {
    let (_dir, registry) = registry();
    let invoice = registry.class(&acme("Invoice")).unwrap();

    assert_eq!(invoice.display_name(), "Invoice");
    assert!(registry
        .is_or_extends(&acme("Invoice"), &builtin::qname("Object"))
        .unwrap());
    assert!(registry
        .is_or_includes_aspect(&acme("Invoice"), &builtin::qname("AuditStamped"))
        .unwrap());
    assert!(registry
        .is_or_includes_aspect(&acme("Invoice"), &acme("Billable"))
        .unwrap());

    let subs = registry.sub_classes(&builtin::qname("Document")).unwrap();
    assert!(subs.iter().any(|c| c.name() == &acme("Invoice")));
    assert!(registry
        .root_aspects()
        .iter()
        .any(|a| a.name() == &acme("Billable")));

    let customer = invoice.property(&acme("Customer")).unwrap();
    assert_eq!(customer.data_type(), DataType::Reference);
    assert_eq!(
        customer.reference_class().map(|c| c.name().clone()),
        Some(acme("Customer"))
    );

    assert!(verify_registry(&registry).ok);
}

#[test]
fn effective_properties_start_with_inherited_ones() {
    let (_dir, registry) = registry();
    let invoice = registry.class(&acme("Invoice")).unwrap();
    let names: Vec<String> = invoice
        .effective_properties()
        .iter()
        .map(|p| p.name().to_string())
        .collect();

    assert_eq!(names[0], "opendma:Class");
    let title = names.iter().position(|n| n == "opendma:Title").unwrap();
    let currency = names.iter().position(|n| n == "acme:Currency").unwrap();
    let amount = names.iter().position(|n| n == "acme:Amount").unwrap();
    assert!(title < currency && currency < amount);
}

// =============================================================================
// Object lifecycle
// =============================================================================

#[test]
fn invoice_lifecycle() {
    let (_dir, registry) = registry();
    let store = MemoryAdaptor::new(Arc::clone(&registry));

    let customer = store.create_object(&acme("Customer")).unwrap();
    customer
        .set_property(&acme("CustomerName"), Some("Globex".into()))
        .unwrap();
    customer.save().unwrap();

    let invoice = store.create_object(&acme("Invoice")).unwrap();
    assert!(invoice.instance_of(&builtin::qname("Document")).unwrap());
    invoice
        .set_property(&acme("Amount"), Some(PropertyValue::Double(99.5)))
        .unwrap();
    invoice
        .set_property(&acme("Currency"), Some("EUR".into()))
        .unwrap();
    invoice
        .set_property(
            &acme("Tags"),
            Some(PropertyValue::StringList(vec!["q3".into(), "paid".into()])),
        )
        .unwrap();
    invoice
        .set_property(
            &builtin::qname("PrimaryContent"),
            Some(PropertyValue::Content(Content::new(
                b"%PDF".to_vec(),
                Some("application/pdf".into()),
            ))),
        )
        .unwrap();
    invoice
        .set_property(&acme("Customer"), Some(Arc::clone(&customer).into()))
        .unwrap();
    assert!(invoice.is_dirty());
    invoice.save().unwrap();
    assert!(!invoice.is_dirty());

    let reloaded = store.get_object(invoice.id()).unwrap();
    assert_eq!(reloaded, invoice);
    assert_eq!(
        reloaded.get_property(&acme("Amount")).unwrap().double().unwrap(),
        Some(99.5)
    );
    assert_eq!(
        reloaded.get_property(&acme("Tags")).unwrap().string_list().unwrap(),
        vec!["q3".to_string(), "paid".to_string()]
    );
    let content = reloaded
        .get_property(&builtin::qname("PrimaryContent"))
        .unwrap()
        .content()
        .unwrap()
        .unwrap();
    assert_eq!(content.content_type(), Some("application/pdf"));
    assert_eq!(content.size(), 4);

    let link = reloaded.get_property(&acme("Customer")).unwrap();
    assert_eq!(link.resolution_state(), ResolutionState::IdResolved);
    let target = link.reference().unwrap().unwrap();
    assert_eq!(target.id(), customer.id());
    assert_eq!(
        target
            .get_property(&acme("CustomerName"))
            .unwrap()
            .string()
            .unwrap()
            .as_deref(),
        Some("Globex")
    );
}

#[test]
fn rejected_writes_leave_the_object_clean() {
    let (_dir, registry) = registry();
    let store = MemoryAdaptor::new(registry);
    let invoice = store.create_object(&acme("Invoice")).unwrap();

    let cases = [
        (acme("Currency"), Some("GBP".into())),
        (acme("Amount"), Some(PropertyValue::Integer(10))),
        (acme("Tags"), None),
        (builtin::qname("CreatedBy"), Some("mallory".into())),
    ];
    for (name, value) in cases {
        assert!(invoice.set_property(&name, value).is_err(), "{name} accepted");
    }
    assert!(!invoice.is_dirty());
    assert!(invoice.changes().is_empty());

    let err = invoice
        .set_property(&builtin::qname("CreatedBy"), Some("mallory".into()))
        .unwrap_err();
    assert!(matches!(err, DmaError::AccessDenied(_)));
}

#[test]
fn reference_targets_must_match_the_declared_class() {
    let (_dir, registry) = registry();
    let store = MemoryAdaptor::new(registry);
    let invoice = store.create_object(&acme("Invoice")).unwrap();
    let folder = store.create_object(&builtin::qname("Folder")).unwrap();

    let err = invoice
        .set_property(&acme("Customer"), Some(folder.into()))
        .unwrap_err();
    assert!(matches!(err, DmaError::InvalidDataType(_)));
}

#[test]
fn containment_through_aspects() {
    let (_dir, registry) = registry();
    let store = MemoryAdaptor::new(registry);
    let folder = store.create_object(&builtin::qname("Folder")).unwrap();
    let invoice = store.create_object(&acme("Invoice")).unwrap();

    folder
        .set_property(
            &builtin::qname("Containees"),
            Some(PropertyValue::ReferenceList(vec![Arc::clone(&invoice)])),
        )
        .unwrap();
    folder.save().unwrap();
    store.clear_operations();

    let reloaded = store.get_object(folder.id()).unwrap();
    let containees = reloaded
        .get_property(&builtin::qname("Containees"))
        .unwrap()
        .reference_list()
        .unwrap();
    assert_eq!(containees.len(), 1);
    assert!(containees[0].instance_of(&acme("Invoice")).unwrap());

    let fetches = store
        .operations()
        .into_iter()
        .filter(|op| matches!(op, AdaptorOperation::Fetch { .. }))
        .count();
    assert_eq!(fetches, 1);
}

// =============================================================================
// Concurrency
// =============================================================================

#[test]
fn concurrent_readers_share_one_registry() {
    let (_dir, registry) = registry();
    let store = MemoryAdaptor::new(Arc::clone(&registry));
    let invoice = store.create_object(&acme("Invoice")).unwrap();
    invoice
        .set_property(&acme("Amount"), Some(PropertyValue::Double(1.0)))
        .unwrap();
    invoice.save().unwrap();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let registry = Arc::clone(&registry);
            let store = Arc::clone(&store);
            let id = invoice.id().clone();
            thread::spawn(move || {
                registry
                    .register_sub_class(&builtin::qname("Document"), &acme("Invoice"))
                    .unwrap();
                let object = store.get_object(&id).unwrap();
                object.get_property(&acme("Amount")).unwrap().double().unwrap()
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), Some(1.0));
    }
    let subs = registry.sub_classes(&builtin::qname("Document")).unwrap();
    assert_eq!(
        subs.iter().filter(|c| c.name() == &acme("Invoice")).count(),
        1
    );
}
