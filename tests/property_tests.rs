//! Property-based tests for the metamodel.
//!
//! These tests use proptest to bootstrap randomly generated class
//! hierarchies and check that the structural invariants hold for all of
//! them.

use std::collections::HashSet;
use std::sync::Arc;

use proptest::prelude::*;

use odma::core::error::DmaError;
use odma::core::instance::PropertyInstance;
use odma::core::registry::MetamodelRegistry;
use odma::core::schema::{ClassDefinition, PropertyDefinition, PropertyDescriptor};
use odma::core::types::{DataType, DmaId, QualifiedName};
use odma::core::value::PropertyValue;
use odma::core::verify::verify_registry;

fn q(raw: &str) -> QualifiedName {
    raw.parse().expect("valid qualified name")
}

/// A generated hierarchy: `parents[i]` is the super-class index of class
/// `i + 1` (always lower, so the tree is acyclic), `mixins[i]` lists the
/// aspects included by class `i`, `declared` counts properties per class
/// followed by per aspect.
#[derive(Debug, Clone)]
struct Hierarchy {
    parents: Vec<usize>,
    mixins: Vec<Vec<usize>>,
    aspect_count: usize,
    declared: Vec<usize>,
}

impl Hierarchy {
    fn class_count(&self) -> usize {
        self.parents.len() + 1
    }

    fn class_name(i: usize) -> QualifiedName {
        q(&format!("gen:C{i}"))
    }

    fn aspect_name(i: usize) -> QualifiedName {
        q(&format!("gen:A{i}"))
    }

    fn property_name(owner: &str, k: usize) -> QualifiedName {
        q(&format!("gen:{owner}_P{k}"))
    }

    fn definitions(&self) -> (Vec<ClassDefinition>, Vec<PropertyDefinition>) {
        let mut classes = Vec::new();
        let mut properties = Vec::new();

        for i in 0..self.class_count() {
            let mut def = ClassDefinition::class(Self::class_name(i));
            if i > 0 {
                def = def.extends(Self::class_name(self.parents[i - 1]));
            }
            for &a in &self.mixins[i] {
                def = def.with_aspect(Self::aspect_name(a));
            }
            for k in 0..self.declared[i] {
                let name = Self::property_name(&format!("C{i}"), k);
                properties.push(PropertyDefinition::new(name.clone(), DataType::String));
                def = def.declares(name);
            }
            classes.push(def);
        }

        for a in 0..self.aspect_count {
            let mut def = ClassDefinition::aspect(Self::aspect_name(a));
            for k in 0..self.declared[self.class_count() + a] {
                let name = Self::property_name(&format!("A{a}"), k);
                properties.push(PropertyDefinition::new(name.clone(), DataType::Long));
                def = def.declares(name);
            }
            classes.push(def);
        }

        (classes, properties)
    }
}

fn hierarchy_strategy() -> impl Strategy<Value = Hierarchy> {
    (1usize..10, 0usize..4)
        .prop_flat_map(|(classes, aspects)| {
            let parents = (1..classes).map(|i| 0..i).collect::<Vec<_>>();
            let mixins = prop::collection::vec(prop::collection::vec(any::<bool>(), aspects), classes);
            let declared = prop::collection::vec(0usize..4, classes + aspects);
            (parents, mixins, Just(aspects), declared)
        })
        .prop_map(|(parents, mixins, aspect_count, declared)| Hierarchy {
            parents,
            mixins: mixins
                .into_iter()
                .map(|mask| {
                    mask.into_iter()
                        .enumerate()
                        .filter_map(|(a, included)| included.then_some(a))
                        .collect()
                })
                .collect(),
            aspect_count,
            declared,
        })
}

fn build(classes: Vec<ClassDefinition>, properties: Vec<PropertyDefinition>) -> MetamodelRegistry {
    MetamodelRegistry::builder(DmaId::new("gen").unwrap())
        .properties(properties)
        .classes(classes)
        .build()
        .expect("generated hierarchy bootstraps")
}

// =============================================================================
// Hierarchy invariants
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Definitions may be supplied in any order.
    #[test]
    fn bootstrap_ignores_definition_order(
        (hierarchy, classes) in hierarchy_strategy().prop_flat_map(|h| {
            let (classes, _) = h.definitions();
            (Just(h), Just(classes).prop_shuffle())
        })
    ) {
        let (_, properties) = hierarchy.definitions();
        let registry = build(classes, properties);
        prop_assert_eq!(
            registry.class_count(),
            hierarchy.class_count() + hierarchy.aspect_count
        );
        prop_assert_eq!(
            registry.root_class().map(|c| c.name().clone()),
            Some(Hierarchy::class_name(0))
        );
    }

    #[test]
    fn every_class_reaches_the_root(hierarchy in hierarchy_strategy()) {
        let (classes, properties) = hierarchy.definitions();
        let registry = build(classes, properties);
        let root = Hierarchy::class_name(0);

        for i in 0..hierarchy.class_count() {
            let name = Hierarchy::class_name(i);
            prop_assert!(registry.is_or_extends(&name, &root).unwrap());

            let class = registry.class(&name).unwrap();
            let ancestors = class.ancestors().unwrap();
            prop_assert!(ancestors.len() < hierarchy.class_count());
            prop_assert_eq!(ancestors.last().map(|c| c.name().clone()), Some(root.clone()));
        }
    }

    #[test]
    fn effective_properties_cover_all_sources(hierarchy in hierarchy_strategy()) {
        let (classes, properties) = hierarchy.definitions();
        let registry = build(classes, properties);

        for class in registry.classes() {
            let effective = class.effective_properties();

            let mut seen = HashSet::new();
            for p in effective {
                prop_assert!(seen.insert(p.name().clone()), "duplicate {}", p.name());
            }

            let expected = class
                .super_class()
                .into_iter()
                .chain(class.aspects())
                .flat_map(|c| c.effective_properties())
                .chain(class.declared_properties());
            for p in expected {
                prop_assert!(seen.contains(p.name()), "{} lacks {}", class.name(), p.name());
            }
        }
    }

    #[test]
    fn back_references_match_forward_edges(hierarchy in hierarchy_strategy()) {
        let (classes, properties) = hierarchy.definitions();
        let registry = build(classes, properties);

        for class in registry.classes() {
            if let Some(parent) = class.super_class() {
                let subs = registry.sub_classes(parent.name()).unwrap();
                prop_assert!(subs.iter().any(|c| c.name() == class.name()));
            }
            for aspect in class.aspects() {
                let users = registry.aspect_usages(aspect.name()).unwrap();
                prop_assert!(users.iter().any(|c| c.name() == class.name()));
                prop_assert!(registry.is_or_includes_aspect(class.name(), aspect.name()).unwrap());
            }
        }
        prop_assert!(verify_registry(&registry).ok);
    }

    #[test]
    fn super_class_cycle_is_rejected(len in 1usize..6) {
        let classes = (0..len)
            .map(|i| {
                ClassDefinition::class(Hierarchy::class_name(i))
                    .extends(Hierarchy::class_name((i + 1) % len))
            })
            .collect::<Vec<_>>();
        let err = MetamodelRegistry::builder(DmaId::new("gen").unwrap())
            .classes(classes)
            .build()
            .unwrap_err();
        prop_assert!(matches!(err, DmaError::CyclicHierarchy(_)));
    }
}

// =============================================================================
// Value invariants
// =============================================================================

fn instance(data_type: DataType) -> PropertyInstance {
    let descriptor = PropertyDescriptor::new(PropertyDefinition::new(q("gen:Value"), data_type))
        .expect("plain descriptor");
    PropertyInstance::unresolved(Arc::new(descriptor))
}

proptest! {
    #[test]
    fn string_round_trip(text in ".*") {
        let p = instance(DataType::String);
        p.set_value(Some(text.clone().into())).unwrap();
        prop_assert_eq!(p.string().unwrap(), Some(text));
        prop_assert!(p.is_dirty());
    }

    #[test]
    fn long_round_trip(n in any::<i64>()) {
        let p = instance(DataType::Long);
        p.set_value(Some(PropertyValue::Long(n))).unwrap();
        prop_assert_eq!(p.long().unwrap(), Some(n));
    }

    #[test]
    fn integers_never_widen(n in any::<i32>()) {
        let p = instance(DataType::Long);
        let err = p.set_value(Some(PropertyValue::Integer(n))).unwrap_err();
        prop_assert!(matches!(err, DmaError::InvalidDataType(_)));
        prop_assert!(!p.is_dirty());
        prop_assert_eq!(p.value(), None);
    }

    #[test]
    fn wrong_accessor_fails(flag in any::<bool>()) {
        let p = instance(DataType::Boolean);
        p.set_value(Some(PropertyValue::Boolean(flag))).unwrap();
        prop_assert!(matches!(p.string(), Err(DmaError::InvalidDataType(_))));
        prop_assert!(matches!(p.boolean_list(), Err(DmaError::InvalidDataType(_))));
        prop_assert_eq!(p.boolean().unwrap(), Some(flag));
    }

    #[test]
    fn qualified_names_round_trip(
        namespace in "[a-z][a-z0-9.]{0,12}",
        name in "[A-Za-z][A-Za-z0-9_]{0,16}"
    ) {
        let qname = QualifiedName::new(namespace.clone(), name.clone()).unwrap();
        let parsed: QualifiedName = qname.to_string().parse().unwrap();
        prop_assert_eq!(parsed.namespace(), namespace.as_str());
        prop_assert_eq!(parsed.name(), name.as_str());
        prop_assert_eq!(parsed, qname);
    }
}
