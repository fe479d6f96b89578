//! core::schema::class
//!
//! Class and aspect descriptors.
//!
//! # Effective properties
//!
//! Computed once at construction, in this order:
//! 1. the super-class's effective properties
//! 2. each included aspect's effective properties, in aspect order
//! 3. the class's own declared properties
//!
//! A descriptor reached twice through different paths (e.g. an aspect
//! also included by the super-class) keeps its first position. Two
//! different descriptors with the same name are a
//! `DuplicatePropertyDeclaration`.
//!
//! # Invariants
//!
//! - An aspect has no super-class and includes no aspects
//! - A class extends a class, never an aspect
//! - A class includes aspects, never classes
//! - Declared property names never shadow inherited or mixed-in ones

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, OnceLock};

use super::property::PropertyDescriptor;
use super::Identity;
use crate::core::error::DmaError;
use crate::core::types::{DescriptorKind, DmaId, QualifiedName};

/// Everything needed to construct a [`ClassDescriptor`], by name.
///
/// # Example
///
/// ```
/// use odma::core::schema::ClassDefinition;
///
/// let def = ClassDefinition::class("acme:Invoice".parse().unwrap())
///     .extends("opendma:Document".parse().unwrap())
///     .with_aspect("opendma:AuditStamped".parse().unwrap())
///     .declares("acme:Amount".parse().unwrap());
///
/// assert!(!def.is_aspect);
/// assert_eq!(def.aspects.len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassDefinition {
    pub name: QualifiedName,
    pub display_name: Option<String>,
    pub super_class: Option<QualifiedName>,
    pub aspects: Vec<QualifiedName>,
    pub properties: Vec<QualifiedName>,
    pub is_aspect: bool,
    pub instantiable: bool,
    pub hidden: bool,
    pub system: bool,
    pub retrievable: bool,
    pub searchable: bool,
}

impl ClassDefinition {
    /// An instantiable, retrievable, searchable class.
    pub fn class(name: QualifiedName) -> Self {
        Self {
            name,
            display_name: None,
            super_class: None,
            aspects: Vec::new(),
            properties: Vec::new(),
            is_aspect: false,
            instantiable: true,
            hidden: false,
            system: false,
            retrievable: true,
            searchable: true,
        }
    }

    /// An aspect. Aspects are never instantiated on their own.
    pub fn aspect(name: QualifiedName) -> Self {
        Self {
            is_aspect: true,
            instantiable: false,
            ..Self::class(name)
        }
    }

    pub fn display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    pub fn extends(mut self, super_class: QualifiedName) -> Self {
        self.super_class = Some(super_class);
        self
    }

    pub fn with_aspect(mut self, aspect: QualifiedName) -> Self {
        self.aspects.push(aspect);
        self
    }

    pub fn declares(mut self, property: QualifiedName) -> Self {
        self.properties.push(property);
        self
    }

    pub fn abstract_class(mut self) -> Self {
        self.instantiable = false;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn system(mut self) -> Self {
        self.system = true;
        self
    }
}

/// Schema-level metadata for one class or aspect.
pub struct ClassDescriptor {
    name: QualifiedName,
    display_name: String,
    super_class: Option<Arc<ClassDescriptor>>,
    aspects: Vec<Arc<ClassDescriptor>>,
    declared: Vec<Arc<PropertyDescriptor>>,
    effective: Vec<Arc<PropertyDescriptor>>,
    effective_index: HashMap<QualifiedName, usize>,
    is_aspect: bool,
    instantiable: bool,
    hidden: bool,
    system: bool,
    retrievable: bool,
    searchable: bool,
    identity: OnceLock<Identity>,
}

impl ClassDescriptor {
    /// Construct a descriptor, resolving names through the given lookups.
    ///
    /// The super-class and aspects must already exist: construction is
    /// bottom-up.
    ///
    /// # Errors
    ///
    /// - `InvalidClassDefinition` for a structural rule violation
    /// - `DuplicatePropertyDeclaration` for a shadowed or conflicting name
    /// - whatever the lookups return for unknown names
    pub fn build<C, P>(
        def: &ClassDefinition,
        resolve_class: C,
        resolve_property: P,
    ) -> Result<Self, DmaError>
    where
        C: Fn(&QualifiedName) -> Result<Arc<ClassDescriptor>, DmaError>,
        P: Fn(&QualifiedName) -> Result<Arc<PropertyDescriptor>, DmaError>,
    {
        let invalid = |reason: String| DmaError::InvalidClassDefinition {
            class: def.name.to_string(),
            reason,
        };

        if def.is_aspect && def.super_class.is_some() {
            return Err(invalid("aspects cannot have a super-class".into()));
        }
        if def.is_aspect && !def.aspects.is_empty() {
            return Err(invalid("aspects cannot include other aspects".into()));
        }

        let super_class = match &def.super_class {
            Some(name) => {
                let parent = resolve_class(name)?;
                if parent.is_aspect() {
                    return Err(invalid(format!("super-class {name} is an aspect")));
                }
                Some(parent)
            }
            None => None,
        };

        let mut aspects = Vec::with_capacity(def.aspects.len());
        for name in &def.aspects {
            if aspects.iter().any(|a: &Arc<ClassDescriptor>| a.name() == name) {
                return Err(invalid(format!("aspect {name} included twice")));
            }
            let aspect = resolve_class(name)?;
            if !aspect.is_aspect() {
                return Err(invalid(format!("{name} is not an aspect")));
            }
            aspects.push(aspect);
        }

        let mut effective: Vec<Arc<PropertyDescriptor>> = Vec::new();
        let mut effective_index: HashMap<QualifiedName, usize> = HashMap::new();

        let inherited = super_class
            .iter()
            .chain(aspects.iter())
            .flat_map(|c| c.effective_properties().iter());
        for property in inherited {
            merge(def, &mut effective, &mut effective_index, property, false)?;
        }

        let mut declared = Vec::with_capacity(def.properties.len());
        for name in &def.properties {
            let property = resolve_property(name)?;
            merge(def, &mut effective, &mut effective_index, &property, true)?;
            declared.push(property);
        }

        let display_name = def
            .display_name
            .clone()
            .unwrap_or_else(|| def.name.name().to_string());

        Ok(Self {
            name: def.name.clone(),
            display_name,
            super_class,
            aspects,
            declared,
            effective,
            effective_index,
            is_aspect: def.is_aspect,
            instantiable: def.instantiable,
            hidden: def.hidden,
            system: def.system,
            retrievable: def.retrievable,
            searchable: def.searchable,
            identity: OnceLock::new(),
        })
    }

    pub fn name(&self) -> &QualifiedName {
        &self.name
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn super_class(&self) -> Option<&Arc<ClassDescriptor>> {
        self.super_class.as_ref()
    }

    /// Aspects included at this level, in declaration order.
    pub fn aspects(&self) -> &[Arc<ClassDescriptor>] {
        &self.aspects
    }

    /// Properties introduced at this level only.
    pub fn declared_properties(&self) -> &[Arc<PropertyDescriptor>] {
        &self.declared
    }

    /// Inherited, mixed-in and declared properties.
    pub fn effective_properties(&self) -> &[Arc<PropertyDescriptor>] {
        &self.effective
    }

    /// Look up an effective property by name.
    pub fn property(&self, name: &QualifiedName) -> Option<&Arc<PropertyDescriptor>> {
        self.effective_index.get(name).map(|&i| &self.effective[i])
    }

    pub fn is_aspect(&self) -> bool {
        self.is_aspect
    }

    pub fn is_instantiable(&self) -> bool {
        self.instantiable
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    pub fn is_system(&self) -> bool {
        self.system
    }

    pub fn is_retrievable(&self) -> bool {
        self.retrievable
    }

    pub fn is_searchable(&self) -> bool {
        self.searchable
    }

    pub fn kind(&self) -> DescriptorKind {
        if self.is_aspect {
            DescriptorKind::Aspect
        } else {
            DescriptorKind::Class
        }
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.get()
    }

    pub fn id(&self) -> Option<&DmaId> {
        self.identity.get().map(|i| &i.id)
    }

    pub(crate) fn assign_identity(&self, repository_id: &DmaId) -> bool {
        self.identity
            .set(Identity::derive(self.kind(), &self.name, repository_id))
            .is_ok()
    }

    /// Super-classes from the immediate parent up to the root.
    ///
    /// # Errors
    ///
    /// Returns `DmaError::CyclicHierarchy` if the chain loops.
    pub fn ancestors(&self) -> Result<Vec<Arc<ClassDescriptor>>, DmaError> {
        let mut result = Vec::new();
        let mut seen = HashSet::from([self.name.clone()]);
        let mut current = self.super_class.as_ref();

        while let Some(parent) = current {
            if !seen.insert(parent.name.clone()) {
                return Err(DmaError::CyclicHierarchy(parent.name.to_string()));
            }
            result.push(Arc::clone(parent));
            current = parent.super_class.as_ref();
        }

        Ok(result)
    }

    /// Whether this class is `target` or has it as an ancestor.
    ///
    /// # Errors
    ///
    /// Returns `DmaError::CyclicHierarchy` instead of looping if the
    /// super-class chain is cyclic.
    pub fn is_or_extends(&self, target: &QualifiedName) -> Result<bool, DmaError> {
        let mut seen = HashSet::new();
        let mut current = Some(self);

        while let Some(class) = current {
            if !seen.insert(&class.name) {
                return Err(DmaError::CyclicHierarchy(class.name.to_string()));
            }
            if &class.name == target {
                return Ok(true);
            }
            current = class.super_class.as_deref();
        }

        Ok(false)
    }

    /// Whether this class is or extends `target`, or includes an aspect
    /// that is or extends it, at any level of its ancestor chain.
    ///
    /// Each aspect is tested with [`is_or_extends`](Self::is_or_extends),
    /// so aspects with ancestors of their own would also be honoured.
    pub fn is_or_includes_aspect(&self, target: &QualifiedName) -> Result<bool, DmaError> {
        let mut seen = HashSet::new();
        let mut current = Some(self);

        while let Some(class) = current {
            if !seen.insert(&class.name) {
                return Err(DmaError::CyclicHierarchy(class.name.to_string()));
            }
            if &class.name == target {
                return Ok(true);
            }
            for aspect in &class.aspects {
                if aspect.is_or_extends(target)? {
                    return Ok(true);
                }
            }
            current = class.super_class.as_deref();
        }

        Ok(false)
    }

    /// Every aspect included at this level or by an ancestor, nearest
    /// first, without repeats.
    pub fn all_aspects(&self) -> Result<Vec<Arc<ClassDescriptor>>, DmaError> {
        let ancestors = self.ancestors()?;
        let mut seen = HashSet::new();
        let mut result = Vec::new();

        let levels = std::iter::once(self).chain(ancestors.iter().map(Arc::as_ref));
        for class in levels {
            for aspect in &class.aspects {
                if seen.insert(aspect.name.clone()) {
                    result.push(Arc::clone(aspect));
                }
            }
        }
        Ok(result)
    }
}

/// Append `property` to the effective set unless the same descriptor is
/// already there.
fn merge(
    def: &ClassDefinition,
    effective: &mut Vec<Arc<PropertyDescriptor>>,
    index: &mut HashMap<QualifiedName, usize>,
    property: &Arc<PropertyDescriptor>,
    declared: bool,
) -> Result<(), DmaError> {
    match index.get(property.name()) {
        Some(&i) if !declared && Arc::ptr_eq(&effective[i], property) => Ok(()),
        Some(_) => Err(DmaError::DuplicatePropertyDeclaration {
            class: def.name.to_string(),
            property: property.name().to_string(),
        }),
        None => {
            index.insert(property.name().clone(), effective.len());
            effective.push(Arc::clone(property));
            Ok(())
        }
    }
}

impl std::fmt::Debug for ClassDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassDescriptor")
            .field("name", &self.name.to_string())
            .field("is_aspect", &self.is_aspect)
            .field(
                "super_class",
                &self.super_class.as_ref().map(|c| c.name.to_string()),
            )
            .field(
                "aspects",
                &self
                    .aspects
                    .iter()
                    .map(|a| a.name.to_string())
                    .collect::<Vec<_>>(),
            )
            .field("declared", &self.declared.len())
            .field("effective", &self.effective.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::PropertyDefinition;
    use crate::core::types::DataType;

    fn q(s: &str) -> QualifiedName {
        s.parse().unwrap()
    }

    /// Tiny arena for building descriptors by hand.
    #[derive(Default)]
    struct Arena {
        classes: HashMap<QualifiedName, Arc<ClassDescriptor>>,
        properties: HashMap<QualifiedName, Arc<PropertyDescriptor>>,
    }

    impl Arena {
        fn property(&mut self, name: &str, data_type: DataType) {
            let def = PropertyDefinition::new(q(name), data_type);
            self.properties
                .insert(q(name), Arc::new(PropertyDescriptor::new(def).unwrap()));
        }

        fn build(&self, def: &ClassDefinition) -> Result<ClassDescriptor, DmaError> {
            ClassDescriptor::build(
                def,
                |n| {
                    self.classes
                        .get(n)
                        .cloned()
                        .ok_or_else(|| DmaError::ObjectNotFound(n.to_string()))
                },
                |n| {
                    self.properties
                        .get(n)
                        .cloned()
                        .ok_or_else(|| DmaError::ObjectNotFound(n.to_string()))
                },
            )
        }

        fn define(&mut self, def: ClassDefinition) -> Arc<ClassDescriptor> {
            let class = Arc::new(self.build(&def).unwrap());
            self.classes.insert(def.name, Arc::clone(&class));
            class
        }
    }

    fn names(props: &[Arc<PropertyDescriptor>]) -> Vec<String> {
        props.iter().map(|p| p.name().to_string()).collect()
    }

    fn fixture() -> Arena {
        let mut arena = Arena::default();
        arena.property("t:Id", DataType::Id);
        arena.property("t:Title", DataType::String);
        arena.property("t:CreatedAt", DataType::DateTime);
        arena.property("t:Version", DataType::String);

        arena.define(ClassDefinition::class(q("t:Object")).declares(q("t:Id")));
        arena.define(ClassDefinition::aspect(q("t:Stamped")).declares(q("t:CreatedAt")));
        arena
    }

    #[test]
    fn effective_order_is_super_then_aspects_then_declared() {
        let mut arena = fixture();
        let doc = arena.define(
            ClassDefinition::class(q("t:Document"))
                .extends(q("t:Object"))
                .with_aspect(q("t:Stamped"))
                .declares(q("t:Title")),
        );

        assert_eq!(names(doc.declared_properties()), vec!["t:Title"]);
        assert_eq!(
            names(doc.effective_properties()),
            vec!["t:Id", "t:CreatedAt", "t:Title"]
        );
        assert!(doc.property(&q("t:CreatedAt")).is_some());
        assert!(doc.property(&q("t:Version")).is_none());
    }

    #[test]
    fn same_aspect_reached_twice_appears_once() {
        let mut arena = fixture();
        arena.define(
            ClassDefinition::class(q("t:Document"))
                .extends(q("t:Object"))
                .with_aspect(q("t:Stamped")),
        );
        let sub = arena.define(
            ClassDefinition::class(q("t:Memo"))
                .extends(q("t:Document"))
                .with_aspect(q("t:Stamped")),
        );

        assert_eq!(names(sub.effective_properties()), vec!["t:Id", "t:CreatedAt"]);
    }

    #[test]
    fn redeclaring_inherited_property_fails() {
        let arena = fixture();
        let def = ClassDefinition::class(q("t:Document"))
            .extends(q("t:Object"))
            .declares(q("t:Id"));

        assert!(matches!(
            arena.build(&def),
            Err(DmaError::DuplicatePropertyDeclaration { .. })
        ));
    }

    #[test]
    fn redeclaring_mixed_in_property_fails() {
        let arena = fixture();
        let def = ClassDefinition::class(q("t:Document"))
            .with_aspect(q("t:Stamped"))
            .declares(q("t:CreatedAt"));

        assert!(matches!(
            arena.build(&def),
            Err(DmaError::DuplicatePropertyDeclaration { .. })
        ));
    }

    #[test]
    fn declaring_twice_fails() {
        let arena = fixture();
        let def = ClassDefinition::class(q("t:Document"))
            .declares(q("t:Title"))
            .declares(q("t:Title"));

        assert!(matches!(
            arena.build(&def),
            Err(DmaError::DuplicatePropertyDeclaration { .. })
        ));
    }

    #[test]
    fn conflicting_descriptors_with_same_name_fail() {
        let mut arena = fixture();
        let other = PropertyDefinition::new(q("t:Id"), DataType::String);
        arena.properties.insert(
            q("t:OtherId"),
            Arc::new(PropertyDescriptor::new(other).unwrap()),
        );
        arena.define(ClassDefinition::aspect(q("t:Clashing")).declares(q("t:OtherId")));

        let def = ClassDefinition::class(q("t:Document"))
            .extends(q("t:Object"))
            .with_aspect(q("t:Clashing"));
        assert!(matches!(
            arena.build(&def),
            Err(DmaError::DuplicatePropertyDeclaration { .. })
        ));
    }

    #[test]
    fn aspect_with_super_class_is_invalid() {
        let arena = fixture();
        let def = ClassDefinition::aspect(q("t:Versionable")).extends(q("t:Object"));

        assert!(matches!(
            arena.build(&def),
            Err(DmaError::InvalidClassDefinition { .. })
        ));
    }

    #[test]
    fn aspect_including_aspect_is_invalid() {
        let arena = fixture();
        let def = ClassDefinition::aspect(q("t:Versionable")).with_aspect(q("t:Stamped"));
        assert!(matches!(
            arena.build(&def),
            Err(DmaError::InvalidClassDefinition { .. })
        ));
    }

    #[test]
    fn extending_an_aspect_is_invalid() {
        let arena = fixture();
        let def = ClassDefinition::class(q("t:Odd")).extends(q("t:Stamped"));
        assert!(matches!(
            arena.build(&def),
            Err(DmaError::InvalidClassDefinition { .. })
        ));
    }

    #[test]
    fn including_a_class_as_aspect_is_invalid() {
        let arena = fixture();
        let def = ClassDefinition::class(q("t:Odd")).with_aspect(q("t:Object"));
        assert!(matches!(
            arena.build(&def),
            Err(DmaError::InvalidClassDefinition { .. })
        ));
    }

    #[test]
    fn unknown_parent_is_not_found() {
        let arena = fixture();
        let def = ClassDefinition::class(q("t:Odd")).extends(q("t:Missing"));
        assert!(matches!(
            arena.build(&def),
            Err(DmaError::ObjectNotFound(_))
        ));
    }

    #[test]
    fn hierarchy_queries() {
        let mut arena = fixture();
        arena.define(
            ClassDefinition::class(q("t:Document"))
                .extends(q("t:Object"))
                .with_aspect(q("t:Stamped")),
        );
        let memo = arena.define(ClassDefinition::class(q("t:Memo")).extends(q("t:Document")));

        assert!(memo.is_or_extends(&q("t:Memo")).unwrap());
        assert!(memo.is_or_extends(&q("t:Object")).unwrap());
        assert!(!memo.is_or_extends(&q("t:Stamped")).unwrap());
        assert!(memo.is_or_includes_aspect(&q("t:Stamped")).unwrap());
        assert!(!memo.is_or_includes_aspect(&q("t:Folder")).unwrap());

        let ancestors: Vec<String> = memo
            .ancestors()
            .unwrap()
            .iter()
            .map(|c| c.name().to_string())
            .collect();
        assert_eq!(ancestors, vec!["t:Document", "t:Object"]);

        let aspects = memo.all_aspects().unwrap();
        assert_eq!(aspects.len(), 1);
        assert_eq!(aspects[0].name(), &q("t:Stamped"));
    }

    #[test]
    fn definition_defaults() {
        let class = ClassDefinition::class(q("t:A"));
        assert!(class.instantiable && class.retrievable && class.searchable);
        let aspect = ClassDefinition::aspect(q("t:B"));
        assert!(aspect.is_aspect && !aspect.instantiable);
    }
}
