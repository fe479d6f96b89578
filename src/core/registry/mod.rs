//! core::registry
//!
//! The metamodel of one repository session.
//!
//! # Bootstrap
//!
//! [`MetamodelBuilder::build`] runs five phases, once:
//!
//! 1. Declare properties
//! 2. Define classes bottom-up, computing effective properties
//! 3. Patch back-references (sub-classes, aspect usages, root aspects)
//! 4. Bind reference properties to their target classes
//! 5. Assign identifiers
//!
//! Any violation aborts the build. The resulting [`MetamodelRegistry`] is
//! read-only apart from its append-only back-reference indices, and is
//! replaced wholesale when repository metadata changes.
//!
//! # Modules
//!
//! - [`builtin`] - The `opendma` vocabulary
//! - [`index`] - Append-only back-reference sets
//!
//! # Example
//!
//! ```
//! use odma::core::registry::{builtin, MetamodelRegistry};
//! use odma::core::types::DmaId;
//!
//! let registry = MetamodelRegistry::bootstrap(DmaId::new("demo").unwrap()).unwrap();
//! let document = builtin::qname("Document");
//!
//! assert!(registry.is_or_extends(&document, &builtin::qname("Object")).unwrap());
//! assert!(!registry.is_or_extends(&builtin::qname("Class"), &document).unwrap());
//! ```

pub mod builtin;
pub mod index;

pub use index::BackRefIndex;

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use tracing::{debug, info};

use self::index::BackRefIndices;
use super::error::DmaError;
use super::graph::ClassGraph;
use super::schema::{ClassDefinition, ClassDescriptor, PropertyDefinition, PropertyDescriptor};
use super::types::{DmaId, QualifiedName};

/// All class and property descriptors of one repository.
#[derive(Debug)]
pub struct MetamodelRegistry {
    repository_id: DmaId,
    classes: HashMap<QualifiedName, Arc<ClassDescriptor>>,
    class_order: Vec<QualifiedName>,
    properties: HashMap<QualifiedName, Arc<PropertyDescriptor>>,
    property_order: Vec<QualifiedName>,
    root_class: Option<QualifiedName>,
    root_aspects: Vec<QualifiedName>,
    sub_classes: BackRefIndices,
    aspect_usages: BackRefIndices,
}

impl MetamodelRegistry {
    /// Bootstrap the built-in vocabulary for a repository.
    pub fn bootstrap(repository_id: DmaId) -> Result<Self, DmaError> {
        Self::builder(repository_id).with_builtin().build()
    }

    /// Start an empty builder.
    pub fn builder(repository_id: DmaId) -> MetamodelBuilder {
        MetamodelBuilder::new(repository_id)
    }

    pub fn repository_id(&self) -> &DmaId {
        &self.repository_id
    }

    /// Look up a class or aspect.
    ///
    /// # Errors
    ///
    /// `DmaError::ObjectNotFound` if no such class is registered.
    pub fn class(&self, name: &QualifiedName) -> Result<&Arc<ClassDescriptor>, DmaError> {
        self.classes
            .get(name)
            .ok_or_else(|| DmaError::ObjectNotFound(format!("class {name}")))
    }

    /// Look up a property descriptor.
    ///
    /// # Errors
    ///
    /// `DmaError::ObjectNotFound` if no such property is registered.
    pub fn property(&self, name: &QualifiedName) -> Result<&Arc<PropertyDescriptor>, DmaError> {
        self.properties
            .get(name)
            .ok_or_else(|| DmaError::ObjectNotFound(format!("property {name}")))
    }

    pub fn contains_class(&self, name: &QualifiedName) -> bool {
        self.classes.contains_key(name)
    }

    /// Classes and aspects in definition order.
    pub fn classes(&self) -> impl Iterator<Item = &Arc<ClassDescriptor>> + '_ {
        self.class_order.iter().filter_map(|n| self.classes.get(n))
    }

    /// Properties in definition order.
    pub fn properties(&self) -> impl Iterator<Item = &Arc<PropertyDescriptor>> + '_ {
        self.property_order
            .iter()
            .filter_map(|n| self.properties.get(n))
    }

    pub fn class_count(&self) -> usize {
        self.classes.len()
    }

    pub fn property_count(&self) -> usize {
        self.properties.len()
    }

    /// The class every other class descends from, if there is one.
    pub fn root_class(&self) -> Option<&Arc<ClassDescriptor>> {
        self.root_class.as_ref().and_then(|n| self.classes.get(n))
    }

    /// Aspects not derived from any other aspect, in definition order.
    pub fn root_aspects(&self) -> Vec<&Arc<ClassDescriptor>> {
        self.root_aspects
            .iter()
            .filter_map(|n| self.classes.get(n))
            .collect()
    }

    /// Direct sub-classes of `name`, in registration order.
    ///
    /// # Errors
    ///
    /// `DmaError::ObjectNotFound` if `name` is not a registered class.
    pub fn sub_classes(&self, name: &QualifiedName) -> Result<Vec<Arc<ClassDescriptor>>, DmaError> {
        self.class(name)?;
        Ok(self.members(self.sub_classes.get_or_create(name)))
    }

    /// Classes that include the aspect `name`, in registration order.
    ///
    /// # Errors
    ///
    /// `DmaError::ObjectNotFound` if `name` is not a registered class.
    pub fn aspect_usages(
        &self,
        name: &QualifiedName,
    ) -> Result<Vec<Arc<ClassDescriptor>>, DmaError> {
        self.class(name)?;
        Ok(self.members(self.aspect_usages.get_or_create(name)))
    }

    /// Whether `child` is recorded as a direct sub-class of `parent`.
    ///
    /// # Errors
    ///
    /// `DmaError::ObjectNotFound` if `parent` is not a registered class.
    pub fn has_sub_class(
        &self,
        parent: &QualifiedName,
        child: &QualifiedName,
    ) -> Result<bool, DmaError> {
        self.class(parent)?;
        Ok(self.sub_classes.get_or_create(parent).contains(child))
    }

    /// Whether `class` is recorded as using the aspect `aspect`.
    ///
    /// # Errors
    ///
    /// `DmaError::ObjectNotFound` if `aspect` is not a registered class.
    pub fn uses_aspect(&self, aspect: &QualifiedName, class: &QualifiedName) -> Result<bool, DmaError> {
        self.class(aspect)?;
        Ok(self.aspect_usages.get_or_create(aspect).contains(class))
    }

    /// Record `child` as a sub-class of `parent`.
    ///
    /// Idempotent. Returns `false` if already recorded.
    ///
    /// # Errors
    ///
    /// `DmaError::ObjectNotFound` if either class is unknown.
    pub fn register_sub_class(
        &self,
        parent: &QualifiedName,
        child: &QualifiedName,
    ) -> Result<bool, DmaError> {
        self.class(parent)?;
        self.class(child)?;
        Ok(self.sub_classes.get_or_create(parent).insert(child.clone()))
    }

    /// Record `class` as using `aspect`.
    ///
    /// Idempotent. Returns `false` if already recorded.
    ///
    /// # Errors
    ///
    /// `DmaError::ObjectNotFound` if either class is unknown.
    pub fn register_aspect_usage(
        &self,
        aspect: &QualifiedName,
        class: &QualifiedName,
    ) -> Result<bool, DmaError> {
        self.class(aspect)?;
        self.class(class)?;
        Ok(self.aspect_usages.get_or_create(aspect).insert(class.clone()))
    }

    /// Whether `class` is `target` or extends it.
    pub fn is_or_extends(
        &self,
        class: &QualifiedName,
        target: &QualifiedName,
    ) -> Result<bool, DmaError> {
        self.class(class)?.is_or_extends(target)
    }

    /// Whether `class` is, extends or includes `target`.
    pub fn is_or_includes_aspect(
        &self,
        class: &QualifiedName,
        target: &QualifiedName,
    ) -> Result<bool, DmaError> {
        self.class(class)?.is_or_includes_aspect(target)
    }

    /// All transitive sub-classes of `name`, nearest first.
    pub fn descendants(&self, name: &QualifiedName) -> Result<Vec<Arc<ClassDescriptor>>, DmaError> {
        let mut result = Vec::new();
        let mut seen = HashSet::new();
        let mut queue: VecDeque<Arc<ClassDescriptor>> = self.sub_classes(name)?.into();

        while let Some(class) = queue.pop_front() {
            if seen.insert(class.name().clone()) {
                queue.extend(self.sub_classes(class.name())?);
                result.push(class);
            }
        }
        Ok(result)
    }

    fn members(&self, index: Arc<BackRefIndex>) -> Vec<Arc<ClassDescriptor>> {
        index
            .snapshot()
            .iter()
            .filter_map(|n| self.classes.get(n).cloned())
            .collect()
    }
}

/// Collects definitions and bootstraps a [`MetamodelRegistry`].
///
/// Definitions may be added in any order.
#[derive(Debug, Clone)]
pub struct MetamodelBuilder {
    repository_id: DmaId,
    classes: Vec<ClassDefinition>,
    properties: Vec<PropertyDefinition>,
    root_class: Option<QualifiedName>,
}

impl MetamodelBuilder {
    pub fn new(repository_id: DmaId) -> Self {
        Self {
            repository_id,
            classes: Vec::new(),
            properties: Vec::new(),
            root_class: None,
        }
    }

    /// Add the built-in `opendma` vocabulary with `Object` as root.
    pub fn with_builtin(mut self) -> Self {
        self.classes.extend(builtin::classes());
        self.properties.extend(builtin::properties());
        self.root_class = Some(builtin::qname(builtin::ROOT_CLASS));
        self
    }

    pub fn class(mut self, def: ClassDefinition) -> Self {
        self.classes.push(def);
        self
    }

    pub fn property(mut self, def: PropertyDefinition) -> Self {
        self.properties.push(def);
        self
    }

    pub fn classes(mut self, defs: impl IntoIterator<Item = ClassDefinition>) -> Self {
        self.classes.extend(defs);
        self
    }

    pub fn properties(mut self, defs: impl IntoIterator<Item = PropertyDefinition>) -> Self {
        self.properties.extend(defs);
        self
    }

    /// Override the root class. Defaults to the first class without a
    /// super-class.
    pub fn root_class(mut self, name: QualifiedName) -> Self {
        self.root_class = Some(name);
        self
    }

    /// Run the bootstrap phases.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` for a property defined twice or an invalid
    ///   property definition
    /// - `InvalidClassDefinition` for a class defined twice or breaking a
    ///   structural rule
    /// - `ObjectNotFound` for an unknown super-class, aspect, declared
    ///   property, reference target or root class
    /// - `CyclicHierarchy` if super-class and aspect edges form a cycle
    /// - `DuplicatePropertyDeclaration` for a shadowed property name
    pub fn build(self) -> Result<MetamodelRegistry, DmaError> {
        info!(
            repository = %self.repository_id,
            classes = self.classes.len(),
            properties = self.properties.len(),
            "bootstrapping metamodel"
        );

        // Phase 1: declare properties.
        let mut properties = HashMap::with_capacity(self.properties.len());
        let mut property_order = Vec::with_capacity(self.properties.len());
        for def in self.properties {
            let name = def.name.clone();
            if properties.contains_key(&name) {
                return Err(DmaError::InvalidArgument(format!(
                    "property {name} defined twice"
                )));
            }
            properties.insert(name.clone(), Arc::new(PropertyDescriptor::new(def)?));
            property_order.push(name);
        }
        debug!(count = properties.len(), "declared properties");

        // Phase 2: define classes bottom-up.
        let mut definitions: HashMap<QualifiedName, &ClassDefinition> = HashMap::new();
        let mut class_order = Vec::with_capacity(self.classes.len());
        let mut graph = ClassGraph::new();
        for def in &self.classes {
            if definitions.insert(def.name.clone(), def).is_some() {
                return Err(DmaError::InvalidClassDefinition {
                    class: def.name.to_string(),
                    reason: "defined twice".into(),
                });
            }
            class_order.push(def.name.clone());
            graph.add_class(def.name.clone());
            if let Some(parent) = &def.super_class {
                graph.add_super(def.name.clone(), parent.clone());
            }
            for aspect in &def.aspects {
                graph.add_aspect(def.name.clone(), aspect.clone());
            }
        }
        for def in &self.classes {
            let dependencies = def.super_class.iter().chain(def.aspects.iter());
            if let Some(missing) = dependencies.into_iter().find(|d| !definitions.contains_key(*d)) {
                return Err(DmaError::ObjectNotFound(format!(
                    "class {missing} required by {}",
                    def.name
                )));
            }
        }

        let mut classes: HashMap<QualifiedName, Arc<ClassDescriptor>> =
            HashMap::with_capacity(definitions.len());
        for name in graph.construction_order()? {
            let def = definitions
                .get(&name)
                .ok_or_else(|| DmaError::ObjectNotFound(format!("class {name}")))?;
            let descriptor = ClassDescriptor::build(
                def,
                |n| {
                    classes
                        .get(n)
                        .cloned()
                        .ok_or_else(|| DmaError::ObjectNotFound(format!("class {n}")))
                },
                |n| {
                    properties.get(n).cloned().ok_or_else(|| {
                        DmaError::ObjectNotFound(format!("property {n} declared by {name}"))
                    })
                },
            )?;
            debug!(
                class = %name,
                effective = descriptor.effective_properties().len(),
                "defined class"
            );
            classes.insert(name, Arc::new(descriptor));
        }

        let root_class = match self.root_class {
            Some(root) if !classes.contains_key(&root) => {
                return Err(DmaError::ObjectNotFound(format!("root class {root}")));
            }
            Some(root) => Some(root),
            None => self
                .classes
                .iter()
                .find(|d| !d.is_aspect && d.super_class.is_none())
                .map(|d| d.name.clone()),
        };

        let registry = MetamodelRegistry {
            repository_id: self.repository_id,
            classes,
            class_order,
            properties,
            property_order,
            root_class,
            root_aspects: self
                .classes
                .iter()
                .filter(|d| d.is_aspect)
                .map(|d| d.name.clone())
                .collect(),
            sub_classes: BackRefIndices::default(),
            aspect_usages: BackRefIndices::default(),
        };

        // Phase 3: patch back-references.
        for def in &self.classes {
            if let Some(parent) = &def.super_class {
                registry.register_sub_class(parent, &def.name)?;
            }
            for aspect in &def.aspects {
                registry.register_aspect_usage(aspect, &def.name)?;
            }
        }
        debug!("patched back-references");

        // Phase 4: bind reference properties.
        for property in registry.properties() {
            if let Some(target) = property.reference_class_name() {
                let class = registry.classes.get(target).ok_or_else(|| {
                    DmaError::ObjectNotFound(format!(
                        "reference class {target} of property {}",
                        property.name()
                    ))
                })?;
                property.bind_reference_class(class);
            }
        }
        debug!("bound reference properties");

        // Phase 5: assign identifiers.
        for class in registry.classes.values() {
            class.assign_identity(&registry.repository_id);
        }
        for property in registry.properties.values() {
            property.assign_identity(&registry.repository_id);
        }

        info!(
            repository = %registry.repository_id,
            classes = registry.class_count(),
            properties = registry.property_count(),
            "metamodel ready"
        );
        Ok(registry)
    }
}
