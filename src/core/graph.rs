//! core::graph
//!
//! Name-keyed class dependency graph.
//!
//! # Architecture
//!
//! The class graph is built from class definitions before any descriptor
//! exists, so structural problems surface before construction:
//! - Nodes are class and aspect names
//! - Super edges point from a class to its single super-class
//! - Aspect edges point from a class to each aspect it includes
//!
//! # Invariants
//!
//! - The graph must be acyclic over super and aspect edges together
//! - Each node has at most one super-class
//! - Traversals are deterministic: they follow insertion order

use std::collections::{HashMap, HashSet};

use super::error::DmaError;
use super::types::QualifiedName;

/// Dependency graph over class names.
#[derive(Debug, Default, Clone)]
pub struct ClassGraph {
    /// Nodes in insertion order
    nodes: Vec<QualifiedName>,
    /// Super-class pointer for each class that has one
    parents: HashMap<QualifiedName, QualifiedName>,
    /// Included aspects per class, in declaration order
    aspects: HashMap<QualifiedName, Vec<QualifiedName>>,
}

impl ClassGraph {
    /// Create an empty class graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node. Adding an existing node is a no-op.
    pub fn add_class(&mut self, name: QualifiedName) {
        if !self.nodes.contains(&name) {
            self.nodes.push(name);
        }
    }

    /// Add a super-class relationship, replacing any earlier super-class
    /// of `child`.
    pub fn add_super(&mut self, child: QualifiedName, parent: QualifiedName) {
        self.add_class(child.clone());
        self.add_class(parent.clone());
        self.parents.insert(child, parent);
    }

    /// Add an included aspect.
    pub fn add_aspect(&mut self, class: QualifiedName, aspect: QualifiedName) {
        self.add_class(class.clone());
        self.add_class(aspect.clone());
        let list = self.aspects.entry(class).or_default();
        if !list.contains(&aspect) {
            list.push(aspect);
        }
    }

    /// Get the super-class of a class.
    pub fn parent(&self, name: &QualifiedName) -> Option<&QualifiedName> {
        self.parents.get(name)
    }

    /// Get the aspects a class includes.
    pub fn aspects(&self, name: &QualifiedName) -> &[QualifiedName] {
        self.aspects.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Check if the graph contains cycles over super and aspect edges.
    ///
    /// Returns `Some(name)` for a class that lies on a cycle.
    pub fn find_cycle(&self) -> Option<QualifiedName> {
        let mut visited = HashSet::new();
        let mut path = Vec::new();

        for name in &self.nodes {
            if let Some(found) = self.cycle_from(name, &mut visited, &mut path) {
                return Some(found);
            }
        }
        None
    }

    fn cycle_from(
        &self,
        name: &QualifiedName,
        visited: &mut HashSet<QualifiedName>,
        path: &mut Vec<QualifiedName>,
    ) -> Option<QualifiedName> {
        if path.contains(name) {
            return Some(name.clone());
        }
        if visited.contains(name) {
            return None;
        }

        visited.insert(name.clone());
        path.push(name.clone());

        for dependency in self.dependencies(name) {
            if let Some(found) = self.cycle_from(dependency, visited, path) {
                return Some(found);
            }
        }

        path.pop();
        None
    }

    /// Super-class first, then aspects in declaration order.
    fn dependencies<'a>(
        &'a self,
        name: &QualifiedName,
    ) -> impl Iterator<Item = &'a QualifiedName> + 'a {
        self.parent(name).into_iter().chain(self.aspects(name).iter())
    }

    /// Compute a bottom-up construction order.
    ///
    /// Every class comes after its super-class and all of its aspects.
    /// Among classes whose dependencies are satisfied, insertion order
    /// wins, so the result is deterministic.
    ///
    /// # Errors
    ///
    /// Returns `DmaError::CyclicHierarchy` naming a class on a cycle.
    pub fn construction_order(&self) -> Result<Vec<QualifiedName>, DmaError> {
        if let Some(name) = self.find_cycle() {
            return Err(DmaError::CyclicHierarchy(name.to_string()));
        }

        let mut placed: HashSet<&QualifiedName> = HashSet::new();
        let mut order = Vec::with_capacity(self.nodes.len());

        while order.len() < self.nodes.len() {
            let before = order.len();
            for name in &self.nodes {
                if placed.contains(name) {
                    continue;
                }
                if self.dependencies(name).all(|dep| placed.contains(dep)) {
                    placed.insert(name);
                    order.push(name.clone());
                }
            }
            if order.len() == before {
                let stuck = self
                    .nodes
                    .iter()
                    .find(|n| !placed.contains(n))
                    .map(ToString::to_string)
                    .unwrap_or_default();
                return Err(DmaError::CyclicHierarchy(stuck));
            }
        }

        Ok(order)
    }
}
