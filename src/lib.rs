//! odma - A reflective metamodel engine for document management repositories
//!
//! Every object in a repository is an instance of a class; every class is
//! described by a [`ClassDescriptor`](core::schema::ClassDescriptor) that is
//! itself an object of class `opendma:Class`. The metamodel is therefore
//! self-describing and bootstraps from a fixed built-in vocabulary.
//!
//! # Architecture
//!
//! - [`core`] - Names, values, descriptors, the registry, objects and adaptors
//! - [`cli`] - Command-line inspection of a configured metamodel
//! - [`ui`] - Output formatting
//!
//! # Invariants
//!
//! 1. Descriptors are immutable after bootstrap, except for append-only
//!    back-reference indices
//! 2. A property value always matches its descriptor's data type and cardinality
//! 3. Hierarchy walks terminate: the class graph is verified acyclic before
//!    any descriptor is built

pub mod cli;
pub mod core;
pub mod ui;
