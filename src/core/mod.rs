//! core
//!
//! Core domain types and the metamodel engine.
//!
//! # Modules
//!
//! - [`types`] - Strong types: QualifiedName, DmaId, Guid, DataType
//! - [`value`] - Typed property values
//! - [`schema`] - Property and class descriptors
//! - [`graph`] - Class hierarchy graph and construction order
//! - [`registry`] - Bootstrap and lookup of the whole metamodel
//! - [`instance`] - Property instances bound to descriptors
//! - [`object`] - Repository objects and their property sets
//! - [`adaptor`] - Backing-store abstraction and an in-memory store
//! - [`verify`] - Structural verification of a bootstrapped metamodel
//! - [`config`] - Configuration schema and loading
//! - [`error`] - The engine's error type
//!
//! # Design Principles
//!
//! - Strong typing prevents invalid states at compile time
//! - Schemas are strict and self-describing
//! - All verification is deterministic

pub mod adaptor;
pub mod config;
pub mod error;
pub mod graph;
pub mod instance;
pub mod object;
pub mod registry;
pub mod schema;
pub mod types;
pub mod value;
pub mod verify;
