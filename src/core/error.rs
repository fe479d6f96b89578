//! core::error
//!
//! The error taxonomy shared by every metamodel operation.
//!
//! # Kinds
//!
//! - `InvalidArgument` - malformed name, id or value; a caller bug
//! - `ObjectNotFound` - unknown class/property, or an unresolvable reference
//! - `InvalidDataType` - value kind does not match the descriptor
//! - `AccessDenied` - write to a read-only property
//! - `CyclicHierarchy`, `DuplicatePropertyDeclaration`,
//!   `InvalidClassDefinition` - fatal bootstrap errors
//!
//! Every accessor either returns a value or fails with exactly one of
//! these kinds. There is no catch-all variant.

use thiserror::Error;

/// Errors raised by the metamodel core.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DmaError {
    /// Malformed qualified name, identifier or argument value.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Unknown class or property name, or a reference target that cannot
    /// be resolved yet.
    #[error("object not found: {0}")]
    ObjectNotFound(String),

    /// A value or accessor does not match the declared data type and
    /// cardinality.
    #[error("invalid data type: {0}")]
    InvalidDataType(String),

    /// Write to a read-only property.
    #[error("access denied: {0}")]
    AccessDenied(String),

    /// The super-class chain contains a cycle.
    #[error("cyclic class hierarchy at {0}")]
    CyclicHierarchy(String),

    /// A property is declared on a class and also inherited or mixed in.
    #[error("duplicate property declaration '{property}' in class {class}")]
    DuplicatePropertyDeclaration { class: String, property: String },

    /// A class or aspect definition breaks a structural rule.
    #[error("invalid class definition {class}: {reason}")]
    InvalidClassDefinition { class: String, reason: String },
}

impl DmaError {
    /// Whether this error signals a broken schema rather than a runtime
    /// condition.
    pub fn is_bootstrap_error(&self) -> bool {
        matches!(
            self,
            DmaError::CyclicHierarchy(_)
                | DmaError::DuplicatePropertyDeclaration { .. }
                | DmaError::InvalidClassDefinition { .. }
        )
    }
}

/// Result alias for metamodel operations.
pub type DmaResult<T> = Result<T, DmaError>;
