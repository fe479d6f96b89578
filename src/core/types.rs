//! core::types
//!
//! Strong types for core metamodel concepts.
//!
//! # Types
//!
//! - [`QualifiedName`] - Validated (namespace, name) pair
//! - [`DmaId`] - Validated object identifier
//! - [`Guid`] - Globally unique (object id, repository id) pair
//! - [`DataType`] - The thirteen property data types
//! - [`DescriptorKind`] - What a schema descriptor describes
//!
//! # Validation
//!
//! These types enforce validity at construction time. A blank namespace,
//! name or identifier cannot be represented.
//!
//! # Examples
//!
//! ```
//! use odma::core::types::{DmaId, QualifiedName};
//!
//! let name = QualifiedName::new("opendma", "Document").unwrap();
//! assert_eq!(name.to_string(), "opendma:Document");
//!
//! assert!(QualifiedName::new("", "Document").is_err());
//! assert!(DmaId::new("   ").is_err());
//! ```

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::error::DmaError;

/// A validated two-part name identifying a class, aspect or property.
///
/// Equality and hashing are structural over both parts.
///
/// # Example
///
/// ```
/// use odma::core::types::QualifiedName;
///
/// let name: QualifiedName = "opendma:Object".parse().unwrap();
/// assert_eq!(name.namespace(), "opendma");
/// assert_eq!(name.name(), "Object");
/// assert_eq!(name, QualifiedName::new("opendma", "Object").unwrap());
///
/// assert!("no-separator".parse::<QualifiedName>().is_err());
/// assert!("opendma: ".parse::<QualifiedName>().is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "RawQualifiedName", into = "RawQualifiedName")]
pub struct QualifiedName {
    namespace: String,
    name: String,
}

#[derive(Serialize, Deserialize)]
struct RawQualifiedName {
    namespace: String,
    name: String,
}

impl QualifiedName {
    /// Create a new validated qualified name.
    ///
    /// # Errors
    ///
    /// Returns `DmaError::InvalidArgument` if either part is blank.
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Result<Self, DmaError> {
        let namespace = namespace.into();
        let name = name.into();
        if namespace.trim().is_empty() {
            return Err(DmaError::InvalidArgument(
                "qualified name namespace cannot be blank".into(),
            ));
        }
        if name.trim().is_empty() {
            return Err(DmaError::InvalidArgument(
                "qualified name local name cannot be blank".into(),
            ));
        }
        Ok(Self { namespace, name })
    }

    /// Build a name from literal parts known to be non-blank.
    pub(crate) fn from_static(namespace: &'static str, name: &'static str) -> Self {
        debug_assert!(!namespace.trim().is_empty() && !name.trim().is_empty());
        Self {
            namespace: namespace.to_string(),
            name: name.to_string(),
        }
    }

    /// The namespace part.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// The local name part.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl FromStr for QualifiedName {
    type Err = DmaError;

    /// Parse `namespace:name`, splitting on the last `:` so namespaces
    /// may themselves contain colons.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (namespace, name) = s.rsplit_once(':').ok_or_else(|| {
            DmaError::InvalidArgument(format!("expected 'namespace:name', got '{s}'"))
        })?;
        Self::new(namespace, name)
    }
}

impl TryFrom<RawQualifiedName> for QualifiedName {
    type Error = DmaError;

    fn try_from(raw: RawQualifiedName) -> Result<Self, Self::Error> {
        Self::new(raw.namespace, raw.name)
    }
}

impl From<QualifiedName> for RawQualifiedName {
    fn from(qname: QualifiedName) -> Self {
        Self {
            namespace: qname.namespace,
            name: qname.name,
        }
    }
}

impl std::fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.namespace, self.name)
    }
}

/// What a schema descriptor describes. Part of derived identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DescriptorKind {
    Class,
    Aspect,
    Property,
}

impl DescriptorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DescriptorKind::Class => "class",
            DescriptorKind::Aspect => "aspect",
            DescriptorKind::Property => "property",
        }
    }
}

/// A validated object identifier, unique within one repository.
///
/// # Example
///
/// ```
/// use odma::core::types::{DescriptorKind, DmaId, QualifiedName};
///
/// let qname = QualifiedName::new("opendma", "Document").unwrap();
/// let id = DmaId::derive(DescriptorKind::Class, &qname);
/// assert_eq!(id.as_str(), "class:opendma:Document");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DmaId(String);

impl DmaId {
    /// Create a new validated identifier.
    ///
    /// # Errors
    ///
    /// Returns `DmaError::InvalidArgument` if the identifier is blank.
    pub fn new(id: impl Into<String>) -> Result<Self, DmaError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(DmaError::InvalidArgument("id cannot be blank".into()));
        }
        Ok(Self(id))
    }

    /// Derive the deterministic identifier of a schema descriptor.
    ///
    /// The same (kind, name) always yields the same id, so bootstrap can
    /// be repeated without side effects.
    pub fn derive(kind: DescriptorKind, qname: &QualifiedName) -> Self {
        Self(format!("{}:{}", kind.as_str(), qname))
    }

    /// Generate a fresh random identifier for a new object.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Get the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for DmaId {
    type Error = DmaError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<DmaId> for String {
    fn from(id: DmaId) -> Self {
        id.0
    }
}

impl AsRef<str> for DmaId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DmaId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A globally unique identifier: an object id scoped by its repository id.
///
/// # Example
///
/// ```
/// use odma::core::types::{DmaId, Guid};
///
/// let repo = DmaId::new("sample").unwrap();
/// let a = Guid::new(DmaId::new("doc-1").unwrap(), repo.clone());
/// let b = Guid::new(DmaId::new("doc-1").unwrap(), repo);
///
/// // Same parts produce the same UUID
/// assert_eq!(a.to_uuid(), b.to_uuid());
/// assert_eq!(a.to_string(), "doc-1@sample");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Guid {
    object_id: DmaId,
    repository_id: DmaId,
}

impl Guid {
    pub fn new(object_id: DmaId, repository_id: DmaId) -> Self {
        Self {
            object_id,
            repository_id,
        }
    }

    pub fn object_id(&self) -> &DmaId {
        &self.object_id
    }

    pub fn repository_id(&self) -> &DmaId {
        &self.repository_id
    }

    /// A deterministic UUID over both parts.
    ///
    /// The first 16 bytes of `SHA-256(repository_id \0 object_id)`.
    pub fn to_uuid(&self) -> uuid::Uuid {
        let mut hasher = Sha256::new();
        hasher.update(self.repository_id.as_str().as_bytes());
        hasher.update(b"\0");
        hasher.update(self.object_id.as_str().as_bytes());
        let digest = hasher.finalize();

        let mut bytes = [0u8; 16];
        bytes.copy_from_slice(&digest[..16]);
        uuid::Uuid::from_bytes(bytes)
    }

    /// Hex digest of the UUID bytes, used as a compact display key.
    pub fn fingerprint(&self) -> String {
        hex::encode(self.to_uuid().as_bytes())
    }
}

impl std::fmt::Display for Guid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.object_id, self.repository_id)
    }
}

/// The declared data type of a property.
///
/// Numeric codes are stable and used when data types are exchanged as
/// integer property values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    String,
    Integer,
    Short,
    Long,
    Float,
    Double,
    Boolean,
    DateTime,
    Binary,
    Reference,
    Content,
    Id,
    Guid,
}

impl DataType {
    /// Every data type, in code order.
    pub const ALL: [DataType; 13] = [
        DataType::String,
        DataType::Integer,
        DataType::Short,
        DataType::Long,
        DataType::Float,
        DataType::Double,
        DataType::Boolean,
        DataType::DateTime,
        DataType::Binary,
        DataType::Reference,
        DataType::Content,
        DataType::Id,
        DataType::Guid,
    ];

    pub fn code(self) -> i32 {
        match self {
            DataType::String => 1,
            DataType::Integer => 2,
            DataType::Short => 3,
            DataType::Long => 4,
            DataType::Float => 5,
            DataType::Double => 6,
            DataType::Boolean => 7,
            DataType::DateTime => 8,
            DataType::Binary => 9,
            DataType::Reference => 10,
            DataType::Content => 11,
            DataType::Id => 100,
            DataType::Guid => 101,
        }
    }

    /// Look up a data type by its numeric code.
    ///
    /// # Errors
    ///
    /// Returns `DmaError::InvalidArgument` for an unknown code.
    pub fn from_code(code: i32) -> Result<Self, DmaError> {
        Self::ALL
            .into_iter()
            .find(|dt| dt.code() == code)
            .ok_or_else(|| DmaError::InvalidArgument(format!("unknown data type code {code}")))
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DataType::String => "String",
            DataType::Integer => "Integer",
            DataType::Short => "Short",
            DataType::Long => "Long",
            DataType::Float => "Float",
            DataType::Double => "Double",
            DataType::Boolean => "Boolean",
            DataType::DateTime => "DateTime",
            DataType::Binary => "Binary",
            DataType::Reference => "Reference",
            DataType::Content => "Content",
            DataType::Id => "Id",
            DataType::Guid => "Guid",
        }
    }
}

impl FromStr for DataType {
    type Err = DmaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|dt| dt.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| DmaError::InvalidArgument(format!("unknown data type '{s}'")))
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
