//! core::value
//!
//! The closed set of property values.
//!
//! # Design
//!
//! [`PropertyValue`] is a tagged union: one variant per data type for
//! single values, one per data type for multi-values, plus
//! [`PropertyValue::ReferenceId`] for a reference known only by the id of
//! its target. Consumers match exhaustively instead of downcasting.
//!
//! A value never converts into another kind. An `Integer` is not a `Long`.

use chrono::{DateTime, Utc};

use super::object::ObjectRef;
use super::types::{DataType, DmaId, Guid};

/// An in-memory content element.
///
/// Streaming content I/O belongs to the adaptor; the core only carries
/// bytes already in hand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Content {
    data: Vec<u8>,
    content_type: Option<String>,
}

impl Content {
    pub fn new(data: impl Into<Vec<u8>>, content_type: Option<String>) -> Self {
        Self {
            data: data.into(),
            content_type,
        }
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// A reader over the content bytes.
    pub fn reader(&self) -> std::io::Cursor<&[u8]> {
        std::io::Cursor::new(&self.data)
    }
}

/// A typed property value, single or multi-valued.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    String(String),
    Integer(i32),
    Short(i16),
    Long(i64),
    Float(f32),
    Double(f64),
    Boolean(bool),
    DateTime(DateTime<Utc>),
    Binary(Vec<u8>),
    Reference(ObjectRef),
    /// A reference whose target is known only by id.
    ReferenceId(DmaId),
    Content(Content),
    Id(DmaId),
    Guid(Guid),

    StringList(Vec<String>),
    IntegerList(Vec<i32>),
    ShortList(Vec<i16>),
    LongList(Vec<i64>),
    FloatList(Vec<f32>),
    DoubleList(Vec<f64>),
    BooleanList(Vec<bool>),
    DateTimeList(Vec<DateTime<Utc>>),
    BinaryList(Vec<Vec<u8>>),
    ReferenceList(Vec<ObjectRef>),
    ContentList(Vec<Content>),
    IdList(Vec<DmaId>),
    GuidList(Vec<Guid>),
}

impl PropertyValue {
    /// The data type this value carries.
    pub fn data_type(&self) -> DataType {
        use PropertyValue as V;
        match self {
            V::String(_) | V::StringList(_) => DataType::String,
            V::Integer(_) | V::IntegerList(_) => DataType::Integer,
            V::Short(_) | V::ShortList(_) => DataType::Short,
            V::Long(_) | V::LongList(_) => DataType::Long,
            V::Float(_) | V::FloatList(_) => DataType::Float,
            V::Double(_) | V::DoubleList(_) => DataType::Double,
            V::Boolean(_) | V::BooleanList(_) => DataType::Boolean,
            V::DateTime(_) | V::DateTimeList(_) => DataType::DateTime,
            V::Binary(_) | V::BinaryList(_) => DataType::Binary,
            V::Reference(_) | V::ReferenceId(_) | V::ReferenceList(_) => DataType::Reference,
            V::Content(_) | V::ContentList(_) => DataType::Content,
            V::Id(_) | V::IdList(_) => DataType::Id,
            V::Guid(_) | V::GuidList(_) => DataType::Guid,
        }
    }

    /// Whether this is a multi-valued variant.
    pub fn is_multi_value(&self) -> bool {
        use PropertyValue as V;
        matches!(
            self,
            V::StringList(_)
                | V::IntegerList(_)
                | V::ShortList(_)
                | V::LongList(_)
                | V::FloatList(_)
                | V::DoubleList(_)
                | V::BooleanList(_)
                | V::DateTimeList(_)
                | V::BinaryList(_)
                | V::ReferenceList(_)
                | V::ContentList(_)
                | V::IdList(_)
                | V::GuidList(_)
        )
    }

    /// Whether the value matches a declared data type and cardinality
    /// exactly.
    pub fn matches(&self, data_type: DataType, multi_value: bool) -> bool {
        self.data_type() == data_type && self.is_multi_value() == multi_value
    }

    /// Short kind label for error messages, e.g. `Long` or `String[]`.
    pub fn kind(&self) -> String {
        match (self, self.is_multi_value()) {
            (PropertyValue::ReferenceId(_), _) => "ReferenceId".to_string(),
            (_, true) => format!("{}[]", self.data_type()),
            (_, false) => self.data_type().to_string(),
        }
    }

    /// The empty multi-value of a data type.
    ///
    /// Multi-valued properties are never null; they start empty.
    pub fn empty_list(data_type: DataType) -> Self {
        use PropertyValue as V;
        match data_type {
            DataType::String => V::StringList(Vec::new()),
            DataType::Integer => V::IntegerList(Vec::new()),
            DataType::Short => V::ShortList(Vec::new()),
            DataType::Long => V::LongList(Vec::new()),
            DataType::Float => V::FloatList(Vec::new()),
            DataType::Double => V::DoubleList(Vec::new()),
            DataType::Boolean => V::BooleanList(Vec::new()),
            DataType::DateTime => V::DateTimeList(Vec::new()),
            DataType::Binary => V::BinaryList(Vec::new()),
            DataType::Reference => V::ReferenceList(Vec::new()),
            DataType::Content => V::ContentList(Vec::new()),
            DataType::Id => V::IdList(Vec::new()),
            DataType::Guid => V::GuidList(Vec::new()),
        }
    }
}

impl std::fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use PropertyValue as V;

        fn list<T: std::fmt::Display>(
            f: &mut std::fmt::Formatter<'_>,
            items: &[T],
        ) -> std::fmt::Result {
            f.write_str("[")?;
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{item}")?;
            }
            f.write_str("]")
        }

        match self {
            V::String(v) => write!(f, "{v:?}"),
            V::Integer(v) => write!(f, "{v}"),
            V::Short(v) => write!(f, "{v}"),
            V::Long(v) => write!(f, "{v}"),
            V::Float(v) => write!(f, "{v}"),
            V::Double(v) => write!(f, "{v}"),
            V::Boolean(v) => write!(f, "{v}"),
            V::DateTime(v) => write!(f, "{}", v.to_rfc3339()),
            V::Binary(v) => write!(f, "<{} bytes>", v.len()),
            V::Reference(obj) => write!(f, "-> {}", obj.id()),
            V::ReferenceId(id) => write!(f, "-> {id} (unresolved)"),
            V::Content(c) => write!(f, "<content {} bytes>", c.size()),
            V::Id(v) => write!(f, "{v}"),
            V::Guid(v) => write!(f, "{v}"),
            V::StringList(v) => list(f, v),
            V::IntegerList(v) => list(f, v),
            V::ShortList(v) => list(f, v),
            V::LongList(v) => list(f, v),
            V::FloatList(v) => list(f, v),
            V::DoubleList(v) => list(f, v),
            V::BooleanList(v) => list(f, v),
            V::DateTimeList(v) => {
                let rendered: Vec<String> = v.iter().map(|d| d.to_rfc3339()).collect();
                list(f, &rendered)
            }
            V::BinaryList(v) => write!(f, "<{} binaries>", v.len()),
            V::ReferenceList(v) => {
                let ids: Vec<&DmaId> = v.iter().map(|o| o.id()).collect();
                list(f, &ids)
            }
            V::ContentList(v) => write!(f, "<{} content elements>", v.len()),
            V::IdList(v) => list(f, v),
            V::GuidList(v) => list(f, v),
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(v: &str) -> Self {
        PropertyValue::String(v.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(v: String) -> Self {
        PropertyValue::String(v)
    }
}

impl From<i32> for PropertyValue {
    fn from(v: i32) -> Self {
        PropertyValue::Integer(v)
    }
}

impl From<i16> for PropertyValue {
    fn from(v: i16) -> Self {
        PropertyValue::Short(v)
    }
}

impl From<i64> for PropertyValue {
    fn from(v: i64) -> Self {
        PropertyValue::Long(v)
    }
}

impl From<f32> for PropertyValue {
    fn from(v: f32) -> Self {
        PropertyValue::Float(v)
    }
}

impl From<f64> for PropertyValue {
    fn from(v: f64) -> Self {
        PropertyValue::Double(v)
    }
}

impl From<bool> for PropertyValue {
    fn from(v: bool) -> Self {
        PropertyValue::Boolean(v)
    }
}

impl From<DateTime<Utc>> for PropertyValue {
    fn from(v: DateTime<Utc>) -> Self {
        PropertyValue::DateTime(v)
    }
}

impl From<Content> for PropertyValue {
    fn from(v: Content) -> Self {
        PropertyValue::Content(v)
    }
}

impl From<Guid> for PropertyValue {
    fn from(v: Guid) -> Self {
        PropertyValue::Guid(v)
    }
}

impl From<ObjectRef> for PropertyValue {
    fn from(v: ObjectRef) -> Self {
        PropertyValue::Reference(v)
    }
}

impl From<Vec<String>> for PropertyValue {
    fn from(v: Vec<String>) -> Self {
        PropertyValue::StringList(v)
    }
}
