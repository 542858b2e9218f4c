use std::borrow::Cow;
use std::fmt;

use chrono::{DateTime, FixedOffset};

use super::error::MappingError;
use super::kind::{classify, lower_first, singularize, to_camel, FieldKind, TypeDecl};
use crate::xml::{Document, NodeId, NodeRef};

/// Custom renderer: fills the pre-created target element for a record.
pub type RenderFn = fn(&Record, &mut Document, NodeId) -> Result<(), MappingError>;

/// Custom parser: builds a record straight from an element.
pub type ParseFn = fn(NodeRef<'_>) -> Result<Record, MappingError>;

/// Produces a field's declared default value.
pub type DefaultFn = fn() -> Value;

// ============================================================================
// Descriptors
// ============================================================================

/// Static per-type descriptor consumed by the mapping engine.
#[derive(Clone, Copy)]
pub struct RecordSchema {
    pub type_name: &'static str,
    /// Explicit element name; derived from `type_name` when absent.
    pub tag_name: Option<&'static str>,
    /// Fields in declaration order.
    pub fields: &'static [FieldSchema],
    /// Replaces generic rendering entirely when present.
    pub render: Option<RenderFn>,
    /// Replaces generic parsing entirely when present.
    pub parse: Option<ParseFn>,
}

impl RecordSchema {
    pub const fn new(type_name: &'static str, fields: &'static [FieldSchema]) -> Self {
        Self {
            type_name,
            tag_name: None,
            fields,
            render: None,
            parse: None,
        }
    }

    pub const fn with_tag_name(self, tag_name: &'static str) -> Self {
        Self {
            tag_name: Some(tag_name),
            ..self
        }
    }

    pub const fn with_render(self, render: RenderFn) -> Self {
        Self {
            render: Some(render),
            ..self
        }
    }

    pub const fn with_parse(self, parse: ParseFn) -> Self {
        Self {
            parse: Some(parse),
            ..self
        }
    }

    /// Element name: the explicit tag name, or the type name with its first
    /// letter lower-cased.
    pub fn tag_name(&self) -> Cow<'static, str> {
        match self.tag_name {
            Some(tag) => Cow::Borrowed(tag),
            None => Cow::Owned(lower_first(self.type_name)),
        }
    }

    pub fn field(&self, name: &str) -> Option<&'static FieldSchema> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Names of the child elements the generic parser consumes for this
    /// record: each text element, nested object and list item tag.
    pub fn child_tags(&self) -> Vec<Cow<'static, str>> {
        self.fields
            .iter()
            .filter_map(|field| match classify(&field.decl) {
                FieldKind::Attribute | FieldKind::EmbeddedText => None,
                FieldKind::ElementList => Some(field.item_tag()),
                FieldKind::TextElement | FieldKind::NestedObject => Some(field.xml_name()),
            })
            .collect()
    }
}

impl fmt::Debug for RecordSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordSchema")
            .field("type_name", &self.type_name)
            .field("tag_name", &self.tag_name())
            .field("fields", &self.fields.len())
            .field("custom_render", &self.render.is_some())
            .field("custom_parse", &self.parse.is_some())
            .finish()
    }
}

/// Descriptor of one declared field.
#[derive(Debug, Clone, Copy)]
pub struct FieldSchema {
    /// Field name in snake_case.
    pub name: &'static str,
    pub decl: TypeDecl,
    pub default: Option<DefaultFn>,
    /// Explicit XML name; camelCase of `name` when absent.
    pub xml_name: Option<&'static str>,
    /// Explicit per-item tag for element lists.
    pub item_tag: Option<&'static str>,
}

impl FieldSchema {
    pub const fn new(name: &'static str, decl: TypeDecl) -> Self {
        Self {
            name,
            decl,
            default: None,
            xml_name: None,
            item_tag: None,
        }
    }

    /// An `Optional` field whose declared default is [`Value::Null`].
    pub const fn optional(name: &'static str, inner: &'static TypeDecl) -> Self {
        Self::new(name, TypeDecl::Optional(inner)).with_default(null_value)
    }

    pub const fn with_default(self, default: DefaultFn) -> Self {
        Self {
            default: Some(default),
            ..self
        }
    }

    pub const fn with_xml_name(self, xml_name: &'static str) -> Self {
        Self {
            xml_name: Some(xml_name),
            ..self
        }
    }

    pub const fn with_item_tag(self, item_tag: &'static str) -> Self {
        Self {
            item_tag: Some(item_tag),
            ..self
        }
    }

    pub fn kind(&self) -> FieldKind {
        classify(&self.decl)
    }

    pub fn xml_name(&self) -> Cow<'static, str> {
        match self.xml_name {
            Some(name) => Cow::Borrowed(name),
            None => Cow::Owned(to_camel(self.name)),
        }
    }

    pub fn item_tag(&self) -> Cow<'static, str> {
        match self.item_tag {
            Some(tag) => Cow::Borrowed(tag),
            None => Cow::Owned(singularize(&self.xml_name()).into_owned()),
        }
    }

    pub fn default_value(&self) -> Option<Value> {
        self.default.map(|f| f())
    }

    /// Whether `value` equals the declared default. Such fields are omitted
    /// on render, so "explicitly set to the default" and "absent" look the
    /// same in XML.
    pub fn is_defaulted(&self, value: &Value) -> bool {
        self.default_value().is_some_and(|d| d == *value)
    }
}

/// Default for optional fields.
pub fn null_value() -> Value {
    Value::Null
}

/// Default for list fields that may legitimately be empty.
pub fn empty_list() -> Value {
    Value::List(Vec::new())
}

// ============================================================================
// Dynamic values
// ============================================================================

/// A field value as seen by the mapping engine.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Int(i64),
    Str(String),
    DateTime(DateTime<FixedOffset>),
    Bool(bool),
    Float(f64),
    List(Vec<Value>),
    Record(Record),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Int(_) => "int",
            Value::Str(_) => "str",
            Value::DateTime(_) => "datetime",
            Value::Bool(_) => "bool",
            Value::Float(_) => "float",
            Value::List(_) => "list",
            Value::Record(_) => "record",
        }
    }
}

/// Field values of one record instance, in the order they were set.
#[derive(Clone)]
pub struct Record {
    schema: &'static RecordSchema,
    values: Vec<(&'static str, Value)>,
}

impl Record {
    pub fn new(schema: &'static RecordSchema) -> Self {
        Self {
            schema,
            values: Vec::with_capacity(schema.fields.len()),
        }
    }

    pub fn schema(&self) -> &'static RecordSchema {
        self.schema
    }

    pub fn set(&mut self, name: &'static str, value: impl IntoValue) {
        let value = value.into_value();
        match self.values.iter_mut().find(|(k, _)| *k == name) {
            Some((_, v)) => *v = value,
            None => self.values.push((name, value)),
        }
    }

    /// Builder form of [`Record::set`].
    pub fn with(mut self, name: &'static str, value: impl IntoValue) -> Self {
        self.set(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.iter().find(|(k, _)| *k == name).map(|(_, v)| v)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn take(&mut self, name: &str) -> Option<Value> {
        let pos = self.values.iter().position(|(k, _)| *k == name)?;
        Some(self.values.remove(pos).1)
    }

    /// Takes a field that record construction cannot do without.
    pub fn take_required<T: FromValue>(&mut self, name: &'static str) -> Result<T, MappingError> {
        match self.take(name) {
            Some(value) => T::from_value(value, name),
            None => Err(MappingError::MissingField {
                record: self.schema.type_name,
                field: name,
            }),
        }
    }

    /// Takes an optional field; absence and [`Value::Null`] both yield `None`.
    pub fn take_optional<T: FromValue>(&mut self, name: &'static str) -> Result<Option<T>, MappingError> {
        match self.take(name) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => T::from_value(value, name).map(Some),
        }
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.schema.type_name == other.schema.type_name && self.values == other.values
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct(self.schema.type_name);
        for (name, value) in &self.values {
            s.field(name, value);
        }
        s.finish()
    }
}

// ============================================================================
// Typed conversions
// ============================================================================

/// A Rust type mapped to and from XML through a static descriptor.
pub trait XmlRecord: Sized {
    fn schema() -> &'static RecordSchema;

    fn to_record(&self) -> Record;

    /// Record construction. Fails with [`MappingError::MissingField`] when a
    /// required field is absent from `record`.
    fn from_record(record: Record) -> Result<Self, MappingError>;
}

pub trait IntoValue {
    fn into_value(self) -> Value;
}

pub trait FromValue: Sized {
    fn from_value(value: Value, field: &'static str) -> Result<Self, MappingError>;
}

impl IntoValue for Value {
    fn into_value(self) -> Value {
        self
    }
}

impl IntoValue for String {
    fn into_value(self) -> Value {
        Value::Str(self)
    }
}

impl IntoValue for &str {
    fn into_value(self) -> Value {
        Value::Str(self.to_string())
    }
}

impl IntoValue for DateTime<FixedOffset> {
    fn into_value(self) -> Value {
        Value::DateTime(self)
    }
}

impl IntoValue for bool {
    fn into_value(self) -> Value {
        Value::Bool(self)
    }
}

impl IntoValue for f64 {
    fn into_value(self) -> Value {
        Value::Float(self)
    }
}

impl IntoValue for Record {
    fn into_value(self) -> Value {
        Value::Record(self)
    }
}

impl<T: IntoValue> IntoValue for Option<T> {
    fn into_value(self) -> Value {
        self.map_or(Value::Null, IntoValue::into_value)
    }
}

impl<T: IntoValue> IntoValue for Vec<T> {
    fn into_value(self) -> Value {
        Value::List(self.into_iter().map(IntoValue::into_value).collect())
    }
}

fn mismatch(field: &'static str, expected: &'static str, found: &Value) -> MappingError {
    MappingError::TypeMismatch {
        field,
        expected,
        found: found.type_name(),
    }
}

impl FromValue for Value {
    fn from_value(value: Value, _field: &'static str) -> Result<Self, MappingError> {
        Ok(value)
    }
}

impl FromValue for String {
    fn from_value(value: Value, field: &'static str) -> Result<Self, MappingError> {
        match value {
            Value::Str(s) => Ok(s),
            other => Err(mismatch(field, "str", &other)),
        }
    }
}

impl FromValue for DateTime<FixedOffset> {
    fn from_value(value: Value, field: &'static str) -> Result<Self, MappingError> {
        match value {
            Value::DateTime(dt) => Ok(dt),
            other => Err(mismatch(field, "datetime", &other)),
        }
    }
}

impl FromValue for Record {
    fn from_value(value: Value, field: &'static str) -> Result<Self, MappingError> {
        match value {
            Value::Record(r) => Ok(r),
            other => Err(mismatch(field, "record", &other)),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value, field: &'static str) -> Result<Self, MappingError> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other, field).map(Some),
        }
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(value: Value, field: &'static str) -> Result<Self, MappingError> {
        match value {
            Value::List(items) => items.into_iter().map(|v| T::from_value(v, field)).collect(),
            other => Err(mismatch(field, "list", &other)),
        }
    }
}

macro_rules! int_conversions {
    ($($t:ty),*) => {
        $(
            impl IntoValue for $t {
                fn into_value(self) -> Value {
                    Value::Int(i64::from(self))
                }
            }

            impl FromValue for $t {
                fn from_value(value: Value, field: &'static str) -> Result<Self, MappingError> {
                    match value {
                        Value::Int(i) => <$t>::try_from(i).map_err(|e| MappingError::InvalidValue {
                            field,
                            value: i.to_string(),
                            reason: e.to_string(),
                        }),
                        other => Err(mismatch(field, "int", &other)),
                    }
                }
            }
        )*
    };
}

int_conversions!(i64, i32, u32, u16, u8);

/// Implements [`IntoValue`] and [`FromValue`] for [`XmlRecord`] types so they
/// can appear as nested objects and list items.
#[macro_export]
macro_rules! record_values {
    ($($t:ty),* $(,)?) => {
        $(
            impl $crate::mapping::IntoValue for $t {
                fn into_value(self) -> $crate::mapping::Value {
                    $crate::mapping::Value::Record($crate::mapping::XmlRecord::to_record(&self))
                }
            }

            impl $crate::mapping::FromValue for $t {
                fn from_value(
                    value: $crate::mapping::Value,
                    field: &'static str,
                ) -> Result<Self, $crate::mapping::MappingError> {
                    let record = <$crate::mapping::Record as $crate::mapping::FromValue>::from_value(value, field)?;
                    <$t as $crate::mapping::XmlRecord>::from_record(record)
                }
            }
        )*
    };
}
