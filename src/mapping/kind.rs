use std::borrow::Cow;

use super::schema::RecordSchema;

/// How a declared field is represented in XML.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// An attribute on the record's own element.
    Attribute,
    /// The text content of the record's own element.
    EmbeddedText,
    /// A child element holding primitive text.
    TextElement,
    /// A child element produced by rendering a nested record.
    NestedObject,
    /// One child element per item of a sequence.
    ElementList,
}

/// Declared type of a record field.
///
/// Declarations are built in `static` descriptor tables, so composite
/// variants refer to other declarations by `&'static` reference.
#[derive(Debug, Clone, Copy)]
pub enum TypeDecl {
    Int,
    Str,
    DateTime,
    /// Representable in memory but has no text encoding.
    Bool,
    /// Representable in memory but has no text encoding.
    Float,
    Optional(&'static TypeDecl),
    /// Explicit kind annotation; the only way to declare `Attribute` or
    /// `EmbeddedText`.
    Kind(FieldKind, &'static TypeDecl),
    Record(&'static RecordSchema),
    List(&'static TypeDecl),
    /// A non-optional union of several types. Renders per value, never parses.
    Union(&'static [TypeDecl]),
}

impl TypeDecl {
    /// Strips optionality markers and kind annotations.
    pub fn base(&self) -> &TypeDecl {
        match self {
            TypeDecl::Optional(inner) | TypeDecl::Kind(_, inner) => inner.base(),
            other => other,
        }
    }

    pub fn is_optional(&self) -> bool {
        match self {
            TypeDecl::Optional(_) => true,
            TypeDecl::Kind(_, inner) => inner.is_optional(),
            _ => false,
        }
    }

    /// Element type of a sequence declaration, looking through optionality
    /// and kind annotations.
    pub fn list_item(&self) -> Option<&'static TypeDecl> {
        match self.base() {
            TypeDecl::List(item) => Some(*item),
            _ => None,
        }
    }
}

/// Resolves the [`FieldKind`] of a declaration.
///
/// Optionality is unwrapped first, then an explicit annotation wins, then a
/// record type is a nested object, a sequence is an element list, and
/// anything else is a text element.
pub fn classify(decl: &TypeDecl) -> FieldKind {
    match decl {
        TypeDecl::Optional(inner) => classify(inner),
        TypeDecl::Kind(kind, _) => *kind,
        TypeDecl::Record(_) => FieldKind::NestedObject,
        TypeDecl::List(_) => FieldKind::ElementList,
        TypeDecl::Union(members) => {
            if members
                .iter()
                .any(|m| classify(m) == FieldKind::NestedObject)
            {
                FieldKind::NestedObject
            } else {
                FieldKind::TextElement
            }
        }
        TypeDecl::Int | TypeDecl::Str | TypeDecl::DateTime | TypeDecl::Bool | TypeDecl::Float => {
            FieldKind::TextElement
        }
    }
}

/// Converts a snake_case identifier to camelCase.
pub fn to_camel(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper_next = false;
    for c in name.chars() {
        if c == '_' {
            upper_next = !out.is_empty();
            continue;
        }
        if upper_next {
            out.extend(c.to_uppercase());
            upper_next = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// Quick plural to singular conversion. Only expected to work for the names
/// that appear in the RSS specification; irregular plurals need an explicit
/// item tag.
pub fn singularize(noun: &str) -> Cow<'_, str> {
    if let Some(stem) = noun.strip_suffix("ies") {
        return Cow::Owned(format!("{stem}y"));
    }
    match noun.strip_suffix('s') {
        Some(stem) => Cow::Borrowed(stem),
        None => Cow::Borrowed(noun),
    }
}

/// Lower-cases the first character of a type name.
pub fn lower_first(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}
