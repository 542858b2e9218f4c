use thiserror::Error;

/// Errors raised while mapping records to and from XML elements.
///
/// `MissingField` and `InvalidValue` describe bad input documents. The other
/// variants indicate a badly declared record schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MappingError {
    /// A required field was absent when constructing a record.
    #[error("{record}: missing required field `{field}`")]
    MissingField {
        record: &'static str,
        field: &'static str,
    },

    #[error("{record}: more than one field is declared as embedded text")]
    MultipleEmbeddedText { record: &'static str },

    #[error("field `{field}`: a list cannot contain {kind} items")]
    IllegalListItem {
        field: &'static str,
        kind: &'static str,
    },

    #[error("field `{field}`: nested lists are not supported")]
    NestedList { field: &'static str },

    /// The value has no text encoding.
    #[error("values of type `{type_name}` cannot be rendered as text")]
    UnsupportedType { type_name: &'static str },

    #[error("field `{field}`: union types cannot be parsed")]
    UnsupportedUnion { field: &'static str },

    #[error("field `{field}`: invalid value {value:?}: {reason}")]
    InvalidValue {
        field: &'static str,
        value: String,
        reason: String,
    },

    /// RFC 2822 dates carry a four-digit, non-negative year.
    #[error("timestamp {value} cannot be written as an RFC 2822 date")]
    DateOutOfRange { value: String },

    #[error("field `{field}`: expected {expected}, found {found}")]
    TypeMismatch {
        field: &'static str,
        expected: &'static str,
        found: &'static str,
    },
}
