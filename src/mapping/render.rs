use chrono::Datelike;

use super::error::MappingError;
use super::kind::{classify, FieldKind};
use super::schema::{FieldSchema, Record, Value, XmlRecord};
use crate::xml::{Document, NodeId};

/// Renders a typed record as a standalone document whose root is the record's
/// element.
pub fn render<T: XmlRecord>(value: &T) -> Result<Document, MappingError> {
    render_record(&value.to_record())
}

pub fn render_record(record: &Record) -> Result<Document, MappingError> {
    let mut doc = Document::new(record.schema().tag_name());
    let root = doc.root();
    render_into(record, &mut doc, root)?;
    Ok(doc)
}

/// Fills `target` with the attributes, text and children of `record`.
///
/// The target element must already exist and carry the record's tag name.
/// A custom render function on the schema replaces the generic rules.
pub fn render_into(record: &Record, doc: &mut Document, target: NodeId) -> Result<(), MappingError> {
    let schema = record.schema();
    if let Some(render) = schema.render {
        return render(record, doc, target);
    }

    let mut has_text = false;
    for field in schema.fields {
        let Some(value) = record.get(field.name) else {
            continue;
        };
        if field.is_defaulted(value) {
            continue;
        }

        match field.kind() {
            FieldKind::EmbeddedText => {
                if has_text {
                    return Err(MappingError::MultipleEmbeddedText {
                        record: schema.type_name,
                    });
                }
                has_text = true;
                doc.set_text(target, Some(render_primitive(value)?));
            }
            FieldKind::Attribute => {
                doc.set_attr(target, field.xml_name(), render_primitive(value)?);
            }
            FieldKind::TextElement => {
                let child = doc.append_new(target, field.xml_name());
                doc.set_text(child, Some(render_primitive(value)?));
            }
            FieldKind::NestedObject => render_nested(doc, target, field, value)?,
            FieldKind::ElementList => render_list(doc, target, field, value)?,
        }
    }
    Ok(())
}

/// Nested values are tagged by their own type. A union member that is not a
/// record falls back to a text element named after the field.
fn render_nested(doc: &mut Document, target: NodeId, field: &FieldSchema, value: &Value) -> Result<(), MappingError> {
    match value {
        Value::Record(nested) => {
            let child = doc.append_new(target, nested.schema().tag_name());
            render_into(nested, doc, child)
        }
        other => {
            let child = doc.append_new(target, field.xml_name());
            doc.set_text(child, Some(render_primitive(other)?));
            Ok(())
        }
    }
}

fn render_list(doc: &mut Document, target: NodeId, field: &FieldSchema, value: &Value) -> Result<(), MappingError> {
    let item_kind = list_item_kind(field)?;

    let items = match value {
        Value::List(items) => items,
        other => {
            return Err(MappingError::TypeMismatch {
                field: field.name,
                expected: "list",
                found: other.type_name(),
            })
        }
    };

    let item_tag = field.item_tag();
    for item in items {
        match (item_kind, item) {
            (FieldKind::NestedObject, Value::Record(nested)) => {
                let child = doc.append_new(target, nested.schema().tag_name());
                render_into(nested, doc, child)?;
            }
            _ => {
                let child = doc.append_new(target, item_tag.as_ref());
                doc.set_text(child, Some(render_primitive(item)?));
            }
        }
    }
    Ok(())
}

/// Kind of the items of a list field, rejecting item kinds that cannot be
/// expressed as repeated child elements.
pub(crate) fn list_item_kind(field: &FieldSchema) -> Result<FieldKind, MappingError> {
    let Some(item) = field.decl.list_item() else {
        return Err(MappingError::TypeMismatch {
            field: field.name,
            expected: "list declaration",
            found: "scalar declaration",
        });
    };
    match classify(item) {
        FieldKind::EmbeddedText => Err(MappingError::IllegalListItem {
            field: field.name,
            kind: "embedded text",
        }),
        FieldKind::Attribute => Err(MappingError::IllegalListItem {
            field: field.name,
            kind: "attribute",
        }),
        FieldKind::ElementList => Err(MappingError::NestedList { field: field.name }),
        kind => Ok(kind),
    }
}

/// Text encoding of a primitive value.
pub fn render_primitive(value: &Value) -> Result<String, MappingError> {
    match value {
        Value::Int(i) => Ok(i.to_string()),
        Value::Str(s) => Ok(s.clone()),
        Value::DateTime(dt) if (0..=9999).contains(&dt.year()) => Ok(dt.to_rfc2822()),
        Value::DateTime(dt) => Err(MappingError::DateOutOfRange { value: format!("{dt:?}") }),
        other => Err(MappingError::UnsupportedType {
            type_name: other.type_name(),
        }),
    }
}
