use chrono::DateTime;

use super::error::MappingError;
use super::kind::{FieldKind, TypeDecl};
use super::render::list_item_kind;
use super::schema::{FieldSchema, Record, RecordSchema, Value, XmlRecord};
use crate::xml::NodeRef;

/// Parses an element into a typed record.
pub fn parse<T: XmlRecord>(node: NodeRef<'_>) -> Result<T, MappingError> {
    T::from_record(parse_record(T::schema(), node)?)
}

/// Parses an element into a dynamic record.
///
/// Fields absent from the element take their declared default. Absent fields
/// without a default are left out of the record; whether that is an error is
/// decided when the record is converted to its typed form.
pub fn parse_record(schema: &'static RecordSchema, node: NodeRef<'_>) -> Result<Record, MappingError> {
    if let Some(parse) = schema.parse {
        return parse(node);
    }

    let mut record = Record::new(schema);
    for field in schema.fields {
        match parse_field(field, node)? {
            Some(value) => record.set(field.name, value),
            None => tracing::trace!(
                record = schema.type_name,
                field = field.name,
                element = node.tag(),
                "field absent from element"
            ),
        }
    }
    Ok(record)
}

fn parse_field(field: &'static FieldSchema, node: NodeRef<'_>) -> Result<Option<Value>, MappingError> {
    if matches!(field.decl.base(), TypeDecl::Union(_)) {
        return Err(MappingError::UnsupportedUnion { field: field.name });
    }

    let found = match field.kind() {
        FieldKind::EmbeddedText => element_text(node)
            .map(|text| convert(field, &field.decl, text))
            .transpose()?,
        FieldKind::Attribute => node
            .attr(&field.xml_name())
            .map(|raw| convert(field, &field.decl, raw))
            .transpose()?,
        FieldKind::TextElement => node
            .child(&field.xml_name())
            .and_then(element_text)
            .map(|text| convert(field, &field.decl, text))
            .transpose()?,
        FieldKind::NestedObject => match node.child(&field.xml_name()) {
            Some(child) => Some(Value::Record(parse_record(nested_schema(field, &field.decl)?, child)?)),
            None => None,
        },
        FieldKind::ElementList => parse_list(field, node)?,
    };

    Ok(found.or_else(|| field.default_value()))
}

fn parse_list(field: &'static FieldSchema, node: NodeRef<'_>) -> Result<Option<Value>, MappingError> {
    let item_kind = list_item_kind(field)?;
    let Some(item_decl) = field.decl.list_item() else {
        return Ok(None);
    };

    let children = node.children_named(&field.item_tag());
    if children.is_empty() {
        return Ok(None);
    }

    let items = children
        .into_iter()
        .map(|child| -> Result<Value, MappingError> {
            match item_kind {
                FieldKind::NestedObject => Ok(Value::Record(parse_record(nested_schema(field, item_decl)?, child)?)),
                _ => match element_text(child) {
                    Some(text) => convert(field, item_decl, text),
                    None if item_decl.is_optional() => Ok(Value::Null),
                    None => convert(field, item_decl, ""),
                },
            }
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Some(Value::List(items)))
}

/// Trimmed text of an element; empty text counts as absent.
fn element_text(node: NodeRef<'_>) -> Option<&str> {
    node.text().map(str::trim).filter(|t| !t.is_empty())
}

fn nested_schema(field: &FieldSchema, decl: &TypeDecl) -> Result<&'static RecordSchema, MappingError> {
    match decl.base() {
        TypeDecl::Record(schema) => Ok(*schema),
        _ => Err(MappingError::TypeMismatch {
            field: field.name,
            expected: "record declaration",
            found: "scalar declaration",
        }),
    }
}

/// Converts element or attribute text to the declared primitive type.
fn convert(field: &FieldSchema, decl: &TypeDecl, text: &str) -> Result<Value, MappingError> {
    let invalid = |reason: String| MappingError::InvalidValue {
        field: field.name,
        value: text.to_string(),
        reason,
    };

    match decl.base() {
        TypeDecl::Str => Ok(Value::Str(text.to_string())),
        TypeDecl::Int => text
            .trim()
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|e| invalid(e.to_string())),
        TypeDecl::DateTime => DateTime::parse_from_rfc2822(&normalize_date(text))
            .map(Value::DateTime)
            .map_err(|e| invalid(e.to_string())),
        TypeDecl::Bool => Err(MappingError::UnsupportedType { type_name: "bool" }),
        TypeDecl::Float => Err(MappingError::UnsupportedType { type_name: "float" }),
        TypeDecl::Record(_) => Err(MappingError::UnsupportedType { type_name: "record" }),
        TypeDecl::List(_) => Err(MappingError::UnsupportedType { type_name: "list" }),
        TypeDecl::Union(_) => Err(MappingError::UnsupportedUnion { field: field.name }),
        // base() never returns a wrapper
        TypeDecl::Optional(_) | TypeDecl::Kind(..) => Err(MappingError::UnsupportedType { type_name: "wrapper" }),
    }
}

/// Rewrites the date forms seen in real feeds that chrono rejects: the
/// `UTC`, `AST` and `ADT` zone names and single-digit hours.
fn normalize_date(text: &str) -> String {
    text.split_whitespace()
        .map(|token| match token.to_ascii_uppercase().as_str() {
            "UTC" => "+0000".to_string(),
            "AST" => "-0400".to_string(),
            "ADT" => "-0300".to_string(),
            _ if token.find(':') == Some(1) => format!("0{token}"),
            _ => token.to_string(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::schema::{empty_list, null_value};
    use crate::xml::Document;
    use pretty_assertions::assert_eq;

    static INNER_FIELDS: [FieldSchema; 1] = [FieldSchema::new("val", TypeDecl::Str)];
    static INNER: RecordSchema = RecordSchema::new("Inner", &INNER_FIELDS);
    static INNER_DECL: TypeDecl = TypeDecl::Record(&INNER);
    static OPTIONAL_INT: TypeDecl = TypeDecl::Optional(&TypeDecl::Int);

    static OUTER_FIELDS: [FieldSchema; 7] = [
        FieldSchema::new("id", TypeDecl::Kind(FieldKind::Attribute, &TypeDecl::Int)),
        FieldSchema::new("label", TypeDecl::Kind(FieldKind::EmbeddedText, &TypeDecl::Str)),
        FieldSchema::new("long_name", TypeDecl::Str),
        FieldSchema::optional("inner", &INNER_DECL),
        FieldSchema::new("numbers", TypeDecl::List(&OPTIONAL_INT)).with_default(empty_list),
        FieldSchema::optional("when", &TypeDecl::DateTime),
        FieldSchema::new("missing", TypeDecl::Str),
    ];
    static OUTER: RecordSchema = RecordSchema::new("Outer", &OUTER_FIELDS);

    fn parse_str(schema: &'static RecordSchema, xml: &str) -> Result<Record, MappingError> {
        let doc = Document::parse_str(xml).unwrap();
        parse_record(schema, doc.node(doc.root()))
    }

    #[test]
    fn test_parse_every_kind() {
        let record = parse_str(
            &OUTER,
            "<outer id=\" 7\">  hello  <longName>thing</longName><inner><val>x</val></inner>\
             <number>1</number><number/><number>3</number>\
             <when>Sat, 07 Sep 2002 00:00:01 GMT</when></outer>",
        )
        .unwrap();

        assert_eq!(record.get("id"), Some(&Value::Int(7)));
        assert_eq!(record.get("label"), Some(&Value::Str("hello".into())));
        assert_eq!(record.get("long_name"), Some(&Value::Str("thing".into())));
        assert_eq!(
            record.get("inner"),
            Some(&Value::Record(Record::new(&INNER).with("val", "x")))
        );
        assert_eq!(
            record.get("numbers"),
            Some(&Value::List(vec![Value::Int(1), Value::Null, Value::Int(3)]))
        );
        let when = DateTime::parse_from_rfc2822("Sat, 07 Sep 2002 00:00:01 +0000").unwrap();
        assert_eq!(record.get("when"), Some(&Value::DateTime(when)));
        assert!(!record.contains("missing"));
    }

    #[test]
    fn test_absent_fields_take_defaults() {
        let record = parse_str(&OUTER, "<outer><longName>  </longName></outer>").unwrap();
        assert_eq!(record.get("inner"), Some(&null_value()));
        assert_eq!(record.get("numbers"), Some(&empty_list()));
        assert_eq!(record.get("when"), Some(&Value::Null));
        assert!(!record.contains("id"));
        assert!(!record.contains("label"));
        assert!(!record.contains("long_name"));
    }

    #[test]
    fn test_invalid_values() {
        let result = parse_str(&OUTER, "<outer id=\"seven\"/>");
        assert!(matches!(result, Err(MappingError::InvalidValue { field: "id", .. })));

        let result = parse_str(&OUTER, "<outer><when>yesterday</when></outer>");
        assert!(matches!(result, Err(MappingError::InvalidValue { field: "when", .. })));
    }

    #[test]
    fn test_dates_with_numeric_zone() {
        let record = parse_str(&OUTER, "<outer><when>Tue, 10 Jun 2003 09:41:01 -0500</when></outer>").unwrap();
        let Some(Value::DateTime(when)) = record.get("when") else {
            panic!("expected a date");
        };
        assert_eq!(when.offset().local_minus_utc(), -5 * 3600);
    }

    fn parse_when(text: &str) -> DateTime<chrono::FixedOffset> {
        let record = parse_str(&OUTER, &format!("<outer><when>{text}</when></outer>")).unwrap();
        match record.get("when") {
            Some(Value::DateTime(when)) => *when,
            other => panic!("expected a date, got {other:?}"),
        }
    }

    #[test]
    fn test_dates_with_named_zones() {
        assert_eq!(parse_when("Sat, 07 Sep 2002 00:00:01 UTC").offset().local_minus_utc(), 0);
        assert_eq!(parse_when("Sat, 07 Sep 2002 00:00:01 GMT").offset().local_minus_utc(), 0);
        assert_eq!(parse_when("Sat, 07 Sep 2002 00:00:01 EDT").offset().local_minus_utc(), -4 * 3600);
        assert_eq!(parse_when("Sat, 07 Sep 2002 00:00:01 AST").offset().local_minus_utc(), -4 * 3600);
        assert_eq!(parse_when("Sat, 07 Sep 2002 00:00:01 ADT").offset().local_minus_utc(), -3 * 3600);
    }

    #[test]
    fn test_dates_with_single_digit_hour() {
        assert_eq!(
            parse_when("Sat, 7 Sep 2002 0:00:01 GMT"),
            parse_when("Sat, 07 Sep 2002 00:00:01 +0000")
        );
        assert_eq!(
            parse_when("Sat, 07 Sep 2002 9:30:00 UTC"),
            parse_when("Sat, 07 Sep 2002 09:30:00 +0000")
        );
    }

    #[test]
    fn test_union_fields_cannot_be_parsed() {
        static FIELDS: [FieldSchema; 1] = [FieldSchema::new("either", TypeDecl::Union(&[TypeDecl::Str, TypeDecl::Int]))];
        static EITHER: RecordSchema = RecordSchema::new("Either", &FIELDS);

        assert_eq!(
            parse_str(&EITHER, "<either/>").unwrap_err(),
            MappingError::UnsupportedUnion { field: "either" }
        );
    }

    #[test]
    fn test_custom_parse_takes_over() {
        fn from_attr(node: NodeRef<'_>) -> Result<Record, MappingError> {
            Ok(Record::new(&CUSTOM).with("val", node.attr("v").unwrap_or_default()))
        }
        static CUSTOM: RecordSchema = RecordSchema::new("Custom", &INNER_FIELDS).with_parse(from_attr);

        let record = parse_str(&CUSTOM, "<custom v=\"z\"><val>ignored</val></custom>").unwrap();
        assert_eq!(record.get("val"), Some(&Value::Str("z".into())));
    }
}
