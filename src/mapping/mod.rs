//! Generic mapping between declared record shapes and XML elements.
//!
//! Every mapped type publishes a static [`RecordSchema`] through the
//! [`XmlRecord`] trait. The engine walks that descriptor instead of the type
//! itself:
//!
//! - **Classification**: [`classify`] decides how each declared field appears
//!   in XML (attribute, own text, child element, nested element, or repeated
//!   child elements)
//! - **Rendering**: [`render`] turns a record into an element tree, omitting
//!   fields equal to their declared default
//! - **Parsing**: [`parse`] reads an element back, substituting defaults and
//!   leaving out absent fields so that typed construction decides what is
//!   required
//!
//! A schema may carry custom render and parse functions; either one replaces
//! the generic rules for that type.
//!
//! # Example
//!
//! ```
//! use rss_slicer::mapping::{parse, render};
//! use rss_slicer::rss::Category;
//!
//! let category = Category { text: "Grateful Dead".into(), domain: Some("http://www.example.com".into()) };
//! let doc = render(&category).unwrap();
//! assert_eq!(
//!     doc.node_to_string(doc.root()).unwrap(),
//!     r#"<category domain="http://www.example.com">Grateful Dead</category>"#
//! );
//! assert_eq!(parse::<Category>(doc.node(doc.root())).unwrap(), category);
//! ```

mod error;
mod kind;
mod parse;
mod render;
mod schema;

pub use error::MappingError;
pub use kind::{classify, singularize, to_camel, FieldKind, TypeDecl};
pub use parse::{parse, parse_record};
pub use render::{render, render_into, render_primitive, render_record};
pub use schema::{
    empty_list, null_value, DefaultFn, FieldSchema, FromValue, IntoValue, ParseFn, Record, RecordSchema, RenderFn,
    Value, XmlRecord,
};
