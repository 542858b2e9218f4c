//! Mutable XML element trees.
//!
//! This module provides the tree the rest of the crate operates on:
//!
//! - **Tree**: a [`xot`] arena of elements and text ([`Document`], [`NodeId`]),
//!   plus borrowed views for reading ([`NodeRef`]) and editing ([`NodeMut`])
//! - **Reading / writing**: conversion from and to XML text via `quick-xml`
//! - **Queries**: relative ElementPath-style selectors ([`Query`])
//!
//! # Example
//!
//! ```
//! use rss_slicer::xml::{Document, Query};
//!
//! let doc = Document::parse_str("<rss><channel><item/><item/></channel></rss>").unwrap();
//! let items = Query::parse("./channel/item").unwrap().select(&doc, doc.root());
//! assert_eq!(items.len(), 2);
//! ```

mod query;
mod reader;
mod tree;
mod writer;

use thiserror::Error;

pub use query::{Query, QueryError};
pub use tree::{Document, NodeId, NodeMut, NodeRef};

/// Errors that can occur while reading or writing XML.
#[derive(Debug, Error)]
pub enum XmlError {
    /// The input is not well-formed XML.
    #[error("XML parse error: {0}")]
    Syntax(String),

    /// A name or text run is not valid UTF-8.
    #[error("invalid UTF-8 in XML: {0}")]
    Encoding(String),

    #[error("mismatched end tag: expected </{expected}>, found </{found}>")]
    Mismatched { expected: String, found: String },

    #[error("element <{0}> is never closed")]
    Unclosed(String),

    #[error("document has no root element")]
    NoRoot,

    #[error("document has more than one root element (second root <{0}>)")]
    MultipleRoots(String),

    /// SEC-003: Nesting depth exceeds the safety limit.
    #[error("XML nesting depth exceeds maximum of {0} levels")]
    TooDeep(usize),

    #[error("failed to write XML: {0}")]
    Write(String),
}
