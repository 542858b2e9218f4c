use std::io::Write;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use super::tree::{Content, Document, NodeId};
use super::XmlError;

impl Document {
    /// Serializes the whole document with an XML declaration and two-space
    /// indentation.
    pub fn to_xml_string(&self) -> Result<String, XmlError> {
        let bytes = self.write_xml(Vec::new())?;
        String::from_utf8(bytes).map_err(|e| XmlError::Encoding(e.to_string()))
    }

    /// Streams the indented document into `out` and hands `out` back.
    pub fn write_xml<W: Write>(&self, out: W) -> Result<W, XmlError> {
        let mut writer = Writer::new_with_indent(out, b' ', 2);
        write_event(&mut writer, Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        write_node(&mut writer, self, self.root())?;
        Ok(writer.into_inner())
    }

    /// Serializes the subtree rooted at `node` compactly, without a
    /// declaration and without any text that follows the node.
    pub fn node_to_string(&self, node: NodeId) -> Result<String, XmlError> {
        let mut writer = Writer::new(Vec::new());
        write_node(&mut writer, self, node)?;
        String::from_utf8(writer.into_inner()).map_err(|e| XmlError::Encoding(e.to_string()))
    }
}

fn write_event<W: Write>(writer: &mut Writer<W>, event: Event<'_>) -> Result<(), XmlError> {
    writer
        .write_event(event)
        .map_err(|e| XmlError::Write(e.to_string()))
}

fn write_node<W: Write>(writer: &mut Writer<W>, doc: &Document, node: NodeId) -> Result<(), XmlError> {
    let tag = doc.tag(node);
    let mut start = BytesStart::new(tag);
    for (key, value) in doc.attributes(node) {
        start.push_attribute((key.as_str(), value.as_str()));
    }

    let mut content = doc.content(node).peekable();
    if content.peek().is_none() {
        return write_event(writer, Event::Empty(start));
    }

    write_event(writer, Event::Start(start))?;
    for item in content {
        match item {
            Content::Text(text) => write_event(writer, Event::Text(BytesText::new(text)))?,
            Content::Element(child) => write_node(writer, doc, child)?,
        }
    }
    write_event(writer, Event::End(BytesEnd::new(tag)))
}
