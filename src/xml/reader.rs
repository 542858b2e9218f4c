use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::tree::{Document, NodeId};
use super::XmlError;

/// SEC-003: Maximum element nesting depth accepted from an input document.
const MAX_DEPTH: usize = 256;

impl Document {
    /// Parses an XML string into a tree.
    ///
    /// Leading and trailing whitespace of text runs is trimmed, CDATA sections
    /// are folded into the surrounding text, and comments, processing
    /// instructions and the DOCTYPE are dropped.
    ///
    /// # Security
    ///
    /// SEC-002: `quick-xml` (0.37) never parses `<!ENTITY>` declarations; only
    /// the five predefined entities are resolved and any custom entity
    /// reference is rejected as an [`XmlError::Syntax`].
    pub fn parse_str(content: &str) -> Result<Document, XmlError> {
        let mut reader = Reader::from_str(content);
        reader.config_mut().trim_text(true);

        let mut doc: Option<Document> = None;
        let mut stack: Vec<NodeId> = Vec::new();

        loop {
            let event = reader
                .read_event()
                .map_err(|e| XmlError::Syntax(format!("at byte {}: {}", reader.buffer_position(), e)))?;

            match event {
                Event::Start(e) => {
                    if stack.len() >= MAX_DEPTH {
                        return Err(XmlError::TooDeep(MAX_DEPTH));
                    }
                    let node = open_element(&mut doc, &stack, &e, &reader)?;
                    stack.push(node);
                }
                Event::Empty(e) => {
                    open_element(&mut doc, &stack, &e, &reader)?;
                }
                Event::End(e) => {
                    let name = decode_name(e.name().as_ref())?;
                    let Some(open) = stack.pop() else {
                        return Err(XmlError::Mismatched {
                            expected: String::new(),
                            found: name,
                        });
                    };
                    if let Some(doc) = doc.as_ref() {
                        if doc.tag(open) != name {
                            return Err(XmlError::Mismatched {
                                expected: doc.tag(open).to_string(),
                                found: name,
                            });
                        }
                    }
                }
                Event::Text(t) => {
                    let text = t
                        .unescape()
                        .map_err(|e| XmlError::Syntax(e.to_string()))?;
                    push_text(doc.as_mut(), &stack, &text);
                }
                Event::CData(c) => {
                    let text = decode_name(&c.into_inner())?;
                    push_text(doc.as_mut(), &stack, &text);
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if let Some(open) = stack.last() {
            let tag = doc.as_ref().map(|d| d.tag(*open).to_string()).unwrap_or_default();
            return Err(XmlError::Unclosed(tag));
        }
        doc.ok_or(XmlError::NoRoot)
    }
}

fn open_element(
    doc: &mut Option<Document>,
    stack: &[NodeId],
    start: &BytesStart<'_>,
    reader: &Reader<&[u8]>,
) -> Result<NodeId, XmlError> {
    let tag = decode_name(start.name().as_ref())?;

    let node = match stack.last() {
        Some(&parent) => doc.as_mut().ok_or(XmlError::NoRoot)?.append_new(parent, tag),
        None if doc.is_some() => return Err(XmlError::MultipleRoots(tag)),
        None => doc.insert(Document::new(tag)).root(),
    };

    let d = doc.as_mut().ok_or(XmlError::NoRoot)?;
    for attr in start.attributes() {
        let attr = attr.map_err(|e| XmlError::Syntax(e.to_string()))?;
        let key = decode_name(attr.key.as_ref())?;
        let value = attr
            .decode_and_unescape_value(reader.decoder())
            .map_err(|e| XmlError::Syntax(e.to_string()))?;
        d.set_attr(node, key, value.into_owned());
    }
    Ok(node)
}

fn push_text(doc: Option<&mut Document>, stack: &[NodeId], text: &str) {
    if let (Some(doc), Some(&open)) = (doc, stack.last()) {
        doc.append_text(open, text);
    }
}

fn decode_name(bytes: &[u8]) -> Result<String, XmlError> {
    std::str::from_utf8(bytes)
        .map(str::to_owned)
        .map_err(|e| XmlError::Encoding(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_nested_elements() {
        let doc = Document::parse_str(
            r#"<?xml version="1.0"?>
<rss version="2.0">
  <channel>
    <title>Example &amp; Co</title>
    <cloud domain="rpc.example.com" port="80"/>
  </channel>
</rss>"#,
        )
        .unwrap();

        let root = doc.node(doc.root());
        assert_eq!(root.tag(), "rss");
        assert_eq!(root.attr("version"), Some("2.0"));
        let channel = root.child("channel").unwrap();
        assert_eq!(channel.child("title").and_then(|t| t.text()), Some("Example & Co"));
        let cloud = channel.child("cloud").unwrap();
        assert_eq!(cloud.attr("port"), Some("80"));
        assert!(cloud.children().next().is_none());
    }

    #[test]
    fn test_cdata_becomes_text() {
        let doc = Document::parse_str("<d><![CDATA[<b>bold</b>]]></d>").unwrap();
        assert_eq!(doc.text(doc.root()), Some("<b>bold</b>"));
    }

    #[test]
    fn test_mixed_content_keeps_text_runs() {
        let doc = Document::parse_str("<p>one<b>two</b>three</p>").unwrap();
        let b = doc.children(doc.root())[0];
        assert_eq!(doc.text(doc.root()), Some("one"));
        assert_eq!(doc.text(b), Some("two"));
        assert_eq!(doc.node_to_string(doc.root()).unwrap(), "<p>one<b>two</b>three</p>");
    }

    #[test]
    fn test_cdata_joins_adjacent_text() {
        let doc = Document::parse_str("<d>a <![CDATA[& b]]></d>").unwrap();
        assert_eq!(doc.text(doc.root()), Some("a& b"));
    }

    #[test]
    fn test_rejects_mismatched_tags() {
        let result = Document::parse_str("<a><b></a></b>");
        assert!(result.is_err());
    }

    #[test]
    fn test_rejects_unclosed_and_empty() {
        assert!(Document::parse_str("<a><b></b>").is_err());
        assert!(matches!(Document::parse_str("   "), Err(XmlError::NoRoot)));
        assert!(matches!(
            Document::parse_str("<a/><b/>"),
            Err(XmlError::MultipleRoots(_))
        ));
    }

    #[test]
    fn test_custom_entity_not_expanded() {
        // SEC-002: entity declarations are never parsed, so the reference
        // either errors or stays unexpanded.
        let xml = r#"<?xml version="1.0"?>
<!DOCTYPE rss [<!ENTITY xxe "EXPANDED_VALUE">]>
<rss><channel><title>&xxe;</title></channel></rss>"#;
        if let Ok(doc) = Document::parse_str(xml) {
            let title = doc
                .node(doc.root())
                .child("channel")
                .and_then(|c| c.child("title"))
                .and_then(|t| t.text())
                .unwrap_or_default();
            assert!(!title.contains("EXPANDED_VALUE"));
        }
    }

    #[test]
    fn test_rejects_excessive_depth() {
        let xml = format!("{}{}", "<a>".repeat(MAX_DEPTH + 1), "</a>".repeat(MAX_DEPTH + 1));
        assert!(matches!(Document::parse_str(&xml), Err(XmlError::TooDeep(_))));
    }
}
