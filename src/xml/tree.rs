use std::fmt;

use xot::{NameId, Node, Xot};

use super::query::Query;

/// Handle to an element inside a [`Document`].
///
/// Handles are only meaningful for the document that created them. A removed
/// node's handle must not be used again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(Node);

/// Mutable XML element tree backed by a [`xot::Xot`] arena.
///
/// The document follows the element/text model: an element's own text is
/// its leading text node, and text after a child element belongs to the
/// parent. Only elements get a [`NodeId`]. Names are stored as written,
/// prefix included, so `atom:link` and `link` stay distinct.
///
/// Removing a node unlinks it from its siblings in constant time.
pub struct Document {
    xot: Xot,
    root: Node,
}

impl Document {
    /// Creates a document holding a single empty root element.
    pub fn new(root_tag: impl AsRef<str>) -> Self {
        let mut xot = Xot::new();
        let name = xot.add_name(root_tag.as_ref());
        let root = xot.new_element(name);
        Self { xot, root }
    }

    pub fn root(&self) -> NodeId {
        NodeId(self.root)
    }

    /// Creates a new element and appends it to `parent`.
    pub fn append_new(&mut self, parent: NodeId, tag: impl AsRef<str>) -> NodeId {
        let name = self.xot.add_name(tag.as_ref());
        let child = self.xot.new_element(name);
        self.attach(parent.0, child);
        NodeId(child)
    }

    /// Removes `node` and its subtree. Returns `false` for the root, which has
    /// no parent to be removed from.
    pub fn remove(&mut self, node: NodeId) -> bool {
        if self.parent(node).is_none() {
            return false;
        }
        self.xot.remove(node.0).is_ok()
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.xot.parent(node.0).map(NodeId)
    }

    /// Element children of `node`, in document order.
    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.xot
            .children(node.0)
            .filter(|&c| self.xot.is_element(c))
            .map(NodeId)
            .collect()
    }

    pub fn tag(&self, node: NodeId) -> &str {
        self.xot
            .element(node.0)
            .map(|e| self.xot.local_name_str(e.name()))
            .unwrap_or_default()
    }

    pub fn set_tag(&mut self, node: NodeId, tag: impl AsRef<str>) {
        let name = self.xot.add_name(tag.as_ref());
        if let Some(element) = self.xot.element_mut(node.0) {
            element.set_name(name);
        }
    }

    pub fn attr(&self, node: NodeId, name: &str) -> Option<&str> {
        let name = self.xot.name(name)?;
        self.xot.attributes(node.0).get(name).map(String::as_str)
    }

    /// Sets an attribute, keeping its position if it already exists.
    pub fn set_attr(&mut self, node: NodeId, name: impl AsRef<str>, value: impl Into<String>) {
        let name = self.xot.add_name(name.as_ref());
        self.xot.attributes_mut(node.0).insert(name, value.into());
    }

    pub fn remove_attr(&mut self, node: NodeId, name: &str) -> Option<String> {
        let name = self.xot.name(name)?;
        self.xot.attributes_mut(node.0).remove(name)
    }

    /// Attributes of `node` in document order.
    pub fn attributes(&self, node: NodeId) -> Vec<(String, String)> {
        self.xot
            .attributes(node.0)
            .iter()
            .map(|(name, value)| (self.name_str(name).to_string(), value.to_string()))
            .collect()
    }

    /// Leading text of `node`, before its first child element.
    pub fn text(&self, node: NodeId) -> Option<&str> {
        self.xot
            .first_child(node.0)
            .and_then(|c| self.xot.text(c))
            .map(|t| t.get())
    }

    /// Replaces the leading text. `None` and the empty string both remove it.
    pub fn set_text(&mut self, node: NodeId, text: Option<String>) {
        let text = text.filter(|t| !t.is_empty());
        let first = self.xot.first_child(node.0);
        match (first.filter(|&c| self.xot.is_text(c)), text) {
            (Some(existing), Some(text)) => {
                if let Some(value) = self.xot.text_mut(existing) {
                    value.set(text);
                }
            }
            (Some(existing), None) => {
                if let Err(err) = self.xot.remove(existing) {
                    tracing::warn!(error = %err, "failed to clear element text");
                }
            }
            (None, Some(text)) => {
                let new = self.xot.new_text(&text);
                match first {
                    Some(first) => {
                        if let Err(err) = self.xot.insert_before(first, new) {
                            tracing::warn!(error = %err, "failed to insert element text");
                        }
                    }
                    None => self.attach(node.0, new),
                }
            }
            (None, None) => {}
        }
    }

    /// Appends a text run after the last child of `node`, joining it with a
    /// trailing text node if there is one.
    pub(crate) fn append_text(&mut self, node: NodeId, text: &str) {
        if text.is_empty() {
            return;
        }
        let last_text = self.xot.last_child(node.0).filter(|&c| self.xot.is_text(c));
        match last_text.and_then(|c| self.xot.text_mut(c)) {
            Some(value) => {
                let joined = format!("{}{}", value.get(), text);
                value.set(joined);
            }
            None => {
                let new = self.xot.new_text(text);
                self.attach(node.0, new);
            }
        }
    }

    /// Deep-copies the subtree rooted at `node` of `source` and appends the
    /// copy to `parent` in this document.
    pub fn import(&mut self, parent: NodeId, source: &Document, node: NodeId) -> NodeId {
        NodeId(self.import_node(parent.0, source, node.0))
    }

    fn import_node(&mut self, parent: Node, source: &Document, node: Node) -> Node {
        if let Some(text) = source.xot.text(node) {
            let copy = self.xot.new_text(text.get());
            self.attach(parent, copy);
            return copy;
        }

        let copy = self.append_new(NodeId(parent), source.tag(NodeId(node))).0;
        for (name, value) in source.attributes(NodeId(node)) {
            self.set_attr(NodeId(copy), name, value);
        }
        for child in source.xot.children(node) {
            self.import_node(copy, source, child);
        }
        copy
    }

    /// Evaluates a compiled query relative to `context`.
    pub fn select(&self, context: NodeId, query: &Query) -> Vec<NodeId> {
        query.select(self, context)
    }

    pub fn node(&self, id: NodeId) -> NodeRef<'_> {
        NodeRef { doc: self, id }
    }

    pub fn node_mut(&mut self, id: NodeId) -> NodeMut<'_> {
        NodeMut { doc: self, id }
    }

    /// Elements of the subtree rooted at `node` in document order, `node`
    /// first.
    pub fn descendants_or_self(&self, node: NodeId) -> Vec<NodeId> {
        self.xot
            .descendants(node.0)
            .filter(|&d| self.xot.is_element(d))
            .map(NodeId)
            .collect()
    }

    /// Text nodes and elements under `node`, for serialization.
    pub(crate) fn content(&self, node: NodeId) -> impl Iterator<Item = Content<'_>> + '_ {
        self.xot.children(node.0).filter_map(|c| {
            if let Some(text) = self.xot.text(c) {
                Some(Content::Text(text.get()))
            } else if self.xot.is_element(c) {
                Some(Content::Element(NodeId(c)))
            } else {
                None
            }
        })
    }

    fn name_str(&self, name: NameId) -> &str {
        self.xot.local_name_str(name)
    }

    fn attach(&mut self, parent: Node, child: Node) {
        if let Err(err) = self.xot.append(parent, child) {
            tracing::warn!(error = %err, "failed to attach node");
        }
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("root", &self.tag(self.root()))
            .finish_non_exhaustive()
    }
}

/// One child of an element.
pub(crate) enum Content<'a> {
    Text(&'a str),
    Element(NodeId),
}

/// Read-only view of one element.
#[derive(Clone, Copy)]
pub struct NodeRef<'a> {
    doc: &'a Document,
    id: NodeId,
}

impl<'a> NodeRef<'a> {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn document(&self) -> &'a Document {
        self.doc
    }

    pub fn tag(&self) -> &'a str {
        self.doc.tag(self.id)
    }

    pub fn attr(&self, name: &str) -> Option<&'a str> {
        self.doc.attr(self.id, name)
    }

    pub fn text(&self) -> Option<&'a str> {
        self.doc.text(self.id)
    }

    pub fn parent(&self) -> Option<NodeRef<'a>> {
        self.doc.parent(self.id).map(|id| self.doc.node(id))
    }

    pub fn children(&self) -> impl Iterator<Item = NodeRef<'a>> + 'a {
        let doc = self.doc;
        doc.children(self.id).into_iter().map(move |id| doc.node(id))
    }

    /// Children whose tag equals `tag`, in document order.
    pub fn children_named(&self, tag: &str) -> Vec<NodeRef<'a>> {
        self.children().filter(|c| c.tag() == tag).collect()
    }

    /// First child whose tag equals `tag`.
    pub fn child(&self, tag: &str) -> Option<NodeRef<'a>> {
        self.children().find(|c| c.tag() == tag)
    }
}

impl fmt::Debug for NodeRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeRef")
            .field("id", &self.id)
            .field("tag", &self.tag())
            .finish()
    }
}

/// Mutable view of one element, handed to mutation transforms.
///
/// It can edit the element's tag, attributes and text, append children and
/// descend into existing children to edit them the same way. It exposes no
/// way to remove nodes: removal is decided by the transform's return value.
pub struct NodeMut<'a> {
    doc: &'a mut Document,
    id: NodeId,
}

impl NodeMut<'_> {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn view(&self) -> NodeRef<'_> {
        self.doc.node(self.id)
    }

    pub fn tag(&self) -> &str {
        self.doc.tag(self.id)
    }

    pub fn set_tag(&mut self, tag: impl AsRef<str>) {
        self.doc.set_tag(self.id, tag);
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.doc.attr(self.id, name)
    }

    pub fn set_attr(&mut self, name: impl AsRef<str>, value: impl Into<String>) {
        self.doc.set_attr(self.id, name, value);
    }

    pub fn remove_attr(&mut self, name: &str) -> Option<String> {
        self.doc.remove_attr(self.id, name)
    }

    pub fn text(&self) -> Option<&str> {
        self.doc.text(self.id)
    }

    pub fn set_text(&mut self, text: Option<String>) {
        self.doc.set_text(self.id, text);
    }

    /// Text of the first child tagged `tag`, if any.
    pub fn child_text(&self, tag: &str) -> Option<&str> {
        self.view().child(tag).and_then(|c| c.text())
    }

    /// Mutable view of the first child tagged `tag`.
    pub fn child_mut(&mut self, tag: &str) -> Option<NodeMut<'_>> {
        let id = self.view().child(tag)?.id();
        Some(NodeMut { doc: &mut *self.doc, id })
    }

    /// Runs `edit` on every child tagged `tag`, in document order.
    pub fn for_each_child(&mut self, tag: &str, mut edit: impl FnMut(&mut NodeMut<'_>)) {
        let ids: Vec<NodeId> = self.view().children_named(tag).iter().map(|c| c.id()).collect();
        for id in ids {
            edit(&mut NodeMut { doc: &mut *self.doc, id });
        }
    }

    /// Appends a new empty child element and returns its handle.
    pub fn append_child(&mut self, tag: impl AsRef<str>) -> NodeId {
        self.doc.append_new(self.id, tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (Document, NodeId, NodeId, NodeId) {
        let mut doc = Document::new("data");
        let root = doc.root();
        let a = doc.append_new(root, "a");
        let b = doc.append_new(root, "b");
        let c = doc.append_new(a, "c");
        (doc, a, b, c)
    }

    #[test]
    fn test_append_sets_parent() {
        let (doc, a, b, c) = sample();
        assert_eq!(doc.parent(a), Some(doc.root()));
        assert_eq!(doc.parent(c), Some(a));
        assert_eq!(doc.parent(doc.root()), None);
        assert_eq!(doc.children(doc.root()), vec![a, b]);
    }

    #[test]
    fn test_remove_takes_subtree() {
        let (mut doc, a, b, _) = sample();
        assert!(doc.remove(a));
        assert_eq!(doc.children(doc.root()), vec![b]);
        assert_eq!(doc.descendants_or_self(doc.root()), vec![doc.root(), b]);
    }

    #[test]
    fn test_root_cannot_be_removed() {
        let (mut doc, a, _, _) = sample();
        assert!(!doc.remove(doc.root()));
        assert_eq!(doc.children(doc.root())[0], a);
    }

    #[test]
    fn test_attributes_keep_order() {
        let mut doc = Document::new("cloud");
        let root = doc.root();
        doc.set_attr(root, "domain", "example.com");
        doc.set_attr(root, "port", "80");
        doc.set_attr(root, "domain", "other.com");
        assert_eq!(
            doc.attributes(root),
            vec![
                ("domain".to_string(), "other.com".to_string()),
                ("port".to_string(), "80".to_string())
            ]
        );
        assert_eq!(doc.remove_attr(root, "domain").as_deref(), Some("other.com"));
        assert_eq!(doc.attr(root, "domain"), None);
        assert_eq!(doc.attr(root, "never-set"), None);
    }

    #[test]
    fn test_prefixed_names_stay_distinct() {
        let mut doc = Document::new("channel");
        let root = doc.root();
        doc.append_new(root, "atom:link");
        doc.append_new(root, "link");
        let tags: Vec<_> = doc.node(root).children().map(|c| c.tag()).collect();
        assert_eq!(tags, vec!["atom:link", "link"]);
        assert_eq!(doc.node(root).child("link").map(|c| c.id()), Some(doc.children(root)[1]));
    }

    #[test]
    fn test_text_is_leading_text_node() {
        let (mut doc, a, _, _) = sample();
        assert_eq!(doc.text(a), None);
        doc.set_text(a, Some("hello".to_string()));
        assert_eq!(doc.text(a), Some("hello"));
        doc.set_text(a, Some("again".to_string()));
        assert_eq!(doc.text(a), Some("again"));
        assert_eq!(doc.children(a).len(), 1);
        doc.set_text(a, None);
        assert_eq!(doc.text(a), None);
    }

    #[test]
    fn test_import_deep_copies() {
        let (mut source, a, _, c) = sample();
        source.set_attr(a, "k", "v");
        source.set_text(c, Some("inner".to_string()));

        let mut target = Document::new("out");
        let root = target.root();
        let copy = target.import(root, &source, a);
        assert_eq!(target.tag(copy), "a");
        assert_eq!(target.attr(copy, "k"), Some("v"));
        let child = target.node(copy).child("c").unwrap();
        assert_eq!(child.text(), Some("inner"));
        assert_eq!(source.children(source.root()).len(), 2);
    }

    #[test]
    fn test_descendants_in_document_order() {
        let (doc, a, b, c) = sample();
        assert_eq!(doc.descendants_or_self(doc.root()), vec![doc.root(), a, c, b]);
    }

    #[test]
    fn test_node_mut_edits() {
        let (mut doc, a, _, c) = sample();
        doc.set_text(c, Some("hello".to_string()));
        let mut node = doc.node_mut(a);
        assert_eq!(node.child_text("c"), Some("hello"));
        node.set_tag("z");
        node.set_attr("k", "v");
        let added = node.append_child("new");
        assert_eq!(doc.tag(a), "z");
        assert_eq!(doc.attr(a, "k"), Some("v"));
        assert_eq!(doc.parent(added), Some(a));
    }

    #[test]
    fn test_node_mut_edits_children() {
        let (mut doc, a, _, c) = sample();
        let second = doc.append_new(a, "c");
        let mut node = doc.node_mut(a);

        node.child_mut("c").unwrap().set_text(Some("first".to_string()));
        node.for_each_child("c", |child| child.set_attr("seen", "yes"));
        assert!(node.child_mut("missing").is_none());

        assert_eq!(doc.text(c), Some("first"));
        assert_eq!(doc.attr(c, "seen"), Some("yes"));
        assert_eq!(doc.attr(second, "seen"), Some("yes"));
    }
}
