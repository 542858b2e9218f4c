//! Relative, ElementPath-style queries over a [`Document`].
//!
//! Supported syntax:
//!
//! - `.` the context node, `..` its parent
//! - `tag` children with that tag, `*` any child
//! - `//` descendants (`.//item` selects every `item` below the context)
//! - a trailing `/` selects every child (`./` is equivalent to `./*`)
//! - predicates: `[@attr]`, `[@attr='value']`, `[tag]`, `[tag='text']`,
//!   `[n]` (1-based position among the step's matches), `[last()]`

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use super::tree::{Document, NodeId};

/// Errors produced while compiling a query string.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("empty query")]
    Empty,

    #[error("absolute query '{0}' is not supported; queries are relative to a node")]
    Absolute(String),

    #[error("unclosed predicate or quote in query '{0}'")]
    Unclosed(String),

    #[error("invalid predicate '[{predicate}]' in query '{query}'")]
    InvalidPredicate { query: String, predicate: String },

    #[error("invalid step '{step}' in query '{query}'")]
    InvalidStep { query: String, step: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum NameTest {
    Any,
    Tag(String),
}

impl NameTest {
    fn matches(&self, tag: &str) -> bool {
        match self {
            NameTest::Any => true,
            NameTest::Tag(t) => t == tag,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Predicate {
    HasAttr(String),
    AttrEquals(String, String),
    HasChild(String),
    ChildTextEquals(String, String),
    Position(usize),
    Last,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Step {
    SelfNode,
    Parent,
    Child(NameTest, Vec<Predicate>),
    Descendant(NameTest, Vec<Predicate>),
}

/// A compiled query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    source: String,
    steps: Vec<Step>,
}

impl Query {
    pub fn parse(source: &str) -> Result<Self, QueryError> {
        let trimmed = source.trim();
        if trimmed.is_empty() {
            return Err(QueryError::Empty);
        }
        if trimmed.starts_with('/') {
            return Err(QueryError::Absolute(trimmed.to_string()));
        }

        let segments = split_segments(trimmed)?;
        let last = segments.len() - 1;
        let mut steps = Vec::with_capacity(segments.len());
        let mut descendant = false;

        for (i, segment) in segments.iter().enumerate() {
            if segment.is_empty() {
                if i == last {
                    // Trailing slash: every child (or every descendant after `//`).
                    steps.push(make_step(descendant, NameTest::Any, Vec::new()));
                } else {
                    descendant = true;
                }
                continue;
            }

            match *segment {
                "." if !descendant => steps.push(Step::SelfNode),
                ".." if !descendant => steps.push(Step::Parent),
                _ => {
                    let (name, predicates) = parse_segment(trimmed, segment)?;
                    steps.push(make_step(descendant, name, predicates));
                }
            }
            descendant = false;
        }

        Ok(Self {
            source: trimmed.to_string(),
            steps,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Evaluates the query with `context` as the starting node.
    ///
    /// The result is ordered by first discovery and contains no duplicates.
    pub fn select(&self, doc: &Document, context: NodeId) -> Vec<NodeId> {
        let mut current = vec![context];
        for step in &self.steps {
            let mut seen = HashSet::new();
            let mut next = Vec::new();
            for &node in &current {
                for found in eval_step(doc, node, step) {
                    if seen.insert(found) {
                        next.push(found);
                    }
                }
            }
            current = next;
            if current.is_empty() {
                break;
            }
        }
        current
    }
}

impl FromStr for Query {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn make_step(descendant: bool, name: NameTest, predicates: Vec<Predicate>) -> Step {
    if descendant {
        Step::Descendant(name, predicates)
    } else {
        Step::Child(name, predicates)
    }
}

/// Splits on `/` outside of predicates and quotes.
fn split_segments(query: &str) -> Result<Vec<&str>, QueryError> {
    let mut segments = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;

    for (i, c) in query.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(c),
            (None, '[') => depth += 1,
            (None, ']') => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| QueryError::Unclosed(query.to_string()))?;
            }
            (None, '/') if depth == 0 => {
                segments.push(&query[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }

    if depth != 0 || quote.is_some() {
        return Err(QueryError::Unclosed(query.to_string()));
    }
    segments.push(&query[start..]);
    Ok(segments)
}

fn parse_segment(query: &str, segment: &str) -> Result<(NameTest, Vec<Predicate>), QueryError> {
    let (name, mut rest) = match segment.find('[') {
        Some(pos) => (&segment[..pos], &segment[pos..]),
        None => (segment, ""),
    };

    let name = match name {
        "*" => NameTest::Any,
        n if is_valid_name(n) => NameTest::Tag(n.to_string()),
        _ => {
            return Err(QueryError::InvalidStep {
                query: query.to_string(),
                step: segment.to_string(),
            })
        }
    };

    let mut predicates = Vec::new();
    while !rest.is_empty() {
        let close = find_predicate_end(rest).ok_or_else(|| QueryError::Unclosed(query.to_string()))?;
        let body = &rest[1..close];
        predicates.push(parse_predicate(query, body)?);
        rest = &rest[close + 1..];
        if !rest.is_empty() && !rest.starts_with('[') {
            return Err(QueryError::InvalidStep {
                query: query.to_string(),
                step: segment.to_string(),
            });
        }
    }

    Ok((name, predicates))
}

/// Index of the `]` closing the predicate that opens at `s[0]`.
fn find_predicate_end(s: &str) -> Option<usize> {
    let mut quote: Option<char> = None;
    for (i, c) in s.char_indices().skip(1) {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(c),
            (None, ']') => return Some(i),
            _ => {}
        }
    }
    None
}

fn parse_predicate(query: &str, body: &str) -> Result<Predicate, QueryError> {
    let invalid = || QueryError::InvalidPredicate {
        query: query.to_string(),
        predicate: body.to_string(),
    };
    let body = body.trim();

    if body == "last()" {
        return Ok(Predicate::Last);
    }
    if let Ok(n) = body.parse::<usize>() {
        return if n == 0 { Err(invalid()) } else { Ok(Predicate::Position(n)) };
    }

    let (target, value) = match body.split_once('=') {
        Some((target, value)) => (target.trim(), Some(unquote(value.trim()).ok_or_else(invalid)?)),
        None => (body, None),
    };

    if let Some(attr) = target.strip_prefix('@') {
        if !is_valid_name(attr) {
            return Err(invalid());
        }
        return Ok(match value {
            Some(v) => Predicate::AttrEquals(attr.to_string(), v.to_string()),
            None => Predicate::HasAttr(attr.to_string()),
        });
    }

    if !is_valid_name(target) {
        return Err(invalid());
    }
    Ok(match value {
        Some(v) => Predicate::ChildTextEquals(target.to_string(), v.to_string()),
        None => Predicate::HasChild(target.to_string()),
    })
}

fn unquote(s: &str) -> Option<&str> {
    let first = s.chars().next()?;
    if (first == '\'' || first == '"') && s.len() >= 2 && s.ends_with(first) {
        Some(&s[1..s.len() - 1])
    } else {
        None
    }
}

fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | ':'))
}

fn eval_step(doc: &Document, node: NodeId, step: &Step) -> Vec<NodeId> {
    match step {
        Step::SelfNode => vec![node],
        Step::Parent => doc.parent(node).into_iter().collect(),
        Step::Child(name, predicates) => select_children(doc, node, name, predicates),
        Step::Descendant(name, predicates) => doc
            .descendants_or_self(node)
            .into_iter()
            .flat_map(|d| select_children(doc, d, name, predicates))
            .collect(),
    }
}

fn select_children(doc: &Document, node: NodeId, name: &NameTest, predicates: &[Predicate]) -> Vec<NodeId> {
    let mut candidates: Vec<NodeId> = doc
        .children(node)
        .into_iter()
        .filter(|&c| name.matches(doc.tag(c)))
        .collect();

    for predicate in predicates {
        candidates = match predicate {
            Predicate::Position(n) => candidates.get(n - 1).copied().into_iter().collect(),
            Predicate::Last => candidates.last().copied().into_iter().collect(),
            other => candidates
                .into_iter()
                .filter(|&c| matches_predicate(doc, c, other))
                .collect(),
        };
    }
    candidates
}

fn matches_predicate(doc: &Document, node: NodeId, predicate: &Predicate) -> bool {
    let mut children = doc.children(node).into_iter();
    match predicate {
        Predicate::HasAttr(attr) => doc.attr(node, attr).is_some(),
        Predicate::AttrEquals(attr, value) => doc.attr(node, attr) == Some(value.as_str()),
        Predicate::HasChild(tag) => children.any(|c| doc.tag(c) == tag),
        Predicate::ChildTextEquals(tag, value) => children.any(|c| {
            doc.tag(c) == tag && doc.text(c).unwrap_or_default().trim() == value.as_str()
        }),
        Predicate::Position(_) | Predicate::Last => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::Document;

    fn feed() -> Document {
        Document::parse_str(
            r#"<rss version="2.0">
  <channel>
    <title>Feed</title>
    <item><title>NASA one</title><guid>1</guid></item>
    <item kind="video"><title>Other</title><guid>2</guid></item>
    <item><guid>3</guid></item>
  </channel>
</rss>"#,
        )
        .unwrap()
    }

    fn tags(doc: &Document, nodes: &[NodeId]) -> Vec<String> {
        nodes.iter().map(|&n| doc.tag(n).to_string()).collect()
    }

    fn select(doc: &Document, query: &str) -> Vec<NodeId> {
        Query::parse(query).unwrap().select(doc, doc.root())
    }

    #[test]
    fn test_trailing_slash_selects_children() {
        let doc = Document::parse_str("<data><a/><b/><c/></data>").unwrap();
        assert_eq!(tags(&doc, &select(&doc, "./")), vec!["a", "b", "c"]);
        assert_eq!(tags(&doc, &select(&doc, "*")), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_child_path() {
        let doc = feed();
        assert_eq!(select(&doc, "./channel/item").len(), 3);
        assert_eq!(select(&doc, "channel/item/guid").len(), 3);
        assert_eq!(select(&doc, "./channel/item/title").len(), 2);
    }

    #[test]
    fn test_descendant_path() {
        let doc = feed();
        assert_eq!(select(&doc, ".//title").len(), 3);
        assert_eq!(select(&doc, ".//item/guid").len(), 3);
    }

    #[test]
    fn test_self_and_parent_dedupe() {
        let doc = feed();
        let parents = select(&doc, "./channel/item/..");
        assert_eq!(tags(&doc, &parents), vec!["channel"]);
        assert_eq!(select(&doc, "."), vec![doc.root()]);
    }

    #[test]
    fn test_predicates() {
        let doc = feed();
        assert_eq!(select(&doc, "./channel/item[@kind]").len(), 1);
        assert_eq!(select(&doc, "./channel/item[@kind='video']").len(), 1);
        assert_eq!(select(&doc, "./channel/item[@kind='audio']").len(), 0);
        assert_eq!(select(&doc, "./channel/item[title]").len(), 2);
        assert_eq!(select(&doc, "./channel/item[title='Other']").len(), 1);

        let second = select(&doc, "./channel/item[2]");
        assert_eq!(doc.attr(second[0], "kind"), Some("video"));
        let last = select(&doc, "./channel/item[last()]");
        assert_eq!(doc.node(last[0]).child("guid").and_then(|g| g.text()), Some("3"));
    }

    #[test]
    fn test_predicate_value_may_contain_slash() {
        let doc = Document::parse_str(r#"<c><category domain="http://x/y">a</category></c>"#).unwrap();
        assert_eq!(select(&doc, "./category[@domain='http://x/y']").len(), 1);
    }

    #[test]
    fn test_rejects_malformed_queries() {
        assert_eq!(Query::parse(""), Err(QueryError::Empty));
        assert!(matches!(Query::parse("/rss/channel"), Err(QueryError::Absolute(_))));
        assert!(matches!(Query::parse("./item[@a"), Err(QueryError::Unclosed(_))));
        assert!(matches!(Query::parse("./item[0]"), Err(QueryError::InvalidPredicate { .. })));
        assert!(matches!(Query::parse("./item[@a=b]"), Err(QueryError::InvalidPredicate { .. })));
        assert!(matches!(Query::parse("./it em"), Err(QueryError::InvalidStep { .. })));
    }

    #[test]
    fn test_display_round_trips_source() {
        let query: Query = " ./channel/item ".parse().unwrap();
        assert_eq!(query.to_string(), "./channel/item");
    }
}
