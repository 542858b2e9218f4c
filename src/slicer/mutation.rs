use std::collections::HashSet;
use std::fmt;

use crate::xml::{Document, NodeId, NodeMut, Query, QueryError};

/// Transform run on every node a mutation's query selects. Returning `true`
/// marks the node for removal.
pub type Transform = Box<dyn Fn(&mut NodeMut<'_>) -> bool>;

/// A query paired with a transform.
///
/// Transforms may edit the node they are handed and its descendants (tag,
/// attributes, text, appended children). Removal happens only through the return value, after
/// every match has been visited.
pub struct Mutation {
    query: Query,
    transform: Transform,
}

impl Mutation {
    /// Builds a mutation from query text.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError`] if the query is malformed or absolute.
    pub fn new<F>(query: &str, transform: F) -> Result<Self, QueryError>
    where
        F: Fn(&mut NodeMut<'_>) -> bool + 'static,
    {
        Ok(Self::from_query(Query::parse(query)?, transform))
    }

    pub fn from_query<F>(query: Query, transform: F) -> Self
    where
        F: Fn(&mut NodeMut<'_>) -> bool + 'static,
    {
        Self {
            query,
            transform: Box::new(transform),
        }
    }

    pub fn query(&self) -> &Query {
        &self.query
    }
}

impl fmt::Debug for Mutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mutation")
            .field("query", &self.query.as_str())
            .finish_non_exhaustive()
    }
}

/// Applies one mutation to the tree below `root` and returns the number of
/// removed subtrees.
///
/// All matches are visited in document order before any removal, so a
/// transform never observes a partially pruned tree. A match without a
/// parent cannot be removed and is left in place.
pub fn apply(doc: &mut Document, root: NodeId, mutation: &Mutation) -> usize {
    let matches = mutation.query.select(doc, root);

    let mut doomed = Vec::new();
    for node in matches {
        if (mutation.transform)(&mut doc.node_mut(node)) {
            doomed.push(node);
        }
    }

    // Nodes under an already queued ancestor go away with it.
    let queued: HashSet<NodeId> = doomed.iter().copied().collect();
    doomed.retain(|&node| {
        let mut ancestor = doc.parent(node);
        while let Some(current) = ancestor {
            if queued.contains(&current) {
                return false;
            }
            ancestor = doc.parent(current);
        }
        true
    });

    let mut removed = 0;
    for node in doomed {
        if doc.remove(node) {
            removed += 1;
        } else {
            tracing::warn!(
                query = %mutation.query,
                tag = doc.tag(node),
                "cannot remove an element without a parent; skipping"
            );
        }
    }

    tracing::trace!(query = %mutation.query, removed, "applied mutation");
    removed
}

/// Applies mutations strictly in order; each one sees the effects of the
/// ones before it.
pub fn apply_all(doc: &mut Document, root: NodeId, mutations: &[Mutation]) -> usize {
    mutations.iter().map(|m| apply(doc, root, m)).sum()
}
