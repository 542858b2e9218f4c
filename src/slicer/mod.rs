//! Combines several RSS documents into one.
//!
//! Slicing runs in three phases:
//!
//! - **Mutation**: every [`Mutation`] of the definition is applied to every
//!   input tree, in order
//! - **Merge**: the seed metadata is folded with each input's channel
//!   metadata through the definition's [`MergeStrategy`]
//! - **Assembly**: the merged channel is rendered into a fresh `rss`
//!   document and every surviving `item` is copied after it
//!
//! # Example
//!
//! ```
//! use rss_slicer::rss::Channel;
//! use rss_slicer::slicer::{slice_feeds, Mutation, SliceDefinition};
//! use rss_slicer::xml::Document;
//!
//! let feed = "<rss><channel><title>T</title><link>L</link><description>D</description>\
//!             <item><guid>1</guid></item></channel></rss>";
//! let mut inputs = vec![Document::parse_str(feed).unwrap()];
//! let definition = SliceDefinition::new(Channel::new("Combined", "https://example.com", "All feeds"))
//!     .with_mutation(Mutation::new("./channel/item/guid", |_| true).unwrap());
//!
//! let output = slice_feeds(&mut inputs, &definition).unwrap();
//! assert_eq!(output.node(output.root()).attr("version"), Some("2.0"));
//! ```

mod merge;
mod mutation;

use thiserror::Error;

use crate::mapping::{self, MappingError, XmlRecord};
use crate::rss::Channel;
use crate::xml::{Document, NodeId};

pub use merge::{preserve_meta, union_meta, MergeStrategy};
pub use mutation::{apply, apply_all, Mutation, Transform};

/// Errors that can occur while slicing feeds.
#[derive(Debug, Error)]
pub enum SliceError {
    /// An input document has no `channel` element below its root.
    #[error("input feed #{index} has no <channel> element")]
    NoChannel { index: usize },

    #[error("invalid channel metadata: {0}")]
    Mapping(#[from] MappingError),
}

/// Describes how a set of feeds is combined.
#[derive(Debug)]
pub struct SliceDefinition {
    /// Seed metadata; the left operand of the first merge.
    pub meta: Channel,
    pub mutations: Vec<Mutation>,
    /// Copy channel children that are neither items nor channel metadata
    /// into the output.
    pub keep_unrecognized: bool,
    pub strategy: MergeStrategy,
}

impl SliceDefinition {
    /// Definition without mutations, merging with [`union_meta`].
    pub fn new(meta: Channel) -> Self {
        Self {
            meta,
            mutations: Vec::new(),
            keep_unrecognized: false,
            strategy: union_meta,
        }
    }

    pub fn with_mutation(mut self, mutation: Mutation) -> Self {
        self.mutations.push(mutation);
        self
    }

    pub fn with_mutations(mut self, mutations: impl IntoIterator<Item = Mutation>) -> Self {
        self.mutations.extend(mutations);
        self
    }

    pub fn keep_unrecognized(mut self, keep: bool) -> Self {
        self.keep_unrecognized = keep;
        self
    }

    pub fn with_strategy(mut self, strategy: MergeStrategy) -> Self {
        self.strategy = strategy;
        self
    }
}

/// Applies `definition` to `inputs` and assembles the combined document.
///
/// The input trees are mutated in place. Items appear in input order, then
/// document order.
///
/// # Errors
///
/// Returns [`SliceError::NoChannel`] if an input has no `channel` child after
/// mutation, and [`SliceError::Mapping`] if a channel's metadata cannot be
/// parsed or the merged metadata cannot be rendered. No output is produced in
/// either case.
pub fn slice_feeds(inputs: &mut [Document], definition: &SliceDefinition) -> Result<Document, SliceError> {
    tracing::debug!(
        inputs = inputs.len(),
        mutations = definition.mutations.len(),
        keep_unrecognized = definition.keep_unrecognized,
        "slicing feeds"
    );

    for doc in inputs.iter_mut() {
        let root = doc.root();
        apply_all(doc, root, &definition.mutations);
    }

    let channels = inputs
        .iter()
        .enumerate()
        .map(|(index, doc)| {
            doc.node(doc.root())
                .child("channel")
                .map(|channel| channel.id())
                .ok_or(SliceError::NoChannel { index })
        })
        .collect::<Result<Vec<NodeId>, _>>()?;

    let mut meta = definition.meta.clone();
    for (doc, &channel) in inputs.iter().zip(&channels) {
        let parsed: Channel = mapping::parse(doc.node(channel))?;
        meta = (definition.strategy)(meta, parsed);
    }

    let mut output = Document::new("rss");
    let root = output.root();
    output.set_attr(root, "version", "2.0");
    let out_channel = output.append_new(root, Channel::schema().tag_name());
    mapping::render_into(&meta.to_record(), &mut output, out_channel)?;

    if definition.keep_unrecognized {
        let known = Channel::schema().child_tags();
        for (doc, &channel) in inputs.iter().zip(&channels) {
            for child in doc.children(channel) {
                let tag = doc.tag(child);
                if tag == "item" || known.iter().any(|k| k == tag) {
                    continue;
                }
                tracing::trace!(tag, "keeping unrecognized channel element");
                output.import(out_channel, doc, child);
            }
        }
    }

    for (index, (doc, &channel)) in inputs.iter().zip(&channels).enumerate() {
        let items = doc.node(channel).children_named("item");
        tracing::debug!(index, items = items.len(), "collecting items");
        for item in items {
            output.import(out_channel, doc, item.id());
        }
    }

    Ok(output)
}
