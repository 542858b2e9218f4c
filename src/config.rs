//! Slice definition files.
//!
//! A slice definition is written in TOML: the seed channel metadata, the
//! merge strategy and an ordered list of declarative mutations. An empty file
//! yields `SliceConfig::default()`. Unknown top-level keys are accepted but
//! logged as warnings, since they are most likely typos.
//!
//! ```toml
//! strategy = "union"
//! keep_unrecognized = false
//!
//! [channel]
//! title = "Space news"
//! link = "https://example.com/space"
//! description = "Only the NASA items"
//!
//! [[mutations]]
//! query = "./channel/item"
//! action = "keep_if"
//! child = "title"
//! starts_with = "NASA"
//! ```
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

use crate::rss::Channel;
use crate::slicer::{preserve_meta, union_meta, MergeStrategy, Mutation, SliceDefinition, Transform};
use crate::xml::{NodeMut, QueryError};

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read slice definition: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in slice definition: {0}")]
    Parse(#[from] toml::de::Error),

    /// SEC-014: Definition file exceeds maximum allowed size.
    #[error("Slice definition too large: {0}")]
    TooLarge(String),

    #[error("Invalid query in mutation #{index}: {source}")]
    Query {
        index: usize,
        #[source]
        source: QueryError,
    },
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Top-level slice definition file.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SliceConfig {
    /// Seed channel metadata.
    pub channel: Channel,

    pub strategy: StrategyName,

    /// Copy unrecognized channel children into the output.
    pub keep_unrecognized: bool,

    /// Applied in order to every input feed.
    pub mutations: Vec<MutationConfig>,
}

/// Named merge strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyName {
    /// Field-wise union, earlier values win.
    #[default]
    Union,
    /// Metadata of the last input wins.
    Preserve,
}

impl StrategyName {
    pub fn strategy(self) -> MergeStrategy {
        match self {
            StrategyName::Union => union_meta,
            StrategyName::Preserve => preserve_meta,
        }
    }
}

/// One `[[mutations]]` entry: a query plus the action applied to each match.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MutationConfig {
    pub query: String,
    #[serde(flatten)]
    pub action: Action,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    /// Remove every match.
    Remove,
    Retag {
        tag: String,
    },
    SetAttribute {
        name: String,
        value: String,
    },
    RemoveAttribute {
        name: String,
    },
    SetText {
        text: String,
    },
    /// Remove matches for which the condition does not hold.
    KeepIf(Condition),
    /// Remove matches for which the condition holds.
    RemoveIf(Condition),
}

/// Text test on a matched element, or on one of its children.
///
/// Every given test must pass. An element without the tested text never
/// matches.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Condition {
    /// Test the text of this child instead of the element's own text.
    pub child: Option<String>,
    pub equals: Option<String>,
    pub contains: Option<String>,
    pub starts_with: Option<String>,
}

impl Condition {
    pub fn matches(&self, node: &NodeMut<'_>) -> bool {
        let text = match &self.child {
            Some(child) => node.child_text(child),
            None => node.text(),
        };
        let Some(text) = text else {
            return false;
        };

        self.equals.as_deref().map_or(true, |s| text == s)
            && self.contains.as_deref().map_or(true, |s| text.contains(s))
            && self.starts_with.as_deref().map_or(true, |s| text.starts_with(s))
    }
}

impl Action {
    /// Compiles the action into a mutation transform.
    pub fn into_transform(self) -> Transform {
        match self {
            Action::Remove => Box::new(|_: &mut NodeMut<'_>| true),
            Action::Retag { tag } => Box::new(move |node: &mut NodeMut<'_>| {
                node.set_tag(tag.as_str());
                false
            }),
            Action::SetAttribute { name, value } => Box::new(move |node: &mut NodeMut<'_>| {
                node.set_attr(name.as_str(), value.as_str());
                false
            }),
            Action::RemoveAttribute { name } => Box::new(move |node: &mut NodeMut<'_>| {
                node.remove_attr(&name);
                false
            }),
            Action::SetText { text } => Box::new(move |node: &mut NodeMut<'_>| {
                node.set_text(Some(text.clone()));
                false
            }),
            Action::KeepIf(condition) => Box::new(move |node: &mut NodeMut<'_>| !condition.matches(node)),
            Action::RemoveIf(condition) => Box::new(move |node: &mut NodeMut<'_>| condition.matches(node)),
        }
    }
}

impl SliceConfig {
    /// SEC-014: Maximum definition file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    /// Top-level keys recognized in a definition file.
    const KNOWN_KEYS: [&'static str; 4] = ["channel", "strategy", "keep_unrecognized", "mutations"];

    /// Load a slice definition from a TOML file.
    ///
    /// - Missing file → `Err(ConfigError::Io)`
    /// - Empty file → `Ok(SliceConfig::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → accepted, logged as warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        // SEC-014: Check file size before reading to prevent memory exhaustion.
        let meta = std::fs::metadata(path)?;
        if meta.len() > Self::MAX_FILE_SIZE {
            return Err(ConfigError::TooLarge(format!(
                "Slice definition is {} bytes (max {} bytes)",
                meta.len(),
                Self::MAX_FILE_SIZE
            )));
        }

        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml(&content)?;
        tracing::info!(
            path = %path.display(),
            mutations = config.mutations.len(),
            strategy = ?config.strategy,
            "Loaded slice definition"
        );
        Ok(config)
    }

    /// Parse a slice definition from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            tracing::debug!("Slice definition is empty, using defaults");
            return Ok(Self::default());
        }

        // Parse the TOML content first as a raw table to detect unknown keys
        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !Self::KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in slice definition, ignoring");
                }
            }
        }

        Ok(toml::from_str(content)?)
    }

    /// Compile queries and actions into a [`SliceDefinition`].
    pub fn into_definition(self) -> Result<SliceDefinition, ConfigError> {
        let mutations = self
            .mutations
            .into_iter()
            .enumerate()
            .map(|(index, m)| {
                Mutation::new(&m.query, m.action.into_transform())
                    .map_err(|source| ConfigError::Query { index, source })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(SliceDefinition::new(self.channel)
            .with_mutations(mutations)
            .keep_unrecognized(self.keep_unrecognized)
            .with_strategy(self.strategy.strategy()))
    }
}

// ============================================================================
// Tests
// ============================================================================
