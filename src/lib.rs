//! Combine RSS feeds into one.
//!
//! Inputs are edited with query-selected [mutations](slicer::Mutation), their
//! channel metadata is merged with a pluggable
//! [strategy](slicer::MergeStrategy), and the surviving items are collected
//! under the merged channel. Channel metadata is mapped to and from XML by a
//! generic, descriptor-driven engine ([`mapping`]).

pub mod config;
pub mod mapping;
pub mod rss;
pub mod slicer;
pub mod util;
pub mod xml;
