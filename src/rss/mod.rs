//! RSS 2.0 channel metadata.
//!
//! Plain record types for the `<channel>` element and its structured
//! children. Each type implements [`XmlRecord`](crate::mapping::XmlRecord),
//! so it renders and parses through the generic mapping engine. Items are not
//! modelled; they are passed through as opaque elements.

mod types;

pub use types::{Category, Channel, Cloud, Image, SkipDays, SkipHours, TextInput};
