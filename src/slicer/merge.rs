//! Channel metadata merge strategies.
//!
//! A strategy folds two channels into one. The slicer starts from the seed
//! metadata of the slice definition and folds in each input's channel, so the
//! left operand is the accumulated result and the right one the next input.

use chrono::{DateTime, FixedOffset};

use crate::rss::{Category, Channel, Cloud, Image, SkipDays, SkipHours, TextInput};

/// Folds two channels into one.
pub type MergeStrategy = fn(Channel, Channel) -> Channel;

/// Field-wise union: each field keeps the left value if it is truthy and
/// takes the right value otherwise.
///
/// Empty strings, zero numbers and empty lists are falsy, so an empty title
/// or a TTL of zero on the left is replaced like a missing one.
pub fn union_meta(left: Channel, right: Channel) -> Channel {
    Channel {
        title: pick(left.title, right.title),
        link: pick(left.link, right.link),
        description: pick(left.description, right.description),
        language: pick(left.language, right.language),
        copyright: pick(left.copyright, right.copyright),
        managing_editor: pick(left.managing_editor, right.managing_editor),
        web_master: pick(left.web_master, right.web_master),
        pub_date: pick(left.pub_date, right.pub_date),
        last_build_date: pick(left.last_build_date, right.last_build_date),
        categories: pick(left.categories, right.categories),
        generator: pick(left.generator, right.generator),
        docs: pick(left.docs, right.docs),
        cloud: pick(left.cloud, right.cloud),
        ttl: pick(left.ttl, right.ttl),
        image: pick(left.image, right.image),
        rating: pick(left.rating, right.rating),
        text_input: pick(left.text_input, right.text_input),
        skip_hours: pick(left.skip_hours, right.skip_hours),
        skip_days: pick(left.skip_days, right.skip_days),
    }
}

/// Keeps the right operand, i.e. the metadata of the last input feed.
pub fn preserve_meta(_left: Channel, right: Channel) -> Channel {
    right
}

fn pick<T: Truthy>(left: T, right: T) -> T {
    if left.is_truthy() {
        left
    } else {
        right
    }
}

trait Truthy {
    fn is_truthy(&self) -> bool;
}

impl Truthy for String {
    fn is_truthy(&self) -> bool {
        !self.is_empty()
    }
}

impl Truthy for u32 {
    fn is_truthy(&self) -> bool {
        *self != 0
    }
}

impl<T> Truthy for Vec<T> {
    fn is_truthy(&self) -> bool {
        !self.is_empty()
    }
}

impl<T: Truthy> Truthy for Option<T> {
    fn is_truthy(&self) -> bool {
        self.as_ref().is_some_and(Truthy::is_truthy)
    }
}

macro_rules! always_truthy {
    ($($t:ty),*) => {
        $(
            impl Truthy for $t {
                fn is_truthy(&self) -> bool {
                    true
                }
            }
        )*
    };
}

always_truthy!(DateTime<FixedOffset>, Category, Cloud, Image, TextInput, SkipHours, SkipDays);

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_union_meta_prefers_left() {
        let left = Channel {
            language: Some("en-us".into()),
            ..Channel::new("title", "link", "")
        };
        let right = Channel {
            language: Some("de".into()),
            copyright: Some("(c) nobody".into()),
            ..Channel::new("other title", "other link", "desc")
        };

        let expected = Channel {
            language: Some("en-us".into()),
            copyright: Some("(c) nobody".into()),
            ..Channel::new("title", "link", "desc")
        };
        assert_eq!(union_meta(left, right), expected);
    }

    #[test]
    fn test_union_meta_falsy_values_are_replaced() {
        let left = Channel {
            ttl: Some(0),
            categories: Some(Vec::new()),
            language: Some(String::new()),
            ..Channel::new("", "l", "d")
        };
        let right = Channel {
            ttl: Some(60),
            categories: Some(vec![Category {
                text: "news".into(),
                domain: None,
            }]),
            language: None,
            ..Channel::new("right", "l2", "d2")
        };

        let merged = union_meta(left, right);
        assert_eq!(merged.title, "right");
        assert_eq!(merged.link, "l");
        assert_eq!(merged.ttl, Some(60));
        assert_eq!(merged.categories.map(|c| c.len()), Some(1));
        assert_eq!(merged.language, None);
    }

    #[test]
    fn test_union_meta_nested_records_always_win() {
        let left = Channel {
            skip_days: Some(SkipDays::default()),
            ..Channel::new("t", "l", "d")
        };
        let right = Channel {
            skip_days: Some(SkipDays {
                days: vec!["Monday".into()],
            }),
            ..Channel::new("t", "l", "d")
        };
        assert_eq!(union_meta(left, right).skip_days, Some(SkipDays::default()));
    }

    #[test]
    fn test_preserve_meta_keeps_right() {
        let left = Channel::new("a", "b", "c");
        let right = Channel::new("x", "y", "z");
        assert_eq!(preserve_meta(left, right.clone()), right);
    }
}
