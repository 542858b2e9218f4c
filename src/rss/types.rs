use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::mapping::{
    empty_list, null_value, FieldKind, FieldSchema, MappingError, Record, RecordSchema, TypeDecl, XmlRecord,
};
use crate::xml::NodeRef;

// ============================================================================
// Record types
// ============================================================================

/// Feed category, rendered as `<category domain="...">text</category>`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub text: String,
    #[serde(default)]
    pub domain: Option<String>,
}

/// Feed image (GIF, JPEG or PNG) shown with the channel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    pub url: String,
    pub title: String,
    pub link: String,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Publish-subscribe endpoint for update notifications. Every field is an
/// attribute of the `<cloud>` element.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cloud {
    pub domain: String,
    pub port: u16,
    pub path: String,
    pub register_procedure: String,
    pub protocol: String,
}

/// Text input box displayed with the channel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextInput {
    pub title: String,
    pub description: String,
    pub name: String,
    pub link: String,
}

/// Hours (GMT) in which aggregators may skip reading the feed. The range is
/// not validated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkipHours {
    #[serde(default)]
    pub hours: Vec<u8>,
}

/// Days of the week in which aggregators may skip reading the feed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkipDays {
    #[serde(default)]
    pub days: Vec<String>,
}

/// Metadata of an RSS channel.
///
/// `title`, `link` and `description` are required. An empty `categories`
/// list renders nothing, so it reads back as `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Channel {
    pub title: String,
    pub link: String,
    pub description: String,
    pub language: Option<String>,
    pub copyright: Option<String>,
    pub managing_editor: Option<String>,
    pub web_master: Option<String>,
    pub pub_date: Option<DateTime<FixedOffset>>,
    pub last_build_date: Option<DateTime<FixedOffset>>,
    pub categories: Option<Vec<Category>>,
    pub generator: Option<String>,
    pub docs: Option<String>,
    pub cloud: Option<Cloud>,
    pub ttl: Option<u32>,
    pub image: Option<Image>,
    pub rating: Option<String>,
    pub text_input: Option<TextInput>,
    pub skip_hours: Option<SkipHours>,
    pub skip_days: Option<SkipDays>,
}

impl Channel {
    /// Channel with only the required fields set.
    pub fn new(title: impl Into<String>, link: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            link: link.into(),
            description: description.into(),
            ..Self::default()
        }
    }
}

// ============================================================================
// Descriptor tables
// ============================================================================

static CATEGORY_FIELDS: [FieldSchema; 2] = [
    FieldSchema::new("text", TypeDecl::Kind(FieldKind::EmbeddedText, &TypeDecl::Str)),
    FieldSchema::optional("domain", &TypeDecl::Kind(FieldKind::Attribute, &TypeDecl::Str)),
];
static CATEGORY: RecordSchema = RecordSchema::new("Category", &CATEGORY_FIELDS).with_parse(parse_category);

static IMAGE_FIELDS: [FieldSchema; 6] = [
    FieldSchema::new("url", TypeDecl::Str),
    FieldSchema::new("title", TypeDecl::Str),
    FieldSchema::new("link", TypeDecl::Str),
    FieldSchema::optional("width", &TypeDecl::Int),
    FieldSchema::optional("height", &TypeDecl::Int),
    FieldSchema::optional("description", &TypeDecl::Str),
];
static IMAGE: RecordSchema = RecordSchema::new("Image", &IMAGE_FIELDS);

static CLOUD_FIELDS: [FieldSchema; 5] = [
    FieldSchema::new("domain", TypeDecl::Kind(FieldKind::Attribute, &TypeDecl::Str)),
    FieldSchema::new("port", TypeDecl::Kind(FieldKind::Attribute, &TypeDecl::Int)),
    FieldSchema::new("path", TypeDecl::Kind(FieldKind::Attribute, &TypeDecl::Str)),
    FieldSchema::new("register_procedure", TypeDecl::Kind(FieldKind::Attribute, &TypeDecl::Str)),
    FieldSchema::new("protocol", TypeDecl::Kind(FieldKind::Attribute, &TypeDecl::Str)),
];
static CLOUD: RecordSchema = RecordSchema::new("Cloud", &CLOUD_FIELDS);

static TEXT_INPUT_FIELDS: [FieldSchema; 4] = [
    FieldSchema::new("title", TypeDecl::Str),
    FieldSchema::new("description", TypeDecl::Str),
    FieldSchema::new("name", TypeDecl::Str),
    FieldSchema::new("link", TypeDecl::Str),
];
static TEXT_INPUT: RecordSchema = RecordSchema::new("TextInput", &TEXT_INPUT_FIELDS);

static SKIP_HOURS_FIELDS: [FieldSchema; 1] =
    [FieldSchema::new("hours", TypeDecl::List(&TypeDecl::Int)).with_default(empty_list)];
static SKIP_HOURS: RecordSchema = RecordSchema::new("SkipHours", &SKIP_HOURS_FIELDS);

static SKIP_DAYS_FIELDS: [FieldSchema; 1] = [FieldSchema::new("days", TypeDecl::List(&TypeDecl::Str))
    .with_default(empty_list)
    .with_item_tag("day")];
static SKIP_DAYS: RecordSchema = RecordSchema::new("SkipDays", &SKIP_DAYS_FIELDS);

static CATEGORY_DECL: TypeDecl = TypeDecl::Record(&CATEGORY);
static CATEGORY_LIST: TypeDecl = TypeDecl::List(&CATEGORY_DECL);
static IMAGE_DECL: TypeDecl = TypeDecl::Record(&IMAGE);
static CLOUD_DECL: TypeDecl = TypeDecl::Record(&CLOUD);
static TEXT_INPUT_DECL: TypeDecl = TypeDecl::Record(&TEXT_INPUT);
static SKIP_HOURS_DECL: TypeDecl = TypeDecl::Record(&SKIP_HOURS);
static SKIP_DAYS_DECL: TypeDecl = TypeDecl::Record(&SKIP_DAYS);

static CHANNEL_FIELDS: [FieldSchema; 19] = [
    FieldSchema::new("title", TypeDecl::Str),
    FieldSchema::new("link", TypeDecl::Str),
    FieldSchema::new("description", TypeDecl::Str),
    FieldSchema::optional("language", &TypeDecl::Str),
    FieldSchema::optional("copyright", &TypeDecl::Str),
    FieldSchema::optional("managing_editor", &TypeDecl::Str),
    FieldSchema::optional("web_master", &TypeDecl::Str),
    FieldSchema::optional("pub_date", &TypeDecl::DateTime),
    FieldSchema::optional("last_build_date", &TypeDecl::DateTime),
    FieldSchema::optional("categories", &CATEGORY_LIST),
    FieldSchema::optional("generator", &TypeDecl::Str),
    FieldSchema::optional("docs", &TypeDecl::Str),
    FieldSchema::optional("cloud", &CLOUD_DECL),
    FieldSchema::optional("ttl", &TypeDecl::Int),
    FieldSchema::optional("image", &IMAGE_DECL),
    FieldSchema::optional("rating", &TypeDecl::Str),
    FieldSchema::optional("text_input", &TEXT_INPUT_DECL),
    FieldSchema::optional("skip_hours", &SKIP_HOURS_DECL),
    FieldSchema::optional("skip_days", &SKIP_DAYS_DECL),
];
static CHANNEL: RecordSchema = RecordSchema::new("Channel", &CHANNEL_FIELDS);

/// A missing `<category>` text reads as the empty string rather than failing.
fn parse_category(node: NodeRef<'_>) -> Result<Record, MappingError> {
    Ok(Record::new(&CATEGORY)
        .with("text", node.text().unwrap_or_default())
        .with("domain", node.attr("domain")))
}

// ============================================================================
// XmlRecord implementations
// ============================================================================

impl XmlRecord for Category {
    fn schema() -> &'static RecordSchema {
        &CATEGORY
    }

    fn to_record(&self) -> Record {
        Record::new(&CATEGORY)
            .with("text", self.text.clone())
            .with("domain", self.domain.clone())
    }

    fn from_record(mut record: Record) -> Result<Self, MappingError> {
        Ok(Self {
            text: record.take_required("text")?,
            domain: record.take_optional("domain")?,
        })
    }
}

impl XmlRecord for Image {
    fn schema() -> &'static RecordSchema {
        &IMAGE
    }

    fn to_record(&self) -> Record {
        Record::new(&IMAGE)
            .with("url", self.url.clone())
            .with("title", self.title.clone())
            .with("link", self.link.clone())
            .with("width", self.width)
            .with("height", self.height)
            .with("description", self.description.clone())
    }

    fn from_record(mut record: Record) -> Result<Self, MappingError> {
        Ok(Self {
            url: record.take_required("url")?,
            title: record.take_required("title")?,
            link: record.take_required("link")?,
            width: record.take_optional("width")?,
            height: record.take_optional("height")?,
            description: record.take_optional("description")?,
        })
    }
}

impl XmlRecord for Cloud {
    fn schema() -> &'static RecordSchema {
        &CLOUD
    }

    fn to_record(&self) -> Record {
        Record::new(&CLOUD)
            .with("domain", self.domain.clone())
            .with("port", self.port)
            .with("path", self.path.clone())
            .with("register_procedure", self.register_procedure.clone())
            .with("protocol", self.protocol.clone())
    }

    fn from_record(mut record: Record) -> Result<Self, MappingError> {
        Ok(Self {
            domain: record.take_required("domain")?,
            port: record.take_required("port")?,
            path: record.take_required("path")?,
            register_procedure: record.take_required("register_procedure")?,
            protocol: record.take_required("protocol")?,
        })
    }
}

impl XmlRecord for TextInput {
    fn schema() -> &'static RecordSchema {
        &TEXT_INPUT
    }

    fn to_record(&self) -> Record {
        Record::new(&TEXT_INPUT)
            .with("title", self.title.clone())
            .with("description", self.description.clone())
            .with("name", self.name.clone())
            .with("link", self.link.clone())
    }

    fn from_record(mut record: Record) -> Result<Self, MappingError> {
        Ok(Self {
            title: record.take_required("title")?,
            description: record.take_required("description")?,
            name: record.take_required("name")?,
            link: record.take_required("link")?,
        })
    }
}

impl XmlRecord for SkipHours {
    fn schema() -> &'static RecordSchema {
        &SKIP_HOURS
    }

    fn to_record(&self) -> Record {
        Record::new(&SKIP_HOURS).with("hours", self.hours.clone())
    }

    fn from_record(mut record: Record) -> Result<Self, MappingError> {
        Ok(Self {
            hours: record.take_required("hours")?,
        })
    }
}

impl XmlRecord for SkipDays {
    fn schema() -> &'static RecordSchema {
        &SKIP_DAYS
    }

    fn to_record(&self) -> Record {
        Record::new(&SKIP_DAYS).with("days", self.days.clone())
    }

    fn from_record(mut record: Record) -> Result<Self, MappingError> {
        Ok(Self {
            days: record.take_required("days")?,
        })
    }
}

impl XmlRecord for Channel {
    fn schema() -> &'static RecordSchema {
        &CHANNEL
    }

    fn to_record(&self) -> Record {
        Record::new(&CHANNEL)
            .with("title", self.title.clone())
            .with("link", self.link.clone())
            .with("description", self.description.clone())
            .with("language", self.language.clone())
            .with("copyright", self.copyright.clone())
            .with("managing_editor", self.managing_editor.clone())
            .with("web_master", self.web_master.clone())
            .with("pub_date", self.pub_date)
            .with("last_build_date", self.last_build_date)
            .with("categories", self.categories.clone())
            .with("generator", self.generator.clone())
            .with("docs", self.docs.clone())
            .with("cloud", self.cloud.clone())
            .with("ttl", self.ttl)
            .with("image", self.image.clone())
            .with("rating", self.rating.clone())
            .with("text_input", self.text_input.clone())
            .with("skip_hours", self.skip_hours.clone())
            .with("skip_days", self.skip_days.clone())
    }

    fn from_record(mut record: Record) -> Result<Self, MappingError> {
        Ok(Self {
            title: record.take_required("title")?,
            link: record.take_required("link")?,
            description: record.take_required("description")?,
            language: record.take_optional("language")?,
            copyright: record.take_optional("copyright")?,
            managing_editor: record.take_optional("managing_editor")?,
            web_master: record.take_optional("web_master")?,
            pub_date: record.take_optional("pub_date")?,
            last_build_date: record.take_optional("last_build_date")?,
            categories: record.take_optional("categories")?,
            generator: record.take_optional("generator")?,
            docs: record.take_optional("docs")?,
            cloud: record.take_optional("cloud")?,
            ttl: record.take_optional("ttl")?,
            image: record.take_optional("image")?,
            rating: record.take_optional("rating")?,
            text_input: record.take_optional("text_input")?,
            skip_hours: record.take_optional("skip_hours")?,
            skip_days: record.take_optional("skip_days")?,
        })
    }
}

crate::record_values!(Category, Image, Cloud, TextInput, SkipHours, SkipDays, Channel);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::{parse, render};
    use crate::xml::Document;
    use pretty_assertions::assert_eq;

    fn roundtrip<T: XmlRecord>(value: &T) -> T {
        let doc = render(value).unwrap();
        parse(doc.node(doc.root())).unwrap()
    }

    fn parse_xml<T: XmlRecord>(xml: &str) -> Result<T, MappingError> {
        let doc = Document::parse_str(xml).unwrap();
        parse(doc.node(doc.root()))
    }

    fn render_xml<T: XmlRecord>(value: &T) -> String {
        let doc = render(value).unwrap();
        doc.node_to_string(doc.root()).unwrap()
    }

    #[test]
    fn test_category_roundtrip() {
        let category = Category {
            text: "text".into(),
            domain: Some("some.domain".into()),
        };
        assert_eq!(roundtrip(&category), category);
    }

    #[test]
    fn test_category_parse() {
        assert_eq!(
            parse_xml::<Category>(r#"<category domain="here it is">text</category>"#).unwrap(),
            Category {
                text: "text".into(),
                domain: Some("here it is".into()),
            }
        );
        assert_eq!(parse_xml::<Category>("<category/>").unwrap(), Category::default());
    }

    #[test]
    fn test_category_render() {
        let category = Category {
            text: "e".into(),
            domain: Some("hereitis".into()),
        };
        assert_eq!(render_xml(&category), r#"<category domain="hereitis">e</category>"#);
    }

    #[test]
    fn test_image_roundtrip() {
        let required = Image {
            url: "image".into(),
            title: "title".into(),
            link: "link".into(),
            ..Image::default()
        };
        assert_eq!(roundtrip(&required), required);

        let full = Image {
            url: "im".into(),
            title: "ti".into(),
            link: "li".into(),
            width: Some(1),
            height: Some(2),
            description: Some("desc".into()),
        };
        assert_eq!(roundtrip(&full), full);
    }

    #[test]
    fn test_image_missing_required_field() {
        let result = parse_xml::<Image>("<image><url>u</url><title>t</title></image>");
        assert_eq!(
            result.unwrap_err(),
            MappingError::MissingField {
                record: "Image",
                field: "link"
            }
        );
    }

    #[test]
    fn test_cloud_is_all_attributes() {
        let cloud = Cloud {
            domain: "domain".into(),
            port: 80,
            path: "/".into(),
            register_procedure: "doStuff".into(),
            protocol: "xml-rpc".into(),
        };
        assert_eq!(
            render_xml(&cloud),
            r#"<cloud domain="domain" port="80" path="/" registerProcedure="doStuff" protocol="xml-rpc"/>"#
        );
        assert_eq!(roundtrip(&cloud), cloud);
    }

    #[test]
    fn test_text_input_roundtrip() {
        let text_input = TextInput {
            title: "title".into(),
            description: "desc".into(),
            name: "name".into(),
            link: "link".into(),
        };
        assert_eq!(render_xml(&text_input).split('>').next(), Some("<textInput"));
        assert_eq!(roundtrip(&text_input), text_input);
    }

    #[test]
    fn test_skip_lists() {
        let skip_hours = SkipHours { hours: vec![1, 2, 3] };
        assert_eq!(
            render_xml(&skip_hours),
            "<skipHours><hour>1</hour><hour>2</hour><hour>3</hour></skipHours>"
        );
        assert_eq!(roundtrip(&skip_hours), skip_hours);

        let skip_days = SkipDays {
            days: vec!["Monday".into(), "Friday".into(), "Sunday".into()],
        };
        assert_eq!(
            render_xml(&skip_days),
            "<skipDays><day>Monday</day><day>Friday</day><day>Sunday</day></skipDays>"
        );
        assert_eq!(roundtrip(&skip_days), skip_days);

        assert_eq!(render_xml(&SkipDays::default()), "<skipDays/>");
        assert_eq!(roundtrip(&SkipDays::default()), SkipDays::default());
    }

    #[test]
    fn test_channel_roundtrip_required_only() {
        let channel = Channel::new("title", "link", "desc");
        assert_eq!(
            render_xml(&channel),
            "<channel><title>title</title><link>link</link><description>desc</description></channel>"
        );
        assert_eq!(roundtrip(&channel), channel);
    }

    #[test]
    fn test_channel_roundtrip_all_fields() {
        let channel = Channel {
            title: "title".into(),
            link: "http://something!".into(),
            description: "desc".into(),
            language: Some("en-us".into()),
            copyright: Some("EvilCorp Inc.".into()),
            managing_editor: Some("nobody".into()),
            web_master: Some("can't afford em".into()),
            pub_date: Some(DateTime::parse_from_rfc2822("Wed, 02 Oct 2002 13:00:00 +0200").unwrap()),
            last_build_date: Some(DateTime::parse_from_rfc2822("Thu, 01 Jan 1970 00:00:00 +0000").unwrap()),
            categories: Some(vec![
                Category {
                    text: "funny stuff".into(),
                    domain: None,
                },
                Category {
                    text: "dumb stuff".into(),
                    domain: Some("example.io".into()),
                },
            ]),
            generator: Some("rss-slicer".into()),
            docs: Some("https://www.rssboard.org/rss-specification".into()),
            cloud: Some(Cloud {
                domain: "nowhere.local".into(),
                port: 99,
                path: "/somewhere".into(),
                register_procedure: "justDoIt".into(),
                protocol: "magic-proto".into(),
            }),
            ttl: Some(10),
            image: Some(Image {
                url: "http://img/image.jpg".into(),
                title: "image".into(),
                link: "somewhere".into(),
                ..Image::default()
            }),
            rating: Some("bad".into()),
            text_input: Some(TextInput {
                title: "eh".into(),
                description: "desc".into(),
                name: "name".into(),
                link: "l".into(),
            }),
            skip_hours: Some(SkipHours {
                hours: (0..23).collect(),
            }),
            skip_days: Some(SkipDays {
                days: vec!["Today".into(), "Tomorrow".into()],
            }),
        };

        assert_eq!(roundtrip(&channel), channel);
    }

    #[test]
    fn test_channel_field_order_and_names() {
        let mut channel = Channel::new("t", "l", "d");
        channel.web_master = Some("w".into());
        channel.ttl = Some(5);
        channel.skip_days = Some(SkipDays {
            days: vec!["Monday".into()],
        });
        assert_eq!(
            render_xml(&channel),
            "<channel><title>t</title><link>l</link><description>d</description>\
             <webMaster>w</webMaster><ttl>5</ttl><skipDays><day>Monday</day></skipDays></channel>"
        );
    }

    #[test]
    fn test_empty_categories_read_back_as_none() {
        let mut channel = Channel::new("t", "l", "d");
        channel.categories = Some(Vec::new());
        assert_eq!(roundtrip(&channel).categories, None);
    }

    #[test]
    fn test_channel_missing_title_fails() {
        let result = parse_xml::<Channel>("<channel><link>l</link><description>d</description></channel>");
        assert_eq!(
            result.unwrap_err(),
            MappingError::MissingField {
                record: "Channel",
                field: "title"
            }
        );
    }

    #[test]
    fn test_channel_ignores_items_and_unknown_children() {
        let channel = parse_xml::<Channel>(
            "<channel><title>t</title><link>l</link><description>d</description>\
             <item><title>not the channel title</title></item><foo>bar</foo></channel>",
        )
        .unwrap();
        assert_eq!(channel, Channel::new("t", "l", "d"));
    }
}
