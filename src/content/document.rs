//! Document model and parsing at the content-source boundary
//!
//! Source responses are untyped JSON. Everything passes through
//! [`Document::from_value`] before the rest of the crate sees it, so a schema
//! mismatch surfaces as a descriptive [`SourceError::Schema`] instead of an
//! empty field somewhere in a template.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::rich_text::RichText;
use crate::source::SourceError;

/// A single content entry retrieved from the content source
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Document {
    /// Source identifier
    pub id: Option<String>,

    /// Unique, URL-safe identifier used as the slug
    pub uid: String,

    /// Custom type of the document (e.g. "post")
    pub document_type: String,

    /// First publication timestamp
    pub first_publication_date: Option<DateTime<Utc>>,

    /// Last publication timestamp
    pub last_publication_date: Option<DateTime<Utc>>,

    /// Document fields
    pub data: DocumentData,
}

/// Fields of a post document
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DocumentData {
    pub title: String,
    pub subtitle: String,
    pub author: String,
    pub banner: Option<Banner>,
    pub content: Vec<ContentBlock>,
}

/// Banner image
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Banner {
    pub url: String,
}

/// One section of an article: a plain heading and a rich-text body
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ContentBlock {
    pub heading: String,
    pub body: RichText,
}

#[derive(Deserialize)]
struct RawDocument {
    id: Option<String>,
    uid: Option<String>,
    #[serde(rename = "type")]
    document_type: Option<String>,
    first_publication_date: Option<String>,
    last_publication_date: Option<String>,
    data: Option<RawData>,
}

#[derive(Deserialize)]
struct RawData {
    title: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    subtitle: String,
    #[serde(default, deserialize_with = "null_as_default")]
    author: String,
    banner: Option<RawBanner>,
    #[serde(default, deserialize_with = "null_as_default")]
    content: Vec<RawContentBlock>,
}

#[derive(Deserialize)]
struct RawBanner {
    url: Option<String>,
}

#[derive(Deserialize)]
struct RawContentBlock {
    #[serde(default, deserialize_with = "null_as_default")]
    heading: String,
    #[serde(default, deserialize_with = "null_as_default")]
    body: RichText,
}

/// Deserialize `null` as the type's default value
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl Document {
    /// Parse and validate a raw JSON document
    pub fn from_value(value: serde_json::Value) -> Result<Self, SourceError> {
        let context = describe(&value);
        let raw: RawDocument = serde_json::from_value(value)
            .map_err(|e| SourceError::schema(&context, e.to_string()))?;

        let uid = raw
            .uid
            .filter(|uid| !uid.trim().is_empty())
            .ok_or_else(|| SourceError::schema(&context, "missing field `uid`"))?;
        let data = raw
            .data
            .ok_or_else(|| SourceError::schema(&context, "missing field `data`"))?;
        let title = data
            .title
            .ok_or_else(|| SourceError::schema(&context, "missing field `data.title`"))?;

        let first_publication_date =
            parse_optional_timestamp(raw.first_publication_date.as_deref())
                .map_err(|e| SourceError::schema(&context, e))?;
        let last_publication_date = parse_optional_timestamp(raw.last_publication_date.as_deref())
            .map_err(|e| SourceError::schema(&context, e))?;

        let banner = data
            .banner
            .and_then(|b| b.url)
            .filter(|url| !url.is_empty())
            .map(|url| Banner { url });

        let content = data
            .content
            .into_iter()
            .map(|block| ContentBlock {
                heading: block.heading,
                body: block.body,
            })
            .collect();

        Ok(Self {
            id: raw.id,
            uid,
            document_type: raw.document_type.unwrap_or_default(),
            first_publication_date,
            last_publication_date,
            data: DocumentData {
                title,
                subtitle: data.subtitle,
                author: data.author,
                banner,
                content,
            },
        })
    }
}

/// Name a raw document for error messages
fn describe(value: &serde_json::Value) -> String {
    let field = |name: &str| value.get(name).and_then(|v| v.as_str()).map(str::to_string);
    match (field("uid"), field("id")) {
        (Some(uid), _) => format!("document `{}`", uid),
        (None, Some(id)) => format!("document id `{}`", id),
        (None, None) => "document".to_string(),
    }
}

fn parse_optional_timestamp(value: Option<&str>) -> Result<Option<DateTime<Utc>>, String> {
    match value {
        None | Some("") => Ok(None),
        Some(s) => parse_timestamp(s).map(Some),
    }
}

/// Parse a source timestamp
///
/// The content API reports `2021-03-25T19:25:28+0000`; RFC 3339 is accepted too.
pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(s)
        .or_else(|_| DateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%z"))
        .map(|date| date.with_timezone(&Utc))
        .map_err(|e| format!("invalid timestamp `{}`: {}", s, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn sample() -> serde_json::Value {
        json!({
            "id": "YF1",
            "uid": "como-utilizar-hooks",
            "type": "post",
            "first_publication_date": "2021-03-15T19:25:28+0000",
            "last_publication_date": "2021-03-25T19:25:28+0000",
            "data": {
                "title": "Como utilizar Hooks",
                "subtitle": "Pensando em sincronização em vez de ciclos de vida",
                "author": "Joseph Oliveira",
                "banner": { "url": "https://images.example.com/banner.png" },
                "content": [
                    {
                        "heading": "Proin et varius",
                        "body": [{ "type": "paragraph", "text": "Lorem ipsum dolor", "spans": [] }]
                    }
                ]
            }
        })
    }

    #[test]
    fn test_parse_document() {
        let doc = Document::from_value(sample()).unwrap();
        assert_eq!(doc.uid, "como-utilizar-hooks");
        assert_eq!(doc.document_type, "post");
        assert_eq!(doc.data.author, "Joseph Oliveira");
        assert_eq!(
            doc.first_publication_date,
            Some(Utc.with_ymd_and_hms(2021, 3, 15, 19, 25, 28).unwrap())
        );
        assert_eq!(
            doc.data.banner.as_ref().map(|b| b.url.as_str()),
            Some("https://images.example.com/banner.png")
        );
        assert_eq!(doc.data.content.len(), 1);
        assert_eq!(doc.data.content[0].heading, "Proin et varius");
        assert_eq!(doc.data.content[0].body.blocks().len(), 1);
    }

    #[test]
    fn test_missing_uid_is_schema_error() {
        let mut value = sample();
        value.as_object_mut().unwrap().remove("uid");
        let err = Document::from_value(value).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("document id `YF1`"), "{}", message);
        assert!(message.contains("uid"), "{}", message);
    }

    #[test]
    fn test_wrong_field_type_is_schema_error() {
        let mut value = sample();
        value["data"]["title"] = json!(42);
        let err = Document::from_value(value).unwrap_err();
        assert!(matches!(err, SourceError::Schema { .. }));
        assert!(err.to_string().contains("como-utilizar-hooks"));
    }

    #[test]
    fn test_malformed_blocks_degrade_to_empty() {
        let mut value = sample();
        value["data"]["content"] = json!([
            { "body": [{ "type": "paragraph", "text": "only body" }] },
            { "heading": "only heading" },
            { "heading": null, "body": null }
        ]);
        value["data"]["subtitle"] = json!(null);
        value["data"]["banner"] = json!({ "url": null });

        let doc = Document::from_value(value).unwrap();
        assert_eq!(doc.data.subtitle, "");
        assert!(doc.data.banner.is_none());
        assert_eq!(doc.data.content.len(), 3);
        assert_eq!(doc.data.content[0].heading, "");
        assert!(doc.data.content[1].body.is_empty());
        assert!(doc.data.content[2].body.is_empty());
    }

    #[test]
    fn test_null_publication_date() {
        let mut value = sample();
        value["first_publication_date"] = json!(null);
        let doc = Document::from_value(value).unwrap();
        assert!(doc.first_publication_date.is_none());
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let expected = Utc.with_ymd_and_hms(2021, 3, 25, 19, 25, 28).unwrap();
        assert_eq!(parse_timestamp("2021-03-25T19:25:28+0000").unwrap(), expected);
        assert_eq!(parse_timestamp("2021-03-25T19:25:28Z").unwrap(), expected);
        assert_eq!(
            parse_timestamp("2021-03-25T16:25:28-03:00").unwrap(),
            expected
        );
        assert!(parse_timestamp("25/03/2021").is_err());
    }
}
