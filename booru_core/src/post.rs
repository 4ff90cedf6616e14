// Normalization of upstream payloads into the gateway's post model.
// Upstreams disagree on envelopes, media links and tag shapes; everything
// leaving this module has the same two derived fields, `file_url` and `post_url`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use std::fmt::{Display, Formatter};

use booru_util::{file_extension, public_domain};

use crate::error::{Error, Result};
use crate::registry::{BooruDescriptor, BooruFamily};

/// Requested shape of a post's `tags` field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TagFormat {
    /// Space-joined string.
    #[default]
    Formatted,
    /// Whatever the upstream sent, category mappings included.
    Unformatted,
}

impl From<&str> for TagFormat {
    fn from(s: &str) -> Self {
        match s {
            "unformatted" => TagFormat::Unformatted,
            _ => TagFormat::Formatted,
        }
    }
}

impl From<String> for TagFormat {
    fn from(s: String) -> Self {
        TagFormat::from(s.as_str())
    }
}

impl From<TagFormat> for String {
    fn from(format: TagFormat) -> Self {
        format.to_string()
    }
}

impl Display for TagFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            TagFormat::Formatted => write!(f, "formatted"),
            TagFormat::Unformatted => write!(f, "unformatted"),
        }
    }
}

/// One normalized post: every upstream field, plus the two derived links.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    #[serde(flatten)]
    pub fields: Map<String, Value>,
    pub file_url: Option<String>,
    pub post_url: Option<String>,
}

impl Post {
    pub fn id(&self) -> Option<String> {
        self.fields.get("id").and_then(scalar)
    }

    pub fn tags(&self) -> Option<&Value> {
        self.fields.get("tags")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PostList {
    pub posts: Vec<Post>,
}

// MARK: Envelope

/// Unwrap the post entries of an upstream payload.
/// `{post}`, `{post: [..]}`, `{posts: [..]}`, bare arrays and bare posts are understood;
/// anything else, `null` included, has no posts.
pub fn raw_posts(payload: &Value) -> Vec<&Value> {
    match payload {
        Value::Array(list) => list.iter().collect(),
        Value::Object(map) => match (map.get("post"), map.get("posts")) {
            (Some(Value::Array(list)), _) => list.iter().collect(),
            (Some(post @ Value::Object(_)), _) => vec![post],
            (_, Some(Value::Array(list))) => list.iter().collect(),
            _ if map.contains_key("id") => vec![payload],
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

// MARK: Normalization

/// Normalize an upstream payload for `booru`.
///
/// Returns `Ok(None)` when the payload carries no posts, which callers report as not-found.
/// A non-empty payload in which no entry is an object is an unexpected shape.
/// The payload is only read; every post is a fresh copy.
pub fn normalize(booru: &BooruDescriptor, payload: &Value, format: TagFormat) -> Result<Option<PostList>> {
    let raw = raw_posts(payload);
    if raw.is_empty() {
        return Ok(None);
    }

    let posts = raw
        .into_iter()
        .filter_map(Value::as_object)
        .map(|post| booru.family.normalize_post(booru, post, format))
        .collect::<Vec<_>>();

    if posts.is_empty() {
        return Err(Error::UnexpectedShape(booru.name.clone()));
    }
    Ok(Some(PostList { posts }))
}

impl BooruFamily {
    fn normalize_post(&self, booru: &BooruDescriptor, raw: &Map<String, Value>, format: TagFormat) -> Post {
        let mut fields = raw.clone();
        let supplied_file_url = fields.remove("file_url").and_then(non_empty_string);
        let supplied_post_url = fields.remove("post_url").and_then(non_empty_string);
        let id = fields.get("id").and_then(scalar);

        if let Some(tags) = fields.get_mut("tags") {
            if format == TagFormat::Formatted {
                *tags = Value::String(flatten_tags(tags));
            }
        }

        let (file_url, post_url) = match self {
            BooruFamily::Structured => {
                let file_url = supplied_file_url.or_else(|| {
                    raw.get("file")
                        .and_then(|file| file.get("url"))
                        .cloned()
                        .and_then(non_empty_string)
                });
                let post_url =
                    supplied_post_url.or_else(|| id.map(|id| format!("https://{}/posts/{}", booru.endpoint, id)));
                (file_url, post_url)
            }
            BooruFamily::Flat => {
                let file_url = supplied_file_url.or_else(|| flat_file_url(booru, raw));
                let post_url = supplied_post_url.or_else(|| {
                    id.map(|id| {
                        format!(
                            "https://{}/index.php?page=post&s=view&id={}",
                            public_domain(&booru.endpoint),
                            id
                        )
                    })
                });
                (file_url, post_url)
            }
        };

        Post {
            fields,
            file_url,
            post_url,
        }
    }
}

/// `https://{endpoint}/images/{directory}/{hash}.{ext}`, when all three parts are present.
fn flat_file_url(booru: &BooruDescriptor, raw: &Map<String, Value>) -> Option<String> {
    let directory = raw.get("directory").and_then(scalar)?;
    let hash = raw.get("hash").and_then(scalar)?;
    let image = raw.get("image").and_then(scalar)?;
    let ext = file_extension(&image)?;
    Some(format!("https://{}/images/{}/{}.{}", booru.endpoint, directory, hash, ext))
}

/// Space-join a tag value: strings stay, lists are joined, mappings are flattened in key order.
fn flatten_tags(tags: &Value) -> String {
    fn collect<'a>(value: &'a Value, out: &mut Vec<&'a str>) {
        match value {
            Value::String(s) if !s.is_empty() => out.push(s),
            Value::Array(list) => list.iter().for_each(|v| collect(v, out)),
            Value::Object(map) => map.values().for_each(|v| collect(v, out)),
            _ => {}
        }
    }

    let mut out = Vec::new();
    collect(tags, &mut out);
    out.join(" ")
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn non_empty_string(value: Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s),
        _ => None,
    }
}
