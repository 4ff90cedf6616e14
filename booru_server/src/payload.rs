use axum::http::HeaderMap;
use serde::Deserialize;
use serde_json::Value;

use booru_core::{
    ApiKeyCredential, BasicCredential, Credentials, Error as CoreError, RandomQuery, Result as CoreResult,
    SearchQuery, TagFormat, TagInput, DEFAULT_RESULTS,
};

/// Body of the search and random requests.
/// Kept loosely typed so that wrong field types answer with a validation error.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostsRequest {
    #[serde(default)]
    pub tags: Option<Value>,
    #[serde(default, alias = "exclude_tags")]
    pub exclude_tags: Option<Value>,
    #[serde(default)]
    pub page: Option<Value>,
    #[serde(default)]
    pub results: Option<Value>,
    #[serde(default, alias = "tag_format")]
    pub tag_format: Option<Value>,
}

impl PostsRequest {
    pub fn into_search(self, force: bool) -> CoreResult<SearchQuery> {
        Ok(SearchQuery {
            tags: tag_input(self.tags.as_ref(), "tags")?,
            exclude_tags: tag_input(self.exclude_tags.as_ref(), "excludeTags")?,
            page: page(self.page.as_ref()),
            results: results(self.results.as_ref())?,
            tag_format: tag_format(self.tag_format.as_ref()),
            force,
        })
    }

    pub fn into_random(self, force: bool) -> CoreResult<RandomQuery> {
        Ok(RandomQuery {
            tags: tag_input(self.tags.as_ref(), "tags")?,
            exclude_tags: tag_input(self.exclude_tags.as_ref(), "excludeTags")?,
            results: results(self.results.as_ref())?,
            tag_format: tag_format(self.tag_format.as_ref()),
            force,
        })
    }
}

const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// A string, a list of strings, or nothing.
fn tag_input(value: Option<&Value>, field: &str) -> CoreResult<Option<TagInput>> {
    let invalid = || CoreError::InvalidInput(format!("{} must be a string or an array of strings", field));
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(TagInput::Text(s.clone()))),
        Some(Value::Array(list)) => list
            .iter()
            .map(|tag| tag.as_str().map(str::to_string).ok_or_else(invalid))
            .collect::<CoreResult<Vec<_>>>()
            .map(|tags| Some(TagInput::List(tags))),
        Some(_) => Err(invalid()),
    }
}

/// Positive number, defaulting to [`DEFAULT_RESULTS`] when absent or fractional.
/// Integral floats such as `3.0` count as integers.
fn results(value: Option<&Value>) -> CoreResult<usize> {
    match value {
        None | Some(Value::Null) => Ok(DEFAULT_RESULTS),
        Some(Value::Number(n)) if n.as_f64().map_or(false, |n| n > 0.0) => Ok(match n.as_u64() {
            Some(n) => n as usize,
            None => n
                .as_f64()
                .filter(|n| n.fract() == 0.0 && *n <= MAX_SAFE_INTEGER)
                .map_or(DEFAULT_RESULTS, |n| n as usize),
        }),
        Some(_) => Err(CoreError::InvalidInput("results must be a positive number".to_string())),
    }
}

/// Non-negative integer, else 0.
fn page(value: Option<&Value>) -> u32 {
    value
        .and_then(Value::as_u64)
        .map_or(0, |page| u32::try_from(page).unwrap_or(u32::MAX))
}

fn tag_format(value: Option<&Value>) -> TagFormat {
    value.and_then(Value::as_str).map(TagFormat::from).unwrap_or_default()
}

// MARK: Credential headers

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Upstream credentials supplied by the caller. A scheme is present only when all its headers are.
pub fn credentials(headers: &HeaderMap) -> Credentials {
    let basic = match (
        header(headers, "e621useragent"),
        header(headers, "e621username"),
        header(headers, "e621apikey"),
    ) {
        (Some(user_agent), Some(username), Some(api_key)) => Some(BasicCredential {
            user_agent,
            username,
            api_key,
        }),
        _ => None,
    };
    let api_key = match (header(headers, "gelbooruapikey"), header(headers, "gelbooruuserid")) {
        (Some(api_key), Some(user_id)) => Some(ApiKeyCredential { api_key, user_id }),
        _ => None,
    };
    Credentials { basic, api_key }
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;
    use serde_json::json;

    use super::*;

    fn request(body: Value) -> PostsRequest {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn test_search_fields() {
        let query = request(json!({
            "tags": "cat dog",
            "excludeTags": ["bird"],
            "page": 2,
            "results": 3,
            "tagFormat": "unformatted",
        }))
        .into_search(true)
        .unwrap();
        assert_eq!(query.tags, Some(TagInput::Text("cat dog".to_string())));
        assert_eq!(query.exclude_tags, Some(TagInput::List(vec!["bird".to_string()])));
        assert_eq!(query.page, 2);
        assert_eq!(query.results, 3);
        assert_eq!(query.tag_format, TagFormat::Unformatted);
        assert!(query.force);
    }

    #[test]
    fn test_defaults() {
        let query = request(json!({})).into_random(false).unwrap();
        assert_eq!(query.tags, None);
        assert_eq!(query.results, DEFAULT_RESULTS);
        assert_eq!(query.tag_format, TagFormat::Formatted);

        let query = request(json!({ "page": "x", "results": 2.5 })).into_search(false).unwrap();
        assert_eq!(query.page, 0);
        assert_eq!(query.results, DEFAULT_RESULTS);
    }

    #[test]
    fn test_integral_float_results() {
        let query = request(json!({ "results": 3.0 })).into_search(false).unwrap();
        assert_eq!(query.results, 3);
        let query = request(json!({ "results": 1e300 })).into_random(false).unwrap();
        assert_eq!(query.results, DEFAULT_RESULTS);
    }

    #[test]
    fn test_invalid_fields() {
        for body in [
            json!({ "tags": 5 }),
            json!({ "tags": ["cat", 1] }),
            json!({ "excludeTags": { "general": ["cat"] } }),
            json!({ "results": 0 }),
            json!({ "results": -1 }),
            json!({ "results": "3" }),
        ] {
            let err = request(body).into_search(false).unwrap_err();
            assert!(matches!(err, CoreError::InvalidInput(_)));
        }
    }

    #[test]
    fn test_credentials() {
        let mut headers = HeaderMap::new();
        headers.insert("e621useragent", HeaderValue::from_static("agent"));
        headers.insert("e621username", HeaderValue::from_static("user"));
        headers.insert("gelbooruapikey", HeaderValue::from_static("key"));

        let creds = credentials(&headers);
        assert!(creds.basic.is_none());
        assert!(creds.api_key.is_none());

        headers.insert("e621apikey", HeaderValue::from_static("secret"));
        let creds = credentials(&headers);
        assert_eq!(creds.basic.unwrap().api_key, "secret");
    }
}
