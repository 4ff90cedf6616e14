use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::time::Duration;

use std::sync::{Arc, Mutex};

use booru_client::{Upstream, UpstreamRequest};

use crate::*;

type Responder = Box<dyn Fn(&UpstreamRequest) -> booru_client::Result<Value> + Send + Sync>;

struct StubUpstream {
    respond: Responder,
    requests: Mutex<Vec<UpstreamRequest>>,
}

impl StubUpstream {
    fn new(respond: impl Fn(&UpstreamRequest) -> booru_client::Result<Value> + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(StubUpstream {
            respond: Box::new(respond),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn returning(value: Value) -> Arc<Self> {
        Self::new(move |_| Ok(value.clone()))
    }

    fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn last_url(&self) -> String {
        self.requests.lock().unwrap().last().unwrap().url.to_string()
    }

    fn last_headers(&self) -> Vec<(String, String)> {
        self.requests.lock().unwrap().last().unwrap().headers.clone()
    }
}

#[async_trait]
impl Upstream for StubUpstream {
    async fn get_json(&self, request: &UpstreamRequest) -> booru_client::Result<Value> {
        self.requests.lock().unwrap().push(request.clone());
        (self.respond)(request)
    }
}

fn gateway(upstream: Arc<StubUpstream>) -> Gateway {
    Gateway::new(upstream, Arc::new(MemoryStore::new()))
}

fn flat_posts(n: usize) -> Value {
    let posts: Vec<Value> = (0..n)
        .map(|i| {
            json!({
                "id": i,
                "directory": 100,
                "hash": format!("hash{}", i),
                "image": format!("hash{}.jpg", i),
                "tags": "cat solo",
            })
        })
        .collect();
    Value::Array(posts)
}

fn e621_credentials() -> Credentials {
    Credentials {
        basic: Some(BasicCredential {
            user_agent: "tester/1.0".to_string(),
            username: "user".to_string(),
            api_key: "key".to_string(),
        }),
        ..Default::default()
    }
}

fn cat() -> Option<TagInput> {
    Some(TagInput::List(vec!["cat".to_string()]))
}

// MARK: Search

#[tokio::test]
async fn test_search_truncates_and_links() {
    let upstream = StubUpstream::returning(flat_posts(10));
    let gateway = gateway(upstream.clone());
    let query = SearchQuery {
        tags: cat(),
        results: 3,
        ..Default::default()
    };

    let result = gateway.search("rule34", &query, &Credentials::default()).await.unwrap();
    assert!(!result.from_cache);
    assert_eq!(result.value.posts.len(), 3);
    assert!(result.value.posts.iter().all(|p| p.post_url.is_some()));
    assert_eq!(
        result.value.posts[0].file_url.as_deref(),
        Some("https://api.rule34.xxx/images/100/hash0.jpg")
    );
    assert_eq!(
        upstream.last_url(),
        "https://api.rule34.xxx/index.php?page=dapi&s=post&q=index&json=1&tags=cat&pid=0&limit=3"
    );

    let again = gateway.search("r34", &query, &Credentials::default()).await.unwrap();
    assert!(again.from_cache);
    assert_eq!(again.value, result.value);
    assert_eq!(upstream.calls(), 1);
}

#[tokio::test]
async fn test_search_keys_cover_result_shape() {
    let upstream = StubUpstream::returning(flat_posts(10));
    let gateway = gateway(upstream.clone());
    let base = SearchQuery {
        tags: cat(),
        ..Default::default()
    };

    gateway.search("rule34", &base, &Credentials::default()).await.unwrap();
    let other_page = SearchQuery { page: 1, ..base.clone() };
    gateway.search("rule34", &other_page, &Credentials::default()).await.unwrap();
    let other_format = SearchQuery {
        tag_format: TagFormat::Unformatted,
        ..base.clone()
    };
    gateway.search("rule34", &other_format, &Credentials::default()).await.unwrap();
    assert_eq!(upstream.calls(), 3);
}

#[tokio::test]
async fn test_search_leading_exclusion() {
    let upstream = StubUpstream::returning(json!({ "posts": [{ "id": 1, "file": { "url": "https://x/1.png" } }] }));
    let gateway = gateway(upstream.clone());
    let query = SearchQuery {
        tags: cat(),
        exclude_tags: Some(TagInput::Text("bird fish".to_string())),
        ..Default::default()
    };

    gateway.search("e621", &query, &e621_credentials()).await.unwrap();
    assert_eq!(
        upstream.last_url(),
        "https://e621.net/posts.json?tags=cat+-bird-fish&page=0&limit=5"
    );
}

#[tokio::test]
async fn test_search_api_key_params() {
    let upstream = StubUpstream::returning(json!({ "post": [{ "id": 1 }] }));
    let gateway = gateway(upstream.clone()).with_credentials(Credentials {
        api_key: Some(ApiKeyCredential {
            api_key: "k".to_string(),
            user_id: "9".to_string(),
        }),
        ..Default::default()
    });

    gateway.search("gelbooru", &SearchQuery::default(), &Credentials::default()).await.unwrap();
    assert!(upstream.last_url().ends_with("json=1&pid=0&limit=5&api_key=k&user_id=9"));
}

#[tokio::test]
async fn test_empty_search_is_remembered() {
    let upstream = StubUpstream::returning(json!([]));
    let gateway = gateway(upstream.clone());
    let query = SearchQuery {
        tags: cat(),
        ..Default::default()
    };

    let err = gateway.search("rule34", &query, &Credentials::default()).await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
    let with_more_results = SearchQuery { results: 9, ..query };
    let err = gateway
        .search("rule34", &with_more_results, &Credentials::default())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
    assert_eq!(upstream.calls(), 1);
}

#[tokio::test]
async fn test_invalid_results() {
    let upstream = StubUpstream::returning(flat_posts(1));
    let gateway = gateway(upstream.clone());
    let query = SearchQuery {
        results: 0,
        ..Default::default()
    };
    let err = gateway.search("rule34", &query, &Credentials::default()).await.unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));
    assert_eq!(upstream.calls(), 0);
}

// MARK: Gates

#[tokio::test]
async fn test_registry_and_auth_gates() {
    let upstream = StubUpstream::returning(flat_posts(1));
    let gateway = gateway(upstream.clone());
    let none = Credentials::default();

    let err = gateway.search("nope", &SearchQuery::default(), &none).await.unwrap_err();
    assert!(matches!(err, Error::BooruNotFound(_)));
    let err = gateway.random("realbooru", &RandomQuery::default(), &none).await.unwrap_err();
    assert!(matches!(err, Error::BooruDisabled(_)));
    let err = gateway
        .lookup_by_id("e621", "1", TagFormat::Formatted, false, &none)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Unauthorized(_)));
    let err = gateway.search("gelbooru", &SearchQuery::default(), &none).await.unwrap_err();
    assert!(matches!(err, Error::Unauthorized(_)));

    assert_eq!(upstream.calls(), 0);
}

// MARK: Lookup by id

#[tokio::test]
async fn test_lookup_structured_post() {
    let upstream = StubUpstream::returning(json!({ "post": {
        "id": 123,
        "file": { "url": "https://x/y.jpg" },
        "tags": { "general": ["cat"] },
    }}));
    let gateway = gateway(upstream.clone());

    let result = gateway
        .lookup_by_id("e621", "123", TagFormat::Formatted, false, &e621_credentials())
        .await
        .unwrap();
    assert_eq!(result.value.file_url.as_deref(), Some("https://x/y.jpg"));
    assert_eq!(result.value.post_url.as_deref(), Some("https://e621.net/posts/123"));
    assert_eq!(upstream.last_url(), "https://e621.net/posts/123.json");

    let headers = upstream.last_headers();
    assert!(headers.contains(&("User-Agent".to_string(), "tester/1.0".to_string())));
    assert!(headers.contains(&("Authorization".to_string(), "Basic dXNlcjprZXk=".to_string())));
}

#[tokio::test]
async fn test_lookup_flat_missing_post() {
    let upstream = StubUpstream::returning(Value::Null);
    let gateway = gateway(upstream.clone());

    let err = gateway
        .lookup_by_id("safebooru", "42", TagFormat::Formatted, false, &Credentials::default())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(msg) if msg == "Post not found"));
    assert_eq!(
        upstream.last_url(),
        "https://safebooru.org/index.php?page=dapi&s=post&q=index&json=1&id=42"
    );
}

#[tokio::test]
async fn test_lookup_force_refetches() {
    let upstream = StubUpstream::returning(json!([{ "id": 7 }]));
    let gateway = gateway(upstream.clone());
    let none = Credentials::default();

    gateway.lookup_by_id("tbib", "7", TagFormat::Formatted, false, &none).await.unwrap();
    let cached = gateway.lookup_by_id("tbib", "7", TagFormat::Formatted, false, &none).await.unwrap();
    assert!(cached.from_cache);
    let forced = gateway.lookup_by_id("tbib", "7", TagFormat::Formatted, true, &none).await.unwrap();
    assert!(!forced.from_cache);
    assert_eq!(upstream.calls(), 2);
}

// MARK: Random

#[tokio::test]
async fn test_random_samples_from_page() {
    let upstream = StubUpstream::returning(flat_posts(50));
    let gateway = gateway(upstream.clone());
    let query = RandomQuery {
        tags: cat(),
        results: 4,
        ..Default::default()
    };

    let result = gateway.random("xbooru", &query, &Credentials::default()).await.unwrap();
    assert_eq!(result.value.posts.len(), 4);
    assert_eq!(upstream.calls(), 1);
    assert!(upstream.last_url().ends_with("tags=cat&pid=16&limit=1000"));
}

#[tokio::test(start_paused = true)]
async fn test_random_negative_cache() {
    let upstream = StubUpstream::returning(json!([]));
    let gateway = gateway(upstream.clone());
    let query = RandomQuery {
        tags: cat(),
        ..Default::default()
    };
    let none = Credentials::default();

    let err = gateway.random("rule34", &query, &none).await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
    assert_eq!(upstream.calls(), 6);

    let fewer = RandomQuery {
        results: 1,
        ..query.clone()
    };
    let err = gateway.random("rule34", &fewer, &none).await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
    assert_eq!(upstream.calls(), 6);

    tokio::time::advance(Duration::from_secs(CacheTtl::default().empty + 1)).await;
    gateway.random("rule34", &query, &none).await.unwrap_err();
    assert_eq!(upstream.calls(), 12);
}

#[tokio::test]
async fn test_random_force_ignores_marker() {
    let upstream = StubUpstream::returning(json!([]));
    let gateway = gateway(upstream.clone()).with_sampler(SamplerConfig {
        max_page: 12,
        max_tries: 2,
    });
    let query = RandomQuery {
        tags: cat(),
        ..Default::default()
    };
    let none = Credentials::default();

    gateway.random("rule34", &query, &none).await.unwrap_err();
    let forced = RandomQuery { force: true, ..query };
    gateway.random("rule34", &forced, &none).await.unwrap_err();
    assert_eq!(upstream.calls(), 4);
}

#[tokio::test]
async fn test_random_first_status_error() {
    let upstream = StubUpstream::new(|_| {
        Err(booru_client::Error::StatusError {
            status: 429,
            reason: "Too Many Requests".to_string(),
        })
    });
    let gateway = gateway(upstream.clone());

    let err = gateway
        .random("hypnohub", &RandomQuery::default(), &Credentials::default())
        .await
        .unwrap_err();
    assert_eq!(err.upstream_status(), Some(429));
    assert_eq!(upstream.calls(), 1);
}

// MARK: Autocomplete

#[tokio::test]
async fn test_autocomplete() {
    let upstream = StubUpstream::returning(json!([{ "label": "big_cat", "value": "big_cat" }]));
    let gateway = gateway(upstream.clone());
    let none = Credentials::default();

    let result = gateway.autocomplete("rule34", "-big cat", false, &none).await.unwrap();
    assert_eq!(result.value.count, 1);
    assert_eq!(upstream.last_url(), "https://api.rule34.xxx/autocomplete.php?q=big_cat");

    let cached = gateway.autocomplete("rule34", "-big cat", false, &none).await.unwrap();
    assert!(cached.from_cache);
    assert_eq!(upstream.calls(), 1);
}

#[tokio::test]
async fn test_autocomplete_validation() {
    let upstream = StubUpstream::returning(json!([]));
    let gateway = gateway(upstream.clone());

    let err = gateway.autocomplete("tbib", "cat", false, &Credentials::default()).await.unwrap_err();
    assert!(matches!(err, Error::Unsupported(..)));
    let err = gateway.autocomplete("e621", "ca", false, &e621_credentials()).await.unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));
    let err = gateway.autocomplete("rule34", " ", false, &Credentials::default()).await.unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));
    assert_eq!(upstream.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_autocomplete_empty_is_short_lived() {
    let upstream = StubUpstream::returning(json!([]));
    let gateway = gateway(upstream.clone());
    let none = Credentials::default();

    let err = gateway.autocomplete("safebooru", "zzz", false, &none).await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
    let err = gateway.autocomplete("safebooru", "zzz", false, &none).await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
    assert_eq!(upstream.calls(), 1);

    tokio::time::advance(Duration::from_secs(CacheTtl::default().autocomplete_empty + 1)).await;
    gateway.autocomplete("safebooru", "zzz", false, &none).await.unwrap_err();
    assert_eq!(upstream.calls(), 2);
}
