use serde::{Deserialize, Serialize};
use serde_json::Value;

use std::sync::Arc;

use booru_client::{Upstream, UpstreamRequest};
use booru_util::{encode_component, encode_query_pairs, encode_tag_expression};

use crate::auth::{AuthParts, Credentials};
use crate::cache::{is_known_empty, mark_empty, with_cache, CacheKey, CacheStore, CacheTtl, Cached};
use crate::error::{Error, Result};
use crate::post::{normalize, Post, PostList, TagFormat};
use crate::registry::{BooruDescriptor, Registry, REGISTRY};
use crate::sampler::{sample, SamplerConfig, NO_POSTS};
use crate::tags::{tag_expression, TagInput};

pub const DEFAULT_RESULTS: usize = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    pub tags: Option<TagInput>,
    pub exclude_tags: Option<TagInput>,
    pub page: u32,
    pub results: usize,
    pub tag_format: TagFormat,
    pub force: bool,
}

impl Default for SearchQuery {
    fn default() -> Self {
        SearchQuery {
            tags: None,
            exclude_tags: None,
            page: 0,
            results: DEFAULT_RESULTS,
            tag_format: TagFormat::default(),
            force: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RandomQuery {
    pub tags: Option<TagInput>,
    pub exclude_tags: Option<TagInput>,
    pub results: usize,
    pub tag_format: TagFormat,
    pub force: bool,
}

impl Default for RandomQuery {
    fn default() -> Self {
        RandomQuery {
            tags: None,
            exclude_tags: None,
            results: DEFAULT_RESULTS,
            tag_format: TagFormat::default(),
            force: false,
        }
    }
}

/// Tag suggestions as the upstream returned them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Autocomplete {
    pub count: usize,
    pub data: Vec<Value>,
}

/// The four gateway operations over one registry, one upstream transport and one cache store.
#[derive(Clone)]
pub struct Gateway {
    registry: &'static Registry,
    upstream: Arc<dyn Upstream>,
    store: Arc<dyn CacheStore>,
    ttl: CacheTtl,
    sampler: SamplerConfig,
    credentials: Credentials,
}

impl Gateway {
    pub fn new(upstream: Arc<dyn Upstream>, store: Arc<dyn CacheStore>) -> Self {
        Gateway {
            registry: &REGISTRY,
            upstream,
            store,
            ttl: CacheTtl::default(),
            sampler: SamplerConfig::default(),
            credentials: Credentials::default(),
        }
    }

    pub fn with_ttl(self, ttl: CacheTtl) -> Self {
        Gateway { ttl, ..self }
    }

    pub fn with_sampler(self, sampler: SamplerConfig) -> Self {
        Gateway { sampler, ..self }
    }

    /// Credentials used when a request carries none of its own.
    pub fn with_credentials(self, credentials: Credentials) -> Self {
        Gateway { credentials, ..self }
    }

    pub fn registry(&self) -> &'static Registry {
        self.registry
    }

    // MARK: Operations

    pub async fn search(&self, booru: &str, query: &SearchQuery, credentials: &Credentials) -> Result<Cached<PostList>> {
        check_results(query.results)?;
        let booru = self.registry.resolve_enabled(booru)?;
        let auth = self.authorize(booru, credentials)?;
        let expression = tag_expression(query.tags.as_ref(), query.exclude_tags.as_ref(), booru.exclude_syntax);

        let key = CacheKey::new(&booru.name, "search")
            .part(&expression)
            .part(query.tag_format)
            .part(query.results)
            .part(query.page);
        let empty_key = CacheKey::new(&booru.name, "search").part("empty").part(&expression);
        if !query.force && is_known_empty(self.store.as_ref(), &empty_key).await {
            return Err(Error::NotFound(NO_POSTS.to_string()));
        }

        let result = with_cache(self.store.as_ref(), &key, self.ttl.search, query.force, || async {
            let mut pairs = vec![(booru.family.page_param().to_string(), query.page.to_string())];
            pairs.push(("limit".to_string(), query.results.to_string()));
            let request = self.request(booru, &booru.templates.search, &expression, pairs, &auth, "search")?;

            let payload = self.upstream.get_json(&request).await?;
            let mut list = normalize(booru, &payload, query.tag_format)?
                .ok_or_else(|| Error::NotFound(NO_POSTS.to_string()))?;
            list.posts.truncate(query.results);
            Ok::<_, Error>(list)
        })
        .await;

        if let Err(Error::NotFound(_)) = &result {
            if query.page == 0 {
                mark_empty(self.store.as_ref(), &empty_key, self.ttl.empty).await;
            }
        }
        result
    }

    pub async fn random(&self, booru: &str, query: &RandomQuery, credentials: &Credentials) -> Result<Cached<PostList>> {
        check_results(query.results)?;
        let booru = self.registry.resolve_enabled(booru)?;
        let auth = self.authorize(booru, credentials)?;
        let expression = tag_expression(query.tags.as_ref(), query.exclude_tags.as_ref(), booru.exclude_syntax);

        let key = CacheKey::new(&booru.name, "random")
            .part(&expression)
            .part(query.tag_format)
            .part(query.results);
        let empty_key = CacheKey::new(&booru.name, "random").part("empty").part(&expression);
        if !query.force && is_known_empty(self.store.as_ref(), &empty_key).await {
            return Err(Error::NotFound(NO_POSTS.to_string()));
        }

        let format = query.tag_format;
        let fetch_page = |page: u32| {
            let pairs = vec![
                (booru.family.page_param().to_string(), page.to_string()),
                ("limit".to_string(), booru.family.random_limit().to_string()),
            ];
            let request = self.request(booru, &booru.templates.random, &expression, pairs, &auth, "random");
            let upstream = self.upstream.clone();
            async move {
                let payload = upstream.get_json(&request?).await?;
                normalize(booru, &payload, format)
            }
        };

        let result = with_cache(self.store.as_ref(), &key, self.ttl.random, query.force, || {
            sample(&self.sampler, query.results, fetch_page)
        })
        .await;

        if let Err(Error::NotFound(_)) = &result {
            tracing::error!("No posts on {} for `{}` after {} tries", booru.name, expression, self.sampler.max_tries);
            mark_empty(self.store.as_ref(), &empty_key, self.ttl.empty).await;
        }
        result
    }

    pub async fn lookup_by_id(
        &self,
        booru: &str,
        id: &str,
        tag_format: TagFormat,
        force: bool,
        credentials: &Credentials,
    ) -> Result<Cached<Post>> {
        let id = id.trim();
        if id.is_empty() {
            return Err(Error::InvalidInput("Missing booru or id".to_string()));
        }
        let booru = self.registry.resolve_enabled(booru)?;
        let auth = self.authorize(booru, credentials)?;

        let key = CacheKey::new(&booru.name, "id").part(id).part(tag_format);
        with_cache(self.store.as_ref(), &key, self.ttl.id, force, || async {
            let path = booru.templates.id.path_for(&encode_component(id));
            let request = self.request(booru, &path, "", Vec::new(), &auth, "id")?;

            let payload = self.upstream.get_json(&request).await?;
            normalize(booru, &payload, tag_format)?
                .and_then(|list| list.posts.into_iter().next())
                .ok_or_else(|| Error::NotFound("Post not found".to_string()))
        })
        .await
    }

    /// Suggestions for a tag prefix. A cached zero-count answer is reported as not found.
    pub async fn autocomplete(
        &self,
        booru: &str,
        tag: &str,
        force: bool,
        credentials: &Credentials,
    ) -> Result<Cached<Autocomplete>> {
        if tag.trim().is_empty() {
            return Err(Error::InvalidInput("Missing tag".to_string()));
        }
        let booru = self.registry.resolve_enabled(booru)?;
        let min_len = booru.family.min_autocomplete_len();
        if tag.chars().count() < min_len {
            return Err(Error::InvalidInput(format!(
                "Tag must be at least {} characters long for {}",
                min_len, booru.name
            )));
        }
        let endpoint = booru
            .autocomplete
            .as_deref()
            .ok_or_else(|| Error::Unsupported(booru.name.clone(), "autocomplete".to_string()))?;
        let auth = self.authorize(booru, credentials)?;

        let prefix = tag
            .strip_prefix('-')
            .unwrap_or(tag)
            .split_whitespace()
            .collect::<Vec<_>>()
            .join("_");
        let key = CacheKey::new(&booru.name, "autocomplete").part(&prefix);

        let result = with_cache(self.store.as_ref(), &key, self.ttl.autocomplete, force, || async {
            let mut url = format!("https://{}{}", endpoint, encode_component(&prefix));
            if !auth.query.is_empty() {
                url.push(if endpoint.contains('?') { '&' } else { '?' });
                url.push_str(&encode_query_pairs(&auth.query));
            }
            let request = with_headers(UpstreamRequest::get(&url, format!("{}_autocomplete", booru.name))?, &auth);

            let data = match self.upstream.get_json(&request).await? {
                Value::Array(list) => list,
                Value::Null => Vec::new(),
                _ => return Err(Error::UnexpectedShape(booru.name.clone())),
            };
            Ok::<_, Error>(Autocomplete {
                count: data.len(),
                data,
            })
        })
        .await?;

        if result.value.count == 0 {
            if !result.from_cache {
                if let Err(err) = self.store.expire(key.as_str(), self.ttl.autocomplete_empty).await {
                    tracing::warn!("Cannot shorten expiry of {}: {}", key, err);
                }
            }
            return Err(Error::NotFound("No results found".to_string()));
        }
        Ok(result)
    }

    // MARK: Upstream requests

    fn authorize(&self, booru: &BooruDescriptor, credentials: &Credentials) -> Result<AuthParts> {
        let credentials = credentials.clone().or(&self.credentials);
        booru.auth.authorize(&credentials, &booru.name)
    }

    fn request(
        &self,
        booru: &BooruDescriptor,
        template: &str,
        expression: &str,
        mut pairs: Vec<(String, String)>,
        auth: &AuthParts,
        operation: &str,
    ) -> Result<UpstreamRequest> {
        let mut query = Vec::new();
        if !expression.is_empty() {
            query.push(format!("tags={}", encode_tag_expression(expression)));
        }
        pairs.extend(auth.query.iter().cloned());
        if !pairs.is_empty() {
            query.push(encode_query_pairs(&pairs));
        }

        let mut url = booru.base_url(template);
        url.push_str(&query.join("&"));
        let url = url.trim_end_matches(|c| c == '&' || c == '?');

        let request = UpstreamRequest::get(url, format!("{}_{}", booru.name, operation))?;
        Ok(with_headers(request, auth))
    }
}

fn with_headers(request: UpstreamRequest, auth: &AuthParts) -> UpstreamRequest {
    auth.headers
        .iter()
        .fold(request, |request, (name, value)| request.header(name.as_str(), value.as_str()))
}

fn check_results(results: usize) -> Result<()> {
    if results == 0 {
        return Err(Error::InvalidInput("results must be a positive number".to_string()));
    }
    Ok(())
}
