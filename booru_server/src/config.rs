use anyhow::Context;

use std::str::FromStr;
use std::time::Duration;

use booru_client::DEFAULT_TIMEOUT_MS;
use booru_core::{ApiKeyCredential, BasicCredential, CacheTtl, Credentials};

pub const DEFAULT_SERVER_ADDRESS: &str = "0.0.0.0:6600";
pub const DEFAULT_CACHE_PREFIX: &str = "booru:";

/// Process configuration, read once at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub address: String,
    /// No URL means the in-memory store.
    pub redis_url: Option<String>,
    pub cache_prefix: String,
    /// Per-attempt timeout of every upstream request.
    pub upstream_timeout: Duration,
    pub ttl: CacheTtl,
    /// Used for requests that carry no credential headers.
    pub credentials: Credentials,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let var = |name: &str| var(name).filter(|value| !value.trim().is_empty());
        let parse = |name: &str, default: u64| -> anyhow::Result<u64> {
            match var(name) {
                Some(value) => u64::from_str(value.trim()).with_context(|| format!("{} must be a number", name)),
                None => Ok(default),
            }
        };

        let defaults = CacheTtl::default();
        let ttl = CacheTtl {
            search: parse("CACHE_TTL_SEARCH", defaults.search)?,
            random: parse("CACHE_TTL_RANDOM", defaults.random)?,
            id: parse("CACHE_TTL_ID", defaults.id)?,
            autocomplete: parse("CACHE_TTL_AUTOCOMPLETE", defaults.autocomplete)?,
            autocomplete_empty: parse("CACHE_TTL_AUTOCOMPLETE_EMPTY", defaults.autocomplete_empty)?,
            empty: parse("CACHE_TTL_EMPTY", defaults.empty)?,
        };

        let basic = match (var("E621_USER_AGENT"), var("E621_USERNAME"), var("E621_API_KEY")) {
            (Some(user_agent), Some(username), Some(api_key)) => Some(BasicCredential {
                user_agent,
                username,
                api_key,
            }),
            _ => None,
        };
        let api_key = match (var("GELBOORU_API_KEY"), var("GELBOORU_USER_ID")) {
            (Some(api_key), Some(user_id)) => Some(ApiKeyCredential { api_key, user_id }),
            _ => None,
        };

        Ok(AppConfig {
            address: var("SERVER_ADDRESS").unwrap_or_else(|| DEFAULT_SERVER_ADDRESS.to_string()),
            redis_url: var("REDIS_URL"),
            cache_prefix: var("CACHE_PREFIX").unwrap_or_else(|| DEFAULT_CACHE_PREFIX.to_string()),
            upstream_timeout: Duration::from_millis(parse("UPSTREAM_TIMEOUT_MS", DEFAULT_TIMEOUT_MS)?),
            ttl,
            credentials: Credentials { basic, api_key },
        })
    }
}
