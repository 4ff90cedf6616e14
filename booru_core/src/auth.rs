use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Serialize;

use booru_util::build_params;

use crate::error::{Error, Result};

/// How an upstream expects credentials.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthScheme {
    None,
    /// `User-Agent` + `Authorization: Basic` header pair (e621).
    BasicHeader,
    /// `api_key` + `user_id` query parameters (gelbooru).
    ApiKey,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicCredential {
    pub user_agent: String,
    pub username: String,
    pub api_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiKeyCredential {
    pub api_key: String,
    pub user_id: String,
}

/// Credentials available to one request, per scheme.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub basic: Option<BasicCredential>,
    pub api_key: Option<ApiKeyCredential>,
}

impl Credentials {
    /// Fill the schemes missing here from `fallback`.
    pub fn or(self, fallback: &Credentials) -> Credentials {
        Credentials {
            basic: self.basic.or_else(|| fallback.basic.clone()),
            api_key: self.api_key.or_else(|| fallback.api_key.clone()),
        }
    }
}

/// What to attach to an upstream request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthParts {
    pub headers: Vec<(String, String)>,
    pub query: Vec<(String, String)>,
}

impl AuthScheme {
    /// Resolve the parts to attach, or `Unauthorized` when the scheme has no credentials.
    pub fn authorize(&self, credentials: &Credentials, booru: &str) -> Result<AuthParts> {
        match self {
            AuthScheme::None => Ok(AuthParts::default()),
            AuthScheme::BasicHeader => {
                let c = credentials
                    .basic
                    .as_ref()
                    .ok_or_else(|| Error::Unauthorized(booru.to_string()))?;
                let token = STANDARD.encode(format!("{}:{}", c.username, c.api_key));
                Ok(AuthParts {
                    headers: vec![
                        ("User-Agent".to_string(), c.user_agent.clone()),
                        ("Authorization".to_string(), format!("Basic {}", token)),
                    ],
                    query: Vec::new(),
                })
            }
            AuthScheme::ApiKey => {
                let c = credentials
                    .api_key
                    .as_ref()
                    .ok_or_else(|| Error::Unauthorized(booru.to_string()))?;
                Ok(AuthParts {
                    headers: Vec::new(),
                    query: build_params! {
                        required api_key => c.api_key,
                        required user_id => c.user_id,
                    },
                })
            }
        }
    }
}
