// The static catalogue of upstream boorus.
// Every booru the gateway can talk to is described here once, at startup,
// and looked up by name or alias on each request.

use itertools::Itertools;
use lazy_static::lazy_static;
use serde::Serialize;

use crate::auth::AuthScheme;
use crate::error::{Error, Result};
use crate::tags::ExcludeSyntax;

/// Default query template of the gelbooru-style "dapi" endpoints.
const DAPI_QUERY: &str = "index.php?page=dapi&s=post&q=index&json=1";

lazy_static! {
    /// The built-in catalogue, shared read-only by every request.
    pub static ref REGISTRY: Registry = Registry::builtin();
}

// MARK: Descriptor

/// Upstream schema family. Decides how raw posts are normalized and how pages are addressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BooruFamily {
    /// Media link nested under `file.url`, tags as a category mapping (e621).
    Structured,
    /// Flat `directory`/`hash`/`image` fields, tags as a string (gelbooru and friends).
    Flat,
}

impl BooruFamily {
    pub fn page_param(&self) -> &'static str {
        match self {
            BooruFamily::Structured => "page",
            BooruFamily::Flat => "pid",
        }
    }

    /// Page size requested while sampling random posts.
    pub fn random_limit(&self) -> u32 {
        match self {
            BooruFamily::Structured => 320,
            BooruFamily::Flat => 1000,
        }
    }

    /// Shortest tag prefix the family's autocomplete accepts.
    pub fn min_autocomplete_len(&self) -> usize {
        match self {
            BooruFamily::Structured => 3,
            BooruFamily::Flat => 1,
        }
    }
}

/// Path template of the id lookup: either `prefix{id}` or `prefix{id}suffix`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum IdTemplate {
    Prefix(String),
    Wrap(String, String),
}

impl IdTemplate {
    pub fn path_for(&self, id: &str) -> String {
        match self {
            IdTemplate::Prefix(prefix) => format!("{}{}", prefix, id),
            IdTemplate::Wrap(prefix, suffix) => format!("{}{}{}", prefix, id, suffix),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryTemplates {
    pub search: String,
    pub random: String,
    pub id: IdTemplate,
}

impl QueryTemplates {
    fn dapi() -> Self {
        QueryTemplates {
            search: DAPI_QUERY.to_string(),
            random: DAPI_QUERY.to_string(),
            id: IdTemplate::Prefix(format!("{}&id=", DAPI_QUERY)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BooruDescriptor {
    /// Canonical name, unique across the registry.
    pub name: String,
    /// Lowercase aliases.
    pub aliases: Vec<String>,
    pub enabled: bool,
    /// Host (and optional path prefix) without scheme, e.g. `api.rule34.xxx`.
    pub endpoint: String,
    pub family: BooruFamily,
    pub exclude_syntax: ExcludeSyntax,
    pub templates: QueryTemplates,
    /// Autocomplete URL without scheme; the tag prefix is appended verbatim.
    pub autocomplete: Option<String>,
    pub auth: AuthScheme,
}

impl BooruDescriptor {
    /// A flat-family booru speaking the default dapi query language.
    pub fn dapi(name: &str, aliases: &[&str], endpoint: &str) -> Self {
        BooruDescriptor {
            name: name.to_string(),
            aliases: aliases.iter().map(|a| a.to_lowercase()).collect(),
            enabled: true,
            endpoint: endpoint.to_string(),
            family: BooruFamily::Flat,
            exclude_syntax: ExcludeSyntax::PerTerm,
            templates: QueryTemplates::dapi(),
            autocomplete: None,
            auth: AuthScheme::None,
        }
    }

    pub fn disabled(self) -> Self {
        BooruDescriptor { enabled: false, ..self }
    }

    pub fn with_autocomplete(self, autocomplete: &str) -> Self {
        BooruDescriptor {
            autocomplete: Some(autocomplete.to_string()),
            ..self
        }
    }

    pub fn with_auth(self, auth: AuthScheme) -> Self {
        BooruDescriptor { auth, ..self }
    }

    /// Exact canonical name, or case-insensitive alias.
    pub fn matches(&self, name: &str) -> bool {
        let lower = name.to_lowercase();
        self.name == name || self.aliases.iter().any(|alias| *alias == lower)
    }

    /// `https://{endpoint}/{template}` followed by the separator the next query pair needs.
    pub fn base_url(&self, template: &str) -> String {
        let separator = if template.contains('?') { '&' } else { '?' };
        format!("https://{}/{}{}", self.endpoint, template, separator)
    }
}

// MARK: Registry

#[derive(Debug, Clone)]
pub struct Registry {
    boorus: Vec<BooruDescriptor>,
}

impl Registry {
    /// Build a registry; later descriptors reusing a canonical name are dropped.
    pub fn new(boorus: impl IntoIterator<Item = BooruDescriptor>) -> Self {
        let boorus = boorus.into_iter().unique_by(|b| b.name.clone()).collect();
        Registry { boorus }
    }

    pub fn builtin() -> Self {
        let e621 = BooruDescriptor {
            name: "e621.net".to_string(),
            aliases: vec!["e621".to_string(), "e6".to_string(), "e621net".to_string()],
            enabled: true,
            endpoint: "e621.net".to_string(),
            family: BooruFamily::Structured,
            exclude_syntax: ExcludeSyntax::Leading,
            templates: QueryTemplates {
                search: "posts.json".to_string(),
                random: "posts.json".to_string(),
                id: IdTemplate::Wrap("posts/".to_string(), ".json".to_string()),
            },
            autocomplete: Some("e621.net/tags/autocomplete.json?search[name_matches]=".to_string()),
            auth: AuthScheme::BasicHeader,
        };

        Registry::new([
            BooruDescriptor::dapi("rule34.xxx", &["rule34", "r34", "rule34xxx"], "api.rule34.xxx")
                .with_autocomplete("api.rule34.xxx/autocomplete.php?q="),
            BooruDescriptor::dapi("realbooru.com", &["realbooru", "rb", "real34"], "realbooru.com").disabled(),
            BooruDescriptor::dapi("safebooru.org", &["safebooru", "sb", "s34"], "safebooru.org")
                .with_autocomplete("safebooru.org/autocomplete.php?q="),
            BooruDescriptor::dapi("tbib.org", &["tbib", "tb", "tbiborg"], "tbib.org"),
            BooruDescriptor::dapi("hypnohub.net", &["hypnohub", "hh", "hypnohubnet"], "hypnohub.net"),
            BooruDescriptor::dapi("xbooru.com", &["xbooru", "xb", "xboorucom"], "xbooru.com"),
            BooruDescriptor::dapi("gelbooru.com", &["gelbooru", "gb", "gelboorucom"], "gelbooru.com")
                .with_autocomplete("gelbooru.com/index.php?page=autocomplete2&type=tag_query&limit=10&term=")
                .with_auth(AuthScheme::ApiKey),
            e621,
        ])
    }

    pub fn all(&self) -> &[BooruDescriptor] {
        &self.boorus
    }

    /// Find a booru by canonical name or alias, enabled or not.
    pub fn resolve(&self, name: &str) -> Option<&BooruDescriptor> {
        self.boorus.iter().find(|b| b.matches(name))
    }

    /// [`Registry::resolve`] followed by the enabled gate.
    pub fn resolve_enabled(&self, name: &str) -> Result<&BooruDescriptor> {
        let booru = self
            .resolve(name)
            .ok_or_else(|| Error::BooruNotFound(name.to_string()))?;
        if !booru.enabled {
            return Err(Error::BooruDisabled(booru.name.clone()));
        }
        Ok(booru)
    }
}
