pub mod auth;
pub mod cache;
pub mod error;
pub mod gateway;
pub mod post;
pub mod registry;
pub mod sampler;
pub mod tags;
#[cfg(test)]
mod test;

pub use auth::{ApiKeyCredential, AuthScheme, BasicCredential, Credentials};
pub use cache::{CacheStore, CacheTtl, Cached, MemoryStore};
pub use error::*;
pub use gateway::{Autocomplete, Gateway, RandomQuery, SearchQuery, DEFAULT_RESULTS};
pub use post::{Post, PostList, TagFormat};
pub use registry::{BooruDescriptor, BooruFamily, Registry, REGISTRY};
pub use sampler::SamplerConfig;
pub use tags::TagInput;
