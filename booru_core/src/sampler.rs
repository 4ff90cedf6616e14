// Random sampling over a booru without a random endpoint: fetch one large
// page, shuffle it, keep the first N. Empty or broken pages are retried on
// another page until the attempt budget runs out.

use rand::{seq::SliceRandom, Rng};

use std::future::Future;

use crate::error::{Error, Result};
use crate::post::PostList;

pub const NO_POSTS: &str = "No posts found with the given tags";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplerConfig {
    /// Pages are drawn from `0..max_page`.
    pub max_page: u32,
    pub max_tries: u32,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        SamplerConfig {
            max_page: 12,
            max_tries: 6,
        }
    }
}

/// Attempt counter and the page the next attempt fetches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplerState {
    pub tries: u32,
    pub page: u32,
}

impl SamplerConfig {
    /// The first attempt probes a page past the drawing range.
    pub fn initial_state(&self) -> SamplerState {
        SamplerState {
            tries: 0,
            page: self.max_page + 4,
        }
    }

    /// State after a failed attempt. The final attempt always reads page 0;
    /// earlier ones draw a page different from the one that just failed.
    pub fn next_state<R: Rng + ?Sized>(&self, state: SamplerState, rng: &mut R) -> SamplerState {
        let tries = state.tries + 1;
        let page = if tries >= self.max_tries.saturating_sub(1) || self.max_page <= 1 {
            0
        } else {
            loop {
                let page = rng.gen_range(0..self.max_page);
                if page != state.page {
                    break page;
                }
            }
        };
        SamplerState { tries, page }
    }
}

/// Run `fetch` page by page until it yields posts, then return `results` of them in random order.
///
/// An upstream status error on the first attempt is returned as is. Every other failure,
/// including an empty page, counts as one try. Exhausting the budget yields `NotFound`.
pub async fn sample<F, Fut>(config: &SamplerConfig, results: usize, mut fetch: F) -> Result<PostList>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<Option<PostList>>>,
{
    let mut state = config.initial_state();

    while state.tries < config.max_tries {
        match fetch(state.page).await {
            Ok(Some(mut list)) if !list.posts.is_empty() => {
                tracing::debug!("Sampled page {} after {} failed tries", state.page, state.tries);
                list.posts.shuffle(&mut rand::thread_rng());
                list.posts.truncate(results);
                return Ok(list);
            }
            Ok(_) => tracing::debug!("Page {} is empty", state.page),
            Err(err) if state.tries == 0 && err.upstream_status().is_some() => return Err(err),
            Err(err) => tracing::warn!("Page {} failed: {}", state.page, err),
        }
        state = config.next_state(state, &mut rand::thread_rng());
    }

    Err(Error::NotFound(NO_POSTS.to_string()))
}
