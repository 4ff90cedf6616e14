use tokio_retry::{strategy::FixedInterval, Retry};

use std::{collections::HashMap, future::Future};

use booru_core::TagFormat;

pub const DEFAULT_RETRY_DELAY_MS: u64 = 1000;
pub const DEFAULT_RETRY_COUNT: usize = 5;

/// `force=true` or `force=1` in the query string.
pub fn get_flag(params: &HashMap<String, String>, name: &str) -> bool {
    params
        .get(name)
        .map_or(false, |value| matches!(value.as_str(), "true" | "1"))
}

pub fn get_tag_format(params: &HashMap<String, String>) -> TagFormat {
    params
        .get("tagFormat")
        .or_else(|| params.get("tag_format"))
        .map(|value| TagFormat::from(value.as_str()))
        .unwrap_or_default()
}

/// Retry a fallible startup step at a fixed interval.
pub fn retry<R, T: Future<Output = anyhow::Result<R>>, F: FnMut() -> T>(
    mut f: F,
) -> impl Future<Output = anyhow::Result<R>> {
    let strategy = FixedInterval::from_millis(DEFAULT_RETRY_DELAY_MS).take(DEFAULT_RETRY_COUNT);
    Retry::spawn(strategy, move || {
        let attempt = f();
        async move {
            attempt.await.map_err(|err| {
                tracing::warn!("{:#}", err);
                err
            })
        }
    })
}
