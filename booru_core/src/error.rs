use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("{0}")]
    InvalidInput(String),
    #[error("Booru `{0}` not found")]
    BooruNotFound(String),
    #[error("Booru `{0}` is disabled")]
    BooruDisabled(String),
    #[error("Missing {0} authentication headers")]
    Unauthorized(String),
    #[error("{0} does not support {1} (yet)")]
    Unsupported(String, String),

    #[error("{0}")]
    NotFound(String),
    #[error("Unexpected data format from {0}")]
    UnexpectedShape(String),

    #[error("Cache store error: {0}")]
    StoreError(String),
    #[error("Cannot encode/decode JSON: {0}")]
    JSONError(#[from] serde_json::Error),
    #[error(transparent)]
    ClientError(#[from] booru_client::Error),
}

impl Error {
    /// Transport failures where the upstream did answer, with a non-2xx status.
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            Error::ClientError(err) => err.status(),
            _ => None,
        }
    }
}
