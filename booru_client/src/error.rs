use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[allow(clippy::enum_variant_names)]
#[derive(Error, Debug)]
pub enum Error {
    /// Upstream answered with a non-2xx status.
    #[error("Upstream responded {status}: {reason}")]
    StatusError { status: u16, reason: String },
    #[error("Upstream timed out after {0} ms")]
    Timeout(u64),
    #[error("Invalid header: {0}")]
    InvalidHeader(String),
    #[error("Cannot encode/decode JSON: {0}")]
    JSONError(#[from] serde_json::Error),
    #[error("IO Error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Network Error: {0}")]
    NetworkError(#[from] reqwest::Error),
    #[error("Cannot parse URL: {0}")]
    UrlError(#[from] url::ParseError),
}

impl Error {
    /// The upstream HTTP status, if the upstream answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::StatusError { status, .. } => Some(*status),
            _ => None,
        }
    }
}
