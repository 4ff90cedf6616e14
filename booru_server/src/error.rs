use axum::{
    extract::rejection::JsonRejection,
    http::{StatusCode, Uri},
    response::{IntoResponse, Json, Response},
};
use serde_json::json;

use booru_core::Error as CoreError;

pub type Result<T> = std::result::Result<T, ServerError>;

#[derive(Debug)]
pub struct ServerError(anyhow::Error);

impl<E> From<E> for ServerError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

impl std::fmt::Display for ServerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        tracing::error!("{}", self);
        let status = self.status_code();
        let body = json!({
            "success": false,
            "code": status.as_u16(),
            "error": self.to_string(),
        });
        (status, Json(body)).into_response()
    }
}

impl ServerError {
    pub fn status_code(&self) -> StatusCode {
        let err = &self.0;
        for cause in err.chain() {
            if let Some(err) = cause.downcast_ref::<CoreError>() {
                match err {
                    CoreError::InvalidInput(_) => return StatusCode::BAD_REQUEST,
                    CoreError::BooruNotFound(_) => return StatusCode::NOT_FOUND,
                    CoreError::NotFound(_) => return StatusCode::NOT_FOUND,
                    CoreError::BooruDisabled(_) => return StatusCode::FORBIDDEN,
                    CoreError::Unauthorized(_) => return StatusCode::UNAUTHORIZED,
                    CoreError::Unsupported(..) => return StatusCode::NOT_IMPLEMENTED,
                    CoreError::ClientError(err) => return client_status(err),
                    _ => return StatusCode::INTERNAL_SERVER_ERROR,
                }
            }
            if let Some(err) = cause.downcast_ref::<booru_client::Error>() {
                return client_status(err);
            }
            if cause.downcast_ref::<JsonRejection>().is_some() {
                return StatusCode::BAD_REQUEST;
            }
        }
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

/// The upstream's own status when it answered, else 500.
fn client_status(err: &booru_client::Error) -> StatusCode {
    err.status()
        .and_then(|status| StatusCode::from_u16(status).ok())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

pub async fn fallback(uri: Uri) -> ServerError {
    CoreError::NotFound(format!("No route for {}", uri.path())).into()
}
