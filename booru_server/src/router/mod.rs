pub mod api;

use axum::Router;
use tower_http::trace::TraceLayer;

use crate::{error::fallback, state::AppState};

pub fn app(app_state: AppState) -> Router {
    Router::new()
        .merge(api::api_router())
        .fallback(fallback)
        .layer(TraceLayer::new_for_http().on_request(()))
        .with_state(app_state)
}
