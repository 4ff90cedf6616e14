use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::HeaderMap,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Serialize;

use std::collections::HashMap;

use booru_core::{Autocomplete, BooruDescriptor, Cached, Post, PostList};

use crate::{
    error::Result,
    payload::{credentials, PostsRequest},
    state::AppState,
    util::{get_flag, get_tag_format},
};

pub fn api_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_boorus))
        .route("/:booru/search", post(search_posts))
        .route("/:booru/random", post(random_posts))
        .route("/:booru/id/:id", get(get_post))
        .route("/:booru/autocomplete/:tag", get(autocomplete_tag))
        .route("/nsfw/:booru/autocomplete/:tag", get(autocomplete_tag))
}

/// Success envelope: `{ success, code, cache, ...body }`.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    success: bool,
    code: u16,
    cache: bool,
    #[serde(flatten)]
    body: T,
}

impl<T> From<Cached<T>> for Envelope<T> {
    fn from(cached: Cached<T>) -> Self {
        Envelope {
            success: true,
            code: 200,
            cache: cached.from_cache,
            body: cached.value,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PostBody {
    post: Post,
}

#[derive(Debug, Serialize)]
pub struct BooruList<'a> {
    boorus: &'a [BooruDescriptor],
}

/// A missing body counts as an empty request.
fn posts_request(payload: std::result::Result<Json<PostsRequest>, JsonRejection>) -> Result<PostsRequest> {
    match payload {
        Ok(Json(payload)) => Ok(payload),
        Err(JsonRejection::MissingJsonContentType(_)) => Ok(PostsRequest::default()),
        Err(err) => Err(err.into()),
    }
}

async fn list_boorus(State(app_state): State<AppState>) -> Json<Envelope<BooruList<'static>>> {
    let boorus = app_state.gateway.registry().all();
    Json(Envelope {
        success: true,
        code: 200,
        cache: false,
        body: BooruList { boorus },
    })
}

async fn search_posts(
    State(app_state): State<AppState>,
    Path(booru): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
    payload: std::result::Result<Json<PostsRequest>, JsonRejection>,
) -> Result<Json<Envelope<PostList>>> {
    let query = posts_request(payload)?.into_search(get_flag(&params, "force"))?;
    let result = app_state.gateway.search(&booru, &query, &credentials(&headers)).await?;
    Ok(Json(result.into()))
}

async fn random_posts(
    State(app_state): State<AppState>,
    Path(booru): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
    payload: std::result::Result<Json<PostsRequest>, JsonRejection>,
) -> Result<Json<Envelope<PostList>>> {
    let query = posts_request(payload)?.into_random(get_flag(&params, "force"))?;
    let result = app_state.gateway.random(&booru, &query, &credentials(&headers)).await?;
    Ok(Json(result.into()))
}

async fn get_post(
    State(app_state): State<AppState>,
    Path((booru, id)): Path<(String, String)>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Result<Json<Envelope<PostBody>>> {
    let result = app_state
        .gateway
        .lookup_by_id(
            &booru,
            &id,
            get_tag_format(&params),
            get_flag(&params, "force"),
            &credentials(&headers),
        )
        .await?;
    Ok(Json(Envelope {
        success: true,
        code: 200,
        cache: result.from_cache,
        body: PostBody { post: result.value },
    }))
}

async fn autocomplete_tag(
    State(app_state): State<AppState>,
    Path((booru, tag)): Path<(String, String)>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Result<Json<Envelope<Autocomplete>>> {
    let result = app_state
        .gateway
        .autocomplete(&booru, &tag, get_flag(&params, "force"), &credentials(&headers))
        .await?;
    Ok(Json(result.into()))
}
