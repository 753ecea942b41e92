use std::sync::Arc;

use anyhow::Context;
use axum::{
    extract::{Multipart, Query, State},
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        StatusCode,
    },
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::Deserialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, instrument};

use crate::auth::{require_auth, AuthenticatedUser, TokenIssuer};
use crate::error::AppError;
use crate::geo::GeoSearchService;
use crate::index_store::IndexStore;
use crate::media_store::MediaStore;
use crate::posts::{parse_coordinate, ImageUpload, NewPost, Post, PostService};
use crate::users::{valid_username, User, UserDirectory};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub users: UserDirectory,
    pub posts: PostService,
    pub geo: GeoSearchService,
    pub tokens: TokenIssuer,
}

impl AppState {
    pub fn new(index: Arc<IndexStore>, media: Arc<MediaStore>, tokens: TokenIssuer) -> Self {
        Self {
            users: UserDirectory::new(index.clone()),
            posts: PostService::new(index.clone(), media),
            geo: GeoSearchService::new(index),
            tokens,
        }
    }
}

/// Create the API router. `/post` and `/search` sit behind the token
/// verification middleware; `/signup` and `/login` are public.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers([CONTENT_TYPE, AUTHORIZATION]);

    let protected = Router::new()
        .route("/post", post(create_post))
        .route("/search", get(search_posts))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            require_auth,
        ));

    Router::new()
        .route("/health", get(health_check))
        .route("/signup", post(signup))
        .route("/login", post(login))
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "geopost"
    }))
}

/// Login payload
#[derive(Debug, Deserialize)]
struct Credentials {
    username: String,
    password: String,
}

/// Query parameters for geo search. Coordinates arrive as strings and
/// follow the same parse-or-zero rule as post submission.
#[derive(Debug, Deserialize)]
struct SearchParams {
    lat: Option<String>,
    lon: Option<String>,
    /// Radius in kilometers; defaults to 200 km when absent
    range: Option<String>,
}

/// Register a new user. Validation happens before any storage call.
#[instrument(skip(state, user), fields(username = %user.username))]
async fn signup(
    State(state): State<AppState>,
    Json(user): Json<User>,
) -> Result<&'static str, AppError> {
    if user.username.is_empty() || user.password.is_empty() || !valid_username(&user.username) {
        return Err(AppError::InvalidSignup);
    }

    if state.users.create_user(&user).await {
        info!("Signup succeeded");
        Ok("User added successfully.")
    } else {
        Err(AppError::SignupFailed)
    }
}

/// Exchange valid credentials for a session token
#[instrument(skip(state, credentials), fields(username = %credentials.username))]
async fn login(
    State(state): State<AppState>,
    Json(credentials): Json<Credentials>,
) -> Result<String, AppError> {
    if !state
        .users
        .find_user(&credentials.username, &credentials.password)
        .await
    {
        return Err(AppError::InvalidCredentials);
    }

    let token = state
        .tokens
        .issue(&credentials.username)
        .context("Failed to sign session token")?;

    Ok(token)
}

/// Submit a post as the authenticated user: multipart form with `message`,
/// `lat`, `lon` and a mandatory `image` file part
async fn create_post(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    mut multipart: Multipart,
) -> Result<StatusCode, AppError> {
    let mut message = String::new();
    let mut raw_lat = String::new();
    let mut raw_lon = String::new();
    let mut image = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .context("Failed to read multipart form")?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "message" => {
                message = field
                    .text()
                    .await
                    .context("Failed to read message field")?;
            }
            "lat" => {
                raw_lat = field.text().await.context("Failed to read lat field")?;
            }
            "lon" => {
                raw_lon = field.text().await.context("Failed to read lon field")?;
            }
            "image" => {
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let data = field
                    .bytes()
                    .await
                    .context("Failed to read image field")?
                    .to_vec();
                image = Some(ImageUpload { data, content_type });
            }
            _ => {}
        }
    }

    state
        .posts
        .ingest(NewPost {
            author: user.username,
            message,
            raw_lat,
            raw_lon,
            image,
        })
        .await?;

    Ok(StatusCode::OK)
}

/// Search posts around a center point as the authenticated user
async fn search_posts(
    State(state): State<AppState>,
    Extension(_user): Extension<AuthenticatedUser>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<Post>>, AppError> {
    let lat = parse_coordinate(params.lat.as_deref().unwrap_or_default());
    let lon = parse_coordinate(params.lon.as_deref().unwrap_or_default());
    let radius_km = parse_range(params.range.as_deref());

    let posts = state.geo.search(lat, lon, radius_km).await?;

    Ok(Json(posts))
}

/// Parse the optional `range` parameter (kilometers). A missing or
/// unparsable value falls back to the default radius.
fn parse_range(range: Option<&str>) -> Option<f64> {
    range.and_then(|value| value.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_range() {
        assert_eq!(parse_range(Some("1")), Some(1.0));
        assert_eq!(parse_range(Some("0.001")), Some(0.001));
        assert_eq!(parse_range(Some("200")), Some(200.0));
    }

    #[test]
    fn test_parse_range_missing_or_malformed() {
        assert_eq!(parse_range(None), None);
        assert_eq!(parse_range(Some("")), None);
        assert_eq!(parse_range(Some("far")), None);
    }
}
