//! Geopost Service
//!
//! Geo-tagged social post service: users sign up, authenticate with JWT
//! session tokens, submit posts (text + image + coordinates), and search
//! posts by proximity. Posts coordinate two storage systems: the image
//! bytes go to an S3-compatible blob store under the generated post id,
//! and the post record goes to a Meilisearch index with the coordinates
//! in the engine's geo field.
//!
//! ## Architecture
//!
//! ```text
//! HTTP Boundary               Blob Store                Search Index
//! ┌──────────────┐           ┌──────────────┐          ┌──────────────┐
//! │ /signup      │           │ {post-id}    │          │ users        │
//! │ /login       │           │ (public-read │          │ posts (_geo) │
//! │ /post  (JWT) │──────────▶│  images)     │          └──────────────┘
//! │ /search (JWT)│           └──────────────┘                 ▲
//! └──────────────┘                  ▲                         │
//!        │                         │                         │
//!        ▼                         │                         │
//! ┌──────────────┐           ┌──────────────┐                │
//! │ Token        │           │ Post         │────────────────┘
//! │ Issuer       │           │ Ingestion    │
//! └──────────────┘           └──────────────┘
//!        │                          │
//!        ▼                          ▼
//! ┌──────────────┐           ┌──────────────┐
//! │ Identity     │           │ Geo Search   │
//! │ Directory    │           │ Service      │
//! └──────────────┘           └──────────────┘
//! ```
//!
//! Writes to the index wait for task completion, so a post is visible to
//! searches as soon as its submission returns.

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod geo;
pub mod index_store;
pub mod media_store;
pub mod posts;
pub mod users;

pub use api::{create_router, AppState};
pub use auth::{AuthenticatedUser, Claims, TokenIssuer};
pub use config::Config;
pub use error::AppError;
pub use geo::{GeoSearchService, DEFAULT_RADIUS_KM};
pub use index_store::{GeoPoint, IndexStore, PostDocument, UserDocument};
pub use media_store::MediaStore;
pub use posts::{ImageUpload, Location, NewPost, Post, PostService};
pub use users::{User, UserDirectory};
