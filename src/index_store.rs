use anyhow::{bail, Context, Result};
use meilisearch_sdk::client::Client;
use meilisearch_sdk::settings::Settings;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::IndexConfig;

/// User record as stored in the index. The `password` field holds a
/// bcrypt hash, never the plaintext password.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserDocument {
    pub username: String,
    pub password: String,
    pub age: u32,
    pub gender: String,
}

/// Geo coordinate in the index store's native field shape.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

/// Post record as stored in the index. Differs from the wire shape: it
/// carries the generated id and keeps the coordinates under `_geo` so the
/// engine can serve geo-distance filters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostDocument {
    pub id: String,
    pub user: String,
    pub message: String,
    #[serde(rename = "_geo")]
    pub geo: GeoPoint,
    pub url: String,
}

/// Typed adapter over the Meilisearch client. All writes wait for task
/// completion, so a returned `Ok` means the document is already visible
/// to subsequent searches.
pub struct IndexStore {
    client: Client,
    users_index: String,
    posts_index: String,
}

impl IndexStore {
    /// Create a new index store client
    pub fn new(config: &IndexConfig) -> Result<Self> {
        let client = Client::new(&config.url, config.api_key.as_deref())
            .context("Failed to create search index client")?;

        Ok(Self {
            client,
            users_index: config.users_index.clone(),
            posts_index: config.posts_index.clone(),
        })
    }

    /// Idempotently create the user and post indexes and configure their
    /// filterable attributes. Fatal at startup if the engine is unreachable.
    pub async fn ensure_indexes(&self) -> Result<()> {
        self.ensure_index(&self.users_index, "username", &["username"])
            .await?;
        self.ensure_index(&self.posts_index, "id", &["_geo"]).await?;

        info!(
            users_index = %self.users_index,
            posts_index = %self.posts_index,
            "Search indexes ready"
        );

        Ok(())
    }

    async fn ensure_index(&self, name: &str, primary_key: &str, filterable: &[&str]) -> Result<()> {
        if self.client.get_index(name).await.is_err() {
            let task = self
                .client
                .create_index(name, Some(primary_key))
                .await
                .with_context(|| format!("Failed to create index {name}"))?
                .wait_for_completion(&self.client, None, None)
                .await
                .with_context(|| format!("Failed to wait for creation of index {name}"))?;

            if task.is_failure() {
                bail!("Index creation task failed for {name}");
            }

            debug!(index = name, "Created search index");
        }

        let settings = Settings::new().with_filterable_attributes(filterable);
        let task = self
            .client
            .index(name)
            .set_settings(&settings)
            .await
            .with_context(|| format!("Failed to configure index {name}"))?
            .wait_for_completion(&self.client, None, None)
            .await
            .with_context(|| format!("Failed to wait for settings of index {name}"))?;

        if task.is_failure() {
            bail!("Index settings task failed for {name}");
        }

        Ok(())
    }

    /// Write a user record keyed by username, waiting until it is searchable
    pub async fn put_user(&self, user: &UserDocument) -> Result<()> {
        self.put_document(&self.users_index, user, "username").await
    }

    /// Write a post record keyed by its generated id, waiting until it is
    /// searchable
    pub async fn put_post(&self, post: &PostDocument) -> Result<()> {
        self.put_document(&self.posts_index, post, "id").await
    }

    async fn put_document<T>(&self, index: &str, doc: &T, primary_key: &str) -> Result<()>
    where
        T: Serialize + Send + Sync,
    {
        let task = self
            .client
            .index(index)
            .add_or_replace(std::slice::from_ref(doc), Some(primary_key))
            .await
            .with_context(|| format!("Failed to write document to index {index}"))?
            .wait_for_completion(&self.client, None, None)
            .await
            .with_context(|| format!("Failed to wait for write to index {index}"))?;

        if task.is_failure() {
            bail!("Document write task failed for index {index}");
        }

        Ok(())
    }

    /// Exact-match username lookup returning every matching user record
    pub async fn find_users(&self, username: &str) -> Result<Vec<UserDocument>> {
        let filter = username_filter(username);
        let results = self
            .client
            .index(&self.users_index)
            .search()
            .with_filter(&filter)
            .execute::<UserDocument>()
            .await
            .context("User lookup query failed")?;

        Ok(results.hits.into_iter().map(|hit| hit.result).collect())
    }

    /// Geo-distance query against the post index. Hits come back as raw
    /// JSON values; the caller decides per hit whether a decode failure
    /// skips the hit or aborts.
    pub async fn geo_search(
        &self,
        lat: f64,
        lon: f64,
        radius_km: f64,
    ) -> Result<Vec<serde_json::Value>> {
        let filter = geo_filter(lat, lon, radius_km);
        debug!(filter = %filter, "Executing geo query");

        let results = self
            .client
            .index(&self.posts_index)
            .search()
            .with_filter(&filter)
            .execute::<serde_json::Value>()
            .await
            .context("Geo-distance query failed")?;

        Ok(results.hits.into_iter().map(|hit| hit.result).collect())
    }
}

/// Build an exact-match filter for a username. Values are quoted and
/// escaped so a crafted username cannot break out of the filter string.
fn username_filter(username: &str) -> String {
    format!("username = '{}'", escape_filter_value(username))
}

/// Build a geo-distance filter centered at (lat, lon) with the radius in
/// kilometers. The engine expects the distance in meters.
fn geo_filter(lat: f64, lon: f64, radius_km: f64) -> String {
    format!("_geoRadius({}, {}, {})", lat, lon, radius_km * 1000.0)
}

fn escape_filter_value(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}
