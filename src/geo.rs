use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::error::AppError;
use crate::index_store::{IndexStore, PostDocument};
use crate::posts::Post;

/// Radius applied when the caller does not specify one, in kilometers
pub const DEFAULT_RADIUS_KM: f64 = 200.0;

/// Runs geo-distance queries and decodes the hits into posts
#[derive(Clone)]
pub struct GeoSearchService {
    index: Arc<IndexStore>,
}

impl GeoSearchService {
    pub fn new(index: Arc<IndexStore>) -> Self {
        Self { index }
    }

    /// Find posts within `radius_km` (default 200 km) of the given center.
    /// Results keep the order the index store yields; hits that do not
    /// decode into the post shape are skipped, never an error. An empty
    /// match set is an empty vec.
    #[instrument(skip(self))]
    pub async fn search(
        &self,
        lat: f64,
        lon: f64,
        radius_km: Option<f64>,
    ) -> Result<Vec<Post>, AppError> {
        let radius_km = radius_km.unwrap_or(DEFAULT_RADIUS_KM);
        let hits = self.index.geo_search(lat, lon, radius_km).await?;

        let posts = decode_hits(hits);
        debug!(count = posts.len(), "Geo search complete");

        Ok(posts)
    }
}

/// Decode raw index hits into posts, skipping any hit that does not match
/// the post shape
fn decode_hits(hits: Vec<Value>) -> Vec<Post> {
    hits.into_iter()
        .filter_map(|hit| match serde_json::from_value::<PostDocument>(hit) {
            Ok(doc) => Some(doc.into()),
            Err(e) => {
                warn!(error = %e, "Skipping search hit that does not decode into a post");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn well_formed_hit(user: &str) -> Value {
        json!({
            "id": "id-1",
            "user": user,
            "message": "hello",
            "_geo": { "lat": 37.7749, "lng": -122.4194 },
            "url": "https://example.com/id-1"
        })
    }

    #[test]
    fn test_decode_hits() {
        let posts = decode_hits(vec![well_formed_hit("alice")]);
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].user, "alice");
        assert_eq!(posts[0].location.lat, 37.7749);
    }

    #[test]
    fn test_decode_skips_malformed_hits() {
        let malformed = json!({ "user": "bob", "message": 42 });
        let posts = decode_hits(vec![malformed, well_formed_hit("alice")]);

        // One malformed and one well-formed hit yield a one-element result
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].user, "alice");
    }

    #[test]
    fn test_decode_preserves_index_order() {
        let posts = decode_hits(vec![well_formed_hit("alice"), {
            let mut hit = well_formed_hit("bob");
            hit["id"] = json!("id-2");
            hit
        }]);

        assert_eq!(posts[0].user, "alice");
        assert_eq!(posts[1].user, "bob");
    }

    #[test]
    fn test_empty_hits_yield_empty_result() {
        assert!(decode_hits(Vec::new()).is_empty());
    }

    #[test]
    fn test_default_radius() {
        assert_eq!(DEFAULT_RADIUS_KM, 200.0);
    }
}
