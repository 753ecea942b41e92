use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::AppError;
use crate::index_store::{GeoPoint, IndexStore, PostDocument};
use crate::media_store::MediaStore;

/// Coordinate pair in the wire shape
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lon: f64,
}

/// Post as serialized to and from clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub user: String,
    pub message: String,
    pub location: Location,
    pub url: String,
}

impl From<PostDocument> for Post {
    fn from(doc: PostDocument) -> Self {
        Self {
            user: doc.user,
            message: doc.message,
            location: Location {
                lat: doc.geo.lat,
                lon: doc.geo.lng,
            },
            url: doc.url,
        }
    }
}

/// Image part of a post submission
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub data: Vec<u8>,
    pub content_type: String,
}

/// Raw post submission as it arrives from the form
#[derive(Debug)]
pub struct NewPost {
    pub author: String,
    pub message: String,
    pub raw_lat: String,
    pub raw_lon: String,
    pub image: Option<ImageUpload>,
}

/// Parse a coordinate string. Unparsable values silently become 0.0; the
/// submission is never rejected for a bad coordinate.
pub fn parse_coordinate(raw: &str) -> f64 {
    raw.parse().unwrap_or(0.0)
}

/// Assembles post records and coordinates the blob upload with the index
/// write. A post is written only after its image upload succeeded.
#[derive(Clone)]
pub struct PostService {
    index: Arc<IndexStore>,
    media: Arc<MediaStore>,
}

impl PostService {
    pub fn new(index: Arc<IndexStore>, media: Arc<MediaStore>) -> Self {
        Self { index, media }
    }

    /// Ingest a post: parse coordinates, upload the image under a fresh
    /// post id, then write the record with refresh-on-write visibility.
    /// A missing image aborts before any storage call; a failed upload
    /// aborts before the index write. An uploaded blob is not rolled back
    /// if the index write fails.
    #[instrument(skip(self, input), fields(author = %input.author))]
    pub async fn ingest(&self, input: NewPost) -> Result<Post, AppError> {
        let location = Location {
            lat: parse_coordinate(&input.raw_lat),
            lon: parse_coordinate(&input.raw_lon),
        };

        let id = Uuid::new_v4().to_string();

        let image = input.image.ok_or(AppError::ImageMissing)?;
        let url = self
            .media
            .upload(image.data, &id, &image.content_type)
            .await?;

        let document = PostDocument {
            id: id.clone(),
            user: input.author,
            message: input.message,
            geo: GeoPoint {
                lat: location.lat,
                lng: location.lon,
            },
            url,
        };

        self.index.put_post(&document).await?;

        info!(post_id = %id, "Post ingested");

        Ok(document.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{IndexConfig, S3Config};

    #[test]
    fn test_parse_coordinate() {
        assert_eq!(parse_coordinate("37.7749"), 37.7749);
        assert_eq!(parse_coordinate("-122.4194"), -122.4194);
        assert_eq!(parse_coordinate("0"), 0.0);
    }

    #[test]
    fn test_parse_coordinate_quirk() {
        // Unparsable coordinates become 0.0 instead of a rejection
        assert_eq!(parse_coordinate(""), 0.0);
        assert_eq!(parse_coordinate("abc"), 0.0);
        assert_eq!(parse_coordinate("12.3.4"), 0.0);
    }

    #[test]
    fn test_post_wire_shape_round_trip() {
        let post = Post {
            user: "alice".to_string(),
            message: "hello".to_string(),
            location: Location {
                lat: 37.7749,
                lon: -122.4194,
            },
            url: "https://example.com/img".to_string(),
        };

        let json = serde_json::to_string(&post).unwrap();
        let parsed: Post = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, post);
    }

    #[test]
    fn test_post_from_document() {
        let doc = PostDocument {
            id: "id-1".to_string(),
            user: "alice".to_string(),
            message: "hello".to_string(),
            geo: GeoPoint {
                lat: 1.0,
                lng: 2.0,
            },
            url: "https://example.com/id-1".to_string(),
        };

        let post: Post = doc.into();
        assert_eq!(post.location, Location { lat: 1.0, lon: 2.0 });
        assert_eq!(post.user, "alice");
    }

    #[tokio::test]
    async fn test_ingest_without_image_fails_before_any_write() {
        let index = Arc::new(
            IndexStore::new(&IndexConfig {
                url: "http://localhost:7700".to_string(),
                api_key: None,
                users_index: "users".to_string(),
                posts_index: "posts".to_string(),
            })
            .unwrap(),
        );
        let media = Arc::new(
            MediaStore::new(&S3Config {
                bucket: "post-images".to_string(),
                region: "us-east-1".to_string(),
                endpoint_url: Some("http://localhost:9000".to_string()),
                force_path_style: true,
            })
            .await
            .unwrap(),
        );

        let service = PostService::new(index, media);
        let result = service
            .ingest(NewPost {
                author: "alice".to_string(),
                message: "hello".to_string(),
                raw_lat: "1.0".to_string(),
                raw_lon: "2.0".to_string(),
                image: None,
            })
            .await;

        // The image check happens before the blob store or the index store
        // is contacted, so this fails fast even with no services running.
        assert!(matches!(result, Err(AppError::ImageMissing)));
    }
}
