use anyhow::{Context, Result};
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::Builder as S3ConfigBuilder;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::ObjectCannedAcl;
use aws_sdk_s3::Client as S3Client;
use tracing::{info, instrument};

use crate::config::S3Config;

/// Blob uploader for post images. Objects are written under the generated
/// post id with a public-read ACL; the returned URL is stable and embedded
/// by value into the post record.
pub struct MediaStore {
    client: S3Client,
    bucket: String,
    public_base: String,
}

impl MediaStore {
    /// Create a new media store client
    pub async fn new(config: &S3Config) -> Result<Self> {
        let aws_config = aws_config::defaults(BehaviorVersion::latest())
            .region(aws_config::Region::new(config.region.clone()))
            .load()
            .await;

        let mut s3_config_builder = S3ConfigBuilder::from(&aws_config);

        // Configure custom endpoint for MinIO/LocalStack
        if let Some(ref endpoint_url) = config.endpoint_url {
            s3_config_builder = s3_config_builder.endpoint_url(endpoint_url);
        }

        // Force path-style access for MinIO compatibility
        if config.force_path_style {
            s3_config_builder = s3_config_builder.force_path_style(true);
        }

        let client = S3Client::from_conf(s3_config_builder.build());

        info!(
            bucket = %config.bucket,
            region = %config.region,
            "Media store initialized"
        );

        Ok(Self {
            client,
            bucket: config.bucket.clone(),
            public_base: public_base_url(config),
        })
    }

    /// Upload an image under the given object id and return its public URL.
    /// The ACL rides on the put itself, so no world-readable partial object
    /// can exist if the upload fails midway.
    #[instrument(skip(self, data), fields(object_id = %object_id, size_bytes = data.len()))]
    pub async fn upload(&self, data: Vec<u8>, object_id: &str, content_type: &str) -> Result<String> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(object_id)
            .body(ByteStream::from(data))
            .content_type(content_type)
            .acl(ObjectCannedAcl::PublicRead)
            .send()
            .await
            .context("Failed to upload image to blob store")?;

        let url = self.object_url(object_id);
        info!(url = %url, "Image uploaded");

        Ok(url)
    }

    /// Public retrieval URL for an object in the configured bucket
    pub fn object_url(&self, object_id: &str) -> String {
        format!("{}/{}", self.public_base, object_id)
    }
}

/// Base URL for public object access: path-style against a custom endpoint
/// (MinIO/LocalStack), virtual-hosted style against AWS proper.
fn public_base_url(config: &S3Config) -> String {
    match &config.endpoint_url {
        Some(endpoint) => format!("{}/{}", endpoint.trim_end_matches('/'), config.bucket),
        None => format!("https://{}.s3.{}.amazonaws.com", config.bucket, config.region),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(endpoint_url: Option<&str>) -> S3Config {
        S3Config {
            bucket: "post-images".to_string(),
            region: "us-east-1".to_string(),
            endpoint_url: endpoint_url.map(String::from),
            force_path_style: endpoint_url.is_some(),
        }
    }

    #[test]
    fn test_public_base_url_aws() {
        let base = public_base_url(&test_config(None));
        assert_eq!(base, "https://post-images.s3.us-east-1.amazonaws.com");
    }

    #[test]
    fn test_public_base_url_custom_endpoint() {
        let base = public_base_url(&test_config(Some("http://localhost:9000")));
        assert_eq!(base, "http://localhost:9000/post-images");
    }

    #[test]
    fn test_public_base_url_trailing_slash() {
        let base = public_base_url(&test_config(Some("http://localhost:9000/")));
        assert_eq!(base, "http://localhost:9000/post-images");
    }
}
