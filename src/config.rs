use serde::Deserialize;

/// Main configuration for the geopost service
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Service configuration
    #[serde(default)]
    pub service: ServiceConfig,
    /// API configuration
    #[serde(default)]
    pub api: ApiConfig,
    /// Search index configuration
    pub index: IndexConfig,
    /// S3 configuration for image storage
    pub s3: S3Config,
    /// Session token configuration
    pub auth: AuthConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    /// Service name for logging
    #[serde(default = "default_service_name")]
    pub name: String,
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// API listen address
    #[serde(default = "default_api_host")]
    pub host: String,
    /// API listen port
    #[serde(default = "default_api_port")]
    pub port: u16,
}

/// Search index configuration
#[derive(Debug, Clone, Deserialize)]
pub struct IndexConfig {
    /// Meilisearch URL
    pub url: String,
    /// Meilisearch API key
    pub api_key: Option<String>,
    /// Index holding user records, keyed by username
    #[serde(default = "default_users_index")]
    pub users_index: String,
    /// Index holding post records, keyed by generated post id
    #[serde(default = "default_posts_index")]
    pub posts_index: String,
}

/// S3 storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct S3Config {
    /// S3 bucket name for post images
    pub bucket: String,
    /// AWS region
    #[serde(default = "default_region")]
    pub region: String,
    /// Custom endpoint URL (for MinIO, LocalStack, etc.)
    pub endpoint_url: Option<String>,
    /// Force path-style access (required for MinIO)
    #[serde(default)]
    pub force_path_style: bool,
}

/// Session token configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Shared secret used to sign session tokens
    pub secret: String,
    /// Token lifetime in hours
    #[serde(default = "default_token_ttl_hours")]
    pub token_ttl_hours: i64,
}

// Default value functions
fn default_service_name() -> String {
    "geopost".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_api_host() -> String {
    "0.0.0.0".to_string()
}

fn default_api_port() -> u16 {
    8080
}

fn default_users_index() -> String {
    "users".to_string()
}

fn default_posts_index() -> String {
    "posts".to_string()
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_token_ttl_hours() -> i64 {
    24
}

impl Config {
    /// Load configuration from environment and config files
    pub fn load() -> anyhow::Result<Self> {
        let config = config::Config::builder()
            // Add config file if present
            .add_source(config::File::with_name("config/geopost").required(false))
            .add_source(config::File::with_name("/etc/geopost/geopost").required(false))
            // Override with environment variables
            // GEOPOST__INDEX__URL -> index.url
            .add_source(
                config::Environment::with_prefix("GEOPOST")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize().map_err(Into::into)
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_level: default_log_level(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_api_host(),
            port: default_api_port(),
        }
    }
}
