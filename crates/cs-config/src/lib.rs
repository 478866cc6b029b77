//! CorpSite Configuration System
//!
//! TOML-based configuration with environment variable overrides. The
//! resulting [`AppConfig`] is built once at start-up and handed to the
//! services that need it.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

mod loader;

pub use loader::ConfigLoader;

const MIB: u64 = 1024 * 1024;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),

    #[error("Environment variable error: {0}")]
    EnvError(String),
}

/// Root application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub http: HttpConfig,
    pub mongodb: MongoConfig,
    pub auth: AuthConfig,
    pub storage: StorageConfig,
    pub seed: SeedConfig,
    pub site: SiteConfig,

    /// Enable development mode
    pub dev_mode: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            http: HttpConfig::default(),
            mongodb: MongoConfig::default(),
            auth: AuthConfig::default(),
            storage: StorageConfig::default(),
            seed: SeedConfig::default(),
            site: SiteConfig::default(),
            dev_mode: false,
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub port: u16,
    pub host: String,
    pub cors_origins: Vec<String>,
    /// Upper bound on any request body, multipart included.
    pub body_limit_bytes: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            port: 5000,
            host: "0.0.0.0".to_string(),
            cors_origins: vec!["http://localhost:3000".to_string()],
            body_limit_bytes: 60 * MIB,
        }
    }
}

/// MongoDB configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MongoConfig {
    pub uri: String,
    pub database: String,
    pub max_pool_size: u32,
    pub min_pool_size: u32,
    pub connect_timeout_secs: u64,
    pub server_selection_timeout_secs: u64,
}

impl Default for MongoConfig {
    fn default() -> Self {
        Self {
            uri: "mongodb://localhost:27017".to_string(),
            database: "corpsite".to_string(),
            max_pool_size: 10,
            min_pool_size: 0,
            connect_timeout_secs: 10,
            server_selection_timeout_secs: 5,
        }
    }
}

/// Token and password hashing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub issuer: String,
    pub access_token_expiry_secs: i64,
    pub refresh_token_expiry_secs: i64,
    pub password_reset_expiry_secs: i64,
    pub email_verification_expiry_secs: i64,
    /// Cookie consulted when no bearer header is present.
    pub cookie_name: String,
    pub cookie_secure: bool,
    /// Roles allowed through the admin gate.
    pub admin_roles: Vec<String>,
    pub argon2: Argon2Settings,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            issuer: "corpsite".to_string(),
            access_token_expiry_secs: 86_400,
            refresh_token_expiry_secs: 2_592_000,
            password_reset_expiry_secs: 3_600,
            email_verification_expiry_secs: 86_400,
            cookie_name: "token".to_string(),
            cookie_secure: false,
            admin_roles: vec!["admin".to_string(), "super_admin".to_string()],
            argon2: Argon2Settings::default(),
        }
    }
}

/// Argon2id cost parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Argon2Settings {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for Argon2Settings {
    fn default() -> Self {
        Self {
            memory_kib: 65_536,
            iterations: 3,
            parallelism: 4,
        }
    }
}

/// Blob store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// `memory` or `cloudinary`
    pub provider: String,
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
    pub base_folder: String,
    pub image_max_bytes: u64,
    pub document_max_bytes: u64,
    pub video_max_bytes: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            provider: "memory".to_string(),
            cloud_name: String::new(),
            api_key: String::new(),
            api_secret: String::new(),
            base_folder: "corpsite".to_string(),
            image_max_bytes: 5 * MIB,
            document_max_bytes: 10 * MIB,
            video_max_bytes: 50 * MIB,
        }
    }
}

/// Initial administrator created on first start when no super admin exists
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SeedConfig {
    pub enabled: bool,
    pub admin_email: String,
    pub admin_password: String,
    pub admin_name: String,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            admin_email: "admin@corpsite.local".to_string(),
            admin_password: String::new(),
            admin_name: "Super Admin".to_string(),
        }
    }
}

/// Public site settings used to build links in outgoing notifications
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    pub public_base_url: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            public_base_url: "http://localhost:3000".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration with environment variable override
    pub fn load() -> Result<Self, ConfigError> {
        let loader = ConfigLoader::new();
        loader.load()
    }

    /// Reject configurations the server cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.jwt_secret.is_empty() {
            return Err(ConfigError::ValidationError(
                "auth.jwt_secret must be set".to_string(),
            ));
        }
        if !self.dev_mode && self.auth.jwt_secret.len() < 32 {
            return Err(ConfigError::ValidationError(
                "auth.jwt_secret must be at least 32 bytes outside dev mode".to_string(),
            ));
        }
        if self.auth.access_token_expiry_secs <= 0 || self.auth.refresh_token_expiry_secs <= 0 {
            return Err(ConfigError::ValidationError(
                "token expiry windows must be positive".to_string(),
            ));
        }
        if self.mongodb.max_pool_size == 0 {
            return Err(ConfigError::ValidationError(
                "mongodb.max_pool_size must be positive".to_string(),
            ));
        }
        if self.auth.admin_roles.is_empty() {
            return Err(ConfigError::ValidationError(
                "auth.admin_roles must name at least one role".to_string(),
            ));
        }
        match self.storage.provider.as_str() {
            "memory" => {}
            "cloudinary" => {
                if self.storage.cloud_name.is_empty()
                    || self.storage.api_key.is_empty()
                    || self.storage.api_secret.is_empty()
                {
                    return Err(ConfigError::ValidationError(
                        "cloudinary storage requires cloud_name, api_key and api_secret".to_string(),
                    ));
                }
            }
            other => {
                return Err(ConfigError::ValidationError(format!(
                    "unknown storage provider '{}'",
                    other
                )))
            }
        }
        Ok(())
    }

    /// Generate an example TOML configuration
    pub fn example_toml() -> String {
        r#"# CorpSite Configuration
# Environment variables (CORPSITE_*) override these settings

dev_mode = false

[http]
port = 5000
host = "0.0.0.0"
cors_origins = ["http://localhost:3000"]
body_limit_bytes = 62914560

[mongodb]
uri = "mongodb://localhost:27017"
database = "corpsite"
max_pool_size = 10
min_pool_size = 0
connect_timeout_secs = 10
server_selection_timeout_secs = 5

[auth]
jwt_secret = "change-me-to-a-long-random-string-of-32-bytes"
issuer = "corpsite"
access_token_expiry_secs = 86400
refresh_token_expiry_secs = 2592000
password_reset_expiry_secs = 3600
email_verification_expiry_secs = 86400
cookie_name = "token"
cookie_secure = false
admin_roles = ["admin", "super_admin"]

[storage]
provider = "memory"  # memory or cloudinary
cloud_name = ""
api_key = ""
api_secret = ""
base_folder = "corpsite"

[seed]
enabled = true
admin_email = "admin@corpsite.local"
admin_password = ""
admin_name = "Super Admin"

[site]
public_base_url = "http://localhost:3000"
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn valid() -> AppConfig {
        let mut config = AppConfig::default();
        config.auth.jwt_secret = "x".repeat(32);
        config
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.auth.cookie_name, "token");
        assert_eq!(config.storage.image_max_bytes, 5 * MIB);
        assert_eq!(config.storage.document_max_bytes, 10 * MIB);
        assert_eq!(config.storage.video_max_bytes, 50 * MIB);
        assert_eq!(config.auth.admin_roles, vec!["admin", "super_admin"]);
    }

    #[test]
    fn test_example_toml_parses() {
        let config: AppConfig = toml::from_str(&AppConfig::example_toml()).unwrap();
        assert_eq!(config.http.port, 5000);
        assert_eq!(config.storage.provider, "memory");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[mongodb]\ndatabase = \"corpsite_test\"").unwrap();

        let config = AppConfig::from_file(file.path()).unwrap();
        assert_eq!(config.mongodb.database, "corpsite_test");
        assert_eq!(config.mongodb.uri, "mongodb://localhost:27017");
        assert_eq!(config.http.port, 5000);
    }

    #[test]
    fn test_validate_rejects_missing_secret() {
        let config = AppConfig::default();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_validate_short_secret_only_in_dev_mode() {
        let mut config = valid();
        config.auth.jwt_secret = "short".to_string();
        assert!(config.validate().is_err());

        config.dev_mode = true;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_cloudinary_requires_credentials() {
        let mut config = valid();
        config.storage.provider = "cloudinary".to_string();
        assert!(config.validate().is_err());

        config.storage.cloud_name = "demo".to_string();
        config.storage.api_key = "key".to_string();
        config.storage.api_secret = "secret".to_string();
        assert!(config.validate().is_ok());

        config.storage.provider = "s3".to_string();
        assert!(config.validate().is_err());
    }
}
