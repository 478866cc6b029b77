//! Configuration loader with file and environment variable support

use crate::{AppConfig, ConfigError};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::info;

/// Standard config file search paths
const CONFIG_PATHS: &[&str] = &[
    "config.toml",
    "corpsite.toml",
    "./config/config.toml",
    "./config/corpsite.toml",
    "/etc/corpsite/config.toml",
];

const ENV_PREFIX: &str = "CORPSITE_";

/// Configuration loader
pub struct ConfigLoader {
    config_path: Option<PathBuf>,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        Self { config_path: None }
    }

    /// Create a loader with a specific config file path
    pub fn with_path<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            config_path: Some(path.into()),
        }
    }

    /// Load configuration from file (if found) with environment variable overrides
    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        let mut config = AppConfig::default();

        if let Some(path) = self.find_config_file() {
            info!(?path, "Loading configuration from file");
            config = AppConfig::from_file(&path)?;
        }

        apply_overrides(&mut config, |key| env::var(format!("{}{}", ENV_PREFIX, key)).ok())?;

        Ok(config)
    }

    /// Find the configuration file to use
    fn find_config_file(&self) -> Option<PathBuf> {
        if let Some(path) = &self.config_path {
            if path.exists() {
                return Some(path.clone());
            }
        }

        if let Ok(path) = env::var("CORPSITE_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        CONFIG_PATHS
            .iter()
            .map(PathBuf::from)
            .find(|path| path.exists())
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn parsed<T: FromStr>(key: &str, raw: String) -> Result<T, ConfigError> {
    raw.trim()
        .parse()
        .map_err(|_| ConfigError::EnvError(format!("{}{} has an invalid value", ENV_PREFIX, key)))
}

fn list(raw: String) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Apply overrides from `lookup`, which receives keys without the `CORPSITE_` prefix.
pub(crate) fn apply_overrides<F>(config: &mut AppConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    macro_rules! set {
        ($key:literal, $target:expr) => {
            if let Some(val) = lookup($key) {
                $target = val;
            }
        };
        ($key:literal, $target:expr, parse) => {
            if let Some(val) = lookup($key) {
                $target = parsed($key, val)?;
            }
        };
        ($key:literal, $target:expr, list) => {
            if let Some(val) = lookup($key) {
                $target = list(val);
            }
        };
    }

    // HTTP
    set!("HTTP_PORT", config.http.port, parse);
    set!("HTTP_HOST", config.http.host);
    set!("CORS_ORIGINS", config.http.cors_origins, list);
    set!("HTTP_BODY_LIMIT_BYTES", config.http.body_limit_bytes, parse);

    // MongoDB
    set!("MONGODB_URI", config.mongodb.uri);
    set!("MONGODB_DATABASE", config.mongodb.database);
    set!("MONGODB_MAX_POOL_SIZE", config.mongodb.max_pool_size, parse);
    set!("MONGODB_MIN_POOL_SIZE", config.mongodb.min_pool_size, parse);
    set!("MONGODB_CONNECT_TIMEOUT_SECS", config.mongodb.connect_timeout_secs, parse);

    // Auth
    set!("JWT_SECRET", config.auth.jwt_secret);
    set!("JWT_ISSUER", config.auth.issuer);
    set!("JWT_ACCESS_EXPIRY_SECS", config.auth.access_token_expiry_secs, parse);
    set!("JWT_REFRESH_EXPIRY_SECS", config.auth.refresh_token_expiry_secs, parse);
    set!("AUTH_COOKIE_NAME", config.auth.cookie_name);
    set!("AUTH_COOKIE_SECURE", config.auth.cookie_secure, parse);
    set!("AUTH_ADMIN_ROLES", config.auth.admin_roles, list);

    // Storage
    set!("STORAGE_PROVIDER", config.storage.provider);
    set!("CLOUDINARY_CLOUD_NAME", config.storage.cloud_name);
    set!("CLOUDINARY_API_KEY", config.storage.api_key);
    set!("CLOUDINARY_API_SECRET", config.storage.api_secret);
    set!("STORAGE_BASE_FOLDER", config.storage.base_folder);

    // Seed
    set!("SEED_ENABLED", config.seed.enabled, parse);
    set!("SEED_ADMIN_EMAIL", config.seed.admin_email);
    set!("SEED_ADMIN_PASSWORD", config.seed.admin_password);
    set!("SEED_ADMIN_NAME", config.seed.admin_name);

    // General
    set!("PUBLIC_BASE_URL", config.site.public_base_url);
    set!("DEV_MODE", config.dev_mode, parse);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_overrides_apply() {
        let mut config = AppConfig::default();
        apply_overrides(
            &mut config,
            lookup(&[
                ("HTTP_PORT", "8081"),
                ("MONGODB_URI", "mongodb://db:27017"),
                ("CORS_ORIGINS", "https://a.vn, https://b.vn,"),
                ("JWT_SECRET", "s3cret"),
                ("DEV_MODE", "true"),
            ]),
        )
        .unwrap();

        assert_eq!(config.http.port, 8081);
        assert_eq!(config.mongodb.uri, "mongodb://db:27017");
        assert_eq!(config.http.cors_origins, vec!["https://a.vn", "https://b.vn"]);
        assert_eq!(config.auth.jwt_secret, "s3cret");
        assert!(config.dev_mode);
    }

    #[test]
    fn test_invalid_number_is_an_error() {
        let mut config = AppConfig::default();
        let result = apply_overrides(&mut config, lookup(&[("HTTP_PORT", "eighty")]));
        assert!(matches!(result, Err(ConfigError::EnvError(_))));
    }

    #[test]
    fn test_explicit_path_is_used() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("site.toml");
        std::fs::write(&path, "[storage]\nbase_folder = \"ginseng\"\n").unwrap();

        let loader = ConfigLoader::with_path(&path);
        assert_eq!(loader.find_config_file(), Some(path));
    }
}
