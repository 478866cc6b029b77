//! CorpSite Server
//!
//! Serves the public website APIs and the `/api/v1/admin` back office:
//! - Content: projects, floor plans, ginseng catalog, news, banners
//! - Leads: contact, consultations, newsletter, careers
//! - Administration: users, roles, settings, uploads, activity, analytics
//! - Monitoring: `/api/v1/health`, Swagger UI at `/swagger-ui`
//!
//! ## Configuration
//!
//! Loaded from the first TOML file found (the path given as the first
//! argument, `CORPSITE_CONFIG`, then `config.toml`, `corpsite.toml`, ...)
//! with `CORPSITE_*` environment overrides on top.
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `CORPSITE_HTTP_PORT` | `5000` | HTTP port |
//! | `CORPSITE_MONGODB_URI` | `mongodb://localhost:27017` | MongoDB connection URL |
//! | `CORPSITE_MONGODB_DATABASE` | `corpsite` | MongoDB database name |
//! | `CORPSITE_JWT_SECRET` | - | HS256 signing secret (required) |
//! | `CORPSITE_STORAGE_PROVIDER` | `memory` | `memory` or `cloudinary` |
//! | `LOG_FORMAT` | `text` | `text` or `json` |
//! | `RUST_LOG` | `info` | Log level |

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::http::{header, HeaderValue, Method};
use axum::Router;
use mongodb::options::ClientOptions;
use tokio::{net::TcpListener, signal};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use cs_common::ServiceInfo;
use cs_config::{AppConfig, ConfigLoader};
use cs_platform::upload::api::memory_files_router;
use cs_platform::{initialize_indexes, BlobStore, CloudinaryBlobStore, MemoryBlobStore, Platform};

const SERVICE_NAME: &str = "cs-server";

#[tokio::main]
async fn main() -> Result<()> {
    let config = load_config()?;

    cs_common::logging::init_logging(SERVICE_NAME);
    info!(version = env!("CARGO_PKG_VERSION"), "Starting CorpSite Server");

    config.validate().context("invalid configuration")?;
    if config.dev_mode {
        warn!("Development mode is enabled");
    }

    // Connect to MongoDB
    info!("Connecting to MongoDB: {}/{}", config.mongodb.uri, config.mongodb.database);
    let mut options = ClientOptions::parse(&config.mongodb.uri).await?;
    options.app_name = Some(SERVICE_NAME.to_string());
    options.max_pool_size = Some(config.mongodb.max_pool_size);
    options.min_pool_size = Some(config.mongodb.min_pool_size);
    options.connect_timeout = Some(Duration::from_secs(config.mongodb.connect_timeout_secs));
    options.server_selection_timeout = Some(Duration::from_secs(config.mongodb.server_selection_timeout_secs));
    let client = mongodb::Client::with_options(options)?;
    let db = client.database(&config.mongodb.database);

    initialize_indexes(&db).await?;

    let (blob_store, files) = blob_store(&config)?;
    let platform = Platform::new(&db, &config, blob_store)?;

    if config.seed.enabled {
        platform.seeder().run(&config.seed).await?;
    }

    let mut app = platform.router(ServiceInfo::new(SERVICE_NAME, env!("CARGO_PKG_VERSION")));
    if let Some(files) = files {
        app = app.nest("/files", files);
    }
    let app = app
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&config.http.cors_origins));

    let addr = format!("{}:{}", config.http.host, config.http.port);
    let listener = TcpListener::bind(&addr).await.with_context(|| format!("failed to bind {}", addr))?;
    info!("API server listening on http://{}", addr);
    info!("Swagger UI available at http://{}/swagger-ui", addr);

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("CorpSite Server shutdown complete");
    Ok(())
}

fn load_config() -> Result<AppConfig> {
    let loader = match std::env::args().nth(1) {
        Some(path) => ConfigLoader::with_path(path),
        None => ConfigLoader::new(),
    };
    Ok(loader.load()?)
}

/// The store, plus the router serving its blobs when they live in memory.
fn blob_store(config: &AppConfig) -> Result<(Arc<dyn BlobStore>, Option<Router>)> {
    match config.storage.provider.as_str() {
        "memory" => {
            warn!("Using the in-memory blob store; uploads are lost on restart");
            let store = Arc::new(MemoryBlobStore::new(memory_base_url(config)));
            let blobs: Arc<dyn BlobStore> = store.clone();
            Ok((blobs, Some(memory_files_router(store))))
        }
        "cloudinary" => {
            let blobs: Arc<dyn BlobStore> = Arc::new(CloudinaryBlobStore::new(&config.storage));
            Ok((blobs, None))
        }
        other => anyhow::bail!("unknown storage provider: {}", other),
    }
}

/// Where the `/files` route is reachable; a wildcard bind address is not.
fn memory_base_url(config: &AppConfig) -> String {
    let host = match config.http.host.as_str() {
        "0.0.0.0" | "::" | "[::]" => "localhost",
        host => host,
    };
    format!("http://{}:{}/files", host, config.http.port)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ]);

    if origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any).allow_headers(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    // the auth cookie only crosses origins with credentials enabled
    layer
        .allow_origin(AllowOrigin::list(allowed))
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .allow_credentials(true)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received...");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_base_url() {
        let mut config = AppConfig::default();
        config.http.port = 5000;
        config.http.host = "0.0.0.0".to_string();
        assert_eq!(memory_base_url(&config), "http://localhost:5000/files");

        config.http.host = "api.corpsite.vn".to_string();
        assert_eq!(memory_base_url(&config), "http://api.corpsite.vn:5000/files");
    }

    #[test]
    fn test_memory_provider_mounts_files() {
        let mut config = AppConfig::default();
        config.storage.provider = "memory".to_string();
        let (_, files) = blob_store(&config).unwrap();
        assert!(files.is_some());

        config.storage.provider = "s3".to_string();
        assert!(blob_store(&config).is_err());
    }
}
