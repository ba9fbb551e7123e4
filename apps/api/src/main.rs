mod analytics;
mod applications;
mod config;
mod db;
mod errors;
mod jobs;
mod models;
mod routes;
mod state;
mod uploads;

#[cfg(test)]
mod test_support;

use anyhow::Result;
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::analytics::pageviews::PgPageViewStore;
use crate::applications::candidates::PgCandidateStore;
use crate::applications::outbox::{self, RedisOutbox};
use crate::applications::repository::PgApplicationStore;
use crate::config::Config;
use crate::db::create_pool;
use crate::jobs::store::PgJobStore;
use crate::routes::build_router;
use crate::state::AppState;
use crate::uploads::s3::S3AssetUploader;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Talentio API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL (runs migrations)
    let db = create_pool(&config.database_url).await?;

    // Initialize Redis
    let redis = redis::Client::open(config.redis_url.clone())?;
    info!("Redis client initialized");

    // Initialize S3 / MinIO
    let s3 = build_s3_client(&config).await;
    info!("S3 client initialized (bucket: {})", config.s3_bucket);

    let applications = Arc::new(PgApplicationStore::new(db.clone()));
    let candidates = Arc::new(PgCandidateStore::new(db.clone()));
    let jobs = Arc::new(PgJobStore::new(db.clone()));
    let page_views = Arc::new(PgPageViewStore::new(db));
    let outbox = Arc::new(RedisOutbox::new(redis));
    let uploader = Arc::new(S3AssetUploader::new(
        s3,
        config.s3_bucket.clone(),
        config.s3_public_url.clone(),
    ));

    let worker = outbox::spawn_worker(
        outbox.clone(),
        applications.clone(),
        candidates.clone(),
        jobs.clone(),
        Duration::from_secs(config.outbox_poll_secs.max(1)),
    );
    info!("Outbox worker polling every {}s", config.outbox_poll_secs);

    // Build app state
    let state = AppState {
        applications,
        candidates,
        jobs,
        page_views,
        uploader,
        outbox,
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins to the web frontend

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    worker.abort();
    Ok(())
}

/// Constructs an S3 client configured for MinIO (local) or AWS (production).
async fn build_s3_client(config: &Config) -> aws_sdk_s3::Client {
    let credentials = Credentials::new(
        &config.aws_access_key_id,
        &config.aws_secret_access_key,
        None,
        None,
        "talentio-static",
    );

    let sdk_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .credentials_provider(credentials)
        .endpoint_url(&config.s3_endpoint)
        .load()
        .await;

    // MinIO serves buckets by path, not virtual host.
    let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
        .force_path_style(true)
        .build();

    aws_sdk_s3::Client::from_conf(s3_config)
}
