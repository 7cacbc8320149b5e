use std::sync::Arc;

use tracing::info;

use video_gallery_backend::{app, cleanup, config::Config, models::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter("video_gallery_backend=debug,tower_http=debug")
        .init();

    // Load configuration
    let config = Config::load()?;

    // Ensure directories exist
    tokio::fs::create_dir_all(&config.upload_dir).await?;
    tokio::fs::create_dir_all(&config.thumbnail_dir).await?;

    // Sweep interrupted uploads in the background
    cleanup::start_cleanup_task(Arc::new(config.clone()));

    let state = Arc::new(AppState {
        config: config.clone(),
    });
    let router = app(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("server listening on {}", addr);
    info!("upload dir: {:?}", config.upload_dir);
    info!("thumbnail dir: {:?}", config.thumbnail_dir);
    info!(
        "environment: {:?} (listing urls use {})",
        config.environment,
        config.environment.scheme()
    );

    axum::serve(listener, router).await?;

    Ok(())
}
