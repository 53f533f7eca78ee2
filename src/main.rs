use anyhow::{Context, Result};
use clap::Parser;
use image_gallery::{
    client,
    config::{AppConfig, Args},
    routes,
    services::{
        blob_store::BlobStore,
        image_service::ImageService,
        metadata_store::{self, MetadataStore},
    },
};
use std::{io::ErrorKind, path::Path, sync::Arc};
use tokio::{net::TcpListener, signal};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    // --- Client mode ---
    if let Some(command) = args.command.clone() {
        return client::cli::run(command).await;
    }

    // --- Server config ---
    let cfg = AppConfig::from_env_and_args(&args)?;
    tracing::info!("Starting image-gallery with config: {:?}", cfg);

    // --- Ensure blob directory exists ---
    let blobs = BlobStore::new(&cfg.storage_dir);
    blobs
        .ensure_root()
        .await
        .with_context(|| format!("creating storage directory {}", cfg.storage_dir))?;

    // --- Initialize SQLite connection ---
    let db_path = cfg
        .database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();
    if let Some(parent) = Path::new(db_path).parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
            tracing::info!("Created missing directory {:?}", parent);
        }
    }

    let db = Arc::new(
        metadata_store::connect(&cfg.database_url)
            .await
            .with_context(|| format!("connecting to {}", cfg.database_url))?,
    );
    let metadata = MetadataStore::new(db.clone());
    let applied = metadata.migrate().await.context("running migrations")?;
    tracing::debug!("Applied {} migration statements", applied);

    // --- Handle migration mode ---
    if args.migrate {
        tracing::info!("Database migration complete.");
        db.close().await;
        return Ok(());
    }

    // --- Initialize core service ---
    let service =
        ImageService::new(metadata, blobs).with_type_enforcement(cfg.enforce_image_types);

    // --- Build router ---
    let app = routes::routes::app(service, cfg.max_upload_bytes);

    // --- Start server ---
    let addr = cfg.addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err)
            if err.kind() == ErrorKind::PermissionDenied
                && matches!(cfg.host.as_str(), "0.0.0.0" | "::") =>
        {
            let fallback_addr = format!("127.0.0.1:{}", cfg.port);
            tracing::warn!(
                "Permission denied binding to {} ({}). Falling back to {}",
                addr,
                err,
                fallback_addr
            );
            TcpListener::bind(&fallback_addr).await?
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!("Server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // --- Teardown ---
    db.close().await;
    tracing::info!("Server shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
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
}
