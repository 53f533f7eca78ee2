//! Defines routes for the image gallery.
//!
//! ## Structure
//! - `POST   /upload`        - multipart upload, field `image`
//! - `GET    /images`        - list all image records
//! - `DELETE /images/{id}`   - delete blob and record
//! - `GET    /uploads/{name}` - stored blobs, served from the blob directory
//! - `GET    /healthz`, `GET /readyz` - liveness and readiness

use crate::{
    handlers::{
        health_handlers::{healthz, readyz},
        image_handlers::{delete_image, list_images, upload_image},
    },
    services::{blob_store::UPLOADS_PREFIX, image_service::ImageService},
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{Method, header},
    routing::{delete, get, post},
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

/// Build the API routes. The router carries `ImageService` as shared state.
pub fn routes() -> Router<ImageService> {
    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/upload", post(upload_image))
        .route("/images", get(list_images))
        .route("/images/{id}", delete(delete_image))
}

/// Build the complete application: API routes, static blob serving, upload
/// size limit, CORS and request tracing.
pub fn app(service: ImageService, max_upload_bytes: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE]);

    let blobs = ServeDir::new(service.blobs.root());

    routes()
        .nest_service(UPLOADS_PREFIX, blobs)
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}
