//! Test helpers: a gallery service backed by a temporary directory.

#![allow(dead_code)]

use axum::Router;
use axum_test::TestServer;
use image_gallery::{
    routes::routes::app,
    services::{
        blob_store::BlobStore,
        image_service::ImageService,
        metadata_store::{MetadataStore, connect},
    },
};
use std::{net::SocketAddr, sync::Arc};
use tempfile::TempDir;
use tokio::net::TcpListener;

pub const MAX_UPLOAD_BYTES: usize = 64 * 1024;

/// A service plus the temporary directory holding its database and blobs.
pub struct TestGallery {
    pub service: ImageService,
    _dir: TempDir,
}

impl TestGallery {
    pub async fn new() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let url = format!("sqlite://{}", dir.path().join("images.db").display());
        let pool = connect(&url).await.expect("Failed to open test database");
        let metadata = MetadataStore::new(Arc::new(pool));
        metadata.migrate().await.expect("Failed to migrate test database");

        let blobs = BlobStore::new(dir.path().join("uploads"));
        blobs.ensure_root().await.expect("Failed to create blob dir");

        Self {
            service: ImageService::new(metadata, blobs),
            _dir: dir,
        }
    }

    /// Same gallery with the server-side image type check turned on or off.
    pub fn with_type_enforcement(mut self, enforce: bool) -> Self {
        self.service = self.service.clone().with_type_enforcement(enforce);
        self
    }

    pub fn router(&self) -> Router {
        app(self.service.clone(), MAX_UPLOAD_BYTES)
    }

    /// In-process test server.
    pub fn test_server(&self) -> TestServer {
        TestServer::new(self.router()).expect("Failed to create test server")
    }

    /// Serve the router on an ephemeral local port and return its base URL.
    pub async fn spawn(&self) -> String {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr: SocketAddr = listener.local_addr().expect("No local addr");
        let router = self.router();
        tokio::spawn(async move {
            axum::serve(listener, router).await.expect("Server failed");
        });
        format!("http://{}", addr)
    }
}

/// Smallest valid PNG header plus a little payload; the content is never decoded.
pub fn png_bytes() -> Vec<u8> {
    let mut bytes = vec![0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];
    bytes.extend_from_slice(b"not really pixels");
    bytes
}
