//! ImageService: sequences blob and metadata operations for the gallery.
//!
//! Upload writes the blob first and then inserts the record; a failed insert
//! removes the blob again. Delete removes the blob first and then the record;
//! a blob that is already gone does not stop the record from being removed,
//! any other removal failure keeps the record in place.

use crate::{
    models::image::{ImageRecord, NewImage, is_allowed_image_type},
    services::{
        blob_store::{BlobRemoval, BlobStore, sanitize_file_name},
        metadata_store::MetadataStore,
    },
};
use axum::extract::multipart::MultipartError;
use bytes::Bytes;
use futures::Stream;
use std::io;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("image `{0}` not found")]
    NotFound(String),
    #[error("no file provided")]
    MissingFile,
    #[error("content type `{0}` is not an accepted image type")]
    UnsupportedType(String),
    #[error(transparent)]
    Multipart(#[from] MultipartError),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type ImageResult<T> = Result<T, ImageError>;

const OCTET_STREAM: &str = "application/octet-stream";

/// Shared by every handler as router state.
#[derive(Clone)]
pub struct ImageService {
    pub metadata: MetadataStore,
    pub blobs: BlobStore,
    enforce_image_types: bool,
}

impl ImageService {
    /// Create a service that only accepts allow-listed image types.
    pub fn new(metadata: MetadataStore, blobs: BlobStore) -> Self {
        Self {
            metadata,
            blobs,
            enforce_image_types: true,
        }
    }

    /// Turn the server-side image type check on or off.
    pub fn with_type_enforcement(mut self, enforce: bool) -> Self {
        self.enforce_image_types = enforce;
        self
    }

    /// Pick the MIME type of an upload: the declared one, or a guess from
    /// the filename when nothing useful was declared.
    pub fn resolve_content_type(file_name: &str, declared: Option<&str>) -> String {
        match declared.map(str::trim) {
            Some(mime) if !mime.is_empty() && !mime.eq_ignore_ascii_case(OCTET_STREAM) => {
                mime.to_string()
            }
            _ => mime_guess::from_path(file_name)
                .first_or_octet_stream()
                .essence_str()
                .to_string(),
        }
    }

    /// Store an uploaded file and create its record.
    pub async fn upload<S>(
        &self,
        file_name: &str,
        declared_type: Option<&str>,
        stream: S,
    ) -> ImageResult<ImageRecord>
    where
        S: Stream<Item = ImageResult<Bytes>>,
    {
        let content_type = Self::resolve_content_type(file_name, declared_type);
        if self.enforce_image_types && !is_allowed_image_type(&content_type) {
            return Err(ImageError::UnsupportedType(content_type));
        }

        let blob = self.blobs.write_stream(file_name, stream).await?;
        let new_image = NewImage {
            display_name: sanitize_file_name(file_name),
            path: BlobStore::public_path(&blob.storage_name),
            storage_name: blob.storage_name.clone(),
            content_type: Some(content_type),
            size_bytes: blob.size_bytes,
            checksum: blob.checksum,
        };

        match self.metadata.insert(new_image).await {
            Ok(record) => {
                info!(id = %record.id, path = %record.path, "stored image");
                Ok(record)
            }
            Err(err) => {
                if let Err(cleanup) = self.blobs.remove(&blob.storage_name).await {
                    warn!(
                        "failed to remove blob {} after insert error: {}",
                        blob.storage_name, cleanup
                    );
                }
                Err(ImageError::Sqlx(err))
            }
        }
    }

    /// All records in insertion order.
    pub async fn list(&self) -> ImageResult<Vec<ImageRecord>> {
        Ok(self.metadata.list().await?)
    }

    /// Remove an image's blob and then its record.
    ///
    /// Returns NotFound when `id` is not a UUID, has no record, or the record
    /// was removed concurrently.
    pub async fn delete(&self, id: &str) -> ImageResult<ImageRecord> {
        let not_found = || ImageError::NotFound(id.to_string());
        let uuid = Uuid::parse_str(id).map_err(|_| not_found())?;
        let record = self.metadata.find(uuid).await?.ok_or_else(not_found)?;

        match self.blobs.remove(&record.storage_name).await? {
            BlobRemoval::Removed => {}
            BlobRemoval::AlreadyMissing => {
                warn!(id = %record.id, "blob {} already missing", record.storage_name);
            }
        }

        if !self.metadata.delete(uuid).await? {
            return Err(not_found());
        }

        info!(id = %record.id, "deleted image");
        Ok(record)
    }
}
