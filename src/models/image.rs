//! Represents one uploaded image and the metadata kept about it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Multipart field name carrying the uploaded file.
pub const UPLOAD_FIELD: &str = "image";

/// MIME types accepted for upload.
pub const ALLOWED_IMAGE_TYPES: [&str; 3] = ["image/jpeg", "image/jpg", "image/png"];

/// Returns true when `mime` (parameters ignored) is one of [`ALLOWED_IMAGE_TYPES`].
pub fn is_allowed_image_type(mime: &str) -> bool {
    let essence = mime.split(';').next().unwrap_or(mime).trim();
    ALLOWED_IMAGE_TYPES
        .iter()
        .any(|candidate| candidate.eq_ignore_ascii_case(essence))
}

/// Metadata record for a single stored image.
///
/// The record never holds the image bytes; `path` is where the blob can be
/// fetched from the static uploads route.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ImageRecord {
    /// Identifier assigned by the metadata store on insert.
    pub id: Uuid,

    /// Name shown to users, derived from the uploaded filename.
    pub display_name: String,

    /// Public retrieval path, e.g. `/uploads/1718000000000-cat.png`.
    pub path: String,

    /// MIME type detected at upload time.
    pub content_type: Option<String>,

    /// Size in bytes.
    pub size_bytes: i64,

    /// Lowercase hex MD5 of the stored bytes.
    pub checksum: String,

    /// When the upload completed.
    pub created_at: DateTime<Utc>,

    /// Generated filename inside the blob directory.
    #[serde(skip)]
    pub storage_name: String,
}

/// Fields needed to insert a new [`ImageRecord`].
#[derive(Debug, Clone)]
pub struct NewImage {
    pub display_name: String,
    pub storage_name: String,
    pub path: String,
    pub content_type: Option<String>,
    pub size_bytes: i64,
    pub checksum: String,
}
