//! HTTP handlers for image upload, listing and deletion.
//! Upload bodies are streamed to the blob store field by field rather than
//! buffered; all storage concerns live in `ImageService`.

use crate::{
    errors::AppError,
    models::image::{ImageRecord, UPLOAD_FIELD},
    services::image_service::{ImageError, ImageService},
};
use axum::{
    Json,
    extract::{
        Multipart, Path, State,
        multipart::MultipartRejection,
    },
    http::StatusCode,
    response::IntoResponse,
};
use futures::StreamExt;
use serde::{Deserialize, Serialize};

const UPLOAD_FAILED: &str = "Error uploading image";
const LIST_FAILED: &str = "Error fetching images";
const DELETE_FAILED: &str = "Error deleting image";

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

/// POST `/upload`: store the `image` field of a multipart form.
///
/// Fields with other names, and `image` parts without a filename, are
/// skipped. A body that is not multipart at all counts as a missing file.
/// Responds 201 with the new record.
pub async fn upload_image(
    State(service): State<ImageService>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<impl IntoResponse, AppError> {
    let upload_error = |err: ImageError| AppError::from_image_error(err, UPLOAD_FAILED);

    let mut multipart = match multipart {
        Ok(multipart) => multipart,
        Err(rejection) => {
            return Err(upload_error(ImageError::MissingFile).with_detail(rejection.body_text()));
        }
    };

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| upload_error(err.into()))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        // plain text parts carry no filename
        let Some(file_name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let content_type = field.content_type().map(str::to_string);
        let stream = field.map(|chunk| chunk.map_err(ImageError::from));

        let record = service
            .upload(&file_name, content_type.as_deref(), stream)
            .await
            .map_err(upload_error)?;

        return Ok((StatusCode::CREATED, Json(record)));
    }

    Err(upload_error(ImageError::MissingFile))
}

/// GET `/images`: every record in insertion order.
pub async fn list_images(
    State(service): State<ImageService>,
) -> Result<Json<Vec<ImageRecord>>, AppError> {
    let images = service
        .list()
        .await
        .map_err(|err| AppError::from_image_error(err, LIST_FAILED))?;
    Ok(Json(images))
}

/// DELETE `/images/{id}`: remove the blob, then the record.
pub async fn delete_image(
    State(service): State<ImageService>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    service
        .delete(&id)
        .await
        .map_err(|err| AppError::from_image_error(err, DELETE_FAILED))?;

    Ok(Json(MessageResponse {
        message: "Image deleted successfully".into(),
    }))
}
