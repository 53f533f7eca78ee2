//! Gallery client: typed access to the upload, list and delete endpoints.

pub mod cli;
pub mod gallery;

pub use gallery::Gallery;

use crate::models::image::{ImageRecord, UPLOAD_FIELD};
use reqwest::{
    Response, StatusCode,
    multipart::{Form, Part},
};
use serde::Deserialize;
use std::{io, path::Path};
use thiserror::Error;

/// Where the gallery service listens by default.
pub const DEFAULT_SERVER_URL: &str = "http://localhost:5000";

#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("server responded with {status}: {message}")]
    Status { status: StatusCode, message: String },
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("`{0}` is not a JPEG or PNG image")]
    UnsupportedType(String),
    #[error("no file selected")]
    NoSelection,
}

pub type ClientResult<T> = Result<T, ClientError>;

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

#[derive(Clone, Debug)]
pub struct GalleryClient {
    http: reqwest::Client,
    base_url: String,
}

impl GalleryClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http: reqwest::Client::new(),
            base_url,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL at which an image can be viewed.
    pub fn view_url(&self, record: &ImageRecord) -> String {
        format!("{}{}", self.base_url, record.path)
    }

    /// GET `/images`
    pub async fn list_images(&self) -> ClientResult<Vec<ImageRecord>> {
        let response = self
            .http
            .get(format!("{}/images", self.base_url))
            .send()
            .await?;
        Ok(check(response).await?.json().await?)
    }

    /// POST `/upload` with the file at `path` as the `image` field.
    pub async fn upload_image(&self, path: &Path) -> ClientResult<ImageRecord> {
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mime = mime_guess::from_path(path).first_or_octet_stream();
        let bytes = tokio::fs::read(path).await?;

        let part = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str(mime.essence_str())?;
        let form = Form::new().part(UPLOAD_FIELD, part);

        let response = self
            .http
            .post(format!("{}/upload", self.base_url))
            .multipart(form)
            .send()
            .await?;
        Ok(check(response).await?.json().await?)
    }

    /// DELETE `/images/{id}`
    pub async fn delete_image(&self, id: &str) -> ClientResult<()> {
        let response = self
            .http
            .delete(format!("{}/images/{}", self.base_url, id))
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }
}

/// Turn a non-success response into [`ClientError::Status`], using the
/// server's `error` field when the body carries one.
async fn check(response: Response) -> ClientResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&text)
        .map(|body| body.error)
        .unwrap_or(text);
    Err(ClientError::Status { status, message })
}
