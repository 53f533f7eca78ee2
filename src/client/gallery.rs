//! Gallery state: the current images, the file picked for upload, a loading
//! flag and the last error message.
//!
//! Every operation starts by clearing the previous error and raising the
//! loading flag, and ends idle. Failures keep the previous images and set a
//! fixed, user-facing message; the underlying error is returned to the caller.

use super::{ClientError, ClientResult, GalleryClient};
use crate::models::image::{ImageRecord, is_allowed_image_type};
use std::{
    fmt::Write as _,
    path::{Path, PathBuf},
};
use tracing::warn;

pub const FETCH_FAILED: &str = "Failed to fetch images";
pub const UPLOAD_FAILED: &str = "Failed to upload file";
pub const DELETE_FAILED: &str = "Failed to delete file";
pub const NO_SELECTION: &str = "Please select a file to upload.";
pub const INVALID_SELECTION: &str = "Please select a valid image file (JPG, JPEG, PNG).";

/// What the gallery is waiting on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Activity {
    #[default]
    Idle,
    Fetching,
    Uploading,
    Deleting,
}

#[derive(Debug)]
pub struct Gallery {
    client: GalleryClient,
    images: Vec<ImageRecord>,
    selected: Option<PathBuf>,
    activity: Activity,
    error: Option<String>,
}

impl Gallery {
    pub fn new(client: GalleryClient) -> Self {
        Self {
            client,
            images: Vec::new(),
            selected: None,
            activity: Activity::Idle,
            error: None,
        }
    }

    pub fn images(&self) -> &[ImageRecord] {
        &self.images
    }

    pub fn selected(&self) -> Option<&Path> {
        self.selected.as_deref()
    }

    pub fn activity(&self) -> Activity {
        self.activity
    }

    pub fn is_loading(&self) -> bool {
        self.activity != Activity::Idle
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Pick a file for the next upload. Only JPEG and PNG files (judged by
    /// extension) are accepted; anything else clears the selection.
    pub fn select_file(&mut self, path: impl Into<PathBuf>) -> ClientResult<()> {
        let path = path.into();
        let mime = mime_guess::from_path(&path).first_or_octet_stream();
        if !is_allowed_image_type(mime.essence_str()) {
            self.selected = None;
            self.error = Some(INVALID_SELECTION.into());
            return Err(ClientError::UnsupportedType(path.display().to_string()));
        }

        self.error = None;
        self.selected = Some(path);
        Ok(())
    }

    /// Reload the image list.
    pub async fn refresh(&mut self) -> ClientResult<()> {
        self.begin(Activity::Fetching);
        let result = self.client.list_images().await;
        self.activity = Activity::Idle;

        match result {
            Ok(images) => {
                self.images = images;
                Ok(())
            }
            Err(err) => Err(self.fail(FETCH_FAILED, err)),
        }
    }

    /// Upload the selected file, then reload the list.
    ///
    /// Succeeds once the server stored the file, even if the reload fails.
    pub async fn upload_selected(&mut self) -> ClientResult<ImageRecord> {
        let Some(path) = self.selected.clone() else {
            self.error = Some(NO_SELECTION.into());
            return Err(ClientError::NoSelection);
        };

        self.begin(Activity::Uploading);
        let result = self.client.upload_image(&path).await;
        self.activity = Activity::Idle;

        match result {
            Ok(record) => {
                self.selected = None;
                // the image is stored; a failed reload only shows up in `error`
                let _ = self.refresh().await;
                Ok(record)
            }
            Err(err) => Err(self.fail(UPLOAD_FAILED, err)),
        }
    }

    /// Delete an image, then reload the list.
    pub async fn delete(&mut self, id: &str) -> ClientResult<()> {
        self.begin(Activity::Deleting);
        let result = self.client.delete_image(id).await;
        self.activity = Activity::Idle;

        match result {
            Ok(()) => self.refresh().await,
            Err(err) => Err(self.fail(DELETE_FAILED, err)),
        }
    }

    /// Text rendering of the gallery: the error banner if any, then one block
    /// per image with its view URL and delete command.
    pub fn render(&self) -> String {
        let mut out = String::new();
        if let Some(error) = &self.error {
            let _ = writeln!(out, "error: {}", error);
        }
        if self.images.is_empty() {
            out.push_str("no images uploaded yet\n");
            return out;
        }

        for image in &self.images {
            let _ = writeln!(out, "{}", image.display_name);
            let _ = writeln!(out, "  id:     {}", image.id);
            let _ = writeln!(out, "  view:   {}", self.client.view_url(image));
            let _ = writeln!(out, "  delete: image-gallery delete {}", image.id);
        }
        out
    }

    fn begin(&mut self, activity: Activity) {
        self.error = None;
        self.activity = activity;
    }

    fn fail(&mut self, message: &str, err: ClientError) -> ClientError {
        warn!("{}: {}", message, err);
        self.error = Some(message.into());
        err
    }
}
