//! BlobStore: a flat directory of uploaded files.
//!
//! Every upload is written under a generated storage name of the form
//! `<unix-millis>-<sanitized original name>`. Files are created with
//! create-new semantics so two uploads never share a name.

use bytes::Bytes;
use chrono::Utc;
use futures::{Stream, StreamExt, pin_mut};
use md5::Context;
use std::{
    io::{self, ErrorKind},
    path::{Path, PathBuf},
};
use tokio::{
    fs::{self, File, OpenOptions},
    io::AsyncWriteExt,
};
use tracing::debug;

/// URL prefix under which blobs are served.
pub const UPLOADS_PREFIX: &str = "/uploads";

const FALLBACK_NAME: &str = "upload";
const MAX_NAME_LEN: usize = 128;
const MAX_NAME_ATTEMPTS: u32 = 64;

/// Result of writing one blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlob {
    pub storage_name: String,
    pub size_bytes: i64,
    pub checksum: String,
}

/// Outcome of [`BlobStore::remove`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlobRemoval {
    Removed,
    AlreadyMissing,
}

#[derive(Clone, Debug)]
pub struct BlobStore {
    root: PathBuf,
}

impl BlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the blob directory if it does not exist yet.
    pub async fn ensure_root(&self) -> io::Result<()> {
        fs::create_dir_all(&self.root).await
    }

    /// Absolute location of a blob on disk.
    pub fn blob_path(&self, storage_name: &str) -> PathBuf {
        self.root.join(storage_name)
    }

    /// Public retrieval path for a blob, e.g. `/uploads/1718-cat.png`.
    pub fn public_path(storage_name: &str) -> String {
        format!("{}/{}", UPLOADS_PREFIX, storage_name)
    }

    /// Stream a blob to disk under a fresh storage name.
    ///
    /// Size and MD5 are computed while streaming. The file is fsynced before
    /// returning; on any error the partial file is removed.
    pub async fn write_stream<S, E>(&self, original_name: &str, stream: S) -> Result<StoredBlob, E>
    where
        S: Stream<Item = Result<Bytes, E>>,
        E: From<io::Error>,
    {
        let millis = Utc::now().timestamp_millis();
        let (storage_name, mut file) = self.create_unique(millis, original_name).await?;
        let file_path = self.blob_path(&storage_name);

        let mut size_bytes: i64 = 0;
        let mut digest = Context::new();
        pin_mut!(stream);
        while let Some(chunk_res) = stream.next().await {
            let chunk = match chunk_res {
                Ok(chunk) => chunk,
                Err(err) => {
                    drop(file);
                    let _ = fs::remove_file(&file_path).await;
                    return Err(err);
                }
            };
            size_bytes += chunk.len() as i64;
            digest.consume(&chunk);
            if let Err(err) = file.write_all(&chunk).await {
                drop(file);
                let _ = fs::remove_file(&file_path).await;
                return Err(err.into());
            }
        }
        if let Err(err) = file.flush().await {
            drop(file);
            let _ = fs::remove_file(&file_path).await;
            return Err(err.into());
        }
        if let Err(err) = file.sync_all().await {
            drop(file);
            let _ = fs::remove_file(&file_path).await;
            return Err(err.into());
        }

        debug!("stored blob {} ({} bytes)", file_path.display(), size_bytes);
        Ok(StoredBlob {
            storage_name,
            size_bytes,
            checksum: format!("{:x}", digest.compute()),
        })
    }

    /// Remove a blob. A blob that is already gone is reported, not an error.
    pub async fn remove(&self, storage_name: &str) -> io::Result<BlobRemoval> {
        if !is_plain_name(storage_name) {
            return Err(io::Error::new(
                ErrorKind::InvalidInput,
                format!("invalid storage name `{}`", storage_name),
            ));
        }

        let file_path = self.blob_path(storage_name);
        match fs::remove_file(&file_path).await {
            Ok(()) => {
                debug!("removed blob {}", file_path.display());
                Ok(BlobRemoval::Removed)
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(BlobRemoval::AlreadyMissing),
            Err(err) => Err(err),
        }
    }

    /// Open a new file named from `millis` and `original_name`, adding a
    /// numeric suffix to the prefix while the name is taken.
    async fn create_unique(&self, millis: i64, original_name: &str) -> io::Result<(String, File)> {
        let sanitized = sanitize_file_name(original_name);
        for attempt in 0..MAX_NAME_ATTEMPTS {
            let name = storage_name(millis, attempt, &sanitized);
            match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(self.blob_path(&name))
                .await
            {
                Ok(file) => return Ok((name, file)),
                Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                    debug!("storage name {} taken, retrying", name);
                }
                Err(err) => return Err(err),
            }
        }

        Err(io::Error::new(
            ErrorKind::AlreadyExists,
            format!("no free storage name for `{}`", sanitized),
        ))
    }
}

/// Build a storage name: `<millis>-<name>`, or `<millis>_<attempt>-<name>`
/// on retries.
pub fn storage_name(millis: i64, attempt: u32, sanitized: &str) -> String {
    if attempt == 0 {
        format!("{}-{}", millis, sanitized)
    } else {
        format!("{}_{}-{}", millis, attempt, sanitized)
    }
}

/// Reduce a client-supplied filename to a safe single path component.
///
/// Keeps the last path segment, maps anything outside `[A-Za-z0-9._-]` to
/// `_`, and keeps the tail (with the extension) when the name is too long.
pub fn sanitize_file_name(name: &str) -> String {
    let last = name
        .rsplit(['/', '\\'])
        .find(|segment| !segment.is_empty())
        .unwrap_or("");

    let mapped: String = last
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if mapped.is_empty() || mapped.chars().all(|c| c == '.') {
        return FALLBACK_NAME.to_string();
    }
    if mapped.len() > MAX_NAME_LEN {
        return mapped[mapped.len() - MAX_NAME_LEN..].to_string();
    }
    mapped
}

fn is_plain_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', '\0'])
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    fn chunks(parts: &[&'static [u8]]) -> impl Stream<Item = io::Result<Bytes>> + use<> {
        stream::iter(
            parts
                .iter()
                .map(|part| Ok(Bytes::from_static(part)))
                .collect::<Vec<_>>(),
        )
    }

    #[test]
    fn sanitize_keeps_last_segment_and_safe_chars() {
        assert_eq!(sanitize_file_name("cat.png"), "cat.png");
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\photos\\my cat.jpg"), "my_cat.jpg");
        assert_eq!(sanitize_file_name("ünï.png"), "_n_.png");
        assert_eq!(sanitize_file_name(""), "upload");
        assert_eq!(sanitize_file_name(".."), "upload");
        assert_eq!(sanitize_file_name("dir/"), "dir");
    }

    #[test]
    fn sanitize_truncates_from_the_front() {
        let long = format!("{}.png", "a".repeat(300));
        let sanitized = sanitize_file_name(&long);
        assert_eq!(sanitized.len(), MAX_NAME_LEN);
        assert!(sanitized.ends_with(".png"));
    }

    #[test]
    fn storage_names_carry_time_prefix() {
        assert_eq!(storage_name(1700, 0, "cat.png"), "1700-cat.png");
        assert_eq!(storage_name(1700, 2, "cat.png"), "1700_2-cat.png");
        assert_eq!(BlobStore::public_path("1700-cat.png"), "/uploads/1700-cat.png");
    }

    #[tokio::test]
    async fn write_stream_persists_bytes_and_checksum() {
        let dir = tempfile::tempdir().unwrap();
        let store = BlobStore::new(dir.path());

        let blob = store
            .write_stream("hello.png", chunks(&[b"hel", b"lo"]))
            .await
            .unwrap();

        assert!(blob.storage_name.ends_with("-hello.png"));
        assert_eq!(blob.size_bytes, 5);
        assert_eq!(blob.checksum, "5d41402abc4b2a76b9719d911017c592");
        let on_disk = tokio::fs::read(store.blob_path(&blob.storage_name))
            .await
            .unwrap();
        assert_eq!(on_disk, b"hello");
    }

    #[tokio::test]
    async fn write_stream_removes_partial_file_on_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = BlobStore::new(dir.path());
        let failing = stream::iter(vec![
            Ok(Bytes::from_static(b"partial")),
            Err(io::Error::other("client went away")),
        ]);

        let err = store.write_stream("broken.png", failing).await.unwrap_err();
        assert_eq!(err.to_string(), "client went away");

        let mut entries = tokio::fs::read_dir(dir.path()).await.unwrap();
        assert!(entries.next_entry().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn colliding_names_get_a_suffix() {
        let dir = tempfile::tempdir().unwrap();
        let store = BlobStore::new(dir.path());

        let (first, _) = store.create_unique(1000, "cat.png").await.unwrap();
        let (second, _) = store.create_unique(1000, "cat.png").await.unwrap();

        assert_eq!(first, "1000-cat.png");
        assert_eq!(second, "1000_1-cat.png");
    }

    #[tokio::test]
    async fn remove_reports_missing_blobs() {
        let dir = tempfile::tempdir().unwrap();
        let store = BlobStore::new(dir.path());
        let blob = store
            .write_stream("gone.png", chunks(&[b"x"]))
            .await
            .unwrap();

        assert_eq!(
            store.remove(&blob.storage_name).await.unwrap(),
            BlobRemoval::Removed
        );
        assert_eq!(
            store.remove(&blob.storage_name).await.unwrap(),
            BlobRemoval::AlreadyMissing
        );
    }

    #[tokio::test]
    async fn remove_rejects_path_components() {
        let dir = tempfile::tempdir().unwrap();
        let store = BlobStore::new(dir.path());

        let err = store.remove("../outside.png").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }
}
