//! Data models for the image gallery.
//!
//! Records map to the `images` table via `sqlx::FromRow` and serialize as
//! camelCase JSON via `serde`.

pub mod image;
