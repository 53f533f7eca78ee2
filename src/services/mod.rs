//! Storage services: the blob directory, the SQLite metadata store, and the
//! image service that keeps the two in step.

pub mod blob_store;
pub mod image_service;
pub mod metadata_store;
