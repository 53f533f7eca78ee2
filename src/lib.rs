//! Image gallery: an HTTP service that stores uploaded images on disk, keeps
//! a metadata record for each in SQLite, and lists, serves and deletes them,
//! plus a client for the same API.

pub mod client;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
