//! MetadataStore: image records persisted in SQLite.

use crate::models::image::{ImageRecord, NewImage};
use chrono::Utc;
use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};
use std::{str::FromStr, sync::Arc};
use tracing::debug;
use uuid::Uuid;

const INIT_SQL: &str = include_str!("../../migrations/0001_init.sql");
const MAX_CONNECTIONS: u32 = 5;

/// Open a SQLite pool, creating the database file when missing.
pub async fn connect(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
    SqlitePoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .connect_with(options)
        .await
}

#[derive(Clone)]
pub struct MetadataStore {
    /// Shared SQLite connection pool.
    pub db: Arc<SqlitePool>,
}

impl MetadataStore {
    pub fn new(db: Arc<SqlitePool>) -> Self {
        Self { db }
    }

    /// Apply the embedded schema. Every statement is idempotent, so this is
    /// safe to run on each startup. Returns the number of statements run.
    pub async fn migrate(&self) -> Result<usize, sqlx::Error> {
        let statements = INIT_SQL
            .split(';')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>();

        for stmt in &statements {
            debug!("Executing migration SQL: {}", stmt);
            sqlx::query(stmt).execute(&*self.db).await?;
        }

        Ok(statements.len())
    }

    /// Round-trip a trivial query; used by readiness checks.
    pub async fn ping(&self) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT 1")
            .fetch_one(&*self.db)
            .await
    }

    /// Insert a record. The store assigns `id` and `created_at`.
    pub async fn insert(&self, image: NewImage) -> Result<ImageRecord, sqlx::Error> {
        sqlx::query_as::<_, ImageRecord>(
            r#"
            INSERT INTO images (
                id, display_name, storage_name, path, content_type,
                size_bytes, checksum, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING id, display_name, storage_name, path, content_type,
                      size_bytes, checksum, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&image.display_name)
        .bind(&image.storage_name)
        .bind(&image.path)
        .bind(&image.content_type)
        .bind(image.size_bytes)
        .bind(&image.checksum)
        .bind(Utc::now())
        .fetch_one(&*self.db)
        .await
    }

    /// All records in insertion order.
    pub async fn list(&self) -> Result<Vec<ImageRecord>, sqlx::Error> {
        sqlx::query_as::<_, ImageRecord>(
            "SELECT id, display_name, storage_name, path, content_type,
                    size_bytes, checksum, created_at
             FROM images ORDER BY rowid ASC",
        )
        .fetch_all(&*self.db)
        .await
    }

    pub async fn find(&self, id: Uuid) -> Result<Option<ImageRecord>, sqlx::Error> {
        sqlx::query_as::<_, ImageRecord>(
            "SELECT id, display_name, storage_name, path, content_type,
                    size_bytes, checksum, created_at
             FROM images WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&*self.db)
        .await
    }

    /// Delete a record. Returns false when no row matched.
    pub async fn delete(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM images WHERE id = ?")
            .bind(id)
            .execute(&*self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
