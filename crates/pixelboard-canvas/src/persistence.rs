//! Snapshot persistence
//!
//! The canvas is persisted as a single latest snapshot. [`SnapshotStore`] is
//! the adapter the sync loop talks to; [`SqliteSnapshotStore`] keeps it in a
//! one-row SQLite table.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{sqlite::SqlitePool, Row};

use crate::error::{Error, Result};
use crate::store::CanvasSnapshot;

/// Durable storage for the latest canvas snapshot
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Load the most recently stored snapshot, if any
    async fn load_latest(&self) -> Result<Option<CanvasSnapshot>>;

    /// Insert or replace the stored snapshot
    async fn upsert_latest(&self, snapshot: &CanvasSnapshot) -> Result<()>;
}

/// SQLite-based snapshot store
pub struct SqliteSnapshotStore {
    pool: SqlitePool,
}

impl SqliteSnapshotStore {
    /// Create a new snapshot store with the given database pool
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Initialize the database schema
    pub async fn init(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS canvas_snapshots (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                width INTEGER NOT NULL,
                height INTEGER NOT NULL,
                cells BLOB NOT NULL,
                updated_at TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl SnapshotStore for SqliteSnapshotStore {
    async fn load_latest(&self) -> Result<Option<CanvasSnapshot>> {
        let row = sqlx::query(
            r#"
            SELECT width, height, cells
            FROM canvas_snapshots
            WHERE id = 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let width: i64 = row.get("width");
                let height: i64 = row.get("height");
                let cells: Vec<u8> = row.get("cells");

                let width = usize::try_from(width)
                    .map_err(|_| Error::database(format!("invalid stored width {width}")))?;
                let height = usize::try_from(height)
                    .map_err(|_| Error::database(format!("invalid stored height {height}")))?;

                Ok(Some(CanvasSnapshot {
                    width,
                    height,
                    cells,
                }))
            }
            None => Ok(None),
        }
    }

    async fn upsert_latest(&self, snapshot: &CanvasSnapshot) -> Result<()> {
        let width = i64::try_from(snapshot.width)
            .map_err(|_| Error::database("canvas width exceeds storage range"))?;
        let height = i64::try_from(snapshot.height)
            .map_err(|_| Error::database("canvas height exceeds storage range"))?;

        sqlx::query(
            r#"
            INSERT INTO canvas_snapshots (id, width, height, cells, updated_at)
            VALUES (1, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                width = excluded.width,
                height = excluded.height,
                cells = excluded.cells,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(width)
        .bind(height)
        .bind(&snapshot.cells)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
