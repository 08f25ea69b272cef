//! Collection repository (owner-scoped groupings).

use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use clipnotes_core::models::Collection;
use clipnotes_core::AppError;

fn collection_from_row(row: &PgRow) -> Collection {
    Collection {
        id: row.get("id"),
        owner_id: row.get("owner_id"),
        name: row.get("name"),
        created_at: row.get("created_at"),
    }
}

#[derive(Clone)]
pub struct CollectionRepository {
    pool: PgPool,
}

impl CollectionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, owner_id: Uuid, name: &str) -> Result<Collection, AppError> {
        let row = sqlx::query(
            "INSERT INTO collections (id, owner_id, name) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(owner_id)
        .bind(name)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                AppError::Conflict(format!("Collection '{}' already exists", name))
            }
            other => AppError::Database(other),
        })?;

        Ok(collection_from_row(&row))
    }

    pub async fn list(&self, owner_id: Uuid) -> Result<Vec<Collection>, AppError> {
        let rows = sqlx::query(
            "SELECT * FROM collections WHERE owner_id = $1 ORDER BY created_at DESC",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(collection_from_row).collect())
    }

    pub async fn get(
        &self,
        owner_id: Uuid,
        collection_id: Uuid,
    ) -> Result<Option<Collection>, AppError> {
        let row = sqlx::query("SELECT * FROM collections WHERE id = $1 AND owner_id = $2")
            .bind(collection_id)
            .bind(owner_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(collection_from_row))
    }
}
