/// Top-level catalog categories
///
/// A category cannot be deleted while any sub-category or product still
/// lists it; see [`Category::is_in_use`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// A category row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Category {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: String,
    pub image: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl Category {
    pub async fn create(pool: &PgPool, name: &str, image: &str) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Category>(
            r#"
            INSERT INTO categories (name, image)
            VALUES ($1, $2)
            RETURNING id, name, image, created_at, updated_at
            "#,
        )
        .bind(name)
        .bind(image)
        .fetch_one(pool)
        .await
    }

    /// All categories, newest first
    pub async fn list(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Category>(
            "SELECT id, name, image, created_at, updated_at FROM categories ORDER BY created_at DESC",
        )
        .fetch_all(pool)
        .await
    }

    /// Loads the given categories, in no particular order
    pub async fn find_many(pool: &PgPool, ids: &[Uuid]) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Category>(
            "SELECT id, name, image, created_at, updated_at FROM categories WHERE id = ANY($1)",
        )
        .bind(ids)
        .fetch_all(pool)
        .await
    }

    /// Updates name and image; `None` fields keep their value
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        name: Option<&str>,
        image: Option<&str>,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Category>(
            r#"
            UPDATE categories
            SET name = COALESCE($2, name),
                image = COALESCE($3, image),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, name, image, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(image)
        .fetch_optional(pool)
        .await
    }

    /// Whether a sub-category or product references the category
    pub async fn is_in_use(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(
            r#"
            SELECT EXISTS (SELECT 1 FROM sub_categories WHERE $1 = ANY(category_ids))
                OR EXISTS (SELECT 1 FROM products WHERE $1 = ANY(category_ids))
            "#,
        )
        .bind(id)
        .fetch_one(pool)
        .await
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
