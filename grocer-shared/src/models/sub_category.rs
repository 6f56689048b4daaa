/// Sub-categories
///
/// A sub-category belongs to one or more categories. Listing joins the
/// category rows so clients can render breadcrumbs without extra calls.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::collections::HashMap;
use uuid::Uuid;

use super::category::Category;

const SUB_CATEGORY_COLUMNS: &str = "id, name, image, category_ids, created_at, updated_at";

/// A sub-category row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct SubCategory {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: String,
    pub image: String,
    #[serde(rename = "category")]
    pub category_ids: Vec<Uuid>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

/// A sub-category with its categories joined
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubCategoryWithCategories {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: String,
    pub image: String,
    pub category: Vec<Category>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

/// Partial update; `None` fields keep their value
#[derive(Debug, Clone, Default)]
pub struct UpdateSubCategory {
    pub name: Option<String>,
    pub image: Option<String>,
    pub category_ids: Option<Vec<Uuid>>,
}

impl SubCategory {
    pub async fn create(
        pool: &PgPool,
        name: &str,
        image: &str,
        category_ids: &[Uuid],
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, SubCategory>(&format!(
            "INSERT INTO sub_categories (name, image, category_ids) VALUES ($1, $2, $3) RETURNING {}",
            SUB_CATEGORY_COLUMNS
        ))
        .bind(name)
        .bind(image)
        .bind(category_ids)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, SubCategory>(&format!(
            "SELECT {} FROM sub_categories WHERE id = $1",
            SUB_CATEGORY_COLUMNS
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// All sub-categories, newest first, with categories joined
    pub async fn list_with_categories(
        pool: &PgPool,
    ) -> Result<Vec<SubCategoryWithCategories>, sqlx::Error> {
        let rows = sqlx::query_as::<_, SubCategory>(&format!(
            "SELECT {} FROM sub_categories ORDER BY created_at DESC",
            SUB_CATEGORY_COLUMNS
        ))
        .fetch_all(pool)
        .await?;

        let mut ids: Vec<Uuid> = rows.iter().flat_map(|r| r.category_ids.iter().copied()).collect();
        ids.sort_unstable();
        ids.dedup();

        let categories = Category::find_many(pool, &ids).await?;
        Ok(join_categories(rows, categories))
    }

    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateSubCategory,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, SubCategory>(&format!(
            r#"
            UPDATE sub_categories
            SET name = COALESCE($2, name),
                image = COALESCE($3, image),
                category_ids = COALESCE($4, category_ids),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            SUB_CATEGORY_COLUMNS
        ))
        .bind(id)
        .bind(data.name)
        .bind(data.image)
        .bind(data.category_ids)
        .fetch_optional(pool)
        .await
    }

    /// Deletes the sub-category and unlinks it from products
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query(
            r#"
            UPDATE products
            SET sub_category_ids = array_remove(sub_category_ids, $1), updated_at = NOW()
            WHERE $1 = ANY(sub_category_ids)
            "#,
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        let result = sqlx::query("DELETE FROM sub_categories WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }
}

/// Replaces category IDs with category rows, keeping the listed order
///
/// IDs whose category no longer exists are dropped.
pub fn join_categories(
    rows: Vec<SubCategory>,
    categories: Vec<Category>,
) -> Vec<SubCategoryWithCategories> {
    let by_id: HashMap<Uuid, Category> = categories.into_iter().map(|c| (c.id, c)).collect();

    rows.into_iter()
        .map(|row| SubCategoryWithCategories {
            id: row.id,
            name: row.name,
            image: row.image,
            category: row
                .category_ids
                .iter()
                .filter_map(|id| by_id.get(id).cloned())
                .collect(),
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
        .collect()
}
