/// Shopping cart lines
///
/// One row per (user, product); adding a product that is already in the
/// cart is a no-op reported to the caller. Reads join the product so
/// handlers can price the cart without another round trip.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::postgres::PgExecutor;
use sqlx::PgPool;
use uuid::Uuid;

use super::product::{product_columns, Product};
use crate::pricing::CartTotals;

/// A cart row
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct CartItem {
    #[serde(rename = "_id")]
    pub id: Uuid,
    #[serde(rename = "userId")]
    pub user_id: Uuid,
    #[serde(rename = "productId")]
    pub product_id: Uuid,
    pub quantity: i32,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

/// A cart row with its product
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct CartLine {
    #[serde(rename = "_id")]
    #[sqlx(rename = "cart_id")]
    pub id: Uuid,

    #[serde(rename = "userId")]
    #[sqlx(rename = "cart_user_id")]
    pub user_id: Uuid,

    #[sqlx(rename = "cart_quantity")]
    pub quantity: i32,

    #[serde(rename = "productId")]
    #[sqlx(flatten)]
    pub product: Product,

    #[serde(rename = "createdAt")]
    #[sqlx(rename = "cart_created_at")]
    pub created_at: DateTime<Utc>,

    #[serde(rename = "updatedAt")]
    #[sqlx(rename = "cart_updated_at")]
    pub updated_at: DateTime<Utc>,
}

/// Totals for a set of joined lines
pub fn totals(lines: &[CartLine]) -> CartTotals {
    CartTotals::from_lines(lines.iter().map(|l| l.product.priced_line(l.quantity)))
}

const CART_COLUMNS: &str = "id, user_id, product_id, quantity, created_at, updated_at";

impl CartItem {
    /// Adds a product with quantity 1
    ///
    /// Returns `None` if the product is already in the user's cart.
    pub async fn add(pool: &PgPool, user_id: Uuid, product_id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, CartItem>(&format!(
            r#"
            INSERT INTO cart_items (user_id, product_id, quantity)
            VALUES ($1, $2, 1)
            ON CONFLICT ON CONSTRAINT cart_items_user_product_key DO NOTHING
            RETURNING {}
            "#,
            CART_COLUMNS
        ))
        .bind(user_id)
        .bind(product_id)
        .fetch_optional(pool)
        .await
    }

    /// The user's lines with products joined, newest first
    pub async fn list_for_user<'e, E>(executor: E, user_id: Uuid) -> Result<Vec<CartLine>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, CartLine>(&format!(
            r#"
            SELECT c.id AS cart_id, c.user_id AS cart_user_id, c.quantity AS cart_quantity,
                   c.created_at AS cart_created_at, c.updated_at AS cart_updated_at,
                   {}
            FROM cart_items c
            JOIN products p ON p.id = c.product_id
            WHERE c.user_id = $1
            ORDER BY c.created_at DESC
            "#,
            product_columns("p")
        ))
        .bind(user_id)
        .fetch_all(executor)
        .await
    }

    /// Sets the quantity of one of the user's lines
    ///
    /// Returns `None` if the line does not exist or belongs to someone else.
    pub async fn update_quantity(
        pool: &PgPool,
        user_id: Uuid,
        id: Uuid,
        quantity: i32,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, CartItem>(&format!(
            r#"
            UPDATE cart_items SET quantity = $3, updated_at = NOW()
            WHERE id = $1 AND user_id = $2
            RETURNING {}
            "#,
            CART_COLUMNS
        ))
        .bind(id)
        .bind(user_id)
        .bind(quantity)
        .fetch_optional(pool)
        .await
    }

    /// Removes one of the user's lines
    pub async fn delete(pool: &PgPool, user_id: Uuid, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM cart_items WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Empties the user's cart; returns the number of removed lines
    pub async fn clear_for_user<'e, E>(executor: E, user_id: Uuid) -> Result<u64, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
            .bind(user_id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn line(price: i64, discount: i32, quantity: i32) -> CartLine {
        CartLine {
            id: Uuid::new_v4(),
            user_id: Uuid::nil(),
            quantity,
            product: Product {
                id: Uuid::new_v4(),
                name: "Item".to_string(),
                image: vec![],
                category_ids: vec![],
                sub_category_ids: vec![],
                unit: String::new(),
                stock: None,
                price: Decimal::from(price),
                discount,
                description: String::new(),
                more_details: serde_json::json!({}),
                publish: true,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_totals_over_lines() {
        let totals = totals(&[line(100, 10, 2), line(40, 0, 3)]);
        assert_eq!(totals.quantity, 5);
        assert_eq!(totals.sub_total, Decimal::from(320));
        assert_eq!(totals.total, Decimal::from(300));
    }

    #[test]
    fn test_cart_line_embeds_product() {
        let json = serde_json::to_value(line(50, 0, 1)).unwrap();
        assert_eq!(json["quantity"], 1);
        assert_eq!(json["productId"]["name"], "Item");
        assert_eq!(json["productId"]["price"], "50");
    }
}
