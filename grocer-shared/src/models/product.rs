/// Products
///
/// Products link to categories and sub-categories through UUID arrays. Price
/// is a decimal in major units; `discount` is a whole percentage applied at
/// checkout (see [`crate::pricing`]).
///
/// # Example
///
/// ```no_run
/// use grocer_shared::models::{product::Product, Pagination};
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
/// let page = Pagination::new(Some(1), Some(10));
/// let (products, total) = Product::list(&pool, Some("rice"), page).await?;
/// println!("{} of {} products", products.len(), total);
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::Pagination;
use crate::pricing::{discounted_price, PricedLine};

const PRODUCT_COLUMNS: &str = "id, name, image, category_ids, sub_category_ids, unit, stock, \
     price, discount, description, more_details, publish, created_at, updated_at";

/// Product columns qualified with a table alias, for joins
pub(crate) fn product_columns(alias: &str) -> String {
    PRODUCT_COLUMNS
        .split(',')
        .map(|column| format!("{}.{}", alias, column.trim()))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Products returned by the category shelf
pub const CATEGORY_SHELF_LIMIT: i64 = 15;

/// A product row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Product {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: String,

    /// Image URLs; the first is the primary image
    pub image: Vec<String>,

    #[serde(rename = "category")]
    pub category_ids: Vec<Uuid>,

    #[serde(rename = "subCategory")]
    pub sub_category_ids: Vec<Uuid>,

    pub unit: String,
    pub stock: Option<i32>,

    #[serde(with = "rust_decimal::serde::str")]
    pub price: Decimal,

    /// Percentage, 0..=100
    pub discount: i32,

    pub description: String,

    /// Free-form key/value details shown on the product page
    pub more_details: JsonValue,

    pub publish: bool,

    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Price after discount
    pub fn discounted_price(&self) -> Decimal {
        discounted_price(self.price, self.discount)
    }

    /// Pricing line for `quantity` units
    pub fn priced_line(&self, quantity: i32) -> PricedLine {
        PricedLine {
            price: self.price,
            discount: self.discount,
            quantity,
        }
    }
}

/// Input for creating a product
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub image: Vec<String>,
    pub category_ids: Vec<Uuid>,
    pub sub_category_ids: Vec<Uuid>,
    pub unit: String,
    pub stock: Option<i32>,
    pub price: Decimal,
    pub discount: i32,
    pub description: String,
    pub more_details: JsonValue,
    pub publish: bool,
}

/// Partial update; `None` fields keep their value
#[derive(Debug, Clone, Default)]
pub struct UpdateProduct {
    pub name: Option<String>,
    pub image: Option<Vec<String>>,
    pub category_ids: Option<Vec<Uuid>>,
    pub sub_category_ids: Option<Vec<Uuid>>,
    pub unit: Option<String>,
    pub stock: Option<i32>,
    pub price: Option<Decimal>,
    pub discount: Option<i32>,
    pub description: Option<String>,
    pub more_details: Option<JsonValue>,
    pub publish: Option<bool>,
}

/// Builds an ILIKE pattern matching `term` anywhere, with wildcards escaped
pub fn contains_pattern(term: &str) -> String {
    let escaped = term
        .trim()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

fn push_search_filter(builder: &mut QueryBuilder<'_, Postgres>, search: Option<&str>) {
    if let Some(term) = search.map(str::trim).filter(|t| !t.is_empty()) {
        let pattern = contains_pattern(term);
        builder
            .push(" WHERE (name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR description ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

impl Product {
    pub async fn create(pool: &PgPool, data: NewProduct) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Product>(&format!(
            r#"
            INSERT INTO products (name, image, category_ids, sub_category_ids, unit, stock,
                                  price, discount, description, more_details, publish)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {}
            "#,
            PRODUCT_COLUMNS
        ))
        .bind(data.name)
        .bind(data.image)
        .bind(data.category_ids)
        .bind(data.sub_category_ids)
        .bind(data.unit)
        .bind(data.stock)
        .bind(data.price)
        .bind(data.discount)
        .bind(data.description)
        .bind(data.more_details)
        .bind(data.publish)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Product>(&format!("SELECT {} FROM products WHERE id = $1", PRODUCT_COLUMNS))
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// One page of products, newest first, optionally filtered by a
    /// case-insensitive match on name or description
    ///
    /// Returns the page and the total number of matches.
    pub async fn list(
        pool: &PgPool,
        search: Option<&str>,
        page: Pagination,
    ) -> Result<(Vec<Self>, i64), sqlx::Error> {
        let mut query = QueryBuilder::<Postgres>::new(format!("SELECT {} FROM products", PRODUCT_COLUMNS));
        push_search_filter(&mut query, search);
        query
            .push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(page.limit)
            .push(" OFFSET ")
            .push_bind(page.offset());

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM products");
        push_search_filter(&mut count, search);

        let products = query.build_query_as::<Product>().fetch_all(pool).await?;
        let (total,): (i64,) = count.build_query_as().fetch_one(pool).await?;

        Ok((products, total))
    }

    /// Newest products in a category, up to [`CATEGORY_SHELF_LIMIT`]
    pub async fn list_by_category(pool: &PgPool, category_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Product>(&format!(
            "SELECT {} FROM products WHERE $1 = ANY(category_ids) ORDER BY created_at DESC LIMIT $2",
            PRODUCT_COLUMNS
        ))
        .bind(category_id)
        .bind(CATEGORY_SHELF_LIMIT)
        .fetch_all(pool)
        .await
    }

    /// One page of products in both the category and the sub-category
    pub async fn list_by_category_and_sub_category(
        pool: &PgPool,
        category_id: Uuid,
        sub_category_id: Uuid,
        page: Pagination,
    ) -> Result<(Vec<Self>, i64), sqlx::Error> {
        let products = sqlx::query_as::<_, Product>(&format!(
            r#"
            SELECT {} FROM products
            WHERE $1 = ANY(category_ids) AND $2 = ANY(sub_category_ids)
            ORDER BY created_at DESC
            LIMIT $3 OFFSET $4
            "#,
            PRODUCT_COLUMNS
        ))
        .bind(category_id)
        .bind(sub_category_id)
        .bind(page.limit)
        .bind(page.offset())
        .fetch_all(pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM products WHERE $1 = ANY(category_ids) AND $2 = ANY(sub_category_ids)",
        )
        .bind(category_id)
        .bind(sub_category_id)
        .fetch_one(pool)
        .await?;

        Ok((products, total))
    }

    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateProduct,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut builder = QueryBuilder::<Postgres>::new("UPDATE products SET updated_at = NOW()");

        if let Some(name) = data.name {
            builder.push(", name = ").push_bind(name);
        }
        if let Some(image) = data.image {
            builder.push(", image = ").push_bind(image);
        }
        if let Some(ids) = data.category_ids {
            builder.push(", category_ids = ").push_bind(ids);
        }
        if let Some(ids) = data.sub_category_ids {
            builder.push(", sub_category_ids = ").push_bind(ids);
        }
        if let Some(unit) = data.unit {
            builder.push(", unit = ").push_bind(unit);
        }
        if let Some(stock) = data.stock {
            builder.push(", stock = ").push_bind(stock);
        }
        if let Some(price) = data.price {
            builder.push(", price = ").push_bind(price);
        }
        if let Some(discount) = data.discount {
            builder.push(", discount = ").push_bind(discount);
        }
        if let Some(description) = data.description {
            builder.push(", description = ").push_bind(description);
        }
        if let Some(details) = data.more_details {
            builder.push(", more_details = ").push_bind(details);
        }
        if let Some(publish) = data.publish {
            builder.push(", publish = ").push_bind(publish);
        }

        builder
            .push(" WHERE id = ")
            .push_bind(id)
            .push(" RETURNING ")
            .push(PRODUCT_COLUMNS);

        builder.build_query_as::<Product>().fetch_optional(pool).await
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_contains_pattern_escapes_wildcards() {
        assert_eq!(contains_pattern("rice"), "%rice%");
        assert_eq!(contains_pattern("  atta "), "%atta%");
        assert_eq!(contains_pattern("100%"), "%100\\%%");
        assert_eq!(contains_pattern("a_b"), "%a\\_b%");
    }

    #[test]
    fn test_product_columns_alias() {
        let columns = product_columns("p");
        assert!(columns.starts_with("p.id, p.name, p.image"));
        assert!(columns.ends_with("p.updated_at"));
    }

    #[test]
    fn test_product_json_shape() {
        let product = Product {
            id: Uuid::nil(),
            name: "Toor Dal".to_string(),
            image: vec!["https://img.example/dal.png".to_string()],
            category_ids: vec![Uuid::nil()],
            sub_category_ids: vec![],
            unit: "1 kg".to_string(),
            stock: Some(12),
            price: Decimal::from_str("149.50").unwrap(),
            discount: 10,
            description: String::new(),
            more_details: serde_json::json!({ "origin": "India" }),
            publish: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let json = serde_json::to_value(&product).unwrap();
        assert_eq!(json["price"], "149.50");
        assert_eq!(json["subCategory"], serde_json::json!([]));
        assert_eq!(json["more_details"]["origin"], "India");

        // ceil(14.95) = 15 off
        assert_eq!(product.discounted_price(), Decimal::from_str("134.50").unwrap());
        assert_eq!(product.priced_line(2).total(), Decimal::from_str("269.00").unwrap());
    }
}
