/// Orders
///
/// One row per purchased product. Cash-on-delivery orders carry an empty
/// `payment_id`; gateway-paid orders carry the payment intent ID and the
/// gateway line item ID, unique together, so materializing the same payment
/// twice inserts nothing the second time. A product or address deleted
/// before materialization is stored as NULL; `product_details` keeps the
/// name and images.
///
/// # Example
///
/// ```no_run
/// use grocer_shared::models::order::{NewOrder, Order, ProductDetails};
/// use rust_decimal::Decimal;
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, user_id: Uuid) -> Result<(), sqlx::Error> {
/// let mut tx = pool.begin().await?;
/// let inserted = Order::insert_many(&mut *tx, &[NewOrder {
///     user_id,
///     product_id: None,
///     product_details: ProductDetails { name: "Ghee".to_string(), image: vec![] },
///     payment_id: "pi_123".to_string(),
///     gateway_line_id: Some("li_1".to_string()),
///     payment_status: "paid".to_string(),
///     delivery_address: None,
///     sub_total_amt: Decimal::from(500),
///     total_amt: Decimal::from(450),
/// }])
/// .await?;
/// tx.commit().await?;
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{ser, Deserialize, Serialize, Serializer};
use sqlx::types::Json;
use sqlx::{PgConnection, PgPool};
use std::collections::HashMap;
use uuid::Uuid;

use super::address::Address;

/// Payment status recorded for cash-on-delivery orders
pub const CASH_ON_DELIVERY: &str = "CASH ON DELIVERY";

/// How far back the reconciliation listing looks
pub const RECENT_WINDOW_MINUTES: i64 = 5;

const ORDER_COLUMNS: &str = "id, user_id, order_id, product_id, product_details, payment_id, \
     payment_status, delivery_address, sub_total_amt, total_amt, invoice_receipt, \
     created_at, updated_at";

/// Product snapshot taken at purchase time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductDetails {
    pub name: String,
    #[serde(default)]
    pub image: Vec<String>,
}

/// An order row
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Order {
    #[serde(rename = "_id")]
    pub id: Uuid,
    #[serde(rename = "userId")]
    pub user_id: Uuid,

    /// Public order number, `ORD-<uuid>`
    #[serde(rename = "orderId")]
    pub order_id: String,

    /// Null once the product is deleted
    #[serde(rename = "productId")]
    pub product_id: Option<Uuid>,

    pub product_details: Json<ProductDetails>,

    /// Payment intent ID, empty for cash on delivery
    #[serde(rename = "paymentId")]
    pub payment_id: String,

    pub payment_status: String,
    pub delivery_address: Option<Uuid>,

    #[serde(rename = "subTotalAmt", with = "rust_decimal::serde::str")]
    pub sub_total_amt: Decimal,

    #[serde(rename = "totalAmt", with = "rust_decimal::serde::str")]
    pub total_amt: Decimal,

    pub invoice_receipt: String,

    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

/// An order with its delivery address joined
///
/// Serializes like [`Order`] with `delivery_address` replaced by the address
/// object (or null).
#[derive(Debug, Clone, PartialEq)]
pub struct OrderWithAddress {
    pub order: Order,
    pub address: Option<Address>,
}

impl Serialize for OrderWithAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut value = serde_json::to_value(&self.order).map_err(ser::Error::custom)?;
        if let Some(map) = value.as_object_mut() {
            map.insert(
                "delivery_address".to_string(),
                serde_json::to_value(&self.address).map_err(ser::Error::custom)?,
            );
        }
        value.serialize(serializer)
    }
}

/// Input for one order row
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrder {
    pub user_id: Uuid,
    pub product_id: Option<Uuid>,
    pub product_details: ProductDetails,
    pub payment_id: String,

    /// Gateway line item; `None` for cash-on-delivery
    pub gateway_line_id: Option<String>,

    pub payment_status: String,
    pub delivery_address: Option<Uuid>,
    pub sub_total_amt: Decimal,
    pub total_amt: Decimal,
}

/// Generates a public order number
pub fn new_order_id() -> String {
    format!("ORD-{}", Uuid::new_v4())
}

impl Order {
    /// Inserts orders, skipping any (payment_id, gateway_line_id) already stored
    ///
    /// Runs on the caller's connection so it can share a transaction with
    /// clearing the cart. Returns only the rows actually inserted.
    pub async fn insert_many(
        conn: &mut PgConnection,
        orders: &[NewOrder],
    ) -> Result<Vec<Self>, sqlx::Error> {
        let mut inserted = Vec::with_capacity(orders.len());

        for order in orders {
            let row = sqlx::query_as::<_, Order>(&format!(
                r#"
                INSERT INTO orders (user_id, order_id, product_id, product_details, payment_id,
                                    gateway_line_id, payment_status, delivery_address,
                                    sub_total_amt, total_amt)
                VALUES ($1, $2, (SELECT id FROM products WHERE id = $3), $4, $5, $6, $7,
                        (SELECT id FROM addresses WHERE id = $8), $9, $10)
                ON CONFLICT (payment_id, gateway_line_id) WHERE gateway_line_id IS NOT NULL DO NOTHING
                RETURNING {}
                "#,
                ORDER_COLUMNS
            ))
            .bind(order.user_id)
            .bind(new_order_id())
            .bind(order.product_id)
            .bind(Json(&order.product_details))
            .bind(&order.payment_id)
            .bind(&order.gateway_line_id)
            .bind(&order.payment_status)
            .bind(order.delivery_address)
            .bind(order.sub_total_amt)
            .bind(order.total_amt)
            .fetch_optional(&mut *conn)
            .await?;

            inserted.extend(row);
        }

        Ok(inserted)
    }

    /// The user's orders, newest first, with delivery addresses joined
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: Uuid,
    ) -> Result<Vec<OrderWithAddress>, sqlx::Error> {
        let orders = sqlx::query_as::<_, Order>(&format!(
            "SELECT {} FROM orders WHERE user_id = $1 ORDER BY created_at DESC",
            ORDER_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        with_addresses(pool, orders).await
    }

    /// The user's orders created within the last `window`, newest first
    pub async fn list_recent_for_user(
        pool: &PgPool,
        user_id: Uuid,
        window: Duration,
    ) -> Result<Vec<OrderWithAddress>, sqlx::Error> {
        let since = Utc::now() - window;
        let orders = sqlx::query_as::<_, Order>(&format!(
            "SELECT {} FROM orders WHERE user_id = $1 AND created_at >= $2 ORDER BY created_at DESC",
            ORDER_COLUMNS
        ))
        .bind(user_id)
        .bind(since)
        .fetch_all(pool)
        .await?;

        with_addresses(pool, orders).await
    }

    /// Orders materialized for one payment
    pub async fn list_by_payment(
        pool: &PgPool,
        user_id: Uuid,
        payment_id: &str,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Order>(&format!(
            "SELECT {} FROM orders WHERE user_id = $1 AND payment_id = $2 ORDER BY created_at",
            ORDER_COLUMNS
        ))
        .bind(user_id)
        .bind(payment_id)
        .fetch_all(pool)
        .await
    }
}

async fn with_addresses(
    pool: &PgPool,
    orders: Vec<Order>,
) -> Result<Vec<OrderWithAddress>, sqlx::Error> {
    let mut ids: Vec<Uuid> = orders.iter().filter_map(|o| o.delivery_address).collect();
    ids.sort_unstable();
    ids.dedup();

    let addresses = if ids.is_empty() {
        Vec::new()
    } else {
        Address::find_many(pool, &ids).await?
    };

    Ok(join_addresses(orders, addresses))
}

/// Pairs each order with its delivery address, if it still exists
pub fn join_addresses(orders: Vec<Order>, addresses: Vec<Address>) -> Vec<OrderWithAddress> {
    let by_id: HashMap<Uuid, Address> = addresses.into_iter().map(|a| (a.id, a)).collect();

    orders
        .into_iter()
        .map(|order| {
            let address = order.delivery_address.and_then(|id| by_id.get(&id).cloned());
            OrderWithAddress { order, address }
        })
        .collect()
}
