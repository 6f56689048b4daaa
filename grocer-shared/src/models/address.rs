/// Delivery addresses
///
/// Addresses are never deleted because orders point at them; "removing" one
/// flips `status` to false.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgExecutor;
use sqlx::PgPool;
use uuid::Uuid;

const ADDRESS_COLUMNS: &str =
    "id, user_id, address_line, city, state, pincode, country, mobile, status, created_at, updated_at";

/// An address row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Address {
    #[serde(rename = "_id")]
    pub id: Uuid,
    #[serde(rename = "userId")]
    pub user_id: Uuid,
    pub address_line: String,
    pub city: String,
    pub state: String,
    pub pincode: Option<String>,
    pub country: Option<String>,
    pub mobile: Option<String>,

    /// False once disabled by the user
    pub status: bool,

    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

/// Address fields supplied by the client
#[derive(Debug, Clone, Default)]
pub struct AddressFields {
    pub address_line: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub pincode: Option<String>,
    pub country: Option<String>,
    pub mobile: Option<String>,
}

impl Address {
    pub async fn create(
        pool: &PgPool,
        user_id: Uuid,
        fields: AddressFields,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Address>(&format!(
            r#"
            INSERT INTO addresses (user_id, address_line, city, state, pincode, country, mobile)
            VALUES ($1, COALESCE($2, ''), COALESCE($3, ''), COALESCE($4, ''), $5, $6, $7)
            RETURNING {}
            "#,
            ADDRESS_COLUMNS
        ))
        .bind(user_id)
        .bind(fields.address_line)
        .bind(fields.city)
        .bind(fields.state)
        .bind(fields.pincode)
        .bind(fields.country)
        .bind(fields.mobile)
        .fetch_one(pool)
        .await
    }

    /// All of the user's addresses, newest first, disabled ones included
    pub async fn list_for_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Address>(&format!(
            "SELECT {} FROM addresses WHERE user_id = $1 ORDER BY created_at DESC",
            ADDRESS_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    /// Loads an address orders can ship to: the user's own and not disabled
    pub async fn find_active_for_user<'e, E>(
        executor: E,
        user_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Address>(&format!(
            "SELECT {} FROM addresses WHERE id = $1 AND user_id = $2 AND status = TRUE",
            ADDRESS_COLUMNS
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(executor)
        .await
    }

    /// Loads addresses by ID regardless of owner (for order listings)
    pub async fn find_many(pool: &PgPool, ids: &[Uuid]) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Address>(&format!(
            "SELECT {} FROM addresses WHERE id = ANY($1)",
            ADDRESS_COLUMNS
        ))
        .bind(ids)
        .fetch_all(pool)
        .await
    }

    /// Updates one of the user's addresses; `None` fields keep their value
    pub async fn update(
        pool: &PgPool,
        user_id: Uuid,
        id: Uuid,
        fields: AddressFields,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Address>(&format!(
            r#"
            UPDATE addresses
            SET address_line = COALESCE($3, address_line),
                city = COALESCE($4, city),
                state = COALESCE($5, state),
                pincode = COALESCE($6, pincode),
                country = COALESCE($7, country),
                mobile = COALESCE($8, mobile),
                updated_at = NOW()
            WHERE id = $1 AND user_id = $2
            RETURNING {}
            "#,
            ADDRESS_COLUMNS
        ))
        .bind(id)
        .bind(user_id)
        .bind(fields.address_line)
        .bind(fields.city)
        .bind(fields.state)
        .bind(fields.pincode)
        .bind(fields.country)
        .bind(fields.mobile)
        .fetch_optional(pool)
        .await
    }

    /// Soft-deletes one of the user's addresses
    pub async fn disable(pool: &PgPool, user_id: Uuid, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE addresses SET status = FALSE, updated_at = NOW() WHERE id = $1 AND user_id = $2",
        )
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
