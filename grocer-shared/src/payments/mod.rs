/// Payment gateway integration
///
/// The storefront takes card payments through Stripe Checkout. The gateway is
/// treated as an opaque external service behind the [`PaymentGateway`] trait:
///
/// - [`stripe`]: HTTPS client for the Stripe REST API
/// - [`webhook`]: `Stripe-Signature` verification and event parsing
/// - [`mock`]: in-memory gateway for tests and local development
///
/// # Flow
///
/// ```text
/// POST /api/order/checkout ──► create_checkout_session ──► client redirects to session.url
///                                                        │
/// Stripe ── checkout.session.completed ──► POST /api/order/webhook
///                                            └─► list_line_items ──► orders inserted, cart cleared
/// ```

pub mod mock;
pub mod stripe;
pub mod webhook;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Session metadata key holding the purchasing user's ID
pub const METADATA_USER_ID: &str = "userId";

/// Session metadata key holding the delivery address ID
pub const METADATA_ADDRESS_ID: &str = "addressId";

/// Product metadata key holding our product ID
pub const METADATA_PRODUCT_ID: &str = "productId";

/// Error type for gateway operations
#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    /// Transport failure talking to the gateway
    #[error("Payment gateway request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Gateway answered with an error object
    #[error("Payment gateway error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Gateway answered with something we could not interpret
    #[error("Unexpected payment gateway response: {0}")]
    InvalidResponse(String),

    /// Request could not be built from our data
    #[error("Invalid checkout request: {0}")]
    InvalidRequest(String),
}

/// One purchasable line in a checkout session
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CheckoutLineItem {
    /// Our product ID, stored in the gateway product's metadata
    pub product_id: Uuid,

    /// Display name
    pub name: String,

    /// Product image URLs
    pub images: Vec<String>,

    /// Discounted unit price in minor units
    pub unit_amount: i64,

    /// Quantity
    pub quantity: i64,
}

/// Input for creating a checkout session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCheckoutSession {
    /// ISO currency code, lowercase (e.g. "inr")
    pub currency: String,

    /// Prefills the payer's email
    pub customer_email: String,

    /// Purchasing user
    pub user_id: Uuid,

    /// Delivery address
    pub address_id: Uuid,

    /// Lines to charge
    pub line_items: Vec<CheckoutLineItem>,

    /// Where the gateway sends the payer after paying
    pub success_url: String,

    /// Where the gateway sends the payer after backing out
    pub cancel_url: String,
}

/// A checkout session as reported by the gateway
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CheckoutSession {
    /// Session ID (`cs_...`)
    pub id: String,

    /// Hosted payment page
    #[serde(default)]
    pub url: Option<String>,

    /// Payment intent created for the session (`pi_...`)
    #[serde(default)]
    pub payment_intent: Option<String>,

    /// "paid", "unpaid" or "no_payment_required"
    #[serde(default)]
    pub payment_status: String,

    /// Payer email
    #[serde(default)]
    pub customer_email: Option<String>,

    /// Metadata we attached at creation
    #[serde(default)]
    pub metadata: HashMap<String, String>,

    /// Total in minor units
    #[serde(default)]
    pub amount_total: Option<i64>,
}

impl CheckoutSession {
    /// Whether the gateway has captured the payment
    pub fn is_paid(&self) -> bool {
        self.payment_status == "paid"
    }

    /// The user recorded in session metadata, if present and well-formed
    pub fn user_id(&self) -> Option<Uuid> {
        self.metadata
            .get(METADATA_USER_ID)
            .and_then(|v| Uuid::parse_str(v).ok())
    }

    /// The delivery address recorded in session metadata
    pub fn address_id(&self) -> Option<Uuid> {
        self.metadata
            .get(METADATA_ADDRESS_ID)
            .and_then(|v| Uuid::parse_str(v).ok())
    }
}

/// A product object as returned inside an expanded line item
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GatewayProduct {
    /// Gateway product ID (`prod_...`)
    pub id: String,

    /// Display name
    #[serde(default)]
    pub name: String,

    /// Image URLs
    #[serde(default)]
    pub images: Vec<String>,

    /// Metadata we attached (contains `productId`)
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// Product reference on a price: bare ID unless expanded
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ProductRef {
    /// Expanded product object
    Expanded(GatewayProduct),

    /// Unexpanded product ID
    Id(String),
}

/// Price attached to a line item
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LineItemPrice {
    /// Price ID
    pub id: String,

    /// Unit amount in minor units
    #[serde(default)]
    pub unit_amount: Option<i64>,

    /// Product
    pub product: ProductRef,
}

/// A line item of a completed session
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionLineItem {
    /// Line item ID
    pub id: String,

    /// Product name at purchase time
    #[serde(default)]
    pub description: Option<String>,

    /// Quantity purchased
    #[serde(default)]
    pub quantity: Option<i64>,

    /// Line total after discounts, minor units
    #[serde(default)]
    pub amount_total: i64,

    /// Line total before discounts, minor units
    #[serde(default)]
    pub amount_subtotal: Option<i64>,

    /// Price (with product expanded when requested)
    #[serde(default)]
    pub price: Option<LineItemPrice>,
}

impl SessionLineItem {
    /// The expanded gateway product, if the price carries one
    pub fn product(&self) -> Option<&GatewayProduct> {
        match self.price.as_ref().map(|p| &p.product) {
            Some(ProductRef::Expanded(product)) => Some(product),
            _ => None,
        }
    }

    /// Our product ID, read from the gateway product's metadata
    pub fn product_id(&self) -> Option<Uuid> {
        self.product()
            .and_then(|p| p.metadata.get(METADATA_PRODUCT_ID))
            .and_then(|v| Uuid::parse_str(v).ok())
    }
}

/// Payment gateway operations used by the order flow
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Creates a hosted checkout session
    async fn create_checkout_session(
        &self,
        request: &NewCheckoutSession,
    ) -> Result<CheckoutSession, PaymentError>;

    /// Fetches a session by ID
    async fn retrieve_session(&self, session_id: &str) -> Result<CheckoutSession, PaymentError>;

    /// Lists all line items of a session, with products expanded
    async fn list_line_items(&self, session_id: &str) -> Result<Vec<SessionLineItem>, PaymentError>;
}
