/// Order endpoints
///
/// - `POST /api/order/cash-on-delivery` (auth) `{addressId}`
/// - `POST /api/order/checkout` (auth) `{addressId}`
/// - `POST /api/order/webhook` (signed by the gateway)
/// - `GET  /api/order/order-list` (auth)
/// - `GET  /api/order/recent` (auth)
/// - `POST /api/order/confirm-checkout` (auth) `{sessionId}`
///
/// Paid orders are materialized from a completed checkout session by both
/// the webhook and `confirm-checkout`. Inserts are keyed on
/// (payment_id, gateway line item), so whichever runs second writes nothing
/// and leaves the cart alone.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    response::{created, ok, Envelope},
    routes::{present, required_id},
};
use axum::{
    extract::State,
    http::HeaderMap,
    response::Response,
    Extension, Json,
};
use bytes::Bytes;
use chrono::{Duration, Utc};
use grocer_shared::{
    auth::middleware::AuthContext,
    models::{
        address::Address,
        cart::{CartItem, CartLine},
        order::{NewOrder, Order, OrderWithAddress, ProductDetails, CASH_ON_DELIVERY, RECENT_WINDOW_MINUTES},
        user::User,
    },
    payments::{
        webhook::{self, OrderEvent, WebhookError, WebhookEvent, DEFAULT_TOLERANCE_SECS, SIGNATURE_HEADER},
        CheckoutLineItem, CheckoutSession, NewCheckoutSession, SessionLineItem,
    },
    pricing::{from_minor_units, to_minor_units},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct PlaceOrderRequest {
    #[serde(rename = "addressId")]
    pub address_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ConfirmCheckoutRequest {
    #[serde(rename = "sessionId")]
    pub session_id: Option<String>,
}

/// The hosted payment page to redirect to
#[derive(Debug, Serialize, Deserialize)]
pub struct CheckoutResponse {
    pub id: String,
    pub url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WebhookAck {
    pub received: bool,
}

/// One cash-on-delivery order per cart line, priced from the live product
fn cash_orders(user_id: Uuid, address_id: Uuid, lines: &[CartLine]) -> Vec<NewOrder> {
    lines
        .iter()
        .map(|line| {
            let priced = line.product.priced_line(line.quantity);
            NewOrder {
                user_id,
                product_id: Some(line.product.id),
                product_details: ProductDetails {
                    name: line.product.name.clone(),
                    image: line.product.image.clone(),
                },
                payment_id: String::new(),
                gateway_line_id: None,
                payment_status: CASH_ON_DELIVERY.to_string(),
                delivery_address: Some(address_id),
                sub_total_amt: priced.sub_total(),
                total_amt: priced.total(),
            }
        })
        .collect()
}

/// Checkout lines at the discounted unit price
fn checkout_lines(lines: &[CartLine]) -> ApiResult<Vec<CheckoutLineItem>> {
    lines
        .iter()
        .map(|line| {
            let unit_amount = to_minor_units(line.product.discounted_price()).ok_or_else(|| {
                ApiError::InternalError(format!("Price of product {} does not fit in minor units", line.product.id))
            })?;

            Ok(CheckoutLineItem {
                product_id: line.product.id,
                name: line.product.name.clone(),
                images: line.product.image.clone(),
                unit_amount,
                quantity: i64::from(line.quantity),
            })
        })
        .collect()
}

/// The payment reference recorded on orders: the payment intent, or the
/// session itself when the gateway has not attached one
fn payment_reference(session: &CheckoutSession) -> String {
    session
        .payment_intent
        .clone()
        .unwrap_or_else(|| session.id.clone())
}

/// Maps a completed session's line items to order rows
fn paid_orders(user_id: Uuid, session: &CheckoutSession, items: &[SessionLineItem]) -> Vec<NewOrder> {
    let payment_id = payment_reference(session);

    items
        .iter()
        .map(|item| {
            let (name, image) = match item.product() {
                Some(product) => (product.name.clone(), product.images.clone()),
                None => (item.description.clone().unwrap_or_default(), Vec::new()),
            };
            let amount = from_minor_units(item.amount_total);

            NewOrder {
                user_id,
                product_id: item.product_id(),
                product_details: ProductDetails { name, image },
                payment_id: payment_id.clone(),
                gateway_line_id: Some(item.id.clone()),
                payment_status: session.payment_status.clone(),
                delivery_address: session.address_id(),
                sub_total_amt: amount,
                total_amt: amount,
            }
        })
        .collect()
}

/// Inserts the session's orders and clears the cart in one transaction
///
/// Returns the orders this call inserted; empty when they already existed.
async fn materialize_session(state: &AppState, session: &CheckoutSession) -> ApiResult<Vec<Order>> {
    let user_id = session
        .user_id()
        .ok_or_else(|| ApiError::BadRequest("Checkout session has no userId".to_string()))?;

    let items = state.gateway.list_line_items(&session.id).await?;
    let orders = paid_orders(user_id, session, &items);

    let mut tx = state.db.begin().await?;
    let inserted = Order::insert_many(&mut *tx, &orders).await?;
    if !inserted.is_empty() {
        CartItem::clear_for_user(&mut *tx, user_id).await?;
    }
    tx.commit().await?;

    tracing::info!(
        user_id = %user_id,
        session_id = %session.id,
        order_count = inserted.len(),
        "Checkout session materialized"
    );
    Ok(inserted)
}

/// Places one order per cart line and empties the cart
///
/// # Errors
///
/// - `400`: missing `addressId` or empty cart
/// - `404`: the address is not the caller's or is disabled
pub async fn cash_on_delivery(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<PlaceOrderRequest>,
) -> ApiResult<Response> {
    let address_id = required_id(&req.address_id, "Provide addressId")?;

    let mut tx = state.db.begin().await?;

    if Address::find_active_for_user(&mut *tx, auth.user_id, address_id).await?.is_none() {
        return Err(ApiError::NotFound("Address not found".to_string()));
    }

    let lines = CartItem::list_for_user(&mut *tx, auth.user_id).await?;
    if lines.is_empty() {
        return Err(ApiError::BadRequest("Cart is empty".to_string()));
    }

    let orders = Order::insert_many(&mut *tx, &cash_orders(auth.user_id, address_id, &lines)).await?;
    CartItem::clear_for_user(&mut *tx, auth.user_id).await?;
    tx.commit().await?;

    tracing::info!(user_id = %auth.user_id, order_count = orders.len(), "Cash on delivery order placed");
    Ok(created("Order successfully", orders))
}

/// Starts a hosted checkout for the caller's cart
pub async fn checkout(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<PlaceOrderRequest>,
) -> ApiResult<Envelope<CheckoutResponse>> {
    let address_id = required_id(&req.address_id, "Provide addressId")?;

    if Address::find_active_for_user(&state.db, auth.user_id, address_id).await?.is_none() {
        return Err(ApiError::NotFound("Address not found".to_string()));
    }

    let lines = CartItem::list_for_user(&state.db, auth.user_id).await?;
    if lines.is_empty() {
        return Err(ApiError::BadRequest("Cart is empty".to_string()));
    }

    let user = User::find_by_id(&state.db, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    let session = state
        .gateway
        .create_checkout_session(&NewCheckoutSession {
            currency: state.config.stripe.currency.clone(),
            customer_email: user.email,
            user_id: auth.user_id,
            address_id,
            line_items: checkout_lines(&lines)?,
            success_url: state.config.checkout_success_url(),
            cancel_url: state.config.checkout_cancel_url(),
        })
        .await?;

    tracing::info!(user_id = %auth.user_id, session_id = %session.id, "Checkout session created");
    Ok(ok(
        "Checkout session created",
        CheckoutResponse {
            id: session.id,
            url: session.url,
        },
    ))
}

/// Gateway callback
///
/// The raw body is verified against `Stripe-Signature` before parsing.
/// Completed sessions are materialized; other events are acknowledged.
pub async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<WebhookAck>> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(WebhookError::MissingHeader)?;

    webhook::verify_signature(
        &body,
        signature,
        &state.config.stripe.webhook_secret,
        Utc::now().timestamp(),
        DEFAULT_TOLERANCE_SECS,
    )?;

    let event = WebhookEvent::from_slice(&body)?;
    let event_id = event.id.clone();

    match event.into_order_event()? {
        OrderEvent::CheckoutCompleted(session) => {
            materialize_session(&state, &session).await?;
        }
        OrderEvent::Other(event_type) => {
            tracing::info!(event_id = %event_id, event_type = %event_type, "Unhandled webhook event");
        }
    }

    Ok(Json(WebhookAck { received: true }))
}

pub async fn order_list(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Envelope<Vec<OrderWithAddress>>> {
    Ok(ok("order list", Order::list_for_user(&state.db, auth.user_id).await?))
}

/// Orders placed in the last few minutes, for the success page to poll
pub async fn recent_orders(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Envelope<Vec<OrderWithAddress>>> {
    let window = Duration::minutes(RECENT_WINDOW_MINUTES);

    Ok(ok(
        "recent orders",
        Order::list_recent_for_user(&state.db, auth.user_id, window).await?,
    ))
}

/// Client-driven fallback for a delayed webhook
///
/// # Errors
///
/// - `403`: the session belongs to another user
/// - `404`: the gateway does not know the session
/// - `409`: the session is not paid yet
pub async fn confirm_checkout(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<ConfirmCheckoutRequest>,
) -> ApiResult<Envelope<Vec<Order>>> {
    let session_id =
        present(&req.session_id).ok_or_else(|| ApiError::BadRequest("Provide sessionId".to_string()))?;

    let session = state.gateway.retrieve_session(session_id).await?;

    if session.user_id() != Some(auth.user_id) {
        tracing::warn!(user_id = %auth.user_id, session_id, "Checkout session owned by another user");
        return Err(ApiError::Forbidden("Permission denied".to_string()));
    }

    if !session.is_paid() {
        return Err(ApiError::Conflict("Payment not completed".to_string()));
    }

    materialize_session(&state, &session).await?;
    let orders = Order::list_by_payment(&state.db, auth.user_id, &payment_reference(&session)).await?;

    Ok(ok("Order successfully", orders))
}

#[cfg(test)]
mod tests {
    use super::*;
    use grocer_shared::models::product::Product;
    use grocer_shared::payments::{
        GatewayProduct, LineItemPrice, ProductRef, METADATA_ADDRESS_ID, METADATA_PRODUCT_ID, METADATA_USER_ID,
    };
    use rust_decimal::Decimal;
    use std::collections::HashMap;

    fn product(price: i64, discount: i32) -> Product {
        Product {
            id: Uuid::new_v4(),
            name: "Toor Dal".to_string(),
            image: vec!["https://img.example/dal.png".to_string()],
            category_ids: vec![],
            sub_category_ids: vec![],
            unit: "1 kg".to_string(),
            stock: Some(20),
            price: Decimal::from(price),
            discount,
            description: "Split pigeon peas".to_string(),
            more_details: serde_json::json!({}),
            publish: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn line(product: Product, quantity: i32) -> CartLine {
        CartLine {
            id: Uuid::new_v4(),
            user_id: Uuid::nil(),
            quantity,
            product,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn session(payment_intent: Option<&str>, address_id: Uuid) -> CheckoutSession {
        CheckoutSession {
            id: "cs_test_1".to_string(),
            url: None,
            payment_intent: payment_intent.map(str::to_string),
            payment_status: "paid".to_string(),
            customer_email: None,
            metadata: HashMap::from([
                (METADATA_USER_ID.to_string(), Uuid::nil().to_string()),
                (METADATA_ADDRESS_ID.to_string(), address_id.to_string()),
            ]),
            amount_total: Some(27000),
        }
    }

    #[test]
    fn test_cash_orders_use_discounted_line_totals() {
        let address_id = Uuid::new_v4();
        let orders = cash_orders(Uuid::nil(), address_id, &[line(product(100, 10), 3)]);

        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].payment_status, CASH_ON_DELIVERY);
        assert!(orders[0].payment_id.is_empty());
        assert_eq!(orders[0].sub_total_amt, Decimal::from(300));
        assert_eq!(orders[0].total_amt, Decimal::from(270));
        assert_eq!(orders[0].delivery_address, Some(address_id));
    }

    #[test]
    fn test_checkout_lines_in_minor_units() {
        let items = checkout_lines(&[line(product(199, 10), 2)]).unwrap();

        // 199 - ceil(19.9) = 179
        assert_eq!(items[0].unit_amount, 17900);
        assert_eq!(items[0].quantity, 2);
    }

    #[test]
    fn test_paid_orders_from_line_items() {
        let product_id = Uuid::new_v4();
        let address_id = Uuid::new_v4();
        let items = vec![
            SessionLineItem {
                id: "li_1".to_string(),
                description: Some("Toor Dal".to_string()),
                quantity: Some(3),
                amount_total: 27000,
                amount_subtotal: Some(27000),
                price: Some(LineItemPrice {
                    id: "price_1".to_string(),
                    unit_amount: Some(9000),
                    product: ProductRef::Expanded(GatewayProduct {
                        id: "prod_1".to_string(),
                        name: "Toor Dal".to_string(),
                        images: vec!["https://img.example/dal.png".to_string()],
                        metadata: HashMap::from([(METADATA_PRODUCT_ID.to_string(), product_id.to_string())]),
                    }),
                }),
            },
            SessionLineItem {
                id: "li_2".to_string(),
                description: Some("Loose item".to_string()),
                quantity: Some(1),
                amount_total: 1050,
                amount_subtotal: None,
                price: None,
            },
        ];

        let orders = paid_orders(Uuid::nil(), &session(Some("pi_123"), address_id), &items);

        assert_eq!(orders.len(), 2);
        assert_eq!(orders[0].product_id, Some(product_id));
        assert_eq!(orders[0].payment_id, "pi_123");
        assert_eq!(orders[0].total_amt, Decimal::from(270));
        assert_eq!(orders[0].delivery_address, Some(address_id));
        assert_eq!(orders[1].product_id, None);
        assert_eq!(orders[1].product_details.name, "Loose item");
        assert_eq!(orders[1].total_amt, Decimal::new(1050, 2));
    }

    #[test]
    fn test_payment_reference_falls_back_to_session() {
        assert_eq!(payment_reference(&session(Some("pi_9"), Uuid::nil())), "pi_9");
        assert_eq!(payment_reference(&session(None, Uuid::nil())), "cs_test_1");
    }
}
