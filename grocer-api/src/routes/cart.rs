/// Cart endpoints (all require a login)
///
/// - `POST   /api/cart/create` `{productId}`
/// - `GET    /api/cart/get` (lines plus `totals`)
/// - `PUT    /api/cart/update-qty` `{_id, qty}`
/// - `DELETE /api/cart/delete-cart-item` `{_id}`
///
/// Every write is scoped to the caller's own lines.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    response::{created, ok, Envelope},
    routes::required_id,
};
use axum::{extract::State, response::Response, Extension, Json};
use grocer_shared::auth::middleware::AuthContext;
use grocer_shared::models::{
    cart::{self, CartItem, CartLine},
    product::Product,
};
use grocer_shared::pricing::CartTotals;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct AddToCartRequest {
    #[serde(rename = "productId")]
    pub product_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateQuantityRequest {
    #[serde(rename = "_id")]
    pub id: Option<String>,
    pub qty: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteCartItemRequest {
    #[serde(rename = "_id")]
    pub id: Option<String>,
}

/// The usual envelope with the cart's totals beside `data`
#[derive(Debug, Serialize)]
pub struct CartView {
    #[serde(flatten)]
    pub envelope: Envelope<Vec<CartLine>>,
    pub totals: CartTotals,
}

impl CartView {
    pub fn new(lines: Vec<CartLine>) -> Self {
        let totals = cart::totals(&lines);
        Self {
            envelope: ok("", lines),
            totals,
        }
    }
}

pub async fn add_to_cart(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<AddToCartRequest>,
) -> ApiResult<Response> {
    let product_id = required_id(&req.product_id, "Provide productId")?;

    if Product::find_by_id(&state.db, product_id).await?.is_none() {
        return Err(ApiError::NotFound("Product not found".to_string()));
    }

    let item = CartItem::add(&state.db, auth.user_id, product_id)
        .await?
        .ok_or_else(|| ApiError::BadRequest("Item already in cart".to_string()))?;

    tracing::debug!(user_id = %auth.user_id, product_id = %product_id, "Added to cart");
    Ok(created("Item add successfully", item))
}

pub async fn get_cart(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<CartView>> {
    let lines = CartItem::list_for_user(&state.db, auth.user_id).await?;
    Ok(Json(CartView::new(lines)))
}

pub async fn update_quantity(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<UpdateQuantityRequest>,
) -> ApiResult<Envelope<CartItem>> {
    let id = required_id(&req.id, "provide _id, qty")?;
    let qty = req
        .qty
        .ok_or_else(|| ApiError::BadRequest("provide _id, qty".to_string()))?;

    if qty < 1 {
        return Err(ApiError::BadRequest("qty must be at least 1".to_string()));
    }

    let item = CartItem::update_quantity(&state.db, auth.user_id, id, qty)
        .await?
        .ok_or_else(|| ApiError::NotFound("Cart item not found".to_string()))?;

    Ok(ok("Update cart", item))
}

pub async fn delete_cart_item(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<DeleteCartItemRequest>,
) -> ApiResult<Envelope<()>> {
    let id = required_id(&req.id, "Provide _id")?;

    if !CartItem::delete(&state.db, auth.user_id, id).await? {
        return Err(ApiError::NotFound("Cart item not found".to_string()));
    }

    Ok(ok("Item remove", ()))
}
