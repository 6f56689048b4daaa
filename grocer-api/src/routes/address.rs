/// Address endpoints (all require a login)
///
/// - `POST   /api/address/create`
/// - `GET    /api/address/get`
/// - `PUT    /api/address/update` `{_id, ...}`
/// - `DELETE /api/address/disable` `{_id}`

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    response::{created, ok, Envelope},
    routes::{present, required_id},
};
use axum::{extract::State, response::Response, Extension, Json};
use grocer_shared::auth::middleware::AuthContext;
use grocer_shared::models::address::{Address, AddressFields};
use serde::Deserialize;
use validator::Validate;

#[derive(Debug, Default, Deserialize, Validate)]
pub struct AddressRequest {
    #[serde(rename = "_id")]
    pub id: Option<String>,

    #[validate(length(max = 500, message = "Address is too long"))]
    pub address_line: Option<String>,

    #[validate(length(max = 100, message = "City is too long"))]
    pub city: Option<String>,

    #[validate(length(max = 100, message = "State is too long"))]
    pub state: Option<String>,

    #[validate(length(max = 20, message = "Pincode is too long"))]
    pub pincode: Option<String>,

    #[validate(length(max = 100, message = "Country is too long"))]
    pub country: Option<String>,

    #[validate(length(max = 20, message = "Mobile is too long"))]
    pub mobile: Option<String>,
}

impl AddressRequest {
    fn fields(&self) -> AddressFields {
        AddressFields {
            address_line: present(&self.address_line).map(str::to_string),
            city: present(&self.city).map(str::to_string),
            state: present(&self.state).map(str::to_string),
            pincode: present(&self.pincode).map(str::to_string),
            country: present(&self.country).map(str::to_string),
            mobile: present(&self.mobile).map(str::to_string),
        }
    }
}

pub async fn create_address(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<AddressRequest>,
) -> ApiResult<Response> {
    req.validate()?;

    let address = Address::create(&state.db, auth.user_id, req.fields()).await?;
    tracing::info!(user_id = %auth.user_id, address_id = %address.id, "Address created");

    Ok(created("Address Created Successfully", address))
}

/// All of the caller's addresses, including disabled ones
pub async fn get_addresses(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Envelope<Vec<Address>>> {
    Ok(ok(
        "List of address",
        Address::list_for_user(&state.db, auth.user_id).await?,
    ))
}

pub async fn update_address(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<AddressRequest>,
) -> ApiResult<Envelope<Address>> {
    let id = required_id(&req.id, "Provide _id")?;
    req.validate()?;

    let address = Address::update(&state.db, auth.user_id, id, req.fields())
        .await?
        .ok_or_else(|| ApiError::NotFound("Address not found".to_string()))?;

    Ok(ok("Address Updated", address))
}

/// Soft-deletes: orders keep pointing at the row
pub async fn disable_address(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<AddressRequest>,
) -> ApiResult<Envelope<()>> {
    let id = required_id(&req.id, "Provide _id")?;

    if !Address::disable(&state.db, auth.user_id, id).await? {
        return Err(ApiError::NotFound("Address not found".to_string()));
    }

    Ok(ok("Address remove", ()))
}
