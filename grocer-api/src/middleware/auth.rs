/// Route guards
///
/// Both guards are installed with `axum::middleware::from_fn_with_state`.
/// `require_auth` reads the access token from the `accessToken` cookie or a
/// Bearer header and inserts [`AuthContext`] into the request extensions.
/// `require_admin` must run after it.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use grocer_shared::auth::middleware::{authenticate, AuthContext};
use grocer_shared::models::user::User;

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};

/// Rejects requests without a valid access token
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> ApiResult<Response> {
    let auth = authenticate(req.headers(), &state.keys)?;
    req.extensions_mut().insert(auth);

    Ok(next.run(req).await)
}

/// Rejects authenticated users whose stored role is not ADMIN
pub async fn require_admin(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> ApiResult<Response> {
    let auth = req
        .extensions()
        .get::<AuthContext>()
        .copied()
        .ok_or_else(|| ApiError::Unauthorized("Provide token".to_string()))?;

    let is_admin = User::find_by_id(&state.db, auth.user_id)
        .await?
        .is_some_and(|user| user.is_admin());

    if !is_admin {
        tracing::warn!(user_id = %auth.user_id, "Admin route refused");
        return Err(ApiError::Forbidden("Permission denied".to_string()));
    }

    Ok(next.run(req).await)
}
