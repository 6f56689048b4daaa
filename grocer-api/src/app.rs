/// Application state and router builder
///
/// # Example
///
/// ```no_run
/// use grocer_api::{app::{build_router, AppState}, config::Config};
/// use grocer_shared::mail::LogMailer;
/// use grocer_shared::payments::stripe::StripeClient;
/// use sqlx::PgPool;
/// use std::sync::Arc;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let gateway = Arc::new(StripeClient::new(&config.stripe.secret_key, &config.stripe.api_base));
/// let state = AppState::new(pool, config, gateway, Arc::new(LogMailer));
///
/// let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
/// axum::serve(listener, build_router(state)).await?;
/// # Ok(())
/// # }
/// ```

use crate::{
    config::Config,
    middleware::{
        auth::{require_admin, require_auth},
        security::security_headers,
    },
    routes,
};
use axum::{
    http::{header, HeaderValue, Method},
    middleware::from_fn_with_state,
    routing::{delete, get, post, put},
    Router,
};
use grocer_shared::auth::jwt::JwtKeys;
use grocer_shared::mail::Mailer;
use grocer_shared::payments::PaymentGateway;
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state, cloned into every handler
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<Config>,

    /// Signing keys derived from the config once at startup
    pub keys: JwtKeys,

    pub gateway: Arc<dyn PaymentGateway>,
    pub mailer: Arc<dyn Mailer>,
}

impl AppState {
    pub fn new(
        db: PgPool,
        config: Config,
        gateway: Arc<dyn PaymentGateway>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        Self {
            db,
            keys: config.jwt_keys(),
            config: Arc::new(config),
            gateway,
            mailer,
        }
    }

    /// Whether cookies should carry the `Secure` attribute
    pub fn secure_cookies(&self) -> bool {
        self.config.api.production
    }
}

/// Builds the complete router
///
/// ```text
/// /health                      public
/// /api/user/...                register, login and password reset are public
/// /api/category/...            reads public, writes need a login
/// /api/subcategory/...         reads public, writes need a login
/// /api/product/...             reads public, writes need an ADMIN
/// /api/cart/...                login
/// /api/address/...             login
/// /api/order/...               login, except the gateway webhook
/// ```
pub fn build_router(state: AppState) -> Router {
    let auth = || from_fn_with_state(state.clone(), require_auth);
    let admin = || from_fn_with_state(state.clone(), require_admin);

    let user_routes = Router::new()
        .route("/logout", get(routes::user::logout))
        .route("/update-user", put(routes::user::update_user))
        .route("/user-details", get(routes::user::user_details))
        .route_layer(auth())
        .route("/register", post(routes::user::register))
        .route("/verify-email", post(routes::user::verify_email))
        .route("/login", post(routes::user::login))
        .route("/forgot-password", put(routes::user::forgot_password))
        .route(
            "/verify-forgot-password-otp",
            put(routes::user::verify_forgot_password_otp),
        )
        .route("/reset-password", put(routes::user::reset_password))
        .route("/refresh-token", post(routes::user::refresh_token));

    let category_routes = Router::new()
        .route("/add-category", post(routes::category::add_category))
        .route("/update", put(routes::category::update_category))
        .route("/delete", delete(routes::category::delete_category))
        .route_layer(auth())
        .route("/get", get(routes::category::get_categories));

    let sub_category_routes = Router::new()
        .route("/create", post(routes::sub_category::create_sub_category))
        .route("/update", put(routes::sub_category::update_sub_category))
        .route("/delete", delete(routes::sub_category::delete_sub_category))
        .route_layer(auth())
        .route("/get", post(routes::sub_category::get_sub_categories));

    let product_routes = Router::new()
        .route("/create", post(routes::product::create_product))
        .route("/update-product-details", put(routes::product::update_product))
        .route("/delete-product", delete(routes::product::delete_product))
        .route_layer(admin())
        .route_layer(auth())
        .route("/get", post(routes::product::get_products))
        .route("/get-product-by-category", post(routes::product::get_by_category))
        .route(
            "/get-pruduct-by-category-and-subcategory",
            post(routes::product::get_by_category_and_sub_category),
        )
        .route("/get-product-details", post(routes::product::get_product_details))
        .route("/search-product", post(routes::product::search_products));

    let cart_routes = Router::new()
        .route("/create", post(routes::cart::add_to_cart))
        .route("/get", get(routes::cart::get_cart))
        .route("/update-qty", put(routes::cart::update_quantity))
        .route("/delete-cart-item", delete(routes::cart::delete_cart_item))
        .route_layer(auth());

    let address_routes = Router::new()
        .route("/create", post(routes::address::create_address))
        .route("/get", get(routes::address::get_addresses))
        .route("/update", put(routes::address::update_address))
        .route("/disable", delete(routes::address::disable_address))
        .route_layer(auth());

    let order_routes = Router::new()
        .route("/cash-on-delivery", post(routes::order::cash_on_delivery))
        .route("/checkout", post(routes::order::checkout))
        .route("/order-list", get(routes::order::order_list))
        .route("/recent", get(routes::order::recent_orders))
        .route("/confirm-checkout", post(routes::order::confirm_checkout))
        .route_layer(auth())
        .route("/webhook", post(routes::order::webhook));

    let api_routes = Router::new()
        .nest("/user", user_routes)
        .nest("/category", category_routes)
        .nest("/subcategory", sub_category_routes)
        .nest("/product", product_routes)
        .nest("/cart", cart_routes)
        .nest("/address", address_routes)
        .nest("/order", order_routes);

    Router::new()
        .route("/health", get(routes::health::health_check))
        .nest("/api", api_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_layer(&state.config.api.frontend_url))
        .layer(from_fn_with_state(state.config.api.production, security_headers))
        .with_state(state)
}

/// CORS for the storefront origin, with credentials so cookies flow
fn cors_layer(frontend_url: &str) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
        .max_age(std::time::Duration::from_secs(3600));

    match HeaderValue::from_str(frontend_url) {
        Ok(origin) => cors.allow_origin(origin),
        Err(_) => {
            tracing::warn!(frontend_url, "FRONTEND_URL is not a valid origin; CORS disabled");
            cors
        }
    }
}

