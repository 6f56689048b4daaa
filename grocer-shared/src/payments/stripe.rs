/// Stripe REST client
///
/// Talks to the Stripe API with form-encoded requests authenticated by the
/// secret key. Only the three Checkout calls the order flow needs are
/// implemented.
///
/// # Example
///
/// ```no_run
/// use grocer_shared::payments::{stripe::StripeClient, PaymentGateway};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let stripe = StripeClient::new("sk_test_...", "https://api.stripe.com");
/// let session = stripe.retrieve_session("cs_test_123").await?;
/// println!("{}", session.payment_status);
/// # Ok(())
/// # }
/// ```

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use super::{
    CheckoutSession, NewCheckoutSession, PaymentError, PaymentGateway, SessionLineItem,
    METADATA_ADDRESS_ID, METADATA_PRODUCT_ID, METADATA_USER_ID,
};

/// Default API base URL
pub const DEFAULT_API_BASE: &str = "https://api.stripe.com";

/// Page size for line item listing (Stripe maximum)
const LINE_ITEM_PAGE_SIZE: u32 = 100;

/// Stripe API client
#[derive(Clone)]
pub struct StripeClient {
    http: reqwest::Client,
    secret_key: String,
    api_base: String,
}

impl std::fmt::Debug for StripeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeClient")
            .field("api_base", &self.api_base)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ListPage<T> {
    data: Vec<T>,
    #[serde(default)]
    has_more: bool,
}

impl StripeClient {
    /// Creates a client for the given secret key and API base URL
    pub fn new(secret_key: impl Into<String>, api_base: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();

        Self {
            http,
            secret_key: secret_key.into(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1/{}", self.api_base, path)
    }

    async fn parse<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, PaymentError> {
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorEnvelope>(&body)
                .ok()
                .map(|e| {
                    format!(
                        "{}{}",
                        e.error.kind.map(|k| format!("[{}] ", k)).unwrap_or_default(),
                        e.error.message.unwrap_or_default()
                    )
                })
                .unwrap_or_else(|| body.clone());
            warn!(status = status.as_u16(), %message, "Stripe request failed");
            return Err(PaymentError::Api {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_str(&body).map_err(|e| PaymentError::InvalidResponse(e.to_string()))
    }
}

/// Encodes a checkout request as Stripe form parameters
///
/// Nested objects use Stripe's bracket syntax, e.g.
/// `line_items[0][price_data][unit_amount]=8500`.
pub fn checkout_form(request: &NewCheckoutSession) -> Result<Vec<(String, String)>, PaymentError> {
    if request.line_items.is_empty() {
        return Err(PaymentError::InvalidRequest("no line items".to_string()));
    }

    let mut form = vec![
        ("mode".to_string(), "payment".to_string()),
        ("submit_type".to_string(), "pay".to_string()),
        ("payment_method_types[0]".to_string(), "card".to_string()),
        ("customer_email".to_string(), request.customer_email.clone()),
        (format!("metadata[{}]", METADATA_USER_ID), request.user_id.to_string()),
        (format!("metadata[{}]", METADATA_ADDRESS_ID), request.address_id.to_string()),
        ("success_url".to_string(), request.success_url.clone()),
        ("cancel_url".to_string(), request.cancel_url.clone()),
    ];

    for (i, item) in request.line_items.iter().enumerate() {
        if item.quantity < 1 {
            return Err(PaymentError::InvalidRequest(format!(
                "line {} has quantity {}",
                i, item.quantity
            )));
        }
        if item.unit_amount < 0 {
            return Err(PaymentError::InvalidRequest(format!(
                "line {} has negative amount",
                i
            )));
        }

        let prefix = format!("line_items[{}]", i);
        form.push((format!("{}[price_data][currency]", prefix), request.currency.clone()));
        form.push((
            format!("{}[price_data][unit_amount]", prefix),
            item.unit_amount.to_string(),
        ));
        form.push((
            format!("{}[price_data][product_data][name]", prefix),
            item.name.clone(),
        ));
        for (j, image) in item.images.iter().enumerate() {
            form.push((
                format!("{}[price_data][product_data][images][{}]", prefix, j),
                image.clone(),
            ));
        }
        form.push((
            format!("{}[price_data][product_data][metadata][{}]", prefix, METADATA_PRODUCT_ID),
            item.product_id.to_string(),
        ));
        form.push((format!("{}[quantity]", prefix), item.quantity.to_string()));
    }

    Ok(form)
}

#[async_trait]
impl PaymentGateway for StripeClient {
    async fn create_checkout_session(
        &self,
        request: &NewCheckoutSession,
    ) -> Result<CheckoutSession, PaymentError> {
        let form = checkout_form(request)?;
        debug!(
            user_id = %request.user_id,
            line_items = request.line_items.len(),
            "Creating Stripe checkout session"
        );

        let response = self
            .http
            .post(self.url("checkout/sessions"))
            .bearer_auth(&self.secret_key)
            .form(&form)
            .send()
            .await?;

        Self::parse(response).await
    }

    async fn retrieve_session(&self, session_id: &str) -> Result<CheckoutSession, PaymentError> {
        let response = self
            .http
            .get(self.url(&format!("checkout/sessions/{}", session_id)))
            .bearer_auth(&self.secret_key)
            .send()
            .await?;

        Self::parse(response).await
    }

    async fn list_line_items(&self, session_id: &str) -> Result<Vec<SessionLineItem>, PaymentError> {
        let mut items = Vec::new();
        let mut starting_after: Option<String> = None;

        loop {
            let mut query = vec![
                ("limit".to_string(), LINE_ITEM_PAGE_SIZE.to_string()),
                ("expand[]".to_string(), "data.price.product".to_string()),
            ];
            if let Some(ref cursor) = starting_after {
                query.push(("starting_after".to_string(), cursor.clone()));
            }

            let response = self
                .http
                .get(self.url(&format!("checkout/sessions/{}/line_items", session_id)))
                .bearer_auth(&self.secret_key)
                .query(&query)
                .send()
                .await?;

            let page: ListPage<SessionLineItem> = Self::parse(response).await?;
            starting_after = page.data.last().map(|item| item.id.clone());
            items.extend(page.data);

            if !page.has_more || starting_after.is_none() {
                break;
            }
        }

        debug!(session_id, count = items.len(), "Fetched session line items");
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payments::CheckoutLineItem;
    use uuid::Uuid;

    fn request(items: Vec<CheckoutLineItem>) -> NewCheckoutSession {
        NewCheckoutSession {
            currency: "inr".to_string(),
            customer_email: "buyer@example.com".to_string(),
            user_id: Uuid::nil(),
            address_id: Uuid::nil(),
            line_items: items,
            success_url: "https://shop.example/success".to_string(),
            cancel_url: "https://shop.example/cancel".to_string(),
        }
    }

    fn lookup<'a>(form: &'a [(String, String)], key: &str) -> Option<&'a str> {
        form.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    #[test]
    fn test_checkout_form_encodes_lines() {
        let product_id = Uuid::new_v4();
        let form = checkout_form(&request(vec![CheckoutLineItem {
            product_id,
            name: "Basmati Rice".to_string(),
            images: vec!["https://img.example/a.png".to_string(), "https://img.example/b.png".to_string()],
            unit_amount: 8500,
            quantity: 2,
        }]))
        .unwrap();

        assert_eq!(lookup(&form, "mode"), Some("payment"));
        assert_eq!(lookup(&form, "metadata[userId]"), Some(Uuid::nil().to_string().as_str()));
        assert_eq!(lookup(&form, "line_items[0][price_data][currency]"), Some("inr"));
        assert_eq!(lookup(&form, "line_items[0][price_data][unit_amount]"), Some("8500"));
        assert_eq!(
            lookup(&form, "line_items[0][price_data][product_data][images][1]"),
            Some("https://img.example/b.png")
        );
        assert_eq!(
            lookup(&form, "line_items[0][price_data][product_data][metadata][productId]"),
            Some(product_id.to_string().as_str())
        );
        assert_eq!(lookup(&form, "line_items[0][quantity]"), Some("2"));
    }

    #[test]
    fn test_checkout_form_rejects_empty_cart() {
        assert!(matches!(
            checkout_form(&request(vec![])),
            Err(PaymentError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_checkout_form_rejects_zero_quantity() {
        let result = checkout_form(&request(vec![CheckoutLineItem {
            product_id: Uuid::new_v4(),
            name: "Milk".to_string(),
            images: vec![],
            unit_amount: 100,
            quantity: 0,
        }]));
        assert!(matches!(result, Err(PaymentError::InvalidRequest(_))));
    }

    #[test]
    fn test_api_base_trailing_slash() {
        let client = StripeClient::new("sk_test", "https://api.stripe.com/");
        assert_eq!(client.url("checkout/sessions"), "https://api.stripe.com/v1/checkout/sessions");
    }
}
