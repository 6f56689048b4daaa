/// In-memory payment gateway
///
/// Records created sessions and serves them back, so the order flow can be
/// exercised without network access. Tests mark sessions paid with
/// [`MockGateway::mark_paid`].

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

use super::{
    CheckoutSession, GatewayProduct, LineItemPrice, NewCheckoutSession, PaymentError,
    PaymentGateway, ProductRef, SessionLineItem, METADATA_ADDRESS_ID, METADATA_PRODUCT_ID,
    METADATA_USER_ID,
};

#[derive(Debug, Clone)]
struct StoredSession {
    session: CheckoutSession,
    line_items: Vec<SessionLineItem>,
}

/// Payment gateway that keeps sessions in memory
#[derive(Debug, Default)]
pub struct MockGateway {
    sessions: Mutex<HashMap<String, StoredSession>>,
}

impl MockGateway {
    /// Creates an empty gateway
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a session as paid and assigns it a payment intent ID
    ///
    /// Returns the updated session, or `None` if unknown.
    pub fn mark_paid(&self, session_id: &str) -> Option<CheckoutSession> {
        let mut sessions = self.sessions.lock().ok()?;
        let stored = sessions.get_mut(session_id)?;
        stored.session.payment_status = "paid".to_string();
        stored.session.payment_intent = Some(format!("pi_mock_{}", Uuid::new_v4().simple()));
        Some(stored.session.clone())
    }

    /// Number of sessions created so far
    pub fn session_count(&self) -> usize {
        self.sessions.lock().map(|s| s.len()).unwrap_or(0)
    }

    fn lookup(&self, session_id: &str) -> Result<StoredSession, PaymentError> {
        self.sessions
            .lock()
            .map_err(|_| PaymentError::InvalidResponse("mock gateway poisoned".to_string()))?
            .get(session_id)
            .cloned()
            .ok_or_else(|| PaymentError::Api {
                status: 404,
                message: format!("No such checkout.session: '{}'", session_id),
            })
    }
}

#[async_trait]
impl PaymentGateway for MockGateway {
    async fn create_checkout_session(
        &self,
        request: &NewCheckoutSession,
    ) -> Result<CheckoutSession, PaymentError> {
        if request.line_items.is_empty() {
            return Err(PaymentError::InvalidRequest("no line items".to_string()));
        }

        let id = format!("cs_mock_{}", Uuid::new_v4().simple());

        let line_items: Vec<SessionLineItem> = request
            .line_items
            .iter()
            .enumerate()
            .map(|(i, item)| SessionLineItem {
                id: format!("li_mock_{}", i),
                description: Some(item.name.clone()),
                quantity: Some(item.quantity),
                amount_total: item.unit_amount * item.quantity,
                amount_subtotal: Some(item.unit_amount * item.quantity),
                price: Some(LineItemPrice {
                    id: format!("price_mock_{}", i),
                    unit_amount: Some(item.unit_amount),
                    product: ProductRef::Expanded(GatewayProduct {
                        id: format!("prod_mock_{}", i),
                        name: item.name.clone(),
                        images: item.images.clone(),
                        metadata: HashMap::from([(
                            METADATA_PRODUCT_ID.to_string(),
                            item.product_id.to_string(),
                        )]),
                    }),
                }),
            })
            .collect();

        let session = CheckoutSession {
            id: id.clone(),
            url: Some(format!("https://checkout.mock/pay/{}", id)),
            payment_intent: None,
            payment_status: "unpaid".to_string(),
            customer_email: Some(request.customer_email.clone()),
            metadata: HashMap::from([
                (METADATA_USER_ID.to_string(), request.user_id.to_string()),
                (METADATA_ADDRESS_ID.to_string(), request.address_id.to_string()),
            ]),
            amount_total: Some(line_items.iter().map(|l| l.amount_total).sum()),
        };

        self.sessions
            .lock()
            .map_err(|_| PaymentError::InvalidResponse("mock gateway poisoned".to_string()))?
            .insert(
                id,
                StoredSession {
                    session: session.clone(),
                    line_items,
                },
            );

        Ok(session)
    }

    async fn retrieve_session(&self, session_id: &str) -> Result<CheckoutSession, PaymentError> {
        Ok(self.lookup(session_id)?.session)
    }

    async fn list_line_items(&self, session_id: &str) -> Result<Vec<SessionLineItem>, PaymentError> {
        Ok(self.lookup(session_id)?.line_items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payments::CheckoutLineItem;

    #[tokio::test]
    async fn test_mock_session_lifecycle() {
        let gateway = MockGateway::new();
        let user_id = Uuid::new_v4();
        let product_id = Uuid::new_v4();

        let session = gateway
            .create_checkout_session(&NewCheckoutSession {
                currency: "inr".to_string(),
                customer_email: "buyer@example.com".to_string(),
                user_id,
                address_id: Uuid::new_v4(),
                line_items: vec![CheckoutLineItem {
                    product_id,
                    name: "Paneer".to_string(),
                    images: vec![],
                    unit_amount: 9000,
                    quantity: 3,
                }],
                success_url: "https://shop.example/success".to_string(),
                cancel_url: "https://shop.example/cancel".to_string(),
            })
            .await
            .unwrap();

        assert!(!session.is_paid());
        assert_eq!(session.user_id(), Some(user_id));
        assert_eq!(session.amount_total, Some(27000));
        assert_eq!(gateway.session_count(), 1);

        let paid = gateway.mark_paid(&session.id).unwrap();
        assert!(paid.is_paid());
        assert!(paid.payment_intent.is_some());

        let items = gateway.list_line_items(&session.id).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].product_id(), Some(product_id));
        assert_eq!(items[0].amount_total, 27000);
    }

    #[tokio::test]
    async fn test_unknown_session() {
        let gateway = MockGateway::new();
        assert!(matches!(
            gateway.retrieve_session("cs_missing").await,
            Err(PaymentError::Api { status: 404, .. })
        ));
    }
}
