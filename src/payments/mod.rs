//! Payment gateway clients.
//!
//! Settling a bill runs through the gateway first: create an intent for
//! the amount, confirm it, then hand the bill to the ledger. Only the
//! mock client exists today; it mirrors the shapes the Stripe API
//! reports without talking to anyone.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tracing::info;
use uuid::Uuid;

use crate::ledger::domain::money::Money;

pub type DynPaymentGateway = Arc<dyn PaymentGateway>;

/// A freshly created payment intent.
#[derive(Clone, Debug)]
pub struct PaymentIntent {
    pub id: String,
    pub client_secret: String,
    pub amount: Money,
    pub currency: String,
    pub status: String,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Open an intent to collect `amount` for a bill.
    async fn create_bill_payment_intent(
        &self,
        amount: Money,
        description: &str,
    ) -> Result<PaymentIntent>;

    /// Confirm a previously created intent, returning its new status.
    async fn confirm_payment(&self, client_secret: &str) -> Result<String>;
}

/// Gateway that accepts every payment without charging anyone.
pub struct MockStripeGateway;

#[async_trait]
impl PaymentGateway for MockStripeGateway {
    async fn create_bill_payment_intent(
        &self,
        amount: Money,
        description: &str,
    ) -> Result<PaymentIntent> {
        let intent = PaymentIntent {
            id: format!("pi_{}", Uuid::new_v4().simple()),
            client_secret: format!("demo_secret_{}", Uuid::new_v4().simple()),
            amount,
            currency: "usd".to_owned(),
            status: "requires_payment_method".to_owned(),
        };

        info!(
            intent = %intent.id,
            amount = %amount,
            description = %description,
            "Created payment intent."
        );

        Ok(intent)
    }

    async fn confirm_payment(&self, client_secret: &str) -> Result<String> {
        info!(client_secret = %client_secret, "Confirmed payment.");

        Ok("succeeded".to_owned())
    }
}
