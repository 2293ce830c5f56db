//! Hosted checkout
//!
//! Each processor hosts its own payment page. We only ask for a session
//! URL, attaching the buyer's user id so the webhook can credit them later.

use async_trait::async_trait;
use bluehour_ledger::Processor;
use serde::Serialize;

use crate::catalog::{self, Product};
use crate::error::{PaymentError, Result};

/// Request to create a checkout session
#[derive(Clone, Debug)]
pub struct CheckoutRequest {
    /// Pack being purchased (already resolved against the catalog)
    pub product: &'static Product,

    /// Buyer, echoed back by the processor in the order webhook
    pub user_id: String,

    /// URL to redirect after successful payment
    pub success_url: String,
}

/// Result of creating a checkout session
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSession {
    /// Processor session id
    pub id: String,

    /// URL to redirect the user to
    pub checkout_url: String,

    pub processor: Processor,
}

/// A processor able to create hosted checkout sessions
#[async_trait]
pub trait CheckoutProvider: Send + Sync {
    fn processor(&self) -> Processor;

    async fn create_checkout(&self, request: &CheckoutRequest) -> Result<CheckoutSession>;
}

/// Post-payment landing page
pub fn success_url(app_url: &str) -> String {
    format!("{}/store?success=true", app_url.trim_end_matches('/'))
}

/// Validate the product against the provider's catalog, then create the session.
///
/// Unknown products are rejected before the processor is contacted.
pub async fn initiate(
    provider: &dyn CheckoutProvider,
    product_id: &str,
    user_id: &str,
    app_url: &str,
) -> Result<CheckoutSession> {
    let processor = provider.processor();
    let product = catalog::find(processor, product_id)
        .ok_or_else(|| PaymentError::UnknownProduct(product_id.to_string()))?;

    let session = provider
        .create_checkout(&CheckoutRequest {
            product,
            user_id: user_id.to_string(),
            success_url: success_url(app_url),
        })
        .await?;

    tracing::info!(
        processor = %processor,
        product = product.key,
        user_id = %user_id,
        session_id = %session.id,
        "Created checkout session"
    );

    Ok(session)
}
