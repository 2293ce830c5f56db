//! Payment Webhook Handling
//!
//! Verifies signed order notifications and credits the ledger. Processor
//! differences (signature scheme, where the buyer id lives) are confined
//! to `WebhookAdapter` implementations.

use std::sync::Arc;

use bluehour_ledger::{LedgerStore, NewOrder, OrderOutcome, Processor};
use hmac::{Hmac, Mac};
use http::HeaderMap;
use sha2::Sha256;

use crate::catalog;
use crate::error::{PaymentError, Result};

pub(crate) type HmacSha256 = Hmac<Sha256>;

pub(crate) fn hmac_sha256(key: &[u8]) -> Result<HmacSha256> {
    HmacSha256::new_from_slice(key)
        .map_err(|e| PaymentError::Config(format!("invalid webhook secret: {e}")))
}

pub(crate) fn header<'a>(headers: &'a HeaderMap, name: &str) -> Result<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| PaymentError::WebhookSignature(format!("missing {name} header")))
}

/// An order reported by a processor
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderEvent {
    pub order_id: String,

    /// Buyer id recovered from checkout metadata; `None` if the processor
    /// did not echo it back
    pub user_id: Option<String>,

    /// Product id (Polar) or variant id (Lemon Squeezy)
    pub product_id: String,

    /// Amount in minor units
    pub amount: i64,

    pub currency: String,
    pub status: String,
}

/// Parsed webhook event
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WebhookEvent {
    /// A new order was placed
    OrderCreated(OrderEvent),

    /// Any other event type
    Ignored { event_type: String },
}

/// Processor-specific signature scheme and payload shape
pub trait WebhookAdapter: Send + Sync {
    fn processor(&self) -> Processor;

    /// Check the signature over the raw body
    fn verify(&self, headers: &HeaderMap, body: &[u8]) -> Result<()>;

    /// Decode a verified body
    fn parse(&self, body: &[u8]) -> Result<WebhookEvent>;
}

/// What a webhook delivery did
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// Order stored and credits added
    Credited {
        order_id: String,
        user_id: String,
        credits_added: i32,
        balance: i32,
    },

    /// Retry of an order we already credited
    AlreadyProcessed { order_id: String },

    /// Order carried no buyer id; payment captured but nothing credited
    MissingUser { order_id: String },

    /// Not an order event
    Ignored { event_type: String },
}

/// Webhook handler
pub struct WebhookHandler<S: LedgerStore + ?Sized> {
    ledger: Arc<S>,
}

impl<S: LedgerStore + ?Sized> WebhookHandler<S> {
    pub const fn new(ledger: Arc<S>) -> Self {
        Self { ledger }
    }

    /// Verify signature and parse event
    ///
    /// Nothing in the body is interpreted before the signature checks out.
    pub fn parse_event(
        &self,
        adapter: &dyn WebhookAdapter,
        headers: &HeaderMap,
        body: &[u8],
    ) -> Result<WebhookEvent> {
        adapter.verify(headers, body)?;
        adapter.parse(body)
    }

    /// Apply a verified event
    pub async fn handle(&self, processor: Processor, event: WebhookEvent) -> Result<WebhookOutcome> {
        let order = match event {
            WebhookEvent::OrderCreated(order) => order,
            WebhookEvent::Ignored { event_type } => {
                tracing::debug!(processor = %processor, event_type = %event_type, "Ignoring webhook event");
                return Ok(WebhookOutcome::Ignored { event_type });
            }
        };

        tracing::info!(processor = %processor, order_id = %order.order_id, "Processing order webhook");

        let Some(user_id) = order.user_id else {
            tracing::error!(
                processor = %processor,
                order_id = %order.order_id,
                "Order has no user id in checkout metadata; cannot assign credits"
            );
            return Ok(WebhookOutcome::MissingUser {
                order_id: order.order_id,
            });
        };

        let product = catalog::find(processor, &order.product_id).ok_or_else(|| {
            tracing::error!(processor = %processor, product_id = %order.product_id, "Unknown product in order");
            PaymentError::UnknownProduct(order.product_id.clone())
        })?;

        let new_order = NewOrder {
            processor,
            order_id: order.order_id,
            user_id,
            product_id: order.product_id,
            credits_added: product.credits,
            amount: order.amount,
            currency: order.currency.to_uppercase(),
            status: order.status,
        };

        match self.ledger.record_order_and_credit(&new_order).await? {
            OrderOutcome::Credited { balance } => {
                tracing::info!(
                    processor = %processor,
                    order_id = %new_order.order_id,
                    user_id = %new_order.user_id,
                    credits = new_order.credits_added,
                    balance,
                    "Added credits"
                );
                Ok(WebhookOutcome::Credited {
                    order_id: new_order.order_id,
                    user_id: new_order.user_id,
                    credits_added: new_order.credits_added,
                    balance,
                })
            }
            OrderOutcome::AlreadyProcessed => {
                tracing::info!(processor = %processor, order_id = %new_order.order_id, "Order already processed");
                Ok(WebhookOutcome::AlreadyProcessed {
                    order_id: new_order.order_id,
                })
            }
        }
    }
}
