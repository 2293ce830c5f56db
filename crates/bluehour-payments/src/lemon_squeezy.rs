//! Lemon Squeezy Integration
//!
//! Hosted checkout through the JSON:API `checkouts` endpoint, and
//! `order_created` webhooks signed with a hex HMAC-SHA256 of the raw body
//! in `X-Signature`.

use async_trait::async_trait;
use bluehour_ledger::Processor;
use hmac::Mac;
use http::HeaderMap;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::checkout::{CheckoutProvider, CheckoutRequest, CheckoutSession};
use crate::error::{PaymentError, Result};
use crate::webhook::{OrderEvent, WebhookAdapter, WebhookEvent, header, hmac_sha256};

const API_BASE: &str = "https://api.lemonsqueezy.com";
const JSON_API: &str = "application/vnd.api+json";
const SIGNATURE_HEADER: &str = "x-signature";

/// Lemon Squeezy checkout client
pub struct LemonSqueezyClient {
    http: reqwest::Client,
    api_key: String,
    store_id: String,
    api_base: String,
}

impl LemonSqueezyClient {
    pub fn new(api_key: &str, store_id: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.to_string(),
            store_id: store_id.to_string(),
            api_base: API_BASE.into(),
        }
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let api_key = lookup("LEMON_SQUEEZY_API_KEY")
            .filter(|k| !k.is_empty())
            .ok_or_else(|| PaymentError::Config("LEMON_SQUEEZY_API_KEY not set".into()))?;
        let store_id = lookup("LEMON_SQUEEZY_STORE_ID")
            .filter(|id| !id.is_empty())
            .ok_or_else(|| PaymentError::Config("LEMON_SQUEEZY_STORE_ID not set".into()))?;

        Ok(Self::new(&api_key, &store_id))
    }

    fn checkout_body(&self, request: &CheckoutRequest) -> Value {
        json!({
            "data": {
                "type": "checkouts",
                "attributes": {
                    "checkout_data": {
                        "custom": { "user_id": request.user_id }
                    },
                    "product_options": {
                        "redirect_url": request.success_url
                    }
                },
                "relationships": {
                    "store": { "data": { "type": "stores", "id": self.store_id } },
                    "variant": { "data": { "type": "variants", "id": request.product.id } }
                }
            }
        })
    }
}

#[derive(Debug, Deserialize)]
struct CheckoutResponse {
    data: CheckoutData,
}

#[derive(Debug, Deserialize)]
struct CheckoutData {
    id: String,
    attributes: CheckoutAttributes,
}

#[derive(Debug, Deserialize)]
struct CheckoutAttributes {
    url: Option<String>,
}

#[async_trait]
impl CheckoutProvider for LemonSqueezyClient {
    fn processor(&self) -> Processor {
        Processor::LemonSqueezy
    }

    async fn create_checkout(&self, request: &CheckoutRequest) -> Result<CheckoutSession> {
        let name = Processor::LemonSqueezy.display_name();

        let response = self
            .http
            .post(format!("{}/v1/checkouts", self.api_base))
            .bearer_auth(&self.api_key)
            .header(reqwest::header::ACCEPT, JSON_API)
            .header(reqwest::header::CONTENT_TYPE, JSON_API)
            .json(&self.checkout_body(request))
            .send()
            .await
            .map_err(|e| PaymentError::api(name, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PaymentError::api(name, format!("{status}: {body}")));
        }

        let body: CheckoutResponse = response
            .json()
            .await
            .map_err(|e| PaymentError::api(name, e.to_string()))?;

        let checkout_url = body
            .data
            .attributes
            .url
            .ok_or_else(|| PaymentError::api(name, "No checkout URL returned"))?;

        Ok(CheckoutSession {
            id: body.data.id,
            checkout_url,
            processor: Processor::LemonSqueezy,
        })
    }
}

/// Lemon Squeezy webhook adapter
pub struct LemonSqueezyWebhook {
    secret: String,
}

impl LemonSqueezyWebhook {
    pub fn new(secret: &str) -> Self {
        Self {
            secret: secret.to_string(),
        }
    }

    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        lookup("LEMON_SQUEEZY_WEBHOOK_SECRET")
            .filter(|s| !s.is_empty())
            .map(|s| Self::new(&s))
            .ok_or_else(|| PaymentError::Config("LEMON_SQUEEZY_WEBHOOK_SECRET not set".into()))
    }

    /// Hex signature for a body (what Lemon Squeezy sends)
    pub fn sign(&self, body: &[u8]) -> Result<String> {
        let mut mac = hmac_sha256(self.secret.as_bytes())?;
        mac.update(body);
        Ok(hex::encode(mac.finalize().into_bytes()))
    }
}

#[derive(Debug, Deserialize)]
struct Payload {
    meta: Meta,
    data: Option<OrderData>,
}

#[derive(Debug, Deserialize)]
struct Meta {
    event_name: String,
    #[serde(default)]
    custom_data: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct OrderData {
    id: Value,
    attributes: OrderAttributes,
}

#[derive(Debug, Deserialize)]
struct OrderAttributes {
    #[serde(default)]
    total: i64,
    #[serde(default)]
    currency: String,
    #[serde(default)]
    status: Option<String>,
    first_order_item: Option<FirstOrderItem>,
}

#[derive(Debug, Deserialize)]
struct FirstOrderItem {
    variant_id: Value,
}

/// String or number JSON value as a string
pub(crate) fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

impl WebhookAdapter for LemonSqueezyWebhook {
    fn processor(&self) -> Processor {
        Processor::LemonSqueezy
    }

    fn verify(&self, headers: &HeaderMap, body: &[u8]) -> Result<()> {
        let supplied = header(headers, SIGNATURE_HEADER)?;
        let supplied = hex::decode(supplied.trim())
            .map_err(|_| PaymentError::WebhookSignature("signature is not hex".into()))?;

        let mut mac = hmac_sha256(self.secret.as_bytes())?;
        mac.update(body);
        mac.verify_slice(&supplied)
            .map_err(|_| PaymentError::WebhookSignature("signature mismatch".into()))
    }

    fn parse(&self, body: &[u8]) -> Result<WebhookEvent> {
        let payload: Payload =
            serde_json::from_slice(body).map_err(|e| PaymentError::WebhookParse(e.to_string()))?;

        if payload.meta.event_name != "order_created" {
            return Ok(WebhookEvent::Ignored {
                event_type: payload.meta.event_name,
            });
        }

        let data = payload
            .data
            .ok_or_else(|| PaymentError::WebhookParse("order_created without data".into()))?;

        let order_id = id_string(&data.id)
            .ok_or_else(|| PaymentError::WebhookParse("order id missing".into()))?;

        let product_id = data
            .attributes
            .first_order_item
            .as_ref()
            .and_then(|item| id_string(&item.variant_id))
            .ok_or_else(|| PaymentError::WebhookParse("first_order_item.variant_id missing".into()))?;

        let user_id = payload
            .meta
            .custom_data
            .as_ref()
            .and_then(|custom| custom.get("user_id"))
            .and_then(id_string);

        Ok(WebhookEvent::OrderCreated(OrderEvent {
            order_id,
            user_id,
            product_id,
            amount: data.attributes.total,
            currency: data.attributes.currency,
            status: data.attributes.status.unwrap_or_else(|| "paid".into()),
        }))
    }
}
