//! Polar Integration
//!
//! Hosted checkout through `POST /v1/checkouts/`, and `order.created`
//! webhooks signed with the Standard Webhooks scheme:
//!
//! ```text
//! webhook-id:        msg_2Lf...
//! webhook-timestamp: 1718000000
//! webhook-signature: v1,<base64 HMAC-SHA256("{id}.{timestamp}.{body}")>
//! ```

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use bluehour_ledger::Processor;
use chrono::Utc;
use hmac::Mac;
use http::HeaderMap;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::checkout::{CheckoutProvider, CheckoutRequest, CheckoutSession};
use crate::error::{PaymentError, Result};
use crate::lemon_squeezy::id_string;
use crate::webhook::{OrderEvent, WebhookAdapter, WebhookEvent, header, hmac_sha256};

/// Accepted clock skew for `webhook-timestamp`, in seconds
const TIMESTAMP_TOLERANCE_SECS: u64 = 5 * 60;

/// Polar API environment
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PolarServer {
    #[default]
    Sandbox,
    Production,
}

impl PolarServer {
    pub const fn api_base(self) -> &'static str {
        match self {
            Self::Sandbox => "https://sandbox-api.polar.sh",
            Self::Production => "https://api.polar.sh",
        }
    }

    pub fn parse(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("production") {
            Self::Production
        } else {
            Self::Sandbox
        }
    }
}

/// Polar checkout client
pub struct PolarClient {
    http: reqwest::Client,
    access_token: String,
    server: PolarServer,
}

impl PolarClient {
    pub fn new(access_token: &str, server: PolarServer) -> Self {
        Self {
            http: reqwest::Client::new(),
            access_token: access_token.to_string(),
            server,
        }
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let access_token = lookup("POLAR_ACCESS_TOKEN")
            .filter(|t| !t.is_empty())
            .ok_or_else(|| PaymentError::Config("POLAR_ACCESS_TOKEN not set".into()))?;
        let server = lookup("POLAR_SERVER").map(|s| PolarServer::parse(&s)).unwrap_or_default();

        Ok(Self::new(&access_token, server))
    }

    pub const fn server(&self) -> PolarServer {
        self.server
    }

    fn checkout_body(request: &CheckoutRequest) -> Value {
        json!({
            "products": [request.product.id],
            "success_url": request.success_url,
            "external_customer_id": request.user_id,
            "metadata": { "userId": request.user_id },
        })
    }
}

#[derive(Debug, Deserialize)]
struct CheckoutResponse {
    id: String,
    url: Option<String>,
}

#[async_trait]
impl CheckoutProvider for PolarClient {
    fn processor(&self) -> Processor {
        Processor::Polar
    }

    async fn create_checkout(&self, request: &CheckoutRequest) -> Result<CheckoutSession> {
        let name = Processor::Polar.display_name();

        let response = self
            .http
            .post(format!("{}/v1/checkouts/", self.server.api_base()))
            .bearer_auth(&self.access_token)
            .json(&Self::checkout_body(request))
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

        let checkout_url = body.url.ok_or_else(|| {
            tracing::error!("Polar checkout returned no URL");
            PaymentError::api(name, "No checkout URL returned")
        })?;

        Ok(CheckoutSession {
            id: body.id,
            checkout_url,
            processor: Processor::Polar,
        })
    }
}

/// Polar webhook adapter
pub struct PolarWebhook {
    key: Vec<u8>,
}

impl PolarWebhook {
    /// Secrets with a `whsec_` prefix are base64; any other secret is used
    /// as raw bytes, as Polar's SDK does.
    pub fn new(secret: &str) -> Result<Self> {
        let key = match secret.strip_prefix("whsec_") {
            Some(encoded) => BASE64
                .decode(encoded)
                .map_err(|e| PaymentError::Config(format!("POLAR_WEBHOOK_SECRET: {e}")))?,
            None => secret.as_bytes().to_vec(),
        };

        Ok(Self { key })
    }

    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let secret = lookup("POLAR_WEBHOOK_SECRET")
            .filter(|s| !s.is_empty())
            .ok_or_else(|| PaymentError::Config("POLAR_WEBHOOK_SECRET not set".into()))?;
        Self::new(&secret)
    }

    fn mac(&self, msg_id: &str, timestamp: &str, body: &[u8]) -> Result<crate::webhook::HmacSha256> {
        let mut mac = hmac_sha256(&self.key)?;
        mac.update(msg_id.as_bytes());
        mac.update(b".");
        mac.update(timestamp.as_bytes());
        mac.update(b".");
        mac.update(body);
        Ok(mac)
    }

    /// `v1,<base64>` signature for a delivery (what Polar sends)
    pub fn sign(&self, msg_id: &str, timestamp: i64, body: &[u8]) -> Result<String> {
        let mac = self.mac(msg_id, &timestamp.to_string(), body)?;
        Ok(format!("v1,{}", BASE64.encode(mac.finalize().into_bytes())))
    }

    /// Verify against an explicit clock
    pub fn verify_at(&self, headers: &HeaderMap, body: &[u8], now: i64) -> Result<()> {
        let msg_id = header(headers, "webhook-id")?;
        let timestamp = header(headers, "webhook-timestamp")?;
        let signatures = header(headers, "webhook-signature")?;

        let sent_at: i64 = timestamp
            .trim()
            .parse()
            .map_err(|_| PaymentError::WebhookSignature("invalid webhook-timestamp".into()))?;
        let skew = now.checked_sub(sent_at).map(i64::unsigned_abs);
        if skew.is_none_or(|skew| skew > TIMESTAMP_TOLERANCE_SECS) {
            return Err(PaymentError::WebhookSignature(
                "webhook-timestamp outside tolerance".into(),
            ));
        }

        let mac = self.mac(msg_id, timestamp.trim(), body)?;

        let matched = signatures
            .split_whitespace()
            .filter_map(|entry| entry.strip_prefix("v1,"))
            .filter_map(|encoded| BASE64.decode(encoded).ok())
            .any(|candidate| mac.clone().verify_slice(&candidate).is_ok());

        if matched {
            Ok(())
        } else {
            Err(PaymentError::WebhookSignature("signature mismatch".into()))
        }
    }
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    data: Value,
}

/// Buyer id locations, most specific first
const USER_ID_POINTERS: &[&str] = &[
    "/customer/external_id",
    "/customer_external_id",
    "/metadata/userId",
    "/metadata/user_id",
    "/custom_field_data/userId",
];

fn buyer_id(order: &Value) -> Option<String> {
    USER_ID_POINTERS
        .iter()
        .find_map(|pointer| order.pointer(pointer).and_then(id_string))
}

impl WebhookAdapter for PolarWebhook {
    fn processor(&self) -> Processor {
        Processor::Polar
    }

    fn verify(&self, headers: &HeaderMap, body: &[u8]) -> Result<()> {
        self.verify_at(headers, body, Utc::now().timestamp())
    }

    fn parse(&self, body: &[u8]) -> Result<WebhookEvent> {
        let envelope: Envelope =
            serde_json::from_slice(body).map_err(|e| PaymentError::WebhookParse(e.to_string()))?;

        if envelope.event_type != "order.created" {
            return Ok(WebhookEvent::Ignored {
                event_type: envelope.event_type,
            });
        }

        let order = &envelope.data;
        let order_id = order
            .get("id")
            .and_then(id_string)
            .ok_or_else(|| PaymentError::WebhookParse("order id missing".into()))?;
        let product_id = order
            .get("product_id")
            .and_then(id_string)
            .ok_or_else(|| PaymentError::WebhookParse("product_id missing".into()))?;

        let amount = order
            .get("total_amount")
            .or_else(|| order.get("amount"))
            .and_then(Value::as_i64)
            .unwrap_or_default();
        let currency = order
            .get("currency")
            .and_then(Value::as_str)
            .unwrap_or("usd")
            .to_uppercase();
        let status = order
            .get("status")
            .and_then(Value::as_str)
            .unwrap_or("paid")
            .to_string();

        Ok(WebhookEvent::OrderCreated(OrderEvent {
            order_id,
            user_id: buyer_id(order),
            product_id,
            amount,
            currency,
            status,
        }))
    }
}
