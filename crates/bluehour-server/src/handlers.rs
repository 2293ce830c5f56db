//! HTTP Handlers

use std::convert::Infallible;
use std::net::SocketAddr;

use axum::{
    Json,
    body::Bytes,
    extract::{ConnectInfo, FromRequestParts, Path, Query, State},
    http::{HeaderMap, StatusCode, header, request::Parts},
    response::{IntoResponse, Response},
};
use bluehour_core::Language;
use bluehour_payments::{
    CheckoutProvider, PaymentError, Processor, Product, WebhookHandler, WebhookOutcome, catalog, checkout,
};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::state::AppState;
use crate::story::StoryRequest;

// ============================================================================
// Extractors
// ============================================================================

/// Client address: first `X-Forwarded-For` entry, then `X-Real-IP`, then
/// the socket peer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIp(pub Option<String>);

impl ClientIp {
    fn resolve(headers: &HeaderMap, peer: Option<SocketAddr>) -> Option<String> {
        let header_value = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.split(',').next())
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        header_value("x-forwarded-for")
            .or_else(|| header_value("x-real-ip"))
            .or_else(|| peer.map(|addr| addr.ip().to_string()))
    }
}

impl<S: Send + Sync> FromRequestParts<S> for ClientIp {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);
        Ok(Self(Self::resolve(&parts.headers, peer)))
    }
}

// ============================================================================
// Request / Response Types
// ============================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub ledger: &'static str,
    pub generation_configured: bool,
    pub database_configured: bool,
    pub polar_configured: bool,
    pub lemon_squeezy_configured: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateStoryRequest {
    pub genre: Option<String>,
    pub personality: Option<String>,
    pub concept: Option<String>,
    pub user_id: Option<String>,
    pub language: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateStoryResponse {
    pub success: bool,
    pub story: String,
    pub used_count: i32,
    pub limit: i32,
    pub credits: i32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditsQuery {
    pub user_id: Option<String>,
}

#[derive(Debug, Default, Serialize)]
pub struct CreditsResponse {
    pub credits: i32,
    pub count: i32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub product_id: Option<String>,
    pub user_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
    pub checkout_url: String,
    pub session_id: String,
}

#[derive(Debug, Serialize)]
pub struct ProductsResponse {
    pub processor: Processor,
    pub products: &'static [Product],
}

#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    pub success: bool,
    pub status: &'static str,
}

const NO_CACHE: [(header::HeaderName, &str); 3] = [
    (header::CACHE_CONTROL, "no-store, max-age=0, must-revalidate"),
    (header::PRAGMA, "no-cache"),
    (header::EXPIRES, "0"),
];

fn parse_processor(name: &str) -> Result<Processor, ApiError> {
    Processor::parse(name).ok_or_else(|| ApiError::unknown_processor(name))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        ledger: state.ledger.backend(),
        generation_configured: state.story.generation_configured().await,
        database_configured: state.database_configured,
        polar_configured: state.payments.is_enabled(Processor::Polar),
        lemon_squeezy_configured: state.payments.is_enabled(Processor::LemonSqueezy),
    })
}

/// Generate a story, charging the free tier or credits
pub async fn generate_story(
    State(state): State<AppState>,
    ClientIp(client_ip): ClientIp,
    Json(payload): Json<GenerateStoryRequest>,
) -> Result<Json<GenerateStoryResponse>, ApiError> {
    let language = payload
        .language
        .as_deref()
        .map(Language::parse)
        .unwrap_or_default();

    let request = StoryRequest {
        user_id: payload.user_id,
        genre: payload.genre,
        personality: payload.personality,
        concept: payload.concept,
        language,
        client_ip,
    };

    let outcome = state
        .story
        .generate(request)
        .await
        .map_err(|e| ApiError::from_story(&e, language))?;

    Ok(Json(GenerateStoryResponse {
        success: true,
        story: outcome.story,
        used_count: outcome.used_count,
        limit: outcome.limit,
        credits: outcome.credits,
    }))
}

/// Current balance and free-tier usage; never cached
pub async fn user_credits(
    State(state): State<AppState>,
    Query(query): Query<CreditsQuery>,
) -> Response {
    let Some(user_id) = non_empty(query.user_id) else {
        return (StatusCode::BAD_REQUEST, NO_CACHE, Json(CreditsResponse::default())).into_response();
    };

    match state.ledger.usage(&user_id).await {
        Ok(usage) => {
            let body = usage.map_or_else(CreditsResponse::default, |u| CreditsResponse {
                credits: u.credits,
                count: u.free_count,
            });
            (StatusCode::OK, NO_CACHE, Json(body)).into_response()
        }
        Err(e) => {
            tracing::error!(user_id = %user_id, error = %e, "Failed to read credits");
            (StatusCode::INTERNAL_SERVER_ERROR, NO_CACHE, Json(CreditsResponse::default())).into_response()
        }
    }
}

/// Create a checkout session with the default processor (Polar)
pub async fn create_checkout(
    State(state): State<AppState>,
    Json(payload): Json<CheckoutRequest>,
) -> Result<Json<CheckoutResponse>, ApiError> {
    checkout_with(&state, Processor::Polar, payload).await
}

/// Create a checkout session with a named processor
pub async fn create_processor_checkout(
    State(state): State<AppState>,
    Path(processor): Path<String>,
    Json(payload): Json<CheckoutRequest>,
) -> Result<Json<CheckoutResponse>, ApiError> {
    let processor = parse_processor(&processor)?;
    checkout_with(&state, processor, payload).await
}

async fn checkout_with(
    state: &AppState,
    processor: Processor,
    payload: CheckoutRequest,
) -> Result<Json<CheckoutResponse>, ApiError> {
    let (Some(product_id), Some(user_id)) = (non_empty(payload.product_id), non_empty(payload.user_id)) else {
        return Err(ApiError::missing_fields("productId and userId are required"));
    };
    if catalog::find(processor, &product_id).is_none() {
        tracing::warn!(processor = %processor, product_id = %product_id, "Checkout for unknown product");
        return Err(PaymentError::UnknownProduct(product_id).into());
    }

    let provider: &dyn CheckoutProvider = state
        .payments
        .checkout(processor)
        .ok_or_else(|| ApiError::payments_disabled(processor))?;

    let session = checkout::initiate(provider, &product_id, &user_id, &state.app_url)
        .await
        .map_err(|e| {
            tracing::error!(processor = %processor, product_id = %product_id, error = %e, "Checkout error");
            ApiError::from(e)
        })?;

    Ok(Json(CheckoutResponse {
        checkout_url: session.checkout_url,
        session_id: session.id,
    }))
}

/// Credit packs sold through a processor
pub async fn list_products(Path(processor): Path<String>) -> Result<Json<ProductsResponse>, ApiError> {
    let processor = parse_processor(&processor)?;
    Ok(Json(ProductsResponse {
        processor,
        products: catalog::catalog(processor),
    }))
}

/// Signed order notification from a processor
pub async fn payment_webhook(
    State(state): State<AppState>,
    Path(processor): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookResponse>, ApiError> {
    let processor = parse_processor(&processor)?;
    let adapter = state
        .payments
        .webhook(processor)
        .ok_or_else(|| ApiError::payments_disabled(processor))?;

    let handler = WebhookHandler::new(state.ledger.clone());

    let event = handler.parse_event(adapter, &headers, &body).map_err(|e| {
        if matches!(e, PaymentError::WebhookParse(_)) {
            tracing::error!(processor = %processor, error = %e, "Verified webhook payload unreadable");
        } else {
            tracing::warn!(processor = %processor, error = %e, "Webhook rejected");
        }
        ApiError::from(e)
    })?;

    let outcome = handler.handle(processor, event).await.map_err(|e| {
        tracing::error!(
            processor = %processor,
            retryable = e.is_retryable(),
            error = %e,
            "Webhook processing error"
        );
        ApiError::from(e)
    })?;

    let status = match outcome {
        WebhookOutcome::Credited { .. } => "credited",
        WebhookOutcome::AlreadyProcessed { .. } => "already_processed",
        WebhookOutcome::MissingUser { .. } => "missing_user",
        WebhookOutcome::Ignored { .. } => "ignored",
    };

    Ok(Json(WebhookResponse { success: true, status }))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::Router;
    use axum::body::Body;
    use axum::http::Request;
    use bluehour_ledger::{LedgerStore, MemoryLedgerStore, QuotaPolicy, UsageRecord};
    use bluehour_payments::{LemonSqueezyWebhook, PolarWebhook};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::*;
    use crate::state::Payments;
    use crate::story::{StoryConfig, StoryService};
    use crate::testing::{FailingLedger, RecordingCheckout, ScriptedProvider};

    const POLAR_SECRET: &str = "polar_whs_secret";
    const LEMON_SECRET: &str = "lemon_secret";
    const STARTER: &str = "47f3c180-bb8d-4f57-bbca-2994a19a33c2";

    struct Harness {
        app: Router,
        ledger: Arc<MemoryLedgerStore>,
        provider: Arc<ScriptedProvider>,
        checkout: Arc<RecordingCheckout>,
    }

    fn harness() -> Harness {
        let ledger = Arc::new(MemoryLedgerStore::new());
        let provider = Arc::new(ScriptedProvider::new("The Blue Hour\n\nIt began at dusk."));
        let checkout = Arc::new(RecordingCheckout::new(Processor::Polar));

        Harness {
            app: app(ledger.clone(), provider.clone(), checkout.clone()),
            ledger,
            provider,
            checkout,
        }
    }

    fn app(ledger: Arc<dyn LedgerStore>, provider: Arc<ScriptedProvider>, checkout: Arc<RecordingCheckout>) -> Router {
        let payments = Payments::new()
            .with_checkout(checkout)
            .with_webhook(Arc::new(PolarWebhook::new(POLAR_SECRET).unwrap()))
            .with_webhook(Arc::new(LemonSqueezyWebhook::new(LEMON_SECRET)));

        let story = StoryService::new(
            provider,
            ledger.clone(),
            StoryConfig {
                quota: QuotaPolicy::default(),
                ..StoryConfig::default()
            },
        );

        crate::router(AppState {
            story: Arc::new(story),
            ledger,
            payments: Arc::new(payments),
            app_url: "https://bluehour.test".into(),
            database_configured: false,
        })
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, HeaderMap, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, headers, body)
    }

    fn post_json(uri: &str, body: &Value) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn story_request(user_id: &str, ip: &str) -> Request<Body> {
        let body = json!({
            "genre": "romance",
            "personality": "cold but caring",
            "concept": "rival chefs",
            "userId": user_id,
            "language": "en",
        });
        Request::post("/generate-story")
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-forwarded-for", ip)
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn polar_order(order_id: &str, user_id: &str, product_id: &str) -> String {
        json!({
            "type": "order.created",
            "data": {
                "id": order_id,
                "product_id": product_id,
                "total_amount": 249,
                "currency": "usd",
                "status": "paid",
                "metadata": { "userId": user_id },
            }
        })
        .to_string()
    }

    fn polar_webhook(body: &str, signature: Option<&str>) -> Request<Body> {
        let timestamp = chrono::Utc::now().timestamp();
        let webhook = PolarWebhook::new(POLAR_SECRET).unwrap();
        let signed = webhook.sign("msg_1", timestamp, body.as_bytes()).unwrap();

        Request::post("/webhook/polar")
            .header("webhook-id", "msg_1")
            .header("webhook-timestamp", timestamp.to_string())
            .header("webhook-signature", signature.unwrap_or(&signed))
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn credits(app: &Router, user_id: &str) -> Value {
        let request = Request::get(format!("/user/credits?userId={user_id}"))
            .body(Body::empty())
            .unwrap();
        send(app, request).await.2
    }

    #[test]
    fn test_client_ip_resolution() {
        let peer: SocketAddr = "192.0.2.7:5000".parse().unwrap();
        let mut headers = HeaderMap::new();
        assert_eq!(ClientIp::resolve(&headers, Some(peer)).as_deref(), Some("192.0.2.7"));
        assert_eq!(ClientIp::resolve(&headers, None), None);

        headers.insert("x-real-ip", "198.51.100.2".parse().unwrap());
        assert_eq!(ClientIp::resolve(&headers, Some(peer)).as_deref(), Some("198.51.100.2"));

        headers.insert("x-forwarded-for", "203.0.113.9, 10.0.0.1".parse().unwrap());
        assert_eq!(ClientIp::resolve(&headers, Some(peer)).as_deref(), Some("203.0.113.9"));
    }

    #[tokio::test]
    async fn test_health() {
        let h = harness();
        let (status, _, body) = send(&h.app, Request::get("/health").body(Body::empty()).unwrap()).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["ledger"], "memory");
        assert_eq!(body["generationConfigured"], true);
        assert_eq!(body["databaseConfigured"], false);
        assert_eq!(body["polarConfigured"], true);
        assert_eq!(body["lemonSqueezyConfigured"], false);
    }

    #[tokio::test]
    async fn test_new_user_gets_free_story() {
        let h = harness();
        let (status, _, body) = send(&h.app, story_request("reader-1", "203.0.113.1")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert!(!body["story"].as_str().unwrap().is_empty());
        assert_eq!(body["usedCount"], 1);
        assert_eq!(body["limit"], 1);
        assert_eq!(body["credits"], 0);

        let usage = h.ledger.usage("reader-1").await.unwrap().unwrap();
        assert_eq!(usage.last_ip.as_deref(), Some("203.0.113.1"));
    }

    #[tokio::test]
    async fn test_second_story_needs_credits() {
        let h = harness();
        send(&h.app, story_request("reader-1", "203.0.113.1")).await;
        let before = h.ledger.usage("reader-1").await.unwrap().unwrap();

        let (status, _, body) = send(&h.app, story_request("reader-1", "203.0.113.1")).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "NO_CREDITS");
        assert_eq!(body["usedCount"], 1);
        assert_eq!(body["credits"], 0);
        assert_eq!(h.provider.calls(), 1);
        assert_eq!(h.ledger.usage("reader-1").await.unwrap().unwrap(), before);
    }

    #[tokio::test]
    async fn test_second_account_on_same_network_blocked() {
        let h = harness();
        send(&h.app, story_request("reader-1", "203.0.113.1, 10.0.0.1")).await;

        let (status, _, body) = send(&h.app, story_request("reader-2", "203.0.113.1")).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "IP_ABUSE");
        assert!(h.ledger.usage("reader-2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_missing_fields_and_user() {
        let h = harness();

        let (status, _, body) = send(
            &h.app,
            post_json("/generate-story", &json!({"genre": "romance", "userId": "reader-1"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "MISSING_FIELDS");

        let (status, _, body) = send(
            &h.app,
            post_json(
                "/generate-story",
                &json!({"genre": "a", "personality": "b", "concept": "c", "userId": ""}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "UNAUTHORIZED");

        assert_eq!(h.provider.calls(), 0);
        assert!(h.ledger.usage("reader-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_starter_purchase_then_paid_story() {
        let h = harness();

        let (status, _, body) = send(&h.app, polar_webhook(&polar_order("ord_1", "reader-9", STARTER), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"success": true, "status": "credited"}));
        assert_eq!(credits(&h.app, "reader-9").await, json!({"credits": 10, "count": 0}));

        // free story first, then credits
        send(&h.app, story_request("reader-9", "203.0.113.5")).await;
        let (status, _, body) = send(&h.app, story_request("reader-9", "203.0.113.5")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["usedCount"], 1);
        assert_eq!(body["credits"], 9);
    }

    #[tokio::test]
    async fn test_replayed_webhook_credits_once() {
        let h = harness();
        let order = polar_order("ord_1", "reader-9", STARTER);

        send(&h.app, polar_webhook(&order, None)).await;
        let (status, _, body) = send(&h.app, polar_webhook(&order, None)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "already_processed");
        assert_eq!(credits(&h.app, "reader-9").await["credits"], 10);
    }

    #[tokio::test]
    async fn test_tampered_webhook_rejected() {
        let h = harness();
        let order = polar_order("ord_1", "reader-9", STARTER);
        let timestamp = chrono::Utc::now().timestamp();
        let signature = PolarWebhook::new(POLAR_SECRET)
            .unwrap()
            .sign("msg_1", timestamp, order.as_bytes())
            .unwrap();

        let tampered = order.replace("reader-9", "reader-0");
        let (status, _, body) = send(&h.app, polar_webhook(&tampered, Some(signature.as_str()))).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "INVALID_SIGNATURE");
        assert!(h.ledger.usage("reader-0").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_webhook_storage_failure_asks_for_retry() {
        let app = app(
            Arc::new(FailingLedger),
            Arc::new(ScriptedProvider::new("story")),
            Arc::new(RecordingCheckout::new(Processor::Polar)),
        );

        let (status, _, body) = send(&app, polar_webhook(&polar_order("ord_1", "reader-9", STARTER), None)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "STORAGE_ERROR");
        assert_eq!(credits(&app, "reader-9").await, json!({"credits": 0, "count": 0}));
    }

    #[tokio::test]
    async fn test_signed_but_malformed_order_asks_for_retry() {
        let h = harness();
        let order = json!({
            "type": "order.created",
            "data": {"id": "ord_3", "metadata": {"userId": "reader-9"}}
        })
        .to_string();

        let (status, _, body) = send(&h.app, polar_webhook(&order, None)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "INVALID_PAYLOAD");
        assert!(h.ledger.usage("reader-9").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_lemon_squeezy_webhook_under_api_prefix() {
        let h = harness();
        let order = json!({
            "meta": {"event_name": "order_created", "custom_data": {"user_id": "reader-3"}},
            "data": {
                "id": "5123",
                "attributes": {"total": 9900, "currency": "KRW", "first_order_item": {"variant_id": 1327335}}
            }
        })
        .to_string();
        let signature = LemonSqueezyWebhook::new(LEMON_SECRET).sign(order.as_bytes()).unwrap();

        let request = Request::post("/api/webhook/lemon-squeezy")
            .header("x-signature", signature)
            .body(Body::from(order))
            .unwrap();
        let (status, _, _) = send(&h.app, request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(credits(&h.app, "reader-3").await, json!({"credits": 35, "count": 0}));
    }

    #[tokio::test]
    async fn test_webhook_without_buyer_is_acknowledged() {
        let h = harness();
        let order = json!({
            "type": "order.created",
            "data": {"id": "ord_2", "product_id": STARTER, "amount": 249, "currency": "usd"}
        })
        .to_string();

        let (status, _, body) = send(&h.app, polar_webhook(&order, None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "missing_user");
    }

    #[tokio::test]
    async fn test_credits_endpoint() {
        let h = harness();
        h.ledger
            .put_usage(UsageRecord {
                free_count: 1,
                credits: 4,
                ..UsageRecord::empty("reader-5")
            })
            .await;

        let request = Request::get("/api/user/credits?userId=reader-5").body(Body::empty()).unwrap();
        let (status, headers, body) = send(&h.app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"credits": 4, "count": 1}));
        assert_eq!(headers[header::CACHE_CONTROL], "no-store, max-age=0, must-revalidate");
        assert_eq!(headers[header::PRAGMA], "no-cache");

        assert_eq!(credits(&h.app, "nobody").await, json!({"credits": 0, "count": 0}));

        let request = Request::get("/user/credits").body(Body::empty()).unwrap();
        let (status, headers, body) = send(&h.app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"credits": 0, "count": 0}));
        assert_eq!(headers[header::EXPIRES], "0");
    }

    #[tokio::test]
    async fn test_checkout() {
        let h = harness();

        let (status, _, body) = send(
            &h.app,
            post_json("/checkout", &json!({"productId": STARTER, "userId": "reader-1"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["checkoutUrl"], "https://pay.example/STARTER");
        assert_eq!(
            h.checkout.requests(),
            vec![(
                STARTER.to_string(),
                "reader-1".to_string(),
                "https://bluehour.test/store?success=true".to_string()
            )]
        );
    }

    #[tokio::test]
    async fn test_checkout_rejections() {
        let h = harness();

        let (status, _, body) = send(
            &h.app,
            post_json("/checkout/polar", &json!({"productId": "1327318", "userId": "reader-1"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "UNKNOWN_PRODUCT");

        let (status, _, _) = send(&h.app, post_json("/checkout", &json!({"productId": STARTER}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _, body) = send(
            &h.app,
            post_json("/checkout/lemon-squeezy", &json!({"productId": "1327318", "userId": "reader-1"})),
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"], "PAYMENTS_DISABLED");

        // catalog is checked before the processor's credentials
        let (status, _, body) = send(
            &h.app,
            post_json("/checkout/lemon-squeezy", &json!({"productId": "999", "userId": "reader-1"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "UNKNOWN_PRODUCT");

        let (status, _, body) = send(&h.app, post_json("/checkout/lemon-squeezy", &json!({"userId": "reader-1"}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "MISSING_FIELDS");

        let (status, _, _) = send(
            &h.app,
            post_json("/checkout/stripe", &json!({"productId": "x", "userId": "reader-1"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        assert!(h.checkout.requests().is_empty());
    }

    #[tokio::test]
    async fn test_products() {
        let h = harness();
        let request = Request::get("/products/lemon-squeezy").body(Body::empty()).unwrap();
        let (status, _, body) = send(&h.app, request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["processor"], "lemon-squeezy");
        assert_eq!(body["products"][0]["key"], "TASTER");
        assert_eq!(body["products"][1]["credits"], 35);
    }
}
