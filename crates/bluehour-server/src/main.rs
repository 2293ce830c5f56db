//! Bl_ueHour HTTP Server
//!
//! Axum-based server for story generation, the credit ledger, hosted
//! checkout and payment webhooks. Every route is also mounted under `/api`.

mod config;
mod error;
mod handlers;
mod state;
mod story;

#[cfg(test)]
mod testing;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use bluehour_core::LlmProvider;
use bluehour_core::provider::GenerationOptions;
use bluehour_ledger::{DatabaseConfig, LedgerStore, MemoryLedgerStore, PgLedgerStore, QuotaPolicy};
use bluehour_payments::{LemonSqueezyClient, LemonSqueezyWebhook, PolarClient, PolarWebhook, Processor};
use bluehour_runtime::GeminiProvider;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::ServerConfig;
use crate::handlers::{
    create_checkout, create_processor_checkout, generate_story, health_check, list_products,
    payment_webhook, user_credits,
};
use crate::state::{AppState, Payments};
use crate::story::{StoryConfig, StoryService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment
    dotenvy::dotenv().ok();
    let config = ServerConfig::from_env()?;

    // Text generation
    let provider = GeminiProvider::from_env()?;
    if provider.is_configured() {
        tracing::info!(model = %provider.info().default_model, "✓ Gemini configured");
    } else {
        tracing::warn!("⚠ GEMINI_API_KEY not set - story generation will fail");
    }
    let generation = GenerationOptions::for_model(provider.info().default_model);

    // Ledger
    let (ledger, database_configured): (Arc<dyn LedgerStore>, bool) = match DatabaseConfig::from_env() {
        Some(db) => {
            let store = PgLedgerStore::connect(&db).await?;
            tracing::info!(max_connections = db.max_connections, "✓ Connected to PostgreSQL");
            (Arc::new(store), true)
        }
        None => {
            tracing::warn!("⚠ DATABASE_URL not set - using in-memory ledger, usage is lost on restart");
            (Arc::new(MemoryLedgerStore::new()), false)
        }
    };

    // Payments
    let payments = payments_from_env();
    for processor in Processor::ALL {
        if payments.is_enabled(processor) {
            tracing::info!("✓ {} configured", processor.display_name());
        } else {
            tracing::warn!("⚠ {} not configured - its checkout and webhook are disabled", processor.display_name());
        }
    }

    let story = StoryService::new(
        Arc::new(provider),
        ledger.clone(),
        StoryConfig {
            quota: QuotaPolicy {
                free_limit: config.free_limit,
                required_credits: config.required_credits,
                purchases_enabled: payments.any_enabled(),
            },
            accounting: config.accounting,
            generation,
        },
    );

    // Build application state
    let state = AppState {
        story: Arc::new(story),
        ledger,
        payments: Arc::new(payments),
        app_url: config.app_url.as_str().into(),
        database_configured,
    };

    let app = router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;

    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("🚀 Bl_ueHour server running on http://{}", config.bind_addr);
    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("Endpoints (also under /api):");
    tracing::info!("  GET  /health                  - Health check");
    tracing::info!("  POST /generate-story          - Generate a story");
    tracing::info!("  GET  /user/credits            - Credits and free usage");
    tracing::info!("  POST /checkout[/{{processor}}]  - Create checkout session");
    tracing::info!("  GET  /products/{{processor}}    - Credit packs");
    tracing::info!("  POST /webhook/{{processor}}     - Payment webhooks");

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;

    Ok(())
}

/// Processors whose credentials are present; missing ones stay disabled
fn payments_from_env() -> Payments {
    let mut payments = Payments::new();

    match PolarClient::from_env() {
        Ok(client) => payments = payments.with_checkout(Arc::new(client)),
        Err(e) => tracing::debug!(error = %e, "Polar checkout disabled"),
    }
    match PolarWebhook::from_env() {
        Ok(webhook) => payments = payments.with_webhook(Arc::new(webhook)),
        Err(e) => tracing::debug!(error = %e, "Polar webhook disabled"),
    }
    match LemonSqueezyClient::from_env() {
        Ok(client) => payments = payments.with_checkout(Arc::new(client)),
        Err(e) => tracing::debug!(error = %e, "Lemon Squeezy checkout disabled"),
    }
    match LemonSqueezyWebhook::from_env() {
        Ok(webhook) => payments = payments.with_webhook(Arc::new(webhook)),
        Err(e) => tracing::debug!(error = %e, "Lemon Squeezy webhook disabled"),
    }

    payments
}

/// Routes, mounted at the root and under `/api`
fn router(state: AppState) -> Router {
    let routes = Router::new()
        .route("/generate-story", post(generate_story))
        .route("/user/credits", get(user_credits))
        .route("/checkout", post(create_checkout))
        .route("/checkout/{processor}", post(create_processor_checkout))
        .route("/products/{processor}", get(list_products))
        .route("/webhook/{processor}", post(payment_webhook));

    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .merge(routes.clone())
        .nest("/api", routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
