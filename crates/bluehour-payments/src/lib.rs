//! # bluehour-payments
//!
//! Credit packs, hosted checkout and payment webhooks for Bl_ueHour.
//!
//! ## Flow
//!
//! Both processors use hosted checkout. The buyer's user id travels in the
//! checkout metadata and comes back in the `order` webhook, which is the
//! only place credits are granted.
//!
//! ```text
//! ┌─────────────┐  POST /checkout  ┌─────────────────┐  order webhook  ┌─────────────┐
//! │   Client    │────────────────▶│  Polar / Lemon  │───────────────▶│   Ledger    │
//! │   (store)   │◀────────────────│  Hosted Page    │                │  +credits   │
//! └─────────────┘   checkoutUrl    └─────────────────┘                └─────────────┘
//! ```
//!
//! | Processor     | Catalog ids  | Signature                               |
//! |---------------|--------------|-----------------------------------------|
//! | Polar         | product UUID | Standard Webhooks, base64 HMAC-SHA256   |
//! | Lemon Squeezy | variant id   | `X-Signature`, hex HMAC-SHA256 of body  |
//!
//! ## Usage
//!
//! ```rust,ignore
//! use bluehour_payments::{PolarClient, checkout};
//!
//! let polar = PolarClient::from_env()?;
//! let session = checkout::initiate(
//!     &polar,
//!     "47f3c180-bb8d-4f57-bbca-2994a19a33c2",
//!     "user-123",
//!     "https://bluehour.app",
//! ).await?;
//!
//! // Redirect user to: session.checkout_url
//! ```

pub mod catalog;
pub mod checkout;
mod error;
mod lemon_squeezy;
mod polar;
mod webhook;

pub use bluehour_ledger::Processor;
pub use catalog::{Price, Product};
pub use checkout::{CheckoutProvider, CheckoutRequest, CheckoutSession};
pub use error::{PaymentError, Result};
pub use lemon_squeezy::{LemonSqueezyClient, LemonSqueezyWebhook};
pub use polar::{PolarClient, PolarServer, PolarWebhook};
pub use webhook::{OrderEvent, WebhookAdapter, WebhookEvent, WebhookHandler, WebhookOutcome};
