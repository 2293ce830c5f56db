//! # bluehour-ledger
//!
//! The per-user ledger shared by story generation and the payment
//! webhooks: free-tier usage, purchased credits, last-seen client address,
//! and one order table per payment processor.
//!
//! Every mutation is a single conditional statement (or one transaction
//! for order + credit), so concurrent requests for the same user can not
//! both spend the same free generation or the same credits.
//!
//! ```text
//!  generate-story ──▶ consume_free / consume_credits ─┐
//!                                                     ▼
//!                                            ┌──────────────────┐
//!                                            │ user_generations │
//!                                            └──────────────────┘
//!                                                     ▲
//!  webhook/{processor} ──▶ record_order_and_credit ───┘
//!                              └──▶ {processor}_orders (UNIQUE order id)
//! ```

mod error;
mod memory;
mod postgres;
mod quota;
mod record;
mod store;

pub use error::{LedgerError, Result};
pub use memory::MemoryLedgerStore;
pub use postgres::{DatabaseConfig, PgLedgerStore};
pub use quota::{AccountingPolicy, Eligibility, FREE_LIMIT, QuotaPolicy, REQUIRED_CREDITS};
pub use record::{NewOrder, OrderOutcome, OrderRecord, Processor, UsageRecord};
pub use store::LedgerStore;
