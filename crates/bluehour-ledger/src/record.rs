//! Ledger Records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Payment processors that can credit the ledger
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Processor {
    Polar,
    LemonSqueezy,
}

impl Processor {
    pub const ALL: [Self; 2] = [Self::Polar, Self::LemonSqueezy];

    /// Path segment / wire name (`polar`, `lemon-squeezy`)
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Polar => "polar",
            Self::LemonSqueezy => "lemon-squeezy",
        }
    }

    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Polar => "Polar",
            Self::LemonSqueezy => "Lemon Squeezy",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "polar" => Some(Self::Polar),
            "lemon-squeezy" | "lemon_squeezy" | "lemonsqueezy" => Some(Self::LemonSqueezy),
            _ => None,
        }
    }
}

impl std::fmt::Display for Processor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row per user: free-tier usage, credit balance, last client address
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct UsageRecord {
    pub user_id: String,

    /// Free generations already consumed
    pub free_count: i32,

    /// Purchased credit balance
    pub credits: i32,

    /// Last-seen client address, used only by the abuse heuristic
    pub last_ip: Option<String>,

    pub updated_at: DateTime<Utc>,
}

impl UsageRecord {
    /// What a user without a row looks like
    pub fn empty(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            free_count: 0,
            credits: 0,
            last_ip: None,
            updated_at: Utc::now(),
        }
    }
}

/// An order to insert, as reported by a processor webhook
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrder {
    pub processor: Processor,

    /// Processor-assigned order id (unique per processor)
    pub order_id: String,

    pub user_id: String,

    /// Product id (Polar) or variant id (Lemon Squeezy)
    pub product_id: String,

    pub credits_added: i32,

    /// Amount in the currency's minor unit
    pub amount: i64,

    /// ISO currency code, uppercase
    pub currency: String,

    pub status: String,
}

/// A stored order
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRecord {
    #[serde(flatten)]
    pub order: NewOrder,
    pub created_at: DateTime<Utc>,
}

/// Result of recording an order
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OrderOutcome {
    /// Order stored and credits added; `balance` is the new credit total
    Credited { balance: i32 },

    /// The order id was already recorded; nothing changed
    AlreadyProcessed,
}
