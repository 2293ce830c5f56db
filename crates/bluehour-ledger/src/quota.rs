//! Quota policy
//!
//! Decides whether a generation is paid for by the free tier or by
//! credits, and what happens when the ledger write after generation fails.

use serde::{Deserialize, Serialize};

use crate::record::UsageRecord;

/// Free generations per user
pub const FREE_LIMIT: i32 = 1;

/// Credits spent per paid generation
pub const REQUIRED_CREDITS: i32 = 1;

/// How a generation request would be paid for
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Eligibility {
    /// Under the free limit; subject to the abuse check
    Free,
    /// Free tier exhausted, enough credits
    Paid,
    /// Free tier exhausted, not enough credits
    NoCredits,
    /// Free tier exhausted and credits can not be bought here
    FreeLimitExceeded,
}

/// Free-tier and credit rules
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaPolicy {
    pub free_limit: i32,
    pub required_credits: i32,

    /// Whether any payment processor is configured
    pub purchases_enabled: bool,
}

impl Default for QuotaPolicy {
    fn default() -> Self {
        Self {
            free_limit: FREE_LIMIT,
            required_credits: REQUIRED_CREDITS,
            purchases_enabled: true,
        }
    }
}

impl QuotaPolicy {
    pub fn evaluate(&self, usage: &UsageRecord) -> Eligibility {
        if usage.free_count < self.free_limit {
            Eligibility::Free
        } else if usage.credits >= self.required_credits {
            Eligibility::Paid
        } else if self.purchases_enabled {
            Eligibility::NoCredits
        } else {
            Eligibility::FreeLimitExceeded
        }
    }
}

/// What to do when the ledger write after a successful generation fails
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AccountingPolicy {
    /// Log the failure and still deliver the story
    #[default]
    BestEffort,
    /// Fail the request and discard the story
    Strict,
}

impl AccountingPolicy {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "best-effort" | "best_effort" => Some(Self::BestEffort),
            "strict" => Some(Self::Strict),
            _ => None,
        }
    }
}
