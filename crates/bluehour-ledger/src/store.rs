//! Ledger storage trait

use async_trait::async_trait;

use crate::error::Result;
use crate::record::{NewOrder, OrderOutcome, UsageRecord};

/// Ledger storage
///
/// Mutating operations are conditional and atomic per call: they either
/// apply completely or report that their precondition no longer holds.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Storage backend name, for health reporting
    fn backend(&self) -> &'static str;

    /// Get a user's usage row
    async fn usage(&self, user_id: &str) -> Result<Option<UsageRecord>>;

    /// Whether another user with at least one free generation was last seen at `ip`
    async fn ip_claimed_by_other(&self, ip: &str, user_id: &str) -> Result<bool>;

    /// Spend one free generation while `free_count < free_limit`.
    ///
    /// Creates the row when absent. Returns `None` if the limit was
    /// already reached.
    async fn consume_free(
        &self,
        user_id: &str,
        ip: Option<&str>,
        free_limit: i32,
    ) -> Result<Option<UsageRecord>>;

    /// Spend `cost` credits while `credits >= cost`.
    ///
    /// Returns `None` if the balance was insufficient or the row is absent.
    async fn consume_credits(
        &self,
        user_id: &str,
        ip: Option<&str>,
        cost: i32,
    ) -> Result<Option<UsageRecord>>;

    /// Store the order and add its credits to the buyer in one step.
    ///
    /// A repeated order id yields `OrderOutcome::AlreadyProcessed` and
    /// leaves the balance untouched.
    async fn record_order_and_credit(&self, order: &NewOrder) -> Result<OrderOutcome>;
}
