//! In-memory ledger (development and tests)

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::error::Result;
use crate::record::{NewOrder, OrderOutcome, OrderRecord, Processor, UsageRecord};
use crate::store::LedgerStore;

/// In-memory ledger store
#[derive(Default)]
pub struct MemoryLedgerStore {
    usage: RwLock<HashMap<String, UsageRecord>>,
    orders: RwLock<HashMap<(Processor, String), OrderRecord>>,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed or overwrite a usage row
    pub async fn put_usage(&self, record: UsageRecord) {
        self.usage
            .write()
            .await
            .insert(record.user_id.clone(), record);
    }

    /// All recorded orders for a processor
    pub async fn orders(&self, processor: Processor) -> Vec<OrderRecord> {
        self.orders
            .read()
            .await
            .iter()
            .filter(|((p, _), _)| *p == processor)
            .map(|(_, order)| order.clone())
            .collect()
    }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn usage(&self, user_id: &str) -> Result<Option<UsageRecord>> {
        Ok(self.usage.read().await.get(user_id).cloned())
    }

    async fn ip_claimed_by_other(&self, ip: &str, user_id: &str) -> Result<bool> {
        Ok(self.usage.read().await.values().any(|r| {
            r.user_id != user_id && r.free_count > 0 && r.last_ip.as_deref() == Some(ip)
        }))
    }

    async fn consume_free(
        &self,
        user_id: &str,
        ip: Option<&str>,
        free_limit: i32,
    ) -> Result<Option<UsageRecord>> {
        if free_limit <= 0 {
            return Ok(None);
        }

        let mut usage = self.usage.write().await;
        let record = usage
            .entry(user_id.to_string())
            .or_insert_with(|| UsageRecord::empty(user_id));

        if record.free_count >= free_limit {
            return Ok(None);
        }

        record.free_count += 1;
        if let Some(ip) = ip {
            record.last_ip = Some(ip.to_string());
        }
        record.updated_at = Utc::now();

        Ok(Some(record.clone()))
    }

    async fn consume_credits(
        &self,
        user_id: &str,
        ip: Option<&str>,
        cost: i32,
    ) -> Result<Option<UsageRecord>> {
        let mut usage = self.usage.write().await;
        let Some(record) = usage.get_mut(user_id) else {
            return Ok(None);
        };

        if record.credits < cost {
            return Ok(None);
        }

        record.credits -= cost;
        if let Some(ip) = ip {
            record.last_ip = Some(ip.to_string());
        }
        record.updated_at = Utc::now();

        Ok(Some(record.clone()))
    }

    async fn record_order_and_credit(&self, order: &NewOrder) -> Result<OrderOutcome> {
        // Both locks held for the whole step, matching the SQL transaction
        let mut orders = self.orders.write().await;
        let key = (order.processor, order.order_id.clone());
        if orders.contains_key(&key) {
            return Ok(OrderOutcome::AlreadyProcessed);
        }

        let mut usage = self.usage.write().await;
        let record = usage
            .entry(order.user_id.clone())
            .or_insert_with(|| UsageRecord::empty(&order.user_id));
        record.credits += order.credits_added;
        record.updated_at = Utc::now();
        let balance = record.credits;

        orders.insert(
            key,
            OrderRecord {
                order: order.clone(),
                created_at: Utc::now(),
            },
        );

        Ok(OrderOutcome::Credited { balance })
    }
}
