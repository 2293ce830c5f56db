//! PostgreSQL ledger

use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::error::{LedgerError, Result};
use crate::record::{NewOrder, OrderOutcome, Processor, UsageRecord};
use crate::store::LedgerStore;

/// Database settings
#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL (service-role credentials)
    pub url: String,

    pub max_connections: u32,

    /// Apply bundled migrations on connect
    pub run_migrations: bool,
}

impl DatabaseConfig {
    /// Load from environment; `None` when `DATABASE_URL` is unset
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let url = lookup("DATABASE_URL").filter(|u| !u.trim().is_empty())?;

        Some(Self {
            url,
            max_connections: lookup("DATABASE_MAX_CONNECTIONS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(5),
            run_migrations: lookup("DATABASE_RUN_MIGRATIONS")
                .is_some_and(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes")),
        })
    }
}

const USAGE_COLUMNS: &str = "user_id, count AS free_count, credits, last_ip, updated_at";

/// PostgreSQL-backed ledger
#[derive(Clone)]
pub struct PgLedgerStore {
    pool: PgPool,
}

impl PgLedgerStore {
    /// Connect and optionally migrate
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        tracing::info!(
            max_connections = config.max_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .connect(&config.url)
            .await
            .map_err(|e| LedgerError::Config(format!("Failed to connect: {e}")))?;

        let store = Self::from_pool(pool);
        if config.run_migrations {
            store.migrate().await?;
        }

        Ok(store)
    }

    pub const fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Apply the bundled schema migrations
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        tracing::info!("Ledger migrations applied");
        Ok(())
    }

    const fn insert_order_sql(processor: Processor) -> &'static str {
        match processor {
            Processor::Polar => {
                "INSERT INTO polar_orders \
                 (polar_order_id, user_id, product_id, credits_added, amount, currency, status) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7) \
                 ON CONFLICT (polar_order_id) DO NOTHING"
            }
            Processor::LemonSqueezy => {
                "INSERT INTO lemon_squeezy_orders \
                 (lemon_squeezy_id, user_id, variant_id, credits_added, amount, currency, status) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7) \
                 ON CONFLICT (lemon_squeezy_id) DO NOTHING"
            }
        }
    }
}

#[async_trait]
impl LedgerStore for PgLedgerStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn usage(&self, user_id: &str) -> Result<Option<UsageRecord>> {
        let record = sqlx::query_as::<_, UsageRecord>(&format!(
            "SELECT {USAGE_COLUMNS} FROM user_generations WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn ip_claimed_by_other(&self, ip: &str, user_id: &str) -> Result<bool> {
        let claimed: bool = sqlx::query_scalar(
            "SELECT EXISTS (
                SELECT 1 FROM user_generations
                WHERE last_ip = $1 AND user_id <> $2 AND count > 0
            )",
        )
        .bind(ip)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(claimed)
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

        let record = sqlx::query_as::<_, UsageRecord>(&format!(
            "INSERT INTO user_generations (user_id, count, credits, last_ip, updated_at)
             VALUES ($1, 1, 0, $2, NOW())
             ON CONFLICT (user_id) DO UPDATE
             SET count = user_generations.count + 1,
                 last_ip = COALESCE(EXCLUDED.last_ip, user_generations.last_ip),
                 updated_at = NOW()
             WHERE user_generations.count < $3
             RETURNING {USAGE_COLUMNS}"
        ))
        .bind(user_id)
        .bind(ip)
        .bind(free_limit)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn consume_credits(
        &self,
        user_id: &str,
        ip: Option<&str>,
        cost: i32,
    ) -> Result<Option<UsageRecord>> {
        let record = sqlx::query_as::<_, UsageRecord>(&format!(
            "UPDATE user_generations
             SET credits = credits - $2,
                 last_ip = COALESCE($3, last_ip),
                 updated_at = NOW()
             WHERE user_id = $1 AND credits >= $2
             RETURNING {USAGE_COLUMNS}"
        ))
        .bind(user_id)
        .bind(cost)
        .bind(ip)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn record_order_and_credit(&self, order: &NewOrder) -> Result<OrderOutcome> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(Self::insert_order_sql(order.processor))
            .bind(&order.order_id)
            .bind(&order.user_id)
            .bind(&order.product_id)
            .bind(order.credits_added)
            .bind(order.amount)
            .bind(&order.currency)
            .bind(&order.status)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if inserted == 0 {
            tx.rollback().await?;
            return Ok(OrderOutcome::AlreadyProcessed);
        }

        let balance: i32 = sqlx::query_scalar(
            "INSERT INTO user_generations (user_id, count, credits, updated_at)
             VALUES ($1, 0, $2, NOW())
             ON CONFLICT (user_id) DO UPDATE
             SET credits = user_generations.credits + EXCLUDED.credits,
                 updated_at = NOW()
             RETURNING credits",
        )
        .bind(&order.user_id)
        .bind(order.credits_added)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(OrderOutcome::Credited { balance })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_config_requires_url() {
        assert!(DatabaseConfig::from_lookup(|_| None).is_none());
        assert!(DatabaseConfig::from_lookup(|k| (k == "DATABASE_URL").then(String::new)).is_none());
    }

    #[test]
    fn test_config_from_lookup() {
        let vars = HashMap::from([
            ("DATABASE_URL", "postgres://localhost/bluehour"),
            ("DATABASE_MAX_CONNECTIONS", "12"),
            ("DATABASE_RUN_MIGRATIONS", "true"),
        ]);
        let config = DatabaseConfig::from_lookup(|k| vars.get(k).map(ToString::to_string)).unwrap();

        assert_eq!(config.url, "postgres://localhost/bluehour");
        assert_eq!(config.max_connections, 12);
        assert!(config.run_migrations);
    }

    #[test]
    fn test_order_sql_targets_processor_table() {
        assert!(PgLedgerStore::insert_order_sql(Processor::Polar).contains("polar_orders"));
        assert!(
            PgLedgerStore::insert_order_sql(Processor::LemonSqueezy)
                .contains("ON CONFLICT (lemon_squeezy_id)")
        );
    }
}
