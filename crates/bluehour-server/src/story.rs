//! Story Service
//!
//! Quota check, generation and ledger debit for one story request.
//!
//! ```text
//! validate ─▶ usage ─▶ evaluate ─┬─ Free ─▶ IP check ─┐
//!                                ├─ Paid ─────────────┼─▶ generate ─▶ consume ─▶ outcome
//!                                └─ NoCredits / FreeLimitExceeded ─▶ reject
//! ```
//!
//! The debit is a conditional write issued after generation. When it fails
//! or matches no row, `AccountingPolicy` decides whether the story is still
//! returned.

use std::sync::Arc;

use bluehour_core::provider::GenerationOptions;
use bluehour_core::{GenerationError, Language, LlmProvider, MessageKey, PromptField, StoryPrompt, Translations};
use bluehour_ledger::{AccountingPolicy, Eligibility, LedgerError, LedgerStore, QuotaPolicy, UsageRecord};
use thiserror::Error;

/// Story service settings
#[derive(Clone, Debug, Default)]
pub struct StoryConfig {
    pub quota: QuotaPolicy,
    pub accounting: AccountingPolicy,
    pub generation: GenerationOptions,
}

/// Raw story request
#[derive(Clone, Debug, Default)]
pub struct StoryRequest {
    pub user_id: Option<String>,
    pub genre: Option<String>,
    pub personality: Option<String>,
    pub concept: Option<String>,
    pub language: Language,

    /// Resolved client address, if known
    pub client_ip: Option<String>,
}

/// A generated story and the caller's usage after it
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoryOutcome {
    pub story: String,
    pub used_count: i32,
    pub limit: i32,
    pub credits: i32,
}

#[derive(Error, Debug)]
pub enum StoryError {
    #[error("missing fields: {0:?}")]
    MissingFields(Vec<PromptField>),

    #[error("missing user id")]
    MissingUser,

    #[error("free story already claimed from {ip}")]
    IpAbuse { ip: String },

    #[error("not enough credits")]
    NoCredits { usage: UsageRecord, limit: i32 },

    #[error("free limit exceeded")]
    FreeLimitExceeded { usage: UsageRecord, limit: i32 },

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Debit after generation failed under strict accounting
    #[error("ledger write failed: {0}")]
    LedgerWrite(String),
}

impl StoryError {
    /// Human message in the caller's language
    pub fn user_message(&self, language: Language) -> String {
        let key = match self {
            Self::MissingFields(_) => MessageKey::MissingFields,
            Self::MissingUser => MessageKey::MissingUser,
            Self::IpAbuse { .. } => MessageKey::IpAbuse,
            Self::NoCredits { .. } => MessageKey::NoCredits,
            Self::FreeLimitExceeded { .. } => MessageKey::FreeLimitExceeded,
            Self::Generation(e) => return e.user_message(),
            Self::Ledger(_) | Self::LedgerWrite(_) => return "Failed to update usage".into(),
        };
        Translations::global().get(language, key).to_string()
    }
}

/// Story generation with quota enforcement
pub struct StoryService {
    provider: Arc<dyn LlmProvider>,
    ledger: Arc<dyn LedgerStore>,
    config: StoryConfig,
}

impl StoryService {
    pub fn new(provider: Arc<dyn LlmProvider>, ledger: Arc<dyn LedgerStore>, config: StoryConfig) -> Self {
        Self {
            provider,
            ledger,
            config,
        }
    }

    /// Whether the text-generation backend has credentials
    pub async fn generation_configured(&self) -> bool {
        self.provider.health_check().await.unwrap_or(false)
    }

    /// Run one story request end to end
    pub async fn generate(&self, request: StoryRequest) -> Result<StoryOutcome, StoryError> {
        let prompt = StoryPrompt::new(
            request.genre.as_deref(),
            request.personality.as_deref(),
            request.concept.as_deref(),
            request.language,
        )
        .map_err(StoryError::MissingFields)?;

        let user_id = request
            .user_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or(StoryError::MissingUser)?;
        let ip = request.client_ip.as_deref();

        let usage = self
            .ledger
            .usage(user_id)
            .await?
            .unwrap_or_else(|| UsageRecord::empty(user_id));
        let quota = self.config.quota;

        let eligibility = quota.evaluate(&usage);
        match eligibility {
            Eligibility::Free => {
                if let Some(ip) = ip {
                    if self.ledger.ip_claimed_by_other(ip, user_id).await? {
                        tracing::warn!(user_id = %user_id, ip = %ip, "Free story already claimed from this address");
                        return Err(StoryError::IpAbuse { ip: ip.to_string() });
                    }
                }
            }
            Eligibility::Paid => {}
            Eligibility::NoCredits => {
                tracing::info!(user_id = %user_id, credits = usage.credits, "Not enough credits");
                return Err(StoryError::NoCredits {
                    usage,
                    limit: quota.free_limit,
                });
            }
            Eligibility::FreeLimitExceeded => {
                tracing::info!(user_id = %user_id, used = usage.free_count, "Free limit exceeded");
                return Err(StoryError::FreeLimitExceeded {
                    usage,
                    limit: quota.free_limit,
                });
            }
        }

        let completion = self
            .provider
            .complete(&prompt.to_messages(), &self.config.generation)
            .await
            .inspect_err(|e| {
                tracing::error!(
                    user_id = %user_id,
                    retryable = e.is_retryable(),
                    error = %e,
                    "Story generation failed"
                );
            })?;

        let debit = match eligibility {
            Eligibility::Paid => {
                self.ledger
                    .consume_credits(user_id, ip, quota.required_credits)
                    .await
            }
            _ => self.ledger.consume_free(user_id, ip, quota.free_limit).await,
        };

        let usage = match (debit, self.config.accounting) {
            (Ok(Some(updated)), _) => updated,
            (Ok(None), AccountingPolicy::Strict) => {
                tracing::error!(user_id = %user_id, "Usage changed during generation; story discarded");
                return Err(StoryError::LedgerWrite("usage changed during generation".into()));
            }
            (Err(e), AccountingPolicy::Strict) => {
                tracing::error!(user_id = %user_id, error = %e, "Ledger write failed; story discarded");
                return Err(StoryError::LedgerWrite(e.to_string()));
            }
            (Ok(None), AccountingPolicy::BestEffort) => {
                tracing::error!(user_id = %user_id, "Usage changed during generation; story delivered uncounted");
                projected(usage, eligibility, quota)
            }
            (Err(e), AccountingPolicy::BestEffort) => {
                tracing::error!(user_id = %user_id, error = %e, "Ledger write failed; story delivered uncounted");
                projected(usage, eligibility, quota)
            }
        };

        tracing::info!(
            user_id = %user_id,
            used = usage.free_count,
            credits = usage.credits,
            paid = eligibility == Eligibility::Paid,
            "Story generated"
        );

        Ok(StoryOutcome {
            story: completion.content,
            used_count: usage.free_count,
            limit: quota.free_limit,
            credits: usage.credits,
        })
    }
}

/// Usage as it would read had the debit landed
fn projected(mut usage: UsageRecord, eligibility: Eligibility, quota: QuotaPolicy) -> UsageRecord {
    if eligibility == Eligibility::Paid {
        usage.credits = (usage.credits - quota.required_credits).max(0);
    } else {
        usage.free_count += 1;
    }
    usage
}
