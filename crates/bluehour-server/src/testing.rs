//! Test doubles shared by the service and handler tests

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use bluehour_core::provider::{Completion, FinishReason, GenerationOptions, ProviderInfo};
use bluehour_core::{GenerationError, LlmProvider, Message};
use bluehour_ledger::{LedgerError, LedgerStore, MemoryLedgerStore, NewOrder, OrderOutcome, UsageRecord};
use bluehour_payments::{CheckoutProvider, CheckoutRequest, CheckoutSession, PaymentError, Processor};

/// Provider that answers every prompt with a fixed story
pub struct ScriptedProvider {
    reply: Option<String>,
    prompts: Mutex<Vec<String>>,
    calls: AtomicUsize,
}

impl ScriptedProvider {
    pub fn new(reply: &str) -> Self {
        Self {
            reply: Some(reply.to_string()),
            prompts: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Provider without credentials
    pub fn failing() -> Self {
        Self {
            reply: None,
            ..Self::new("")
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn info(&self) -> ProviderInfo {
        ProviderInfo {
            name: "Scripted".into(),
            default_model: "scripted".into(),
        }
    }

    async fn health_check(&self) -> bluehour_core::Result<bool> {
        Ok(self.reply.is_some())
    }

    async fn complete(
        &self,
        messages: &[Message],
        options: &GenerationOptions,
    ) -> bluehour_core::Result<Completion> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts
            .lock()
            .unwrap()
            .extend(messages.iter().map(|m| m.content.clone()));

        let content = self
            .reply
            .clone()
            .ok_or_else(|| GenerationError::Config("GEMINI_API_KEY is not configured".into()))?;

        Ok(Completion {
            content,
            model: options.model.clone(),
            usage: None,
            finish_reason: Some(FinishReason::Stop),
        })
    }
}

/// Ledger whose writes always fail
pub struct FailingLedger;

#[async_trait]
impl LedgerStore for FailingLedger {
    fn backend(&self) -> &'static str {
        "failing"
    }

    async fn usage(&self, _user_id: &str) -> bluehour_ledger::Result<Option<UsageRecord>> {
        Ok(None)
    }

    async fn ip_claimed_by_other(&self, _ip: &str, _user_id: &str) -> bluehour_ledger::Result<bool> {
        Ok(false)
    }

    async fn consume_free(
        &self,
        _user_id: &str,
        _ip: Option<&str>,
        _free_limit: i32,
    ) -> bluehour_ledger::Result<Option<UsageRecord>> {
        Err(LedgerError::Database("connection reset".into()))
    }

    async fn consume_credits(
        &self,
        _user_id: &str,
        _ip: Option<&str>,
        _cost: i32,
    ) -> bluehour_ledger::Result<Option<UsageRecord>> {
        Err(LedgerError::Database("connection reset".into()))
    }

    async fn record_order_and_credit(&self, _order: &NewOrder) -> bluehour_ledger::Result<OrderOutcome> {
        Err(LedgerError::Database("connection reset".into()))
    }
}

/// Ledger that reads normally but loses every conditional debit, as if a
/// concurrent request spent the quota between check and write
pub struct RacingLedger(pub MemoryLedgerStore);

#[async_trait]
impl LedgerStore for RacingLedger {
    fn backend(&self) -> &'static str {
        "racing"
    }

    async fn usage(&self, user_id: &str) -> bluehour_ledger::Result<Option<UsageRecord>> {
        self.0.usage(user_id).await
    }

    async fn ip_claimed_by_other(&self, ip: &str, user_id: &str) -> bluehour_ledger::Result<bool> {
        self.0.ip_claimed_by_other(ip, user_id).await
    }

    async fn consume_free(
        &self,
        _user_id: &str,
        _ip: Option<&str>,
        _free_limit: i32,
    ) -> bluehour_ledger::Result<Option<UsageRecord>> {
        Ok(None)
    }

    async fn consume_credits(
        &self,
        _user_id: &str,
        _ip: Option<&str>,
        _cost: i32,
    ) -> bluehour_ledger::Result<Option<UsageRecord>> {
        Ok(None)
    }

    async fn record_order_and_credit(&self, order: &NewOrder) -> bluehour_ledger::Result<OrderOutcome> {
        self.0.record_order_and_credit(order).await
    }
}

/// Checkout provider that records requests instead of calling a processor
pub struct RecordingCheckout {
    processor: Processor,
    requests: Mutex<Vec<(String, String, String)>>,
}

impl RecordingCheckout {
    pub fn new(processor: Processor) -> Self {
        Self {
            processor,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// `(product id, user id, success url)` per call
    pub fn requests(&self) -> Vec<(String, String, String)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl CheckoutProvider for RecordingCheckout {
    fn processor(&self) -> Processor {
        self.processor
    }

    async fn create_checkout(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutSession, PaymentError> {
        self.requests.lock().unwrap().push((
            request.product.id.to_string(),
            request.user_id.clone(),
            request.success_url.clone(),
        ));

        Ok(CheckoutSession {
            id: "chk_1".into(),
            checkout_url: format!("https://pay.example/{}", request.product.key),
            processor: self.processor,
        })
    }
}
