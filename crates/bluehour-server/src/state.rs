//! Application State

use std::collections::HashMap;
use std::sync::Arc;

use bluehour_ledger::LedgerStore;
use bluehour_payments::{CheckoutProvider, Processor, WebhookAdapter};

use crate::story::StoryService;

/// Payment processors that have credentials configured
#[derive(Default)]
pub struct Payments {
    checkout: HashMap<Processor, Arc<dyn CheckoutProvider>>,
    webhooks: HashMap<Processor, Arc<dyn WebhookAdapter>>,
}

impl Payments {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_checkout(mut self, provider: Arc<dyn CheckoutProvider>) -> Self {
        self.checkout.insert(provider.processor(), provider);
        self
    }

    #[must_use]
    pub fn with_webhook(mut self, adapter: Arc<dyn WebhookAdapter>) -> Self {
        self.webhooks.insert(adapter.processor(), adapter);
        self
    }

    pub fn checkout(&self, processor: Processor) -> Option<&dyn CheckoutProvider> {
        self.checkout.get(&processor).map(Arc::as_ref)
    }

    pub fn webhook(&self, processor: Processor) -> Option<&dyn WebhookAdapter> {
        self.webhooks.get(&processor).map(Arc::as_ref)
    }

    /// Whether credits can be bought through this processor
    pub fn is_enabled(&self, processor: Processor) -> bool {
        self.checkout.contains_key(&processor)
    }

    pub fn any_enabled(&self) -> bool {
        !self.checkout.is_empty()
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Story generation with quota enforcement
    pub story: Arc<StoryService>,

    /// Usage and credit ledger
    pub ledger: Arc<dyn LedgerStore>,

    /// Configured payment processors
    pub payments: Arc<Payments>,

    /// Public base URL for checkout redirects
    pub app_url: Arc<str>,

    /// Whether the ledger is backed by a database
    pub database_configured: bool,
}
