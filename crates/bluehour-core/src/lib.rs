//! # bluehour-core
//!
//! Story prompt construction, translations and a provider-agnostic
//! text-generation abstraction.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                    Story generation                      │
//! │  ┌─────────────┐  ┌──────────────┐  ┌─────────────────┐  │
//! │  │ StoryPrompt │──│ Translations │  │  LlmProvider    │  │
//! │  │  (input)    │  │  (templates) │──│  (Strategy)     │  │
//! │  └─────────────┘  └──────────────┘  └─────────────────┘  │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! The `LlmProvider` trait keeps the story endpoint independent of the
//! hosted model behind it.

pub mod error;
pub mod i18n;
pub mod message;
pub mod prompt;
pub mod provider;

pub use error::{GenerationError, Result};
pub use i18n::{Language, MessageKey, Translations};
pub use message::{Message, Role};
pub use prompt::{PromptField, StoryPrompt};
pub use provider::LlmProvider;
