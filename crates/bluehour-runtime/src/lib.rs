//! # bluehour-runtime
//!
//! Runtime providers for Bl_ueHour story generation.
//!
//! ## Providers
//!
//! - **Gemini** (default): Google's hosted `generateContent` API
//!
//! ## Usage
//!
//! ```rust,ignore
//! use bluehour_runtime::GeminiProvider;
//!
//! let provider = GeminiProvider::from_env()?;
//! let completion = provider.complete(&prompt.to_messages(), &options).await?;
//! ```

#[cfg(feature = "gemini")]
pub mod gemini;

#[cfg(feature = "gemini")]
pub use gemini::{GeminiConfig, GeminiProvider};

// Re-export core types for convenience
pub use bluehour_core::{GenerationError, LlmProvider, Message, Result, Role};
