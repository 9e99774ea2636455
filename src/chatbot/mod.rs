//! Chatbot module - decides how to answer each inbound message.

pub mod chain;
pub mod claude;
pub mod engine;
pub mod gemini;
pub mod history;
pub mod openai;
pub mod phrases;
pub mod prompt;
pub mod provider;
pub mod selector;

#[cfg(test)]
pub(crate) mod mock;

pub use chain::{ProviderChain, ProviderStatus};
pub use engine::{ChatbotEngine, APOLOGY};
pub use history::{HistoryEntry, HistoryStore};
pub use provider::{Provider, ProviderError, ProviderErrorKind};
pub use selector::ResponseSelector;
