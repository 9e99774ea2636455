//! Chatbot engine - turns one inbound message into one reply.

use std::sync::Arc;

use tracing::{error, info};

use crate::chatbot::chain::ProviderChain;
use crate::chatbot::history::HistoryStore;
use crate::chatbot::phrases::PhraseBook;
use crate::chatbot::provider::build_providers;
use crate::chatbot::selector::ResponseSelector;
use crate::classifier::classify;
use crate::config::Config;

/// Sent when the pipeline itself blows up.
pub const APOLOGY: &str = "sorry, my brain glitched for a sec 😅";

/// The chatbot engine.
pub struct ChatbotEngine {
    history: Arc<HistoryStore>,
    selector: Arc<ResponseSelector>,
}

impl ChatbotEngine {
    pub fn new(history: Arc<HistoryStore>, selector: ResponseSelector) -> Self {
        Self {
            history,
            selector: Arc::new(selector),
        }
    }

    /// Build providers, chain and selector from config.
    pub fn from_config(config: &Config) -> Result<Self, reqwest::Error> {
        let providers = build_providers(&config.providers, config.request_timeout)?;
        if providers.is_empty() {
            info!("No AI providers configured, using canned replies only");
        }

        let history = Arc::new(HistoryStore::new());
        let chain = ProviderChain::new(providers, history.clone(), config.history_window);
        let phrases = PhraseBook::with_overrides(config.phrases.clone(), config.reactions.clone());
        let selector = ResponseSelector::new(chain, phrases, config.reaction_probability);

        Ok(Self::new(history, selector))
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    pub fn selector(&self) -> &ResponseSelector {
        &self.selector
    }

    /// Handle an incoming message and return the reply to send.
    ///
    /// Always returns something: if the pipeline fails, the user gets `APOLOGY`.
    pub async fn handle_message(&self, user_id: &str, text: &str) -> String {
        info!(
            "📨 {}: \"{}\"",
            user_id,
            text.chars().take(50).collect::<String>()
        );

        self.history.record(user_id, text, false);

        let selector = self.selector.clone();
        let owned_user = user_id.to_string();
        let owned_text = text.to_string();
        let task = tokio::spawn(async move {
            let category = classify(&owned_text);
            info!("🏷️ {owned_user}: {category}");
            selector.decide(&owned_user, &owned_text, category).await
        });

        match task.await {
            Ok(reply) => {
                self.history.record(user_id, &reply, true);
                info!(
                    "💬 -> {}: \"{}\"",
                    user_id,
                    reply.chars().take(50).collect::<String>()
                );
                reply
            }
            Err(e) => {
                error!("Pipeline failed for {user_id}: {e}");
                APOLOGY.to_string()
            }
        }
    }
}
