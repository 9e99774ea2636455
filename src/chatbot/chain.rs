//! Ordered provider fallback with a per-provider circuit breaker.
//!
//! Providers are tried in priority order. A provider whose model or
//! credentials are rejected gets disabled for the rest of the process;
//! anything else just falls through to the next provider for this message.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::StreamExt;
use tracing::{debug, info, warn};

use crate::chatbot::history::{HistoryStore, MAX_HISTORY};
use crate::chatbot::prompt::{build_prompt, prior_turns};
use crate::chatbot::provider::{Prompt, Provider, ProviderError, ProviderErrorKind};

/// Runtime state of one provider. Only `enabled` ever changes.
#[derive(Debug)]
pub struct ProviderState {
    pub id: String,
    pub priority: usize,
    enabled: AtomicBool,
}

impl ProviderState {
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    fn disable(&self) -> bool {
        self.enabled.swap(false, Ordering::SeqCst)
    }
}

/// Snapshot of a provider for status logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderStatus {
    pub id: String,
    pub model: String,
    pub priority: usize,
    pub enabled: bool,
}

struct Slot {
    provider: Arc<dyn Provider>,
    state: ProviderState,
}

pub struct ProviderChain {
    slots: Vec<Slot>,
    history: Arc<HistoryStore>,
    history_window: usize,
}

impl ProviderChain {
    pub fn new(
        providers: Vec<Arc<dyn Provider>>,
        history: Arc<HistoryStore>,
        history_window: usize,
    ) -> Self {
        let slots = providers
            .into_iter()
            .enumerate()
            .map(|(priority, provider)| Slot {
                state: ProviderState {
                    id: provider.id().to_string(),
                    priority,
                    enabled: AtomicBool::new(true),
                },
                provider,
            })
            .collect();

        Self {
            slots,
            history,
            history_window,
        }
    }

    pub fn has_enabled(&self) -> bool {
        self.slots.iter().any(|s| s.state.is_enabled())
    }

    pub fn statuses(&self) -> Vec<ProviderStatus> {
        self.slots
            .iter()
            .map(|s| ProviderStatus {
                id: s.state.id.clone(),
                model: s.provider.model().to_string(),
                priority: s.state.priority,
                enabled: s.state.is_enabled(),
            })
            .collect()
    }

    /// Ask providers in order for a reply. `None` if none of them produced text.
    pub async fn respond(&self, user_id: &str, user_text: &str) -> Option<String> {
        let recent = self.history.recent(user_id, MAX_HISTORY);
        let turns = prior_turns(recent, user_text, self.history_window);
        let prompt = build_prompt(&turns, user_text);
        debug!("Prompt for {user_id}: {} turns, {} chars", turns.len(), prompt.user.len());

        for slot in &self.slots {
            if !slot.state.is_enabled() {
                continue;
            }

            match invoke(slot.provider.as_ref(), &prompt).await {
                Ok(text) => {
                    let text = text.trim();
                    if !text.is_empty() {
                        info!("🤖 {} replied ({} chars)", slot.state.id, text.len());
                        return Some(text.to_string());
                    }
                    warn!("{} returned an empty reply, trying next", slot.state.id);
                }
                Err(e) => self.on_failure(slot, e),
            }
        }

        None
    }

    fn on_failure(&self, slot: &Slot, err: ProviderError) {
        if !err.kind.trips_breaker() {
            warn!("{} failed, trying next: {}", slot.state.id, err);
            return;
        }

        if slot.state.disable() {
            let hint = match err.kind {
                ProviderErrorKind::Auth => "check its api_key".to_string(),
                _ => format!("check that model '{}' exists for it", slot.provider.model()),
            };
            warn!(
                "⚠️ Disabling {} for this session ({}). Fix the config: {}",
                slot.state.id, err, hint
            );
        }
    }
}

/// Run one provider, collecting streamed fragments when it streams.
///
/// A stream that breaks after producing text counts as finished early.
async fn invoke(provider: &dyn Provider, prompt: &Prompt) -> Result<String, ProviderError> {
    if !provider.streaming() {
        return provider.generate(prompt).await;
    }

    let mut stream = provider.generate_stream(prompt);
    let mut collected = String::new();
    while let Some(fragment) = stream.next().await {
        match fragment {
            Ok(text) => collected.push_str(&text),
            Err(e) if collected.trim().is_empty() => return Err(e),
            Err(e) => {
                warn!("{} stream interrupted, keeping {} chars: {}", provider.id(), collected.len(), e);
                break;
            }
        }
    }
    Ok(collected)
}
