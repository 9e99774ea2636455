//! Prompt construction for the AI providers.

use crate::chatbot::history::HistoryEntry;
use crate::chatbot::provider::Prompt;

pub const SYSTEM_PROMPT: &str = "You're texting with a close friend. You are their friend, a real person, \
and you never mention being an AI, a bot, or an assistant, even if asked. \
Keep replies short: one or two sentences, like a text message. \
Be casual and warm, use lowercase and mild slang (lol, tbh, ngl) when it fits, \
and don't use lists, headings, or formal language.";

/// Build the prompt from prior turns (oldest first) and the new message.
pub fn build_prompt(history: &[HistoryEntry], text: &str) -> Prompt {
    let mut user = String::new();
    if !history.is_empty() {
        user.push_str("Chat so far:\n");
        for entry in history {
            user.push_str(&entry.format());
            user.push('\n');
        }
        user.push('\n');
    }
    user.push_str(&format!("You: {text}\nFriend:"));

    Prompt {
        system: SYSTEM_PROMPT.to_string(),
        user,
    }
}

/// Turns that came before the inbound message, at most `window` of them.
///
/// The inbound message is already recorded, so everything from its entry on is
/// cut. Messages that landed after it (another handler for the same user) are
/// not prior turns either.
pub fn prior_turns(mut recent: Vec<HistoryEntry>, text: &str, window: usize) -> Vec<HistoryEntry> {
    if let Some(pos) = recent.iter().rposition(|e| !e.is_bot && e.text == text) {
        recent.truncate(pos);
    }
    let skip = recent.len().saturating_sub(window);
    recent.split_off(skip)
}
