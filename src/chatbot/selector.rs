//! Top-level reply policy: AI first, canned phrases otherwise, and the
//! occasional short reaction on top.

use std::sync::Mutex;

use rand::rngs::StdRng;
use rand::{RngExt, SeedableRng};
use tracing::debug;

use crate::chatbot::chain::ProviderChain;
use crate::chatbot::phrases::PhraseBook;
use crate::classifier::Category;

/// Default chance that a decided reply is swapped for a reaction.
pub const REACTION_PROBABILITY: f64 = 0.15;

/// Last-resort reply if every phrase set is somehow empty.
const FALLBACK_REPLY: &str = "haha";

pub struct ResponseSelector {
    chain: ProviderChain,
    phrases: PhraseBook,
    reaction_probability: f64,
    rng: Mutex<StdRng>,
}

impl ResponseSelector {
    pub fn new(chain: ProviderChain, phrases: PhraseBook, reaction_probability: f64) -> Self {
        Self {
            chain,
            phrases,
            reaction_probability: reaction_probability.clamp(0.0, 1.0),
            rng: Mutex::new(StdRng::from_rng(&mut rand::rng())),
        }
    }

    /// Use a fixed seed so phrase picks are reproducible.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Mutex::new(StdRng::seed_from_u64(seed));
        self
    }

    pub fn chain(&self) -> &ProviderChain {
        &self.chain
    }

    /// Decide the reply for a message. Never fails and never returns an empty string.
    pub async fn decide(&self, user_id: &str, user_text: &str, category: Category) -> String {
        let ai_reply = if self.chain.has_enabled() {
            self.chain.respond(user_id, user_text).await
        } else {
            None
        };

        let reply = match ai_reply {
            Some(reply) => reply,
            None => {
                debug!("No AI reply for {user_id}, using {category} phrases");
                self.local_reply(category)
            }
        };

        self.maybe_react(reply)
    }

    /// Uniform pick from the category's phrases.
    pub fn local_reply(&self, category: Category) -> String {
        self.pick(self.phrases.for_category(category))
            .unwrap_or_else(|| FALLBACK_REPLY.to_string())
    }

    /// With `reaction_probability`, replace the reply with a random reaction.
    fn maybe_react(&self, reply: String) -> String {
        let react = {
            let mut rng = self.lock_rng();
            rng.random_bool(self.reaction_probability)
        };
        if !react {
            return reply;
        }
        match self.pick(self.phrases.reactions()) {
            Some(reaction) => {
                debug!("Swapping reply for reaction {reaction:?}");
                reaction
            }
            None => reply,
        }
    }

    fn pick(&self, phrases: &[String]) -> Option<String> {
        if phrases.is_empty() {
            return None;
        }
        let idx = self.lock_rng().random_range(0..phrases.len());
        Some(phrases[idx].clone())
    }

    fn lock_rng(&self) -> std::sync::MutexGuard<'_, StdRng> {
        self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
