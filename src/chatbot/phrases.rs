//! Canned replies used when no AI provider answers.

use std::collections::HashMap;

use tracing::warn;

use crate::classifier::Category;

const HELLO: &[&str] = &["heyyy", "yo what's up", "hey hey", "ayy hi!", "oh hey, long time"];
const HI: &[&str] = &["hiii", "hi hi", "hello there :)", "hii whats good"];
const HOW_ARE_YOU: &[&str] = &[
    "doing alright, you?",
    "pretty good tbh, wbu",
    "eh, surviving lol. you?",
    "chillin, how about you",
];
const THANKS: &[&str] = &["anytime!", "np np", "of course :)", "no worries"];
const BYE: &[&str] = &["later!", "cya", "byee, talk soon", "take care!"];
const FUNNY: &[&str] = &["LMAOO", "stoppp 😭", "i can't with you", "dead 💀"];
const RANDOM: &[&str] = &[
    "fr?",
    "hmm tell me more",
    "wait really",
    "that's wild",
    "ok but why tho",
    "interesting...",
];

const REACTIONS: &[&str] = &["😂", "👀", "ngl same", "oof", "bruh", "💯", "true true"];

/// Phrase sets per category plus the short reaction set.
///
/// Every set handed out is non-empty.
#[derive(Debug, Clone)]
pub struct PhraseBook {
    by_category: HashMap<Category, Vec<String>>,
    reactions: Vec<String>,
}

fn owned(phrases: &[&str]) -> Vec<String> {
    phrases.iter().map(|p| p.to_string()).collect()
}

fn clean(phrases: Vec<String>) -> Vec<String> {
    phrases
        .into_iter()
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect()
}

impl PhraseBook {
    /// Apply overrides on top of the built-in phrases. Empty overrides are ignored.
    pub fn with_overrides(
        overrides: HashMap<Category, Vec<String>>,
        reactions: Vec<String>,
    ) -> Self {
        let mut book = Self::default();
        for (category, phrases) in overrides {
            let phrases = clean(phrases);
            if phrases.is_empty() {
                warn!("Ignoring empty phrase override for {category}");
                continue;
            }
            book.by_category.insert(category, phrases);
        }
        let reactions = clean(reactions);
        if !reactions.is_empty() {
            book.reactions = reactions;
        }
        book
    }

    /// Phrases for a category, falling back to the `random` set.
    pub fn for_category(&self, category: Category) -> &[String] {
        self.by_category
            .get(&category)
            .filter(|set| !set.is_empty())
            .or_else(|| self.by_category.get(&Category::Random))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn reactions(&self) -> &[String] {
        &self.reactions
    }

    #[cfg(test)]
    pub(crate) fn without(mut self, category: Category) -> Self {
        self.by_category.remove(&category);
        self
    }
}

impl Default for PhraseBook {
    fn default() -> Self {
        let by_category = HashMap::from([
            (Category::Hello, owned(HELLO)),
            (Category::Hi, owned(HI)),
            (Category::HowAreYou, owned(HOW_ARE_YOU)),
            (Category::Thanks, owned(THANKS)),
            (Category::Bye, owned(BYE)),
            (Category::Funny, owned(FUNNY)),
            (Category::Random, owned(RANDOM)),
        ]);
        Self {
            by_category,
            reactions: owned(REACTIONS),
        }
    }
}
