//! Rule-based message classification.
//!
//! Rules are checked in order and the first match wins, so a message like
//! "hey lol" is a greeting, not a joke.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Hello,
    Hi,
    HowAreYou,
    Thanks,
    Bye,
    Funny,
    Random,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Category::Hello,
        Category::Hi,
        Category::HowAreYou,
        Category::Thanks,
        Category::Bye,
        Category::Funny,
        Category::Random,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Hello => "hello",
            Category::Hi => "hi",
            Category::HowAreYou => "how_are_you",
            Category::Thanks => "thanks",
            Category::Bye => "bye",
            Category::Funny => "funny",
            Category::Random => "random",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

static RULES: LazyLock<Vec<(Regex, Category)>> = LazyLock::new(|| {
    [
        (r"^(hi|hey|hello|yo|sup|hiya|howdy|heya|hola)\b", Category::Hello),
        (r"\bhow\s+(are|r)?\s*(you|u|ya)\b", Category::HowAreYou),
        (r"^(thanks|thank you|thx|ty|cheers|appreciate)\b", Category::Thanks),
        (r"^(bye|goodbye|see ya|see you|later|cya|gn|good night|ttyl)\b", Category::Bye),
        (r"^hi", Category::Hi),
        (r"\b(lol+|lmao+|rofl|ha(ha)+h?|he(he)+|funny|hilarious|jokes?)\b|😂|🤣", Category::Funny),
    ]
    .into_iter()
    .map(|(p, category)| (Regex::new(p).unwrap(), category))
    .collect()
});

pub fn classify(text: &str) -> Category {
    let text = text.trim().to_lowercase();
    if text.is_empty() {
        return Category::Random;
    }

    RULES
        .iter()
        .find(|(pattern, _)| pattern.is_match(&text))
        .map(|(_, category)| *category)
        .unwrap_or(Category::Random)
}
