//! Word-level perspective reflection ("my" → "your", "i" → "you", ...).
//!
//! Captured text is echoed back from the agent's point of view, so a rule
//! capturing `"my ship"` answers with `"your ship"`. Keys are stored
//! lowercase and lookups are case-insensitive; words without an entry pass
//! through untouched.
//!
//! A key may span two words (`"i am"`). Verbs like "am" and "was" only
//! change with the subject in front of them, so "the door was open" is left
//! alone while "I was wrong" becomes "you were wrong".

use std::collections::HashMap;

/// Built-in pronoun and possessive swaps.
const DEFAULT_REFLECTIONS: &[(&str, &str)] = &[
    ("i", "you"),
    ("i'm", "you are"),
    ("i'd", "you would"),
    ("i've", "you have"),
    ("i'll", "you will"),
    ("i am", "you are"),
    ("i was", "you were"),
    ("my", "your"),
    ("me", "you"),
    ("you", "me"),
    ("you are", "I am"),
    ("you were", "I was"),
    ("you've", "I have"),
    ("you'll", "I will"),
    ("your", "my"),
    ("yours", "mine"),
];

/// Immutable word → word mapping applied to captured text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReflectionMap {
    words: HashMap<String, String>,
}

impl ReflectionMap {
    /// Build a map from arbitrary pairs. Keys are normalized to lowercase
    /// with single spaces between words.
    pub fn new<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: AsRef<str>,
        V: Into<String>,
    {
        let words = pairs
            .into_iter()
            .map(|(k, v)| (normalize_key(k.as_ref()), v.into()))
            .collect();
        Self { words }
    }

    /// A map with no entries; reflection only normalizes whitespace.
    pub fn empty() -> Self {
        Self {
            words: HashMap::new(),
        }
    }

    /// Look up a word or a two-word phrase.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.words.get(&normalize_key(key)).map(String::as_str)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// Whether the map has no entries.
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Reflect `text` and rejoin with single spaces.
    ///
    /// Two-word keys win over single words, scanning left to right.
    pub fn reflect(&self, text: &str) -> String {
        let words: Vec<&str> = text.split_whitespace().collect();
        let mut out = Vec::with_capacity(words.len());
        let mut i = 0;
        while i < words.len() {
            if let Some(&next) = words.get(i + 1) {
                let pair = format!("{} {next}", words[i]);
                if let Some(reflected) = self.get(&pair) {
                    out.push(reflected);
                    i += 2;
                    continue;
                }
            }
            out.push(self.get(words[i]).unwrap_or(words[i]));
            i += 1;
        }
        out.join(" ")
    }
}

fn normalize_key(key: &str) -> String {
    key.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

impl Default for ReflectionMap {
    fn default() -> Self {
        Self::new(DEFAULT_REFLECTIONS.iter().copied())
    }
}
