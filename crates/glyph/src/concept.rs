// created = "2026-10-17"
// modified = "2026-10-17"
// driver = "Isaac Clayton"

//! Concept dictionaries: words to small integer indices.
//!
//! Concept extraction is a lookup, not language understanding. Text is split
//! on whitespace, each word is normalized (lowercased, punctuation stripped),
//! and words the dictionary does not know are dropped.
//!
//! Indices live in `0..MAX_CONCEPTS`. The byte `0xFF` is never handed out
//! because the artifact IR uses it to terminate concept runs.

use rustc_hash::FxHashMap;

/// Number of assignable concept indices (`0x00..=0xFE`).
pub const MAX_CONCEPTS: usize = 255;

/// A best-effort mapping between words and concept indices.
///
/// Implementations must be stable for the lifetime of a session: the same
/// word always maps to the same index and back.
pub trait ConceptDictionary {
    /// Look up the index of a word. The word is normalized first.
    fn get_index(&self, word: &str) -> Option<u8>;

    /// Look up the word for an index.
    fn get_concept(&self, index: u8) -> Option<&str>;
}

/// Lowercase a word and strip everything that is not alphanumeric.
pub fn normalize_word(word: &str) -> String {
    return word
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(|c| c.to_lowercase())
        .collect();
}

/// Extract the concept sequence of a piece of text.
pub fn extract_concepts<D: ConceptDictionary + ?Sized>(text: &str, dictionary: &D) -> Vec<u8> {
    return text
        .split_whitespace()
        .filter_map(|word| dictionary.get_index(word))
        .collect();
}

/// An in-memory vocabulary that assigns indices in insertion order.
#[derive(Clone, Debug, Default)]
pub struct Vocabulary {
    word_to_idx: FxHashMap<String, u8>,
    idx_to_word: Vec<String>,
}

impl Vocabulary {
    /// Create an empty vocabulary.
    pub fn new() -> Vocabulary {
        return Vocabulary {
            word_to_idx: FxHashMap::default(),
            idx_to_word: Vec::new(),
        };
    }

    /// Build a vocabulary from a list of words, skipping duplicates.
    /// Words past capacity are ignored.
    pub fn from_words<I, S>(words: I) -> Vocabulary
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut vocab = Vocabulary::new();
        for word in words {
            vocab.intern(word.as_ref());
        }
        return vocab;
    }

    /// Build a vocabulary from every word of the given texts, in first-seen order.
    pub fn from_texts<I, S>(texts: I) -> Vocabulary
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut vocab = Vocabulary::new();
        for text in texts {
            for word in text.as_ref().split_whitespace() {
                vocab.intern(word);
            }
        }
        return vocab;
    }

    /// The default vocabulary: common English function words, the
    /// everyday nouns and adjectives that show up in reasoning traces,
    /// and a handful of domain terms.
    pub fn builtin() -> Vocabulary {
        return Vocabulary::from_words(BUILTIN_WORDS.iter());
    }

    /// Get or assign the index for a word.
    ///
    /// Returns `None` for words that normalize to nothing, or when the
    /// vocabulary is full and the word is new.
    pub fn intern(&mut self, word: &str) -> Option<u8> {
        let word = normalize_word(word);
        if word.is_empty() {
            return None;
        }
        if let Some(&idx) = self.word_to_idx.get(&word) {
            return Some(idx);
        }
        if self.is_full() {
            return None;
        }
        let idx = self.idx_to_word.len() as u8;
        self.idx_to_word.push(word.clone());
        self.word_to_idx.insert(word, idx);
        return Some(idx);
    }

    /// Number of known words.
    pub fn len(&self) -> usize {
        return self.idx_to_word.len();
    }

    /// Check if the vocabulary is empty.
    pub fn is_empty(&self) -> bool {
        return self.idx_to_word.is_empty();
    }

    /// Check if every index has been assigned.
    pub fn is_full(&self) -> bool {
        return self.idx_to_word.len() >= MAX_CONCEPTS;
    }

    /// Iterate over `(index, word)` pairs in index order.
    pub fn iter(&self) -> impl Iterator<Item = (u8, &str)> {
        return self
            .idx_to_word
            .iter()
            .enumerate()
            .map(|(i, w)| (i as u8, w.as_str()));
    }
}

impl ConceptDictionary for Vocabulary {
    fn get_index(&self, word: &str) -> Option<u8> {
        return self.word_to_idx.get(&normalize_word(word)).copied();
    }

    fn get_concept(&self, index: u8) -> Option<&str> {
        return self.idx_to_word.get(index as usize).map(|w| w.as_str());
    }
}

const BUILTIN_WORDS: &[&str] = &[
    // Function words
    "the", "a", "an", "and", "or", "not", "no", "of", "to", "in", "on", "at",
    "for", "with", "from", "by", "as", "is", "are", "was", "were", "be",
    "been", "has", "have", "had", "do", "does", "did", "can", "will", "shall",
    "should", "must", "may", "might", "if", "then", "else", "because", "so",
    "but", "that", "this", "these", "those", "it", "its", "they", "we", "you",
    "all", "any", "some", "every", "each", "more", "less", "most", "very",
    "than", "when", "where", "which", "what", "who", "why", "how",
    // Reasoning
    "true", "false", "yes", "maybe", "always", "never", "therefore", "implies",
    "equal", "equals", "greater", "smaller", "same", "different", "cause",
    "effect", "result", "answer", "question", "reason", "fact", "rule",
    "check", "compute", "sum", "plus", "minus", "times", "divided", "number",
    "zero", "one", "two", "three", "four", "five", "ten", "hundred",
    // World
    "sky", "sun", "moon", "star", "earth", "water", "fire", "air", "light",
    "dark", "day", "night", "time", "year", "grass", "tree", "leaf", "plant",
    "animal", "dog", "cat", "bird", "fish", "person", "people", "child",
    "city", "country", "world", "home", "road", "car", "food", "heat", "cold",
    "rain", "snow", "ice", "sea", "river", "mountain", "stone", "metal", "wood",
    // Properties
    "blue", "green", "red", "yellow", "white", "black", "wet", "dry", "hot",
    "warm", "big", "small", "large", "fast", "slow", "high", "low", "long",
    "short", "old", "new", "good", "bad", "heavy", "bright", "hard", "soft",
    "open", "closed", "full", "empty", "safe", "danger",
    // Actions
    "become", "make", "take", "give", "go", "come", "see", "know", "think",
    "learn", "use", "find", "need", "move", "grow", "fall", "rise", "flow",
    "reflect", "absorb", "scatter", "freeze", "melt", "boil",
    // Domain
    "knowledge", "model", "network", "signal", "protocol", "memory", "data",
    "search", "tool", "agent", "swarm", "consensus", "merge", "state",
    "heart", "blood", "pressure", "oxygen", "emergency", "response",
];
