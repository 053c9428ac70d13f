//! Word validation and prompt generation
//!
//! The corpus is injected as a read-only `WordList`; the dictionary only adds
//! per-match history on top of it.

use rand::Rng;
use std::collections::HashSet;
use std::sync::Arc;

/// Read-only word lookup capability
pub trait WordList: Send + Sync {
    /// Whether `word` (already lower-cased) is an acceptable word
    fn contains(&self, word: &str) -> bool;

    /// Words prompts may be cut from; each has at least two characters
    fn prompt_words(&self) -> &[String];
}

/// Corpus loading errors
#[derive(Debug, thiserror::Error)]
pub enum CorpusError {
    #[error("Word list contains no usable words")]
    Empty,

    #[error("Failed to read word list: {0}")]
    Io(#[from] std::io::Error),
}

/// In-memory corpus
#[derive(Debug, Clone)]
pub struct Corpus {
    words: HashSet<String>,
    prompt_words: Vec<String>,
}

impl Corpus {
    /// Build a corpus from raw words. Entries are trimmed and lower-cased.
    pub fn from_words<I, S>(words: I) -> Result<Self, CorpusError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let words: HashSet<String> = words
            .into_iter()
            .map(|w| normalize(w.as_ref()))
            .filter(|w| !w.is_empty())
            .collect();

        let mut prompt_words: Vec<String> = words
            .iter()
            .filter(|w| w.chars().count() >= 2)
            .cloned()
            .collect();
        if prompt_words.is_empty() {
            return Err(CorpusError::Empty);
        }
        // HashSet order is random; keep sampling reproducible for a given seed
        prompt_words.sort_unstable();

        Ok(Self {
            words,
            prompt_words,
        })
    }

    /// Build a corpus whose prompts come only from `prompt_source`.
    ///
    /// Prompt words missing from `words` are skipped so every prompt can be
    /// answered with at least one valid word.
    pub fn with_prompt_source<I, S, P, T>(words: I, prompt_source: P) -> Result<Self, CorpusError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
        P: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let mut corpus = Self::from_words(words)?;
        let mut prompt_words: Vec<String> = prompt_source
            .into_iter()
            .map(|w| normalize(w.as_ref()))
            .filter(|w| w.chars().count() >= 2 && corpus.words.contains(w))
            .collect();
        if prompt_words.is_empty() {
            return Err(CorpusError::Empty);
        }
        prompt_words.sort_unstable();
        prompt_words.dedup();
        corpus.prompt_words = prompt_words;
        Ok(corpus)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

impl WordList for Corpus {
    fn contains(&self, word: &str) -> bool {
        self.words.contains(word)
    }

    fn prompt_words(&self) -> &[String] {
        &self.prompt_words
    }
}

/// Canonical form used for lookups, history and substring checks
pub fn normalize(word: &str) -> String {
    word.trim().to_lowercase()
}

/// Per-match dictionary: corpus plus used-word history
pub struct Dictionary {
    words: Arc<dyn WordList>,
    word_history: HashSet<String>,
    substring_history: Vec<String>,
}

impl Dictionary {
    pub fn new(words: Arc<dyn WordList>) -> Self {
        Self {
            words,
            word_history: HashSet::new(),
            substring_history: Vec::new(),
        }
    }

    /// Random 2-3 character slice of a random corpus word, lower-cased
    pub fn generate_substring<R: Rng>(&mut self, rng: &mut R) -> String {
        let pool = self.words.prompt_words();
        if pool.is_empty() {
            return String::new();
        }

        let chars: Vec<char> = pool[rng.gen_range(0..pool.len())].chars().collect();
        let len = rng.gen_range(2usize..=3).min(chars.len());
        let start = rng.gen_range(0..=chars.len() - len);
        let substring: String = chars[start..start + len].iter().collect::<String>().to_lowercase();

        self.substring_history.push(substring.clone());
        substring
    }

    /// True iff the word is in the corpus and unused this match
    pub fn validate_word(&self, word: &str) -> bool {
        let word = normalize(word);
        self.words.contains(&word) && !self.word_history.contains(&word)
    }

    /// Mark a word as used. Invalid words are not recorded.
    pub fn add_word_to_history(&mut self, word: &str) -> bool {
        if !self.validate_word(word) {
            return false;
        }
        self.word_history.insert(normalize(word))
    }

    /// Forget used words and prompts (new match)
    pub fn clear_history(&mut self) {
        self.word_history.clear();
        self.substring_history.clear();
    }

    pub fn words_used(&self) -> usize {
        self.word_history.len()
    }

    pub fn substring_history(&self) -> &[String] {
        &self.substring_history
    }
}
