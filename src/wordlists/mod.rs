//! Word list sources
//!
//! Lists are plain text with words separated by any whitespace. The server
//! ships with a small embedded list; deployments point `DICTIONARY_PATH` at
//! a full one.

use std::fs;
use std::path::Path;
use tracing::info;

use crate::game::{Corpus, CorpusError};

/// Default list compiled into the binary
pub const EMBEDDED_WORDS: &str = include_str!("../../data/words.txt");

pub fn embedded() -> Result<Corpus, CorpusError> {
    Corpus::from_words(EMBEDDED_WORDS.split_whitespace())
}

fn read_words(path: &Path) -> Result<String, CorpusError> {
    Ok(fs::read_to_string(path)?)
}

/// Build the corpus from optional files, falling back to the embedded list.
///
/// With `prompt_path` set, prompts are cut only from words in that file
/// (typically a list of common words) while validation still uses the full
/// dictionary.
pub fn load(
    dictionary_path: Option<&Path>,
    prompt_path: Option<&Path>,
) -> Result<Corpus, CorpusError> {
    let dictionary = match dictionary_path {
        Some(path) => read_words(path)?,
        None => EMBEDDED_WORDS.to_string(),
    };

    let corpus = match prompt_path {
        Some(path) => {
            let prompts = read_words(path)?;
            Corpus::with_prompt_source(dictionary.split_whitespace(), prompts.split_whitespace())?
        }
        None => Corpus::from_words(dictionary.split_whitespace())?,
    };

    info!(
        words = corpus.len(),
        source = %dictionary_path.map_or("embedded".into(), |p| p.display().to_string()),
        "Dictionary loaded"
    );
    Ok(corpus)
}
