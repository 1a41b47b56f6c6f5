use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Tokens of at least two word characters; hyphens count as word characters.
const WORD_TOKEN_PATTERN: &str = r"\b[\w-]{2,}\b";
const WHITESPACE_RUN_PATTERN: &str = r"\s\s+";

/// How a document is cut into candidate terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Analyzer {
    /// Word n-grams joined by a single space.
    Word,
    /// Contiguous character windows over whitespace-normalised text.
    Char,
}

impl Analyzer {
    /// Every n-gram of `text` for sizes `min_n..=max_n`, in generation order
    /// and with repeats (callers count them).
    pub fn terms(self, text: &str, (min_n, max_n): (usize, usize), lowercase: bool) -> Vec<String> {
        let text = if lowercase {
            text.to_lowercase()
        } else {
            text.to_string()
        };
        match self {
            Analyzer::Word => word_ngrams(&text, min_n, max_n),
            Analyzer::Char => char_ngrams(&text, min_n, max_n),
        }
    }
}

fn word_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(WORD_TOKEN_PATTERN).ok()).as_ref()
}

fn whitespace_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(WHITESPACE_RUN_PATTERN).ok()).as_ref()
}

pub fn word_tokens(text: &str) -> Vec<&str> {
    match word_pattern() {
        Some(re) => re.find_iter(text).map(|m| m.as_str()).collect(),
        None => Vec::new(),
    }
}

fn word_ngrams(text: &str, min_n: usize, max_n: usize) -> Vec<String> {
    let tokens = word_tokens(text);
    let mut out = Vec::new();
    for n in min_n.max(1)..=max_n {
        if n > tokens.len() {
            break;
        }
        for window in tokens.windows(n) {
            out.push(window.join(" "));
        }
    }
    out
}

fn char_ngrams(text: &str, min_n: usize, max_n: usize) -> Vec<String> {
    let normalized = match whitespace_pattern() {
        Some(re) => re.replace_all(text, " ").into_owned(),
        None => text.to_string(),
    };
    let chars: Vec<char> = normalized.chars().collect();
    let mut out = Vec::new();
    for n in min_n.max(1)..=max_n {
        if n > chars.len() {
            break;
        }
        for window in chars.windows(n) {
            out.push(window.iter().collect());
        }
    }
    out
}
