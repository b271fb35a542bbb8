use regex::Regex;
use std::sync::OnceLock;

use crate::analysis::analyzer::Analyzer;
use crate::core::types::TextProfile;

fn url_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"https?://\S+|www\.\S+").expect("static url regex"))
}

fn punctuation_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^\w\s]").expect("static punctuation regex"))
}

/// Normalises raw text into a sequence of canonical terms. Implementations
/// are shared across indexing (`Document`), search (`Query`), and
/// autocomplete input — the profile controls which steps run.
pub trait TextPreprocessor: Send + Sync {
    fn preprocess(&self, text: &str, profile: TextProfile) -> Vec<String>;
}

/// The shipped implementation: strip URLs, normalise punctuation, tokenize
/// on Unicode word boundaries, filter by token length, and — for
/// `Document`/`Query` — drop stopwords and stem.
pub struct StandardPreprocessor {
    document_analyzer: Analyzer,
    autocomplete_analyzer: Analyzer,
    min_token_length: usize,
    max_token_length: usize,
}

impl StandardPreprocessor {
    pub fn new(min_token_length: usize, max_token_length: usize) -> Self {
        StandardPreprocessor {
            document_analyzer: Analyzer::standard_english(),
            autocomplete_analyzer: Analyzer::autocomplete_english(),
            min_token_length,
            max_token_length,
        }
    }

    fn clean(&self, text: &str) -> String {
        let no_urls = url_pattern().replace_all(text, " ");
        punctuation_pattern().replace_all(&no_urls, " ").to_string()
    }
}

impl Default for StandardPreprocessor {
    fn default() -> Self {
        StandardPreprocessor::new(1, 64)
    }
}

impl TextPreprocessor for StandardPreprocessor {
    fn preprocess(&self, text: &str, profile: TextProfile) -> Vec<String> {
        let cleaned = self.clean(text);

        let analyzer = match profile {
            TextProfile::Autocomplete => &self.autocomplete_analyzer,
            TextProfile::Document | TextProfile::Query => &self.document_analyzer,
        };

        analyzer
            .analyze(&cleaned)
            .into_iter()
            .map(|t| t.text)
            .filter(|t| t.len() >= self.min_token_length && t.len() <= self.max_token_length)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_urls_and_stems_document_profile() {
        let pre = StandardPreprocessor::default();
        let tokens = pre.preprocess("Check out https://example.com/foo for the runners", TextProfile::Document);
        assert!(!tokens.iter().any(|t| t.contains("http")));
        assert!(tokens.contains(&"runner".to_string()) || tokens.contains(&"run".to_string()));
    }

    #[test]
    fn autocomplete_profile_keeps_stopwords() {
        let pre = StandardPreprocessor::default();
        let tokens = pre.preprocess("the cat sat", TextProfile::Autocomplete);
        assert_eq!(tokens, vec!["the", "cat", "sat"]);
    }
}
