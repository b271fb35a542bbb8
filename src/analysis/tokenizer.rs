use crate::analysis::token::Token;
use unicode_segmentation::UnicodeSegmentation;

/// Splits raw text into a sequence of `Token`s. `Analyzer` holds one of
/// these behind a `Box` so document and query text can share the same
/// pipeline shape even though only `StandardTokenizer` is shipped.
pub trait Tokenizer: Send + Sync {
    fn tokenize(&self, text: &str) -> Vec<Token>;
}

/// Splits on Unicode word boundaries, optionally lowercasing and dropping
/// anything past `max_token_length` (subreddit titles occasionally contain
/// pathological unbroken strings — emoji runs, base64 blobs — that would
/// otherwise dominate a document's term statistics).
#[derive(Clone)]
pub struct StandardTokenizer {
    pub lowercase: bool,
    pub max_token_length: usize,
}

impl Default for StandardTokenizer {
    fn default() -> Self {
        StandardTokenizer { lowercase: true, max_token_length: 255 }
    }
}

impl Tokenizer for StandardTokenizer {
    fn tokenize(&self, text: &str) -> Vec<Token> {
        let mut tokens = Vec::new();
        let mut position = 0u32;

        for word in text.unicode_words() {
            if word.len() <= self.max_token_length {
                let token_text = if self.lowercase { word.to_lowercase() } else { word.to_string() };
                tokens.push(Token::new(token_text, position));
                position += 1;
            }
        }

        tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_word_boundaries_and_lowercases() {
        let tokenizer = StandardTokenizer::default();
        let tokens = tokenizer.tokenize("Rust's Async/Await!");
        let words: Vec<_> = tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(words, vec!["rust's", "async", "await"]);
    }

    #[test]
    fn drops_tokens_longer_than_the_limit() {
        let tokenizer = StandardTokenizer { lowercase: true, max_token_length: 4 };
        let tokens = tokenizer.tokenize("cat subreddit");
        let words: Vec<_> = tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(words, vec!["cat"]);
    }
}
