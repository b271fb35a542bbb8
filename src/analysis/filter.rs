use crate::analysis::token::Token;

/// One stage of the filter chain an `Analyzer` runs after tokenizing —
/// lowercasing, stopword removal, stemming.
pub trait TokenFilter: Send + Sync {
    fn filter(&self, tokens: Vec<Token>) -> Vec<Token>;
}
