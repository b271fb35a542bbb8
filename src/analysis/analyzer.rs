use rust_stemmers::Algorithm;

use crate::analysis::filter::TokenFilter;
use crate::analysis::filters::lowercase::LowercaseFilter;
use crate::analysis::filters::stemmer::StemmerFilter;
use crate::analysis::filters::stopword::StopWordFilter;
use crate::analysis::token::Token;
use crate::analysis::tokenizer::{StandardTokenizer, Tokenizer};
use crate::core::error::Result;

/// Text analysis pipeline: a tokenizer followed by a chain of filters.
pub struct Analyzer {
    pub tokenizer: Box<dyn Tokenizer>,
    pub filters: Vec<Box<dyn TokenFilter>>,
    pub name: String,
}

impl Analyzer {
    pub fn new(name: String, tokenizer: Box<dyn Tokenizer>) -> Self {
        Analyzer {
            tokenizer,
            filters: Vec::new(),
            name,
        }
    }

    pub fn add_filter(mut self, filter: Box<dyn TokenFilter>) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn analyze(&self, text: &str) -> Vec<Token> {
        let mut tokens = self.tokenizer.tokenize(text);

        for filter in &self.filters {
            tokens = filter.filter(tokens);
        }

        tokens
    }

    /// Full pipeline: stopwording and stemming included. Used for document
    /// bodies/titles and for queries.
    pub fn standard_english() -> Self {
        Analyzer::new("standard_english".to_string(), Box::new(StandardTokenizer::default()))
            .add_filter(Box::new(LowercaseFilter))
            .add_filter(Box::new(StopWordFilter::english()))
            .add_filter(Box::new(StemmerFilter::new(Algorithm::English)))
    }

    /// Tokenize + lowercase only, no stopwording or stemming — autocomplete
    /// input needs literal prefixes, not stemmed forms.
    pub fn autocomplete_english() -> Self {
        Analyzer::new("autocomplete_english".to_string(), Box::new(StandardTokenizer::default()))
            .add_filter(Box::new(LowercaseFilter))
    }
}

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::core::error::Error;

/// Registry for managing named analyzers, so the preprocessor can look one
/// up by profile without constructing it on every call.
pub struct AnalyzerRegistry {
    analyzers: Arc<RwLock<HashMap<String, Arc<Analyzer>>>>,
}

impl AnalyzerRegistry {
    pub fn new() -> Self {
        let registry = AnalyzerRegistry {
            analyzers: Arc::new(RwLock::new(HashMap::new())),
        };
        registry.register_defaults();
        registry
    }

    fn register_defaults(&self) {
        self.register("standard", Analyzer::standard_english());
        self.register("autocomplete", Analyzer::autocomplete_english());
    }

    pub fn register(&self, name: &str, analyzer: Analyzer) {
        let mut analyzers = self.analyzers.write().unwrap();
        analyzers.insert(name.to_string(), Arc::new(analyzer));
    }

    pub fn get(&self, name: &str) -> Option<Arc<Analyzer>> {
        let analyzers = self.analyzers.read().unwrap();
        analyzers.get(name).cloned()
    }

    pub fn analyze(&self, analyzer_name: &str, text: &str) -> Result<Vec<Token>> {
        self.get(analyzer_name)
            .map(|analyzer| analyzer.analyze(text))
            .ok_or_else(|| Error::NotFound(format!("analyzer '{analyzer_name}' not found")))
    }
}

impl Default for AnalyzerRegistry {
    fn default() -> Self {
        Self::new()
    }
}
