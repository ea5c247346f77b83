use std::fmt::Debug;
use std::fmt::Formatter;
use std::sync::Arc;

use crate::analysis::analyzer::Analyzer;
use crate::analysis::analyzer::pipeline::PipelineAnalyzer;
use crate::analysis::token::TokenStream;
use crate::analysis::token_filter::lowercase::LowercaseFilter;
use crate::analysis::token_filter::stem::{LemmaStemmer, StemFilter};
use crate::analysis::tokenizer::regex::RegexTokenizer;
use crate::error::Result;

/// Word/punctuation tokenizer, lowercase, then lemma reduction.
pub struct EnglishAnalyzer {
    inner: PipelineAnalyzer,
}

impl EnglishAnalyzer {
    /// Build the analyzer, loading the bundled lemma table.
    pub fn new() -> Result<Self> {
        Self::with_stemmer(LemmaStemmer::english()?)
    }

    /// Build the analyzer around an already loaded lemma table.
    pub fn with_stemmer(stemmer: LemmaStemmer) -> Result<Self> {
        let tokenizer = Arc::new(RegexTokenizer::word_and_punctuation()?);
        let analyzer = PipelineAnalyzer::new(tokenizer)
            .add_filter(Arc::new(LowercaseFilter::new()))
            .add_filter(Arc::new(StemFilter::with_stemmer(Box::new(stemmer))))
            .with_name("english");

        Ok(Self { inner: analyzer })
    }
}

impl Analyzer for EnglishAnalyzer {
    fn analyze(&self, text: &str) -> Result<TokenStream> {
        self.inner.analyze(text)
    }

    fn name(&self) -> &'static str {
        "english"
    }
}

impl Debug for EnglishAnalyzer {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnglishAnalyzer")
            .field("inner", &self.inner)
            .finish()
    }
}
