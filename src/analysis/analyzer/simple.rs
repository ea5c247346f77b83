//! Resource-free analyzer used when lemma data cannot be loaded.

use std::sync::Arc;

use crate::analysis::analyzer::Analyzer;
use crate::analysis::analyzer::pipeline::PipelineAnalyzer;
use crate::analysis::token::TokenStream;
use crate::analysis::token_filter::lowercase::LowercaseFilter;
use crate::analysis::tokenizer::unicode_word::UnicodeWordTokenizer;
use crate::error::Result;

/// Unicode word tokenizer plus lowercase. Never fails to construct.
#[derive(Debug, Clone)]
pub struct SimpleAnalyzer {
    inner: PipelineAnalyzer,
}

impl SimpleAnalyzer {
    pub fn new() -> Self {
        let inner = PipelineAnalyzer::new(Arc::new(UnicodeWordTokenizer::new()))
            .add_filter(Arc::new(LowercaseFilter::new()))
            .with_name("simple");

        SimpleAnalyzer { inner }
    }
}

impl Default for SimpleAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl Analyzer for SimpleAnalyzer {
    fn analyze(&self, text: &str) -> Result<TokenStream> {
        self.inner.analyze(text)
    }

    fn name(&self) -> &'static str {
        "simple"
    }
}
