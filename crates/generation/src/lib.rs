mod extractive;

use std::env;
use std::sync::Arc;

use anyhow::Result;
use lectern_retrieval::PromptContext;
use tracing::warn;

pub use extractive::ExtractiveGenerator;

/// Text generation over a ranked document context.
///
/// Hosted model clients live behind this trait; the crate itself only ships
/// the offline [`ExtractiveGenerator`].
pub trait AnswerGenerator: Send + Sync {
    fn model_name(&self) -> &'static str;
    fn answer(&self, question: &str, context: &PromptContext) -> Result<String>;
    fn explain(&self, concept: &str, context: &PromptContext) -> Result<String>;
    /// Condenses a whole document's extracted text.
    fn summarize(&self, text: &str) -> Result<String>;
}

#[derive(Clone)]
pub struct GeneratorStack {
    pub generator: Arc<dyn AnswerGenerator>,
}

impl GeneratorStack {
    pub fn new(generator: Arc<dyn AnswerGenerator>) -> Self {
        Self { generator }
    }

    pub fn load_default() -> Self {
        let requested = env::var("LECTERN_GENERATOR").unwrap_or_else(|_| "extractive".to_string());

        match requested.trim().to_lowercase().as_str() {
            "extractive" => {}
            other => warn!(generator = %other, "unknown generator, using extractive"),
        }

        Self::new(Arc::new(ExtractiveGenerator::default()))
    }

    pub fn model_name(&self) -> &'static str {
        self.generator.model_name()
    }
}
