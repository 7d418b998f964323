use anyhow::Result;
use lectern_retrieval::{snippet, PromptContext};

use crate::AnswerGenerator;

/// Answers by quoting the ranked context back, with no model call.
#[derive(Debug, Clone)]
pub struct ExtractiveGenerator {
    max_chars: usize,
}

impl ExtractiveGenerator {
    pub fn new(max_chars: usize) -> Self {
        Self {
            max_chars: max_chars.max(40),
        }
    }
}

impl Default for ExtractiveGenerator {
    fn default() -> Self {
        Self::new(1_200)
    }
}

impl AnswerGenerator for ExtractiveGenerator {
    fn model_name(&self) -> &'static str {
        "extractive"
    }

    fn answer(&self, question: &str, context: &PromptContext) -> Result<String> {
        if context.is_empty() {
            return Ok(format!(
                "The document does not seem to cover \"{}\".",
                question.trim()
            ));
        }

        Ok(format!(
            "From the document (sections {}):\n\n{}",
            cite(&context.chunk_indices),
            snippet(&context.text, self.max_chars)
        ))
    }

    fn explain(&self, concept: &str, context: &PromptContext) -> Result<String> {
        if context.is_empty() {
            return Ok(format!(
                "\"{}\" is not discussed in this document.",
                concept.trim()
            ));
        }

        Ok(format!(
            "{} as described in the document (sections {}):\n\n{}",
            concept.trim(),
            cite(&context.chunk_indices),
            snippet(&context.text, self.max_chars)
        ))
    }

    /// Lead sentence of every paragraph, in document order.
    fn summarize(&self, text: &str) -> Result<String> {
        let leads = text
            .split("\n\n")
            .map(str::trim)
            .filter(|paragraph| !paragraph.is_empty())
            .map(lead_sentence)
            .collect::<Vec<_>>();

        if leads.is_empty() {
            return Ok("This document has no extractable text to summarize.".to_string());
        }

        Ok(snippet(&leads.join(" "), self.max_chars))
    }
}

fn lead_sentence(paragraph: &str) -> &str {
    let mut chars = paragraph.char_indices().peekable();
    while let Some((index, ch)) = chars.next() {
        if matches!(ch, '.' | '!' | '?') {
            let at_boundary = chars
                .peek()
                .map_or(true, |(_, next)| next.is_whitespace());
            if at_boundary {
                return &paragraph[..index + ch.len_utf8()];
            }
        }
    }
    paragraph
}

fn cite(indices: &[usize]) -> String {
    indices
        .iter()
        .map(|index| index.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> PromptContext {
        PromptContext {
            text: "Enzymes lower activation energy.\n\nThey are proteins.".to_string(),
            chunk_indices: vec![3, 0],
        }
    }

    #[test]
    fn answer_quotes_context_and_cites_chunks() {
        let answer = ExtractiveGenerator::default()
            .answer("what do enzymes do", &context())
            .unwrap();
        assert!(answer.contains("sections 3, 0"));
        assert!(answer.contains("Enzymes lower activation energy. They are proteins."));
    }

    #[test]
    fn empty_context_says_so() {
        let generator = ExtractiveGenerator::default();
        let answer = generator
            .answer(" quasars ", &PromptContext::default())
            .unwrap();
        assert_eq!(answer, "The document does not seem to cover \"quasars\".");

        let explanation = generator
            .explain("quasars", &PromptContext::default())
            .unwrap();
        assert!(explanation.contains("not discussed"));
    }

    #[test]
    fn summary_keeps_each_paragraph_lead() {
        let text = "Cells are the unit of life. They divide.\n\n\
            DNA stores genetic information! Is it copied?\n\n\
            No terminal punctuation here";
        let summary = ExtractiveGenerator::default().summarize(text).unwrap();
        assert_eq!(
            summary,
            "Cells are the unit of life. DNA stores genetic information! \
             No terminal punctuation here"
        );
    }

    #[test]
    fn summary_of_empty_text_says_so() {
        let summary = ExtractiveGenerator::default().summarize(" \n\n ").unwrap();
        assert!(summary.contains("no extractable text"));
    }

    #[test]
    fn long_context_is_truncated() {
        let generator = ExtractiveGenerator::new(40);
        let long = PromptContext {
            text: "word ".repeat(200),
            chunk_indices: vec![0],
        };
        let explanation = generator.explain("word", &long).unwrap();
        assert!(explanation.ends_with("..."));
    }
}
