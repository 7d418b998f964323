use lectern_core::ScoredChunk;
use serde::Serialize;
use unicode_segmentation::UnicodeSegmentation;

/// Ranked chunk text handed to a generation step, plus the indices it cites.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PromptContext {
    pub text: String,
    pub chunk_indices: Vec<usize>,
}

impl PromptContext {
    pub fn from_ranked(ranked: &[ScoredChunk]) -> Self {
        Self {
            text: ranked
                .iter()
                .map(|hit| hit.chunk.content.as_str())
                .collect::<Vec<_>>()
                .join("\n\n"),
            chunk_indices: ranked.iter().map(|hit| hit.chunk.chunk_index).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.chunk_indices.is_empty()
    }
}

pub fn snippet(input: &str, max_chars: usize) -> String {
    let compact = input.split_whitespace().collect::<Vec<_>>().join(" ");
    if compact.graphemes(true).count() <= max_chars {
        compact
    } else {
        compact.graphemes(true).take(max_chars).collect::<String>() + "..."
    }
}

#[cfg(test)]
mod tests {
    use lectern_core::Chunk;

    use super::*;

    #[test]
    fn context_joins_ranked_chunks_in_rank_order() {
        let ranked = vec![
            ScoredChunk {
                chunk: Chunk::new(4, "second half"),
                score: 2,
            },
            ScoredChunk {
                chunk: Chunk::new(1, "first half"),
                score: 1,
            },
        ];

        let context = PromptContext::from_ranked(&ranked);
        assert_eq!(context.text, "second half\n\nfirst half");
        assert_eq!(context.chunk_indices, vec![4, 1]);
        assert!(!context.is_empty());
        assert!(PromptContext::from_ranked(&[]).is_empty());
    }

    #[test]
    fn snippet_compacts_and_truncates() {
        assert_eq!(snippet("a  b\n\nc", 10), "a b c");
        assert_eq!(snippet("abcdefgh", 3), "abc...");
        assert_eq!(snippet("naïve café", 5), "naïve...");
    }
}
