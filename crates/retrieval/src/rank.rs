use lectern_core::{Chunk, ScoredChunk};

use crate::tokenize::query_terms;

/// Number of `terms` found anywhere in `content`, ignoring case.
///
/// Matching is by substring, so a term also hits longer words containing it
/// ("cat" scores against "category"). A term counts at most once.
pub fn score_chunk(content: &str, terms: &[String]) -> u32 {
    let haystack = content.to_lowercase();
    terms
        .iter()
        .filter(|term| haystack.contains(term.as_str()))
        .count() as u32
}

/// Ranks `chunks` against `query` and keeps the best `max_chunks`.
///
/// Chunks scoring zero are dropped. Higher scores come first; equal scores
/// keep reading order (`chunk_index` ascending, then input order).
pub fn find_relevant_chunks(chunks: &[Chunk], query: &str, max_chunks: usize) -> Vec<ScoredChunk> {
    if chunks.is_empty() || max_chunks == 0 {
        return Vec::new();
    }

    let terms = query_terms(query);
    if terms.is_empty() {
        return Vec::new();
    }

    let mut scored = chunks
        .iter()
        .filter_map(|chunk| {
            let score = score_chunk(&chunk.content, &terms);
            (score > 0).then(|| ScoredChunk {
                chunk: chunk.clone(),
                score,
            })
        })
        .collect::<Vec<_>>();

    scored.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then_with(|| a.chunk.chunk_index.cmp(&b.chunk.chunk_index))
    });
    scored.truncate(max_chunks);
    scored
}
