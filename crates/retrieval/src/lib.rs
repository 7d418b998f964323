//! Lexical chunking and retrieval over extracted document text.
//!
//! Everything here is pure and synchronous: [`chunk_text`] turns raw text into
//! overlapping word windows, [`find_relevant_chunks`] ranks those windows
//! against a free-text query, and [`PromptContext`] packages the winners for a
//! generation step.

mod chunking;
mod context;
mod rank;
mod tokenize;

pub use chunking::{chunk_text, normalize_text};
pub use context::{snippet, PromptContext};
pub use rank::{find_relevant_chunks, score_chunk};
pub use tokenize::{query_terms, STOP_WORDS};
