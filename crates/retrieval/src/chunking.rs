use lectern_core::{Chunk, ChunkingConfig};
use once_cell::sync::Lazy;
use regex::Regex;

const PARAGRAPH_BREAK: &str = "\n\n";

static LINE_BREAKS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\r\n?|\x0C").expect("valid line break regex"));
static INLINE_WHITESPACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\S\n]+").expect("valid whitespace regex"));

/// Canonical form of extracted text: one space between words, one blank line
/// between paragraphs, nothing leading or trailing.
///
/// Every line break in the input marks a paragraph boundary; carriage returns
/// and form feeds left behind by PDF extraction count as line breaks.
pub fn normalize_text(input: &str) -> String {
    let unified = LINE_BREAKS.replace_all(input, "\n");
    let collapsed = INLINE_WHITESPACE.replace_all(&unified, " ");

    collapsed
        .split('\n')
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(PARAGRAPH_BREAK)
}

/// Splits `text` into overlapping word windows that respect paragraph
/// boundaries where they can.
///
/// Paragraphs are packed together until the next one would push the window
/// past `chunk_size` words; the following window then starts with the last
/// `overlap` words of the one just emitted. A paragraph longer than
/// `chunk_size` is cut into fixed windows advancing by `chunk_size - overlap`.
///
/// Empty or whitespace-only input yields no chunks.
pub fn chunk_text(text: &str, config: &ChunkingConfig) -> Vec<Chunk> {
    let normalized = normalize_text(text);
    if normalized.is_empty() {
        return Vec::new();
    }

    normalized
        .split(PARAGRAPH_BREAK)
        .fold(ChunkAccumulator::new(*config), ChunkAccumulator::push)
        .finish()
}

struct ChunkAccumulator {
    config: ChunkingConfig,
    pending: Vec<String>,
    pending_words: usize,
    chunks: Vec<Chunk>,
}

impl ChunkAccumulator {
    fn new(config: ChunkingConfig) -> Self {
        Self {
            config,
            pending: Vec::new(),
            pending_words: 0,
            chunks: Vec::new(),
        }
    }

    fn push(mut self, paragraph: &str) -> Self {
        let words = paragraph.split_whitespace().collect::<Vec<_>>();
        if words.is_empty() {
            return self;
        }

        if words.len() > self.config.chunk_size() {
            self.flush();
            self.emit_windows(&words);
            return self;
        }

        if !self.pending.is_empty() && self.pending_words + words.len() > self.config.chunk_size()
        {
            self.flush();

            let (carry, carry_words) = self
                .chunks
                .last()
                .map(|chunk| tail_words(&chunk.content, self.config.overlap()))
                .unwrap_or_default();

            if carry_words > 0 {
                self.pending.push(carry);
            }
            self.pending.push(paragraph.to_string());
            self.pending_words = carry_words + words.len();
        } else {
            self.pending.push(paragraph.to_string());
            self.pending_words += words.len();
        }

        self
    }

    fn emit_windows(&mut self, words: &[&str]) {
        let size = self.config.chunk_size();
        let step = self.config.step();
        let mut start = 0;

        loop {
            let end = (start + size).min(words.len());
            self.emit(words[start..end].join(" "));
            if end >= words.len() {
                break;
            }
            start += step;
        }
    }

    fn flush(&mut self) {
        if self.pending.is_empty() {
            return;
        }

        let content = self.pending.join(PARAGRAPH_BREAK);
        self.pending.clear();
        self.pending_words = 0;
        self.emit(content);
    }

    fn emit(&mut self, content: String) {
        let index = self.chunks.len();
        self.chunks.push(Chunk::new(index, content));
    }

    fn finish(mut self) -> Vec<Chunk> {
        self.flush();
        self.chunks
    }
}

fn tail_words(content: &str, count: usize) -> (String, usize) {
    let words = content.split_whitespace().collect::<Vec<_>>();
    let take = count.min(words.len());
    (words[words.len() - take..].join(" "), take)
}
