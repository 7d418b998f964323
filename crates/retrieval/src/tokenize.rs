/// Function words ignored when scoring a query against chunk text.
pub const STOP_WORDS: [&str; 20] = [
    "the", "is", "at", "which", "on", "a", "an", "and", "or", "but", "in", "with", "to", "for",
    "of", "as", "by", "this", "that", "it",
];

/// Lower-cased, whitespace-split query terms with stop words removed.
///
/// Each term appears once, in first-seen order.
pub fn query_terms(query: &str) -> Vec<String> {
    let mut terms: Vec<String> = Vec::new();

    for token in query.to_lowercase().split_whitespace() {
        if STOP_WORDS.contains(&token) || terms.iter().any(|term| term == token) {
            continue;
        }
        terms.push(token.to_string());
    }

    terms
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drops_stop_words_and_lowercases() {
        assert_eq!(
            query_terms("What is The Role of   Attention in transformers"),
            vec!["what", "role", "attention", "transformers"]
        );
    }

    #[test]
    fn repeated_terms_are_kept_once() {
        assert_eq!(query_terms("Deep deep DEEP learning"), vec!["deep", "learning"]);
    }

    #[test]
    fn punctuation_stays_attached() {
        assert_eq!(query_terms("networks?"), vec!["networks?"]);
    }

    #[test]
    fn blank_or_stop_word_queries_have_no_terms() {
        assert!(query_terms("").is_empty());
        assert!(query_terms("   \t ").is_empty());
        assert!(query_terms("the and of it").is_empty());
    }
}
