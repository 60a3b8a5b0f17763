//! Query and page term tokenization shared by the term index, the
//! term-overlap ranker, and the extractive answerer

use unicode_segmentation::UnicodeSegmentation;

const STOPWORDS: &[&str] = &[
    "the", "a", "an", "is", "are", "was", "were", "of", "in", "on", "at", "to", "for", "and",
    "or", "what", "which", "who", "how", "when", "where", "why", "do", "does", "did", "with",
    "from", "by", "it", "its", "this", "that", "be", "as",
];

/// Lowercased, stopword-filtered, deduplicated terms in appearance order
pub fn query_terms(text: &str) -> Vec<String> {
    let mut terms: Vec<String> = Vec::new();
    for word in text.unicode_words() {
        let term = word.to_lowercase();
        if term.len() < 2 || STOPWORDS.contains(&term.as_str()) {
            continue;
        }
        if !terms.contains(&term) {
            terms.push(term);
        }
    }
    terms
}

/// Lowercased, stopword-filtered terms with duplicates kept, for frequency
/// counting
pub fn page_terms(text: &str) -> Vec<String> {
    text.unicode_words()
        .map(|w| w.to_lowercase())
        .filter(|t| t.len() >= 2 && !STOPWORDS.contains(&t.as_str()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_terms_drop_stopwords_and_dedup() {
        let terms = query_terms("What is the total assets of the total fund?");
        assert_eq!(terms, vec!["total", "assets", "fund"]);
    }

    #[test]
    fn page_terms_keep_duplicates() {
        let terms = page_terms("assets and assets");
        assert_eq!(terms, vec!["assets", "assets"]);
    }
}
