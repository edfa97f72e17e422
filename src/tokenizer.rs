//! Text tokenization utilities.

use std::collections::HashMap;

use unicode_segmentation::UnicodeSegmentation;

/// Tokenize text into lowercase words, dropping punctuation.
pub fn tokenize(text: &str) -> Vec<String> {
  text
    .unicode_words()
    .map(|word| word.to_lowercase())
    .collect()
}

/// Calculate term frequencies for a text.
pub fn term_frequencies(text: &str) -> HashMap<String, usize> {
  let mut freqs = HashMap::new();
  for token in tokenize(text) {
    *freqs.entry(token).or_insert(0) += 1;
  }
  freqs
}

/// Split a keyword query into lowercase, whitespace-delimited terms.
///
/// Unlike [`tokenize`], punctuation is kept: a term such as `"u.s."` must
/// match the same substring in the stored text.
pub fn query_terms(query: &str) -> Vec<String> {
  query
    .to_lowercase()
    .split_whitespace()
    .map(str::to_owned)
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn tokenize_drops_punctuation() {
    assert_eq!(tokenize("XAU/USD: Gold, again!"), vec!["xau", "usd", "gold", "again"]);
  }

  #[test]
  fn repeated_terms_are_counted() {
    let freqs = term_frequencies("Gold up, gold down, silver flat");
    assert_eq!(freqs.get("gold"), Some(&2));
    assert_eq!(freqs.get("silver"), Some(&1));
    assert_eq!(freqs.get("copper"), None);
  }

  #[test]
  fn query_terms_keep_punctuation() {
    assert_eq!(query_terms("  Gold  U.S. price\t"), vec!["gold", "u.s.", "price"]);
    assert!(query_terms("   ").is_empty());
  }
}
