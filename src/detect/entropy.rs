//! Entropy analysis for secret candidates
//!
//! Shannon entropy over the character distribution separates random key
//! material from prose and identifiers. The secrets detector applies this
//! to substrings of 20 characters or more.

use std::collections::HashMap;

/// Result of entropy analysis over one token.
#[derive(Debug, Clone)]
pub struct EntropyResult {
    /// Shannon entropy in bits per character.
    pub shannon_entropy: f64,
    /// Entropy normalised by the maximum for the observed charset.
    pub normalized_entropy: f64,
    /// Distinct characters in the token.
    pub charset_size: usize,
    pub length: usize,
}

impl EntropyResult {
    /// The bar a bare token must clear to count as probable key material.
    pub fn is_high_entropy(&self) -> bool {
        self.shannon_entropy >= 4.5
    }
}

/// Entropy analyzer with the token-shape heuristics that cut the false
/// positives entropy alone lets through.
#[derive(Debug, Clone)]
pub struct EntropyAnalyzer {
    pub min_length: usize,
    pub max_length: usize,
}

impl Default for EntropyAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl EntropyAnalyzer {
    pub fn new() -> Self {
        Self {
            min_length: 20,
            max_length: 1000,
        }
    }

    pub fn analyze(&self, text: &str) -> EntropyResult {
        let length = text.chars().count();
        if length < self.min_length || length > self.max_length {
            return EntropyResult {
                shannon_entropy: 0.0,
                normalized_entropy: 0.0,
                charset_size: 0,
                length,
            };
        }

        let mut counts: HashMap<char, usize> = HashMap::new();
        for ch in text.chars() {
            *counts.entry(ch).or_insert(0) += 1;
        }
        let charset_size = counts.len();
        let total = length as f64;
        let shannon_entropy: f64 = counts
            .values()
            .map(|&count| {
                let freq = count as f64 / total;
                -freq * freq.log2()
            })
            .sum();
        let max_entropy = (charset_size as f64).log2();
        let normalized_entropy = if max_entropy > 0.0 {
            shannon_entropy / max_entropy
        } else {
            0.0
        };

        EntropyResult {
            shannon_entropy,
            normalized_entropy,
            charset_size,
            length,
        }
    }

    /// Reject tokens that score high on entropy but read as structure:
    /// repeated runs, sequential alphabets, known placeholder words.
    pub fn looks_like_secret(&self, text: &str) -> bool {
        let result = self.analyze(text);
        if !result.is_high_entropy() {
            return false;
        }
        if is_placeholder(text) {
            return false;
        }
        // Mixed character classes are the norm for generated keys.
        let has_alpha = text.chars().any(|c| c.is_ascii_alphabetic());
        let has_digit = text.chars().any(|c| c.is_ascii_digit());
        has_alpha && has_digit
    }
}

fn is_placeholder(text: &str) -> bool {
    const PLACEHOLDERS: &[&str] = &[
        "example", "sample", "placeholder", "changeme", "your_key_here", "insert", "xxxx",
        "deadbeef",
    ];
    let lower = text.to_ascii_lowercase();
    PLACEHOLDERS.iter().any(|p| lower.contains(p))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_key_scores_high() {
        let analyzer = EntropyAnalyzer::new();
        let result = analyzer.analyze("wJalrXUtnFEMI/K7MDENG/bPxRfiCYRANDOMKEY1");
        assert!(result.shannon_entropy > 4.0);
        assert!(result.charset_size > 20);
    }

    #[test]
    fn test_repeated_text_scores_low() {
        let analyzer = EntropyAnalyzer::new();
        let result = analyzer.analyze("aaaaaaaaaaaaaaaaaaaaaaaa");
        assert!(result.shannon_entropy < 1.0);
        assert!(!result.is_high_entropy());
    }

    #[test]
    fn test_short_tokens_skipped() {
        let analyzer = EntropyAnalyzer::new();
        let result = analyzer.analyze("short");
        assert_eq!(result.shannon_entropy, 0.0);
        assert_eq!(result.charset_size, 0);
    }

    #[test]
    fn test_placeholders_rejected() {
        let analyzer = EntropyAnalyzer::new();
        assert!(!analyzer.looks_like_secret("ExAmPlE1234567890aBcDeF9"));
        assert!(!analyzer.looks_like_secret("xxxxXXXXxxxx123456789012"));
    }

    #[test]
    fn test_prose_not_a_secret() {
        let analyzer = EntropyAnalyzer::new();
        assert!(!analyzer.looks_like_secret("the quick brown fox jump"));
    }
}
