//! Lexical features of a turn's input text.
//!
//! Everything here is a pure function of the text: the scorer must be
//! reproducible, so even the "jitter" applied to plot coordinates derives
//! from the message digest rather than a random source.

use std::collections::HashSet;

/// Whitespace word count of the input. Empty text counts zero words.
pub fn token_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Lexical density blended with normalized average word length.
///
/// `unique/total * 0.6 + min(avg_len/12, 1) * 0.4`, clamped to [0, 1].
/// Empty text yields 0.
pub fn semantic_depth(text: &str) -> f64 {
    let lowered = text.to_lowercase();
    let words: Vec<&str> = lowered.split_whitespace().collect();
    if words.is_empty() {
        return 0.0;
    }

    let unique: HashSet<&str> = words.iter().copied().collect();
    let total = words.len().max(1) as f64;
    let lexical_density = unique.len() as f64 / total;
    let avg_word_len = words.iter().map(|w| w.encode_utf16().count()).sum::<usize>() as f64 / total;

    (lexical_density * 0.6 + (avg_word_len / 12.0).min(1.0) * 0.4).min(1.0)
}

/// Order-sensitive 31-based rolling hash over UTF-16 code units, in wrapping
/// 32-bit arithmetic, absolute value taken at the end. Collision-tolerant:
/// this is an identity hint for ledger entries, not a cryptographic digest.
pub fn message_digest(text: &str) -> u32 {
    let mut h: i32 = 0;
    for unit in text.encode_utf16() {
        h = h.wrapping_shl(5).wrapping_sub(h).wrapping_add(unit as i32);
    }
    h.unsigned_abs()
}

/// Deterministic plot offset in [-0.5, 0.5) derived from the digest.
pub fn jitter(digest: u32) -> f64 {
    (digest % 100) as f64 / 100.0 - 0.5
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_count() {
        assert_eq!(token_count("one two three"), 3);
        assert_eq!(token_count("  spaced   out  "), 2);
        assert_eq!(token_count(""), 0);
        assert_eq!(token_count("   \t\n"), 0);
    }

    #[test]
    fn test_depth_empty_is_zero() {
        assert_eq!(semantic_depth(""), 0.0);
        assert_eq!(semantic_depth("   "), 0.0);
    }

    #[test]
    fn test_depth_in_unit_range() {
        for text in [
            "a",
            "the the the the",
            "polyrhythmic topological condensation of thought",
            "supercalifragilisticexpialidocious",
        ] {
            let d = semantic_depth(text);
            assert!((0.0..=1.0).contains(&d), "depth({text:?}) = {d}");
        }
    }

    #[test]
    fn test_depth_rewards_variety() {
        // All-unique words score higher density than full repetition
        let varied = semantic_depth("alpha beta gamma delta");
        let repeated = semantic_depth("alpha alpha alpha alpha");
        assert!(varied > repeated, "{varied} vs {repeated}");
    }

    #[test]
    fn test_depth_word_length_capped_at_12() {
        // Both average well past 12 chars; the length term saturates
        let long = semantic_depth("incomprehensibilities");
        let longer = semantic_depth("pneumonoultramicroscopicsilicovolcanoconiosis");
        assert!((long - longer).abs() < 1e-10);
    }

    #[test]
    fn test_depth_case_insensitive() {
        assert!((semantic_depth("Hello World") - semantic_depth("hello world")).abs() < 1e-10);
    }

    #[test]
    fn test_digest_deterministic() {
        let a = message_digest("the same message");
        let b = message_digest("the same message");
        assert_eq!(a, b);
    }

    #[test]
    fn test_digest_order_sensitive() {
        assert_ne!(message_digest("ab"), message_digest("ba"));
    }

    #[test]
    fn test_digest_empty_is_zero() {
        assert_eq!(message_digest(""), 0);
    }

    #[test]
    fn test_digest_known_values() {
        // h = h*31 + unit, wrapping: "a" = 97, "ab" = 97*31 + 98 = 3105
        assert_eq!(message_digest("a"), 97);
        assert_eq!(message_digest("ab"), 3105);
    }

    #[test]
    fn test_jitter_range() {
        for digest in [0, 1, 49, 50, 99, 100, 12345, u32::MAX] {
            let j = jitter(digest);
            assert!((-0.5..0.5).contains(&j), "jitter({digest}) = {j}");
        }
    }

    #[test]
    fn test_jitter_pure_function_of_digest() {
        assert_eq!(jitter(42), jitter(42));
        assert_eq!(jitter(142), jitter(42));
    }
}
