/// Turns agent output into an estimated token count for metrics.
pub trait TokenEstimator: Send + Sync {
    fn estimate(&self, text: &str) -> u64;
}

/// `floor(words * 1.3)`, counting whitespace-separated words.
#[derive(Debug, Clone, Copy, Default)]
pub struct WordCountEstimator;

impl TokenEstimator for WordCountEstimator {
    fn estimate(&self, text: &str) -> u64 {
        let words = text.split_whitespace().count();
        (words as f64 * 1.3).floor() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_count_estimate() {
        let estimator = WordCountEstimator;
        assert_eq!(estimator.estimate(""), 0);
        assert_eq!(estimator.estimate("one"), 1);
        assert_eq!(estimator.estimate("one two three"), 3);
        assert_eq!(estimator.estimate(&"w ".repeat(10)), 13);
        assert_eq!(estimator.estimate("a\n\tb   c d"), 5);
    }
}
