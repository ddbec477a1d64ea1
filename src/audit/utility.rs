/// Rounds to one decimal place, half away from zero.
pub fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Percentage of expected attributes that are present, rounded to one decimal
/// and clamped to `0.0..=100.0`. A site with nothing expected is complete.
pub fn completeness_rate(total_missing: u64, total_expected: u64) -> f64 {
    if total_expected == 0 {
        return 100.0;
    }
    let rate = 100.0 * (1.0 - total_missing as f64 / total_expected as f64);

    round_to_tenth(rate).clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_to_tenth() {
        assert_eq!(round_to_tenth(87.54), 87.5);
        assert_eq!(round_to_tenth(87.56), 87.6);
        assert_eq!(round_to_tenth(66.666), 66.7);
    }

    #[test]
    fn test_rate_with_zero_expected() {
        assert_eq!(completeness_rate(0, 0), 100.0);
        assert_eq!(completeness_rate(4, 0), 100.0);
    }

    #[test]
    fn test_rate_normal_values() {
        assert_eq!(completeness_rate(1, 8), 87.5);
        assert_eq!(completeness_rate(0, 8), 100.0);
        assert_eq!(completeness_rate(2, 2), 0.0);
        assert_eq!(completeness_rate(1, 3), 66.7);
    }

    #[test]
    fn test_rate_is_clamped_when_missing_exceeds_expected() {
        assert_eq!(completeness_rate(12, 8), 0.0);
    }
}
