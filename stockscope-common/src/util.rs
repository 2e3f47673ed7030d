//! Utility functions for StockScope services.

/// Round to a fixed number of decimal places (half away from zero).
pub fn round_to(value: f64, places: u32) -> f64 {
    let factor = 10f64.powi(places as i32);
    (value * factor).round() / factor
}

/// Check for a compact `YYYYMMDD` date: exactly eight ASCII digits.
pub fn is_compact_date(s: &str) -> bool {
    s.len() == 8 && s.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(2.71828, 2), 2.72);
        assert_eq!(round_to(-1.005_1, 2), -1.01);
        assert_eq!(round_to(4.0, 2), 4.0);
    }

    #[test]
    fn test_is_compact_date() {
        assert!(is_compact_date("20240102"));
        assert!(!is_compact_date("2024-01-02"));
        assert!(!is_compact_date("2024010"));
        assert!(!is_compact_date("2024O102"));
        assert!(!is_compact_date(""));
    }
}
