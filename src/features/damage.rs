//! Parsing of NOAA damage strings ("10.00K", "2.5M", "1.2B") into dollars.

/// Outcome of parsing a raw damage string.
///
/// `Invalid` is kept distinct from a legitimate `Parsed(0.0)` so that the
/// training job has to decide explicitly what to do with malformed labels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParsedDamage {
    Parsed(f64),
    Invalid,
}

impl ParsedDamage {
    pub fn value(self) -> Option<f64> {
        match self {
            ParsedDamage::Parsed(v) => Some(v),
            ParsedDamage::Invalid => None,
        }
    }

    pub fn is_invalid(self) -> bool {
        matches!(self, ParsedDamage::Invalid)
    }
}

/// Parse a raw damage string.
///
/// Missing, blank and `"0.00K"` are zero dollars. Otherwise the value must be a
/// decimal number followed by one of `K`, `M`, `B` (any case), optionally
/// separated by whitespace.
pub fn parse_damage(raw: Option<&str>) -> ParsedDamage {
    let Some(raw) = raw else {
        return ParsedDamage::Parsed(0.0);
    };
    let s = raw.trim();
    if s.is_empty() || s == "0.00K" {
        return ParsedDamage::Parsed(0.0);
    }

    let Some(suffix) = s.chars().last() else {
        return ParsedDamage::Invalid;
    };
    let multiplier = match suffix.to_ascii_uppercase() {
        'K' => 1e3,
        'M' => 1e6,
        'B' => 1e9,
        _ => return ParsedDamage::Invalid,
    };

    let number = s[..s.len() - suffix.len_utf8()].trim_end();
    if number.is_empty() || !number.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return ParsedDamage::Invalid;
    }

    match number.parse::<f64>() {
        Ok(n) => ParsedDamage::Parsed(n * multiplier),
        Err(_) => ParsedDamage::Invalid,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn parsed(raw: &str) -> f64 {
        parse_damage(Some(raw))
            .value()
            .unwrap_or_else(|| panic!("{raw} should parse"))
    }

    #[test]
    fn test_suffix_multipliers() {
        assert_relative_eq!(parsed("10.00K"), 10_000.0);
        assert_relative_eq!(parsed("2.5M"), 2_500_000.0);
        assert_relative_eq!(parsed("1.2B"), 1_200_000_000.0);
    }

    #[test]
    fn test_zero_forms() {
        assert_eq!(parse_damage(Some("0.00K")), ParsedDamage::Parsed(0.0));
        assert_eq!(parse_damage(Some("")), ParsedDamage::Parsed(0.0));
        assert_eq!(parse_damage(Some("   ")), ParsedDamage::Parsed(0.0));
        assert_eq!(parse_damage(None), ParsedDamage::Parsed(0.0));
    }

    #[test]
    fn test_case_and_whitespace() {
        assert_relative_eq!(parsed("5k"), 5_000.0);
        assert_relative_eq!(parsed("3 m"), 3_000_000.0);
        assert_relative_eq!(parsed("  7.5  B "), 7_500_000_000.0);
    }

    #[test]
    fn test_garbage_is_invalid_not_zero() {
        for raw in ["garbage", "K", "1.2.3K", "-5K", "500", "12X", "1,000K"] {
            let outcome = parse_damage(Some(raw));
            assert!(outcome.is_invalid(), "{raw} should be invalid");
            assert_ne!(outcome, ParsedDamage::Parsed(0.0));
        }
    }
}
