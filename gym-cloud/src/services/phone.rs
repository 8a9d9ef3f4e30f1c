//! Phone number normalization to E.164
//!
//! Numbers without an international prefix are assumed to be UK numbers.

use std::sync::LazyLock;

use regex::Regex;

static E164: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+[1-9]\d{7,14}$").expect("E.164 pattern is valid"));

const UK_PREFIX: &str = "+44";

/// Normalize a user-entered number to `+<country><number>`.
///
/// Returns `None` when the result is not a plausible international number.
pub fn normalize_phone(raw: &str) -> Option<String> {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '+')
        .collect();

    let normalized = if cleaned.starts_with('+') {
        cleaned
    } else if let Some(rest) = cleaned.strip_prefix("00") {
        // international dialling prefix
        format!("+{rest}")
    } else if let Some(rest) = cleaned.strip_prefix('0') {
        // UK trunk prefix
        format!("{UK_PREFIX}{rest}")
    } else if cleaned.starts_with("44") {
        format!("+{cleaned}")
    } else {
        format!("{UK_PREFIX}{cleaned}")
    };

    E164.is_match(&normalized).then_some(normalized)
}

/// Last `n` digits of a normalized number
pub fn last_digits(normalized: &str, n: usize) -> Option<&str> {
    let digits = normalized.trim_start_matches('+');
    (digits.len() >= n).then(|| &digits[digits.len() - n..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uk_trunk_prefix_rewritten() {
        assert_eq!(normalize_phone("07482945828").as_deref(), Some("+447482945828"));
    }

    #[test]
    fn already_international_unchanged() {
        assert_eq!(normalize_phone("+447482945828").as_deref(), Some("+447482945828"));
    }

    #[test]
    fn separators_stripped() {
        assert_eq!(normalize_phone("44 7482 945828").as_deref(), Some("+447482945828"));
        assert_eq!(normalize_phone("(0)7482-945-828").as_deref(), Some("+447482945828"));
        assert_eq!(normalize_phone("+44 (7482) 945 828").as_deref(), Some("+447482945828"));
    }

    #[test]
    fn bare_local_number_assumed_uk() {
        assert_eq!(normalize_phone("7482945828").as_deref(), Some("+447482945828"));
    }

    #[test]
    fn double_zero_international_prefix() {
        assert_eq!(normalize_phone("00353871234567").as_deref(), Some("+353871234567"));
    }

    #[test]
    fn invalid_inputs_rejected() {
        assert_eq!(normalize_phone(""), None);
        assert_eq!(normalize_phone("call me"), None);
        assert_eq!(normalize_phone("+0123456789"), None);
        assert_eq!(normalize_phone("12"), None);
        assert_eq!(normalize_phone("+44+7482945828"), None);
        assert_eq!(normalize_phone("+4474829458281234567"), None);
    }

    #[test]
    fn last_ten_digits() {
        assert_eq!(last_digits("+447482945828", 10), Some("7482945828"));
        assert_eq!(last_digits("+4412", 10), None);
    }
}
