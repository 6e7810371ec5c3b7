//! Entity identifiers embedded in natural-language directives.

use regex::Regex;
use std::sync::LazyLock;

static CUSTOMER_ID_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bCUST-[A-Za-z0-9]+\b").unwrap());

static DRIVER_ID_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bDRV-[A-Za-z0-9]+\b").unwrap());

static MERCHANT_ID_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bMERC-[A-Za-z0-9]+\b").unwrap());

static PLAIN_REFERENCE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").unwrap());

/// Whether `text` is a bare identifier that is safe to use as one URL path
/// segment: letters, digits, `_` and `-` only.
pub fn is_plain_reference(text: &str) -> bool {
    PLAIN_REFERENCE_PATTERN.is_match(text)
}

pub fn customer_id(text: &str) -> Option<&str> {
    CUSTOMER_ID_PATTERN.find(text).map(|m| m.as_str())
}

pub fn driver_id(text: &str) -> Option<&str> {
    DRIVER_ID_PATTERN.find(text).map(|m| m.as_str())
}

pub fn merchant_id(text: &str) -> Option<&str> {
    MERCHANT_ID_PATTERN.find(text).map(|m| m.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_first_id_of_each_kind() {
        let text = "Tell CUST-123 that DRV-789 is late; MERC-456 is fine, MERC-999 too";
        assert_eq!(customer_id(text), Some("CUST-123"));
        assert_eq!(driver_id(text), Some("DRV-789"));
        assert_eq!(merchant_id(text), Some("MERC-456"));
    }

    #[test]
    fn plain_references() {
        assert!(is_plain_reference("MERC-456"));
        assert!(is_plain_reference("store_12"));
        assert!(!is_plain_reference(""));
        assert!(!is_plain_reference(".."));
        assert!(!is_plain_reference("../../admin/secrets?x="));
        assert!(!is_plain_reference("MERC-1/status"));
        assert!(!is_plain_reference("caf%C3%A9"));
    }

    #[test]
    fn ignores_lookalikes() {
        assert_eq!(customer_id("XCUST-1"), None);
        assert_eq!(merchant_id("merc-456"), None);
        assert_eq!(driver_id("DRV-"), None);
    }
}
