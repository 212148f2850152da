use chrono::Utc;

use crate::db_types::{OrderNumber, ORDER_NUMBER_PATTERN};

/// Prefix for the short human reference attached to every gateway charge.
pub const REFERENCE_PREFIX: &str = "CMD-";

const MAX_REFERENCE_DIGITS: usize = 6;

/// Derives the short reference sent to the payment gateway.
///
/// Preference order: the digits of an order number's suffix, then any digits found in the supplied string, then
/// a timestamp-derived fallback. The result is always `CMD-` followed by at most six digits.
pub fn payment_reference(order_reference: Option<&str>) -> String {
    let digits = order_reference.and_then(derive_digits).unwrap_or_else(timestamp_digits);
    format!("{REFERENCE_PREFIX}{digits}")
}

fn derive_digits(source: &str) -> Option<String> {
    let re = regex::Regex::new(ORDER_NUMBER_PATTERN).expect("order number pattern is valid");
    if re.is_match(source) {
        let number = OrderNumber::new_unchecked(source);
        let suffix_digits: String = number.suffix().chars().filter(char::is_ascii_digit).collect();
        if !suffix_digits.is_empty() {
            return Some(suffix_digits);
        }
    }
    let all_digits: String =
        source.chars().filter(char::is_ascii_digit).take(MAX_REFERENCE_DIGITS).collect();
    if all_digits.is_empty() {
        None
    } else {
        Some(all_digits)
    }
}

fn timestamp_digits() -> String {
    format!("{}", Utc::now().timestamp() % 1_000_000)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn prefers_the_order_number_suffix() {
        assert_eq!(payment_reference(Some("#7KQ-2F9")), "CMD-29");
        assert_eq!(payment_reference(Some("#ABC-123")), "CMD-123");
    }

    #[test]
    fn falls_back_to_any_digits() {
        assert_eq!(payment_reference(Some("order 4481 retry 2")), "CMD-44812");
        assert_eq!(payment_reference(Some("12345678")), "CMD-123456");
    }

    #[test]
    fn all_letter_order_number_falls_back_to_a_timestamp() {
        // #ABC-DEF is order-number shaped but holds no digits at all
        let reference = payment_reference(Some("#ABC-DEF"));
        assert!(reference.starts_with(REFERENCE_PREFIX));
        let digits = &reference[REFERENCE_PREFIX.len()..];
        assert!(!digits.is_empty());
        assert!(digits.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn no_digits_anywhere_uses_a_timestamp() {
        let reference = payment_reference(Some("no numbers here"));
        assert!(reference.starts_with(REFERENCE_PREFIX));
        let digits = &reference[REFERENCE_PREFIX.len()..];
        assert!(!digits.is_empty() && digits.len() <= MAX_REFERENCE_DIGITS);
        assert!(digits.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn missing_reference_uses_a_timestamp() {
        let reference = payment_reference(None);
        assert!(reference.starts_with(REFERENCE_PREFIX));
        assert!(reference[REFERENCE_PREFIX.len()..].chars().all(|c| c.is_ascii_digit()));
    }
}
