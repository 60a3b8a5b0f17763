//! ISIN recognition and checksum validation
//!
//! Candidates match the ISO 6166 shape: two letters, nine alphanumerics, one
//! check digit. Each candidate is validated with the Luhn-style checksum;
//! failures are discarded silently since a failed check means "not an ISIN",
//! not a fault.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::types::IsinRecord;

static ISIN_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b([A-Z]{2}[A-Z0-9]{9}[0-9])\b").expect("invalid ISIN regex"));

/// Validate a 12-character ISIN candidate against its check digit.
///
/// Letters map to two-digit values (A=10..Z=35). The digits of the first 11
/// characters are concatenated and the Luhn algorithm is applied from the
/// rightmost digit; the result must equal `(10 - check_digit) mod 10`.
pub fn validate(code: &str) -> bool {
    if code.len() != 12 || !code.is_ascii() {
        return false;
    }

    let bytes = code.as_bytes();
    if !bytes[0].is_ascii_uppercase() || !bytes[1].is_ascii_uppercase() {
        return false;
    }
    let check_digit = match (bytes[11] as char).to_digit(10) {
        Some(d) => d,
        None => return false,
    };

    let mut digits: Vec<u32> = Vec::with_capacity(22);
    for &b in &bytes[..11] {
        match b {
            b'0'..=b'9' => digits.push((b - b'0') as u32),
            b'A'..=b'Z' => {
                let value = (b - b'A') as u32 + 10;
                digits.push(value / 10);
                digits.push(value % 10);
            }
            _ => return false,
        }
    }

    let mut sum = 0u32;
    for (i, &d) in digits.iter().rev().enumerate() {
        let mut value = d;
        if i % 2 == 0 {
            value *= 2;
            if value > 9 {
                value -= 9;
            }
        }
        sum += value;
    }

    (10 - sum % 10) % 10 == check_digit
}

/// Extract validated ISINs from page text.
///
/// A context window of `window` characters on each side of the match is
/// retained for provenance.
pub fn extract(text: &str, page_number: u32, window: usize) -> Vec<IsinRecord> {
    let mut records = Vec::new();

    for caps in ISIN_PATTERN.captures_iter(text) {
        let m = caps.get(1).expect("capture group 1");
        let code = m.as_str();

        if !validate(code) {
            tracing::debug!(candidate = code, page = page_number, "ISIN checksum mismatch, dropped");
            continue;
        }

        records.push(IsinRecord {
            code: code.to_string(),
            validated: true,
            context: context_window(text, m.start(), m.end(), window),
            page_number,
        });
    }

    records
}

/// Slice `window` characters either side of a span, respecting char boundaries
pub(crate) fn context_window(text: &str, start: usize, end: usize, window: usize) -> String {
    let mut from = start.saturating_sub(window);
    while from > 0 && !text.is_char_boundary(from) {
        from -= 1;
    }
    let mut to = (end + window).min(text.len());
    while to < text.len() && !text.is_char_boundary(to) {
        to += 1;
    }
    text[from..to].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_codes_pass() {
        assert!(validate("US0378331005")); // Apple
        assert!(validate("US5949181045")); // Microsoft
        assert!(validate("DE0005140008")); // Deutsche Bank
        assert!(validate("GB0002634946")); // BAE Systems
    }

    #[test]
    fn altered_check_digit_fails() {
        assert!(!validate("US0378331006"));
        assert!(!validate("US0378331004"));
        assert!(!validate("DE0005140009"));
    }

    #[test]
    fn malformed_candidates_fail() {
        assert!(!validate("US037833100")); // 11 chars
        assert!(!validate("U10378331005")); // digit in country code
        assert!(!validate("US037833100X")); // letter check digit
        assert!(!validate(""));
    }

    #[test]
    fn extract_keeps_only_validated() {
        let text = "Holdings: US0378331005 and the typo US0378331006 nearby.";
        let records = extract(text, 3, 20);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].code, "US0378331005");
        assert!(records[0].validated);
        assert_eq!(records[0].page_number, 3);
        assert!(records[0].context.contains("US0378331005"));
    }

    #[test]
    fn context_window_respects_bounds() {
        let text = "US0378331005";
        let records = extract(text, 1, 100);
        assert_eq!(records[0].context, text);
    }
}
