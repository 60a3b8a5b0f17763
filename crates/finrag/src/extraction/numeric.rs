//! Locale-aware recognition of numbers, amounts, percentages, and dates
//!
//! Two number formats are handled: en-style `1,234.56` and eu-style
//! `1.234,56`. When both separators appear the rightmost one is the decimal
//! point. A separator repeating in three-digit groups is a thousands
//! separator. Matches that fail to parse are still emitted with a `None`
//! value so the raw text survives.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::types::{AmountMention, DateMention, NumericCell};

const CURRENCY_CODES: &[&str] = &["USD", "EUR", "GBP", "CHF", "JPY"];

static AMOUNT_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?:(?P<pre>[$€£¥]|USD|EUR|GBP|CHF|JPY)\s?)?(?P<num>\(?\d+(?:[.,]\d+)*\)?)(?:\s?(?P<pct>%)|\s?(?P<post>[$€£¥]|USD|EUR|GBP|CHF|JPY)\b)?",
    )
    .expect("invalid amount regex")
});

static ISO_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{4})-(\d{2})-(\d{2})\b").expect("invalid date regex"));

static SLASH_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{1,2})/(\d{1,2})/(\d{4})\b").expect("invalid date regex"));

static DOT_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{1,2})\.(\d{1,2})\.(\d{4})\b").expect("invalid date regex"));

static MONTH_NAME_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b(?:(?P<d1>\d{1,2})\s+)?(?P<month>January|February|March|April|May|June|July|August|September|October|November|December)\s+(?:(?P<d2>\d{1,2}),?\s+)?(?P<year>\d{4})\b",
    )
    .expect("invalid date regex")
});

/// An amount match with its span in the source text
#[derive(Debug, Clone)]
pub struct AmountToken {
    pub start: usize,
    pub end: usize,
    pub mention: AmountMention,
}

/// Parse a number string that may use either locale's separators.
///
/// Rules, applied in order: both separators present → the rightmost is the
/// decimal point; a single separator repeating in three-digit groups is a
/// thousands separator; a lone comma is a decimal point unless followed by
/// exactly three digits; a lone dot is a decimal point. Accounting-style
/// parentheses negate.
pub fn parse_number(raw: &str) -> Option<f64> {
    let mut s = raw.trim().to_string();

    let negative = s.starts_with('(') && s.ends_with(')');
    if negative {
        s = s[1..s.len() - 1].to_string();
    }
    if s.is_empty() || !s.chars().all(|c| c.is_ascii_digit() || c == ',' || c == '.') {
        return None;
    }

    let commas = s.matches(',').count();
    let dots = s.matches('.').count();

    let normalized = match (commas, dots) {
        (0, 0) => s,
        (c, d) if c > 0 && d > 0 => {
            let last_comma = s.rfind(',').unwrap();
            let last_dot = s.rfind('.').unwrap();
            if last_dot > last_comma {
                // en: commas are thousands
                s.replace(',', "")
            } else {
                // eu: dots are thousands, comma is decimal
                s.replace('.', "").replace(',', ".")
            }
        }
        (c, 0) => {
            if grouped_in_threes(&s, ',') && (c > 1 || tail_len(&s, ',') == 3) {
                s.replace(',', "")
            } else if c == 1 {
                s.replace(',', ".")
            } else {
                return None;
            }
        }
        (0, d) => {
            if d > 1 {
                if grouped_in_threes(&s, '.') {
                    s.replace('.', "")
                } else {
                    return None;
                }
            } else {
                s
            }
        }
        _ => return None,
    };

    normalized
        .parse::<f64>()
        .ok()
        .map(|v| if negative { -v } else { v })
}

/// Every group after the first separator has exactly three digits
fn grouped_in_threes(s: &str, sep: char) -> bool {
    let mut parts = s.split(sep);
    let first = parts.next().unwrap_or("");
    if first.is_empty() || first.len() > 3 {
        return false;
    }
    parts.all(|p| p.len() == 3)
}

fn tail_len(s: &str, sep: char) -> usize {
    s.rsplit(sep).next().map(|t| t.len()).unwrap_or(0)
}

/// Whether a token reads as a numeric value (amounts, percents, accounting
/// negatives included). Used for header detection in table reconstruction.
pub fn is_numeric_token(token: &str) -> bool {
    normalize_cell(token).value.is_some()
}

/// Normalize a table cell, preserving the raw string alongside any parsed
/// value
pub fn normalize_cell(raw: &str) -> NumericCell {
    let trimmed = raw.trim();
    let mut body = trimmed;
    let mut currency = None;
    let mut is_percent = false;

    if let Some(stripped) = body.strip_suffix('%') {
        is_percent = true;
        body = stripped.trim_end();
    }

    for symbol in ['$', '€', '£', '¥'] {
        if let Some(stripped) = body.strip_prefix(symbol) {
            currency = Some(symbol.to_string());
            body = stripped.trim_start();
            break;
        }
    }
    if currency.is_none() {
        for code in CURRENCY_CODES {
            if let Some(stripped) = body.strip_prefix(code) {
                currency = Some((*code).to_string());
                body = stripped.trim_start();
                break;
            }
            if let Some(stripped) = body.strip_suffix(code) {
                currency = Some((*code).to_string());
                body = stripped.trim_end();
                break;
            }
        }
    }

    NumericCell {
        raw: raw.to_string(),
        value: parse_number(body),
        is_percent,
        currency,
    }
}

/// Find amount tokens with their spans. Digits embedded in alphanumeric
/// runs (identifiers, ISINs) are skipped.
pub fn find_amount_tokens(text: &str, page_number: u32) -> Vec<AmountToken> {
    let mut tokens = Vec::new();
    let bytes = text.as_bytes();

    for caps in AMOUNT_PATTERN.captures_iter(text) {
        let full = caps.get(0).expect("match 0");
        if full.as_str().trim().is_empty() {
            continue;
        }
        let num = caps.get(2).expect("num group");

        // Reject digits glued to letters on either side
        let num_start = num.start();
        if num_start > 0 && bytes[num_start - 1].is_ascii_alphanumeric() {
            continue;
        }
        if full.end() < bytes.len() && bytes[full.end()].is_ascii_alphanumeric() {
            continue;
        }

        let currency = caps
            .name("pre")
            .or_else(|| caps.name("post"))
            .map(|m| m.as_str().to_string());
        let is_percent = caps.name("pct").is_some();

        tokens.push(AmountToken {
            start: full.start(),
            end: full.end(),
            mention: AmountMention {
                raw_text: full.as_str().trim().to_string(),
                value: parse_number(num.as_str()),
                currency,
                is_percent,
                page_number,
            },
        });
    }

    tokens
}

/// Extract amount and percentage mentions from page text
pub fn scan_amounts(text: &str, page_number: u32) -> Vec<AmountMention> {
    find_amount_tokens(text, page_number)
        .into_iter()
        .map(|t| t.mention)
        .collect()
}

/// Extract date mentions from page text, ordered by position. Matches that
/// fail calendar validation are retained with `value: None`.
pub fn scan_dates(text: &str, page_number: u32) -> Vec<DateMention> {
    let mut found: Vec<(usize, usize, DateMention)> = Vec::new();

    let mut push = |found: &mut Vec<(usize, usize, DateMention)>,
                    start: usize,
                    end: usize,
                    raw: &str,
                    value: Option<chrono::NaiveDate>| {
        if found.iter().any(|&(s, e, _)| start < e && s < end) {
            return;
        }
        found.push((
            start,
            end,
            DateMention {
                raw_text: raw.to_string(),
                value,
                page_number,
            },
        ));
    };

    for caps in ISO_DATE.captures_iter(text) {
        let m = caps.get(0).unwrap();
        let value = ymd(&caps[1], &caps[2], &caps[3]);
        push(&mut found, m.start(), m.end(), m.as_str(), value);
    }

    for caps in SLASH_DATE.captures_iter(text) {
        let m = caps.get(0).unwrap();
        // en reading first, eu fallback when the month field overflows
        let value = ymd(&caps[3], &caps[1], &caps[2]).or_else(|| ymd(&caps[3], &caps[2], &caps[1]));
        push(&mut found, m.start(), m.end(), m.as_str(), value);
    }

    for caps in DOT_DATE.captures_iter(text) {
        let m = caps.get(0).unwrap();
        let value = ymd(&caps[3], &caps[2], &caps[1]);
        push(&mut found, m.start(), m.end(), m.as_str(), value);
    }

    for caps in MONTH_NAME_DATE.captures_iter(text) {
        let m = caps.get(0).unwrap();
        let day = caps
            .name("d1")
            .or_else(|| caps.name("d2"))
            .map(|d| d.as_str());
        if let Some(d) = day {
            let value = (|| {
                let month = month_number(&caps["month"])?;
                chrono::NaiveDate::from_ymd_opt(caps["year"].parse().ok()?, month, d.parse().ok()?)
            })();
            push(&mut found, m.start(), m.end(), m.as_str(), value);
        }
    }

    found.sort_by_key(|&(start, _, _)| start);
    found.into_iter().map(|(_, _, m)| m).collect()
}

fn ymd(year: &str, month: &str, day: &str) -> Option<chrono::NaiveDate> {
    chrono::NaiveDate::from_ymd_opt(year.parse().ok()?, month.parse().ok()?, day.parse().ok()?)
}

fn month_number(name: &str) -> Option<u32> {
    const MONTHS: [&str; 12] = [
        "January",
        "February",
        "March",
        "April",
        "May",
        "June",
        "July",
        "August",
        "September",
        "October",
        "November",
        "December",
    ];
    MONTHS.iter().position(|m| *m == name).map(|i| i as u32 + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn en_numbers() {
        assert_eq!(parse_number("1,234.56"), Some(1234.56));
        assert_eq!(parse_number("1,500,000"), Some(1_500_000.0));
        assert_eq!(parse_number("178.25"), Some(178.25));
        assert_eq!(parse_number("1,500"), Some(1500.0));
    }

    #[test]
    fn eu_numbers() {
        assert_eq!(parse_number("1.234,56"), Some(1234.56));
        assert_eq!(parse_number("1.500.000"), Some(1_500_000.0));
        assert_eq!(parse_number("178,25"), Some(178.25));
    }

    #[test]
    fn accounting_negative() {
        assert_eq!(parse_number("(1,234)"), Some(-1234.0));
    }

    #[test]
    fn garbage_is_none() {
        assert_eq!(parse_number("12,34,56"), None);
        assert_eq!(parse_number("abc"), None);
        assert_eq!(parse_number(""), None);
    }

    #[test]
    fn amounts_with_currency_and_percent() {
        let tokens = scan_amounts("at $178.25 each, up 3.5% from 1.200,50 EUR", 1);
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[0].raw_text, "$178.25");
        assert_eq!(tokens[0].value, Some(178.25));
        assert_eq!(tokens[0].currency.as_deref(), Some("$"));
        assert!(tokens[1].is_percent);
        assert_eq!(tokens[1].value, Some(3.5));
        assert_eq!(tokens[2].currency.as_deref(), Some("EUR"));
        assert_eq!(tokens[2].value, Some(1200.5));
    }

    #[test]
    fn digits_inside_identifiers_are_skipped() {
        let tokens = scan_amounts("ISIN: US0378331005 Apple Inc.", 1);
        assert!(tokens.is_empty());
    }

    #[test]
    fn date_formats() {
        let dates = scan_dates("2024-12-31, 12/31/2024, 31.12.2024, December 31, 2024", 1);
        assert_eq!(dates.len(), 4);
        for d in &dates {
            assert_eq!(d.value, chrono::NaiveDate::from_ymd_opt(2024, 12, 31));
        }
    }

    #[test]
    fn eu_slash_fallback() {
        let dates = scan_dates("due 31/12/2024", 1);
        assert_eq!(dates[0].value, chrono::NaiveDate::from_ymd_opt(2024, 12, 31));
    }

    #[test]
    fn invalid_calendar_date_retained_unparsed() {
        let dates = scan_dates("dated 99.99.2024", 1);
        assert_eq!(dates.len(), 1);
        assert_eq!(dates[0].value, None);
        assert_eq!(dates[0].raw_text, "99.99.2024");
    }

    #[test]
    fn cell_normalization_preserves_raw() {
        let cell = normalize_cell("$1,500,000");
        assert_eq!(cell.raw, "$1,500,000");
        assert_eq!(cell.value, Some(1_500_000.0));
        assert_eq!(cell.currency.as_deref(), Some("$"));

        let pct = normalize_cell("4.2%");
        assert!(pct.is_percent);
        assert_eq!(pct.value, Some(4.2));

        let word = normalize_cell("Security");
        assert_eq!(word.value, None);
        assert_eq!(word.raw, "Security");
    }
}
