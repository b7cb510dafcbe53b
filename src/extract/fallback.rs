//! Deterministic regex extractor.
//!
//! Always available, never blocks, never errors. Runs standalone when no
//! primary extractor is configured, and as the recovery path when the
//! primary fails or times out.

use chrono::NaiveDate;
use regex::Regex;

use crate::pipeline::types::{ExtractionResult, ParsingMethod, TransactionType};

/// Regex-based field extractor. All patterns are compiled once in `new()`;
/// `parse` is a pure function of its input text.
pub struct FallbackExtractor {
    amount: Regex,
    merchant: Regex,
    account: Regex,
    refund: Regex,
    debit: Regex,
    credit: Regex,
    failed: Regex,
    date_numeric: Regex,
    date_ordinal: Regex,
    date_abbrev: Regex,
}

impl FallbackExtractor {
    pub fn new() -> Self {
        Self {
            amount: Regex::new(r"(?i)(?:rs\.?|inr|₹|\$|€|£)\s*([0-9][0-9,]*(?:\.[0-9]+)?)")
                .unwrap(),
            // Merchant follows "at" or "to"; stops at sentence punctuation.
            merchant: Regex::new(r"(?i)\b(?:at|to)\s+([A-Za-z][^.,;:!?\n]*)").unwrap(),
            // Masked account like XX1234 or xxxx5678. The trailing boundary
            // rejects longer digit runs that are not a last-4 mask.
            account: Regex::new(r"\b[Xx]+[0-9]{4}\b").unwrap(),
            refund: Regex::new(r"(?i)\b(?:refund\w*|reversed|reversal)\b").unwrap(),
            debit: Regex::new(
                r"(?i)\b(?:debited|debit|spent|charged|paid|withdrawn|deducted|purchase|sent)\b",
            )
            .unwrap(),
            credit: Regex::new(r"(?i)\b(?:credited|credit|received|deposited|added)\b").unwrap(),
            failed: Regex::new(r"(?i)\b(?:failed|declined|unsuccessful)\b").unwrap(),
            date_numeric: Regex::new(r"\b([0-9]{1,2})[-/]([0-9]{1,2})[-/]([0-9]{2,4})\b").unwrap(),
            date_ordinal: Regex::new(
                r"(?i)\b([0-9]{1,2})(?:st|nd|rd|th)?\s+(jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\.?\s+([0-9]{4})\b",
            )
            .unwrap(),
            date_abbrev: Regex::new(
                r"(?i)\b([0-9]{1,2})-(jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)-([0-9]{2,4})\b",
            )
            .unwrap(),
        }
    }

    /// Extract whatever the patterns can find. Fields that match nothing
    /// stay empty; the result is always usable.
    pub fn parse(&self, text: &str) -> ExtractionResult {
        ExtractionResult {
            transaction_type: self.transaction_type(text),
            amount: self.extract_amount(text),
            merchant_name: self.extract_merchant(text),
            account_masked: self.extract_account(text),
            date: self.extract_date(text),
            parsing_method: ParsingMethod::Fallback,
        }
    }

    /// Refund outranks debit: "refund of Rs.500 debited earlier" is a refund.
    fn transaction_type(&self, text: &str) -> TransactionType {
        if self.refund.is_match(text) {
            TransactionType::Refund
        } else if self.debit.is_match(text) {
            TransactionType::Debit
        } else if self.credit.is_match(text) {
            TransactionType::Credit
        } else if self.failed.is_match(text) {
            TransactionType::Failed
        } else {
            TransactionType::Unknown
        }
    }

    fn extract_amount(&self, text: &str) -> Option<f64> {
        let caps = self.amount.captures(text)?;
        let digits = caps.get(1)?.as_str().replace(',', "");
        digits.parse::<f64>().ok().filter(|v| *v >= 0.0)
    }

    fn extract_merchant(&self, text: &str) -> String {
        self.merchant
            .captures(text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim().to_string())
            .unwrap_or_default()
    }

    fn extract_account(&self, text: &str) -> String {
        self.account
            .find(text)
            .map(|m| m.as_str().to_string())
            .unwrap_or_default()
    }

    /// First recognizable date, normalized to `YYYY-MM-DD`. Calendar-invalid
    /// dates (e.g. 32-13-2024) are dropped rather than guessed at.
    fn extract_date(&self, text: &str) -> String {
        if let Some(caps) = self.date_numeric.captures(text) {
            let day: u32 = caps[1].parse().unwrap_or(0);
            let month: u32 = caps[2].parse().unwrap_or(0);
            let year = normalize_year(&caps[3]);
            if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
                return date.format("%Y-%m-%d").to_string();
            }
        }
        if let Some(caps) = self.date_ordinal.captures(text) {
            let day: u32 = caps[1].parse().unwrap_or(0);
            let month = month_number(&caps[2]);
            let year: i32 = caps[3].parse().unwrap_or(0);
            if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
                return date.format("%Y-%m-%d").to_string();
            }
        }
        if let Some(caps) = self.date_abbrev.captures(text) {
            let day: u32 = caps[1].parse().unwrap_or(0);
            let month = month_number(&caps[2]);
            let year = normalize_year(&caps[3]);
            if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
                return date.format("%Y-%m-%d").to_string();
            }
        }
        String::new()
    }
}

impl Default for FallbackExtractor {
    fn default() -> Self {
        Self::new()
    }
}

fn normalize_year(raw: &str) -> i32 {
    let year: i32 = raw.parse().unwrap_or(0);
    if raw.len() == 2 { 2000 + year } else { year }
}

fn month_number(abbrev: &str) -> u32 {
    match abbrev.to_lowercase().as_str() {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_standard_debit_sms() {
        let extractor = FallbackExtractor::new();
        let result = extractor.parse(
            "Dear Customer, Rs.500.00 has been debited from your account XX1234 \
             on 15-03-2024 at AMAZON. Avl Bal: Rs.12,345.67",
        );
        assert_eq!(result.transaction_type, TransactionType::Debit);
        assert_eq!(result.amount, Some(500.0));
        assert_eq!(result.account_masked, "XX1234");
        assert_eq!(result.date, "2024-03-15");
        assert_eq!(result.merchant_name, "AMAZON");
        assert_eq!(result.parsing_method, ParsingMethod::Fallback);
    }

    #[test]
    fn refund_outranks_debit_keywords() {
        let extractor = FallbackExtractor::new();
        let result =
            extractor.parse("Refund of Rs.250 processed for amount debited at FLIPKART");
        assert_eq!(result.transaction_type, TransactionType::Refund);
    }

    #[test]
    fn credit_and_failed_types() {
        let extractor = FallbackExtractor::new();
        assert_eq!(
            extractor.parse("Rs.1,000 credited to a/c XX9876").transaction_type,
            TransactionType::Credit
        );
        assert_eq!(
            extractor
                .parse("Transaction of Rs.99 declined due to insufficient balance")
                .transaction_type,
            TransactionType::Failed
        );
    }

    #[test]
    fn amount_strips_thousands_separators() {
        let extractor = FallbackExtractor::new();
        assert_eq!(
            extractor.parse("INR 1,23,456.78 credited").amount,
            Some(123456.78)
        );
    }

    #[test]
    fn unmatched_fields_stay_empty() {
        let extractor = FallbackExtractor::new();
        let result = extractor.parse("your package has shipped");
        assert_eq!(result.transaction_type, TransactionType::Unknown);
        assert!(result.amount.is_none());
        assert!(result.merchant_name.is_empty());
        assert!(result.account_masked.is_empty());
        assert!(result.date.is_empty());
    }

    #[test]
    fn account_mask_requires_exactly_four_trailing_digits() {
        let extractor = FallbackExtractor::new();
        assert_eq!(extractor.parse("a/c xxxx5678 debited").account_masked, "xxxx5678");
        assert_eq!(extractor.parse("ref XX78901 debited").account_masked, "");
    }

    #[test]
    fn already_masked_account_passes_through_unchanged() {
        let extractor = FallbackExtractor::new();
        let first = extractor.parse("Rs.10 debited from XX1234");
        let again = extractor.parse(&format!("Rs.10 debited from {}", first.account_masked));
        assert_eq!(again.account_masked, first.account_masked);
    }

    #[test]
    fn ordinal_and_abbreviated_dates() {
        let extractor = FallbackExtractor::new();
        assert_eq!(
            extractor.parse("paid on 3rd March 2024 at STORE").date,
            "2024-03-03"
        );
        assert_eq!(extractor.parse("debited on 15-Mar-24").date, "2024-03-15");
        assert_eq!(extractor.parse("debited on 15-Mar-2024").date, "2024-03-15");
    }

    #[test]
    fn calendar_invalid_dates_are_dropped() {
        let extractor = FallbackExtractor::new();
        assert_eq!(extractor.parse("debited on 32-13-2024").date, "");
    }

    #[test]
    fn parse_is_pure() {
        let extractor = FallbackExtractor::new();
        let text = "Rs.500.00 debited from XX1234 on 15-03-2024 at AMAZON";
        assert_eq!(extractor.parse(text), extractor.parse(text));
    }
}
