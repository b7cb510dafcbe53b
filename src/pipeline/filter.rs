//! Light filter — cheap pre-check that rejects non-financial messages
//! before any expensive extraction runs.
//!
//! A reject routes the pipeline straight to the `filtered_out` terminal.
//! False negatives are worse than false positives here, so the keyword
//! table is deliberately broad.

use regex::Regex;

/// Financial-transaction keywords checked as substrings of the lowercased
/// text. Includes account markers (a/c, kyc) so that account-themed phishing
/// still reaches the fraud detector instead of being filtered out.
const FINANCIAL_KEYWORDS: &[&str] = &[
    "debited",
    "credited",
    "withdrawn",
    "deposited",
    "transferred",
    "spent",
    "paid",
    "payment",
    "purchase",
    "refund",
    "balance",
    "a/c",
    "account",
    "card",
    "transaction",
    "upi",
    "neft",
    "rtgs",
    "imps",
    "emi",
    "kyc",
];

/// Cheap gate deciding whether a message is worth full processing.
pub struct LightFilter {
    currency: Regex,
}

impl LightFilter {
    pub fn new() -> Self {
        // Currency symbol or code followed by digits. The regex crate
        // guarantees linear-time matching, no backtracking.
        let currency =
            Regex::new(r"(?i)(?:rs\.?|inr|₹|\$|€|£)\s*[0-9][0-9,]*(?:\.[0-9]+)?").unwrap();
        Self { currency }
    }

    /// Returns true when the text looks like it could be a financial message.
    /// Never panics; empty input fails.
    pub fn is_relevant(&self, text: &str) -> bool {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return false;
        }
        let lower = trimmed.to_lowercase();
        if FINANCIAL_KEYWORDS.iter().any(|kw| lower.contains(kw)) {
            return true;
        }
        self.currency.is_match(trimmed)
    }
}

impl Default for LightFilter {
    fn default() -> Self {
        Self::new()
    }
}
