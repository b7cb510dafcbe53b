//! Promotional detector: additive keyword/pattern score with a fraud
//! override so phishing dressed as marketing is never filed as marketing.

use std::sync::Arc;

use regex::Regex;
use tracing::debug;

use super::indicators::IndicatorTable;
use crate::pipeline::types::PromotionScore;

/// Marketing vocabulary checked as substrings of the lowercased text.
const PROMO_KEYWORDS: &[&str] = &[
    "offer",
    "discount",
    "sale",
    "cashback",
    "exclusive",
    "limited time",
    "special",
    "deal",
    "promotion",
    "promo",
    "voucher",
    "coupon",
    "code",
    "festival",
    "bonus",
    "reward",
    "membership",
    "free",
    "hurry",
    "win",
    "prize",
    "lucky",
    "draw",
];

pub struct PromotionalDetector {
    url: Regex,
    discount: Regex,
    time_limit: Regex,
    amount_offer: Regex,
    indicators: Arc<IndicatorTable>,
    threshold: f64,
}

impl PromotionalDetector {
    pub fn new(indicators: Arc<IndicatorTable>, threshold: f64) -> Self {
        Self {
            url: Regex::new(r"(?i)https?://\S+|\bwww\.\S+").unwrap(),
            discount: Regex::new(r"(?i)\b[0-9]{1,3}%\s*(?:off|discount)").unwrap(),
            time_limit: Regex::new(
                r"(?i)\b(?:valid\s+(?:till|until|up\s*to)|offer\s+ends|today\s+only|last\s+day|limited\s+(?:time|period)|expires)\b",
            )
            .unwrap(),
            amount_offer: Regex::new(
                r"(?i)(?:rs\.?|inr|₹)\s*[0-9][0-9,]*(?:\.[0-9]+)?\s*(?:off|discount|cashback)",
            )
            .unwrap(),
            indicators,
            threshold,
        }
    }

    /// Score a message for marketing intent.
    ///
    /// The score is additive and capped at 1.0. Classification requires the
    /// score to strictly exceed the threshold AND no fraud indicator to have
    /// fired; a fraud hit sets `fraud_override` and forces the verdict to
    /// not-promotional regardless of score.
    pub fn score(&self, text: &str) -> PromotionScore {
        let lower = text.to_lowercase();
        let matched_keywords: Vec<String> = PROMO_KEYWORDS
            .iter()
            .filter(|kw| lower.contains(*kw))
            .map(|kw| kw.to_string())
            .collect();

        let has_url = self.url.is_match(text);
        let has_discount = self.discount.is_match(text);
        let has_time_limit = self.time_limit.is_match(text);
        let has_amount_offer = self.amount_offer.is_match(text);

        let mut score = 0.0;
        if !matched_keywords.is_empty() {
            score += 0.4;
        }
        if has_url {
            score += 0.3;
        }
        if has_discount {
            score += 0.3;
        }
        if has_time_limit {
            score += 0.2;
        }
        if has_amount_offer {
            score += 0.25;
        }
        let score = f64::min(score, 1.0);

        let fraud_override = !self.indicators.scan(text).is_empty();
        let is_promotional = score > self.threshold && !fraud_override;

        if fraud_override && score > self.threshold {
            debug!(score, "promotional score overridden by fraud indicator");
        }

        PromotionScore {
            matched_keywords,
            has_url,
            has_discount,
            has_time_limit,
            has_amount_offer,
            score,
            is_promotional,
            fraud_override,
        }
    }
}
