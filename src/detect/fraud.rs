//! Fraud detector: maps indicator hits to a risk bucket and confidence.

use std::sync::Arc;

use tracing::debug;

use super::indicators::IndicatorTable;
use crate::pipeline::types::{FraudAssessment, RiskLevel};

pub struct FraudDetector {
    indicators: Arc<IndicatorTable>,
}

impl FraudDetector {
    pub fn new(indicators: Arc<IndicatorTable>) -> Self {
        Self { indicators }
    }

    /// Assess a message. Always runs on the raw text, regardless of what
    /// extraction produced.
    pub fn detect(&self, text: &str) -> FraudAssessment {
        let hits = self.indicators.scan(text);
        if hits.is_empty() {
            return FraudAssessment::clean();
        }

        let high_severity = hits.iter().any(|h| h.category.is_high_severity());
        let risk_level = if high_severity {
            RiskLevel::High
        } else {
            RiskLevel::Medium
        };

        // Base 0.4 for one indicator, +0.15 per extra, +0.2 for a
        // high-severity category, capped at 1.0.
        let mut confidence = 0.4 + 0.15 * (hits.len() as f64 - 1.0);
        if high_severity {
            confidence += 0.2;
        }
        let confidence = confidence.min(1.0);

        let flagged_keywords: Vec<String> = hits.iter().map(|h| h.matched.clone()).collect();
        let reasons: Vec<String> = hits
            .iter()
            .map(|h| h.category.reason().to_string())
            .collect();

        debug!(
            risk = risk_level.label(),
            indicators = hits.len(),
            "fraud indicators matched"
        );

        FraudAssessment {
            risk_level,
            is_fraud: risk_level > RiskLevel::Low,
            confidence,
            flagged_keywords,
            reasons,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detector() -> FraudDetector {
        FraudDetector::new(Arc::new(IndicatorTable::new()))
    }

    #[test]
    fn credential_request_is_high_risk() {
        let assessment = detector().detect("Share your PIN to complete verification");
        assert_eq!(assessment.risk_level, RiskLevel::High);
        assert!(assessment.is_fraud);
        assert!(!assessment.flagged_keywords.is_empty());
        assert!(!assessment.reasons.is_empty());
    }

    #[test]
    fn account_locked_with_link_is_high_risk() {
        let assessment = detector().detect(
            "Your account has been locked. Click here to unlock: http://fake-bank.com/unlock",
        );
        assert_eq!(assessment.risk_level, RiskLevel::High);
        assert!(assessment.is_fraud);
        assert!(assessment
            .reasons
            .iter()
            .any(|r| r.contains("phishing pretext")));
    }

    #[test]
    fn urgency_with_link_alone_is_medium_risk() {
        let assessment = detector().detect("Act now! Limited stock: https://example.com/sale");
        assert_eq!(assessment.risk_level, RiskLevel::Medium);
        assert!(assessment.is_fraud);
    }

    #[test]
    fn clean_transaction_sms_is_low_risk() {
        let assessment = detector().detect(
            "Dear Customer, Rs.500.00 has been debited from your account XX1234 on 15-03-2024 at AMAZON.",
        );
        assert_eq!(assessment.risk_level, RiskLevel::Low);
        assert!(!assessment.is_fraud);
        assert_eq!(assessment.confidence, 0.0);
        assert!(assessment.flagged_keywords.is_empty());
    }

    #[test]
    fn confidence_grows_with_hits_and_severity() {
        let d = detector();
        let one_medium = d.detect("Act now, click https://example.com");
        assert!((one_medium.confidence - 0.4).abs() < 1e-9);

        let one_high = d.detect("Please confirm your OTP");
        assert!((one_high.confidence - 0.6).abs() < 1e-9);

        let many = d.detect("URGENT: account blocked, verify OTP at bit.ly/x click now");
        assert!(many.confidence <= 1.0);
        assert!(many.confidence > one_high.confidence);
    }

    #[test]
    fn confidence_is_capped_at_one() {
        let assessment = detector().detect(
            "URGENT winner! Your account is blocked, share OTP and password, \
             click bit.ly/claim immediately to claim your prize",
        );
        assert!(assessment.confidence <= 1.0);
    }
}
