//! Shared fraud-indicator taxonomy.
//!
//! One immutable table of compiled patterns, built once at startup and shared
//! by both the fraud detector and the promotional detector (which must defer
//! to fraud signals). Categories mirror the classic SMS phishing playbook:
//! KYC/account-block pretexts, credential requests, prize bait, link
//! shorteners, and urgency paired with a link.

use regex::Regex;

/// A named category of suspicious textual pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum IndicatorCategory {
    KycPhishing,
    CredentialPhishing,
    PrizeScam,
    UrlShortener,
    UrgentWithLink,
}

impl IndicatorCategory {
    /// Categories that alone push the risk bucket to High.
    pub fn is_high_severity(&self) -> bool {
        matches!(self, Self::KycPhishing | Self::CredentialPhishing)
    }

    /// Short label for logging and persisted records.
    pub fn label(&self) -> &'static str {
        match self {
            Self::KycPhishing => "kyc_phishing",
            Self::CredentialPhishing => "credential_phishing",
            Self::PrizeScam => "prize_scam",
            Self::UrlShortener => "url_shortener",
            Self::UrgentWithLink => "urgent_with_link",
        }
    }

    /// Human-readable explanation attached to fraud assessments.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::KycPhishing => {
                "references KYC update or account blocking, a common phishing pretext"
            }
            Self::CredentialPhishing => {
                "asks for credentials such as PIN, OTP or password"
            }
            Self::PrizeScam => "claims a prize or lottery win and asks to be contacted",
            Self::UrlShortener => "contains a link-shortener URL that hides its destination",
            Self::UrgentWithLink => "combines urgent language with a link",
        }
    }
}

/// One matched indicator: the category plus the literal substring that fired.
#[derive(Debug, Clone)]
pub struct IndicatorHit {
    pub category: IndicatorCategory,
    pub matched: String,
}

/// Compiled indicator patterns. Read-only after construction; safe to share
/// across concurrent pipeline invocations without locking.
pub struct IndicatorTable {
    kyc: Regex,
    credential: Regex,
    prize: Regex,
    contact_cue: Regex,
    shortener: Regex,
    urgency: Regex,
    link_cue: Regex,
}

impl IndicatorTable {
    pub fn new() -> Self {
        Self {
            kyc: Regex::new(
                r"(?i)\b(?:update\s+your\s+kyc|kyc\s+(?:update|expir\w*|verif\w*|pending)|account\s+(?:is\s+|has\s+been\s+|will\s+be\s+)?(?:block|lock|suspend)\w*|card\s+(?:is\s+|has\s+been\s+)?blocked)",
            )
            .unwrap(),
            credential: Regex::new(
                r"(?i)\b(?:password|otp|pin|cvv|security\s+code|login\s+(?:id|details|credentials)|verify\s+your\s+(?:identity|account))\b",
            )
            .unwrap(),
            prize: Regex::new(
                r"(?i)\b(?:won|winner|lottery|lucky\s+draw|prize)\b",
            )
            .unwrap(),
            contact_cue: Regex::new(r"(?i)\b(?:click|link|call|visit)\b|https?://").unwrap(),
            shortener: Regex::new(
                r"(?i)\b(?:bit\.ly|tinyurl\.com|goo\.gl|t\.co|is\.gd|ow\.ly|j\.mp|cutt\.us|rb\.gy|tiny\.cc)/[a-zA-Z0-9]+",
            )
            .unwrap(),
            urgency: Regex::new(
                r"(?i)\b(?:urgent\w*|immediately|act\s+now|right\s+away|within\s+24\s+hours)\b",
            )
            .unwrap(),
            link_cue: Regex::new(r"(?i)\bclick\b|\blink\b|https?://").unwrap(),
        }
    }

    /// Scan a message for all indicator categories.
    ///
    /// Returns at most one hit per category, carrying the literal matched
    /// substring. Hit order follows category declaration order, so reasons
    /// built from hits are stable.
    pub fn scan(&self, text: &str) -> Vec<IndicatorHit> {
        let mut hits = Vec::new();

        if let Some(m) = self.kyc.find(text) {
            hits.push(IndicatorHit {
                category: IndicatorCategory::KycPhishing,
                matched: m.as_str().to_string(),
            });
        }
        if let Some(m) = self.credential.find(text) {
            hits.push(IndicatorHit {
                category: IndicatorCategory::CredentialPhishing,
                matched: m.as_str().to_string(),
            });
        }
        // Prize bait only counts when paired with a contact cue; bare "won"
        // shows up in legitimate cashback/reward messages.
        if let Some(m) = self.prize.find(text)
            && self.contact_cue.is_match(text)
        {
            hits.push(IndicatorHit {
                category: IndicatorCategory::PrizeScam,
                matched: m.as_str().to_string(),
            });
        }
        if let Some(m) = self.shortener.find(text) {
            hits.push(IndicatorHit {
                category: IndicatorCategory::UrlShortener,
                matched: m.as_str().to_string(),
            });
        }
        if let Some(m) = self.urgency.find(text)
            && self.link_cue.is_match(text)
        {
            hits.push(IndicatorHit {
                category: IndicatorCategory::UrgentWithLink,
                matched: m.as_str().to_string(),
            });
        }

        hits
    }
}

impl Default for IndicatorTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn categories(text: &str) -> Vec<IndicatorCategory> {
        IndicatorTable::new()
            .scan(text)
            .into_iter()
            .map(|h| h.category)
            .collect()
    }

    #[test]
    fn kyc_update_phrase_fires() {
        assert_eq!(
            categories("Update your KYC now to avoid disruption"),
            vec![IndicatorCategory::KycPhishing]
        );
    }

    #[test]
    fn account_locked_phrase_fires_kyc_category() {
        assert!(
            categories("Your account has been locked. Call support.")
                .contains(&IndicatorCategory::KycPhishing)
        );
    }

    #[test]
    fn pin_request_fires_credential_category() {
        assert_eq!(
            categories("Please enter your PIN to verify the transaction"),
            vec![IndicatorCategory::CredentialPhishing]
        );
    }

    #[test]
    fn pin_does_not_match_inside_words() {
        assert!(categories("Thank you for shopping with us").is_empty());
    }

    #[test]
    fn prize_requires_contact_cue() {
        assert!(categories("You are a lucky draw winner!").is_empty());
        assert_eq!(
            categories("You are a lucky draw winner! Call 99999 to claim"),
            vec![IndicatorCategory::PrizeScam]
        );
    }

    #[test]
    fn shortener_path_fires() {
        assert_eq!(
            categories("Renew today at bit.ly/upd8 for instant benefits"),
            vec![IndicatorCategory::UrlShortener]
        );
    }

    #[test]
    fn urgency_alone_is_not_enough() {
        assert!(categories("Urgent: office closed tomorrow").is_empty());
        assert_eq!(
            categories("Urgent: confirm today at https://example.com/go"),
            vec![IndicatorCategory::UrgentWithLink]
        );
    }

    #[test]
    fn clean_banking_sms_has_no_hits() {
        assert!(categories(
            "Dear Customer, Rs.500.00 has been debited from your account XX1234 on 15-03-2024."
        )
        .is_empty());
    }

    #[test]
    fn multiple_categories_reported_in_order() {
        let cats = categories("URGENT: account blocked, verify OTP at bit.ly/x click now");
        assert_eq!(
            cats,
            vec![
                IndicatorCategory::KycPhishing,
                IndicatorCategory::CredentialPhishing,
                IndicatorCategory::UrlShortener,
                IndicatorCategory::UrgentWithLink,
            ]
        );
    }
}
