//! Shared types for the message classification pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ── Inbound message ─────────────────────────────────────────────────

/// A raw inbound SMS. Created once per call and never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawMessage {
    /// Message body.
    pub text: String,
    /// Sender identifier (short code or header like "VK-HDFCBK"), if known.
    pub sender: Option<String>,
    /// When the message was received.
    pub received_at: DateTime<Utc>,
}

impl RawMessage {
    pub fn new(text: impl Into<String>, sender: Option<String>) -> Self {
        Self {
            text: text.into(),
            sender,
            received_at: Utc::now(),
        }
    }
}

// ── Extraction ──────────────────────────────────────────────────────

/// Transaction direction recognized from the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Credit,
    Debit,
    Refund,
    Failed,
    #[default]
    Unknown,
}

impl TransactionType {
    /// Short label for logging.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Credit => "credit",
            Self::Debit => "debit",
            Self::Refund => "refund",
            Self::Failed => "failed",
            Self::Unknown => "unknown",
        }
    }
}

/// Which extractor produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParsingMethod {
    /// External LLM extractor.
    Primary,
    /// Deterministic regex extractor.
    Fallback,
}

/// Structured fields pulled out of one message.
///
/// Unmatched fields stay empty/`None` — a fully-unknown extraction is still a
/// valid result, not an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub transaction_type: TransactionType,
    /// Transaction amount; always non-negative when present.
    pub amount: Option<f64>,
    pub merchant_name: String,
    /// Masked account/card reference, e.g. "XX1234". Never exposes more than
    /// the last four digits.
    pub account_masked: String,
    /// ISO-8601 date (`YYYY-MM-DD`) or empty when unparseable.
    pub date: String,
    pub parsing_method: ParsingMethod,
}

impl ExtractionResult {
    /// An extraction with no recognized fields.
    pub fn empty(method: ParsingMethod) -> Self {
        Self {
            transaction_type: TransactionType::Unknown,
            amount: None,
            merchant_name: String::new(),
            account_masked: String::new(),
            date: String::new(),
            parsing_method: method,
        }
    }
}

// ── Promotional scoring ─────────────────────────────────────────────

/// Marketing-intent score for one message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromotionScore {
    /// Distinct promotional keywords found, in match order.
    pub matched_keywords: Vec<String>,
    pub has_url: bool,
    pub has_discount: bool,
    pub has_time_limit: bool,
    pub has_amount_offer: bool,
    /// Additive capped score in [0, 1].
    pub score: f64,
    /// True when the score clears the threshold AND no fraud indicator fired.
    pub is_promotional: bool,
    /// Set when a fraud indicator matched — the message must not be filed as
    /// plain marketing regardless of its promo score.
    pub fraud_override: bool,
}

// ── Fraud assessment ────────────────────────────────────────────────

/// Ordinal fraud-severity bucket.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

/// Phishing/fraud risk assessment for one message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FraudAssessment {
    pub risk_level: RiskLevel,
    /// True iff `risk_level` is Medium or High.
    pub is_fraud: bool,
    /// Confidence in [0, 1], scaling with indicator count and severity.
    pub confidence: f64,
    /// Literal substrings that matched an indicator.
    pub flagged_keywords: Vec<String>,
    /// One human-readable explanation per matched category.
    pub reasons: Vec<String>,
}

impl FraudAssessment {
    /// Assessment for a message with no indicators at all.
    pub fn clean() -> Self {
        Self {
            risk_level: RiskLevel::Low,
            is_fraud: false,
            confidence: 0.0,
            flagged_keywords: Vec::new(),
            reasons: Vec::new(),
        }
    }
}

// ── Pipeline result ─────────────────────────────────────────────────

/// Terminal status of one pipeline invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStatus {
    Success,
    Error,
    FilteredOut,
}

/// Unified result for one processed message. The pipeline always returns
/// one of these — it never raises to its caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineResult {
    pub raw_sms: String,
    pub sender: Option<String>,
    pub processed_at: DateTime<Utc>,
    pub processing_time_ms: u64,
    pub is_processed: bool,
    pub is_banking_sms: bool,
    pub is_promotional: bool,
    pub is_fraud: bool,
    pub status: PipelineStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub parsed_data: Option<ExtractionResult>,
    pub fraud_detection: Option<FraudAssessment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub promotion: Option<PromotionScore>,
}

impl PipelineResult {
    /// Skeleton result before any stage has run.
    pub(crate) fn pending(message: &RawMessage) -> Self {
        Self {
            raw_sms: message.text.clone(),
            sender: message.sender.clone(),
            processed_at: Utc::now(),
            processing_time_ms: 0,
            is_processed: false,
            is_banking_sms: false,
            is_promotional: false,
            is_fraud: false,
            status: PipelineStatus::Error,
            error: None,
            parsed_data: None,
            fraud_detection: None,
            promotion: None,
        }
    }
}
