//! Store trait — minimal interface for pipeline persistence.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::StoreError;

/// A successfully classified banking transaction.
#[derive(Debug, Clone)]
pub struct TransactionRecord {
    pub sender: Option<String>,
    pub raw_sms: String,
    pub transaction_type: String,
    pub amount: Option<f64>,
    pub merchant_name: String,
    pub account_masked: String,
    pub transaction_date: String,
    pub parsing_method: String,
    pub processing_time_ms: u64,
    pub created_at: DateTime<Utc>,
}

/// A message the fraud detector flagged.
#[derive(Debug, Clone)]
pub struct FraudLogRecord {
    pub sender: Option<String>,
    pub raw_sms: String,
    pub risk_level: String,
    pub confidence: f64,
    /// Flagged keywords as a JSON array.
    pub flagged_keywords: String,
    /// Reasons as a JSON array.
    pub reasons: String,
    /// Extraction result as a JSON object; kept alongside the evidence so
    /// flagged messages can still be inspected as transactions.
    pub parsed_data: String,
    pub created_at: DateTime<Utc>,
}

/// A message filed as marketing.
#[derive(Debug, Clone)]
pub struct PromoRecord {
    pub sender: Option<String>,
    pub raw_sms: String,
    pub score: f64,
    /// Matched keywords as a JSON array.
    pub matched_keywords: String,
    pub has_url: bool,
    /// Extraction result as a JSON object.
    pub parsed_data: String,
    pub created_at: DateTime<Utc>,
}

/// Backend-agnostic persistence trait.
///
/// The pipeline calls these from detached tasks; failures are logged and
/// never surface into a classification result.
#[async_trait]
pub trait Store: Send + Sync {
    async fn save_transaction(&self, record: &TransactionRecord) -> Result<(), StoreError>;

    async fn save_fraud_log(&self, record: &FraudLogRecord) -> Result<(), StoreError>;

    async fn save_promotional(&self, record: &PromoRecord) -> Result<(), StoreError>;

    async fn count_transactions(&self) -> Result<i64, StoreError>;

    async fn count_fraud_logs(&self) -> Result<i64, StoreError>;

    async fn count_promotional(&self) -> Result<i64, StoreError>;
}
