//! Pipeline orchestrator.
//!
//! Drives one message through filter, extraction, fraud check and
//! promotional check, and always hands back a [`PipelineResult`]. The only
//! routes out are the terminals: filtered_out, fraud, promotional,
//! transaction, or an error result with partial diagnostics retained.
//! Persistence is fire-and-forget; a failed write never changes a verdict.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::{debug, error, info};

use crate::config::PipelineConfig;
use crate::detect::{FraudDetector, IndicatorTable, PromotionalDetector};
use crate::error::PipelineError;
use crate::extract::{Extractor, ExtractorStack};
use crate::pipeline::filter::LightFilter;
use crate::pipeline::types::{PipelineResult, PipelineStatus, RawMessage};
use crate::store::{FraudLogRecord, PromoRecord, Store, TransactionRecord};

pub struct SmsPipeline {
    filter: LightFilter,
    extractor: ExtractorStack,
    fraud: FraudDetector,
    promo: PromotionalDetector,
    store: Arc<dyn Store>,
    /// Handles of detached persistence writes, drained by `flush_writes`.
    writes: tokio::sync::Mutex<Vec<tokio::task::JoinHandle<()>>>,
}

impl SmsPipeline {
    /// Build a pipeline. The indicator table is compiled once here and
    /// shared between the fraud and promotional detectors.
    pub fn new(
        store: Arc<dyn Store>,
        config: &PipelineConfig,
        primary: Option<Arc<dyn Extractor>>,
    ) -> Self {
        let indicators = Arc::new(IndicatorTable::new());
        let extractor = match primary {
            Some(primary) => ExtractorStack::new(primary, config.extractor_timeout),
            None => ExtractorStack::fallback_only(),
        };
        Self {
            filter: LightFilter::new(),
            extractor,
            fraud: FraudDetector::new(Arc::clone(&indicators)),
            promo: PromotionalDetector::new(indicators, config.promo_threshold),
            store,
            writes: tokio::sync::Mutex::new(Vec::new()),
        }
    }

    /// Wait for every persistence write issued so far to land.
    ///
    /// Classification never waits on writes; callers that need durable
    /// counts (shutdown, end of batch) call this explicitly.
    pub async fn flush_writes(&self) {
        let handles: Vec<_> = self.writes.lock().await.drain(..).collect();
        for handle in handles {
            let _ = handle.await;
        }
    }

    /// Classify one message. Never returns an error: failures after the
    /// filter decision become a result with `status = error`.
    pub async fn process(&self, message: RawMessage) -> PipelineResult {
        let started = Instant::now();
        let mut result = PipelineResult::pending(&message);

        if !self.filter.is_relevant(&message.text) {
            result.status = PipelineStatus::FilteredOut;
            result.processing_time_ms = started.elapsed().as_millis() as u64;
            debug!(sender = ?message.sender, "message filtered out");
            return result;
        }

        match self.run_stages(&message, &mut result, started).await {
            Ok(()) => {
                result.status = PipelineStatus::Success;
                result.is_processed = true;
            }
            Err(err) => {
                error!(error = %err, "pipeline stage failed");
                result.status = PipelineStatus::Error;
                result.error = Some(err.to_string());
            }
        }

        result.processing_time_ms = started.elapsed().as_millis() as u64;
        result
    }

    /// Classify a batch sequentially, one result per input.
    pub async fn process_batch(&self, messages: Vec<RawMessage>) -> Vec<PipelineResult> {
        let mut results = Vec::with_capacity(messages.len());
        for message in messages {
            results.push(self.process(message).await);
        }
        results
    }

    async fn run_stages(
        &self,
        message: &RawMessage,
        result: &mut PipelineResult,
        started: Instant,
    ) -> Result<(), PipelineError> {
        let extraction = self.extractor.extract(&message.text).await;
        result.parsed_data = Some(extraction.clone());

        // Fraud always runs on the raw text; a primary extractor that
        // cleaned the message up must not hide phishing markers.
        let assessment = self.fraud.detect(&message.text);
        result.is_fraud = assessment.is_fraud;
        result.fraud_detection = Some(assessment.clone());

        if assessment.is_fraud {
            info!(
                risk = assessment.risk_level.label(),
                confidence = assessment.confidence,
                "message classified as fraud"
            );
            let record = FraudLogRecord {
                sender: message.sender.clone(),
                raw_sms: message.text.clone(),
                risk_level: assessment.risk_level.label().to_string(),
                confidence: assessment.confidence,
                flagged_keywords: to_json(&assessment.flagged_keywords)?,
                reasons: to_json(&assessment.reasons)?,
                parsed_data: to_json(&extraction)?,
                created_at: Utc::now(),
            };
            let store = Arc::clone(&self.store);
            self.track(tokio::spawn(async move {
                if let Err(e) = store.save_fraud_log(&record).await {
                    error!(error = %e, "failed to persist fraud log");
                }
            }))
            .await;
            return Ok(());
        }

        let promo = self.promo.score(&message.text);
        result.is_promotional = promo.is_promotional;
        result.promotion = Some(promo.clone());

        if promo.is_promotional {
            info!(score = promo.score, "message classified as promotional");
            let record = PromoRecord {
                sender: message.sender.clone(),
                raw_sms: message.text.clone(),
                score: promo.score,
                matched_keywords: to_json(&promo.matched_keywords)?,
                has_url: promo.has_url,
                parsed_data: to_json(&extraction)?,
                created_at: Utc::now(),
            };
            let store = Arc::clone(&self.store);
            self.track(tokio::spawn(async move {
                if let Err(e) = store.save_promotional(&record).await {
                    error!(error = %e, "failed to persist promotional record");
                }
            }))
            .await;
            return Ok(());
        }

        // Transaction terminal. A fully-unknown extraction still lands here
        // and is persisted; it passed the filter, so it stays visible.
        result.is_banking_sms = true;
        info!(
            transaction_type = extraction.transaction_type.label(),
            amount = ?extraction.amount,
            "message classified as transaction"
        );
        let record = TransactionRecord {
            sender: message.sender.clone(),
            raw_sms: message.text.clone(),
            transaction_type: extraction.transaction_type.label().to_string(),
            amount: extraction.amount,
            merchant_name: extraction.merchant_name,
            account_masked: extraction.account_masked,
            transaction_date: extraction.date,
            parsing_method: match extraction.parsing_method {
                crate::pipeline::types::ParsingMethod::Primary => "primary".to_string(),
                crate::pipeline::types::ParsingMethod::Fallback => "fallback".to_string(),
            },
            processing_time_ms: started.elapsed().as_millis() as u64,
            created_at: Utc::now(),
        };
        let store = Arc::clone(&self.store);
        self.track(tokio::spawn(async move {
            if let Err(e) = store.save_transaction(&record).await {
                error!(error = %e, "failed to persist transaction");
            }
        }))
        .await;

        Ok(())
    }

    async fn track(&self, handle: tokio::task::JoinHandle<()>) {
        self.writes.lock().await.push(handle);
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, PipelineError> {
    serde_json::to_string(value).map_err(|e| PipelineError::Serialization(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;

    use crate::error::{ExtractorError, StoreError};
    use crate::pipeline::types::{ExtractionResult, ParsingMethod, RiskLevel, TransactionType};

    // ── Test doubles ────────────────────────────────────────────────

    #[derive(Default)]
    struct RecordingStore {
        transactions: Mutex<Vec<TransactionRecord>>,
        fraud_logs: Mutex<Vec<FraudLogRecord>>,
        promos: Mutex<Vec<PromoRecord>>,
    }

    #[async_trait]
    impl Store for RecordingStore {
        async fn save_transaction(&self, record: &TransactionRecord) -> Result<(), StoreError> {
            self.transactions.lock().unwrap().push(record.clone());
            Ok(())
        }

        async fn save_fraud_log(&self, record: &FraudLogRecord) -> Result<(), StoreError> {
            self.fraud_logs.lock().unwrap().push(record.clone());
            Ok(())
        }

        async fn save_promotional(&self, record: &PromoRecord) -> Result<(), StoreError> {
            self.promos.lock().unwrap().push(record.clone());
            Ok(())
        }

        async fn count_transactions(&self) -> Result<i64, StoreError> {
            Ok(self.transactions.lock().unwrap().len() as i64)
        }

        async fn count_fraud_logs(&self) -> Result<i64, StoreError> {
            Ok(self.fraud_logs.lock().unwrap().len() as i64)
        }

        async fn count_promotional(&self) -> Result<i64, StoreError> {
            Ok(self.promos.lock().unwrap().len() as i64)
        }
    }

    struct FailingStore;

    #[async_trait]
    impl Store for FailingStore {
        async fn save_transaction(&self, _: &TransactionRecord) -> Result<(), StoreError> {
            Err(StoreError::Query("disk full".into()))
        }

        async fn save_fraud_log(&self, _: &FraudLogRecord) -> Result<(), StoreError> {
            Err(StoreError::Query("disk full".into()))
        }

        async fn save_promotional(&self, _: &PromoRecord) -> Result<(), StoreError> {
            Err(StoreError::Query("disk full".into()))
        }

        async fn count_transactions(&self) -> Result<i64, StoreError> {
            Ok(0)
        }

        async fn count_fraud_logs(&self) -> Result<i64, StoreError> {
            Ok(0)
        }

        async fn count_promotional(&self) -> Result<i64, StoreError> {
            Ok(0)
        }
    }

    struct MockPrimary(ExtractionResult);

    #[async_trait]
    impl Extractor for MockPrimary {
        fn name(&self) -> &str {
            "mock"
        }

        async fn extract(&self, _text: &str) -> Result<ExtractionResult, ExtractorError> {
            Ok(self.0.clone())
        }
    }

    struct BrokenPrimary;

    #[async_trait]
    impl Extractor for BrokenPrimary {
        fn name(&self) -> &str {
            "broken"
        }

        async fn extract(&self, _text: &str) -> Result<ExtractionResult, ExtractorError> {
            Err(ExtractorError::RequestFailed {
                extractor: "broken".into(),
                reason: "connection refused".into(),
            })
        }
    }

    fn pipeline_with(store: Arc<dyn Store>) -> SmsPipeline {
        SmsPipeline::new(store, &PipelineConfig::default(), None)
    }

    const DEBIT_SMS: &str = "Dear Customer, Rs.500.00 has been debited from your account XX1234 \
                             on 15-03-2024 at AMAZON. Avl Bal: Rs.12,345.67";

    // ── Terminals ───────────────────────────────────────────────────

    #[tokio::test]
    async fn debit_sms_reaches_transaction_terminal() {
        let store = Arc::new(RecordingStore::default());
        let pipeline = pipeline_with(store.clone());

        let result = pipeline
            .process(RawMessage::new(DEBIT_SMS, Some("VK-HDFCBK".into())))
            .await;

        assert_eq!(result.status, PipelineStatus::Success);
        assert!(result.is_processed);
        assert!(result.is_banking_sms);
        assert!(!result.is_fraud);
        assert!(!result.is_promotional);

        let parsed = result.parsed_data.unwrap();
        assert_eq!(parsed.transaction_type, TransactionType::Debit);
        assert_eq!(parsed.amount, Some(500.0));
        assert_eq!(parsed.account_masked, "XX1234");
        assert_eq!(parsed.date, "2024-03-15");

        pipeline.flush_writes().await;
        let transactions = store.transactions.lock().unwrap();
        assert_eq!(transactions.len(), 1);
        assert_eq!(transactions[0].transaction_type, "debit");
        assert!(store.fraud_logs.lock().unwrap().is_empty());
        assert!(store.promos.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn irrelevant_message_is_filtered_without_persistence() {
        let store = Arc::new(RecordingStore::default());
        let pipeline = pipeline_with(store.clone());

        let result = pipeline
            .process(RawMessage::new("hey are we still meeting for lunch?", None))
            .await;

        assert_eq!(result.status, PipelineStatus::FilteredOut);
        assert!(!result.is_processed);
        assert!(result.parsed_data.is_none());
        assert!(result.fraud_detection.is_none());

        pipeline.flush_writes().await;
        assert!(store.transactions.lock().unwrap().is_empty());
        assert!(store.fraud_logs.lock().unwrap().is_empty());
        assert!(store.promos.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn phishing_sms_reaches_fraud_terminal() {
        let store = Arc::new(RecordingStore::default());
        let pipeline = pipeline_with(store.clone());

        let result = pipeline
            .process(RawMessage::new(
                "Your account has been locked. Click here to unlock: http://fake-bank.com/unlock",
                None,
            ))
            .await;

        assert_eq!(result.status, PipelineStatus::Success);
        assert!(result.is_fraud);
        assert!(!result.is_promotional);
        assert!(!result.is_banking_sms);
        let assessment = result.fraud_detection.unwrap();
        assert_eq!(assessment.risk_level, RiskLevel::High);
        assert!(!assessment.flagged_keywords.is_empty());
        assert!(!assessment.reasons.is_empty());

        pipeline.flush_writes().await;
        let fraud_logs = store.fraud_logs.lock().unwrap();
        assert_eq!(fraud_logs.len(), 1);
        // The extraction result rides along with the evidence.
        assert!(fraud_logs[0].parsed_data.contains(r#""parsing_method":"fallback""#));
        assert!(!fraud_logs[0].flagged_keywords.is_empty());
        assert!(store.transactions.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn promo_sms_reaches_promotional_terminal() {
        let store = Arc::new(RecordingStore::default());
        let pipeline = pipeline_with(store.clone());

        let result = pipeline
            .process(RawMessage::new(
                "Get 50% off on your next purchase at Amazon! Use code AMAZ50. Valid till 31st March.",
                Some("AM-AMZOFR".into()),
            ))
            .await;

        assert_eq!(result.status, PipelineStatus::Success);
        assert!(result.is_promotional);
        assert!(!result.is_fraud);
        assert!(!result.is_banking_sms);
        let promo = result.promotion.unwrap();
        assert!(promo.score > 0.3);
        assert!(!promo.fraud_override);

        pipeline.flush_writes().await;
        let promos = store.promos.lock().unwrap();
        assert_eq!(promos.len(), 1);
        assert!(promos[0].parsed_data.contains(r#""transaction_type""#));
        assert!(store.transactions.lock().unwrap().is_empty());
    }

    // ── Precedence ──────────────────────────────────────────────────

    #[tokio::test]
    async fn fraud_takes_precedence_over_promotional() {
        let store = Arc::new(RecordingStore::default());
        let pipeline = pipeline_with(store.clone());

        // Reads like marketing but carries a KYC phishing hook.
        let result = pipeline
            .process(RawMessage::new(
                "50% off account renewal! Update your KYC at bit.ly/upd8 today",
                None,
            ))
            .await;

        assert!(result.is_fraud);
        assert!(!result.is_promotional);

        pipeline.flush_writes().await;
        assert_eq!(store.fraud_logs.lock().unwrap().len(), 1);
        assert!(store.promos.lock().unwrap().is_empty());
    }

    // ── Extraction recovery ─────────────────────────────────────────

    #[tokio::test]
    async fn primary_result_flows_into_transaction_record() {
        let store = Arc::new(RecordingStore::default());
        let extraction = ExtractionResult {
            transaction_type: TransactionType::Debit,
            amount: Some(500.0),
            merchant_name: "AMAZON".into(),
            account_masked: "XX1234".into(),
            date: "2024-03-15".into(),
            parsing_method: ParsingMethod::Primary,
        };
        let pipeline = SmsPipeline::new(
            store.clone(),
            &PipelineConfig::default(),
            Some(Arc::new(MockPrimary(extraction))),
        );

        let result = pipeline.process(RawMessage::new(DEBIT_SMS, None)).await;
        assert_eq!(
            result.parsed_data.unwrap().parsing_method,
            ParsingMethod::Primary
        );

        pipeline.flush_writes().await;
        assert_eq!(store.transactions.lock().unwrap()[0].parsing_method, "primary");
    }

    #[tokio::test]
    async fn broken_primary_falls_back_and_still_succeeds() {
        let store = Arc::new(RecordingStore::default());
        let pipeline = SmsPipeline::new(
            store.clone(),
            &PipelineConfig::default(),
            Some(Arc::new(BrokenPrimary)),
        );

        let result = pipeline.process(RawMessage::new(DEBIT_SMS, None)).await;
        assert_eq!(result.status, PipelineStatus::Success);
        let parsed = result.parsed_data.unwrap();
        assert_eq!(parsed.parsing_method, ParsingMethod::Fallback);
        assert_eq!(parsed.amount, Some(500.0));
    }

    #[tokio::test]
    async fn slow_primary_times_out_and_falls_back() {
        struct SlowPrimary;

        #[async_trait]
        impl Extractor for SlowPrimary {
            fn name(&self) -> &str {
                "slow"
            }

            async fn extract(&self, _text: &str) -> Result<ExtractionResult, ExtractorError> {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(ExtractionResult::empty(ParsingMethod::Primary))
            }
        }

        let store = Arc::new(RecordingStore::default());
        let config = PipelineConfig {
            extractor_timeout: Duration::from_millis(20),
            ..PipelineConfig::default()
        };
        let pipeline = SmsPipeline::new(store.clone(), &config, Some(Arc::new(SlowPrimary)));

        let result = pipeline.process(RawMessage::new(DEBIT_SMS, None)).await;
        assert_eq!(result.status, PipelineStatus::Success);
        assert_eq!(
            result.parsed_data.unwrap().parsing_method,
            ParsingMethod::Fallback
        );
    }

    // ── Failure isolation ───────────────────────────────────────────

    #[tokio::test]
    async fn store_failure_does_not_change_the_verdict() {
        let pipeline = pipeline_with(Arc::new(FailingStore));

        let result = pipeline.process(RawMessage::new(DEBIT_SMS, None)).await;
        pipeline.flush_writes().await;

        assert_eq!(result.status, PipelineStatus::Success);
        assert!(result.is_banking_sms);
        assert!(result.error.is_none());
    }

    #[tokio::test]
    async fn unknown_extraction_still_persists_as_transaction() {
        let store = Arc::new(RecordingStore::default());
        let pipeline = pipeline_with(store.clone());

        // Passes the filter on "balance" but has nothing extractable.
        let result = pipeline
            .process(RawMessage::new("please check your balance statement", None))
            .await;

        assert_eq!(result.status, PipelineStatus::Success);
        assert!(result.is_banking_sms);
        assert_eq!(
            result.parsed_data.unwrap().transaction_type,
            TransactionType::Unknown
        );

        pipeline.flush_writes().await;
        let transactions = store.transactions.lock().unwrap();
        assert_eq!(transactions.len(), 1);
        assert_eq!(transactions[0].transaction_type, "unknown");
    }

    #[tokio::test]
    async fn batch_preserves_input_order() {
        let store = Arc::new(RecordingStore::default());
        let pipeline = pipeline_with(store);

        let results = pipeline
            .process_batch(vec![
                RawMessage::new(DEBIT_SMS, None),
                RawMessage::new("hey are we still meeting for lunch?", None),
            ])
            .await;

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].status, PipelineStatus::Success);
        assert_eq!(results[1].status, PipelineStatus::FilteredOut);
    }
}
