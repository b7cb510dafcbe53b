//! libSQL backend — async `Store` trait implementation.
//!
//! Supports local file and in-memory databases.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use libsql::{Connection, Database as LibSqlDatabase, params};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::StoreError;
use crate::store::migrations;
use crate::store::traits::{FraudLogRecord, PromoRecord, Store, TransactionRecord};

/// libSQL store backend.
///
/// Stores a single connection that is reused for all operations.
/// `libsql::Connection` is `Send + Sync` and safe for concurrent async use.
pub struct LibSqlStore {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlStore {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::Pool(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| StoreError::Pool(format!("Failed to open libSQL database: {e}")))?;

        let conn = db
            .connect()
            .map_err(|e| StoreError::Pool(format!("Failed to create connection: {e}")))?;

        migrations::run_migrations(&conn).await?;
        info!(path = %path.display(), "Database opened");
        Ok(Self {
            db: Arc::new(db),
            conn,
        })
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, StoreError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| StoreError::Pool(format!("Failed to create in-memory database: {e}")))?;

        let conn = db
            .connect()
            .map_err(|e| StoreError::Pool(format!("Failed to create connection: {e}")))?;

        migrations::run_migrations(&conn).await?;
        Ok(Self {
            db: Arc::new(db),
            conn,
        })
    }

    fn conn(&self) -> &Connection {
        &self.conn
    }
}

/// Convert `Option<&str>` to libsql Value.
fn opt_text(s: Option<&str>) -> libsql::Value {
    match s {
        Some(s) => libsql::Value::Text(s.to_string()),
        None => libsql::Value::Null,
    }
}

/// Convert `Option<f64>` to libsql Value.
fn opt_real(v: Option<f64>) -> libsql::Value {
    match v {
        Some(v) => libsql::Value::Real(v),
        None => libsql::Value::Null,
    }
}

async fn count_table(conn: &Connection, table: &str) -> Result<i64, StoreError> {
    let mut rows = conn
        .query(&format!("SELECT COUNT(*) FROM {table}"), ())
        .await
        .map_err(|e| StoreError::Query(format!("count {table}: {e}")))?;

    match rows.next().await {
        Ok(Some(row)) => {
            let count: i64 = row.get(0).unwrap_or(0);
            Ok(count)
        }
        Ok(None) => Ok(0),
        Err(e) => Err(StoreError::Query(format!("count {table}: {e}"))),
    }
}

#[async_trait]
impl Store for LibSqlStore {
    async fn save_transaction(&self, record: &TransactionRecord) -> Result<(), StoreError> {
        let id = Uuid::new_v4();
        self.conn()
            .execute(
                "INSERT INTO transactions (id, sender, raw_sms, transaction_type, amount,
                    merchant_name, account_masked, transaction_date, parsing_method,
                    processing_time_ms, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    id.to_string(),
                    opt_text(record.sender.as_deref()),
                    record.raw_sms.clone(),
                    record.transaction_type.clone(),
                    opt_real(record.amount),
                    record.merchant_name.clone(),
                    record.account_masked.clone(),
                    record.transaction_date.clone(),
                    record.parsing_method.clone(),
                    record.processing_time_ms as i64,
                    record.created_at.to_rfc3339(),
                ],
            )
            .await
            .map_err(|e| StoreError::Query(format!("save_transaction: {e}")))?;

        debug!(id = %id, transaction_type = %record.transaction_type, "Transaction saved");
        Ok(())
    }

    async fn save_fraud_log(&self, record: &FraudLogRecord) -> Result<(), StoreError> {
        let id = Uuid::new_v4();
        self.conn()
            .execute(
                "INSERT INTO fraud_logs (id, sender, raw_sms, risk_level, confidence,
                    flagged_keywords, reasons, parsed_data, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    id.to_string(),
                    opt_text(record.sender.as_deref()),
                    record.raw_sms.clone(),
                    record.risk_level.clone(),
                    record.confidence,
                    record.flagged_keywords.clone(),
                    record.reasons.clone(),
                    record.parsed_data.clone(),
                    record.created_at.to_rfc3339(),
                ],
            )
            .await
            .map_err(|e| StoreError::Query(format!("save_fraud_log: {e}")))?;

        debug!(id = %id, risk_level = %record.risk_level, "Fraud log saved");
        Ok(())
    }

    async fn save_promotional(&self, record: &PromoRecord) -> Result<(), StoreError> {
        let id = Uuid::new_v4();
        self.conn()
            .execute(
                "INSERT INTO promotional_sms (id, sender, raw_sms, score, matched_keywords,
                    has_url, parsed_data, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    id.to_string(),
                    opt_text(record.sender.as_deref()),
                    record.raw_sms.clone(),
                    record.score,
                    record.matched_keywords.clone(),
                    record.has_url as i64,
                    record.parsed_data.clone(),
                    record.created_at.to_rfc3339(),
                ],
            )
            .await
            .map_err(|e| StoreError::Query(format!("save_promotional: {e}")))?;

        debug!(id = %id, score = record.score, "Promotional SMS saved");
        Ok(())
    }

    async fn count_transactions(&self) -> Result<i64, StoreError> {
        count_table(self.conn(), "transactions").await
    }

    async fn count_fraud_logs(&self) -> Result<i64, StoreError> {
        count_table(self.conn(), "fraud_logs").await
    }

    async fn count_promotional(&self) -> Result<i64, StoreError> {
        count_table(self.conn(), "promotional_sms").await
    }
}
