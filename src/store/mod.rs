//! Persistence layer: classification outcomes land in one of three tables
//! depending on the terminal the pipeline reached.

pub mod libsql_backend;
pub mod migrations;
pub mod traits;

pub use libsql_backend::LibSqlStore;
pub use traits::{FraudLogRecord, PromoRecord, Store, TransactionRecord};
