//! Message classification pipeline: light filter, extraction, fraud and
//! promotional detection, orchestrated into a single non-failing call.

pub mod filter;
pub mod processor;
pub mod types;

pub use filter::LightFilter;
pub use processor::SmsPipeline;
pub use types::{
    ExtractionResult, FraudAssessment, ParsingMethod, PipelineResult, PipelineStatus,
    PromotionScore, RawMessage, RiskLevel, TransactionType,
};
