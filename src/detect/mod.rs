//! Fraud and promotional detection over raw message text.

pub mod fraud;
pub mod indicators;
pub mod promo;

pub use fraud::FraudDetector;
pub use indicators::{IndicatorCategory, IndicatorHit, IndicatorTable};
pub use promo::PromotionalDetector;
